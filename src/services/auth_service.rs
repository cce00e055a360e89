use std::collections::HashSet;

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthSettings;
use crate::database::Database;
use crate::models::{LoginRequest, Role, User, UserProfile};
use crate::utils::error::{AppError, AppResult};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

lazy_static::lazy_static! {
    // Verified against when the username is unknown, so both failure paths pay for a bcrypt check.
    static ref DUMMY_HASH: String =
        hash("clubhub-unknown-user", bcrypt::DEFAULT_COST).unwrap_or_default();
}

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // username
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

impl Claims {
    pub fn username(&self) -> &str {
        &self.sub
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Access denied. Admins only."))
        }
    }

    /// The actor is `username` or an admin.
    pub fn require_self_or_admin(&self, username: &str) -> AppResult<()> {
        if self.sub == username || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("You can only act on your own account"))
        }
    }

    /// The actor is one of `allowed` or an admin.
    pub fn require_any_of(&self, allowed: &[&str]) -> AppResult<()> {
        if self.is_admin() || allowed.iter().any(|name| *name == self.sub) {
            Ok(())
        } else {
            Err(AppError::forbidden("Not allowed to modify this record"))
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

/// The token is valid but its subject has since been deleted.
pub fn account_gone() -> AppError {
    AppError::Unauthorized("Account no longer exists".to_string())
}

/// Checks the token's subject against the store. The stored role wins over
/// the one baked into the token, so demotions apply before the token expires.
pub async fn resolve_actor(db: &Database, mut claims: Claims) -> AppResult<Claims> {
    let user = db.find::<User>(&claims.sub).await?.ok_or_else(account_gone)?;
    if user.role != claims.role {
        log::info!(
            "🔁 Role of {} changed since login: {} -> {}",
            claims.sub,
            claims.role.as_str(),
            user.role.as_str()
        );
        claims.role = user.role;
    }
    Ok(claims)
}

pub fn generate_jwt(settings: &AuthSettings, username: &str, role: Role) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: username.to_string(),
        role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(settings.token_ttl_hours)).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: settings.jwt_audience.clone(),
        iss: settings.jwt_issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))
}

pub fn verify_token(settings: &AuthSettings, token: &str) -> Result<Claims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[settings.jwt_audience.clone()]);

    let mut issuers = HashSet::new();
    issuers.insert(settings.jwt_issuer.clone());
    validation.iss = Some(issuers);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash(password, cost))
        .await
        .map_err(|e| AppError::internal(format!("Task join error: {}", e)))?
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))
}

async fn verify_password(password: &str, stored: &str) -> AppResult<bool> {
    let password = password.to_string();
    let stored = stored.to_string();
    let outcome = tokio::task::spawn_blocking(move || verify(password, &stored))
        .await
        .map_err(|e| AppError::internal(format!("Task join error: {}", e)))?;

    // A corrupt stored hash is treated as a mismatch, not a server error
    Ok(outcome.unwrap_or_else(|e| {
        log::warn!("⚠️  Password verification error: {}", e);
        false
    }))
}

// User login
pub async fn login(
    db: &Database,
    settings: &AuthSettings,
    request: &LoginRequest,
) -> AppResult<LoginResponse> {
    let username = request.username.trim();
    if username.is_empty() || request.password.is_empty() {
        return Err(AppError::bad_request("Username and password are required"));
    }

    let user = db.find::<User>(username).await?;

    let valid = match &user {
        Some(user) => verify_password(&request.password, &user.password).await?,
        None => {
            let _ = verify_password(&request.password, &DUMMY_HASH).await?;
            false
        }
    };

    let user = match (user, valid) {
        (Some(user), true) => user,
        _ => return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string())),
    };

    let token = generate_jwt(settings, &user.username, user.role)?;

    Ok(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        user: UserProfile::from(&user),
    })
}
