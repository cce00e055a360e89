use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::database::IdPolicy;

/// What happens to references held by other collections when a record is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Strip the deleted id/username from every membership set that names it.
    Cascade,
    /// Leave dangling references behind.
    Orphan,
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cascade" => Ok(DeletePolicy::Cascade),
            "orphan" => Ok(DeletePolicy::Orphan),
            other => Err(format!("Invalid delete policy: {}. Supported: cascade, orphan", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub max_image_bytes: usize,
    pub id_policy: IdPolicy,
    pub delete_policy: DeletePolicy,
    pub cors_origins: Vec<String>,
    pub auth: AuthSettings,
    pub bootstrap_admin: Option<(String, String)>,
}

pub const PROFILE_PICTURE_MAX_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_MAX_IMAGE_BYTES: usize = 100 * 1024 * 1024;
const DEFAULT_JWT_SECRET: &str = "default-secret-change-me";

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("⚠️  JWT_SECRET not set, using the built-in development secret");
            DEFAULT_JWT_SECRET.to_string()
        });

        let bootstrap_admin = match (
            env::var("BOOTSTRAP_ADMIN_USERNAME"),
            env::var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(user), Ok(password)) if !user.trim().is_empty() && !password.is_empty() => {
                Some((user.trim().to_string(), password))
            }
            _ => None,
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 3000),
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string())),
            upload_dir: PathBuf::from(
                env::var("UPLOAD_DIR").unwrap_or_else(|_| "public/uploads".to_string()),
            ),
            max_image_bytes: parse_var("MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES),
            id_policy: parse_var("ID_POLICY", IdPolicy::LastElement),
            delete_policy: parse_var("DELETE_POLICY", DeletePolicy::Cascade),
            cors_origins,
            auth: AuthSettings {
                jwt_secret,
                jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "clubhub-service".to_string()),
                jwt_audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "clubhub-api".to_string()),
                token_ttl_hours: parse_var("JWT_TTL_HOURS", 24),
                bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST),
            },
            bootstrap_admin,
        }
    }

    /// Settings for tests: everything rooted in `root`, cheap bcrypt.
    pub fn for_tests(root: &std::path::Path) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: root.join("data"),
            upload_dir: root.join("uploads"),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            id_policy: IdPolicy::LastElement,
            delete_policy: DeletePolicy::Cascade,
            cors_origins: Vec::new(),
            auth: AuthSettings {
                jwt_secret: "test-secret".to_string(),
                jwt_issuer: "clubhub-service".to_string(),
                jwt_audience: "clubhub-api".to_string(),
                token_ttl_hours: 1,
                bcrypt_cost: 4,
            },
            bootstrap_admin: None,
        }
    }
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                log::warn!("⚠️  Ignoring invalid {}={:?}: {}", key, raw, e);
                default
            }
        },
        Err(_) => default,
    }
}
