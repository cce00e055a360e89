use crate::config::AppConfig;
use crate::database::Database;
use crate::models::{Role, User};
use crate::services::{auth_service, user_service};

/// Creates the bootstrap superadmin.
/// Only runs when credentials are configured and no user exists yet.
pub async fn seed_bootstrap_admin(db: &Database, config: &AppConfig) {
    let Some((username, password)) = config.bootstrap_admin.as_ref() else {
        log::info!("👤 Bootstrap admin: not configured, skipping seed");
        return;
    };

    let count = match db.load_all::<User>().await {
        Ok(users) => users.len(),
        Err(e) => {
            log::error!("   ❌ Could not read users for seeding: {}", e);
            return;
        }
    };

    if count > 0 {
        log::info!("👤 Bootstrap admin: {} user(s) already present, skipping seed", count);
        return;
    }

    let hashed = match auth_service::hash_password(password, config.auth.bcrypt_cost).await {
        Ok(hashed) => hashed,
        Err(e) => {
            log::error!("   ❌ Failed to hash bootstrap admin password: {}", e);
            return;
        }
    };

    match user_service::insert_user(db, User::new(username.clone(), hashed, Role::Superadmin)).await {
        Ok(profile) => log::info!("   ✅ Bootstrap superadmin created: {}", profile.username),
        Err(e) => log::error!("   ❌ Failed to seed bootstrap admin: {}", e),
    }
}
