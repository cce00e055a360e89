#![allow(dead_code)]

use std::sync::Arc;

use actix_web::web;
use tempfile::TempDir;

use clubhub_service::config::{AppConfig, DeletePolicy};
use clubhub_service::database::{Database, JsonFileStore};
use clubhub_service::models::{Role, User};
use clubhub_service::services::{auth_service, user_service};

pub const PASSWORD: &str = "correct horse";

const BOUNDARY: &str = "clubhub-test-boundary";

/// A `multipart/form-data` body holding a single file part.
pub fn multipart_file(field: &str, content_type: &str, bytes: &[u8]) -> ((&'static str, String), Vec<u8>) {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"upload\"\r\nContent-Type: {ct}\r\n\r\n",
        b = BOUNDARY,
        f = field,
        ct = content_type
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    (
        ("Content-Type", format!("multipart/form-data; boundary={}", BOUNDARY)),
        body,
    )
}

/// A service rooted in a throwaway directory.
pub struct TestContext {
    pub dir: TempDir,
    pub config: AppConfig,
    pub db: Database,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_delete_policy(DeletePolicy::Cascade)
    }

    pub fn with_delete_policy(policy: DeletePolicy) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::for_tests(dir.path());
        config.delete_policy = policy;
        let db = Database::new(Arc::new(JsonFileStore::new(config.data_dir.clone())), config.id_policy);
        Self { dir, config, db }
    }

    pub fn db_data(&self) -> web::Data<Database> {
        web::Data::new(self.db.clone())
    }

    pub fn config_data(&self) -> web::Data<AppConfig> {
        web::Data::new(self.config.clone())
    }

    pub async fn add_user(&self, username: &str, role: Role) {
        let hashed = auth_service::hash_password(PASSWORD, self.config.auth.bcrypt_cost)
            .await
            .expect("hash");
        user_service::insert_user(&self.db, User::new(username.to_string(), hashed, role))
            .await
            .expect("insert user");
    }

    pub fn token(&self, username: &str, role: Role) -> String {
        auth_service::generate_jwt(&self.config.auth, username, role).expect("jwt")
    }

    pub fn bearer(&self, username: &str, role: Role) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token(username, role)))
    }
}

/// Builds the full `/api` app over a [`TestContext`].
#[macro_export]
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($ctx.db_data())
                .app_data($ctx.config_data())
                .app_data(clubhub_service::api::json_config())
                .wrap(clubhub_service::middleware::AuthMiddleware)
                .wrap(clubhub_service::middleware::SecurityHeaders)
                .route("/health", actix_web::web::get().to(clubhub_service::api::health::health_check))
                .route("/metrics", actix_web::web::get().to(clubhub_service::api::metrics::get_metrics))
                .configure(clubhub_service::api::configure),
        )
        .await
    };
}
