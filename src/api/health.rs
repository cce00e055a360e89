use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::models::{Club, Event, User};

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct CollectionCounts {
    pub users: usize,
    pub clubs: usize,
    pub events: usize,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: i64,
    /// Absent when the store could not be read.
    pub collections: Option<CollectionCounts>,
}

async fn count_collections(db: &Database) -> Result<CollectionCounts, String> {
    let users = db.load_all::<User>().await.map_err(|e| e.to_string())?;
    let clubs = db.load_all::<Club>().await.map_err(|e| e.to_string())?;
    let events = db.load_all::<Event>().await.map_err(|e| e.to_string())?;
    Ok(CollectionCounts {
        users: users.len(),
        clubs: clubs.len(),
        events: events.len(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Data files cannot be read", body = HealthResponse)
    )
)]
pub async fn health_check(db: web::Data<Database>) -> impl Responder {
    let collections = match count_collections(&db).await {
        Ok(counts) => Some(counts),
        Err(e) => {
            log::error!("❌ Health check could not read the store: {}", e);
            None
        }
    };

    let healthy = collections.is_some();
    let body = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        service: "clubhub-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().timestamp(),
        collections,
    };

    if healthy {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
