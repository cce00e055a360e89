use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};

use crate::api::read_file_field;
use crate::config::AppConfig;
use crate::database::Database;
use crate::models::{CreateEventRequest, Event, MembershipRequest, RegisterRequest, UpdateEventRequest};
use crate::services::auth_service::Claims;
use crate::services::event_service;
use crate::utils::error::AppError;

#[utoipa::path(
    get,
    path = "/api/events",
    tag = "Events",
    responses((status = 200, description = "All events", body = [Event]))
)]
pub async fn list_events(db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    log::info!("📅 GET /events");
    Ok(HttpResponse::Ok().json(event_service::list_events(&db).await?))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}",
    tag = "Events",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event", body = Event),
        (status = 404, description = "Event not found")
    )
)]
pub async fn get_event(
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("📅 GET /events/{}", id);
    Ok(HttpResponse::Ok().json(event_service::get_event(&db, &id).await?))
}

#[utoipa::path(
    get,
    path = "/api/events/club/{club_id}",
    tag = "Events",
    params(("club_id" = String, Path, description = "Club id")),
    responses((status = 200, description = "Events of the club", body = [Event]))
)]
pub async fn list_club_events(
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let club_id = path.into_inner();
    log::info!("📅 GET /events/club/{}", club_id);
    Ok(HttpResponse::Ok().json(event_service::list_club_events(&db, &club_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/events",
    tag = "Events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Missing fields or invalid dates"),
        (status = 404, description = "Club not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_event(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    request: web::Json<CreateEventRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /events - title: {}", request.title);
    let event = event_service::create_event(&db, &claims, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(event))
}

#[utoipa::path(
    put,
    path = "/api/events/{id}",
    tag = "Events",
    params(("id" = String, Path, description = "Event id")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = Event),
        (status = 400, description = "Invalid dates"),
        (status = 404, description = "Event not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_event(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateEventRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("✏️  PUT /events/{}", id);
    let event = event_service::update_event(&db, &claims, &id, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(event))
}

#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    tag = "Events",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Remaining events", body = [Event]),
        (status = 404, description = "Event not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_event(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("🗑️  DELETE /events/{}", id);
    let remaining = event_service::delete_event(&db, &config, &claims, &id).await?;
    Ok(HttpResponse::Ok().json(remaining))
}

#[utoipa::path(
    delete,
    path = "/api/events/club/{club_id}",
    tag = "Events",
    params(("club_id" = String, Path, description = "Club id")),
    responses((status = 200, description = "Remaining events", body = [Event])),
    security(("bearer_auth" = []))
)]
pub async fn delete_club_events(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let club_id = path.into_inner();
    log::info!("🗑️  DELETE /events/club/{}", club_id);
    let remaining = event_service::delete_club_events(&db, &config, &claims, &club_id).await?;
    Ok(HttpResponse::Ok().json(remaining))
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/register",
    tag = "Events",
    params(("id" = String, Path, description = "Event id")),
    request_body(content = RegisterRequest, description = "Optional; defaults to the caller"),
    responses(
        (status = 200, description = "Registered (idempotent)", body = Event),
        (status = 404, description = "Event or user not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn register(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: Option<web::Json<RegisterRequest>>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let username = request.and_then(|body| body.into_inner().username);
    log::info!(
        "🎟️  POST /events/{}/register - {}",
        id,
        username.as_deref().unwrap_or(claims.username())
    );
    let event = event_service::register(&db, &claims, &id, username.as_deref()).await?;
    Ok(HttpResponse::Ok().json(event))
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/add-attendee",
    tag = "Events",
    params(("id" = String, Path, description = "Event id")),
    request_body = MembershipRequest,
    responses(
        (status = 200, description = "Attendee added", body = Event),
        (status = 404, description = "Event or user not found"),
        (status = 409, description = "Already attending")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_attendee(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<MembershipRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("➕ POST /events/{}/add-attendee - {}", id, request.username);
    let event = event_service::add_attendee(&db, &claims, &id, &request.username).await?;
    Ok(HttpResponse::Ok().json(event))
}

#[utoipa::path(
    delete,
    path = "/api/events/{id}/remove-attendee",
    tag = "Events",
    params(("id" = String, Path, description = "Event id")),
    request_body = MembershipRequest,
    responses(
        (status = 200, description = "Attendee removed", body = Event),
        (status = 404, description = "Event not found or not attending")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_attendee(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<MembershipRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("➖ DELETE /events/{}/remove-attendee - {}", id, request.username);

    match event_service::remove_attendee(&db, &claims, &id, &request.username).await {
        Ok(event) => Ok(HttpResponse::Ok().json(event)),
        Err(e) => {
            log::warn!("❌ remove-attendee {} <- {} failed: {}", id, request.username, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/image",
    tag = "Events",
    params(("id" = String, Path, description = "Event id")),
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Image file in the `event-image` field"),
    responses(
        (status = 200, description = "Image stored", body = Event),
        (status = 413, description = "Image too large"),
        (status = 415, description = "Not an image")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_image(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let file = read_file_field(payload, "event-image", config.max_image_bytes).await?;
    log::info!("🖼️  POST /events/{}/image ({} bytes)", id, file.bytes.len());
    let event = event_service::set_image(
        &db,
        &config,
        &claims,
        &id,
        file.content_type.as_deref(),
        &file.bytes,
    )
    .await?;
    Ok(HttpResponse::Ok().json(event))
}
