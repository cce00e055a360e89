use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};

use crate::api::read_file_field;
use crate::config::AppConfig;
use crate::database::Database;
use crate::models::{Club, CreateClubRequest, MembershipRequest, UpdateClubRequest};
use crate::services::auth_service::Claims;
use crate::services::club_service;
use crate::utils::error::AppError;

#[utoipa::path(
    get,
    path = "/api/clubs",
    tag = "Clubs",
    responses((status = 200, description = "All clubs", body = [Club]))
)]
pub async fn list_clubs(db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    log::info!("🏛️  GET /clubs");
    Ok(HttpResponse::Ok().json(club_service::list_clubs(&db).await?))
}

#[utoipa::path(
    get,
    path = "/api/clubs/{id}",
    tag = "Clubs",
    params(("id" = String, Path, description = "Club id")),
    responses(
        (status = 200, description = "Club", body = Club),
        (status = 404, description = "Club not found")
    )
)]
pub async fn get_club(
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("🏛️  GET /clubs/{}", id);
    Ok(HttpResponse::Ok().json(club_service::get_club(&db, &id).await?))
}

#[utoipa::path(
    post,
    path = "/api/clubs",
    tag = "Clubs",
    request_body = CreateClubRequest,
    responses(
        (status = 201, description = "Club created", body = Club),
        (status = 400, description = "Name and category are required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_club(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    request: web::Json<CreateClubRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /clubs - name: {}", request.name);
    let club = club_service::create_club(&db, &claims, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(club))
}

#[utoipa::path(
    put,
    path = "/api/clubs/{id}",
    tag = "Clubs",
    params(("id" = String, Path, description = "Club id")),
    request_body = UpdateClubRequest,
    responses(
        (status = 200, description = "Club updated", body = Club),
        (status = 403, description = "Only the creator or an admin may edit"),
        (status = 404, description = "Club not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_club(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateClubRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("✏️  PUT /clubs/{}", id);
    let club = club_service::update_club(&db, &claims, &id, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(club))
}

#[utoipa::path(
    delete,
    path = "/api/clubs/{id}",
    tag = "Clubs",
    params(("id" = String, Path, description = "Club id")),
    responses(
        (status = 204, description = "Club deleted"),
        (status = 404, description = "Club not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_club(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("🗑️  DELETE /clubs/{}", id);
    club_service::delete_club(&db, &config, &claims, &id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/clubs/{id}/add-member",
    tag = "Clubs",
    params(("id" = String, Path, description = "Club id")),
    request_body = MembershipRequest,
    responses(
        (status = 201, description = "Member added", body = Club),
        (status = 404, description = "Club or user not found"),
        (status = 409, description = "Already a member")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_member(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<MembershipRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("➕ POST /clubs/{}/add-member - {}", id, request.username);

    match club_service::add_member(&db, &claims, &id, &request.username).await {
        Ok(club) => Ok(HttpResponse::Created().json(club)),
        Err(e) => {
            log::warn!("❌ add-member {} -> {} failed: {}", request.username, id, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/clubs/{id}/remove-member",
    tag = "Clubs",
    params(("id" = String, Path, description = "Club id")),
    request_body = MembershipRequest,
    responses(
        (status = 200, description = "Member removed", body = Club),
        (status = 404, description = "Club not found or not a member")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_member(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<MembershipRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::info!("➖ DELETE /clubs/{}/remove-member - {}", id, request.username);
    let club = club_service::remove_member(&db, &claims, &id, &request.username).await?;
    Ok(HttpResponse::Ok().json(club))
}

#[utoipa::path(
    post,
    path = "/api/clubs/{id}/image",
    tag = "Clubs",
    params(("id" = String, Path, description = "Club id")),
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Image file in the `image` field"),
    responses(
        (status = 200, description = "Image stored", body = Club),
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
    let file = read_file_field(payload, "image", config.max_image_bytes).await?;
    log::info!("🖼️  POST /clubs/{}/image ({} bytes)", id, file.bytes.len());
    let club = club_service::set_image(
        &db,
        &config,
        &claims,
        &id,
        file.content_type.as_deref(),
        &file.bytes,
    )
    .await?;
    Ok(HttpResponse::Ok().json(club))
}
