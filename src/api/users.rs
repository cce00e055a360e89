use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::api::read_file_field;
use crate::config::{AppConfig, PROFILE_PICTURE_MAX_BYTES};
use crate::database::Database;
use crate::models::{ActivityInput, CreateUserRequest, LoginRequest, UpdateUserRequest, UserProfile};
use crate::services::auth_service::{self, Claims, LoginResponse};
use crate::services::user_service;
use crate::utils::error::AppError;

#[derive(Serialize, utoipa::ToSchema)]
pub struct UpdateUserResponse {
    pub success: bool,
    pub message: String,
    pub user: UserProfile,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePictureResponse {
    pub message: String,
    pub profile_picture: String,
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    responses(
        (status = 200, description = "All user profiles", body = [UserProfile])
    )
)]
pub async fn list_users(db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    log::info!("👥 GET /users");
    let users = user_service::list_users(&db).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    get,
    path = "/api/users/{username}",
    tag = "Users",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let username = path.into_inner();
    log::info!("👤 GET /users/{}", username);
    let user = user_service::get_user(&db, &username).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔐 POST /users/login - username: {}", request.username);

    match auth_service::login(&db, &config.auth, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", request.username);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.username, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/users/create-user",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 400, description = "Missing fields"),
        (status = 403, description = "Caller may not grant this role"),
        (status = 409, description = "User already exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    request: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /users/create-user - username: {}", request.username);
    let profile = user_service::create_user(&db, &config, &claims, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(profile))
}

#[utoipa::path(
    put,
    path = "/api/users/{username}",
    tag = "Users",
    params(("username" = String, Path, description = "Username")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UpdateUserResponse),
        (status = 404, description = "User not found"),
        (status = 409, description = "New username already taken")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let username = path.into_inner();
    log::info!("✏️  PUT /users/{}", username);

    let user = user_service::update_user(&db, &config, &claims, &username, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UpdateUserResponse {
        success: true,
        message: "User updated successfully".to_string(),
        user,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/users/{username}",
    tag = "Users",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let username = path.into_inner();
    log::info!("🗑️  DELETE /users/{}", username);
    user_service::delete_user(&db, &config, &claims, &username).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/users/{username}/profile-picture",
    tag = "Users",
    params(("username" = String, Path, description = "Username")),
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Image file in the `profilePicture` field"),
    responses(
        (status = 200, description = "Picture stored", body = ProfilePictureResponse),
        (status = 413, description = "Image too large"),
        (status = 415, description = "Not an image")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_profile_picture(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let username = path.into_inner();
    let file = read_file_field(payload, "profilePicture", PROFILE_PICTURE_MAX_BYTES).await?;
    log::info!("🖼️  POST /users/{}/profile-picture ({} bytes)", username, file.bytes.len());

    let profile_picture = user_service::set_profile_picture(
        &db,
        &config,
        &claims,
        &username,
        file.content_type.as_deref(),
        &file.bytes,
    )
    .await?;

    Ok(HttpResponse::Ok().json(ProfilePictureResponse {
        message: "Profile picture updated".to_string(),
        profile_picture,
    }))
}

#[utoipa::path(
    post,
    path = "/api/users/{username}/clubs/{club_id}",
    tag = "Users",
    params(
        ("username" = String, Path, description = "Username"),
        ("club_id" = String, Path, description = "Club id")
    ),
    responses(
        (status = 200, description = "Joined club", body = UserProfile),
        (status = 404, description = "User or club not found"),
        (status = 409, description = "Already a member")
    ),
    security(("bearer_auth" = []))
)]
pub async fn join_club(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (username, club_id) = path.into_inner();
    log::info!("➕ POST /users/{}/clubs/{}", username, club_id);
    let user = user_service::join_club(&db, &claims, &username, &club_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    delete,
    path = "/api/users/{username}/clubs/{club_id}",
    tag = "Users",
    params(
        ("username" = String, Path, description = "Username"),
        ("club_id" = String, Path, description = "Club id")
    ),
    responses(
        (status = 200, description = "Left club", body = UserProfile),
        (status = 404, description = "Not a member")
    ),
    security(("bearer_auth" = []))
)]
pub async fn leave_club(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (username, club_id) = path.into_inner();
    log::info!("➖ DELETE /users/{}/clubs/{}", username, club_id);
    let user = user_service::leave_club(&db, &claims, &username, &club_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    post,
    path = "/api/users/{username}/events/{event_id}",
    tag = "Users",
    params(
        ("username" = String, Path, description = "Username"),
        ("event_id" = String, Path, description = "Event id")
    ),
    responses(
        (status = 200, description = "Joined event", body = UserProfile),
        (status = 404, description = "User or event not found"),
        (status = 409, description = "Already attending")
    ),
    security(("bearer_auth" = []))
)]
pub async fn join_event(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (username, event_id) = path.into_inner();
    log::info!("➕ POST /users/{}/events/{}", username, event_id);
    let user = user_service::join_event(&db, &claims, &username, &event_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    delete,
    path = "/api/users/{username}/events/{event_id}",
    tag = "Users",
    params(
        ("username" = String, Path, description = "Username"),
        ("event_id" = String, Path, description = "Event id")
    ),
    responses(
        (status = 200, description = "Left event", body = UserProfile),
        (status = 404, description = "Not attending")
    ),
    security(("bearer_auth" = []))
)]
pub async fn leave_event(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (username, event_id) = path.into_inner();
    log::info!("➖ DELETE /users/{}/events/{}", username, event_id);
    let user = user_service::leave_event(&db, &claims, &username, &event_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    post,
    path = "/api/users/{username}/activity",
    tag = "Users",
    params(("username" = String, Path, description = "Username")),
    request_body = ActivityInput,
    responses(
        (status = 200, description = "Activity recorded", body = UserProfile),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn record_activity(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<ActivityInput>,
) -> Result<HttpResponse, AppError> {
    let username = path.into_inner();
    log::info!("📌 POST /users/{}/activity - {}", username, request.action);
    let user = user_service::record_activity(&db, &claims, &username, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}
