pub mod clubs;
pub mod events;
pub mod health;
pub mod metrics;
pub mod swagger;
pub mod users;

use actix_multipart::Multipart;
use actix_web::{error::JsonPayloadError, web, HttpRequest};
use futures::TryStreamExt;

use crate::utils::error::AppError;

/// Turns body-parsing failures into the usual `{ success, error }` 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        log::warn!("⚠️  Rejected request body: {}", err);
        let message = match &err {
            JsonPayloadError::ContentType => "Expected a JSON body".to_string(),
            _ => format!("Invalid JSON body: {}", err),
        };
        AppError::BadRequest(message).into()
    })
}

/// One file part read out of a `multipart/form-data` body.
pub(crate) struct UploadedFile {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Reads the part named `field`, skipping any others.
///
/// Stops with 413 as soon as the part grows past `max_bytes`.
pub(crate) async fn read_file_field(
    mut payload: Multipart,
    field: &str,
    max_bytes: usize,
) -> Result<UploadedFile, AppError> {
    while let Some(mut part) = payload
        .try_next()
        .await
        .map_err(|e| AppError::bad_request(format!("Multipart error: {}", e)))?
    {
        if part.name() != Some(field) {
            continue;
        }

        let content_type = part.content_type().map(|mime| mime.essence_str().to_string());
        let mut bytes = Vec::new();
        while let Some(chunk) = part
            .try_next()
            .await
            .map_err(|e| AppError::bad_request(format!("Failed to read file: {}", e)))?
        {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "Image exceeds the {} byte limit",
                    max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(UploadedFile { content_type, bytes });
    }

    Err(AppError::bad_request(format!("No file uploaded in field '{}'", field)))
}

/// Registers every `/api` route.
///
/// Static segments are registered before their `{param}` siblings so that
/// `/login` and `/club/{id}` are not captured as ids.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .route("", web::get().to(users::list_users))
            .route("/login", web::post().to(users::login))
            .route("/create-user", web::post().to(users::create_user))
            .route("/{username}", web::get().to(users::get_user))
            .route("/{username}", web::put().to(users::update_user))
            .route("/{username}", web::delete().to(users::delete_user))
            .route("/{username}/profile-picture", web::post().to(users::upload_profile_picture))
            .route("/{username}/clubs/{club_id}", web::post().to(users::join_club))
            .route("/{username}/clubs/{club_id}", web::delete().to(users::leave_club))
            .route("/{username}/events/{event_id}", web::post().to(users::join_event))
            .route("/{username}/events/{event_id}", web::delete().to(users::leave_event))
            .route("/{username}/activity", web::post().to(users::record_activity)),
    )
    .service(
        web::scope("/api/clubs")
            .route("", web::get().to(clubs::list_clubs))
            .route("", web::post().to(clubs::create_club))
            .route("/{id}", web::get().to(clubs::get_club))
            .route("/{id}", web::put().to(clubs::update_club))
            .route("/{id}", web::delete().to(clubs::delete_club))
            .route("/{id}/add-member", web::post().to(clubs::add_member))
            .route("/{id}/remove-member", web::delete().to(clubs::remove_member))
            .route("/{id}/image", web::post().to(clubs::upload_image)),
    )
    .service(
        web::scope("/api/events")
            .route("", web::get().to(events::list_events))
            .route("", web::post().to(events::create_event))
            .route("/club/{club_id}", web::get().to(events::list_club_events))
            .route("/club/{club_id}", web::delete().to(events::delete_club_events))
            .route("/{id}", web::get().to(events::get_event))
            .route("/{id}", web::put().to(events::update_event))
            .route("/{id}", web::delete().to(events::delete_event))
            .route("/{id}/register", web::post().to(events::register))
            .route("/{id}/add-attendee", web::post().to(events::add_attendee))
            .route("/{id}/remove-attendee", web::delete().to(events::remove_attendee))
            .route("/{id}/image", web::post().to(events::upload_image)),
    );
}
