use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ClubHub Service API",
        version = "1.0.0",
        description = "Campus clubs and events backend.\n\n**Authentication:** reads are public; every other request under `/api` (except login) requires a JWT Bearer token from `POST /api/users/login`.\n\n**Relationships:** club membership and event attendance are stored on both sides (club `members` / user `clubs`, event `attendees` / user `events`) and kept consistent by every endpoint."
    ),
    paths(
        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Users
        crate::api::users::list_users,
        crate::api::users::get_user,
        crate::api::users::login,
        crate::api::users::create_user,
        crate::api::users::update_user,
        crate::api::users::delete_user,
        crate::api::users::upload_profile_picture,
        crate::api::users::join_club,
        crate::api::users::leave_club,
        crate::api::users::join_event,
        crate::api::users::leave_event,
        crate::api::users::record_activity,

        // Clubs
        crate::api::clubs::list_clubs,
        crate::api::clubs::get_club,
        crate::api::clubs::create_club,
        crate::api::clubs::update_club,
        crate::api::clubs::delete_club,
        crate::api::clubs::add_member,
        crate::api::clubs::remove_member,
        crate::api::clubs::upload_image,

        // Events
        crate::api::events::list_events,
        crate::api::events::get_event,
        crate::api::events::list_club_events,
        crate::api::events::create_event,
        crate::api::events::update_event,
        crate::api::events::delete_event,
        crate::api::events::delete_club_events,
        crate::api::events::register,
        crate::api::events::add_attendee,
        crate::api::events::remove_attendee,
        crate::api::events::upload_image,
    ),
    components(
        schemas(
            // Health & Metrics
            crate::api::health::HealthResponse,
            crate::api::health::CollectionCounts,
            crate::api::metrics::MetricsResponse,

            // Users
            crate::models::Role,
            crate::models::ActivityEntry,
            crate::models::ActivityInput,
            crate::models::UserProfile,
            crate::models::CreateUserRequest,
            crate::models::LoginRequest,
            crate::models::UpdateUserRequest,
            crate::services::auth_service::LoginResponse,
            crate::api::users::UpdateUserResponse,
            crate::api::users::ProfilePictureResponse,

            // Clubs
            crate::models::Club,
            crate::models::CreateClubRequest,
            crate::models::UpdateClubRequest,
            crate::models::MembershipRequest,

            // Events
            crate::models::Event,
            crate::models::CreateEventRequest,
            crate::models::UpdateEventRequest,
            crate::models::RegisterRequest,
        )
    ),
    tags(
        (name = "Users", description = "Accounts, login, profile pictures, and the user side of memberships."),
        (name = "Clubs", description = "Club catalog and membership."),
        (name = "Events", description = "Event catalog, registration and attendance."),
        (name = "Health", description = "Health check and request counters."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from POST /api/users/login"))
                        .build()
                ),
            );
        }
    }
}
