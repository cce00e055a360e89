pub mod auth_service;
pub mod club_service;
pub mod event_service;
pub mod relationship;
pub mod upload_service;
pub mod user_service;
