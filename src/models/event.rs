use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{event_time, string_set, Capacity};
use crate::database::{Collection, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Owning club id, if any.
    #[serde(default)]
    pub club: Option<String>,
    #[serde(default)]
    pub category: String,
    /// `None` only for older documents whose date was missing or unreadable.
    #[serde(default, with = "event_time::stored")]
    #[schema(value_type = Option<String>, example = "2025-05-01T18:00:00")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(default, with = "event_time::stored")]
    #[schema(value_type = Option<String>, example = "2025-05-01T20:00:00")]
    pub end_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    #[schema(value_type = String, example = "unlimited")]
    pub capacity: Capacity,
    #[serde(default)]
    pub requires_registration: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "string_set::deserialize")]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl Record for Event {
    const COLLECTION: Collection = Collection::Events;

    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[serde(default)]
    pub title: String,
    pub club: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    pub location: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub capacity: Option<Capacity>,
    #[serde(default)]
    pub requires_registration: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub club: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub capacity: Option<Capacity>,
    pub requires_registration: Option<bool>,
}
