use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{string_set, Capacity};
use crate::database::{Collection, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[schema(value_type = String, example = "unlimited")]
    pub capacity: Capacity,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "string_set::deserialize")]
    pub members: Vec<String>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Club {
    /// A fresh club whose creator is its first member.
    pub fn new(id: String, name: String, category: String, creator: &str) -> Self {
        Self {
            id,
            name,
            category,
            description: String::new(),
            capacity: Capacity::Unlimited,
            image: None,
            members: vec![creator.to_string()],
            created_by: creator.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Record for Club {
    const COLLECTION: Collection = Collection::Clubs;

    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateClubRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub capacity: Option<Capacity>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateClubRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub capacity: Option<Capacity>,
}

/// Body of `add-member`, `remove-member`, `add-attendee`, `remove-attendee`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MembershipRequest {
    #[serde(default)]
    pub username: String,
}

/// Body of `register`; the acting user when `username` is absent.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: Option<String>,
}
