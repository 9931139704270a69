use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::link_type::LinkType;
use crate::error::StoreError;

/// Raw `links` row as stored.
#[derive(Debug, Clone, FromRow)]
pub struct LinkRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub link_type: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Saved bookmark owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: String,
    pub link_type: LinkType,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<LinkRow> for Link {
    type Error = StoreError;

    fn try_from(row: LinkRow) -> Result<Self, Self::Error> {
        let link_type = match row.link_type.as_deref() {
            None | Some("") => LinkType::Website,
            Some(raw) => raw.parse::<LinkType>().map_err(|e| StoreError::Decode {
                entity: "link",
                reason: format!("{} on {}", e, row.id),
            })?,
        };
        Ok(Link {
            id: row.id,
            user_id: row.user_id,
            url: row.url,
            title: row.title,
            description: row.description.unwrap_or_default(),
            tags: row.tags.unwrap_or_default(),
            category: row.category.unwrap_or_default(),
            link_type,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Link as submitted for insertion; timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub user_id: Uuid,
    pub url: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: String,
    pub link_type: LinkType,
}

/// Fields to overwrite on update. Ownership cannot be reassigned.
#[derive(Debug, Clone, Default)]
pub struct LinkPatch {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub link_type: Option<LinkType>,
}

/// Distinct values across a user's links.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkFacets {
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub link_types: Vec<LinkType>,
}
