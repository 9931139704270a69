use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::link_type::LinkType;
use super::repo_types::Link;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    pub user_id: Option<Uuid>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub link_type: Option<LinkType>,
}

/// `userId` is not accepted here; ownership never changes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLinkRequest {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub link_type: Option<LinkType>,
}

#[derive(Debug, Serialize)]
pub struct CreatedLinkResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct UpdatedLinkResponse {
    pub success: bool,
    pub link: Link,
}

#[derive(Debug, Serialize)]
pub struct DeletedLinkResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Trim, drop blanks and collapse duplicates, keeping first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
