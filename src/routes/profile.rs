use std::collections::HashSet;

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::{error, instrument, warn};

use crate::{
    auth::{dto::PublicUser, jwt::AuthUser},
    error::{ApiError, ApiResult},
    links::repo_types::Link,
    state::AppState,
};

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub total_links: usize,
    pub total_categories: usize,
    pub total_tags: usize,
}

impl ProfileStats {
    pub fn from_links(links: &[Link]) -> Self {
        let categories: HashSet<&str> = links
            .iter()
            .map(|l| l.category.as_str())
            .filter(|c| !c.is_empty())
            .collect();
        let tags: HashSet<&str> = links
            .iter()
            .flat_map(|l| l.tags.iter().map(String::as_str))
            .collect();
        Self {
            total_links: links.len(),
            total_categories: categories.len(),
            total_tags: tags.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: PublicUser,
    pub stats: ProfileStats,
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let user = state.users.get_by_id(user_id).await?.ok_or_else(|| {
        warn!(%user_id, "session user not found");
        ApiError::Unauthorized
    })?;
    let links = state.links.list(user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "profile links failed");
        ApiError::from(e)
    })?;

    Ok(Json(ProfileResponse {
        user: user.into(),
        stats: ProfileStats::from_links(&links),
    }))
}
