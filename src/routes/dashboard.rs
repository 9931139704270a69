use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::{
    auth::jwt::AuthUser,
    error::{ApiError, ApiResult},
    links::{
        filter::LinkFilter,
        link_type::LinkType,
        repo_types::Link,
    },
    state::AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub links: Vec<Link>,
    /// Number of links before filtering.
    pub total: usize,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub link_types: Vec<LinkType>,
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(filter): Query<LinkFilter>,
) -> ApiResult<Json<DashboardResponse>> {
    let all = state.links.list(user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "dashboard links failed");
        ApiError::from(e)
    })?;
    let facets = state.links.facets(user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "dashboard facets failed");
        ApiError::from(e)
    })?;

    let links: Vec<Link> = filter.apply(&all).into_iter().cloned().collect();
    if !filter.is_empty() {
        debug!(%user_id, matched = links.len(), total = all.len(), "dashboard filter applied");
    }
    Ok(Json(DashboardResponse {
        total: all.len(),
        links,
        tags: facets.tags,
        categories: facets.categories,
        link_types: facets.link_types,
    }))
}
