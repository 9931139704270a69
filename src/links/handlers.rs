use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use super::{
    dto::{
        normalize_tags, CreateLinkRequest, CreatedLinkResponse, DeletedLinkResponse,
        SearchQuery, UpdateLinkRequest, UpdatedLinkResponse,
    },
    link_type::classify,
    repo_types::{Link, LinkFacets, LinkPatch, NewLink},
};
use crate::{
    auth::jwt::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn link_routes() -> Router<AppState> {
    Router::new()
        .route("/links", get(list_links).post(create_link))
        .route("/links/search", get(search_links))
        .route("/links/facets", get(link_facets))
        .route(
            "/links/:id",
            get(get_link).patch(update_link).delete(delete_link),
        )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Url and title are mandatory and the url must parse.
fn require_url_and_title(url: Option<String>, title: Option<String>) -> ApiResult<(String, String)> {
    let (Some(url), Some(title)) = (non_blank(url), non_blank(title)) else {
        return Err(ApiError::BadRequest("URL and title are required".into()));
    };
    if Url::parse(&url).is_err() {
        return Err(ApiError::BadRequest("Invalid URL format".into()));
    }
    Ok((url, title))
}

/// Existence first, then ownership.
async fn load_owned(state: &AppState, user_id: Uuid, raw_id: &str) -> ApiResult<Link> {
    let not_found = || ApiError::NotFound("Link not found".into());
    let id = Uuid::parse_str(raw_id).map_err(|_| not_found())?;

    let link = state
        .links
        .get_by_id(id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, link_id = %id, "get_by_id failed");
            ApiError::from(e)
        })?
        .ok_or_else(not_found)?;

    if link.user_id != user_id {
        warn!(%user_id, link_id = %id, "access to foreign link");
        return Err(ApiError::Forbidden("Forbidden".into()));
    }
    Ok(link)
}

#[instrument(skip(state))]
pub async fn list_links(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<Link>>> {
    let links = state.links.list(user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "list links failed");
        ApiError::from(e)
    })?;
    Ok(Json(links))
}

#[instrument(skip(state, payload))]
pub async fn create_link(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, HeaderMap, Json<CreatedLinkResponse>)> {
    let Json(body) = payload?;
    let (url, title) = require_url_and_title(body.url, body.title)?;

    if body.user_id != Some(user_id) {
        warn!(%user_id, claimed = ?body.user_id, "create link for another user");
        return Err(ApiError::Forbidden("Invalid user ID".into()));
    }

    let link_type = body.link_type.unwrap_or_else(|| classify(&url));
    let new_link = NewLink {
        user_id,
        url,
        title,
        description: body.description.unwrap_or_default(),
        tags: normalize_tags(body.tags.unwrap_or_default()),
        category: body.category.map(|c| c.trim().to_string()).unwrap_or_default(),
        link_type,
    };

    let id = state.links.create(new_link).await.map_err(|e| {
        error!(error = %e, %user_id, "create link failed");
        ApiError::from(e)
    })?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/links/{id}")) {
        headers.insert(header::LOCATION, location);
    }

    info!(%user_id, link_id = %id, %link_type, "link created");
    Ok((StatusCode::CREATED, headers, Json(CreatedLinkResponse { id })))
}

#[instrument(skip(state))]
pub async fn get_link(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Link>> {
    let link = load_owned(&state, user_id, &id).await?;
    Ok(Json(link))
}

#[instrument(skip(state, payload))]
pub async fn update_link(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateLinkRequest>, JsonRejection>,
) -> ApiResult<Json<UpdatedLinkResponse>> {
    let existing = load_owned(&state, user_id, &id).await?;

    let Json(body) = payload?;
    let (url, title) = require_url_and_title(body.url, body.title)?;
    let link_type = body.link_type.unwrap_or_else(|| classify(&url));

    let patch = LinkPatch {
        url: Some(url),
        title: Some(title),
        description: body.description,
        tags: body.tags.map(normalize_tags),
        category: body.category.map(|c| c.trim().to_string()),
        link_type: Some(link_type),
    };

    let link = state
        .links
        .update(existing.id, patch)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, link_id = %existing.id, "update link failed");
            ApiError::from(e)
        })?
        .ok_or_else(|| ApiError::NotFound("Link not found".into()))?;

    info!(%user_id, link_id = %link.id, "link updated");
    Ok(Json(UpdatedLinkResponse {
        success: true,
        link,
    }))
}

#[instrument(skip(state))]
pub async fn delete_link(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedLinkResponse>> {
    let existing = load_owned(&state, user_id, &id).await?;
    state.links.delete(existing.id).await.map_err(|e| {
        error!(error = %e, %user_id, link_id = %existing.id, "delete link failed");
        ApiError::from(e)
    })?;

    info!(%user_id, link_id = %existing.id, "link deleted");
    Ok(Json(DeletedLinkResponse { success: true }))
}

#[instrument(skip(state))]
pub async fn search_links(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Link>>> {
    let q = non_blank(query.q).ok_or_else(|| ApiError::BadRequest("Query is required".into()))?;
    let links = state.links.search(user_id, &q).await.map_err(|e| {
        error!(error = %e, %user_id, "search links failed");
        ApiError::from(e)
    })?;
    Ok(Json(links))
}

#[instrument(skip(state))]
pub async fn link_facets(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<LinkFacets>> {
    let facets = state.links.facets(user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "link facets failed");
        ApiError::from(e)
    })?;
    Ok(Json(facets))
}
