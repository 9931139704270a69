use axum::{
    extract::{rejection::JsonRejection, FromRef, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use super::{
    dto::{
        AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest, RegisteredUser,
        UpdateProfileRequest, VerifyEmailQuery, VerifyEmailRequest, VerifyEmailResponse,
    },
    jwt::{AuthUser, JwtKeys},
    password::verify_password,
    services::{create_user, issue_verification_token, normalize_email, update_user, UserUpdate},
};
use crate::{
    email,
    error::{ApiError, ApiResult, StoreError},
    state::AppState,
};

/// Where a successful email verification lands.
pub const EMAIL_VERIFIED_PATH: &str = "/email-verified";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route(
            "/auth/verify-email",
            post(request_verification).get(confirm_verification),
        )
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).patch(update_me))
}

fn token_pair(keys: &JwtKeys, user_id: uuid::Uuid) -> ApiResult<(String, String)> {
    let access_token = keys.sign_access(user_id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        ApiError::Internal(e)
    })?;
    let refresh_token = keys.sign_refresh(user_id).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        ApiError::Internal(e)
    })?;
    Ok((access_token, refresh_token))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisteredUser>)> {
    let Json(mut payload) = payload?;
    payload.name = payload.name.trim().to_string();
    payload.email = normalize_email(&payload.email);

    if let Err(errors) = payload.validate() {
        warn!(email = %payload.email, "registration validation failed");
        return Err(errors.into());
    }

    let user = create_user(
        state.users.as_ref(),
        &payload.name,
        &payload.email,
        &payload.password,
    )
    .await
    .inspect_err(|e| {
        if matches!(e, ApiError::Conflict(_)) {
            warn!(email = %payload.email, "email already registered");
        }
    })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            id: user.id,
            name: user.name,
            email: user.email,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(payload) = payload?;
    let email = normalize_email(&payload.email);
    let invalid = || ApiError::Unauthorized;

    let user = match state.users.get_by_email(&email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %email, "login unknown email");
            return Err(invalid());
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(e.into());
        }
    };

    if !verify_password(&payload.password, user.password_hash.as_deref())? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = token_pair(&keys, user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        ApiError::Unauthorized
    })?;

    let user = state
        .users
        .get_by_id(claims.sub)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let (access_token, refresh_token) = token_pair(&keys, user.id)?;
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<PublicUser>> {
    let user = state.users.get_by_id(user_id).await?.ok_or_else(|| {
        warn!(user_id = %user_id, "session user not found");
        ApiError::Unauthorized
    })?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<Json<PublicUser>> {
    let Json(mut payload) = payload?;
    payload.name = payload.name.map(|n| n.trim().to_string());
    payload.validate()?;

    let update = UserUpdate {
        name: payload.name,
        image: payload.image,
        password: payload.password,
    };
    let user = update_user(state.users.as_ref(), user_id, update)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn request_verification(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<VerifyEmailRequest>, JsonRejection>,
) -> ApiResult<Json<VerifyEmailResponse>> {
    let Json(payload) = payload?;
    let raw = payload.email.unwrap_or_default();
    if let Err(rejection) = email::validate(raw.trim()) {
        warn!(user_id = %user_id, reason = rejection.reason(), "verification email rejected");
        return Err(ApiError::BadRequest(rejection.message().into()));
    }
    let address = normalize_email(&raw);

    if let Some(holder) = state.users.get_by_email(&address).await? {
        if holder.id != user_id {
            warn!(user_id = %user_id, email = %address, "verification for address held by another account");
            return Err(ApiError::Conflict("Email is already in use".into()));
        }
    }

    let cfg = &state.config.verification;
    let token =
        issue_verification_token(state.tokens.as_ref(), user_id, &address, cfg.ttl_hours).await?;

    info!(user_id = %user_id, email = %address, "verification token issued");
    Ok(Json(VerifyEmailResponse {
        message: "Verification email sent".into(),
        token: cfg.expose_token.then_some(token.token),
    }))
}

#[instrument(skip(state, query))]
pub async fn confirm_verification(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> ApiResult<Response> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Token is required".into()))?;

    let redeemed = match state.tokens.redeem(&token, OffsetDateTime::now_utc()).await {
        Ok(Some(record)) => record,
        Ok(None) => return Err(ApiError::BadRequest("Invalid or expired token".into())),
        Err(StoreError::AlreadyExists) => {
            warn!("verified address taken by another account");
            return Err(ApiError::BadRequest("Email is already in use".into()));
        }
        Err(e) => {
            error!(error = %e, "redeem verification token failed");
            return Err(e.into());
        }
    };

    info!(user_id = %redeemed.user_id, email = %redeemed.email, "email verified");
    Ok((StatusCode::FOUND, [(header::LOCATION, EMAIL_VERIFIED_PATH)]).into_response())
}
