use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;
use url::form_urlencoded;

use super::jwt::{bearer_token, JwtKeys};
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/auth/login";

/// Path prefixes that require a session; anonymous callers are sent to login.
pub const PROTECTED_PREFIXES: &[&str] = &["/dashboard", "/profile"];

pub fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

pub fn login_redirect_target(original_path: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(original_path.as_bytes()).collect();
    format!("{LOGIN_PATH}?callbackUrl={encoded}")
}

pub async fn require_session(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if !is_protected(&path) {
        return next.run(req).await;
    }

    let keys = JwtKeys::from_ref(&state);
    let authenticated = bearer_token(req.headers())
        .map(|token| keys.verify_access(token).is_ok())
        .unwrap_or(false);

    if authenticated {
        next.run(req).await
    } else {
        debug!(%path, "anonymous request to protected path");
        Redirect::temporary(&login_redirect_target(&path)).into_response()
    }
}
