use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Session token flavour. Only access tokens open a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Session claims carried by every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

impl Claims {
    pub fn issue(
        user_id: Uuid,
        kind: TokenKind,
        ttl: Duration,
        issuer: &str,
        audience: &str,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        let exp = now + time::Duration::seconds(ttl.as_secs() as i64);
        Self {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: issuer.to_string(),
            aud: audience.to_string(),
            kind,
        }
    }
}
