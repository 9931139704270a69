use rand::RngCore;
use time::{Duration, OffsetDateTime};
use tracing::{error, info};
use uuid::Uuid;

use super::password::hash_password;
use super::repo::{UserStore, VerificationStore};
use super::repo_types::{NewUser, User, UserChanges, VerificationToken};
use crate::error::{ApiError, ApiResult, StoreError};

/// Trimmed, lower-cased form used for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash the password and insert the account. A taken email surfaces as
/// [`ApiError::Conflict`], decided by the store's uniqueness constraint.
pub async fn create_user(
    users: &dyn UserStore,
    name: &str,
    email: &str,
    password: &str,
) -> ApiResult<User> {
    let password_hash = hash_password(password)?;
    let new_user = NewUser {
        name: name.trim().to_string(),
        email: normalize_email(email),
        password_hash: Some(password_hash),
        image: None,
    };
    match users.insert(new_user).await {
        Ok(user) => {
            info!(user_id = %user.id, email = %user.email, "user created");
            Ok(user)
        }
        Err(StoreError::AlreadyExists) => Err(ApiError::Conflict(
            "User with this email already exists".into(),
        )),
        Err(e) => {
            error!(error = %e, "insert user failed");
            Err(e.into())
        }
    }
}

/// Plaintext profile changes; a new password is re-hashed before storage.
#[derive(Debug, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub image: Option<String>,
    pub password: Option<String>,
}

pub async fn update_user(
    users: &dyn UserStore,
    id: Uuid,
    update: UserUpdate,
) -> ApiResult<Option<User>> {
    let password_hash = match update.password.as_deref() {
        Some(plain) => Some(hash_password(plain)?),
        None => None,
    };
    let changes = UserChanges {
        name: update.name.map(|n| n.trim().to_string()),
        image: update.image,
        password_hash,
    };
    Ok(users.update(id, changes).await?)
}

/// 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub async fn issue_verification_token(
    tokens: &dyn VerificationStore,
    user_id: Uuid,
    email: &str,
    ttl_hours: i64,
) -> Result<VerificationToken, StoreError> {
    let now = OffsetDateTime::now_utc();
    let token = VerificationToken {
        token: generate_token(),
        user_id,
        email: email.to_string(),
        expires_at: now + Duration::hours(ttl_hours),
        created_at: now,
    };
    tokens.insert(token.clone()).await?;
    Ok(token)
}
