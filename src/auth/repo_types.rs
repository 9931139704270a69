use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;

/// Raw `users` row.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub image: Option<String>,
    pub email_verified: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Account record. `password_hash` is absent for accounts created through an
/// external identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub image: Option<String>,
    pub email_verified: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        if row.email.trim().is_empty() {
            return Err(StoreError::Decode {
                entity: "user",
                reason: format!("empty email on {}", row.id),
            });
        }
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash.filter(|h| !h.is_empty()),
            image: row.image.filter(|i| !i.is_empty()),
            email_verified: row.email_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Account to insert. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub image: Option<String>,
}

/// Stored fields to overwrite on update.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub image: Option<String>,
    pub password_hash: Option<String>,
}

/// Single-use email ownership proof.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct VerificationToken {
    pub token: String,
    pub user_id: Uuid,
    pub email: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}
