use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserChanges, UserRow, VerificationToken};
use crate::error::StoreError;

/// Account records. Email uniqueness is enforced by the store itself.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Fails with [`StoreError::AlreadyExists`] when the email is taken.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError>;
}

/// Pending email verification tokens.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn insert(&self, token: VerificationToken) -> Result<(), StoreError>;
    /// Delete a live token and mark its email verified on the owning user,
    /// as one unit. `None` when the token is unknown, expired or its user is
    /// gone. When the email belongs to another account this fails with
    /// [`StoreError::AlreadyExists`] and the token is left in place.
    async fn redeem(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<VerificationToken>, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, image, email_verified, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        row.map(User::try_from).transpose()
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, image, email_verified, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        row.map(User::try_from).transpose()
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (name, email, password_hash, image, created_at, updated_at)
            VALUES ($1, $2, $3, $4, now(), now())
            RETURNING id, name, email, password_hash, image, email_verified, created_at, updated_at
            "#,
        )
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.image)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        User::try_from(row)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
               SET name          = COALESCE($2, name),
                   image         = COALESCE($3, image),
                   password_hash = COALESCE($4, password_hash),
                   updated_at    = now()
             WHERE id = $1
            RETURNING id, name, email, password_hash, image, email_verified, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.image)
        .bind(changes.password_hash)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        row.map(User::try_from).transpose()
    }
}

#[derive(Clone)]
pub struct PgVerificationStore {
    db: PgPool,
}

impl PgVerificationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VerificationStore for PgVerificationStore {
    async fn insert(&self, token: VerificationToken) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO verification_tokens (token, user_id, email, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(token.token)
        .bind(token.user_id)
        .bind(token.email)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn redeem(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<VerificationToken>, StoreError> {
        // Dropping `tx` without commit rolls back, so the token survives any
        // failure below.
        let mut tx = self.db.begin().await.map_err(StoreError::from_sqlx)?;

        let Some(record) = sqlx::query_as::<_, VerificationToken>(
            r#"
            DELETE FROM verification_tokens
             WHERE token = $1 AND expires_at > $2
            RETURNING token, user_id, email, expires_at, created_at
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?
        else {
            return Ok(None);
        };

        let updated = sqlx::query(
            r#"
            UPDATE users
               SET email = $2, email_verified = now(), updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(record.user_id)
        .bind(&record.email)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        tx.commit().await.map_err(StoreError::from_sqlx)?;
        Ok(Some(record))
    }
}
