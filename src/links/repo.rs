use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::link_type::LinkType;
use super::repo_types::{Link, LinkFacets, LinkPatch, LinkRow, NewLink};
use crate::error::StoreError;

/// Persistent collection of links. Every read is decoded into a typed [`Link`].
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// All links owned by `user_id`, newest first.
    async fn list(&self, user_id: Uuid) -> Result<Vec<Link>, StoreError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Link>, StoreError>;
    /// Insert a link; `created_at` and `updated_at` are set to now.
    async fn create(&self, link: NewLink) -> Result<Uuid, StoreError>;
    /// Overwrite the supplied fields and refresh `updated_at`.
    async fn update(&self, id: Uuid, patch: LinkPatch) -> Result<Option<Link>, StoreError>;
    /// Hard delete. Deleting a missing id is not an error.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    async fn distinct_tags(&self, user_id: Uuid) -> Result<Vec<String>, StoreError>;
    async fn distinct_categories(&self, user_id: Uuid) -> Result<Vec<String>, StoreError>;
    async fn distinct_link_types(&self, user_id: Uuid) -> Result<Vec<LinkType>, StoreError>;
    /// Case-insensitive substring search over title, description, url,
    /// category, link type and tags. Newest first.
    async fn search(&self, user_id: Uuid, query: &str) -> Result<Vec<Link>, StoreError>;

    async fn facets(&self, user_id: Uuid) -> Result<LinkFacets, StoreError> {
        Ok(LinkFacets {
            tags: self.distinct_tags(user_id).await?,
            categories: self.distinct_categories(user_id).await?,
            link_types: self.distinct_link_types(user_id).await?,
        })
    }
}

#[derive(Clone)]
pub struct PgLinkStore {
    db: PgPool,
}

impl PgLinkStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn decode_all(rows: Vec<LinkRow>) -> Result<Vec<Link>, StoreError> {
    rows.into_iter().map(Link::try_from).collect()
}

#[async_trait]
impl LinkStore for PgLinkStore {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Link>, StoreError> {
        let rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, user_id, url, title, description, tags, category, link_type,
                   created_at, updated_at
            FROM links
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        decode_all(rows)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Link>, StoreError> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, user_id, url, title, description, tags, category, link_type,
                   created_at, updated_at
            FROM links
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        row.map(Link::try_from).transpose()
    }

    async fn create(&self, link: NewLink) -> Result<Uuid, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO links (user_id, url, title, description, tags, category, link_type,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())
            RETURNING id
            "#,
        )
        .bind(link.user_id)
        .bind(link.url)
        .bind(link.title)
        .bind(link.description)
        .bind(link.tags)
        .bind(link.category)
        .bind(link.link_type.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(id)
    }

    async fn update(&self, id: Uuid, patch: LinkPatch) -> Result<Option<Link>, StoreError> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            UPDATE links
               SET url         = COALESCE($2, url),
                   title       = COALESCE($3, title),
                   description = COALESCE($4, description),
                   tags        = COALESCE($5, tags),
                   category    = COALESCE($6, category),
                   link_type   = COALESCE($7, link_type),
                   updated_at  = now()
             WHERE id = $1
            RETURNING id, user_id, url, title, description, tags, category, link_type,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.url)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.tags)
        .bind(patch.category)
        .bind(patch.link_type.map(LinkType::as_str))
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        row.map(Link::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM links WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn distinct_tags(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        let mut tags = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT tag
            FROM links, unnest(tags) AS tag
            WHERE user_id = $1 AND tag <> ''
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        tags.sort();
        Ok(tags)
    }

    async fn distinct_categories(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        let mut categories = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT category
            FROM links
            WHERE user_id = $1 AND category <> ''
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        categories.sort();
        Ok(categories)
    }

    async fn distinct_link_types(&self, user_id: Uuid) -> Result<Vec<LinkType>, StoreError> {
        let raw = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT link_type
            FROM links
            WHERE user_id = $1 AND link_type <> ''
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;

        let mut types = raw
            .iter()
            .map(|s| {
                s.parse::<LinkType>().map_err(|e| StoreError::Decode {
                    entity: "link_type",
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        types.sort();
        types.dedup();
        Ok(types)
    }

    async fn search(&self, user_id: Uuid, query: &str) -> Result<Vec<Link>, StoreError> {
        let rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, user_id, url, title, description, tags, category, link_type,
                   created_at, updated_at
            FROM links
            WHERE user_id = $1
              AND (
                   strpos(lower(title), lower($2)) > 0
                OR strpos(lower(description), lower($2)) > 0
                OR strpos(lower(url), lower($2)) > 0
                OR strpos(lower(category), lower($2)) > 0
                OR strpos(lower(link_type), lower($2)) > 0
                OR EXISTS (
                    SELECT 1 FROM unnest(tags) AS tag
                    WHERE strpos(lower(tag), lower($2)) > 0
                )
              )
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(query)
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        decode_all(rows)
    }
}
