//! In-process stores backing unit tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::{UserStore, VerificationStore};
use crate::auth::repo_types::{NewUser, User, UserChanges, VerificationToken};
use crate::error::StoreError;
use crate::links::link_type::LinkType;
use crate::links::repo::LinkStore;
use crate::links::repo_types::{Link, LinkPatch, NewLink};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    // insertion order; newest last
    links: Vec<Link>,
    tokens: HashMap<String, VerificationToken>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut guard = self.inner.lock().expect("memory store poisoned");
        f(&mut guard)
    }

    fn newest_first<'a>(links: impl Iterator<Item = &'a Link>) -> Vec<Link> {
        // reversed insertion order keeps ties newest-first under a stable sort
        let mut out: Vec<Link> = links.cloned().collect();
        out.reverse();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }
}

fn apply_patch(patch: LinkPatch, link: &mut Link) {
    if let Some(url) = patch.url {
        link.url = url;
    }
    if let Some(title) = patch.title {
        link.title = title;
    }
    if let Some(description) = patch.description {
        link.description = description;
    }
    if let Some(tags) = patch.tags {
        link.tags = tags;
    }
    if let Some(category) = patch.category {
        link.category = category;
    }
    if let Some(link_type) = patch.link_type {
        link.link_type = link_type;
    }
}

fn search_hit(link: &Link, needle: &str) -> bool {
    let has = |s: &str| s.to_lowercase().contains(needle);
    has(&link.title)
        || has(&link.description)
        || has(&link.url)
        || has(&link.category)
        || has(link.link_type.as_str())
        || link.tags.iter().any(|t| has(t))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.with(|s| s.users.iter().find(|u| u.email == email).cloned()))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.with(|s| s.users.iter().find(|u| u.id == id).cloned()))
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        self.with(|s| {
            if s.users.iter().any(|u| u.email == user.email) {
                return Err(StoreError::AlreadyExists);
            }
            let now = OffsetDateTime::now_utc();
            let record = User {
                id: Uuid::new_v4(),
                name: user.name,
                email: user.email,
                password_hash: user.password_hash,
                image: user.image,
                email_verified: None,
                created_at: now,
                updated_at: now,
            };
            s.users.push(record.clone());
            Ok(record)
        })
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        Ok(self.with(|s| {
            let user = s.users.iter_mut().find(|u| u.id == id)?;
            if let Some(name) = changes.name {
                user.name = name;
            }
            if let Some(image) = changes.image {
                user.image = Some(image);
            }
            if let Some(hash) = changes.password_hash {
                user.password_hash = Some(hash);
            }
            user.updated_at = OffsetDateTime::now_utc();
            Some(user.clone())
        }))
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    async fn insert(&self, token: VerificationToken) -> Result<(), StoreError> {
        self.with(|s| {
            if s.tokens.contains_key(&token.token) {
                return Err(StoreError::AlreadyExists);
            }
            s.tokens.insert(token.token.clone(), token);
            Ok(())
        })
    }

    async fn redeem(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<VerificationToken>, StoreError> {
        self.with(|s| {
            let Some(record) = s.tokens.get(token).filter(|t| t.expires_at > now).cloned() else {
                return Ok(None);
            };
            if s
                .users
                .iter()
                .any(|u| u.id != record.user_id && u.email == record.email)
            {
                return Err(StoreError::AlreadyExists);
            }
            let Some(user) = s.users.iter_mut().find(|u| u.id == record.user_id) else {
                return Ok(None);
            };
            user.email = record.email.clone();
            user.email_verified = Some(now);
            user.updated_at = now;
            s.tokens.remove(token);
            Ok(Some(record))
        })
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Link>, StoreError> {
        Ok(self.with(|s| Self::newest_first(s.links.iter().filter(|l| l.user_id == user_id))))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Link>, StoreError> {
        Ok(self.with(|s| s.links.iter().find(|l| l.id == id).cloned()))
    }

    async fn create(&self, link: NewLink) -> Result<Uuid, StoreError> {
        let now = OffsetDateTime::now_utc();
        let id = Uuid::new_v4();
        self.with(|s| {
            s.links.push(Link {
                id,
                user_id: link.user_id,
                url: link.url,
                title: link.title,
                description: link.description,
                tags: link.tags,
                category: link.category,
                link_type: link.link_type,
                created_at: now,
                updated_at: now,
            })
        });
        Ok(id)
    }

    async fn update(&self, id: Uuid, patch: LinkPatch) -> Result<Option<Link>, StoreError> {
        Ok(self.with(|s| {
            let link = s.links.iter_mut().find(|l| l.id == id)?;
            apply_patch(patch, link);
            link.updated_at = OffsetDateTime::now_utc();
            Some(link.clone())
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.with(|s| s.links.retain(|l| l.id != id));
        Ok(())
    }

    async fn distinct_tags(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        Ok(self.with(|s| {
            s.links
                .iter()
                .filter(|l| l.user_id == user_id)
                .flat_map(|l| l.tags.iter().filter(|t| !t.is_empty()).cloned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        }))
    }

    async fn distinct_categories(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        Ok(self.with(|s| {
            s.links
                .iter()
                .filter(|l| l.user_id == user_id && !l.category.is_empty())
                .map(|l| l.category.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        }))
    }

    async fn distinct_link_types(&self, user_id: Uuid) -> Result<Vec<LinkType>, StoreError> {
        Ok(self.with(|s| {
            s.links
                .iter()
                .filter(|l| l.user_id == user_id)
                .map(|l| l.link_type)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        }))
    }

    async fn search(&self, user_id: Uuid, query: &str) -> Result<Vec<Link>, StoreError> {
        let needle = query.to_lowercase();
        Ok(self.with(|s| {
            Self::newest_first(
                s.links
                    .iter()
                    .filter(|l| l.user_id == user_id && search_hit(l, &needle)),
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_link(user_id: Uuid, title: &str, tags: &[&str], category: &str, kind: LinkType) -> NewLink {
        NewLink {
            user_id,
            url: format!("https://example.com/{title}"),
            title: title.into(),
            description: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            category: category.into(),
            link_type: kind,
        }
    }

    #[tokio::test]
    async fn list_is_scoped_and_newest_first() {
        let store = MemoryStore::default();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        store.create(new_link(alice, "one", &[], "", LinkType::Website)).await.unwrap();
        store.create(new_link(bob, "theirs", &[], "", LinkType::Website)).await.unwrap();
        store.create(new_link(alice, "two", &[], "", LinkType::Website)).await.unwrap();

        let titles: Vec<String> = store
            .list(alice)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.title)
            .collect();
        assert_eq!(titles, vec!["two", "one"]);
    }

    #[tokio::test]
    async fn create_then_get_preserves_fields() {
        let store = MemoryStore::default();
        let user = Uuid::new_v4();
        let id = store
            .create(new_link(user, "axum", &["dev"], "tools", LinkType::Github))
            .await
            .unwrap();
        let link = LinkStore::get_by_id(&store, id).await.unwrap().unwrap();
        assert_eq!(link.user_id, user);
        assert_eq!(link.title, "axum");
        assert_eq!(link.tags, vec!["dev".to_string()]);
        assert_eq!(link.category, "tools");
        assert_eq!(link.link_type, LinkType::Github);
        assert!(link.updated_at >= link.created_at);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::default();
        let id = store
            .create(new_link(Uuid::new_v4(), "gone", &[], "", LinkType::Website))
            .await
            .unwrap();
        store.delete(id).await.unwrap();
        assert!(LinkStore::get_by_id(&store, id).await.unwrap().is_none());
        store.delete(id).await.unwrap();
    }

    #[tokio::test]
    async fn facets_collapse_duplicates_and_skip_empty() {
        let store = MemoryStore::default();
        let user = Uuid::new_v4();
        store.create(new_link(user, "a", &["dev", "rust"], "tools", LinkType::Github)).await.unwrap();
        store.create(new_link(user, "b", &["dev", ""], "", LinkType::Github)).await.unwrap();
        store.create(new_link(user, "c", &[], "home", LinkType::Youtube)).await.unwrap();
        store.create(new_link(Uuid::new_v4(), "d", &["other"], "x", LinkType::Reddit)).await.unwrap();

        let facets = store.facets(user).await.unwrap();
        assert_eq!(facets.tags, vec!["dev", "rust"]);
        assert_eq!(facets.categories, vec!["home", "tools"]);
        assert_eq!(facets.link_types, vec![LinkType::Youtube, LinkType::Github]);
    }

    #[tokio::test]
    async fn search_covers_link_type_and_tags() {
        let store = MemoryStore::default();
        let user = Uuid::new_v4();
        store.create(new_link(user, "axum", &["Web"], "", LinkType::Github)).await.unwrap();
        store.create(new_link(user, "clip", &[], "", LinkType::Youtube)).await.unwrap();

        let hits = store.search(user, "YOUTUBE").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "clip");

        let hits = store.search(user, "web").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "axum");

        assert!(store.search(Uuid::new_v4(), "axum").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unique_email_enforced_on_insert() {
        let store = MemoryStore::default();
        let user = NewUser {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: None,
            image: None,
        };
        UserStore::insert(&store, user.clone()).await.unwrap();
        assert!(matches!(
            UserStore::insert(&store, user).await,
            Err(StoreError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn patch_only_touches_supplied_fields() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        let id = store
            .create(new_link(owner, "axum", &["web"], "tools", LinkType::Github))
            .await
            .unwrap();
        let patch = LinkPatch {
            title: Some("Renamed".into()),
            tags: Some(vec!["dev".into()]),
            ..Default::default()
        };
        let link = LinkStore::update(&store, id, patch).await.unwrap().unwrap();
        assert_eq!(link.title, "Renamed");
        assert_eq!(link.tags, vec!["dev".to_string()]);
        assert_eq!(link.url, "https://example.com/axum");
        assert_eq!(link.category, "tools");
        assert_eq!(link.link_type, LinkType::Github);
        assert_eq!(link.user_id, owner);
    }

    fn pending(token: &str, user_id: Uuid, email: &str) -> VerificationToken {
        let now = OffsetDateTime::now_utc();
        VerificationToken {
            token: token.into(),
            user_id,
            email: email.into(),
            expires_at: now + time::Duration::hours(1),
            created_at: now,
        }
    }

    async fn account(store: &MemoryStore, email: &str) -> User {
        let user = NewUser {
            name: "Ada".into(),
            email: email.into(),
            password_hash: None,
            image: None,
        };
        UserStore::insert(store, user).await.unwrap()
    }

    #[tokio::test]
    async fn redeem_verifies_and_is_single_use() {
        let store = MemoryStore::default();
        let user = account(&store, "ada@example.com").await;
        VerificationStore::insert(&store, pending("t1", user.id, "ada@work.example.org"))
            .await
            .unwrap();

        let now = OffsetDateTime::now_utc();
        let record = store.redeem("t1", now).await.unwrap().unwrap();
        assert_eq!(record.email, "ada@work.example.org");

        let user = UserStore::get_by_id(&store, user.id).await.unwrap().unwrap();
        assert_eq!(user.email, "ada@work.example.org");
        assert!(user.email_verified.is_some());

        assert!(store.redeem("t1", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn redeem_of_taken_email_keeps_token() {
        let store = MemoryStore::default();
        account(&store, "ann@example.com").await;
        let bob = account(&store, "bob@example.com").await;
        VerificationStore::insert(&store, pending("t2", bob.id, "ann@example.com"))
            .await
            .unwrap();

        let now = OffsetDateTime::now_utc();
        for _ in 0..2 {
            assert!(matches!(
                store.redeem("t2", now).await,
                Err(StoreError::AlreadyExists)
            ));
        }
        let bob = UserStore::get_by_id(&store, bob.id).await.unwrap().unwrap();
        assert_eq!(bob.email, "bob@example.com");
        assert!(bob.email_verified.is_none());
    }
}
