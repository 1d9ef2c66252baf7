//! Cache-aside orchestration over the per-owner note views.
//!
//! Owns the key schema and the invalidation policy. Keys are namespaced
//! `notes:<owner_id>:<view>[:<qualifier>]`, so every view for one owner
//! sits behind a single prefix and one bulk delete clears them all. The
//! invalidation is deliberately coarse: a mutation drops every view for
//! the owner rather than reasoning about which views it touched, trading
//! post-write hit rate for the impossibility of a stale view surviving
//! inside its TTL.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use carnet_core::{defaults, View};

use crate::client::CacheClient;

/// View cache manager bound to a cache client.
#[derive(Clone)]
pub struct ViewCache {
    client: CacheClient,
}

impl ViewCache {
    /// Create a view cache over the given client.
    pub fn new(client: CacheClient) -> Self {
        Self { client }
    }

    /// Access the underlying client.
    pub fn client(&self) -> &CacheClient {
        &self.client
    }

    /// Key prefix shared by every cached view of one owner.
    pub fn owner_prefix(owner_id: Uuid) -> String {
        format!("{}:{}:", defaults::CACHE_NAMESPACE, owner_id)
    }

    /// Deterministic cache key for one owner's view.
    ///
    /// Search queries arrive already normalized (trim + lowercase) via
    /// `View::search`; the key carries the first 16 hex chars of their
    /// SHA-256 rather than raw user text.
    pub fn key(owner_id: Uuid, view: &View) -> String {
        let prefix = Self::owner_prefix(owner_id);
        match view {
            View::ByLabel(label_id) => format!("{prefix}label:{label_id}"),
            View::Search(query) => {
                let mut hasher = Sha256::new();
                hasher.update(query.as_bytes());
                let hash = hex::encode(hasher.finalize());
                format!("{prefix}search:{}", &hash[..16])
            }
            _ => format!("{prefix}{}", view.name()),
        }
    }

    /// Read a cached view snapshot. Any cache failure is a miss.
    pub async fn get<T: serde::de::DeserializeOwned>(
        &self,
        owner_id: Uuid,
        view: &View,
    ) -> Option<T> {
        self.client.get(&Self::key(owner_id, view)).await
    }

    /// Store a view snapshot with the view's TTL. Entries are immutable:
    /// a view is only ever replaced whole here or deleted by
    /// [`invalidate_owner`](Self::invalidate_owner).
    pub async fn store<T: serde::Serialize>(
        &self,
        owner_id: Uuid,
        view: &View,
        value: &T,
    ) -> bool {
        self.client
            .set(&Self::key(owner_id, view), value, view.ttl_secs())
            .await
    }

    /// Drop every cached view for one owner in a single bulk delete.
    /// Idempotent: an owner with nothing cached is a successful no-op.
    pub async fn invalidate_owner(&self, owner_id: Uuid) -> bool {
        self.client
            .delete_prefix(&Self::owner_prefix(owner_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Uuid {
        Uuid::nil()
    }

    #[test]
    fn test_listing_keys() {
        let o = owner();
        assert_eq!(
            ViewCache::key(o, &View::Active),
            format!("notes:{o}:all")
        );
        assert_eq!(
            ViewCache::key(o, &View::Archived),
            format!("notes:{o}:archived")
        );
        assert_eq!(
            ViewCache::key(o, &View::Trashed),
            format!("notes:{o}:trash")
        );
        assert_eq!(
            ViewCache::key(o, &View::Pinned),
            format!("notes:{o}:pinned")
        );
    }

    #[test]
    fn test_label_key_carries_label_id() {
        let label = Uuid::now_v7();
        let key = ViewCache::key(owner(), &View::ByLabel(label));
        assert_eq!(key, format!("notes:{}:label:{label}", owner()));
    }

    #[test]
    fn test_all_keys_share_owner_prefix() {
        let o = Uuid::now_v7();
        let prefix = ViewCache::owner_prefix(o);
        for view in [
            View::Active,
            View::Archived,
            View::Trashed,
            View::Pinned,
            View::ByLabel(Uuid::now_v7()),
            View::search("rust"),
        ] {
            assert!(ViewCache::key(o, &view).starts_with(&prefix));
        }
    }

    #[test]
    fn test_search_key_is_normalized_and_hashed() {
        let o = owner();
        let a = ViewCache::key(o, &View::search("  Meeting Notes "));
        let b = ViewCache::key(o, &View::search("meeting notes"));
        assert_eq!(a, b);

        let c = ViewCache::key(o, &View::search("different"));
        assert_ne!(a, c);

        // 16-hex qualifier, not raw user text
        let qualifier = a.rsplit(':').next().unwrap();
        assert_eq!(qualifier.len(), 16);
        assert!(qualifier.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_keys_are_owner_isolated() {
        let a = ViewCache::key(Uuid::now_v7(), &View::Active);
        let b = ViewCache::key(Uuid::now_v7(), &View::Active);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_invalidate_owner_without_backend_is_noop() {
        let cache = ViewCache::new(CacheClient::disabled());
        // Fail-safe contract: no backend means no-op, not panic or error.
        cache.invalidate_owner(owner()).await;
        let miss: Option<Vec<String>> = cache.get(owner(), &View::Active).await;
        assert!(miss.is_none());
    }
}
