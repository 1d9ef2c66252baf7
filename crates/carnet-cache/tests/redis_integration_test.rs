//! Integration tests against a live Redis instance.
//!
//! Ignored by default. Run with:
//!
//! ```sh
//! REDIS_URL=redis://localhost:6379 cargo test -p carnet-cache -- --ignored
//! ```

use carnet_cache::{CacheClient, ViewCache};
use carnet_core::View;
use uuid::Uuid;

fn setup_client() -> CacheClient {
    let url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    CacheClient::new(&url)
}

#[tokio::test]
#[ignore]
async fn test_set_get_delete_roundtrip() {
    let client = setup_client();
    let key = format!("test:{}", Uuid::now_v7());

    assert_eq!(client.get::<String>(&key).await, None);
    assert!(client.set(&key, &"value".to_string(), 60).await);
    assert_eq!(client.get::<String>(&key).await, Some("value".to_string()));

    assert!(client.delete(&key).await);
    assert_eq!(client.get::<String>(&key).await, None);
}

#[tokio::test]
#[ignore]
async fn test_entry_expires_after_ttl() {
    let client = setup_client();
    let key = format!("test:{}", Uuid::now_v7());

    assert!(client.set(&key, &"short-lived".to_string(), 1).await);
    assert!(client.get::<String>(&key).await.is_some());

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
    assert_eq!(client.get::<String>(&key).await, None);
}

#[tokio::test]
#[ignore]
async fn test_prefix_invalidation_is_scoped() {
    let client = setup_client();
    let views = ViewCache::new(client.clone());

    let owner_a = Uuid::now_v7();
    let owner_b = Uuid::now_v7();
    let payload = vec!["snapshot".to_string()];

    assert!(views.store(owner_a, &View::Active, &payload).await);
    assert!(views.store(owner_a, &View::search("milk"), &payload).await);
    assert!(views.store(owner_b, &View::Active, &payload).await);

    assert!(views.invalidate_owner(owner_a).await);

    assert_eq!(views.get::<Vec<String>>(owner_a, &View::Active).await, None);
    assert_eq!(
        views.get::<Vec<String>>(owner_a, &View::search("milk")).await,
        None
    );
    // The other owner's entries are untouched.
    assert_eq!(
        views.get::<Vec<String>>(owner_b, &View::Active).await,
        Some(payload)
    );
}

#[tokio::test]
#[ignore]
async fn test_invalidating_empty_owner_is_a_noop_success() {
    let client = setup_client();
    let views = ViewCache::new(client);

    assert!(views.invalidate_owner(Uuid::now_v7()).await);
}

#[tokio::test]
#[ignore]
async fn test_connection_recovers_after_close() {
    let client = setup_client();
    let key = format!("test:{}", Uuid::now_v7());

    assert!(client.set(&key, &1u32, 60).await);
    client.close().await;

    // Next call reconnects lazily.
    assert_eq!(client.get::<u32>(&key).await, Some(1));
    client.delete(&key).await;
}
