//! # carnet-cache
//!
//! Fail-safe Redis cache layer for carnet.
//!
//! Two pieces:
//! - [`CacheClient`]: thin key-value client over a lazily established,
//!   shared `ConnectionManager`. Backend failures become misses/no-ops.
//! - [`ViewCache`]: cache-aside manager for the per-owner note views,
//!   owning the key schema, TTL policy, and coarse per-owner invalidation.

pub mod client;
pub mod views;

pub use client::CacheClient;
pub use views::ViewCache;
