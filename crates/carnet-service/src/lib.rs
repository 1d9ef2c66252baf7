//! # carnet-service
//!
//! The orchestration layer tying the pieces together: Postgres
//! persistence, the fail-safe Redis view cache, label resolution, and
//! best-effort share notifications.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use carnet_cache::{CacheClient, ViewCache};
//! use carnet_db::Database;
//! use carnet_notify::NotificationProducer;
//! use carnet_service::NoteService;
//!
//! let db = Database::connect("postgres://...").await?;
//! let views = ViewCache::new(CacheClient::from_env());
//! let producer = NotificationProducer::new(Arc::new(db.queue.clone()));
//! let service = NoteService::new(db, views, producer);
//!
//! let notes = service.active_notes(owner_id).await?;
//! ```

pub mod notes;

pub use notes::NoteService;
