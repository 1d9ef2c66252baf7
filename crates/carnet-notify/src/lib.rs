//! # carnet-notify
//!
//! Durable email notifications for shared notes.
//!
//! This crate provides:
//! - A producer that publishes collaboration-invite emails to the queue
//! - A sequential worker that claims, delivers, and acknowledges them
//! - Delivery adapters: an HTTP relay for real email, a mock for local use
//! - An in-memory queue double for tests
//!
//! Delivery is at-least-once: a message is acknowledged only after the
//! adapter reports success, so a crash mid-delivery results in a retry,
//! never a lost email.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use carnet_notify::{EmailConfig, NotifyWorker, WorkerConfig};
//! use carnet_db::Database;
//!
//! let db = Database::connect("postgres://...").await?;
//! let delivery = EmailConfig::from_env().build();
//! let worker = NotifyWorker::new(Arc::new(db.queue), delivery, WorkerConfig::from_env());
//!
//! let handle = worker.start();
//! // ...
//! handle.shutdown().await?;
//! ```

pub mod delivery;
pub mod memory;
pub mod producer;
pub mod worker;

pub use delivery::{EmailConfig, EmailDelivery, HttpRelayDelivery, MockDelivery};
pub use memory::MemoryQueue;
pub use producer::NotificationProducer;
pub use worker::{NotifyWorker, WorkerConfig, WorkerEvent, WorkerHandle};
