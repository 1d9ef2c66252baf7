//! # carnet-core
//!
//! Core types, traits, and abstractions for the carnet note service.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other carnet crates depend on: note and label models, the
//! notification message format, the repository and queue traits, the error
//! taxonomy, and shared defaults.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod uuid_utils;
pub mod views;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
pub use uuid_utils::new_v7;
pub use views::{normalize_query, View};
