//! The fixed set of derived note views served through the cache.
//!
//! Each owner has one cache entry per view; a view is only ever replaced
//! whole or deleted, never patched in place. The enum is the single place
//! that knows each view's TTL and result cap, so the cache manager and the
//! database query layer cannot drift apart.

use uuid::Uuid;

use crate::defaults;

/// A derived view of one owner's notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Not trashed (archived notes included); the default listing.
    Active,
    /// Archived and not trashed.
    Archived,
    /// Trashed.
    Trashed,
    /// Pinned, not archived, not trashed.
    Pinned,
    /// Notes carrying a specific label, not trashed.
    ByLabel(Uuid),
    /// Full-text search over title and content, not trashed.
    /// The query is stored normalized (trimmed, lower-cased).
    Search(String),
}

impl View {
    /// Build a search view with the query normalized up front, so two
    /// spellings of the same query share one cache entry.
    pub fn search(query: &str) -> Self {
        View::Search(normalize_query(query))
    }

    /// TTL for this view's cache entry, in seconds.
    pub fn ttl_secs(&self) -> u64 {
        match self {
            View::Search(_) => defaults::SEARCH_TTL_SECS,
            _ => defaults::VIEW_TTL_SECS,
        }
    }

    /// Maximum number of notes the view query returns.
    pub fn limit(&self) -> i64 {
        match self {
            View::Search(_) => defaults::SEARCH_LIMIT,
            _ => defaults::VIEW_LIMIT,
        }
    }

    /// Stable view name used as the key segment after the owner id.
    ///
    /// `ByLabel` and `Search` append a qualifier segment; for search that
    /// happens in the cache layer, which hashes the normalized query.
    pub fn name(&self) -> &'static str {
        match self {
            View::Active => "all",
            View::Archived => "archived",
            View::Trashed => "trash",
            View::Pinned => "pinned",
            View::ByLabel(_) => "label",
            View::Search(_) => "search",
        }
    }
}

/// Normalize a free-text search query before it is hashed into a cache key
/// or bound into a search query: trim and lowercase.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}
