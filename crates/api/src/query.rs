//! Shared query parameter types for API handlers.

use serde::Deserialize;

use fieldwatch_db::store::Page;

/// Maximum page size for event listings.
pub const MAX_LIMIT: i64 = 100;

/// Default page size for event listings.
pub const DEFAULT_LIMIT: i64 = 20;

/// Generic pagination parameters (`?limit=&offset=`).
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    /// Resolve into a [`Page`], clamping the limit to `1..=100` and the
    /// offset to non-negative.
    pub fn to_page(&self) -> Page {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        Page::new(limit, offset)
    }
}
