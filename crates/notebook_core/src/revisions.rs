//! crates/notebook_core/src/revisions.rs
//!
//! Bounded page history.

use std::sync::Arc;

use crate::domain::PageRevision;
use crate::ports::{NotebookStore, PortResult};

/// How many snapshots each page keeps.
pub const MAX_REVISIONS_PER_PAGE: usize = 10;

/// Appends snapshots and keeps each page's history within a fixed window.
///
/// Recency follows the store's monotonic revision id rather than timestamps,
/// which can collide under rapid saves.
#[derive(Clone)]
pub struct RevisionStore {
    store: Arc<dyn NotebookStore>,
    retain: usize,
}

impl RevisionStore {
    pub fn new(store: Arc<dyn NotebookStore>) -> Self {
        Self {
            store,
            retain: MAX_REVISIONS_PER_PAGE,
        }
    }

    /// Number of snapshots kept per page.
    pub fn retention(&self) -> usize {
        self.retain
    }

    /// Snapshots `safe_html` without touching the page itself, then prunes the
    /// page's history, as one storage transaction.
    ///
    /// Content saves do not come through here: `NotebookStore::update_page`
    /// appends their revision in the page write's own transaction, using the
    /// window from [`RevisionStore::retention`]. Both paths share one window.
    pub async fn record(&self, page_id: i64, safe_html: &str) -> PortResult<PageRevision> {
        self.store
            .append_revision(page_id, safe_html, self.retain)
            .await
    }

    /// Newest first.
    pub async fn history(&self, page_id: i64) -> PortResult<Vec<PageRevision>> {
        self.store.list_revisions(page_id).await
    }
}
