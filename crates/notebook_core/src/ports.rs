//! crates/notebook_core/src/ports.rs
//!
//! Defines the storage contract for the application's core logic.
//! The trait forms the boundary of the hexagonal architecture, allowing the core
//! to stay independent of the concrete database.

use async_trait::async_trait;

use crate::domain::{
    Book, BookUpdate, NewPage, NewUser, Page, PageChanges, PageRevision, ProfileUpdate, User,
    UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The backend could not be reached (connection refused, pool exhausted).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Port
//=========================================================================================

/// Persistence for users, books, pages and page revisions.
///
/// Lookups that may legitimately miss return `Ok(None)`; `PortError::NotFound`
/// is reserved for writes addressed at a row that disappeared underneath them.
/// Title lookups that match several rows return the one with the lowest id.
#[async_trait]
pub trait NotebookStore: Send + Sync {
    // --- Users ---
    /// Fails with `PortError::Conflict` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    async fn get_user(&self, user_id: i64) -> PortResult<Option<User>>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>>;

    async fn get_credentials_by_id(&self, user_id: i64) -> PortResult<Option<UserCredentials>>;

    /// Fails with `PortError::Conflict` when the new email belongs to another user.
    async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> PortResult<User>;

    async fn update_password_hash(&self, user_id: i64, password_hash: &str) -> PortResult<()>;

    // --- Books ---
    /// Most recently updated first.
    async fn list_books(&self, user_id: i64) -> PortResult<Vec<Book>>;

    async fn find_book_by_title(&self, user_id: i64, title: &str) -> PortResult<Option<Book>>;

    async fn find_book_by_id(&self, user_id: i64, book_id: i64) -> PortResult<Option<Book>>;

    async fn create_book(
        &self,
        user_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> PortResult<Book>;

    async fn update_book(&self, book_id: i64, update: BookUpdate) -> PortResult<Book>;

    /// Removes the book together with its pages and their revisions.
    async fn delete_book(&self, book_id: i64) -> PortResult<()>;

    // --- Pages ---
    /// Most recently updated first.
    async fn list_pages(&self, book_id: i64) -> PortResult<Vec<Page>>;

    async fn find_page_by_title(&self, book_id: i64, title: &str) -> PortResult<Option<Page>>;

    async fn find_page_by_id(&self, book_id: i64, page_id: i64) -> PortResult<Option<Page>>;

    async fn create_page(&self, page: NewPage) -> PortResult<Page>;

    /// Applies `changes` atomically. A content change also appends a revision
    /// and prunes the page's history to `retain_revisions` entries before the
    /// transaction commits.
    async fn update_page(&self, page_id: i64, changes: PageChanges) -> PortResult<Page>;

    /// Removes the page together with its revisions.
    async fn delete_page(&self, page_id: i64) -> PortResult<()>;

    // --- Revisions ---
    /// Appends a snapshot, then keeps only the `retain` newest for the page,
    /// in one transaction.
    async fn append_revision(
        &self,
        page_id: i64,
        content_html: &str,
        retain: usize,
    ) -> PortResult<PageRevision>;

    /// Newest first, ordered by the monotonic revision id.
    async fn list_revisions(&self, page_id: i64) -> PortResult<Vec<PageRevision>>;
}
