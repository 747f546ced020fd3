//! crates/notebook_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};

/// A registered account. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Only used internally for sign-in and password changes - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Everything needed to insert a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}

/// Optional profile fields supplied at signup.
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
    pub username: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}

/// A partial profile update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.profile_picture.is_none()
    }
}

/// A notebook owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl BookUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// A page of sanitized rich text inside a book.
///
/// `word_count` is derived from `content_html` and is only ever written
/// together with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub id: i64,
    pub book_id: i64,
    pub title: String,
    pub content_html: String,
    pub word_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPage {
    pub book_id: i64,
    pub title: String,
    pub content_html: String,
    pub word_count: i64,
}

/// A client's requested page edit, before sanitization.
#[derive(Debug, Clone, Default)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub content_html: Option<String>,
}

/// A sanitized content write plus the revision window it must respect.
#[derive(Debug, Clone)]
pub struct ContentChange {
    pub content_html: String,
    pub word_count: i64,
    pub retain_revisions: usize,
}

/// What the store applies to a page in one transaction.
#[derive(Debug, Clone, Default)]
pub struct PageChanges {
    pub title: Option<String>,
    pub content: Option<ContentChange>,
}

/// An immutable snapshot of a page's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRevision {
    pub id: i64,
    pub page_id: i64,
    pub content_html: String,
    pub created_at: DateTime<Utc>,
}

/// The claims recovered from a verified session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub expires_at: i64,
}
