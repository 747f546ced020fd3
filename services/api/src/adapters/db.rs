//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `NotebookStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notebook_core::domain::{
    Book, BookUpdate, NewPage, NewUser, Page, PageChanges, PageRevision, ProfileUpdate, User,
    UserCredentials,
};
use notebook_core::ports::{NotebookStore, PortError, PortResult};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;

const USER_COLUMNS: &str =
    "id, email, password_hash, username, phone, profile_picture, created_at, updated_at";
const BOOK_COLUMNS: &str = "id, user_id, title, description, created_at, updated_at";
const PAGE_COLUMNS: &str = "id, book_id, title, content_html, word_count, created_at, updated_at";
const REVISION_COLUMNS: &str = "id, page_id, content_html, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `NotebookStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Sorts `sqlx` failures into the port's categories.
fn port_error(e: sqlx::Error) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            PortError::NotFound(db.message().to_string())
        }
        sqlx::Error::RowNotFound => PortError::NotFound(e.to_string()),
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => {
            PortError::Unavailable(e.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    email: String,
    password_hash: String,
    username: Option<String>,
    phone: Option<String>,
    profile_picture: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            user: User {
                id: self.id,
                email: self.email,
                username: self.username,
                phone: self.phone,
                profile_picture: self.profile_picture,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            password_hash: self.password_hash,
        }
    }

    fn to_domain(self) -> User {
        self.to_credentials().user
    }
}

#[derive(FromRow)]
struct BookRecord {
    id: i64,
    user_id: i64,
    title: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl BookRecord {
    fn to_domain(self) -> Book {
        Book {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct PageRecord {
    id: i64,
    book_id: i64,
    title: String,
    content_html: String,
    word_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl PageRecord {
    fn to_domain(self) -> Page {
        Page {
            id: self.id,
            book_id: self.book_id,
            title: self.title,
            content_html: self.content_html,
            word_count: self.word_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct RevisionRecord {
    id: i64,
    page_id: i64,
    content_html: String,
    created_at: DateTime<Utc>,
}
impl RevisionRecord {
    fn to_domain(self) -> PageRevision {
        PageRevision {
            id: self.id,
            page_id: self.page_id,
            content_html: self.content_html,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// Transaction Helpers
//=========================================================================================

/// Appends a revision and prunes the page's history to the `retain` newest.
/// Must run inside a transaction that already holds the page row lock.
async fn append_and_prune(
    conn: &mut PgConnection,
    page_id: i64,
    content_html: &str,
    retain: usize,
) -> PortResult<PageRevision> {
    let record = sqlx::query_as::<_, RevisionRecord>(&format!(
        "INSERT INTO page_revisions (page_id, content_html) VALUES ($1, $2) RETURNING {REVISION_COLUMNS}"
    ))
    .bind(page_id)
    .bind(content_html)
    .fetch_one(&mut *conn)
    .await
    .map_err(port_error)?;

    let pruned = sqlx::query(
        "DELETE FROM page_revisions WHERE page_id = $1 AND id NOT IN (
            SELECT id FROM page_revisions WHERE page_id = $1 ORDER BY id DESC LIMIT $2
        )",
    )
    .bind(page_id)
    .bind(retain as i64)
    .execute(&mut *conn)
    .await
    .map_err(port_error)?;
    if pruned.rows_affected() > 0 {
        debug!(page_id, pruned = pruned.rows_affected(), "pruned page revisions");
    }

    Ok(record.to_domain())
}

/// Locks the book that owns `page_id` and returns its id.
///
/// Page writes take the book lock before any page lock, the same order
/// `DELETE FROM books` cascades in.
async fn lock_owning_book(conn: &mut PgConnection, page_id: i64) -> PortResult<Option<i64>> {
    sqlx::query_scalar::<_, i64>(
        "SELECT b.id FROM books b JOIN pages p ON p.book_id = b.id
         WHERE p.id = $1 FOR UPDATE OF b",
    )
    .bind(page_id)
    .fetch_optional(conn)
    .await
    .map_err(port_error)
}

async fn touch_book(conn: &mut PgConnection, book_id: i64) -> PortResult<()> {
    sqlx::query("UPDATE books SET updated_at = NOW() WHERE id = $1")
        .bind(book_id)
        .execute(conn)
        .await
        .map_err(port_error)?;
    Ok(())
}

//=========================================================================================
// `NotebookStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl NotebookStore for DbAdapter {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (email, password_hash, username, phone, profile_picture)
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.username)
        .bind(&user.phone)
        .bind(&user.profile_picture)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.to_domain())
    }

    async fn get_user(&self, user_id: i64) -> PortResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.map(UserRecord::to_domain))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.map(UserRecord::to_credentials))
    }

    async fn get_credentials_by_id(&self, user_id: i64) -> PortResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.map(UserRecord::to_credentials))
    }

    async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                profile_picture = COALESCE($5, profile_picture),
                updated_at = NOW()
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(update.username)
        .bind(update.email)
        .bind(update.phone)
        .bind(update.profile_picture)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn update_password_hash(&self, user_id: i64, password_hash: &str) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(port_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn list_books(&self, user_id: i64) -> PortResult<Vec<Book>> {
        let records = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE user_id = $1 ORDER BY updated_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn find_book_by_title(&self, user_id: i64, title: &str) -> PortResult<Option<Book>> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE user_id = $1 AND title = $2 ORDER BY id ASC LIMIT 1"
        ))
        .bind(user_id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.map(BookRecord::to_domain))
    }

    async fn find_book_by_id(&self, user_id: i64, book_id: i64) -> PortResult<Option<Book>> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE user_id = $1 AND id = $2"
        ))
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.map(BookRecord::to_domain))
    }

    async fn create_book(
        &self,
        user_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "INSERT INTO books (user_id, title, description) VALUES ($1, $2, $3) RETURNING {BOOK_COLUMNS}"
        ))
        .bind(user_id)
        .bind(title)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.to_domain())
    }

    async fn update_book(&self, book_id: i64, update: BookUpdate) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "UPDATE books SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                updated_at = NOW()
             WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(book_id)
        .bind(update.title)
        .bind(update.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))?;
        Ok(record.to_domain())
    }

    async fn delete_book(&self, book_id: i64) -> PortResult<()> {
        // Pages and revisions go with it through ON DELETE CASCADE.
        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id)
            .execute(&self.pool)
            .await
            .map_err(port_error)?;
        Ok(())
    }

    async fn list_pages(&self, book_id: i64) -> PortResult<Vec<Page>> {
        let records = sqlx::query_as::<_, PageRecord>(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE book_id = $1 ORDER BY updated_at DESC, id DESC"
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn find_page_by_title(&self, book_id: i64, title: &str) -> PortResult<Option<Page>> {
        let record = sqlx::query_as::<_, PageRecord>(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE book_id = $1 AND title = $2 ORDER BY id ASC LIMIT 1"
        ))
        .bind(book_id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.map(PageRecord::to_domain))
    }

    async fn find_page_by_id(&self, book_id: i64, page_id: i64) -> PortResult<Option<Page>> {
        let record = sqlx::query_as::<_, PageRecord>(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE book_id = $1 AND id = $2"
        ))
        .bind(book_id)
        .bind(page_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(record.map(PageRecord::to_domain))
    }

    async fn create_page(&self, page: NewPage) -> PortResult<Page> {
        let mut tx = self.pool.begin().await.map_err(port_error)?;
        let record = sqlx::query_as::<_, PageRecord>(&format!(
            "INSERT INTO pages (book_id, title, content_html, word_count)
             VALUES ($1, $2, $3, $4) RETURNING {PAGE_COLUMNS}"
        ))
        .bind(page.book_id)
        .bind(&page.title)
        .bind(&page.content_html)
        .bind(page.word_count)
        .fetch_one(&mut *tx)
        .await
        .map_err(port_error)?;
        touch_book(&mut tx, page.book_id).await?;
        tx.commit().await.map_err(port_error)?;
        Ok(record.to_domain())
    }

    async fn update_page(&self, page_id: i64, changes: PageChanges) -> PortResult<Page> {
        let mut tx = self.pool.begin().await.map_err(port_error)?;
        let book_id = lock_owning_book(&mut tx, page_id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Page {} not found", page_id)))?;
        touch_book(&mut tx, book_id).await?;

        // The UPDATE takes the page's row lock, so concurrent saves to the same
        // page queue here and each sees the previous one's revisions.
        let (content_html, word_count) = match &changes.content {
            Some(content) => (Some(content.content_html.as_str()), Some(content.word_count)),
            None => (None, None),
        };
        let record = sqlx::query_as::<_, PageRecord>(&format!(
            "UPDATE pages SET
                title = COALESCE($2, title),
                content_html = COALESCE($3, content_html),
                word_count = COALESCE($4, word_count),
                updated_at = NOW()
             WHERE id = $1 RETURNING {PAGE_COLUMNS}"
        ))
        .bind(page_id)
        .bind(changes.title.as_deref())
        .bind(content_html)
        .bind(word_count)
        .fetch_optional(&mut *tx)
        .await
        .map_err(port_error)?
        .ok_or_else(|| PortError::NotFound(format!("Page {} not found", page_id)))?;

        if let Some(content) = &changes.content {
            append_and_prune(&mut tx, page_id, &content.content_html, content.retain_revisions)
                .await?;
        }

        tx.commit().await.map_err(port_error)?;
        Ok(record.to_domain())
    }

    async fn delete_page(&self, page_id: i64) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(port_error)?;
        let Some(book_id) = lock_owning_book(&mut tx, page_id).await? else {
            return Ok(());
        };
        touch_book(&mut tx, book_id).await?;
        // Revisions go with it through ON DELETE CASCADE.
        sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(page_id)
            .execute(&mut *tx)
            .await
            .map_err(port_error)?;
        tx.commit().await.map_err(port_error)?;
        Ok(())
    }

    async fn append_revision(
        &self,
        page_id: i64,
        content_html: &str,
        retain: usize,
    ) -> PortResult<PageRevision> {
        let mut tx = self.pool.begin().await.map_err(port_error)?;
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM pages WHERE id = $1 FOR UPDATE")
                .bind(page_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(port_error)?;
        if locked.is_none() {
            return Err(PortError::NotFound(format!("Page {} not found", page_id)));
        }
        let revision = append_and_prune(&mut tx, page_id, content_html, retain).await?;
        tx.commit().await.map_err(port_error)?;
        Ok(revision)
    }

    async fn list_revisions(&self, page_id: i64) -> PortResult<Vec<PageRevision>> {
        let records = sqlx::query_as::<_, RevisionRecord>(&format!(
            "SELECT {REVISION_COLUMNS} FROM page_revisions WHERE page_id = $1 ORDER BY id DESC"
        ))
        .bind(page_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
