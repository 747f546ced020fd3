//! crates/notebook_core/src/memory.rs
//!
//! An in-process `NotebookStore` used by tests.
//!
//! All state sits behind one mutex, so every trait method is atomic with
//! respect to every other, including append-then-prune of revisions.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::domain::{
    Book, BookUpdate, NewPage, NewUser, Page, PageChanges, PageRevision, ProfileUpdate, User,
    UserCredentials,
};
use crate::ports::{NotebookStore, PortError, PortResult};

#[derive(Default)]
struct State {
    next_id: i64,
    users: BTreeMap<i64, UserCredentials>,
    books: BTreeMap<i64, Book>,
    pages: BTreeMap<i64, Page>,
    revisions: BTreeMap<i64, PageRevision>,
}

impl State {
    // One sequence for every table keeps ids distinct across entity kinds,
    // which makes accidental cross-table lookups fail loudly in tests.
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|c| c.user.email == email && Some(c.user.id) != except)
    }

    fn touch_book(&mut self, book_id: i64) {
        if let Some(book) = self.books.get_mut(&book_id) {
            book.updated_at = Utc::now();
        }
    }

    fn append_revision(&mut self, page_id: i64, content_html: &str, retain: usize) -> PageRevision {
        let revision = PageRevision {
            id: self.next_id(),
            page_id,
            content_html: content_html.to_string(),
            created_at: Utc::now(),
        };
        self.revisions.insert(revision.id, revision.clone());

        let mut ids: Vec<i64> = self
            .revisions
            .values()
            .filter(|r| r.page_id == page_id)
            .map(|r| r.id)
            .collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        for stale in ids.into_iter().skip(retain) {
            self.revisions.remove(&stale);
        }
        revision
    }

    fn remove_page(&mut self, page_id: i64) {
        self.pages.remove(&page_id);
        self.revisions.retain(|_, r| r.page_id != page_id);
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotebookStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> PortResult<User> {
        let mut state = self.state.lock();
        if state.email_taken(&new.email, None) {
            return Err(PortError::Conflict(format!("Email {} already exists", new.email)));
        }
        let now = Utc::now();
        let user = User {
            id: state.next_id(),
            email: new.email,
            username: new.username,
            phone: new.phone,
            profile_picture: new.profile_picture,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(user)
    }

    async fn get_user(&self, user_id: i64) -> PortResult<Option<User>> {
        Ok(self.state.lock().users.get(&user_id).map(|c| c.user.clone()))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        Ok(self
            .state
            .lock()
            .users
            .values()
            .find(|c| c.user.email == email)
            .cloned())
    }

    async fn get_credentials_by_id(&self, user_id: i64) -> PortResult<Option<UserCredentials>> {
        Ok(self.state.lock().users.get(&user_id).cloned())
    }

    async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> PortResult<User> {
        let mut state = self.state.lock();
        if let Some(email) = &update.email {
            if state.email_taken(email, Some(user_id)) {
                return Err(PortError::Conflict(format!("Email {} already exists", email)));
            }
        }
        let creds = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        let user = &mut creds.user;
        if let Some(username) = update.username {
            user.username = Some(username);
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone);
        }
        if let Some(picture) = update.profile_picture {
            user.profile_picture = Some(picture);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_password_hash(&self, user_id: i64, password_hash: &str) -> PortResult<()> {
        let mut state = self.state.lock();
        let creds = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        creds.password_hash = password_hash.to_string();
        creds.user.updated_at = Utc::now();
        Ok(())
    }

    async fn list_books(&self, user_id: i64) -> PortResult<Vec<Book>> {
        let mut books: Vec<Book> = self
            .state
            .lock()
            .books
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut books, |b| (b.updated_at, b.id));
        Ok(books)
    }

    async fn find_book_by_title(&self, user_id: i64, title: &str) -> PortResult<Option<Book>> {
        Ok(self
            .state
            .lock()
            .books
            .values()
            .find(|b| b.user_id == user_id && b.title == title)
            .cloned())
    }

    async fn find_book_by_id(&self, user_id: i64, book_id: i64) -> PortResult<Option<Book>> {
        Ok(self
            .state
            .lock()
            .books
            .get(&book_id)
            .filter(|b| b.user_id == user_id)
            .cloned())
    }

    async fn create_book(
        &self,
        user_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> PortResult<Book> {
        let mut state = self.state.lock();
        let now = Utc::now();
        let book = Book {
            id: state.next_id(),
            user_id,
            title: title.to_string(),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update_book(&self, book_id: i64, update: BookUpdate) -> PortResult<Book> {
        let mut state = self.state.lock();
        let book = state
            .books
            .get_mut(&book_id)
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))?;
        if let Some(title) = update.title {
            book.title = title;
        }
        if let Some(description) = update.description {
            book.description = Some(description);
        }
        book.updated_at = Utc::now();
        Ok(book.clone())
    }

    async fn delete_book(&self, book_id: i64) -> PortResult<()> {
        let mut state = self.state.lock();
        state.books.remove(&book_id);
        let pages: Vec<i64> = state
            .pages
            .values()
            .filter(|p| p.book_id == book_id)
            .map(|p| p.id)
            .collect();
        for page_id in pages {
            state.remove_page(page_id);
        }
        Ok(())
    }

    async fn list_pages(&self, book_id: i64) -> PortResult<Vec<Page>> {
        let mut pages: Vec<Page> = self
            .state
            .lock()
            .pages
            .values()
            .filter(|p| p.book_id == book_id)
            .cloned()
            .collect();
        newest_first(&mut pages, |p| (p.updated_at, p.id));
        Ok(pages)
    }

    async fn find_page_by_title(&self, book_id: i64, title: &str) -> PortResult<Option<Page>> {
        Ok(self
            .state
            .lock()
            .pages
            .values()
            .find(|p| p.book_id == book_id && p.title == title)
            .cloned())
    }

    async fn find_page_by_id(&self, book_id: i64, page_id: i64) -> PortResult<Option<Page>> {
        Ok(self
            .state
            .lock()
            .pages
            .get(&page_id)
            .filter(|p| p.book_id == book_id)
            .cloned())
    }

    async fn create_page(&self, new: NewPage) -> PortResult<Page> {
        let mut state = self.state.lock();
        if !state.books.contains_key(&new.book_id) {
            return Err(PortError::NotFound(format!("Book {} not found", new.book_id)));
        }
        let now = Utc::now();
        let page = Page {
            id: state.next_id(),
            book_id: new.book_id,
            title: new.title,
            content_html: new.content_html,
            word_count: new.word_count,
            created_at: now,
            updated_at: now,
        };
        state.pages.insert(page.id, page.clone());
        state.touch_book(page.book_id);
        Ok(page)
    }

    async fn update_page(&self, page_id: i64, changes: PageChanges) -> PortResult<Page> {
        let mut state = self.state.lock();
        let page = state
            .pages
            .get_mut(&page_id)
            .ok_or_else(|| PortError::NotFound(format!("Page {} not found", page_id)))?;
        if let Some(title) = changes.title {
            page.title = title;
        }
        if let Some(content) = &changes.content {
            page.content_html = content.content_html.clone();
            page.word_count = content.word_count;
        }
        page.updated_at = Utc::now();
        let page = page.clone();

        if let Some(content) = changes.content {
            state.append_revision(page_id, &content.content_html, content.retain_revisions);
        }
        state.touch_book(page.book_id);
        Ok(page)
    }

    async fn delete_page(&self, page_id: i64) -> PortResult<()> {
        let mut state = self.state.lock();
        if let Some(book_id) = state.pages.get(&page_id).map(|p| p.book_id) {
            state.remove_page(page_id);
            state.touch_book(book_id);
        }
        Ok(())
    }

    async fn append_revision(
        &self,
        page_id: i64,
        content_html: &str,
        retain: usize,
    ) -> PortResult<PageRevision> {
        let mut state = self.state.lock();
        if !state.pages.contains_key(&page_id) {
            return Err(PortError::NotFound(format!("Page {} not found", page_id)));
        }
        Ok(state.append_revision(page_id, content_html, retain))
    }

    async fn list_revisions(&self, page_id: i64) -> PortResult<Vec<PageRevision>> {
        Ok(self
            .state
            .lock()
            .revisions
            .values()
            .rev()
            .filter(|r| r.page_id == page_id)
            .cloned()
            .collect())
    }
}
