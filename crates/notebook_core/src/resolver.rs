//! crates/notebook_core/src/resolver.rs
//!
//! Owner-scoped lookup of books and pages from caller-supplied identifiers.
//!
//! An identifier is either a title or a numeric id. Titles are tried first, so
//! a book titled "42" shadows the book whose id is 42 for the same owner.

use std::sync::Arc;

use crate::domain::{Book, Page};
use crate::ports::{NotebookStore, PortResult};

/// One attempt at locating an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    ByTitle(String),
    ById(i64),
}

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<T> {
    Found(T),
    NotFound,
}

impl<T> Resolved<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Resolved::Found(value) => Some(value),
            Resolved::NotFound => None,
        }
    }
}

impl<T> From<Option<T>> for Resolved<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Resolved::NotFound, Resolved::Found)
    }
}

/// Expands a raw identifier into the ordered lookups to attempt.
///
/// The title is percent-decoded; input that does not decode is compared
/// verbatim. An id lookup follows only when the raw identifier is an integer.
pub fn lookup_plan(identifier: &str) -> Vec<Lookup> {
    let title = urlencoding::decode(identifier)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| identifier.to_string());

    let mut plan = vec![Lookup::ByTitle(title)];
    if let Ok(id) = identifier.trim().parse::<i64>() {
        plan.push(Lookup::ById(id));
    }
    plan
}

#[derive(Clone)]
pub struct OwnershipResolver {
    store: Arc<dyn NotebookStore>,
}

impl OwnershipResolver {
    pub fn new(store: Arc<dyn NotebookStore>) -> Self {
        Self { store }
    }

    /// Finds one of `owner_id`'s books. Other users' books are never candidates.
    pub async fn resolve_book(
        &self,
        owner_id: i64,
        identifier: &str,
    ) -> PortResult<Resolved<Book>> {
        for lookup in lookup_plan(identifier) {
            let found = match lookup {
                Lookup::ByTitle(title) => self.store.find_book_by_title(owner_id, &title).await?,
                Lookup::ById(id) => self.store.find_book_by_id(owner_id, id).await?,
            };
            if let Some(book) = found {
                return Ok(Resolved::Found(book));
            }
        }
        Ok(Resolved::NotFound)
    }

    /// Finds a page inside `book`, which the caller must already have resolved
    /// for its owner.
    pub async fn resolve_page(&self, book: &Book, identifier: &str) -> PortResult<Resolved<Page>> {
        for lookup in lookup_plan(identifier) {
            let found = match lookup {
                Lookup::ByTitle(title) => self.store.find_page_by_title(book.id, &title).await?,
                Lookup::ById(id) => self.store.find_page_by_id(book.id, id).await?,
            };
            if let Some(page) = found {
                return Ok(Resolved::Found(page));
            }
        }
        Ok(Resolved::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewPage, NewUser};
    use crate::memory::MemoryStore;

    async fn user(store: &MemoryStore, email: &str) -> i64 {
        store
            .create_user(NewUser {
                email: email.into(),
                password_hash: "hash".into(),
                username: None,
                phone: None,
                profile_picture: None,
            })
            .await
            .unwrap()
            .id
    }

    #[test]
    fn plan_tries_title_before_id() {
        assert_eq!(
            lookup_plan("42"),
            vec![Lookup::ByTitle("42".into()), Lookup::ById(42)]
        );
        assert_eq!(lookup_plan("My%20Notes"), vec![Lookup::ByTitle("My Notes".into())]);
        assert_eq!(lookup_plan("100%"), vec![Lookup::ByTitle("100%".into())]);
    }

    #[tokio::test]
    async fn title_lookup_is_scoped_to_owner() {
        let store = Arc::new(MemoryStore::new());
        let alice = user(&store, "a@example.com").await;
        let bob = user(&store, "b@example.com").await;
        let bobs = store.create_book(bob, "Notebook", None).await.unwrap();
        let alices = store.create_book(alice, "Notebook", None).await.unwrap();

        let resolver = OwnershipResolver::new(store.clone());
        assert_eq!(
            resolver.resolve_book(alice, "Notebook").await.unwrap(),
            Resolved::Found(alices)
        );
        // Bob's id is not reachable by alice either.
        assert_eq!(
            resolver.resolve_book(alice, &bobs.id.to_string()).await.unwrap(),
            Resolved::NotFound
        );
    }

    #[tokio::test]
    async fn numeric_title_wins_over_id() {
        let store = Arc::new(MemoryStore::new());
        let owner = user(&store, "a@example.com").await;
        let first = store.create_book(owner, "first", None).await.unwrap();
        let titled = store
            .create_book(owner, &first.id.to_string(), None)
            .await
            .unwrap();

        let resolver = OwnershipResolver::new(store.clone());
        let resolved = resolver
            .resolve_book(owner, &first.id.to_string())
            .await
            .unwrap();
        assert_eq!(resolved, Resolved::Found(titled));
    }

    #[tokio::test]
    async fn falls_back_to_id_and_decodes_titles() {
        let store = Arc::new(MemoryStore::new());
        let owner = user(&store, "a@example.com").await;
        let book = store.create_book(owner, "My Notes", None).await.unwrap();
        let page = store
            .create_page(NewPage {
                book_id: book.id,
                title: "Todo list".into(),
                content_html: String::new(),
                word_count: 0,
            })
            .await
            .unwrap();

        // Creating the page touched the book, so compare by id.
        let resolver = OwnershipResolver::new(store.clone());
        let by_id = resolver.resolve_book(owner, &book.id.to_string()).await.unwrap();
        assert_eq!(by_id.into_option().map(|b| b.id), Some(book.id));
        let by_title = resolver.resolve_book(owner, "My%20Notes").await.unwrap();
        assert_eq!(by_title.into_option().map(|b| b.id), Some(book.id));
        assert_eq!(
            resolver.resolve_page(&book, "Todo%20list").await.unwrap(),
            Resolved::Found(page.clone())
        );
        assert_eq!(
            resolver.resolve_page(&book, &page.id.to_string()).await.unwrap(),
            Resolved::Found(page)
        );
        assert_eq!(
            resolver.resolve_page(&book, "missing").await.unwrap(),
            Resolved::NotFound
        );
    }

    #[tokio::test]
    async fn page_lookup_is_scoped_to_book() {
        let store = Arc::new(MemoryStore::new());
        let owner = user(&store, "a@example.com").await;
        let one = store.create_book(owner, "one", None).await.unwrap();
        let two = store.create_book(owner, "two", None).await.unwrap();
        let page = store
            .create_page(NewPage {
                book_id: one.id,
                title: "Day1".into(),
                content_html: String::new(),
                word_count: 0,
            })
            .await
            .unwrap();

        let resolver = OwnershipResolver::new(store.clone());
        assert_eq!(resolver.resolve_page(&two, "Day1").await.unwrap(), Resolved::NotFound);
        assert_eq!(
            resolver.resolve_page(&two, &page.id.to_string()).await.unwrap(),
            Resolved::NotFound
        );
    }
}
