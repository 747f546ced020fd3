//! crates/notebook_core/src/content.rs
//!
//! Owner-scoped CRUD for books and pages.
//!
//! Every operation takes the caller's verified user id and resolves its target
//! through [`OwnershipResolver`]. A miss and another owner's entity look the
//! same to the caller: `ServiceError::NotFound`.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{
    Book, BookUpdate, ContentChange, NewPage, Page, PageChanges, PageRevision, PageUpdate,
};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::NotebookStore;
use crate::resolver::{OwnershipResolver, Resolved};
use crate::revisions::RevisionStore;
use crate::sanitize::{word_count, HtmlSanitizer};

const COPY_SUFFIX: &str = " (Copy)";

#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn NotebookStore>,
    resolver: OwnershipResolver,
    revisions: RevisionStore,
    sanitizer: Arc<HtmlSanitizer>,
}

impl ContentService {
    pub fn new(store: Arc<dyn NotebookStore>) -> Self {
        Self {
            resolver: OwnershipResolver::new(store.clone()),
            revisions: RevisionStore::new(store.clone()),
            sanitizer: Arc::new(HtmlSanitizer::new()),
            store,
        }
    }

    //=====================================================================================
    // Books
    //=====================================================================================

    pub async fn list_books(&self, owner_id: i64) -> ServiceResult<Vec<Book>> {
        Ok(self.store.list_books(owner_id).await?)
    }

    pub async fn create_book(
        &self,
        owner_id: i64,
        title: &str,
        description: Option<&str>,
    ) -> ServiceResult<Book> {
        let title = required_title(Some(title))?;
        let book = self.store.create_book(owner_id, title, description).await?;
        info!(owner_id, book_id = book.id, "book created");
        Ok(book)
    }

    pub async fn update_book(
        &self,
        owner_id: i64,
        identifier: &str,
        update: BookUpdate,
    ) -> ServiceResult<Book> {
        if update.is_empty() {
            return Err(ServiceError::InvalidInput("No fields to update".to_string()));
        }
        if update.title.is_some() {
            required_title(update.title.as_deref())?;
        }
        let book = self.book(owner_id, identifier).await?;
        Ok(self.store.update_book(book.id, update).await?)
    }

    /// Removes the book, its pages and their revisions.
    pub async fn delete_book(&self, owner_id: i64, identifier: &str) -> ServiceResult<()> {
        let book = self.book(owner_id, identifier).await?;
        self.store.delete_book(book.id).await?;
        info!(owner_id, book_id = book.id, "book deleted");
        Ok(())
    }

    //=====================================================================================
    // Pages
    //=====================================================================================

    pub async fn list_pages(
        &self,
        owner_id: i64,
        book_identifier: &str,
    ) -> ServiceResult<(Book, Vec<Page>)> {
        let book = self.book(owner_id, book_identifier).await?;
        let pages = self.store.list_pages(book.id).await?;
        Ok((book, pages))
    }

    /// New pages start empty with a word count of zero.
    pub async fn create_page(
        &self,
        owner_id: i64,
        book_identifier: &str,
        title: &str,
    ) -> ServiceResult<Page> {
        let title = required_title(Some(title))?;
        let book = self.book(owner_id, book_identifier).await?;
        let page = self
            .store
            .create_page(NewPage {
                book_id: book.id,
                title: title.to_string(),
                content_html: String::new(),
                word_count: 0,
            })
            .await?;
        info!(owner_id, book_id = book.id, page_id = page.id, "page created");
        Ok(page)
    }

    pub async fn get_page(
        &self,
        owner_id: i64,
        book_identifier: &str,
        page_identifier: &str,
    ) -> ServiceResult<Page> {
        let (_, page) = self.page(owner_id, book_identifier, page_identifier).await?;
        Ok(page)
    }

    /// Copies title (with a " (Copy)" suffix), content and word count into a
    /// new page of the same book. History is not copied.
    pub async fn duplicate_page(
        &self,
        owner_id: i64,
        book_identifier: &str,
        page_identifier: &str,
    ) -> ServiceResult<Page> {
        let (book, page) = self.page(owner_id, book_identifier, page_identifier).await?;
        let copy = self
            .store
            .create_page(NewPage {
                book_id: book.id,
                title: format!("{}{}", page.title, COPY_SUFFIX),
                content_html: page.content_html,
                word_count: page.word_count,
            })
            .await?;
        info!(owner_id, source = page.id, page_id = copy.id, "page duplicated");
        Ok(copy)
    }

    /// Applies a title and/or content edit.
    ///
    /// Content is sanitized, its word count recomputed, and the page write,
    /// revision append and revision prune commit together. A title-only edit
    /// records no revision.
    pub async fn update_page(
        &self,
        owner_id: i64,
        book_identifier: &str,
        page_identifier: &str,
        update: PageUpdate,
    ) -> ServiceResult<Page> {
        if update.title.is_none() && update.content_html.is_none() {
            return Err(ServiceError::InvalidInput("No fields to update".to_string()));
        }
        if update.title.is_some() {
            required_title(update.title.as_deref())?;
        }
        let (_, page) = self.page(owner_id, book_identifier, page_identifier).await?;

        let content = update.content_html.map(|raw| {
            let content_html = self.sanitizer.sanitize(&raw);
            let word_count = word_count(&content_html) as i64;
            ContentChange {
                content_html,
                word_count,
                retain_revisions: self.revisions.retention(),
            }
        });
        let changes = PageChanges {
            title: update.title,
            content,
        };

        let updated = self.store.update_page(page.id, changes).await?;
        debug!(owner_id, page_id = page.id, words = updated.word_count, "page updated");
        Ok(updated)
    }

    /// Removes the page and its revisions.
    pub async fn delete_page(
        &self,
        owner_id: i64,
        book_identifier: &str,
        page_identifier: &str,
    ) -> ServiceResult<()> {
        let (_, page) = self.page(owner_id, book_identifier, page_identifier).await?;
        self.store.delete_page(page.id).await?;
        info!(owner_id, page_id = page.id, "page deleted");
        Ok(())
    }

    /// The page's retained history, newest first.
    pub async fn page_revisions(
        &self,
        owner_id: i64,
        book_identifier: &str,
        page_identifier: &str,
    ) -> ServiceResult<Vec<PageRevision>> {
        let (_, page) = self.page(owner_id, book_identifier, page_identifier).await?;
        Ok(self.revisions.history(page.id).await?)
    }

    //=====================================================================================
    // Resolution helpers
    //=====================================================================================

    async fn book(&self, owner_id: i64, identifier: &str) -> ServiceResult<Book> {
        match self.resolver.resolve_book(owner_id, identifier).await? {
            Resolved::Found(book) => Ok(book),
            Resolved::NotFound => Err(ServiceError::NotFound("Book not found".to_string())),
        }
    }

    async fn page(
        &self,
        owner_id: i64,
        book_identifier: &str,
        page_identifier: &str,
    ) -> ServiceResult<(Book, Page)> {
        let book = self.book(owner_id, book_identifier).await?;
        match self.resolver.resolve_page(&book, page_identifier).await? {
            Resolved::Found(page) => Ok((book, page)),
            Resolved::NotFound => Err(ServiceError::NotFound("Page not found".to_string())),
        }
    }
}

fn required_title(title: Option<&str>) -> ServiceResult<&str> {
    match title {
        Some(title) if !title.trim().is_empty() => Ok(title),
        _ => Err(ServiceError::InvalidInput("Title is required".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewUser;
    use crate::memory::MemoryStore;
    use crate::revisions::MAX_REVISIONS_PER_PAGE;

    struct Fixture {
        store: Arc<MemoryStore>,
        content: ContentService,
        alice: i64,
        bob: i64,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for email in ["alice@example.com", "bob@example.com"] {
            let user = store
                .create_user(NewUser {
                    email: email.into(),
                    password_hash: "hash".into(),
                    username: None,
                    phone: None,
                    profile_picture: None,
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        Fixture {
            content: ContentService::new(store.clone()),
            store,
            alice: ids[0],
            bob: ids[1],
        }
    }

    fn content(html: &str) -> PageUpdate {
        PageUpdate {
            title: None,
            content_html: Some(html.to_string()),
        }
    }

    #[tokio::test]
    async fn trip_scenario_strips_script_and_counts_words() {
        let f = fixture().await;
        f.content.create_book(f.alice, "Trip", None).await.unwrap();
        let page = f.content.create_page(f.alice, "Trip", "Day1").await.unwrap();
        assert_eq!(page.content_html, "");
        assert_eq!(page.word_count, 0);

        f.content
            .update_page(f.alice, "Trip", "Day1", content("<p>Hi</p><script>alert(1)</script>"))
            .await
            .unwrap();

        let page = f.content.get_page(f.alice, "Trip", "Day1").await.unwrap();
        assert_eq!(page.content_html, "<p>Hi</p>");
        assert_eq!(page.word_count, 1);
    }

    #[tokio::test]
    async fn fifteen_updates_leave_ten_newest_revisions() {
        let f = fixture().await;
        f.content.create_book(f.alice, "Book", None).await.unwrap();
        let page = f.content.create_page(f.alice, "Book", "Page").await.unwrap();

        for n in 0..15 {
            f.content
                .update_page(f.alice, "Book", "Page", content(&format!("<p>save {n}</p>")))
                .await
                .unwrap();
        }

        let history = f
            .content
            .page_revisions(f.alice, "Book", "Page")
            .await
            .unwrap();
        assert_eq!(history.len(), MAX_REVISIONS_PER_PAGE);
        assert!(history.iter().all(|r| r.page_id == page.id));
        assert_eq!(history[0].content_html, "<p>save 14</p>");
        assert_eq!(history[9].content_html, "<p>save 5</p>");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_keep_history_bounded_and_content_whole() {
        let f = fixture().await;
        f.content.create_book(f.alice, "Book", None).await.unwrap();
        let page = f.content.create_page(f.alice, "Book", "Shared").await.unwrap();

        let submitted: Vec<String> = (0..16)
            .map(|n| format!("<p>writer {n} says hello</p>"))
            .collect();
        let writers: Vec<_> = submitted
            .iter()
            .cloned()
            .map(|html| {
                let service = f.content.clone();
                let owner = f.alice;
                tokio::spawn(async move {
                    service
                        .update_page(owner, "Book", "Shared", content(&html))
                        .await
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let history = f.store.list_revisions(page.id).await.unwrap();
        assert_eq!(history.len(), MAX_REVISIONS_PER_PAGE);
        assert!(history.iter().all(|r| submitted.contains(&r.content_html)));

        let saved = f.content.get_page(f.alice, "Book", "Shared").await.unwrap();
        assert!(submitted.contains(&saved.content_html));
        assert_eq!(saved.word_count, 4);
        // The last writer's page content is also its newest revision.
        assert_eq!(saved.content_html, history[0].content_html);
    }

    #[tokio::test]
    async fn title_only_update_records_no_revision() {
        let f = fixture().await;
        f.content.create_book(f.alice, "Book", None).await.unwrap();
        f.content.create_page(f.alice, "Book", "Draft").await.unwrap();

        let renamed = f
            .content
            .update_page(
                f.alice,
                "Book",
                "Draft",
                PageUpdate {
                    title: Some("Final".into()),
                    content_html: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.title, "Final");
        assert!(f
            .content
            .page_revisions(f.alice, "Book", "Final")
            .await
            .unwrap()
            .is_empty());

        let err = f
            .content
            .update_page(f.alice, "Book", "Final", PageUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn duplicate_copies_content_but_not_history() {
        let f = fixture().await;
        f.content.create_book(f.alice, "Book", None).await.unwrap();
        f.content.create_page(f.alice, "Book", "Notes").await.unwrap();
        let original = f
            .content
            .update_page(f.alice, "Book", "Notes", content("<p>three little words</p>"))
            .await
            .unwrap();

        let copy = f
            .content
            .duplicate_page(f.alice, "Book", "Notes")
            .await
            .unwrap();
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.title, "Notes (Copy)");
        assert_eq!(copy.content_html, original.content_html);
        assert_eq!(copy.word_count, 3);
        assert!(f.store.list_revisions(copy.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_book_cascades() {
        let f = fixture().await;
        let book = f.content.create_book(f.alice, "Doomed", None).await.unwrap();
        let page = f.content.create_page(f.alice, "Doomed", "P").await.unwrap();
        f.content
            .update_page(f.alice, "Doomed", "P", content("<p>x</p>"))
            .await
            .unwrap();

        f.content.delete_book(f.alice, "Doomed").await.unwrap();

        assert!(matches!(
            f.content.list_pages(f.alice, &book.id.to_string()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(f.store.list_pages(book.id).await.unwrap().is_empty());
        assert!(f.store.list_revisions(page.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_page_cascades_revisions() {
        let f = fixture().await;
        f.content.create_book(f.alice, "Book", None).await.unwrap();
        let page = f.content.create_page(f.alice, "Book", "P").await.unwrap();
        f.content
            .update_page(f.alice, "Book", "P", content("<p>x</p>"))
            .await
            .unwrap();

        f.content.delete_page(f.alice, "Book", "P").await.unwrap();
        assert!(f.store.list_revisions(page.id).await.unwrap().is_empty());
        assert!(matches!(
            f.content.get_page(f.alice, "Book", "P").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn other_owners_see_not_found() {
        let f = fixture().await;
        let book = f.content.create_book(f.alice, "Private", None).await.unwrap();
        let page = f.content.create_page(f.alice, "Private", "Secret").await.unwrap();
        let book_id = book.id.to_string();
        let page_id = page.id.to_string();

        assert!(matches!(
            f.content.list_pages(f.bob, &book_id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.content.get_page(f.bob, &book_id, &page_id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.content
                .update_page(f.bob, &book_id, &page_id, content("<p>pwned</p>"))
                .await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.content.delete_book(f.bob, "Private").await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(
            f.content.get_page(f.alice, &book_id, &page_id).await.unwrap().content_html,
            ""
        );
    }

    #[tokio::test]
    async fn books_require_titles_and_fields() {
        let f = fixture().await;
        assert!(matches!(
            f.content.create_book(f.alice, "  ", None).await,
            Err(ServiceError::InvalidInput(_))
        ));
        f.content.create_book(f.alice, "Book", Some("desc")).await.unwrap();
        assert!(matches!(
            f.content.update_book(f.alice, "Book", BookUpdate::default()).await,
            Err(ServiceError::InvalidInput(_))
        ));

        let renamed = f
            .content
            .update_book(
                f.alice,
                "Book",
                BookUpdate {
                    title: Some("Renamed".into()),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.title, "Renamed");
        assert_eq!(renamed.description.as_deref(), Some("desc"));
        assert_eq!(f.content.list_books(f.alice).await.unwrap(), vec![renamed]);
        assert!(f.content.list_books(f.bob).await.unwrap().is_empty());
    }
}
