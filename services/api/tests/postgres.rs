//! Store tests against a live Postgres database.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -p api -- --ignored`.

use api_lib::adapters::DbAdapter;
use notebook_core::{ContentChange, NewPage, NewUser, NotebookStore, PageChanges, PortError};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

const RETAIN: usize = 10;

async fn adapter() -> Arc<DbAdapter> {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&url)
        .await
        .unwrap();
    let db = DbAdapter::new(pool);
    db.run_migrations().await.unwrap();
    Arc::new(db)
}

/// A fresh user, book and empty page. Emails are unique per run.
async fn seed(db: &DbAdapter, tag: &str) -> (i64, i64) {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let user = db
        .create_user(NewUser {
            email: format!("{tag}-{nanos}@example.com"),
            password_hash: "hash".into(),
            username: None,
            phone: None,
            profile_picture: None,
        })
        .await
        .unwrap();
    let book = db.create_book(user.id, "Book", None).await.unwrap();
    let page = db
        .create_page(NewPage {
            book_id: book.id,
            title: "Page".into(),
            content_html: String::new(),
            word_count: 0,
        })
        .await
        .unwrap();
    (book.id, page.id)
}

fn save(html: &str) -> PageChanges {
    PageChanges {
        title: None,
        content: Some(ContentChange {
            content_html: html.to_string(),
            word_count: 1,
            retain_revisions: RETAIN,
        }),
    }
}

#[tokio::test]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn concurrent_saves_never_exceed_the_window() {
    let db = adapter().await;
    let (book_id, page_id) = seed(&db, "concurrent").await;

    let submitted: Vec<String> = (0..24).map(|n| format!("<p>w{n}</p>")).collect();
    let writers: Vec<_> = submitted
        .iter()
        .cloned()
        .map(|html| {
            let db = db.clone();
            tokio::spawn(async move { db.update_page(page_id, save(&html)).await })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    let history = db.list_revisions(page_id).await.unwrap();
    assert_eq!(history.len(), RETAIN);
    assert!(history.windows(2).all(|w| w[0].id > w[1].id));

    let page = db.find_page_by_id(book_id, page_id).await.unwrap().unwrap();
    assert!(submitted.contains(&page.content_html));
    assert_eq!(page.content_html, history[0].content_html);
}

#[tokio::test]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn title_only_update_keeps_content() {
    let db = adapter().await;
    let (_, page_id) = seed(&db, "rename").await;
    db.update_page(page_id, save("<p>body</p>")).await.unwrap();

    let renamed = db
        .update_page(
            page_id,
            PageChanges {
                title: Some("Renamed".into()),
                content: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.title, "Renamed");
    assert_eq!(renamed.content_html, "<p>body</p>");
    assert_eq!(db.list_revisions(page_id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "needs a Postgres database in DATABASE_URL"]
async fn saves_racing_a_book_delete_do_not_deadlock() {
    let db = adapter().await;
    for round in 0..10 {
        let (book_id, page_id) = seed(&db, &format!("race{round}")).await;

        let saver = {
            let db = db.clone();
            tokio::spawn(async move { db.update_page(page_id, save("<p>late</p>")).await })
        };
        let deleter = {
            let db = db.clone();
            tokio::spawn(async move { db.delete_book(book_id).await })
        };

        deleter.await.unwrap().unwrap();
        match saver.await.unwrap() {
            Ok(_) | Err(PortError::NotFound(_)) => {}
            Err(other) => panic!("save lost the race badly: {other}"),
        }
        assert!(db.list_revisions(page_id).await.unwrap().is_empty());
    }
}
