//! services/api/src/web/pages.rs
//!
//! Page endpoints, nested under a book. Both `{book}` and `{page}` accept a
//! title (percent-encoded) or a numeric id.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use notebook_core::PageUpdate;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::middleware::CurrentUser;
use crate::web::rest::{
    ApiJson, ApiResult, ErrorResponse, MessageResponse, PageResponse, PagesResponse,
    RevisionResponse,
};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct CreatePageRequest {
    #[serde(default)]
    pub title: String,
}

/// Either field may be omitted. `content_html` is sanitized server-side.
#[derive(Deserialize, ToSchema)]
pub struct UpdatePageRequest {
    pub title: Option<String>,
    pub content_html: Option<String>,
}

/// GET /books/{book}/pages - A book and its pages
#[utoipa::path(
    get,
    path = "/books/{book}/pages",
    params(("book" = String, Path, description = "Book title or numeric id")),
    responses(
        (status = 200, description = "The book and its pages", body = PagesResponse),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn list_pages_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(book): Path<String>,
) -> ApiResult<Json<PagesResponse>> {
    let (book, pages) = state.content.list_pages(user.id, &book).await?;
    Ok(Json(PagesResponse {
        book: book.into(),
        pages: pages.into_iter().map(Into::into).collect(),
    }))
}

/// POST /books/{book}/pages - Create an empty page
#[utoipa::path(
    post,
    path = "/books/{book}/pages",
    params(("book" = String, Path, description = "Book title or numeric id")),
    request_body = CreatePageRequest,
    responses(
        (status = 201, description = "Page created", body = PageResponse),
        (status = 400, description = "Title is required", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn create_page_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(book): Path<String>,
    ApiJson(req): ApiJson<CreatePageRequest>,
) -> ApiResult<(StatusCode, Json<PageResponse>)> {
    let page = state.content.create_page(user.id, &book, &req.title).await?;
    Ok((StatusCode::CREATED, Json(page.into())))
}

/// GET /books/{book}/pages/{page} - Read a page
#[utoipa::path(
    get,
    path = "/books/{book}/pages/{page}",
    params(
        ("book" = String, Path, description = "Book title or numeric id"),
        ("page" = String, Path, description = "Page title or numeric id")
    ),
    responses(
        (status = 200, description = "The page", body = PageResponse),
        (status = 404, description = "Book or page not found", body = ErrorResponse)
    )
)]
pub async fn get_page_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((book, page)): Path<(String, String)>,
) -> ApiResult<Json<PageResponse>> {
    let page = state.content.get_page(user.id, &book, &page).await?;
    Ok(Json(page.into()))
}

/// PATCH /books/{book}/pages/{page} - Rename a page or save its content
///
/// Saving content records a revision; the newest ten are kept.
#[utoipa::path(
    patch,
    path = "/books/{book}/pages/{page}",
    params(
        ("book" = String, Path, description = "Book title or numeric id"),
        ("page" = String, Path, description = "Page title or numeric id")
    ),
    request_body = UpdatePageRequest,
    responses(
        (status = 200, description = "Page updated", body = PageResponse),
        (status = 400, description = "No fields to update", body = ErrorResponse),
        (status = 404, description = "Book or page not found", body = ErrorResponse)
    )
)]
pub async fn update_page_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((book, page)): Path<(String, String)>,
    ApiJson(req): ApiJson<UpdatePageRequest>,
) -> ApiResult<Json<PageResponse>> {
    let update = PageUpdate {
        title: req.title,
        content_html: req.content_html,
    };
    let page = state
        .content
        .update_page(user.id, &book, &page, update)
        .await?;
    Ok(Json(page.into()))
}

/// DELETE /books/{book}/pages/{page} - Delete a page and its revisions
#[utoipa::path(
    delete,
    path = "/books/{book}/pages/{page}",
    params(
        ("book" = String, Path, description = "Book title or numeric id"),
        ("page" = String, Path, description = "Page title or numeric id")
    ),
    responses(
        (status = 200, description = "Page deleted", body = MessageResponse),
        (status = 404, description = "Book or page not found", body = ErrorResponse)
    )
)]
pub async fn delete_page_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((book, page)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    state.content.delete_page(user.id, &book, &page).await?;
    Ok(MessageResponse::new("Page deleted successfully"))
}

/// POST /books/{book}/pages/{page}/duplicate - Copy a page within its book
#[utoipa::path(
    post,
    path = "/books/{book}/pages/{page}/duplicate",
    params(
        ("book" = String, Path, description = "Book title or numeric id"),
        ("page" = String, Path, description = "Page title or numeric id")
    ),
    responses(
        (status = 201, description = "Copy created", body = PageResponse),
        (status = 404, description = "Book or page not found", body = ErrorResponse)
    )
)]
pub async fn duplicate_page_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((book, page)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<PageResponse>)> {
    let copy = state.content.duplicate_page(user.id, &book, &page).await?;
    Ok((StatusCode::CREATED, Json(copy.into())))
}

/// GET /books/{book}/pages/{page}/revisions - Retained history, newest first
#[utoipa::path(
    get,
    path = "/books/{book}/pages/{page}/revisions",
    params(
        ("book" = String, Path, description = "Book title or numeric id"),
        ("page" = String, Path, description = "Page title or numeric id")
    ),
    responses(
        (status = 200, description = "Revisions, newest first", body = [RevisionResponse]),
        (status = 404, description = "Book or page not found", body = ErrorResponse)
    )
)]
pub async fn list_revisions_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((book, page)): Path<(String, String)>,
) -> ApiResult<Json<Vec<RevisionResponse>>> {
    let revisions = state.content.page_revisions(user.id, &book, &page).await?;
    Ok(Json(revisions.into_iter().map(Into::into).collect()))
}
