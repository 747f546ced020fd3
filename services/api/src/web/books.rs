//! services/api/src/web/books.rs
//!
//! Book endpoints. `{book}` is a book title (percent-encoded) or its id.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use notebook_core::BookUpdate;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::middleware::CurrentUser;
use crate::web::rest::{ApiJson, ApiResult, BookResponse, ErrorResponse, MessageResponse};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct CreateBookRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// GET /books - The caller's books, most recently updated first
#[utoipa::path(
    get,
    path = "/books",
    responses(
        (status = 200, description = "The caller's books", body = [BookResponse]),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
pub async fn list_books_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<BookResponse>>> {
    let books = state.content.list_books(user.id).await?;
    Ok(Json(books.into_iter().map(Into::into).collect()))
}

/// POST /books - Create a book
#[utoipa::path(
    post,
    path = "/books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Title is required", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
pub async fn create_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateBookRequest>,
) -> ApiResult<(StatusCode, Json<BookResponse>)> {
    let book = state
        .content
        .create_book(user.id, &req.title, req.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(book.into())))
}

/// PATCH /books/{book} - Rename or re-describe a book
#[utoipa::path(
    patch,
    path = "/books/{book}",
    params(("book" = String, Path, description = "Book title or numeric id")),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "No fields to update", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn update_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(identifier): Path<String>,
    ApiJson(req): ApiJson<UpdateBookRequest>,
) -> ApiResult<Json<BookResponse>> {
    let update = BookUpdate {
        title: req.title,
        description: req.description,
    };
    let book = state.content.update_book(user.id, &identifier, update).await?;
    Ok(Json(book.into()))
}

/// DELETE /books/{book} - Delete a book with its pages and revisions
#[utoipa::path(
    delete,
    path = "/books/{book}",
    params(("book" = String, Path, description = "Book title or numeric id")),
    responses(
        (status = 200, description = "Book deleted", body = MessageResponse),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn delete_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.content.delete_book(user.id, &identifier).await?;
    Ok(MessageResponse::new("Book deleted successfully"))
}
