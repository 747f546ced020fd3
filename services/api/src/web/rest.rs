//! services/api/src/web/rest.rs
//!
//! Contains the shared JSON payload types and the master definition for the
//! OpenAPI specification.

use axum::extract::{rejection::JsonRejection, FromRequest};
use chrono::{DateTime, Utc};
use notebook_core::{Book, Page, PageRevision, User};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::error::ApiError;
use crate::web::{auth, books, pages};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::signin_handler,
        auth::signout_handler,
        auth::me_handler,
        auth::update_profile_handler,
        auth::change_password_handler,
        books::list_books_handler,
        books::create_book_handler,
        books::update_book_handler,
        books::delete_book_handler,
        pages::list_pages_handler,
        pages::create_page_handler,
        pages::get_page_handler,
        pages::update_page_handler,
        pages::delete_page_handler,
        pages::duplicate_page_handler,
        pages::list_revisions_handler,
    ),
    components(
        schemas(
            UserResponse, AuthResponse, MeResponse, BookResponse, PageResponse,
            PagesResponse, RevisionResponse, MessageResponse, ErrorResponse,
            auth::SignupRequest, auth::SigninRequest, auth::ProfileRequest,
            auth::ChangePasswordRequest, books::CreateBookRequest, books::UpdateBookRequest,
            pages::CreatePageRequest, pages::UpdatePageRequest,
        )
    ),
    tags(
        (name = "Notebook API", description = "Books, pages and revisions for signed-in users.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Request Extraction
//=========================================================================================

/// `axum::Json`, but malformed bodies are answered with the API's JSON error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

//=========================================================================================
// API Response Structs
//=========================================================================================

/// A user as clients see it. The password hash never leaves the server.
#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            phone: user.phone,
            profile_picture: user.profile_picture,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
}

/// `user` is `null` when the request carries no valid session.
#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub user: Option<UserResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct BookResponse {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            user_id: book.user_id,
            title: book.title,
            description: book.description,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PageResponse {
    pub id: i64,
    pub book_id: i64,
    pub title: String,
    pub content_html: String,
    pub word_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Page> for PageResponse {
    fn from(page: Page) -> Self {
        Self {
            id: page.id,
            book_id: page.book_id,
            title: page.title,
            content_html: page.content_html,
            word_count: page.word_count,
            created_at: page.created_at,
            updated_at: page.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PagesResponse {
    pub book: BookResponse,
    pub pages: Vec<PageResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct RevisionResponse {
    pub id: i64,
    pub page_id: i64,
    pub content_html: String,
    pub created_at: DateTime<Utc>,
}

impl From<PageRevision> for RevisionResponse {
    fn from(revision: PageRevision) -> Self {
        Self {
            id: revision.id,
            page_id: revision.page_id,
            content_html: revision.content_html,
            created_at: revision.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> axum::Json<Self> {
        axum::Json(Self {
            message: message.to_string(),
        })
    }
}

/// The body of every non-2xx response.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiResult<T> = Result<T, ApiError>;
