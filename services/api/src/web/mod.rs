pub mod auth;
pub mod books;
pub mod middleware;
pub mod pages;
pub mod rest;
pub mod session;
pub mod state;

pub use middleware::require_auth;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Request bodies may carry data-URL avatars and inline images.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Builds the API router. CORS and the Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/signin", post(auth::signin_handler))
        .route("/auth/signout", post(auth::signout_handler))
        .route("/auth/me", get(auth::me_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/profile", patch(auth::update_profile_handler))
        .route("/auth/change-password", post(auth::change_password_handler))
        .route(
            "/books",
            get(books::list_books_handler).post(books::create_book_handler),
        )
        .route(
            "/books/{book}",
            patch(books::update_book_handler).delete(books::delete_book_handler),
        )
        .route(
            "/books/{book}/pages",
            get(pages::list_pages_handler).post(pages::create_page_handler),
        )
        .route(
            "/books/{book}/pages/{page}",
            get(pages::get_page_handler)
                .patch(pages::update_page_handler)
                .delete(pages::delete_page_handler),
        )
        .route(
            "/books/{book}/pages/{page}/duplicate",
            post(pages::duplicate_page_handler),
        )
        .route(
            "/books/{book}/pages/{page}/revisions",
            get(pages::list_revisions_handler),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
