//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use notebook_core::{ServiceError, User};
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::session::read_session_token;
use crate::web::state::AppState;

/// The verified caller, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Middleware that verifies the session token cookie and loads its user.
///
/// If valid, inserts a [`CurrentUser`] into request extensions for handlers to use.
/// If missing, tampered with or expired, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the token from the cookie header
    let token = read_session_token(req.headers())
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?
        .to_string();

    // 2. Verify the signature and expiry, then load the user
    let user = state.auth.authenticate(&token).await?;

    // 3. Insert the caller into request extensions
    req.extensions_mut().insert(CurrentUser(user));

    // 4. Continue to the handler
    Ok(next.run(req).await)
}
