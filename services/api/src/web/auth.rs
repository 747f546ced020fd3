//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for signup, signin, signout and account settings.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use notebook_core::{ProfileFields, ProfileUpdate};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::middleware::CurrentUser;
use crate::web::rest::{
    ApiJson, ApiResult, AuthResponse, ErrorResponse, MeResponse, MessageResponse,
};
use crate::web::session::{clear_session_cookie, read_session_token, session_cookie};
use crate::web::state::AppState;

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub username: Option<String>,
    pub phone: Option<String>,
    /// Avatar reference, typically a data URL.
    pub profile_picture: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SigninRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created, session cookie set", body = AuthResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 409, description = "Email already exists", body = ErrorResponse)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let profile = ProfileFields {
        username: req.username,
        phone: req.phone,
        profile_picture: req.profile_picture,
    };
    let signed = state.auth.sign_up(&req.email, &req.password, profile).await?;

    let cookie = session_cookie(
        &signed.token,
        state.auth.tokens().ttl_secs(),
        state.config.secure_cookie,
    );
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user: signed.user.into(),
        }),
    ))
}

/// POST /auth/signin - Sign in with an existing account
#[utoipa::path(
    post,
    path = "/auth/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in, session cookie set", body = AuthResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn signin_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SigninRequest>,
) -> ApiResult<impl IntoResponse> {
    let signed = state.auth.sign_in(&req.email, &req.password).await?;

    let cookie = session_cookie(
        &signed.token,
        state.auth.tokens().ttl_secs(),
        state.config.secure_cookie,
    );
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user: signed.user.into(),
        }),
    ))
}

/// POST /auth/signout - Clear the session cookie
///
/// The token itself is not revoked; it remains valid until it expires.
#[utoipa::path(
    post,
    path = "/auth/signout",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse)
    )
)]
pub async fn signout_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.auth.sign_out();
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie(state.config.secure_cookie))],
        MessageResponse::new("Signed out successfully"),
    )
}

/// GET /auth/me - The signed-in user, or null
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user or null", body = MeResponse)
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<MeResponse>> {
    let user = state
        .auth
        .current_user(read_session_token(&headers))
        .await?;
    Ok(Json(MeResponse {
        user: user.map(Into::into),
    }))
}

/// PATCH /auth/profile - Update profile fields
#[utoipa::path(
    patch,
    path = "/auth/profile",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = AuthResponse),
        (status = 400, description = "No fields to update", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 409, description = "Email already exists", body = ErrorResponse)
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<ProfileRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let update = ProfileUpdate {
        username: req.username,
        email: req.email,
        phone: req.phone,
        profile_picture: req.profile_picture,
    };
    let user = state.auth.update_profile(user.id, update).await?;
    Ok(Json(AuthResponse { user: user.into() }))
}

/// POST /auth/change-password - Replace the password
#[utoipa::path(
    post,
    path = "/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Missing fields or new password too short", body = ErrorResponse),
        (status = 401, description = "Not signed in or current password incorrect", body = ErrorResponse)
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .auth
        .change_password(user.id, &req.current_password, &req.new_password)
        .await?;
    Ok(MessageResponse::new("Password changed successfully"))
}
