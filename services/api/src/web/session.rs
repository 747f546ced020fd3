//! services/api/src/web/session.rs
//!
//! The session cookie: how the signed token travels between browser and API.

use axum::http::{header, HeaderMap};

pub const SESSION_COOKIE: &str = "token";

/// Builds the `Set-Cookie` value carrying a freshly issued token.
///
/// `Secure` is only added when the API is served over TLS; browsers refuse
/// to store secure cookies from plain-HTTP origins such as localhost.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Builds the `Set-Cookie` value that makes the browser drop the session.
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

/// Extracts the session token from the request's `Cookie` header, if any.
pub fn read_session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let c = c.trim();
            c.strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .filter(|token| !token.is_empty())
}
