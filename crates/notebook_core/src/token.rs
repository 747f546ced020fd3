//! crates/notebook_core/src/token.rs
//!
//! Stateless session tokens.
//!
//! Tokens are JWT-shaped: `header.payload.signature`, each segment URL-safe
//! base64 without padding. The signature is HMAC-SHA256 over `header.payload`
//! keyed with the server secret. The payload carries `{id, email, exp}` with
//! `exp` in Unix seconds.
//!
//! There is no revocation list. A token stays valid until it expires; signing
//! out only clears the client's cookie.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::domain::Identity;

type HmacSha256 = Hmac<Sha256>;

/// Seven days.
pub const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

const HEADER: &str = r#"{"typ":"JWT","alg":"HS256"}"#;

/// Why a token was rejected. All variants mean "unauthenticated" to callers;
/// the distinction only feeds logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

#[derive(Serialize, Deserialize)]
struct Claims {
    id: i64,
    email: String,
    exp: i64,
}

/// Signs and verifies session tokens with a secret fixed at construction.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl TokenCodec {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs: TOKEN_TTL_SECS,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issues a token for the user, expiring `TOKEN_TTL_SECS` from now.
    pub fn issue(&self, user_id: i64, email: &str) -> String {
        self.issue_at(user_id, email, Utc::now().timestamp())
    }

    pub fn issue_at(&self, user_id: i64, email: &str, now: i64) -> String {
        let claims = Claims {
            id: user_id,
            email: email.to_string(),
            exp: now + self.ttl_secs,
        };
        // Serializing a struct of plain fields cannot fail.
        let payload = serde_json::to_vec(&claims).unwrap_or_default();

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = self.sign(signing_input.as_bytes());
        format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature))
    }

    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Result<Identity, TokenError> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        // `verify_slice` compares in constant time.
        let signing_input_len = header.len() + 1 + payload.len();
        let mut mac = self.mac();
        mac.update(&token.as_bytes()[..signing_input_len]);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if claims.exp <= now {
            return Err(TokenError::Expired);
        }

        Ok(Identity {
            user_id: claims.id,
            email: claims.email,
            expires_at: claims.exp,
        })
    }

    fn sign(&self, data: &[u8]) -> [u8; 32] {
        let mut mac = self.mac();
        mac.update(data);
        mac.finalize().into_bytes().into()
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }
}
