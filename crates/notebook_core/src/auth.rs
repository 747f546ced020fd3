//! crates/notebook_core/src/auth.rs
//!
//! Credential checks, token issuance and profile maintenance.

use std::sync::{Arc, OnceLock};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::{debug, info, warn};

use crate::domain::{NewUser, ProfileFields, ProfileUpdate, User};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::NotebookStore;
use crate::token::TokenCodec;

pub const MIN_PASSWORD_LEN: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// A user together with a freshly issued session token.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn NotebookStore>,
    tokens: TokenCodec,
}

impl AuthService {
    pub fn new(store: Arc<dyn NotebookStore>, tokens: TokenCodec) -> Self {
        Self { store, tokens }
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: ProfileFields,
    ) -> ServiceResult<SignedIn> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Email and password are required".to_string(),
            ));
        }

        let password_hash = hash_password(password.to_string()).await?;
        let user = self
            .store
            .create_user(NewUser {
                email: email.to_string(),
                password_hash,
                username: profile.username,
                phone: profile.phone,
                profile_picture: profile.profile_picture,
            })
            .await
            .map_err(|e| match ServiceError::from(e) {
                ServiceError::Conflict(_) => ServiceError::Conflict("Email already exists".into()),
                other => other,
            })?;

        info!(user_id = user.id, "user signed up");
        let token = self.tokens.issue(user.id, &user.email);
        Ok(SignedIn { user, token })
    }

    /// Unknown emails and wrong passwords fail identically.
    pub async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<SignedIn> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Email and password are required".to_string(),
            ));
        }

        let Some(creds) = self.store.get_credentials_by_email(email.trim()).await? else {
            // Burn the same work as a real check so response time does not
            // reveal whether the account exists.
            let _ = verify_password(password.to_string(), None).await;
            warn!("sign-in rejected");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(password.to_string(), Some(creds.password_hash)).await? {
            warn!(user_id = creds.user.id, "sign-in rejected");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        debug!(user_id = creds.user.id, "user signed in");
        let token = self.tokens.issue(creds.user.id, &creds.user.email);
        Ok(SignedIn {
            user: creds.user,
            token,
        })
    }

    /// Sign-out keeps no server-side state: the token stays valid until it
    /// expires and the caller is expected to drop the cookie.
    pub fn sign_out(&self) {
        debug!("sign-out requested");
    }

    /// Verifies `token` and loads the user it names.
    pub async fn authenticate(&self, token: &str) -> ServiceResult<User> {
        let identity = self.tokens.verify(token).map_err(|e| {
            debug!(reason = %e, "token rejected");
            ServiceError::Unauthorized("Invalid or expired token".to_string())
        })?;

        self.store
            .get_user(identity.user_id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = identity.user_id, "token names an unknown user");
                ServiceError::Unauthorized("User not found".to_string())
            })
    }

    /// Like `authenticate`, but a missing or bad token is simply "nobody".
    pub async fn current_user(&self, token: Option<&str>) -> ServiceResult<Option<User>> {
        let Some(token) = token else {
            return Ok(None);
        };
        match self.authenticate(token).await {
            Ok(user) => Ok(Some(user)),
            Err(ServiceError::Unauthorized(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        current: &str,
        new: &str,
    ) -> ServiceResult<()> {
        if current.is_empty() || new.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Current password and new password are required".to_string(),
            ));
        }
        validate_new_password(new)?;

        let creds = self
            .store
            .get_credentials_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("User not found".to_string()))?;

        if !verify_password(current.to_string(), Some(creds.password_hash)).await? {
            warn!(user_id, "password change rejected");
            return Err(ServiceError::Unauthorized(
                "Current password is incorrect".to_string(),
            ));
        }

        let password_hash = hash_password(new.to_string()).await?;
        self.store.update_password_hash(user_id, &password_hash).await?;
        info!(user_id, "password changed");
        Ok(())
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        mut update: ProfileUpdate,
    ) -> ServiceResult<User> {
        if update.is_empty() {
            return Err(ServiceError::InvalidInput("No fields to update".to_string()));
        }
        if let Some(email) = update.email.take() {
            let email = email.trim().to_string();
            validate_email(&email)?;
            update.email = Some(email);
        }

        let user = self
            .store
            .update_profile(user_id, update)
            .await
            .map_err(|e| match ServiceError::from(e) {
                ServiceError::Conflict(_) => ServiceError::Conflict("Email already exists".into()),
                other => other,
            })?;
        info!(user_id, "profile updated");
        Ok(user)
    }
}

fn validate_email(email: &str) -> ServiceResult<()> {
    if email.is_empty() {
        return Err(ServiceError::InvalidInput("Email is required".to_string()));
    }
    if !email.contains('@') {
        return Err(ServiceError::InvalidInput("Email is not valid".to_string()));
    }
    Ok(())
}

fn validate_new_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Runs Argon2 on the blocking pool.
async fn hash_password(password: String) -> ServiceResult<String> {
    tokio::task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .map_err(|e| ServiceError::Internal(format!("Password hashing task failed: {e}")))?
}

/// Checks `password` against `stored_hash`, or against a fixed dummy hash
/// when there is no account to check.
async fn verify_password(password: String, stored_hash: Option<String>) -> ServiceResult<bool> {
    tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => verify_password_blocking(&password, &hash),
        None => verify_password_blocking(&password, dummy_hash()),
    })
    .await
    .map_err(|e| ServiceError::Internal(format!("Password verification task failed: {e}")))?
}

fn hash_password_blocking(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::Internal(format!("Failed to hash password: {e}")))
}

fn verify_password_blocking(password: &str, stored_hash: &str) -> ServiceResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ServiceError::Internal(format!("Failed to parse password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password_blocking("not-a-real-password").unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryStore::new()),
            TokenCodec::new(b"test-secret-key-32-bytes-long!!!".to_vec()),
        )
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let auth = service();
        let profile = ProfileFields {
            username: Some("ada".into()),
            ..Default::default()
        };
        let signed_up = auth.sign_up("ada@example.com", "secret1", profile).await.unwrap();
        assert_eq!(signed_up.user.username.as_deref(), Some("ada"));
        assert_eq!(
            auth.tokens().verify(&signed_up.token).unwrap().user_id,
            signed_up.user.id
        );

        let signed_in = auth.sign_in("ada@example.com", "secret1").await.unwrap();
        assert_eq!(signed_in.user, signed_up.user);
        assert_eq!(auth.authenticate(&signed_in.token).await.unwrap().id, signed_up.user.id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let auth = service();
        auth.sign_up("a@example.com", "secret1", ProfileFields::default())
            .await
            .unwrap();
        let err = auth
            .sign_up("a@example.com", "secret2", ProfileFields::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn sign_up_requires_email_and_password() {
        let auth = service();
        for (email, password) in [("", "secret1"), ("   ", "secret1"), ("a@example.com", "")] {
            let err = auth
                .sign_up(email, password, ProfileFields::default())
                .await
                .unwrap_err();
            assert!(
                matches!(err, ServiceError::InvalidInput(_)),
                "{email}/{password}"
            );
        }
    }

    #[tokio::test]
    async fn sign_up_accepts_short_passwords_and_bare_names() {
        let auth = service();
        let short = auth
            .sign_up("ann@example.com", "abc", ProfileFields::default())
            .await
            .unwrap();
        assert_eq!(short.user.email, "ann@example.com");

        let bare = auth
            .sign_up("ann", "abcdefgh", ProfileFields::default())
            .await
            .unwrap();
        assert_eq!(bare.user.email, "ann");
        assert!(auth.sign_in("ann@example.com", "abc").await.is_ok());
    }

    #[tokio::test]
    async fn bad_credentials_are_indistinguishable() {
        let auth = service();
        auth.sign_up("a@example.com", "secret1", ProfileFields::default())
            .await
            .unwrap();

        let wrong_password = auth.sign_in("a@example.com", "wrong!!").await.unwrap_err();
        let unknown_email = auth.sign_in("b@example.com", "secret1").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, ServiceError::Unauthorized(_)));
        assert!(matches!(unknown_email, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn change_password_checks_current_and_length() {
        let auth = service();
        let user = auth
            .sign_up("a@example.com", "secret1", ProfileFields::default())
            .await
            .unwrap()
            .user;

        let err = auth.change_password(user.id, "wrong!!", "secret2").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let err = auth.change_password(user.id, "secret1", "short").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        auth.change_password(user.id, "secret1", "secret2").await.unwrap();
        assert!(auth.sign_in("a@example.com", "secret1").await.is_err());
        assert!(auth.sign_in("a@example.com", "secret2").await.is_ok());
    }

    #[tokio::test]
    async fn update_profile_is_partial_and_rejects_taken_email() {
        let auth = service();
        let a = auth
            .sign_up("a@example.com", "secret1", ProfileFields::default())
            .await
            .unwrap()
            .user;
        auth.sign_up("b@example.com", "secret1", ProfileFields::default())
            .await
            .unwrap();

        let updated = auth
            .update_profile(
                a.id,
                ProfileUpdate {
                    phone: Some("555-0100".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));
        assert_eq!(updated.email, "a@example.com");

        let err = auth
            .update_profile(
                a.id,
                ProfileUpdate {
                    email: Some("b@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err = auth
            .update_profile(a.id, ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn current_user_treats_bad_tokens_as_anonymous() {
        let auth = service();
        assert_eq!(auth.current_user(None).await.unwrap(), None);
        assert_eq!(auth.current_user(Some("not.a.token")).await.unwrap(), None);

        let signed = auth
            .sign_up("a@example.com", "secret1", ProfileFields::default())
            .await
            .unwrap();
        assert_eq!(
            auth.current_user(Some(&signed.token)).await.unwrap(),
            Some(signed.user)
        );
    }
}
