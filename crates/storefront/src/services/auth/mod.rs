//! Authentication service.
//!
//! Accounts live in an external identity backend reached through the
//! [`IdentityProvider`] trait. Customers sign in with their phone number; the
//! backend only knows email-shaped identifiers, so the phone digits are turned
//! into a pseudo-email (`<digits>@torodo.com`).
//!
//! The signed-in user is published on a `watch` channel so any number of
//! observers can follow sign-in and sign-out.

mod error;
mod memory;

pub use error::AuthError;
pub use memory::MemoryIdentityProvider;

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use torodo_core::{AccountId, Email, Phone};

/// Domain of the pseudo-emails derived from phone numbers.
pub const PSEUDO_EMAIL_DOMAIN: &str = "torodo.com";

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: AccountId,
    pub first_name: String,
    pub last_name: String,
    pub phone: Phone,
    #[serde(default)]
    pub email: Option<Email>,
    #[serde(default)]
    pub address: String,
}

/// Profile data stored with a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub phone: Phone,
    pub email: Option<Email>,
    pub address: String,
}

/// Raw sign-up form input.
#[derive(Debug, Clone, Default)]
pub struct SignUpRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    pub password: String,
}

/// The remote identity backend.
#[async_trait]
pub trait IdentityProvider: std::fmt::Debug + Send + Sync + 'static {
    /// Create an account and store its profile.
    async fn create_account(
        &self,
        login: &Email,
        password: &SecretString,
        profile: UserProfile,
    ) -> Result<User, AuthError>;

    /// Check credentials and return the account's user.
    async fn sign_in(&self, login: &Email, password: &SecretString) -> Result<User, AuthError>;

    /// End the backend session for `user`.
    async fn sign_out(&self, user: &User) -> Result<(), AuthError>;
}

/// Derive the backend login for a phone number.
///
/// # Errors
///
/// Returns `AuthError::InvalidPhone` if the phone number is malformed.
pub fn pseudo_email(phone: &str) -> Result<Email, AuthError> {
    let phone = Phone::parse(phone)?;
    Ok(Email::parse(&format!(
        "{}@{PSEUDO_EMAIL_DOMAIN}",
        phone.digits()
    ))?)
}

/// Authentication service.
///
/// Wraps an [`IdentityProvider`] and tracks the current user.
#[derive(Debug)]
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    current: watch::Sender<Option<User>>,
}

impl AuthService {
    /// Create a service with nobody signed in.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (current, _) = watch::channel(None);
        Self { provider, current }
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.current.borrow().clone()
    }

    /// Observe sign-in and sign-out.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.current.subscribe()
    }

    /// Sign in with phone number and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidPhone` for a malformed phone number,
    /// `AuthError::InvalidCredentials` for a wrong password or unknown account.
    #[instrument(skip(self, password))]
    pub async fn try_sign_in(&self, phone: &str, password: &str) -> Result<User, AuthError> {
        let login = pseudo_email(phone)?;
        let password = SecretString::from(password.to_owned());
        let user = self.provider.sign_in(&login, &password).await?;

        info!(account_id = %user.id, "Signed in");
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    /// Register a new account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for a blank name, `AuthError::WeakPassword`
    /// for a short password, `AuthError::InvalidPhone`/`InvalidEmail` for
    /// malformed contact data and `AuthError::UserAlreadyExists` if the phone
    /// number is taken.
    #[instrument(skip_all)]
    pub async fn try_sign_up(&self, request: SignUpRequest) -> Result<User, AuthError> {
        let first_name = required(&request.first_name, "first name")?;
        let last_name = required(&request.last_name, "last name")?;
        validate_password(&request.password)?;

        let login = pseudo_email(&request.phone)?;
        let email = match request.email.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(email) => Some(Email::parse(email)?),
        };
        let profile = UserProfile {
            first_name,
            last_name,
            phone: Phone::parse(&request.phone)?,
            email,
            address: request.address.trim().to_string(),
        };

        let password = SecretString::from(request.password);
        let user = self
            .provider
            .create_account(&login, &password, profile)
            .await?;

        info!(account_id = %user.id, "Account created");
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    /// Sign the current user out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` if nobody is signed in, or the
    /// provider's error.
    pub async fn try_sign_out(&self) -> Result<(), AuthError> {
        let user = self.current_user().ok_or(AuthError::NotSignedIn)?;
        self.provider.sign_out(&user).await?;
        info!(account_id = %user.id, "Signed out");
        self.current.send_replace(None);
        Ok(())
    }

    /// Like [`AuthService::try_sign_in`], reporting only success.
    pub async fn sign_in(&self, phone: &str, password: &str) -> bool {
        self.try_sign_in(phone, password)
            .await
            .inspect_err(|e| warn!(error = %e, "Sign in failed"))
            .is_ok()
    }

    /// Like [`AuthService::try_sign_up`], reporting only success.
    pub async fn sign_up(&self, request: SignUpRequest) -> bool {
        self.try_sign_up(request)
            .await
            .inspect_err(|e| warn!(error = %e, "Sign up failed"))
            .is_ok()
    }

    /// Like [`AuthService::try_sign_out`], reporting only success.
    pub async fn sign_out(&self) -> bool {
        self.try_sign_out()
            .await
            .inspect_err(|e| warn!(error = %e, "Sign out failed"))
            .is_ok()
    }
}

fn required(value: &str, field: &'static str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(value.to_string())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
pub(crate) fn hash_password(password: &SecretString) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
pub(crate) fn verify_password(password: &SecretString, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryIdentityProvider::new()))
    }

    fn awa() -> SignUpRequest {
        SignUpRequest {
            first_name: "Awa".into(),
            last_name: "Diop".into(),
            phone: "77 123 45 67".into(),
            email: None,
            address: "Dakar".into(),
            password: "secret-123".into(),
        }
    }

    #[test]
    fn test_pseudo_email_uses_digits() {
        assert_eq!(
            pseudo_email("+221 77-123-45-67").unwrap().as_str(),
            "221771234567@torodo.com"
        );
        assert!(matches!(pseudo_email("abc"), Err(AuthError::InvalidPhone(_))));
    }

    #[test]
    fn test_hash_and_verify() {
        let password = SecretString::from("secret-123".to_string());
        let hash = hash_password(&password).unwrap();
        assert!(verify_password(&password, &hash).is_ok());

        let wrong = SecretString::from("secret-124".to_string());
        assert!(matches!(
            verify_password(&wrong, &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let auth = service();
        let mut observer = auth.subscribe();

        assert!(auth.sign_up(awa()).await);
        assert!(observer.has_changed().unwrap());
        assert_eq!(
            observer.borrow_and_update().as_ref().map(|u| u.first_name.as_str()),
            Some("Awa")
        );

        assert!(auth.sign_out().await);
        assert!(auth.current_user().is_none());

        assert!(auth.sign_in("771234567", "secret-123").await);
        assert_eq!(auth.current_user().unwrap().last_name, "Diop");
    }

    #[tokio::test]
    async fn test_sign_in_failures_return_false() {
        let auth = service();
        assert!(!auth.sign_in("771234567", "secret-123").await);
        assert!(auth.sign_up(awa()).await);
        assert!(auth.sign_out().await);
        assert!(!auth.sign_in("771234567", "wrong-password").await);
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_is_rejected() {
        let auth = service();
        auth.try_sign_up(awa()).await.unwrap();
        let err = auth.try_sign_up(awa()).await.unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let auth = service();
        let err = auth
            .try_sign_up(SignUpRequest {
                first_name: " ".into(),
                ..awa()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingField("first name")));

        let err = auth
            .try_sign_up(SignUpRequest {
                password: "123".into(),
                ..awa()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_without_user() {
        let auth = service();
        assert!(!auth.sign_out().await);
        assert!(matches!(auth.try_sign_out().await, Err(AuthError::NotSignedIn)));
    }
}
