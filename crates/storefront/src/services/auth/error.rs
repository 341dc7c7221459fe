//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid phone number format.
    #[error("invalid phone number: {0}")]
    InvalidPhone(#[from] torodo_core::PhoneError),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] torodo_core::EmailError),

    /// A required sign-up field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this identifier already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    NotSignedIn,

    /// The identity backend failed or is unreachable.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
