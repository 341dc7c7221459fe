//! Unified error handling with Sentry integration.
//!
//! Every state-container operation returns [`Result<T>`]. Failures fall into
//! the kinds listed in [`ErrorKind`], so a presentation layer can choose a
//! message ("cart is empty" versus "bad input") without matching on every
//! variant. Storage failures are captured to Sentry before being surfaced.

use thiserror::Error;
use torodo_core::{AmountError, EmailError, Liters, PhoneError, WarehouseId};

use crate::services::auth::AuthError;
use crate::store::{StorageKey, StoreError};

/// Application-level error type for the storefront core.
#[derive(Debug, Error)]
pub enum AppError {
    /// Caller-supplied operand failed a precondition (non-positive quantity,
    /// missing field, malformed number). Nothing was changed.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A stock transfer asked for more than the source warehouse holds.
    #[error("Insufficient stock in warehouse {warehouse}: {available} available, {requested} requested")]
    InsufficientStock {
        warehouse: WarehouseId,
        available: Liters,
        requested: Liters,
    },

    /// Checkout was attempted on an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// The referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The durable store rejected an operation.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Coarse classification of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad operand; the caller should correct its input.
    Validation,
    /// Not enough of a resource (stock) to complete the operation.
    InsufficientResource,
    /// Operation invoked on empty or absent state.
    Precondition,
    /// The durable store failed.
    Storage,
    /// The identity provider rejected the request.
    Auth,
}

impl AppError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a missing record.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientResource,
            Self::EmptyCart | Self::NotFound { .. } => ErrorKind::Precondition,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Auth(_) => ErrorKind::Auth,
        }
    }

    /// A message safe to show to an end user.
    ///
    /// Internal details of storage and auth backends are not exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(_) => "Could not save your changes, please try again".to_string(),
            Self::Auth(AuthError::InvalidCredentials) => "Invalid phone number or password".to_string(),
            Self::Auth(AuthError::UserAlreadyExists) => {
                "An account with this phone number already exists".to_string()
            }
            Self::Auth(AuthError::WeakPassword(msg)) => msg.clone(),
            Self::Auth(_) => "Authentication error".to_string(),
            Self::EmptyCart => "Your cart is empty".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<AmountError> for AppError {
    fn from(err: AmountError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<PhoneError> for AppError {
    fn from(err: PhoneError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Report a storage failure to Sentry and the log.
pub fn capture_storage_error(key: StorageKey, err: &StoreError) {
    let event_id = sentry::capture_error(err);
    tracing::error!(
        key = %key,
        error = %err,
        sentry_event_id = %event_id,
        "Storage failure"
    );
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error (checkouts, stock transfers).
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String(value.clone()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
