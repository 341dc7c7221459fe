//! Subcommand implementations.

pub mod cart;
pub mod customers;
pub mod data;
pub mod products;
pub mod sales;
pub mod stock;
pub mod subscriptions;
pub mod theme;

use thiserror::Error;

use torodo_storefront::error::AppError;
use torodo_storefront::store::StoreError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The operation was rejected.
    #[error("{}", .0.user_message())]
    App(#[from] AppError),

    /// The data directory could not be read or written.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// A command-line value could not be interpreted.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
