//! Torodo CLI - back-office tools over the local data directory.
//!
//! # Usage
//!
//! ```bash
//! # Show stock levels and move 12.5 L from warehouse A to B
//! torodo stock show
//! torodo stock transfer A B 12,5
//!
//! # Ring up a sale
//! torodo cart add milk 1 2
//! torodo cart checkout --customer <id>
//!
//! # Register a customer and subscribe them to weekly milk
//! torodo customers add --name "Awa Diop" --phone "77 123 45 67"
//! torodo subscriptions add --customer <id> --product milk --liters 1 --quantity 2 --frequency weekly --warehouse A
//!
//! # Wipe everything
//! torodo data clear --yes
//! ```
//!
//! # Commands
//!
//! - `products` - List the catalog
//! - `stock` - Show, adjust and transfer stock
//! - `cart` - Manage the cart and check out
//! - `customers` - Customer registry
//! - `subscriptions` - Delivery subscriptions
//! - `sales` - Sales history and summary
//! - `theme` - Color scheme preference
//! - `data clear` - Delete all stored data

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use torodo_storefront::config::TorodoConfig;
use torodo_storefront::state::AppState;

mod commands;

#[derive(Parser)]
#[command(name = "torodo")]
#[command(author, version, about = "Torodo Farms back-office tools")]
struct Cli {
    /// Data directory (overrides `TORODO_DATA_DIR`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products and warehouses
    Products,
    /// Warehouse stock
    Stock {
        #[command(subcommand)]
        action: commands::stock::StockAction,
    },
    /// Shopping cart
    Cart {
        #[command(subcommand)]
        action: commands::cart::CartAction,
    },
    /// Customer registry
    Customers {
        #[command(subcommand)]
        action: commands::customers::CustomerAction,
    },
    /// Delivery subscriptions
    Subscriptions {
        #[command(subcommand)]
        action: commands::subscriptions::SubscriptionAction,
    },
    /// Sales history
    Sales {
        #[command(subcommand)]
        action: commands::sales::SalesAction,
    },
    /// Color scheme preference
    Theme {
        #[command(subcommand)]
        action: commands::theme::ThemeAction,
    },
    /// Stored data maintenance
    Data {
        #[command(subcommand)]
        action: commands::data::DataAction,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &TorodoConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.expose_secret(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry
                .environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match TorodoConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Configuration error: {e}");
            }
            std::process::exit(2);
        }
    };
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "torodo_storefront=info,torodo_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli.command, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &TorodoConfig) -> Result<(), commands::CliError> {
    let mut state = AppState::open_with_config(config).await?;
    tracing::debug!(data_dir = %config.data_dir.display(), "Data directory opened");

    match command {
        Commands::Products => commands::products::list(&state),
        Commands::Stock { action } => commands::stock::run(&mut state, action)?,
        Commands::Cart { action } => commands::cart::run(&mut state, action)?,
        Commands::Customers { action } => commands::customers::run(&mut state, action)?,
        Commands::Subscriptions { action } => commands::subscriptions::run(&mut state, action)?,
        Commands::Sales { action } => commands::sales::run(&state, action),
        Commands::Theme { action } => commands::theme::run(&mut state, action),
        Commands::Data { action } => commands::data::run(&mut state, action).await?,
    }

    state.flush_all().await?;
    Ok(())
}
