//! Application state: every container over one shared store.

use std::sync::Arc;

use torodo_core::CustomerId;
use tracing::{info, instrument, warn};

use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::checkout;
use crate::clock::{Clock, SystemClock};
use crate::config::TorodoConfig;
use crate::container::PersistPolicy;
use crate::customers::Customers;
use crate::error::{Result, add_breadcrumb};
use crate::sales::{SaleRecord, Sales};
use crate::services::auth::{AuthService, IdentityProvider, MemoryIdentityProvider};
use crate::stock::Stock;
use crate::store::{DurableStore, FileStore, StoreError};
use crate::subscriptions::Subscriptions;
use crate::theme::Theme;

/// The application's state containers, all backed by the same store.
///
/// Each container is loaded once by [`AppState::open`]. Containers are
/// independent: a mutation of one never touches another's key, except
/// through [`AppState::checkout`].
#[derive(Debug)]
pub struct AppState {
    store: Arc<dyn DurableStore>,
    catalog: &'static Catalog,
    pub cart: Cart,
    pub stock: Stock,
    pub customers: Customers,
    pub subscriptions: Subscriptions,
    pub sales: Sales,
    pub theme: Theme,
    pub auth: AuthService,
}

impl AppState {
    /// Open every container over `store`.
    ///
    /// Loads run concurrently; each one falls back to its default on failure.
    #[instrument(skip_all)]
    pub async fn open(
        store: Arc<dyn DurableStore>,
        policy: PersistPolicy,
        clock: Arc<dyn Clock>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let (cart, stock, customers, subscriptions, sales, theme) = tokio::join!(
            Cart::open(store.clone(), policy),
            Stock::open(store.clone(), policy),
            Customers::open(store.clone(), policy, clock.clone()),
            Subscriptions::open(store.clone(), policy, clock.clone()),
            Sales::open(store.clone(), policy, clock),
            Theme::open(store.clone(), policy),
        );
        info!("State loaded");

        Self {
            store,
            catalog: Catalog::builtin(),
            cart,
            stock,
            customers,
            subscriptions,
            sales,
            theme,
            auth: AuthService::new(identity),
        }
    }

    /// Open over a file store in the configured data directory, with the
    /// system clock and an in-memory identity provider.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the data directory cannot be created.
    pub async fn open_with_config(config: &TorodoConfig) -> std::result::Result<Self, StoreError> {
        let store = FileStore::open(&config.data_dir).await?;
        Ok(Self::open(
            Arc::new(store),
            config.persist,
            Arc::new(SystemClock),
            Arc::new(MemoryIdentityProvider::new()),
        )
        .await)
    }

    #[must_use]
    pub const fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn DurableStore> {
        &self.store
    }

    /// Commit the cart as a sale, attributed to `customer` if given.
    ///
    /// # Errors
    ///
    /// See [`checkout::commit`] and [`checkout::commit_for_customer`].
    pub fn checkout(&mut self, customer: Option<&CustomerId>) -> Result<SaleRecord> {
        match customer {
            Some(id) => checkout::commit_for_customer(
                &mut self.cart,
                &mut self.sales,
                &mut self.customers,
                id,
            ),
            None => checkout::commit(&mut self.cart, &mut self.sales),
        }
    }

    /// Wait until every container's latest value is stored.
    ///
    /// Every container is flushed even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns the first store error encountered.
    pub async fn flush_all(&self) -> std::result::Result<(), StoreError> {
        let results = [
            self.cart.flush().await,
            self.stock.flush().await,
            self.customers.flush().await,
            self.subscriptions.flush().await,
            self.sales.flush().await,
            self.theme.flush().await,
        ];
        results.into_iter().collect()
    }

    /// Delete every stored value and reset all containers to their defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Storage` if the store cannot be cleared; containers
    /// keep their values in that case.
    #[instrument(skip(self))]
    pub async fn clear_all(&mut self) -> Result<()> {
        if let Err(e) = self.flush_all().await {
            warn!(error = %e, "Pending save failed before clearing data");
        }
        self.store.clear().await?;

        self.cart.reset();
        self.stock.reset();
        self.customers.reset();
        self.subscriptions.reset();
        self.sales.reset();
        self.theme.reset();

        add_breadcrumb("data", "All data cleared", &[]);
        info!("All data cleared");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use torodo_core::{Amount, Liters, ThemePreference, WarehouseId};

    use super::*;
    use crate::catalog::SizeVariant;
    use crate::store::MemoryStore;

    async fn state(store: Arc<MemoryStore>) -> AppState {
        AppState::open(
            store,
            PersistPolicy::default(),
            Arc::new(SystemClock),
            Arc::new(MemoryIdentityProvider::new()),
        )
        .await
    }

    #[tokio::test]
    async fn test_open_empty_store_gives_defaults() {
        let state = state(Arc::new(MemoryStore::new())).await;
        assert!(state.cart.is_empty());
        assert_eq!(state.stock.total(), Liters::ZERO);
        assert!(state.customers.all().is_empty());
        assert!(state.sales.all().is_empty());
        assert_eq!(state.theme.preference(), ThemePreference::System);
        assert!(state.auth.current_user().is_none());
    }

    #[tokio::test]
    async fn test_checkout_and_reload() {
        let store = Arc::new(MemoryStore::new());
        let mut app = state(store.clone()).await;
        app.cart
            .add_line("milk", "Lait Frais", SizeVariant::new(1, 1000), 2)
            .unwrap();
        let sale = app.checkout(None).unwrap();
        app.flush_all().await.unwrap();

        let reloaded = state(store).await;
        assert!(reloaded.cart.is_empty());
        assert_eq!(reloaded.sales.all()[0].id, sale.id);
        assert_eq!(reloaded.sales.all()[0].total, Amount::from_cfa(2000));
    }

    #[tokio::test]
    async fn test_clear_all_resets_everything() {
        let store = Arc::new(MemoryStore::new());
        let mut app = state(store.clone()).await;
        app.stock
            .adjust(&WarehouseId::new("A"), Decimal::from(40))
            .unwrap();
        app.theme.set(ThemePreference::Dark);
        app.cart
            .add_line("yoghurt", "SOOW", SizeVariant::new(1, 1000), 1)
            .unwrap();

        app.clear_all().await.unwrap();

        assert!(store.is_empty());
        assert!(app.cart.is_empty());
        assert_eq!(app.stock.total(), Liters::ZERO);
        assert_eq!(app.theme.preference(), ThemePreference::System);

        let reloaded = state(store).await;
        assert_eq!(reloaded.stock.total(), Liters::ZERO);
    }

    #[tokio::test]
    async fn test_flush_all_reports_failure() {
        let store = Arc::new(MemoryStore::new());
        let mut app = AppState::open(
            store.clone(),
            PersistPolicy {
                max_retries: 0,
                base_delay: std::time::Duration::from_millis(1),
            },
            Arc::new(SystemClock),
            Arc::new(MemoryIdentityProvider::new()),
        )
        .await;

        store.fail_next_saves(1);
        app.theme.set(ThemePreference::Light);
        assert!(app.flush_all().await.is_err());

        app.theme.set(ThemePreference::Dark);
        app.flush_all().await.unwrap();
    }
}
