//! Sales history.
//!
//! Records are immutable snapshots of committed carts, kept newest first.
//! The only way to create one is [`crate::checkout`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use torodo_core::{Amount, CustomerId, Liters, ProductId, SaleId};

use crate::cart::CartLine;
use crate::clock::Clock;
use crate::container::{Entity, PersistPolicy, StateContainer};
use crate::error::{AppError, Result};
use crate::store::{DurableStore, StorageKey, StoreError};

/// A committed cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    pub id: SaleId,
    #[serde(rename = "items")]
    pub lines: Vec<CartLine>,
    pub total: Amount,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
}

impl SaleRecord {
    /// Liters sold in this sale.
    #[must_use]
    pub fn liters(&self) -> Liters {
        self.lines.iter().map(CartLine::liters).sum()
    }
}

/// Aggregate figures over the sales history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub sales: usize,
    pub revenue: Amount,
    pub liters_by_product: BTreeMap<ProductId, Liters>,
}

/// The persisted sales log, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesLog(pub Vec<SaleRecord>);

impl Entity for SalesLog {
    const KEY: StorageKey = StorageKey::Transactions;
}

/// The sales container.
#[derive(Debug)]
pub struct Sales {
    state: StateContainer<SalesLog>,
    clock: Arc<dyn Clock>,
}

impl Sales {
    /// Open the log, loading any stored sales.
    pub async fn open(store: Arc<dyn DurableStore>, policy: PersistPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: StateContainer::open(store, policy).await,
            clock,
        }
    }

    /// Prepend a sale built from a snapshot of cart lines.
    pub(crate) fn record(&mut self, lines: Vec<CartLine>, customer_id: Option<CustomerId>) -> Result<SaleRecord> {
        if lines.is_empty() {
            return Err(AppError::EmptyCart);
        }
        let sale = SaleRecord {
            id: SaleId::generate(),
            total: lines.iter().map(CartLine::subtotal).sum(),
            lines,
            date: self.clock.now(),
            customer_id,
        };

        let recorded = sale.clone();
        self.state.update(move |log| {
            log.0.insert(0, sale);
            Ok(())
        })?;
        Ok(recorded)
    }

    /// Every sale, newest first.
    #[must_use]
    pub fn all(&self) -> &[SaleRecord] {
        &self.state.get().0
    }

    #[must_use]
    pub fn get(&self, id: &SaleId) -> Option<&SaleRecord> {
        self.all().iter().find(|s| &s.id == id)
    }

    #[must_use]
    pub fn summary(&self) -> SalesSummary {
        let mut summary = SalesSummary::default();
        for sale in self.all() {
            summary.sales += 1;
            summary.revenue += sale.total;
            for line in &sale.lines {
                let sold = summary
                    .liters_by_product
                    .entry(line.product_id.clone())
                    .or_insert(Liters::ZERO);
                *sold = *sold + line.liters();
            }
        }
        summary
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Wait for pending saves.
    ///
    /// # Errors
    ///
    /// Returns the store error if the latest save failed.
    pub async fn flush(&self) -> std::result::Result<(), StoreError> {
        self.state.flush().await
    }

    pub(crate) fn reset(&mut self) {
        self.state.reset();
    }
}
