//! Warehouse stock levels.
//!
//! Levels are liters per warehouse and never go below zero. A transfer moves
//! liters between two warehouses in one mutation, so the sum over the pair is
//! preserved and a single save covers both sides.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use torodo_core::{Liters, WarehouseId};
use tracing::info;

use crate::catalog::Catalog;
use crate::container::{Entity, PersistPolicy, StateContainer};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::store::{DurableStore, StorageKey, StoreError};

/// Stock keys written by the first app release, which only knew two
/// warehouses, and the catalog warehouse each one stands for.
const RENAMED_WAREHOUSES: [(&str, &str); 2] = [("warehouse1", "A"), ("warehouse2", "B")];

/// Liters held per warehouse.
///
/// Loading maps the old `warehouse1`/`warehouse2` keys to `A`/`B` and adds
/// any catalog warehouse missing from the stored map at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<WarehouseId, Liters>",
    into = "BTreeMap<WarehouseId, Liters>"
)]
pub struct StockLevels(pub BTreeMap<WarehouseId, Liters>);

impl Default for StockLevels {
    /// Every catalog warehouse at zero.
    fn default() -> Self {
        Self(
            Catalog::builtin()
                .warehouses()
                .iter()
                .map(|w| (w.id.clone(), Liters::ZERO))
                .collect(),
        )
    }
}

impl From<BTreeMap<WarehouseId, Liters>> for StockLevels {
    fn from(mut stored: BTreeMap<WarehouseId, Liters>) -> Self {
        for (old, new) in RENAMED_WAREHOUSES {
            if let Some(level) = stored.remove(&WarehouseId::new(old)) {
                stored.entry(WarehouseId::new(new)).or_insert(level);
            }
        }
        let mut levels = Self::default();
        levels.0.extend(stored);
        levels
    }
}

impl From<StockLevels> for BTreeMap<WarehouseId, Liters> {
    fn from(levels: StockLevels) -> Self {
        levels.0
    }
}

impl Entity for StockLevels {
    const KEY: StorageKey = StorageKey::Stocks;
}

impl StockLevels {
    /// Level of one warehouse; unknown warehouses hold nothing.
    #[must_use]
    pub fn level(&self, warehouse: &WarehouseId) -> Liters {
        self.0.get(warehouse).copied().unwrap_or(Liters::ZERO)
    }

    #[must_use]
    pub fn total(&self) -> Liters {
        self.0.values().copied().sum()
    }

    fn knows(&self, warehouse: &WarehouseId) -> bool {
        self.0.contains_key(warehouse) || Catalog::builtin().warehouse(warehouse).is_some()
    }
}

/// A requested move of stock between two warehouses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: WarehouseId,
    pub to: WarehouseId,
    pub amount: Liters,
}

/// A transfer that passed every check against a specific set of levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransfer {
    request: TransferRequest,
    from_level: Liters,
    to_level: Liters,
}

impl TransferRequest {
    /// Check the request against `levels`.
    ///
    /// # Errors
    ///
    /// - `AppError::Validation` if the amount is not positive, both ends
    ///   are the same warehouse, or the destination level would overflow
    /// - `AppError::NotFound` if either warehouse is unknown
    /// - `AppError::InsufficientStock` if the source holds less than `amount`
    pub fn validate(self, levels: &StockLevels) -> Result<ValidatedTransfer> {
        if !self.amount.is_positive() {
            return Err(AppError::validation("transfer amount must be greater than 0"));
        }
        if self.from == self.to {
            return Err(AppError::validation(
                "source and destination warehouse must differ",
            ));
        }
        for warehouse in [&self.from, &self.to] {
            if !levels.knows(warehouse) {
                return Err(AppError::not_found("warehouse", warehouse));
            }
        }

        let from_level = levels.level(&self.from);
        if from_level < self.amount {
            return Err(AppError::InsufficientStock {
                warehouse: self.from,
                available: from_level,
                requested: self.amount,
            });
        }

        let to_level = levels
            .level(&self.to)
            .checked_add(self.amount)
            .ok_or_else(|| {
                AppError::validation(format!("stock in warehouse {} is out of range", self.to))
            })?;

        Ok(ValidatedTransfer {
            from_level: from_level - self.amount,
            to_level,
            request: self,
        })
    }
}

impl ValidatedTransfer {
    #[must_use]
    pub const fn request(&self) -> &TransferRequest {
        &self.request
    }

    /// Apply to the levels it was validated against.
    pub fn apply(self, levels: &mut StockLevels) {
        let TransferRequest { from, to, .. } = self.request;
        levels.0.insert(from, self.from_level);
        levels.0.insert(to, self.to_level);
    }
}

/// The stock container.
#[derive(Debug)]
pub struct Stock {
    state: StateContainer<StockLevels>,
}

impl Stock {
    /// Open the stock container, loading any stored levels.
    pub async fn open(store: Arc<dyn DurableStore>, policy: PersistPolicy) -> Self {
        Self {
            state: StateContainer::open(store, policy).await,
        }
    }

    /// Add `delta` liters (negative to remove) to a warehouse, clamping at
    /// zero. Returns the new level.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown warehouse, or
    /// `AppError::Validation` if the new level would overflow.
    pub fn adjust(&mut self, warehouse: &WarehouseId, delta: Decimal) -> Result<Liters> {
        self.state.update(|levels| {
            if !levels.knows(warehouse) {
                return Err(AppError::not_found("warehouse", warehouse));
            }
            let next = levels
                .level(warehouse)
                .as_decimal()
                .checked_add(delta)
                .ok_or_else(|| {
                    AppError::validation(format!("stock in warehouse {warehouse} is out of range"))
                })?;
            let next = Liters::new(next.max(Decimal::ZERO));
            levels.0.insert(warehouse.clone(), next);
            Ok(next)
        })
    }

    /// Move `amount` liters from one warehouse to another.
    ///
    /// # Errors
    ///
    /// See [`TransferRequest::validate`]. On error nothing changes.
    pub fn transfer(&mut self, from: &WarehouseId, to: &WarehouseId, amount: Liters) -> Result<()> {
        let request = TransferRequest {
            from: from.clone(),
            to: to.clone(),
            amount,
        };
        self.state.update(|levels| {
            request.validate(levels)?.apply(levels);
            Ok(())
        })?;

        add_breadcrumb(
            "stock",
            "Stock transferred",
            &[
                ("from", from.to_string()),
                ("to", to.to_string()),
                ("amount", amount.to_string()),
            ],
        );
        info!(from = %from, to = %to, amount = %amount, "Stock transferred");
        Ok(())
    }

    /// Transfer an amount typed as text, such as `"2,5"`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the text is not a number, otherwise
    /// as [`Stock::transfer`].
    pub fn transfer_input(&mut self, from: &WarehouseId, to: &WarehouseId, amount: &str) -> Result<()> {
        let amount = Liters::parse(amount)?;
        self.transfer(from, to, amount)
    }

    #[must_use]
    pub fn level(&self, warehouse: &WarehouseId) -> Liters {
        self.state.get().level(warehouse)
    }

    #[must_use]
    pub fn levels(&self) -> &StockLevels {
        self.state.get()
    }

    /// Liters across every warehouse.
    #[must_use]
    pub fn total(&self) -> Liters {
        self.state.get().total()
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;

    fn a() -> WarehouseId {
        WarehouseId::new("A")
    }

    fn b() -> WarehouseId {
        WarehouseId::new("B")
    }

    async fn stock_with(a_level: i64, b_level: i64) -> (Arc<MemoryStore>, Stock) {
        let store = Arc::new(MemoryStore::new());
        let mut stock = Stock::open(store.clone(), PersistPolicy::default()).await;
        stock.adjust(&a(), Decimal::from(a_level)).unwrap();
        stock.adjust(&b(), Decimal::from(b_level)).unwrap();
        (store, stock)
    }

    #[tokio::test]
    async fn test_default_has_catalog_warehouses_at_zero() {
        let store = Arc::new(MemoryStore::new());
        let stock = Stock::open(store, PersistPolicy::default()).await;
        assert_eq!(stock.levels().0.len(), 2);
        assert_eq!(stock.total(), Liters::ZERO);
    }

    #[tokio::test]
    async fn test_adjust_clamps_at_zero() {
        let (_, mut stock) = stock_with(5, 0).await;
        let level = stock.adjust(&a(), Decimal::from(-8)).unwrap();
        assert_eq!(level, Liters::ZERO);
    }

    #[tokio::test]
    async fn test_adjust_unknown_warehouse() {
        let (_, mut stock) = stock_with(0, 0).await;
        let err = stock
            .adjust(&WarehouseId::new("Z"), Decimal::ONE)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[tokio::test]
    async fn test_transfer_round_trip_restores_levels() {
        let (_, mut stock) = stock_with(10, 4).await;
        let amount = Liters::parse("2.5").unwrap();

        stock.transfer(&a(), &b(), amount).unwrap();
        assert_eq!(stock.level(&a()), Liters::parse("7.5").unwrap());
        assert_eq!(stock.total(), Liters::whole(14));

        stock.transfer(&b(), &a(), amount).unwrap();
        assert_eq!(stock.level(&a()), Liters::whole(10));
        assert_eq!(stock.level(&b()), Liters::whole(4));
    }

    #[tokio::test]
    async fn test_transfer_above_available_changes_nothing() {
        let (store, mut stock) = stock_with(3, 1).await;
        stock.flush().await.unwrap();
        let saves = store.save_count();

        let err = stock.transfer(&a(), &b(), Liters::whole(4)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientResource);
        assert!(matches!(
            err,
            AppError::InsufficientStock { available, .. } if available == Liters::whole(3)
        ));
        assert_eq!(stock.level(&a()), Liters::whole(3));
        assert_eq!(stock.level(&b()), Liters::whole(1));
        stock.flush().await.unwrap();
        assert_eq!(store.save_count(), saves);
    }

    #[tokio::test]
    async fn test_transfer_rejects_bad_amounts() {
        let (_, mut stock) = stock_with(3, 0).await;
        for input in ["0", "-1", "abc", ""] {
            let err = stock.transfer_input(&a(), &b(), input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "input {input:?}");
        }
        assert_eq!(stock.level(&a()), Liters::whole(3));
    }

    #[tokio::test]
    async fn test_transfer_accepts_comma_decimal() {
        let (_, mut stock) = stock_with(3, 0).await;
        stock.transfer_input(&a(), &b(), "1,5").unwrap();
        assert_eq!(stock.level(&b()), Liters::parse("1.5").unwrap());
    }

    #[tokio::test]
    async fn test_transfer_to_same_warehouse_is_rejected() {
        let (_, mut stock) = stock_with(3, 0).await;
        let err = stock.transfer(&a(), &a(), Liters::whole(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_adjust_overflow_is_rejected() {
        let (_, mut stock) = stock_with(0, 0).await;
        stock.adjust(&a(), Decimal::MAX).unwrap();

        let err = stock.adjust(&a(), Decimal::MAX).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(stock.level(&a()), Liters::new(Decimal::MAX));
    }

    #[tokio::test]
    async fn test_transfer_into_full_warehouse_changes_nothing() {
        let (_, mut stock) = stock_with(1, 0).await;
        stock.adjust(&b(), Decimal::MAX).unwrap();

        let err = stock.transfer(&a(), &b(), Liters::whole(1)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(stock.level(&a()), Liters::whole(1));
        assert_eq!(stock.level(&b()), Liters::new(Decimal::MAX));
        assert_eq!(stock.total(), Liters::new(Decimal::MAX));
    }

    #[test]
    fn test_first_release_warehouse_keys_are_renamed() {
        let levels: StockLevels =
            serde_json::from_str(r#"{"warehouse1":120,"warehouse2":7.5}"#).unwrap();

        assert_eq!(levels.level(&a()), Liters::whole(120));
        assert_eq!(levels.level(&b()), Liters::parse("7.5").unwrap());
        assert_eq!(levels.0.len(), 2);
    }

    #[test]
    fn test_missing_catalog_warehouse_loads_at_zero() {
        let levels: StockLevels = serde_json::from_str(r#"{"A":"3"}"#).unwrap();
        assert_eq!(levels.level(&a()), Liters::whole(3));
        assert!(levels.0.contains_key(&b()));
    }

    #[test]
    fn test_validated_transfer_apply() {
        let mut levels = StockLevels::default();
        levels.0.insert(a(), Liters::whole(6));

        let validated = TransferRequest {
            from: a(),
            to: b(),
            amount: Liters::whole(2),
        }
        .validate(&levels)
        .unwrap();
        assert_eq!(validated.request().amount, Liters::whole(2));

        validated.apply(&mut levels);
        assert_eq!(levels.level(&a()), Liters::whole(4));
        assert_eq!(levels.level(&b()), Liters::whole(2));
    }
}
