//! Shopping cart.
//!
//! Lines are identified by `(product, size)`. Adding an existing identity
//! merges quantities instead of creating a second line, and lines keep the
//! order in which their identity was first added.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use torodo_core::{Amount, Liters, ProductId};
use tracing::debug;

use crate::catalog::{Catalog, SizeVariant};
use crate::container::{Entity, PersistPolicy, StateContainer};
use crate::error::{AppError, Result};
use crate::store::{DurableStore, StorageKey, StoreError};

/// One product size in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub size: SizeVariant,
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id.clone(),
            size: self.size,
        }
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Amount {
        self.size.unit_price * self.quantity
    }

    /// Volume of this line.
    #[must_use]
    pub fn liters(&self) -> Liters {
        self.size.liters.times(self.quantity)
    }
}

/// Identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: ProductId,
    pub size: SizeVariant,
}

impl LineKey {
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, size: SizeVariant) -> Self {
        Self {
            product_id: product_id.into(),
            size,
        }
    }

    fn matches(&self, line: &CartLine) -> bool {
        line.product_id == self.product_id && line.size == self.size
    }
}

/// The persisted cart value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartLines(pub Vec<CartLine>);

impl Entity for CartLines {
    const KEY: StorageKey = StorageKey::Cart;
}

impl CartLines {
    /// Sum of unit price times quantity over every line.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.0.iter().map(CartLine::subtotal).sum()
    }
}

/// The cart container.
#[derive(Debug)]
pub struct Cart {
    state: StateContainer<CartLines>,
}

impl Cart {
    /// Open the cart, loading any stored lines.
    pub async fn open(store: Arc<dyn DurableStore>, policy: PersistPolicy) -> Self {
        Self {
            state: StateContainer::open(store, policy).await,
        }
    }

    /// Add `quantity` units of a line, merging with an existing line of the
    /// same identity.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if `quantity` is zero.
    pub fn add_line(
        &mut self,
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        size: SizeVariant,
        quantity: u32,
    ) -> Result<()> {
        if quantity < 1 {
            return Err(AppError::validation("quantity must be at least 1"));
        }
        let product_id = product_id.into();
        let name = name.into();

        self.state.update(|lines| {
            let key = LineKey {
                product_id,
                size,
            };
            if let Some(line) = lines.0.iter_mut().find(|l| key.matches(l)) {
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| AppError::validation("quantity is too large"))?;
            } else {
                lines.0.push(CartLine {
                    product_id: key.product_id,
                    name,
                    size,
                    quantity,
                });
            }
            Ok(())
        })
    }

    /// Add a catalog product by id and size in liters.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product or size is not in the
    /// catalog, or `AppError::Validation` if `quantity` is zero.
    pub fn add_catalog_item(
        &mut self,
        catalog: &Catalog,
        product_id: &ProductId,
        liters: Liters,
        quantity: u32,
    ) -> Result<()> {
        let product = catalog
            .product(product_id)
            .ok_or_else(|| AppError::not_found("product", product_id))?;
        let size = catalog
            .size(product_id, liters)
            .ok_or_else(|| AppError::not_found("size", format!("{product_id} {liters}")))?;
        self.add_line(product.id.clone(), product.name.clone(), size, quantity)
    }

    /// Remove the line with this identity. Returns `false` (and saves
    /// nothing) if there is no such line.
    pub fn remove_line(&mut self, key: &LineKey) -> bool {
        if !self.contains(key) {
            return false;
        }
        self.state
            .update(|lines| {
                lines.0.retain(|l| !key.matches(l));
                Ok(())
            })
            .is_ok()
    }

    /// Set the quantity of an existing line.
    ///
    /// A quantity below 1 is ignored, as is an unknown identity; both return
    /// `false` and leave the cart untouched.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: u32) -> bool {
        if quantity < 1 {
            debug!(product = %key.product_id, "Ignoring quantity below 1");
            return false;
        }
        if !self.contains(key) {
            return false;
        }
        self.state
            .update(|lines| {
                for line in lines.0.iter_mut().filter(|l| key.matches(l)) {
                    line.quantity = quantity;
                }
                Ok(())
            })
            .is_ok()
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.state.replace(CartLines::default());
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.state.get().0
    }

    #[must_use]
    pub fn line(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines().iter().find(|l| key.matches(l))
    }

    fn contains(&self, key: &LineKey) -> bool {
        self.line(key).is_some()
    }

    /// Sum of unit price times quantity. Recomputed on every call.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.state.get().total()
    }

    /// Number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines().iter().map(|l| u64::from(l.quantity)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines().is_empty()
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

    fn one_liter() -> SizeVariant {
        SizeVariant::new(1, 1000)
    }

    fn ten_liters() -> SizeVariant {
        SizeVariant::new(10, 8000)
    }

    async fn empty_cart() -> (Arc<MemoryStore>, Cart) {
        let store = Arc::new(MemoryStore::new());
        let cart = Cart::open(store.clone(), PersistPolicy::default()).await;
        (store, cart)
    }

    #[tokio::test]
    async fn test_same_identity_merges_quantities() {
        let (_, mut cart) = empty_cart().await;
        cart.add_line("milk", "Lait Frais", one_liter(), 2).unwrap();
        cart.add_line("milk", "Lait Frais", one_liter(), 3).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_different_size_is_a_separate_line() {
        let (_, mut cart) = empty_cart().await;
        cart.add_line("milk", "Lait Frais", one_liter(), 1).unwrap();
        cart.add_line("milk", "Lait Frais", ten_liters(), 1).unwrap();
        cart.add_line("yoghurt", "SOOW", one_liter(), 1).unwrap();

        let ids: Vec<_> = cart
            .lines()
            .iter()
            .map(|l| (l.product_id.as_str(), l.size.liters))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("milk", Liters::whole(1)),
                ("milk", Liters::whole(10)),
                ("yoghurt", Liters::whole(1)),
            ]
        );
    }

    #[tokio::test]
    async fn test_total_is_order_independent() {
        let (_, mut forward) = empty_cart().await;
        forward.add_line("milk", "Lait Frais", one_liter(), 2).unwrap();
        forward.add_line("yoghurt", "SOOW", ten_liters(), 1).unwrap();

        let (_, mut backward) = empty_cart().await;
        backward.add_line("yoghurt", "SOOW", ten_liters(), 1).unwrap();
        backward.add_line("milk", "Lait Frais", one_liter(), 2).unwrap();

        assert_eq!(forward.total(), Amount::from_cfa(10_000));
        assert_eq!(forward.total(), backward.total());
    }

    #[tokio::test]
    async fn test_zero_quantity_is_rejected() {
        let (store, mut cart) = empty_cart().await;
        let err = cart.add_line("milk", "Lait Frais", one_liter(), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(cart.is_empty());
        cart.flush().await.unwrap();
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_set_quantity_below_one_is_ignored() {
        let (_, mut cart) = empty_cart().await;
        cart.add_line("milk", "Lait Frais", one_liter(), 2).unwrap();
        let key = LineKey::new("milk", one_liter());

        assert!(!cart.set_quantity(&key, 0));
        assert_eq!(cart.line(&key).unwrap().quantity, 2);

        assert!(cart.set_quantity(&key, 7));
        assert_eq!(cart.line(&key).unwrap().quantity, 7);
    }

    #[tokio::test]
    async fn test_remove_absent_line_is_noop() {
        let (store, mut cart) = empty_cart().await;
        assert!(!cart.remove_line(&LineKey::new("milk", one_liter())));
        cart.flush().await.unwrap();
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_line() {
        let (_, mut cart) = empty_cart().await;
        cart.add_line("milk", "Lait Frais", one_liter(), 2).unwrap();
        cart.add_line("yoghurt", "SOOW", one_liter(), 1).unwrap();

        assert!(cart.remove_line(&LineKey::new("milk", one_liter())));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), 1);
    }

    #[tokio::test]
    async fn test_item_count_exceeds_single_line_limit() {
        let (_, mut cart) = empty_cart().await;
        cart.add_line("milk", "Lait Frais", one_liter(), u32::MAX).unwrap();
        cart.add_line("milk", "Lait Frais", ten_liters(), 2).unwrap();

        assert_eq!(cart.item_count(), u64::from(u32::MAX) + 2);
    }

    #[tokio::test]
    async fn test_total_saturates_instead_of_panicking() {
        let (_, mut cart) = empty_cart().await;
        for liters in 1..=3 {
            cart.add_line("milk", "Lait Frais", SizeVariant::new(liters, i64::MAX), u32::MAX)
                .unwrap();
        }

        assert_eq!(cart.total(), Amount::new(rust_decimal::Decimal::MAX));
    }

    #[tokio::test]
    async fn test_add_catalog_item() {
        let (_, mut cart) = empty_cart().await;
        let catalog = Catalog::builtin();
        cart.add_catalog_item(catalog, &ProductId::new("yoghurt"), Liters::whole(10), 2)
            .unwrap();
        assert_eq!(cart.lines()[0].name, "SOOW");
        assert_eq!(cart.total(), Amount::from_cfa(16_000));

        let err = cart
            .add_catalog_item(catalog, &ProductId::new("milk"), Liters::whole(3), 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[tokio::test]
    async fn test_cart_survives_reopen() {
        let (store, mut cart) = empty_cart().await;
        cart.add_line("milk", "Lait Frais", one_liter(), 2).unwrap();
        cart.flush().await.unwrap();

        let reopened = Cart::open(store, PersistPolicy::default()).await;
        assert_eq!(reopened.lines(), cart.lines());
    }

    #[tokio::test]
    async fn test_cart_without_envelope_is_read() {
        let store = Arc::new(MemoryStore::with_entries([(
            "@torodofarms_cart",
            r#"[{"productId":"milk","name":"Lait Frais","size":{"size":1,"price":1000},"quantity":3}]"#,
        )]));
        let cart = Cart::open(store, PersistPolicy::default()).await;
        assert_eq!(cart.total(), Amount::from_cfa(3000));
    }

    // Lines from the first app release carry a numeric product id and a
    // size label without a price, so they cannot be priced and are dropped.
    #[tokio::test]
    async fn test_unpriced_cart_lines_start_empty() {
        let store = Arc::new(MemoryStore::with_entries([(
            "@torodofarms_cart",
            r#"[{"productId":1,"name":"Lait Frais","size":"1L","quantity":2}]"#,
        )]));
        let cart = Cart::open(store, PersistPolicy::default()).await;
        assert!(cart.is_ready());
        assert!(cart.is_empty());
    }
}
