//! Cart commit.
//!
//! Committing moves a deep snapshot of the cart into the sales log and then
//! empties the cart. Both steps are in-memory mutations with no await point
//! in between, so no caller can observe one without the other. Each container
//! then persists its own key.

use torodo_core::CustomerId;
use tracing::{info, instrument};

use crate::cart::Cart;
use crate::customers::Customers;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::sales::{SaleRecord, Sales};

/// Commit the cart as an anonymous sale.
///
/// # Errors
///
/// Returns `AppError::EmptyCart` if the cart has no lines; the sales log is
/// then unchanged.
#[instrument(skip_all, fields(lines = cart.lines().len()))]
pub fn commit(cart: &mut Cart, sales: &mut Sales) -> Result<SaleRecord> {
    commit_inner(cart, sales, None)
}

/// Commit the cart as a sale to a registered customer and update their
/// order statistics.
///
/// # Errors
///
/// Returns `AppError::EmptyCart` for an empty cart, or `AppError::NotFound`
/// if the customer does not exist. In both cases nothing changes.
#[instrument(skip_all, fields(lines = cart.lines().len(), customer_id = %customer_id))]
pub fn commit_for_customer(
    cart: &mut Cart,
    sales: &mut Sales,
    customers: &mut Customers,
    customer_id: &CustomerId,
) -> Result<SaleRecord> {
    if customers.get(customer_id).is_none() {
        return Err(AppError::not_found("customer", customer_id));
    }
    let sale = commit_inner(cart, sales, Some(customer_id.clone()))?;
    customers.record_order(customer_id, sale.total)?;
    Ok(sale)
}

fn commit_inner(cart: &mut Cart, sales: &mut Sales, customer_id: Option<CustomerId>) -> Result<SaleRecord> {
    if cart.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let sale = sales.record(cart.lines().to_vec(), customer_id)?;
    cart.clear();

    add_breadcrumb(
        "checkout",
        "Cart committed",
        &[
            ("sale_id", sale.id.to_string()),
            ("total", sale.total.to_string()),
        ],
    );
    info!(sale_id = %sale.id, total = %sale.total, "Sale recorded");
    Ok(sale)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use torodo_core::Amount;

    use super::*;
    use crate::catalog::SizeVariant;
    use crate::clock::{Clock, FixedClock};
    use crate::container::PersistPolicy;
    use crate::customers::NewCustomer;
    use crate::error::ErrorKind;
    use crate::store::{DurableStore, MemoryStore};

    struct Fixture {
        store: Arc<MemoryStore>,
        cart: Cart,
        sales: Sales,
        customers: Customers,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        let policy = PersistPolicy::default();
        Fixture {
            cart: Cart::open(store.clone(), policy).await,
            sales: Sales::open(store.clone(), policy, clock.clone()).await,
            customers: Customers::open(store.clone(), policy, clock).await,
            store,
        }
    }

    #[tokio::test]
    async fn test_commit_moves_cart_into_sales() {
        let mut f = fixture().await;
        f.cart
            .add_line("milk", "Lait Frais", SizeVariant::new(1, 1000), 2)
            .unwrap();

        let sale = commit(&mut f.cart, &mut f.sales).unwrap();

        assert_eq!(sale.total, Amount::from_cfa(2000));
        assert_eq!(sale.lines.len(), 1);
        assert_eq!(f.sales.all().len(), 1);
        assert_eq!(f.sales.all()[0].id, sale.id);
        assert!(f.cart.is_empty());

        f.cart.flush().await.unwrap();
        f.sales.flush().await.unwrap();
        assert!(f.store.load("transactions").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_commit_empty_cart_fails() {
        let mut f = fixture().await;
        let err = commit(&mut f.cart, &mut f.sales).unwrap_err();
        assert!(matches!(err, AppError::EmptyCart));
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(f.sales.all().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_is_independent_of_cart() {
        let mut f = fixture().await;
        let size = SizeVariant::new(1, 1000);
        f.cart.add_line("milk", "Lait Frais", size, 1).unwrap();
        let sale = commit(&mut f.cart, &mut f.sales).unwrap();

        f.cart.add_line("milk", "Lait Frais", size, 9).unwrap();
        assert_eq!(f.sales.get(&sale.id).unwrap().lines[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_commit_for_customer_updates_stats() {
        let mut f = fixture().await;
        let customer = f
            .customers
            .add(NewCustomer {
                name: "Awa".into(),
                phone: "771234567".into(),
                ..NewCustomer::default()
            })
            .unwrap();
        f.cart
            .add_line("yoghurt", "SOOW", SizeVariant::new(10, 8000), 1)
            .unwrap();

        let sale =
            commit_for_customer(&mut f.cart, &mut f.sales, &mut f.customers, &customer.id).unwrap();

        assert_eq!(sale.customer_id.as_ref(), Some(&customer.id));
        let stats = f.customers.get(&customer.id).unwrap();
        assert_eq!(stats.total_orders, 1);
        assert_eq!(stats.total_spent, Amount::from_cfa(8000));
    }

    #[tokio::test]
    async fn test_commit_for_unknown_customer_keeps_cart() {
        let mut f = fixture().await;
        f.cart
            .add_line("milk", "Lait Frais", SizeVariant::new(1, 1000), 1)
            .unwrap();

        let err = commit_for_customer(
            &mut f.cart,
            &mut f.sales,
            &mut f.customers,
            &CustomerId::new("ghost"),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(f.cart.lines().len(), 1);
        assert!(f.sales.all().is_empty());
    }
}
