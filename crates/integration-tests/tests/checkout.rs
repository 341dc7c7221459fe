//! Checkout from cart to sales log, on disk.

#![allow(clippy::unwrap_used)]

use torodo_core::{Amount, CustomerId, Liters, ProductId};
use torodo_integration_tests::TestContext;
use torodo_storefront::customers::NewCustomer;
use torodo_storefront::error::AppError;

#[tokio::test]
async fn test_checkout_for_customer_end_to_end() {
    let ctx = TestContext::new().unwrap();
    let mut app = ctx.open().await.unwrap();
    let catalog = app.catalog();
    let customer = app
        .customers
        .add(NewCustomer {
            name: "Fatou Sall".into(),
            phone: "76 555 44 33".into(),
            email: Some("fatou@example.com".into()),
            ..NewCustomer::default()
        })
        .unwrap();

    app.cart
        .add_catalog_item(catalog, &ProductId::new("milk"), Liters::whole(1), 2)
        .unwrap();
    app.cart
        .add_catalog_item(catalog, &ProductId::new("yoghurt"), Liters::whole(10), 1)
        .unwrap();
    app.cart
        .add_catalog_item(catalog, &ProductId::new("milk"), Liters::whole(1), 1)
        .unwrap();
    assert_eq!(app.cart.lines().len(), 2);

    let sale = app.checkout(Some(&customer.id)).unwrap();
    assert_eq!(sale.total, Amount::from_cfa(11_000));
    assert_eq!(sale.liters(), Liters::whole(13));
    app.flush_all().await.unwrap();

    let reopened = ctx.open().await.unwrap();
    assert!(reopened.cart.is_empty());
    assert_eq!(reopened.sales.all().len(), 1);
    assert_eq!(reopened.sales.all()[0].customer_id.as_ref(), Some(&customer.id));

    let buyer = reopened.customers.get(&customer.id).unwrap();
    assert_eq!(buyer.total_orders, 1);
    assert_eq!(buyer.total_spent, Amount::from_cfa(11_000));
    assert_eq!(buyer.last_order_at, Some(TestContext::start()));

    let summary = reopened.sales.summary();
    assert_eq!(summary.revenue, Amount::from_cfa(11_000));
    assert_eq!(
        summary.liters_by_product.get(&ProductId::new("milk")),
        Some(&Liters::whole(3))
    );
}

#[tokio::test]
async fn test_empty_cart_checkout_writes_nothing() {
    let ctx = TestContext::new().unwrap();
    let mut app = ctx.open().await.unwrap();

    let err = app.checkout(None).unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));
    app.flush_all().await.unwrap();

    assert!(ctx.read_raw("transactions.json").is_none());
}

#[tokio::test]
async fn test_checkout_for_unknown_customer_keeps_cart() {
    let ctx = TestContext::new().unwrap();
    let mut app = ctx.open().await.unwrap();
    let catalog = app.catalog();
    app.cart
        .add_catalog_item(catalog, &ProductId::new("milk"), Liters::whole(1), 1)
        .unwrap();

    let err = app.checkout(Some(&CustomerId::new("nobody"))).unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
    assert_eq!(app.cart.item_count(), 1);
    assert!(app.sales.all().is_empty());
}

#[tokio::test]
async fn test_sales_are_newest_first() {
    let ctx = TestContext::new().unwrap();
    let mut app = ctx.open().await.unwrap();
    let catalog = app.catalog();

    app.cart
        .add_catalog_item(catalog, &ProductId::new("milk"), Liters::whole(1), 1)
        .unwrap();
    let first = app.checkout(None).unwrap();
    ctx.clock.advance(chrono::Duration::minutes(5));
    app.cart
        .add_catalog_item(catalog, &ProductId::new("yoghurt"), Liters::whole(1), 1)
        .unwrap();
    let second = app.checkout(None).unwrap();
    app.flush_all().await.unwrap();

    let reopened = ctx.open().await.unwrap();
    let ids: Vec<_> = reopened.sales.all().iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}
