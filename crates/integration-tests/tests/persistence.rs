//! Values written by one session are what the next session loads.

#![allow(clippy::unwrap_used)]

use chrono::Duration;
use rust_decimal::Decimal;
use torodo_core::{Amount, DeliveryFrequency, Liters, ProductId, ThemePreference, WarehouseId};
use torodo_integration_tests::TestContext;
use torodo_storefront::catalog::SizeVariant;
use torodo_storefront::customers::NewCustomer;
use torodo_storefront::subscriptions::NewSubscription;

#[tokio::test]
async fn test_every_container_survives_reopen() {
    let ctx = TestContext::new().unwrap();
    let mut app = ctx.open().await.unwrap();

    app.cart
        .add_line("milk", "Lait Frais", SizeVariant::new(10, 8000), 1)
        .unwrap();
    app.stock
        .adjust(&WarehouseId::new("A"), Decimal::new(255, 1))
        .unwrap();
    let customer = app
        .customers
        .add(NewCustomer {
            name: "Awa Diop".into(),
            phone: "77 123 45 67".into(),
            address: "Dakar".into(),
            ..NewCustomer::default()
        })
        .unwrap();
    let sub = app
        .subscriptions
        .add(NewSubscription {
            product_id: ProductId::new("yoghurt"),
            size: SizeVariant::new(1, 1000),
            quantity: 2,
            frequency: DeliveryFrequency::Monthly,
            customer_id: customer.id.clone(),
            warehouse_id: WarehouseId::new("B"),
        })
        .unwrap();
    app.theme.set(ThemePreference::Dark);
    app.flush_all().await.unwrap();
    drop(app);

    let reopened = ctx.open().await.unwrap();
    assert_eq!(reopened.cart.total(), Amount::from_cfa(8000));
    assert_eq!(
        reopened.stock.level(&WarehouseId::new("A")),
        Liters::new(Decimal::new(255, 1))
    );
    assert_eq!(reopened.customers.get(&customer.id).unwrap().name, "Awa Diop");
    let loaded = reopened.subscriptions.get(&sub.id).unwrap();
    assert_eq!(loaded.frequency, DeliveryFrequency::Monthly);
    assert_eq!(loaded.next_delivery_at, sub.next_delivery_at);
    assert_eq!(reopened.theme.preference(), ThemePreference::Dark);
}

#[tokio::test]
async fn test_values_are_stored_in_versioned_envelope() {
    let ctx = TestContext::new().unwrap();
    let mut app = ctx.open().await.unwrap();
    app.theme.set(ThemePreference::Light);
    app.flush_all().await.unwrap();

    let raw = ctx.read_raw("theme_preference.json").unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["schemaVersion"], 1);
    assert_eq!(value["data"], "light");
}

#[tokio::test]
async fn test_latest_value_wins_after_rapid_updates() {
    let ctx = TestContext::new().unwrap();
    let mut app = ctx.open().await.unwrap();
    let warehouse = WarehouseId::new("B");
    for _ in 0..50 {
        app.stock.adjust(&warehouse, Decimal::ONE).unwrap();
    }
    app.flush_all().await.unwrap();

    let reopened = ctx.open().await.unwrap();
    assert_eq!(reopened.stock.level(&warehouse), Liters::whole(50));
}

#[tokio::test]
async fn test_transfer_round_trip() {
    let ctx = TestContext::new().unwrap();
    let (a, b) = (WarehouseId::new("A"), WarehouseId::new("B"));
    let mut app = ctx.open().await.unwrap();
    app.stock.adjust(&a, Decimal::from(100)).unwrap();
    app.stock.transfer_input(&a, &b, "12,5").unwrap();
    app.flush_all().await.unwrap();

    let mut reopened = ctx.open().await.unwrap();
    assert_eq!(reopened.stock.level(&a), Liters::new(Decimal::new(875, 1)));
    assert_eq!(reopened.stock.level(&b), Liters::new(Decimal::new(125, 1)));
    assert_eq!(reopened.stock.total(), Liters::whole(100));

    assert!(reopened.stock.transfer(&b, &a, Liters::whole(13)).is_err());
    assert_eq!(reopened.stock.total(), Liters::whole(100));
}

#[tokio::test]
async fn test_subscription_schedule_uses_clock() {
    let ctx = TestContext::new().unwrap();
    ctx.clock.advance(Duration::days(1));
    let mut app = ctx.open().await.unwrap();
    let customer = app
        .customers
        .add(NewCustomer {
            name: "Moussa".into(),
            phone: "+221 70 000 00 00".into(),
            ..NewCustomer::default()
        })
        .unwrap();
    let sub = app
        .subscriptions
        .add(NewSubscription {
            product_id: ProductId::new("milk"),
            size: SizeVariant::new(1, 1000),
            quantity: 1,
            frequency: DeliveryFrequency::Weekly,
            customer_id: customer.id,
            warehouse_id: WarehouseId::new("A"),
        })
        .unwrap();

    assert_eq!(
        sub.next_delivery_at,
        TestContext::start() + Duration::days(8)
    );
}
