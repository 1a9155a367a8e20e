mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;
use verdant_api::{
    entities::{
        export_inventory::{self, MovementType},
        order::{OrderStatus, PaymentMethod},
        order_detail,
        payment::PaymentStatus,
    },
    errors::ServiceError,
    services::{inventory::ExportStockInput, orders::verify_totals},
};

struct Catalog {
    vendor_a: Uuid,
    vendor_b: Uuid,
    seeds: Uuid,
    sprayer: Uuid,
}

/// Two vendors: seeds at 150,000 with 10% off and a sprayer at 99,999.
async fn catalog(app: &TestApp) -> Catalog {
    let vendor_a = Uuid::new_v4();
    let vendor_b = Uuid::new_v4();
    let seeds = app.seed_product(vendor_a, 150_000, 10).await;
    let sprayer = app.seed_product(vendor_b, 99_999, 0).await;
    app.receive(seeds.id, 10).await;
    app.receive(sprayer.id, 5).await;
    Catalog {
        vendor_a,
        vendor_b,
        seeds: seeds.id,
        sprayer: sprayer.id,
    }
}

#[tokio::test]
async fn preview_prices_lines_and_collects_quotes() {
    let app = TestApp::new().await;
    let c = catalog(&app).await;
    let customer = Uuid::new_v4();

    let preview = app
        .preview(customer, &[(c.seeds, 2), (c.sprayer, 1)], PaymentMethod::Cod)
        .await
        .unwrap();

    assert_eq!(preview.subtotal, dec!(399999));
    assert_eq!(preview.discount_amount, dec!(30000));
    assert_eq!(preview.total_before_shipping, dec!(369999));
    assert_eq!(preview.tax_amount, dec!(33636));
    assert_eq!(preview.cod_amount, dec!(369999));
    assert_eq!(preview.quotes.len(), 1);
    assert_eq!(preview.quotes[0].total_fee, dec!(25000));

    // Equal-volume candidates tie, so identical boxes line up along the length.
    assert_eq!(preview.package.length, dec!(90));
    assert_eq!(preview.package.width, dec!(20));
    assert_eq!(preview.package.height, dec!(10));
    assert_eq!(preview.package.weight_grams, dec!(15000));

    let sent = app.courier.last_request().unwrap();
    assert_eq!(sent.cod_amount, dec!(369999));
    assert_eq!(sent.insurance_value, dec!(369999));
    assert_eq!(sent.destination.district_id, 1485);
}

#[tokio::test]
async fn payos_preview_carries_no_cod() {
    let app = TestApp::new().await;
    let c = catalog(&app).await;

    let preview = app
        .preview(Uuid::new_v4(), &[(c.sprayer, 1)], PaymentMethod::PayOs)
        .await
        .unwrap();
    assert_eq!(preview.cod_amount, dec!(0));
    assert_eq!(app.courier.last_request().unwrap().insurance_value, dec!(99999));
}

#[tokio::test]
async fn preview_rejects_bad_carts() {
    let app = TestApp::new().await;
    let c = catalog(&app).await;
    let customer = Uuid::new_v4();

    let empty = app.preview(customer, &[], PaymentMethod::Cod).await;
    assert_matches!(empty, Err(ServiceError::ValidationError(_)));

    let duplicate = app
        .preview(customer, &[(c.seeds, 1), (c.seeds, 2)], PaymentMethod::Cod)
        .await;
    assert_matches!(duplicate, Err(ServiceError::ValidationError(_)));

    let zero = app.preview(customer, &[(c.seeds, 0)], PaymentMethod::Cod).await;
    assert_matches!(zero, Err(ServiceError::ValidationError(_)));

    let unknown = app
        .preview(customer, &[(Uuid::new_v4(), 1)], PaymentMethod::Cod)
        .await;
    assert_matches!(unknown, Err(ServiceError::NotFound(_)));

    let too_many = app.preview(customer, &[(c.sprayer, 6)], PaymentMethod::Cod).await;
    assert_matches!(too_many, Err(ServiceError::InsufficientStock(_)));
}

#[tokio::test]
async fn confirm_writes_order_with_reconciled_totals() {
    let app = TestApp::new().await;
    let c = catalog(&app).await;
    let preview = app
        .preview(Uuid::new_v4(), &[(c.seeds, 2), (c.sprayer, 1)], PaymentMethod::Cod)
        .await
        .unwrap();

    let created = app
        .state
        .services
        .orders
        .confirm_order(TestApp::confirm_request(&preview))
        .await
        .unwrap();

    let order = &created.order;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.shipping_fee, dec!(25000));
    assert_eq!(order.total_amount, dec!(394999));
    assert_eq!(order.courier_provider, "fake");
    assert_eq!(created.details.len(), 2);
    assert_eq!(created.payment.as_ref().unwrap().status, PaymentStatus::Pending);

    let stored = app.state.services.orders.get_order(order.id).await.unwrap();
    verify_totals(&stored.order, &stored.details).unwrap();
    assert_eq!(stored.order.total_amount, dec!(394999));

    assert_eq!(app.stock_of(c.seeds).await, 8);
    assert_eq!(app.stock_of(c.sprayer).await, 4);
}

#[tokio::test]
async fn preview_is_confirmed_at_most_once() {
    let app = TestApp::new().await;
    let c = catalog(&app).await;
    let preview = app
        .preview(Uuid::new_v4(), &[(c.seeds, 1)], PaymentMethod::Cod)
        .await
        .unwrap();
    let orders = app.state.services.orders.clone();

    orders
        .confirm_order(TestApp::confirm_request(&preview))
        .await
        .unwrap();
    let second = orders.confirm_order(TestApp::confirm_request(&preview)).await;
    assert_matches!(second, Err(ServiceError::NotFound(_)));
    assert_eq!(app.stock_of(c.seeds).await, 9);
}

#[tokio::test]
async fn concurrent_confirms_yield_one_order() {
    let app = TestApp::new().await;
    let c = catalog(&app).await;
    let preview = app
        .preview(Uuid::new_v4(), &[(c.seeds, 1)], PaymentMethod::Cod)
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..5 {
        let orders = app.state.services.orders.clone();
        let request = TestApp::confirm_request(&preview);
        tasks.push(tokio::spawn(async move { orders.confirm_order(request).await.is_ok() }));
    }
    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(app.stock_of(c.seeds).await, 9);
}

#[tokio::test]
async fn expired_preview_cannot_be_confirmed() {
    let app = TestApp::with_config(|cfg| cfg.cache.preview_ttl_secs = 1).await;
    let c = catalog(&app).await;
    let preview = app
        .preview(Uuid::new_v4(), &[(c.seeds, 1)], PaymentMethod::Cod)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1_200)).await;

    let result = app
        .state
        .services
        .orders
        .confirm_order(TestApp::confirm_request(&preview))
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
    assert_eq!(app.stock_of(c.seeds).await, 10);
}

#[tokio::test]
async fn confirm_checks_owner_and_quote_without_consuming() {
    let app = TestApp::new().await;
    let c = catalog(&app).await;
    let preview = app
        .preview(Uuid::new_v4(), &[(c.seeds, 1)], PaymentMethod::Cod)
        .await
        .unwrap();
    let orders = &app.state.services.orders;

    let mut stranger = TestApp::confirm_request(&preview);
    stranger.customer_id = Uuid::new_v4();
    assert_matches!(
        orders.confirm_order(stranger).await,
        Err(ServiceError::Forbidden(_))
    );

    let mut bad_quote = TestApp::confirm_request(&preview);
    bad_quote.quote_id = "ghn:0".to_string();
    assert_matches!(
        orders.confirm_order(bad_quote).await,
        Err(ServiceError::ValidationError(_))
    );

    orders
        .confirm_order(TestApp::confirm_request(&preview))
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_confirm_restores_the_preview() {
    let app = TestApp::new().await;
    let vendor = Uuid::new_v4();
    let product = app.seed_product(vendor, 50_000, 0).await;
    let lot = app.receive(product.id, 3).await;

    let preview = app
        .preview(Uuid::new_v4(), &[(product.id, 3)], PaymentMethod::Cod)
        .await
        .unwrap();

    // Stock leaves through another channel between preview and confirm.
    app.state
        .services
        .inventory
        .export_stock(ExportStockInput {
            batch_id: lot,
            quantity: 2,
            movement_type: MovementType::Damage,
            serial_numbers: Vec::new(),
            notes: Some("crushed pallet".to_string()),
        })
        .await
        .unwrap();

    let orders = &app.state.services.orders;
    let failed = orders.confirm_order(TestApp::confirm_request(&preview)).await;
    assert_matches!(failed, Err(ServiceError::InsufficientStock(_)));
    assert_eq!(app.stock_of(product.id).await, 1);

    app.receive(product.id, 5).await;
    let created = orders
        .confirm_order(TestApp::confirm_request(&preview))
        .await
        .unwrap();
    assert_eq!(created.details[0].quantity, 3);
    assert_eq!(app.stock_of(product.id).await, 3);
}

#[tokio::test]
async fn cancel_returns_units_to_their_lots() {
    let app = TestApp::new().await;
    let c = catalog(&app).await;
    let preview = app
        .preview(Uuid::new_v4(), &[(c.seeds, 4)], PaymentMethod::Cod)
        .await
        .unwrap();
    let orders = &app.state.services.orders;
    let created = orders
        .confirm_order(TestApp::confirm_request(&preview))
        .await
        .unwrap();
    assert_eq!(app.stock_of(c.seeds).await, 6);

    let cancelled = orders.cancel_order(created.order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(app.stock_of(c.seeds).await, 10);

    let detail_ids: Vec<Uuid> = created.details.iter().map(|d| d.id).collect();
    let exports = export_inventory::Entity::find()
        .filter(export_inventory::Column::OrderDetailId.is_in(detail_ids))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert!(exports.is_empty());

    let summary = app.state.services.inventory.stock_summary(c.seeds).await.unwrap();
    assert_eq!(summary.total_remaining, 10);

    let again = orders.cancel_order(created.order.id).await;
    assert_matches!(again, Err(ServiceError::InvalidStatus(_)));
}

#[tokio::test]
async fn cod_delivery_collects_payment_and_credits_vendors() {
    let app = TestApp::new().await;
    let c = catalog(&app).await;
    let preview = app
        .preview(Uuid::new_v4(), &[(c.seeds, 2), (c.sprayer, 1)], PaymentMethod::Cod)
        .await
        .unwrap();
    let orders = &app.state.services.orders;
    let created = orders
        .confirm_order(TestApp::confirm_request(&preview))
        .await
        .unwrap();
    let order_id = created.order.id;

    let shipped = orders.mark_shipped(order_id).await.unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert_matches!(
        orders.cancel_order(order_id).await,
        Err(ServiceError::InvalidStatus(_))
    );

    let delivered = orders.mark_delivered(order_id).await.unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);

    let stored = orders.get_order(order_id).await.unwrap();
    assert_eq!(stored.payment.unwrap().status, PaymentStatus::Completed);

    // 270,000 and 99,999 net, minus 10% commission, rounded.
    let wallets = &app.state.services.wallets;
    let a = wallets.reconcile(c.vendor_a).await.unwrap();
    let b = wallets.reconcile(c.vendor_b).await.unwrap();
    assert_eq!(a.cached_balance, dec!(243000));
    assert_eq!(b.cached_balance, dec!(89999));
    assert!(a.in_sync && b.in_sync);

    assert_matches!(
        orders.mark_delivered(order_id).await,
        Err(ServiceError::InvalidStatus(_))
    );
    assert_eq!(wallets.ledger_balance(c.vendor_a).await.unwrap(), dec!(243000));
}

#[tokio::test]
async fn payos_order_cannot_ship_before_payment() {
    let app = TestApp::new().await;
    let c = catalog(&app).await;
    let preview = app
        .preview(Uuid::new_v4(), &[(c.sprayer, 1)], PaymentMethod::PayOs)
        .await
        .unwrap();
    let orders = &app.state.services.orders;
    let created = orders
        .confirm_order(TestApp::confirm_request(&preview))
        .await
        .unwrap();

    assert_matches!(
        orders.mark_shipped(created.order.id).await,
        Err(ServiceError::InvalidStatus(_))
    );

    let details = order_detail::Entity::find()
        .filter(order_detail::Column::OrderId.eq(created.order.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(details.len(), 1);
}
