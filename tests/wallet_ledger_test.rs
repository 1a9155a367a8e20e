mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use uuid::Uuid;
use verdant_api::{
    entities::{
        cashout::CashoutStatus,
        order::PaymentMethod,
        transaction::{self, TransactionStatus},
    },
    errors::ServiceError,
    services::wallet::CashoutRequest,
};

/// Sells one unit at `price` for a COD order and delivers it, crediting the vendor.
async fn fund(app: &TestApp, vendor_id: Uuid, price: i64) {
    let product = app.seed_product(vendor_id, price, 0).await;
    app.receive(product.id, 1).await;
    let preview = app
        .preview(Uuid::new_v4(), &[(product.id, 1)], PaymentMethod::Cod)
        .await
        .unwrap();
    let orders = &app.state.services.orders;
    let created = orders
        .confirm_order(TestApp::confirm_request(&preview))
        .await
        .unwrap();
    orders.mark_delivered(created.order.id).await.unwrap();
}

fn cashout(amount: Decimal) -> CashoutRequest {
    CashoutRequest {
        amount,
        bank_code: "VCB".to_string(),
        bank_account_number: "0011004455667".to_string(),
        account_holder: "Tran Thi B".to_string(),
    }
}

#[tokio::test]
async fn new_vendor_starts_with_an_empty_wallet() {
    let app = TestApp::new().await;
    let vendor = Uuid::new_v4();
    let wallets = &app.state.services.wallets;

    let first = wallets.get_or_create_wallet(vendor).await.unwrap();
    let second = wallets.get_or_create_wallet(vendor).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.balance, Decimal::ZERO);

    let view = wallets.reconcile(vendor).await.unwrap();
    assert!(view.in_sync);
    assert_eq!(view.available, Decimal::ZERO);
}

#[tokio::test]
async fn delivery_credit_lands_in_ledger_and_balance() {
    let app = TestApp::new().await;
    let vendor = Uuid::new_v4();
    fund(&app, vendor, 1_000_000).await;

    let view = app.state.services.wallets.reconcile(vendor).await.unwrap();
    assert_eq!(view.cached_balance, dec!(900000));
    assert_eq!(view.ledger_balance, dec!(900000));
    assert!(view.in_sync);
}

#[tokio::test]
async fn cashout_is_limited_to_available_funds() {
    let app = TestApp::new().await;
    let vendor = Uuid::new_v4();
    fund(&app, vendor, 1_000_000).await;
    let wallets = &app.state.services.wallets;

    assert_matches!(
        wallets.request_cashout(vendor, cashout(dec!(900001))).await,
        Err(ServiceError::InvalidOperation(_))
    );

    let pending = wallets.request_cashout(vendor, cashout(dec!(600000))).await.unwrap();
    assert_eq!(pending.status, CashoutStatus::Pending);

    let view = wallets.reconcile(vendor).await.unwrap();
    assert_eq!(view.cached_balance, dec!(900000));
    assert_eq!(view.pending_cashouts, dec!(600000));
    assert_eq!(view.available, dec!(300000));

    assert_matches!(
        wallets.request_cashout(vendor, cashout(dec!(300001))).await,
        Err(ServiceError::InvalidOperation(_))
    );
    wallets.request_cashout(vendor, cashout(dec!(300000))).await.unwrap();
}

#[tokio::test]
async fn cashout_amount_must_be_positive_whole_vnd() {
    let app = TestApp::new().await;
    let vendor = Uuid::new_v4();
    fund(&app, vendor, 1_000_000).await;
    let wallets = &app.state.services.wallets;

    for amount in [dec!(0), dec!(-5000), dec!(100.5)] {
        assert_matches!(
            wallets.request_cashout(vendor, cashout(amount)).await,
            Err(ServiceError::ValidationError(_))
        );
    }
}

#[tokio::test]
async fn approval_debits_the_wallet_once() {
    let app = TestApp::new().await;
    let vendor = Uuid::new_v4();
    let admin = Uuid::new_v4();
    fund(&app, vendor, 1_000_000).await;
    let wallets = &app.state.services.wallets;

    let request = wallets.request_cashout(vendor, cashout(dec!(400000))).await.unwrap();
    let approved = wallets.approve_cashout(request.id, admin).await.unwrap();
    assert_eq!(approved.status, CashoutStatus::Approved);
    assert_eq!(approved.processed_by, Some(admin));
    assert!(approved.processed_at.is_some());

    let entry = transaction::Entity::find_by_id(approved.transaction_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, TransactionStatus::Completed);
    assert!(entry.completed_at.is_some());

    let view = wallets.reconcile(vendor).await.unwrap();
    assert_eq!(view.cached_balance, dec!(500000));
    assert_eq!(view.pending_cashouts, Decimal::ZERO);
    assert!(view.in_sync);

    assert_matches!(
        wallets.approve_cashout(request.id, admin).await,
        Err(ServiceError::InvalidStatus(_))
    );
    assert_matches!(
        wallets.reject_cashout(request.id, admin, "late".into()).await,
        Err(ServiceError::InvalidStatus(_))
    );
    assert_eq!(wallets.ledger_balance(vendor).await.unwrap(), dec!(500000));
}

#[tokio::test]
async fn rejection_leaves_the_balance_alone() {
    let app = TestApp::new().await;
    let vendor = Uuid::new_v4();
    let admin = Uuid::new_v4();
    fund(&app, vendor, 1_000_000).await;
    let wallets = &app.state.services.wallets;

    let request = wallets.request_cashout(vendor, cashout(dec!(900000))).await.unwrap();
    assert_matches!(
        wallets.reject_cashout(request.id, admin, "   ".into()).await,
        Err(ServiceError::ValidationError(_))
    );

    let rejected = wallets
        .reject_cashout(request.id, admin, "account holder mismatch".into())
        .await
        .unwrap();
    assert_eq!(rejected.status, CashoutStatus::Rejected);
    assert_eq!(rejected.reason.as_deref(), Some("account holder mismatch"));

    let entry = transaction::Entity::find_by_id(rejected.transaction_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, TransactionStatus::Cancelled);

    let view = wallets.reconcile(vendor).await.unwrap();
    assert_eq!(view.cached_balance, dec!(900000));
    assert_eq!(view.available, dec!(900000));
    assert!(view.in_sync);
}

#[tokio::test]
async fn unknown_cashout_is_not_found() {
    let app = TestApp::new().await;
    let wallets = &app.state.services.wallets;
    assert_matches!(
        wallets.approve_cashout(Uuid::new_v4(), Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
}
