#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use verdant_api::{
    cache::{CacheBackend, InMemoryCache},
    config::AppConfig,
    db,
    entities::{order::PaymentMethod, product},
    errors::ServiceError,
    events::{self, Event, EventSender},
    handlers::AppServices,
    services::{
        couriers::{CourierProvider, FeeBreakdown, RateRequest, ShippingQuote},
        inventory::ReceiveBatchInput,
        orders::{ConfirmOrderRequest, OrderPreview, PreviewItem, PreviewOrderRequest, ShippingAddress},
        shipping::RateShoppingService,
    },
    AppState,
};

pub const FAKE_COURIER: &str = "fake";

/// Courier double that quotes one fixed fee and remembers what it was asked.
pub struct FakeCourier {
    fee: Decimal,
    requests: Mutex<Vec<RateRequest>>,
}

impl FakeCourier {
    pub fn new(fee: Decimal) -> Self {
        Self {
            fee,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn quote_id() -> String {
        ShippingQuote::make_id(FAKE_COURIER, "std")
    }

    pub fn last_request(&self) -> Option<RateRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CourierProvider for FakeCourier {
    fn code(&self) -> &'static str {
        FAKE_COURIER
    }

    async fn quote(&self, request: &RateRequest) -> Result<Vec<ShippingQuote>, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(vec![ShippingQuote {
            quote_id: Self::quote_id(),
            provider: FAKE_COURIER.to_string(),
            carrier_name: "Fake Express".to_string(),
            service_id: "std".to_string(),
            service_name: "Standard".to_string(),
            total_fee: self.fee,
            fees: FeeBreakdown {
                service_fee: self.fee,
                ..Default::default()
            },
            expected_delivery: None,
        }])
    }
}

/// Application state over a fresh in-memory SQLite database and a fake courier.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub courier: Arc<FakeCourier>,
    events: Arc<Mutex<Vec<Event>>>,
    _event_task: tokio::task::JoinHandle<()>,
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    );
    // One connection keeps every query on the same in-memory database.
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;
    cfg
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = test_config();
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let (recorded, event_task) = record_events(event_rx);

        let cache: Arc<dyn CacheBackend> = Arc::new(InMemoryCache::new());
        let courier = Arc::new(FakeCourier::new(Decimal::from(25_000)));
        let rates = Arc::new(RateShoppingService::new(vec![
            courier.clone() as Arc<dyn CourierProvider>
        ]));

        let services = AppServices::new(
            db_arc.clone(),
            event_sender.clone(),
            &cfg,
            cache.clone(),
            rates,
        )
        .expect("services build from test config");

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
            cache,
        };
        let router = verdant_api::app_router(state.clone());

        Self {
            router,
            state,
            courier,
            events: recorded,
            _event_task: event_task,
        }
    }

    /// Events emitted so far, after giving in-flight sends a moment to land.
    pub async fn events(&self) -> Vec<Event> {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        self.events.lock().unwrap().clone()
    }

    pub async fn low_stock_events(&self) -> Vec<(Uuid, i32)> {
        self.events()
            .await
            .into_iter()
            .filter_map(|event| match event {
                Event::LowStock {
                    product_id,
                    remaining,
                } => Some((product_id, remaining)),
                _ => None,
            })
            .collect()
    }

    /// Inserts an active product with no stock; add lots with `receive`.
    pub async fn seed_product(&self, vendor_id: Uuid, unit_price: i64, discount_pct: i64) -> product::Model {
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            vendor_id: Set(vendor_id),
            product_code: Set(format!("P-{}", &id.simple().to_string()[..8])),
            name: Set("Organic fertilizer 5kg".to_string()),
            unit_price: Set(Decimal::from(unit_price)),
            discount_percentage: Set(Decimal::from(discount_pct)),
            stock_quantity: Set(0),
            weight_kg: Set(Decimal::from(5)),
            length_cm: Set(Decimal::from(30)),
            width_cm: Set(Decimal::from(20)),
            height_cm: Set(Decimal::from(10)),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }

    pub async fn receive(&self, product_id: Uuid, quantity: i32) -> Uuid {
        self.receive_lot(product_id, quantity, None, Vec::new()).await
    }

    pub async fn receive_lot(
        &self,
        product_id: Uuid,
        quantity: i32,
        expiry_date: Option<chrono::NaiveDate>,
        serial_numbers: Vec<String>,
    ) -> Uuid {
        let lot = format!("LOT-{}", Uuid::new_v4().simple());
        self.state
            .services
            .inventory
            .receive_batch(ReceiveBatchInput {
                product_id,
                batch_number: "B-1".to_string(),
                lot_number: lot,
                quantity,
                unit_cost: Decimal::from(1_000),
                manufacturing_date: None,
                expiry_date,
                serial_numbers,
                notes: None,
            })
            .await
            .expect("receive lot")
            .id
    }

    pub async fn stock_of(&self, product_id: Uuid) -> i32 {
        self.state
            .services
            .inventory
            .stock_summary(product_id)
            .await
            .expect("stock summary")
            .stock_quantity
    }

    pub async fn preview(
        &self,
        customer_id: Uuid,
        items: &[(Uuid, i32)],
        payment_method: PaymentMethod,
    ) -> Result<OrderPreview, ServiceError> {
        self.state
            .services
            .orders
            .preview_order(preview_request(customer_id, items, payment_method))
            .await
    }

    pub fn confirm_request(preview: &OrderPreview) -> ConfirmOrderRequest {
        ConfirmOrderRequest {
            preview_id: preview.preview_id,
            customer_id: preview.customer_id,
            quote_id: FakeCourier::quote_id(),
            notes: None,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Keeps a copy of every event, then hands it on to the logging processor.
fn record_events(
    mut rx: mpsc::Receiver<Event>,
) -> (Arc<Mutex<Vec<Event>>>, tokio::task::JoinHandle<()>) {
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = recorded.clone();
    let (forward_tx, forward_rx) = mpsc::channel(256);
    let task = tokio::spawn(async move {
        let processor = tokio::spawn(events::process_events(forward_rx));
        while let Some(event) = rx.recv().await {
            sink.lock().unwrap().push(event.clone());
            if forward_tx.send(event).await.is_err() {
                break;
            }
        }
        drop(forward_tx);
        let _ = processor.await;
    });
    (recorded, task)
}

pub fn preview_request(
    customer_id: Uuid,
    items: &[(Uuid, i32)],
    payment_method: PaymentMethod,
) -> PreviewOrderRequest {
    PreviewOrderRequest {
        customer_id,
        items: items
            .iter()
            .map(|(product_id, quantity)| PreviewItem {
                product_id: *product_id,
                quantity: *quantity,
            })
            .collect(),
        shipping_address: ShippingAddress {
            recipient_name: "Nguyen Van A".to_string(),
            phone: "0901234567".to_string(),
            street: "12 Le Loi".to_string(),
            province_id: 201,
            district_id: 1485,
            ward_code: "1A0807".to_string(),
        },
        payment_method,
        notes: None,
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
