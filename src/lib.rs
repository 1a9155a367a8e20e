//! VerdantTech marketplace API
//!
//! Order preview and confirmation with courier rate shopping, lot and serial
//! inventory, vendor wallets, PayOS payments and farm environment lookups.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod services;
pub mod tracing;

use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;

use crate::cache::CacheBackend;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
    pub cache: Arc<dyn CacheBackend>,
}

// Common response wrappers
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    let orders = Router::new()
        .route("/orders/preview", post(handlers::orders::preview_order))
        .route("/orders/confirm", post(handlers::orders::confirm_order))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/ship", post(handlers::orders::ship_order))
        .route("/orders/:id/deliver", post(handlers::orders::deliver_order))
        .route("/orders/:id/cancel", post(handlers::orders::cancel_order));

    let inventory = Router::new()
        .route("/inventory/batches", post(handlers::inventory::receive_batch))
        .route("/inventory/exports", post(handlers::inventory::export_stock))
        .route(
            "/inventory/products/:id/stock",
            get(handlers::inventory::stock_summary),
        );

    let wallets = Router::new()
        .route("/wallets/:vendor_id", get(handlers::wallets::get_wallet))
        .route(
            "/wallets/:vendor_id/cashouts",
            post(handlers::wallets::request_cashout),
        )
        .route(
            "/cashouts/:id/approve",
            post(handlers::wallets::approve_cashout),
        )
        .route("/cashouts/:id/reject", post(handlers::wallets::reject_cashout));

    let payments = Router::new()
        .route(
            "/payments/:order_id/payos-link",
            post(handlers::payments::create_payos_link),
        )
        .route(
            "/payments/payos/webhook",
            post(handlers::payments::payos_webhook),
        );

    let environment = Router::new()
        .route("/environment/weather", get(handlers::environment::weather))
        .route("/environment/soil", get(handlers::environment::soil))
        .route("/environment/co2", post(handlers::environment::co2));

    Router::new()
        .route("/status", get(handlers::health::status))
        .route("/health", get(handlers::health::health))
        .merge(orders)
        .merge(inventory)
        .merge(wallets)
        .merge(payments)
        .merge(environment)
}

/// The full application router with request-id and HTTP tracing layers.
/// CORS is left to the binary since it depends on deployment config.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "verdant-api up" }))
        .nest("/api/v1", api_v1_routes())
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
