pub mod environment;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod wallets;

use std::sync::Arc;

use crate::cache::{CacheBackend, PreviewStore};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::services::{
    environment::EnvironmentService,
    inventory::InventoryService,
    orders::OrderService,
    payments::{PayOsClient, PaymentService},
    shipping::RateShoppingService,
    wallet::WalletService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub inventory: Arc<InventoryService>,
    pub wallets: Arc<WalletService>,
    pub payments: Arc<PaymentService>,
    pub environment: Arc<EnvironmentService>,
}

impl AppServices {
    /// Wires every service from configuration. Courier providers are passed
    /// in so tests can substitute fakes.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        config: &AppConfig,
        cache: Arc<dyn CacheBackend>,
        rates: Arc<RateShoppingService>,
    ) -> Result<Self, ServiceError> {
        let wallets = WalletService::new(db_pool.clone(), event_sender.clone(), config.commission_rate());
        let inventory = InventoryService::new(db_pool.clone(), event_sender.clone());
        let orders = OrderService::new(
            db_pool.clone(),
            event_sender.clone(),
            PreviewStore::new(cache, config.preview_ttl()),
            rates,
            wallets.clone(),
            config.shipping_origin.codes(),
            config.tax_rate(),
        );
        let payos = PayOsClient::new(&config.payos, config.http_timeout())?;
        let payments = PaymentService::new(db_pool, event_sender, Arc::new(payos));
        let environment = EnvironmentService::from_config(config)?;

        Ok(Self {
            orders: Arc::new(orders),
            inventory: Arc::new(inventory),
            wallets: Arc::new(wallets),
            payments: Arc::new(payments),
            environment: Arc::new(environment),
        })
    }
}
