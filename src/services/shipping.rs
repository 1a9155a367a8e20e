use metrics::counter;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::services::couriers::{
    CourierProvider, GhnClient, GoshipClient, RateRequest, ShippingQuote,
};

/// Collects quotes from every configured courier, cheapest first.
///
/// Providers are asked one after another. A provider that errors is logged
/// and skipped so one courier being down never blocks checkout.
#[derive(Clone)]
pub struct RateShoppingService {
    providers: Vec<Arc<dyn CourierProvider>>,
}

impl RateShoppingService {
    pub fn new(providers: Vec<Arc<dyn CourierProvider>>) -> Self {
        Self { providers }
    }

    /// Builds the provider list from the enabled courier sections of `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let timeout = config.http_timeout();
        let mut providers: Vec<Arc<dyn CourierProvider>> = Vec::new();

        if config.ghn.enabled {
            providers.push(Arc::new(GhnClient::new(&config.ghn, timeout)?));
        }
        if config.goship.enabled {
            providers.push(Arc::new(GoshipClient::new(&config.goship, timeout)?));
        }
        if providers.is_empty() {
            warn!("no courier providers enabled; order previews will fail");
        }

        Ok(Self::new(providers))
    }

    pub fn provider_codes(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.code()).collect()
    }

    #[instrument(skip(self, request))]
    pub async fn shop(&self, request: &RateRequest) -> Result<Vec<ShippingQuote>, ServiceError> {
        let mut quotes = Vec::new();

        for provider in &self.providers {
            match provider.quote(request).await {
                Ok(mut provider_quotes) => {
                    info!(provider = provider.code(), count = provider_quotes.len(), "courier quoted");
                    quotes.append(&mut provider_quotes);
                }
                Err(e) => {
                    counter!("verdant_courier_failures_total", 1, "provider" => provider.code());
                    warn!(provider = provider.code(), error = %e, "courier quote failed; omitting provider");
                }
            }
        }

        if quotes.is_empty() {
            return Err(ServiceError::ServiceUnavailable(
                "no courier could quote this shipment".to_string(),
            ));
        }

        quotes.sort_by(|a, b| {
            a.total_fee
                .cmp(&b.total_fee)
                .then_with(|| a.quote_id.cmp(&b.quote_id))
        });
        Ok(quotes)
    }
}
