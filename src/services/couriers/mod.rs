//! Courier integrations used to price a parcel before an order is placed.

pub mod ghn;
pub mod goship;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::services::packaging::PackageDimensions;

pub use ghn::GhnClient;
pub use goship::GoshipClient;

/// Administrative codes of a pickup or drop-off point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressCodes {
    pub province_id: i64,
    pub district_id: i64,
    pub ward_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateRequest {
    pub origin: AddressCodes,
    pub destination: AddressCodes,
    pub package: PackageDimensions,
    /// Amount the courier collects on delivery, zero for prepaid orders
    pub cod_amount: Decimal,
    pub insurance_value: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub service_fee: Decimal,
    pub insurance_fee: Decimal,
    pub cod_fee: Decimal,
    pub other_fee: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingQuote {
    /// `<provider>:<service_id>`, unique within one preview
    pub quote_id: String,
    pub provider: String,
    pub carrier_name: String,
    pub service_id: String,
    pub service_name: String,
    pub total_fee: Decimal,
    pub fees: FeeBreakdown,
    pub expected_delivery: Option<String>,
}

impl ShippingQuote {
    pub fn make_id(provider: &str, service_id: &str) -> String {
        format!("{}:{}", provider, service_id)
    }
}

#[async_trait]
pub trait CourierProvider: Send + Sync {
    /// Short stable provider code, e.g. `ghn`.
    fn code(&self) -> &'static str;

    async fn quote(&self, request: &RateRequest) -> Result<Vec<ShippingQuote>, ServiceError>;
}

/// Builds the HTTP client shared by the courier integrations.
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ServiceError::InternalError(format!("failed to build HTTP client: {}", e)))
}

/// Whole VND amount for courier payloads.
pub(crate) fn whole_vnd(amount: Decimal) -> i64 {
    use rust_decimal::prelude::ToPrimitive;
    amount.round().to_i64().unwrap_or(0).max(0)
}
