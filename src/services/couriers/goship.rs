use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{http_client, whole_vnd, CourierProvider, FeeBreakdown, RateRequest, ShippingQuote};
use crate::config::GoshipConfig;
use crate::errors::ServiceError;

const PROVIDER: &str = "goship";
const RATES_PATH: &str = "/api/v3/rates";

/// Goship aggregator client. One call returns rates from several carriers.
#[derive(Clone)]
pub struct GoshipClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct RatesRequest {
    shipment: Shipment,
}

#[derive(Debug, Serialize)]
struct Shipment {
    address_from: GoshipAddress,
    address_to: GoshipAddress,
    parcel: Parcel,
}

#[derive(Debug, Serialize)]
struct GoshipAddress {
    district: String,
    city: String,
}

#[derive(Debug, Serialize)]
struct Parcel {
    cod: i64,
    amount: i64,
    width: u32,
    height: u32,
    length: u32,
    weight: u32,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Vec<Rate>,
}

#[derive(Debug, Deserialize)]
struct Rate {
    id: String,
    carrier_name: String,
    service: String,
    #[serde(default)]
    expected: Option<String>,
    total_fee: i64,
    #[serde(default)]
    cod_fee: i64,
    #[serde(default)]
    insurance_fee: i64,
}

impl GoshipClient {
    pub fn new(config: &GoshipConfig, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl CourierProvider for GoshipClient {
    fn code(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(skip(self, request), fields(to_district = request.destination.district_id))]
    async fn quote(&self, request: &RateRequest) -> Result<Vec<ShippingQuote>, ServiceError> {
        let units = request.package.to_courier_units();
        let body = RatesRequest {
            shipment: Shipment {
                address_from: GoshipAddress {
                    district: request.origin.district_id.to_string(),
                    city: request.origin.province_id.to_string(),
                },
                address_to: GoshipAddress {
                    district: request.destination.district_id.to_string(),
                    city: request.destination.province_id.to_string(),
                },
                parcel: Parcel {
                    cod: whole_vnd(request.cod_amount),
                    amount: whole_vnd(request.insurance_value),
                    width: units.width_cm,
                    height: units.height_cm,
                    length: units.length_cm,
                    weight: units.weight_grams,
                },
            },
        };

        let url = format!("{}{}", self.base_url, RATES_PATH);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(%status, "Goship rates response");

        let parsed: RatesResponse = serde_json::from_str(&text).map_err(|e| {
            ServiceError::ExternalServiceError(format!(
                "Goship returned an unreadable body (HTTP {}): {}",
                status, e
            ))
        })?;

        if !status.is_success() || parsed.code != 200 {
            return Err(ServiceError::ExternalServiceError(format!(
                "Goship rates failed with code {}: {}",
                parsed.code,
                parsed.message.unwrap_or_default()
            )));
        }

        Ok(parsed.data.into_iter().map(to_quote).collect())
    }
}

fn to_quote(rate: Rate) -> ShippingQuote {
    let total_fee = Decimal::from(rate.total_fee);
    let cod_fee = Decimal::from(rate.cod_fee);
    let insurance_fee = Decimal::from(rate.insurance_fee);

    ShippingQuote {
        quote_id: ShippingQuote::make_id(PROVIDER, &rate.id),
        provider: PROVIDER.to_string(),
        carrier_name: rate.carrier_name,
        service_id: rate.id,
        service_name: rate.service,
        total_fee,
        fees: FeeBreakdown {
            service_fee: total_fee - cod_fee - insurance_fee,
            insurance_fee,
            cod_fee,
            other_fee: Decimal::ZERO,
        },
        expected_delivery: rate.expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::couriers::AddressCodes;
    use crate::services::packaging::PackageDimensions;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: String) -> GoshipClient {
        let config = GoshipConfig {
            enabled: true,
            base_url,
            token: "goship-token".into(),
        };
        GoshipClient::new(&config, Duration::from_secs(5)).unwrap()
    }

    fn request() -> RateRequest {
        RateRequest {
            origin: AddressCodes {
                province_id: 700000,
                district_id: 700100,
                ward_code: "".into(),
            },
            destination: AddressCodes {
                province_id: 100000,
                district_id: 100200,
                ward_code: "".into(),
            },
            package: PackageDimensions {
                length: dec!(30),
                width: dec!(20),
                height: dec!(10),
                weight_grams: dec!(2000),
            },
            cod_amount: dec!(450000),
            insurance_value: dec!(450000),
        }
    }

    #[tokio::test]
    async fn maps_each_rate_to_a_quote() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RATES_PATH))
            .and(header("Authorization", "Bearer goship-token"))
            .and(body_partial_json(json!({
                "shipment": {"parcel": {"cod": 450000, "weight": 2000}, "address_to": {"city": "100000"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "status": "success",
                "data": [
                    {"id": "Z2hu", "carrier_name": "Giao Hàng Nhanh", "service": "Chuẩn",
                     "expected": "Dự kiến giao 3 ngày", "total_fee": 41000, "cod_fee": 5000},
                    {"id": "dnRw", "carrier_name": "Viettel Post", "service": "Nhanh",
                     "total_fee": 38000}
                ]
            })))
            .mount(&server)
            .await;

        let quotes = client(server.uri()).quote(&request()).await.unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].quote_id, "goship:Z2hu");
        assert_eq!(quotes[0].fees.service_fee, dec!(36000));
        assert_eq!(quotes[0].expected_delivery.as_deref(), Some("Dự kiến giao 3 ngày"));
        assert_eq!(quotes[1].carrier_name, "Viettel Post");
    }

    #[tokio::test]
    async fn http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RATES_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "code": 401,
                "message": "Unauthenticated"
            })))
            .mount(&server)
            .await;

        let result = client(server.uri()).quote(&request()).await;
        assert_matches!(result, Err(ServiceError::ExternalServiceError(_)));
    }
}
