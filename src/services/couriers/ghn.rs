use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{http_client, whole_vnd, CourierProvider, FeeBreakdown, RateRequest, ShippingQuote};
use crate::config::GhnConfig;
use crate::errors::ServiceError;

const PROVIDER: &str = "ghn";
const AVAILABLE_SERVICES_PATH: &str = "/shiip/public-api/v2/shipping-order/available-services";
const FEE_PATH: &str = "/shiip/public-api/v2/shipping-order/fee";
/// GHN refuses insurance values above this
const MAX_INSURANCE_VALUE: i64 = 5_000_000;

/// Giao Hang Nhanh client. Lists the services available on the route, then
/// prices each of them.
#[derive(Clone)]
pub struct GhnClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    shop_id: i64,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Serialize)]
struct AvailableServicesRequest {
    shop_id: i64,
    from_district: i64,
    to_district: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct AvailableService {
    service_id: i64,
    #[serde(default)]
    short_name: String,
    service_type_id: i64,
}

#[derive(Debug, Serialize)]
struct FeeRequest<'a> {
    service_id: i64,
    service_type_id: i64,
    from_district_id: i64,
    from_ward_code: &'a str,
    to_district_id: i64,
    to_ward_code: &'a str,
    length: u32,
    width: u32,
    height: u32,
    weight: u32,
    insurance_value: i64,
    cod_value: i64,
}

#[derive(Debug, Deserialize)]
struct FeeData {
    total: i64,
    #[serde(default)]
    service_fee: i64,
    #[serde(default)]
    insurance_fee: i64,
    #[serde(default)]
    cod_fee: i64,
}

impl GhnClient {
    pub fn new(config: &GhnConfig, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            shop_id: config.shop_id,
        })
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("Token", &self.token)
            .header("ShopId", self.shop_id.to_string())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(%status, path, "GHN response");

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            ServiceError::ExternalServiceError(format!(
                "GHN returned an unreadable body (HTTP {}): {}",
                status, e
            ))
        })?;

        if !status.is_success() || envelope.code != 200 {
            return Err(ServiceError::ExternalServiceError(format!(
                "GHN {} failed with code {}: {}",
                path, envelope.code, envelope.message
            )));
        }

        envelope
            .data
            .ok_or_else(|| ServiceError::ExternalServiceError(format!("GHN {} returned no data", path)))
    }
}

#[async_trait]
impl CourierProvider for GhnClient {
    fn code(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(skip(self, request), fields(to_district = request.destination.district_id))]
    async fn quote(&self, request: &RateRequest) -> Result<Vec<ShippingQuote>, ServiceError> {
        let services: Vec<AvailableService> = self
            .post(
                AVAILABLE_SERVICES_PATH,
                &AvailableServicesRequest {
                    shop_id: self.shop_id,
                    from_district: request.origin.district_id,
                    to_district: request.destination.district_id,
                },
            )
            .await?;

        let units = request.package.to_courier_units();
        let mut quotes = Vec::with_capacity(services.len());
        let mut last_error = None;

        for service in services {
            let body = FeeRequest {
                service_id: service.service_id,
                service_type_id: service.service_type_id,
                from_district_id: request.origin.district_id,
                from_ward_code: &request.origin.ward_code,
                to_district_id: request.destination.district_id,
                to_ward_code: &request.destination.ward_code,
                length: units.length_cm,
                width: units.width_cm,
                height: units.height_cm,
                weight: units.weight_grams,
                insurance_value: whole_vnd(request.insurance_value).min(MAX_INSURANCE_VALUE),
                cod_value: whole_vnd(request.cod_amount),
            };

            match self.post::<_, FeeData>(FEE_PATH, &body).await {
                Ok(fee) => quotes.push(to_quote(&service, fee)),
                Err(e) => {
                    warn!(service_id = service.service_id, error = %e, "GHN fee lookup failed");
                    last_error = Some(e);
                }
            }
        }

        match (quotes.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(quotes),
        }
    }
}

fn to_quote(service: &AvailableService, fee: FeeData) -> ShippingQuote {
    let service_id = service.service_id.to_string();
    let service_fee = Decimal::from(fee.service_fee);
    let insurance_fee = Decimal::from(fee.insurance_fee);
    let cod_fee = Decimal::from(fee.cod_fee);
    let total_fee = Decimal::from(fee.total);
    let service_name = if service.short_name.is_empty() {
        format!("GHN {}", service.service_type_id)
    } else {
        service.short_name.clone()
    };

    ShippingQuote {
        quote_id: ShippingQuote::make_id(PROVIDER, &service_id),
        provider: PROVIDER.to_string(),
        carrier_name: "Giao Hàng Nhanh".to_string(),
        service_id,
        service_name,
        total_fee,
        fees: FeeBreakdown {
            service_fee,
            insurance_fee,
            cod_fee,
            other_fee: total_fee - service_fee - insurance_fee - cod_fee,
        },
        expected_delivery: None,
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

    fn client(base_url: String) -> GhnClient {
        let config = GhnConfig {
            enabled: true,
            base_url,
            token: "ghn-token".into(),
            shop_id: 885,
        };
        GhnClient::new(&config, Duration::from_secs(5)).unwrap()
    }

    fn request() -> RateRequest {
        RateRequest {
            origin: AddressCodes {
                province_id: 202,
                district_id: 1442,
                ward_code: "20109".into(),
            },
            destination: AddressCodes {
                province_id: 201,
                district_id: 1485,
                ward_code: "1A0807".into(),
            },
            package: PackageDimensions {
                length: dec!(20.5),
                width: dec!(10),
                height: dec!(5),
                weight_grams: dec!(1200),
            },
            cod_amount: dec!(0),
            insurance_value: dec!(9000000),
        }
    }

    #[tokio::test]
    async fn quotes_each_available_service() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(AVAILABLE_SERVICES_PATH))
            .and(header("Token", "ghn-token"))
            .and(header("ShopId", "885"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "message": "Success",
                "data": [
                    {"service_id": 53320, "short_name": "Hàng nhẹ", "service_type_id": 2},
                    {"service_id": 53321, "short_name": "Hàng nặng", "service_type_id": 5}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(FEE_PATH))
            .and(body_partial_json(json!({"service_id": 53320, "length": 21, "insurance_value": 5000000})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"total": 36300, "service_fee": 33000, "insurance_fee": 3300, "cod_fee": 0}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(FEE_PATH))
            .and(body_partial_json(json!({"service_id": 53321})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"total": 52000, "service_fee": 52000}
            })))
            .mount(&server)
            .await;

        let quotes = client(server.uri()).quote(&request()).await.unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].quote_id, "ghn:53320");
        assert_eq!(quotes[0].total_fee, dec!(36300));
        assert_eq!(quotes[0].fees.insurance_fee, dec!(3300));
        assert_eq!(quotes[1].fees.other_fee, dec!(0));
    }

    #[tokio::test]
    async fn non_200_code_is_an_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(AVAILABLE_SERVICES_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": 400,
                "message": "Token is not valid",
                "data": null
            })))
            .mount(&server)
            .await;

        let result = client(server.uri()).quote(&request()).await;
        assert_matches!(result, Err(ServiceError::ExternalServiceError(msg)) if msg.contains("Token"));
    }

    #[tokio::test]
    async fn failing_fee_lookup_skips_only_that_service() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(AVAILABLE_SERVICES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": [
                    {"service_id": 1, "short_name": "A", "service_type_id": 2},
                    {"service_id": 2, "short_name": "B", "service_type_id": 2}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(FEE_PATH))
            .and(body_partial_json(json!({"service_id": 1})))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"code": 500, "message": "route unsupported"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(FEE_PATH))
            .and(body_partial_json(json!({"service_id": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"total": 40000, "service_fee": 40000}
            })))
            .mount(&server)
            .await;

        let quotes = client(server.uri()).quote(&request()).await.unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].service_id, "2");
    }
}
