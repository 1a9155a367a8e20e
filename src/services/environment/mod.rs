pub mod co2;
pub mod soil;
pub mod weather;

pub use co2::{estimate, Co2Estimate, Co2Input};
pub use soil::{SoilClient, SoilReport};
pub use weather::{WeatherClient, WeatherReport};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use validator::{Validate, ValidationError};

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::middleware_helpers::retry::{with_retry, HttpRetryPolicy, RetryConfig};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Coordinates {
    #[serde(alias = "lat")]
    #[validate(custom = "validate_latitude")]
    pub latitude: f64,
    #[serde(alias = "lon")]
    #[validate(custom = "validate_longitude")]
    pub longitude: f64,
}

fn validate_latitude(value: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("latitude_out_of_range"))
    }
}

fn validate_longitude(value: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("longitude_out_of_range"))
    }
}

/// Farm data lookups backed by public weather and soil APIs.
#[derive(Clone)]
pub struct EnvironmentService {
    weather: WeatherClient,
    soil: SoilClient,
}

impl EnvironmentService {
    pub fn new(weather: WeatherClient, soil: SoilClient) -> Self {
        Self { weather, soil }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let retry = config.environment_retry();
        Ok(Self::new(
            WeatherClient::new(&config.environment_api.open_meteo_url, config.http_timeout(), retry.clone())?,
            SoilClient::new(&config.environment_api.soilgrids_url, config.http_timeout(), retry)?,
        ))
    }

    pub async fn weather(&self, coordinates: Coordinates, days: u8) -> Result<WeatherReport, ServiceError> {
        coordinates.validate()?;
        self.weather.forecast(coordinates, days).await
    }

    pub async fn soil(&self, coordinates: Coordinates) -> Result<SoilReport, ServiceError> {
        coordinates.validate()?;
        self.soil.topsoil(coordinates).await
    }

    pub fn co2(&self, input: &Co2Input) -> Result<Co2Estimate, ServiceError> {
        estimate(input)
    }
}

/// GETs `url` and decodes the JSON body, retrying throttling, 5xx and
/// unreachable upstreams.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    retry: &RetryConfig,
    upstream: &str,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, ServiceError> {
    with_retry(retry, HttpRetryPolicy, || async move {
        let response = client.get(url).query(query).send().await?;
        let status = response.status();
        debug!(%status, upstream, "environment API response");

        if status.is_server_error() || status.as_u16() == 429 {
            return Err(ServiceError::ServiceUnavailable(format!(
                "{} is unavailable (HTTP {})",
                upstream, status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ValidationError(format!(
                "{} rejected the request (HTTP {}): {}",
                upstream, status, body
            )));
        }
        response.json::<T>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("{} returned an unexpected body: {}", upstream, e))
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::time::Duration;

    #[tokio::test]
    async fn out_of_range_coordinates_never_reach_upstream() {
        let service = EnvironmentService::new(
            WeatherClient::new("http://127.0.0.1:9", Duration::from_secs(1), RetryConfig::default()).unwrap(),
            SoilClient::new("http://127.0.0.1:9", Duration::from_secs(1), RetryConfig::default()).unwrap(),
        );
        let result = service
            .weather(
                Coordinates {
                    latitude: 123.0,
                    longitude: 0.0,
                },
                3,
            )
            .await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn coordinate_bounds_are_inclusive() {
        let edge = Coordinates {
            latitude: -90.0,
            longitude: 180.0,
        };
        assert!(edge.validate().is_ok());

        let east = Coordinates {
            latitude: 10.8,
            longitude: 180.5,
        };
        assert!(east.validate().is_err());
    }
}
