use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

use super::{fetch_json, Coordinates};
use crate::errors::ServiceError;
use crate::middleware_helpers::retry::RetryConfig;
use crate::services::couriers::http_client;

const FORECAST_PATH: &str = "/v1/forecast";
const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,precipitation,wind_speed_10m,weather_code";
const DAILY_FIELDS: &str =
    "temperature_2m_max,temperature_2m_min,precipitation_sum,et0_fao_evapotranspiration";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub time: String,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    pub weather_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: String,
    pub temp_max_c: Option<f64>,
    pub temp_min_c: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub evapotranspiration_mm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Option<String>,
    pub current: Option<CurrentConditions>,
    pub daily: Vec<DailyForecast>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    latitude: f64,
    longitude: f64,
    timezone: Option<String>,
    current: Option<RawCurrent>,
    daily: Option<RawDaily>,
}

#[derive(Debug, Deserialize)]
struct RawCurrent {
    time: String,
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    precipitation: Option<f64>,
    wind_speed_10m: Option<f64>,
    weather_code: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDaily {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    et0_fao_evapotranspiration: Vec<Option<f64>>,
}

impl RawDaily {
    fn into_days(self) -> Vec<DailyForecast> {
        let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();
        self.time
            .iter()
            .enumerate()
            .map(|(i, date)| DailyForecast {
                date: date.clone(),
                temp_max_c: at(&self.temperature_2m_max, i),
                temp_min_c: at(&self.temperature_2m_min, i),
                precipitation_mm: at(&self.precipitation_sum, i),
                evapotranspiration_mm: at(&self.et0_fao_evapotranspiration, i),
            })
            .collect()
    }
}

/// Open-Meteo forecast client.
#[derive(Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl WeatherClient {
    pub fn new(base_url: &str, timeout: Duration, retry: RetryConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    #[instrument(skip(self))]
    pub async fn forecast(
        &self,
        coordinates: Coordinates,
        days: u8,
    ) -> Result<WeatherReport, ServiceError> {
        let days = days.clamp(1, 16).to_string();
        let lat = coordinates.latitude.to_string();
        let lon = coordinates.longitude.to_string();
        let url = format!("{}{}", self.base_url, FORECAST_PATH);
        let query = [
            ("latitude", lat.as_str()),
            ("longitude", lon.as_str()),
            ("current", CURRENT_FIELDS),
            ("daily", DAILY_FIELDS),
            ("timezone", "auto"),
            ("forecast_days", days.as_str()),
        ];

        let response: ForecastResponse =
            fetch_json(&self.client, &self.retry, "Open-Meteo", &url, &query).await?;

        Ok(WeatherReport {
            latitude: response.latitude,
            longitude: response.longitude,
            timezone: response.timezone,
            current: response.current.map(|c| CurrentConditions {
                time: c.time,
                temperature_c: c.temperature_2m,
                humidity_pct: c.relative_humidity_2m,
                precipitation_mm: c.precipitation,
                wind_speed_kmh: c.wind_speed_10m,
                weather_code: c.weather_code,
            }),
            daily: response.daily.unwrap_or_default().into_days(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_factor: 2.0,
        }
    }

    fn here() -> Coordinates {
        Coordinates {
            latitude: 10.82,
            longitude: 106.63,
        }
    }

    #[tokio::test]
    async fn maps_current_and_daily_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FORECAST_PATH))
            .and(query_param("forecast_days", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "latitude": 10.82,
                "longitude": 106.63,
                "timezone": "Asia/Bangkok",
                "current": {
                    "time": "2026-10-18T09:00",
                    "temperature_2m": 31.2,
                    "relative_humidity_2m": 74.0,
                    "precipitation": 0.0,
                    "wind_speed_10m": 8.4,
                    "weather_code": 2
                },
                "daily": {
                    "time": ["2026-10-18", "2026-10-19"],
                    "temperature_2m_max": [33.1, 32.0],
                    "temperature_2m_min": [25.4, null],
                    "precipitation_sum": [1.2, 14.5],
                    "et0_fao_evapotranspiration": [4.1, 3.2]
                }
            })))
            .mount(&server)
            .await;

        let client = WeatherClient::new(&server.uri(), Duration::from_secs(5), retry()).unwrap();
        let report = client.forecast(here(), 2).await.unwrap();

        assert_eq!(report.current.unwrap().temperature_c, Some(31.2));
        assert_eq!(report.daily.len(), 2);
        assert_eq!(report.daily[1].temp_min_c, None);
        assert_eq!(report.daily[1].precipitation_mm, Some(14.5));
    }

    #[tokio::test]
    async fn retries_server_errors_then_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FORECAST_PATH))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = WeatherClient::new(&server.uri(), Duration::from_secs(5), retry()).unwrap();
        let result = client.forecast(here(), 1).await;
        assert_matches!(result, Err(ServiceError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn unexpected_body_fails_without_retrying() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FORECAST_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let client = WeatherClient::new(&server.uri(), Duration::from_secs(5), retry()).unwrap();
        let result = client.forecast(here(), 1).await;
        assert_matches!(result, Err(ServiceError::ExternalServiceError(_)));
    }
}
