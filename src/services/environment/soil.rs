use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

use super::{fetch_json, Coordinates};
use crate::errors::ServiceError;
use crate::middleware_helpers::retry::RetryConfig;
use crate::services::couriers::http_client;

const QUERY_PATH: &str = "/soilgrids/v2.0/properties/query";
const PROPERTIES: [&str; 5] = ["phh2o", "soc", "clay", "sand", "silt"];
/// Topsoil layers relevant to most crops.
const DEPTHS: [&str; 2] = ["0-5cm", "5-15cm"];

/// Soil properties for one depth interval, already in target units
/// (pH, g/kg organic carbon, % texture fractions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilLayer {
    pub depth: String,
    pub ph: Option<f64>,
    pub organic_carbon_g_per_kg: Option<f64>,
    pub clay_pct: Option<f64>,
    pub sand_pct: Option<f64>,
    pub silt_pct: Option<f64>,
}

impl SoilLayer {
    fn empty(depth: &str) -> Self {
        Self {
            depth: depth.to_string(),
            ph: None,
            organic_carbon_g_per_kg: None,
            clay_pct: None,
            sand_pct: None,
            silt_pct: None,
        }
    }

    fn set(&mut self, property: &str, value: f64) {
        let slot = match property {
            "phh2o" => &mut self.ph,
            "soc" => &mut self.organic_carbon_g_per_kg,
            "clay" => &mut self.clay_pct,
            "sand" => &mut self.sand_pct,
            "silt" => &mut self.silt_pct,
            _ => return,
        };
        *slot = Some(value);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilReport {
    pub latitude: f64,
    pub longitude: f64,
    pub layers: Vec<SoilLayer>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    properties: RawProperties,
}

#[derive(Debug, Deserialize)]
struct RawProperties {
    #[serde(default)]
    layers: Vec<RawLayer>,
}

#[derive(Debug, Deserialize)]
struct RawLayer {
    name: String,
    unit_measure: UnitMeasure,
    #[serde(default)]
    depths: Vec<RawDepth>,
}

#[derive(Debug, Deserialize)]
struct UnitMeasure {
    d_factor: f64,
}

#[derive(Debug, Deserialize)]
struct RawDepth {
    label: String,
    values: RawValues,
}

#[derive(Debug, Deserialize)]
struct RawValues {
    mean: Option<f64>,
}

/// ISRIC SoilGrids point query client.
#[derive(Clone)]
pub struct SoilClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl SoilClient {
    pub fn new(base_url: &str, timeout: Duration, retry: RetryConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    #[instrument(skip(self))]
    pub async fn topsoil(&self, coordinates: Coordinates) -> Result<SoilReport, ServiceError> {
        let lat = coordinates.latitude.to_string();
        let lon = coordinates.longitude.to_string();
        let mut query = vec![("lon", lon.as_str()), ("lat", lat.as_str()), ("value", "mean")];
        query.extend(PROPERTIES.iter().map(|p| ("property", *p)));
        query.extend(DEPTHS.iter().map(|d| ("depth", *d)));

        let url = format!("{}{}", self.base_url, QUERY_PATH);
        let response: QueryResponse =
            fetch_json(&self.client, &self.retry, "SoilGrids", &url, &query).await?;

        Ok(SoilReport {
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            layers: scale_layers(response.properties.layers),
        })
    }
}

fn scale_layers(raw: Vec<RawLayer>) -> Vec<SoilLayer> {
    let mut layers: Vec<SoilLayer> = DEPTHS.iter().map(|d| SoilLayer::empty(d)).collect();
    for property in raw {
        let factor = if property.unit_measure.d_factor > 0.0 {
            property.unit_measure.d_factor
        } else {
            1.0
        };
        for depth in property.depths {
            let (Some(layer), Some(mean)) = (
                layers.iter_mut().find(|l| l.depth == depth.label),
                depth.values.mean,
            ) else {
                continue;
            };
            layer.set(&property.name, mean / factor);
        }
    }
    layers
}
