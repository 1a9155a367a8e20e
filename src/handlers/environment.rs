use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::services::environment::{Co2Estimate, Co2Input, Coordinates, SoilReport, WeatherReport};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "default_days")]
    pub days: u8,
}

fn default_days() -> u8 {
    7
}

#[derive(Debug, Deserialize)]
pub struct SoilQuery {
    pub lat: f64,
    pub lon: f64,
}

/// GET /api/v1/environment/weather?lat=&lon=&days=
pub async fn weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> ApiResult<WeatherReport> {
    let report = state
        .services
        .environment
        .weather(
            Coordinates {
                latitude: query.lat,
                longitude: query.lon,
            },
            query.days,
        )
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

/// GET /api/v1/environment/soil?lat=&lon=
pub async fn soil(
    State(state): State<AppState>,
    Query(query): Query<SoilQuery>,
) -> ApiResult<SoilReport> {
    let report = state
        .services
        .environment
        .soil(Coordinates {
            latitude: query.lat,
            longitude: query.lon,
        })
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn co2(
    State(state): State<AppState>,
    Json(input): Json<Co2Input>,
) -> ApiResult<Co2Estimate> {
    let estimate = state.services.environment.co2(&input)?;
    Ok(Json(ApiResponse::success(estimate)))
}
