use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::handlers::AppState;

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: &'static str,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub database: ComponentHealth,
    pub cache: ComponentHealth,
}

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Call once on startup so `/health` can report uptime.
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

fn component(result: Result<(), String>, elapsed: Duration) -> ComponentHealth {
    ComponentHealth {
        status: if result.is_ok() {
            ComponentStatus::Up
        } else {
            ComponentStatus::Down
        },
        message: result.err(),
        latency_ms: elapsed.as_millis() as u64,
    }
}

/// Liveness: the process answers.
pub async fn status() -> Json<Value> {
    Json(json!({
        "status": "up",
        "service": "verdant-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Readiness: database ping plus a cache probe.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let started = Instant::now();
    let db = crate::db::check_connection(&state.db)
        .await
        .map_err(|e| e.to_string());
    let database = component(db, started.elapsed());

    let started = Instant::now();
    let cache = state
        .cache
        .exists("health:probe")
        .await
        .map(|_| ())
        .map_err(|e| e.to_string());
    let cache = component(cache, started.elapsed());

    let overall = if database.status == ComponentStatus::Up && cache.status == ComponentStatus::Up {
        ComponentStatus::Up
    } else {
        ComponentStatus::Down
    };
    let code = match overall {
        ComponentStatus::Up => StatusCode::OK,
        ComponentStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        code,
        Json(HealthResponse {
            status: overall,
            version: env!("CARGO_PKG_VERSION"),
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_secs: uptime_secs(),
            database,
            cache,
        }),
    )
}
