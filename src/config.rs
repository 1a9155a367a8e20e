use config::{Config, ConfigError, Environment, File};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::middleware_helpers::retry::RetryConfig;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CACHE_TYPE: &str = "in-memory";
const DEFAULT_CACHE_NAMESPACE: &str = "verdant";
const DEFAULT_PREVIEW_TTL_SECS: u64 = 600;

/// Cache configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// "in-memory" or "redis"
    #[serde(default = "default_cache_type")]
    #[validate(custom = "validate_cache_type")]
    pub cache_type: String,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Key prefix used by the Redis backend
    #[serde(default = "default_cache_namespace")]
    pub namespace: String,

    /// Lifetime of an order preview between preview and confirm
    #[serde(default = "default_preview_ttl_secs")]
    #[validate(range(min = 1, max = 86400))]
    pub preview_ttl_secs: u64,

    /// How often the in-memory backend drops expired entries
    #[serde(default = "default_sweep_interval_secs")]
    #[validate(range(min = 1, max = 3600))]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: default_cache_type(),
            redis_url: default_redis_url(),
            namespace: default_cache_namespace(),
            preview_ttl_secs: default_preview_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Warehouse the parcels leave from.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ShippingOriginConfig {
    #[serde(default = "default_origin_province_id")]
    pub province_id: i64,
    #[serde(default = "default_origin_district_id")]
    pub district_id: i64,
    #[serde(default = "default_origin_ward_code")]
    pub ward_code: String,
    #[serde(default)]
    pub street: String,
}

impl ShippingOriginConfig {
    pub fn codes(&self) -> crate::services::couriers::AddressCodes {
        crate::services::couriers::AddressCodes {
            province_id: self.province_id,
            district_id: self.district_id,
            ward_code: self.ward_code.clone(),
        }
    }
}

impl Default for ShippingOriginConfig {
    fn default() -> Self {
        Self {
            province_id: default_origin_province_id(),
            district_id: default_origin_district_id(),
            ward_code: default_origin_ward_code(),
            street: String::new(),
        }
    }
}

/// GHN courier credentials
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GhnConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_ghn_base_url")]
    #[validate(url)]
    pub base_url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub shop_id: i64,
}

impl Default for GhnConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_ghn_base_url(),
            token: String::new(),
            shop_id: 0,
        }
    }
}

/// Goship aggregator credentials
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GoshipConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_goship_base_url")]
    #[validate(url)]
    pub base_url: String,
    #[serde(default)]
    pub token: String,
}

impl Default for GoshipConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_goship_base_url(),
            token: String::new(),
        }
    }
}

/// PayOS merchant credentials
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PayOsConfig {
    #[serde(default = "default_payos_base_url")]
    #[validate(url)]
    pub base_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub checksum_key: String,
    #[serde(default = "default_payos_return_url")]
    pub return_url: String,
    #[serde(default = "default_payos_cancel_url")]
    pub cancel_url: String,
}

impl Default for PayOsConfig {
    fn default() -> Self {
        Self {
            base_url: default_payos_base_url(),
            client_id: String::new(),
            api_key: String::new(),
            checksum_key: String::new(),
            return_url: default_payos_return_url(),
            cancel_url: default_payos_cancel_url(),
        }
    }
}

/// Farm data upstreams
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentApiConfig {
    #[serde(default = "default_open_meteo_url")]
    #[validate(url)]
    pub open_meteo_url: String,
    #[serde(default = "default_soilgrids_url")]
    #[validate(url)]
    pub soilgrids_url: String,
    #[serde(default = "default_retry_attempts")]
    #[validate(range(min = 1, max = 10))]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
}

impl Default for EnvironmentApiConfig {
    fn default() -> Self {
        Self {
            open_meteo_url: default_open_meteo_url(),
            soilgrids_url: default_soilgrids_url(),
            retry_attempts: default_retry_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    #[serde(default)]
    #[validate]
    pub cache: CacheConfig,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// VAT rate already included in list prices (e.g. 0.1 for 10%)
    #[serde(default = "default_tax_rate")]
    #[validate(custom = "validate_rate")]
    pub tax_rate: f64,

    /// Platform share withheld from vendor credits on delivery
    #[serde(default = "default_commission_rate")]
    #[validate(custom = "validate_rate")]
    pub commission_rate: f64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,

    /// Per-call timeout for outbound HTTP integrations
    #[serde(default = "default_http_timeout_secs")]
    #[validate(range(min = 1, max = 120))]
    pub http_timeout_secs: u64,

    #[serde(default)]
    #[validate]
    pub shipping_origin: ShippingOriginConfig,

    #[serde(default)]
    #[validate]
    pub ghn: GhnConfig,

    #[serde(default)]
    #[validate]
    pub goship: GoshipConfig,

    #[serde(default)]
    #[validate]
    pub payos: PayOsConfig,

    #[serde(default)]
    #[validate]
    pub environment_api: EnvironmentApiConfig,
}

impl AppConfig {
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            cache: CacheConfig::default(),
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            tax_rate: default_tax_rate(),
            commission_rate: default_commission_rate(),
            event_channel_capacity: default_event_channel_capacity(),
            http_timeout_secs: default_http_timeout_secs(),
            shipping_origin: ShippingOriginConfig::default(),
            ghn: GhnConfig::default(),
            goship: GoshipConfig::default(),
            payos: PayOsConfig::default(),
            environment_api: EnvironmentApiConfig::default(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn tax_rate(&self) -> Decimal {
        rate_to_decimal(self.tax_rate)
    }

    pub fn commission_rate(&self) -> Decimal {
        rate_to_decimal(self.commission_rate)
    }

    pub fn preview_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.preview_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn environment_retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.environment_api.retry_attempts,
            initial_delay: Duration::from_millis(self.environment_api.retry_initial_delay_ms),
            ..RetryConfig::default()
        }
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if self.ghn.enabled && (self.ghn.token.trim().is_empty() || self.ghn.shop_id <= 0) {
            let mut err = ValidationError::new("ghn_credentials_required");
            err.message = Some("GHN is enabled but APP__GHN__TOKEN or APP__GHN__SHOP_ID is missing".into());
            errors.add("ghn", err);
        }

        if self.goship.enabled && self.goship.token.trim().is_empty() {
            let mut err = ValidationError::new("goship_token_required");
            err.message = Some("Goship is enabled but APP__GOSHIP__TOKEN is missing".into());
            errors.add("goship", err);
        }

        if self.is_production() && self.payos.checksum_key.trim().is_empty() {
            let mut err = ValidationError::new("payos_checksum_key_required");
            err.message = Some("APP__PAYOS__CHECKSUM_KEY must be set in production".into());
            errors.add("payos", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

fn rate_to_decimal(rate: f64) -> Decimal {
    Decimal::from_f64(rate)
        .map(|d| d.round_dp(6))
        .unwrap_or(Decimal::ZERO)
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_cache_type() -> String {
    DEFAULT_CACHE_TYPE.to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_cache_namespace() -> String {
    DEFAULT_CACHE_NAMESPACE.to_string()
}

fn default_preview_ttl_secs() -> u64 {
    DEFAULT_PREVIEW_TTL_SECS
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_db_max_connections() -> u32 {
    20
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    10
}
fn default_db_idle_timeout_secs() -> u64 {
    300
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_tax_rate() -> f64 {
    0.10
}

fn default_commission_rate() -> f64 {
    0.10
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_http_timeout_secs() -> u64 {
    15
}

// Ho Chi Minh City, District 1, Ben Nghe ward
fn default_origin_province_id() -> i64 {
    202
}
fn default_origin_district_id() -> i64 {
    1442
}
fn default_origin_ward_code() -> String {
    "20109".to_string()
}

fn default_ghn_base_url() -> String {
    "https://online-gateway.ghn.vn".to_string()
}

fn default_goship_base_url() -> String {
    "https://api.goship.io".to_string()
}

fn default_payos_base_url() -> String {
    "https://api-merchant.payos.vn".to_string()
}

fn default_payos_return_url() -> String {
    "http://localhost:3000/payment/success".to_string()
}

fn default_payos_cancel_url() -> String {
    "http://localhost:3000/payment/cancel".to_string()
}

fn default_open_meteo_url() -> String {
    "https://api.open-meteo.com".to_string()
}

fn default_soilgrids_url() -> String {
    "https://rest.isric.org".to_string()
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_initial_delay_ms() -> u64 {
    200
}

fn validate_cache_type(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "in-memory" | "memory" | "redis" => Ok(()),
        _ => {
            let mut err = ValidationError::new("cache_type");
            err.message = Some("Must be one of: in-memory, redis".into());
            Err(err)
        }
    }
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_rate(rate: f64) -> Result<(), ValidationError> {
    if !rate.is_finite() || !(0.0..1.0).contains(&rate) {
        let mut err = ValidationError::new("rate");
        err.message = Some("rate must be a finite value in [0.0, 1.0)".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("verdant_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Same layering as [`load_config`] with an explicit config directory.
pub fn load_config_from(dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            dir.display()
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://verdant.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(dir.join("default")).required(false))
        .add_source(File::from(dir.join(run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
