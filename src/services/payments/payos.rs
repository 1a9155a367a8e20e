use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::{debug, instrument};

use crate::config::PayOsConfig;
use crate::errors::ServiceError;
use crate::services::couriers::http_client;

type HmacSha256 = Hmac<Sha256>;

const PAYMENT_REQUESTS_PATH: &str = "/v2/payment-requests";
const SUCCESS_CODE: &str = "00";
/// PayOS truncates longer descriptions on bank statements
pub const MAX_DESCRIPTION_CHARS: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLinkRequest {
    pub order_code: i64,
    pub amount: i64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLink {
    pub checkout_url: String,
    #[serde(default)]
    pub payment_link_id: Option<String>,
    #[serde(default)]
    pub qr_code: Option<String>,
    pub order_code: i64,
    pub amount: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLinkBody<'a> {
    order_code: i64,
    amount: i64,
    description: &'a str,
    return_url: &'a str,
    cancel_url: &'a str,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    code: String,
    #[serde(default)]
    desc: String,
    data: Option<PaymentLink>,
}

/// Body PayOS posts to the webhook URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookBody {
    pub code: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub success: Option<bool>,
    pub data: Value,
    pub signature: String,
}

/// The fields of `WebhookBody::data` the service acts on.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookData {
    pub order_code: i64,
    pub amount: i64,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub payment_link_id: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
}

impl WebhookBody {
    pub fn is_success(&self) -> bool {
        let data_code = self.data.get("code").and_then(Value::as_str);
        self.code == SUCCESS_CODE && data_code.map_or(true, |c| c == SUCCESS_CODE)
    }

    pub fn parsed_data(&self) -> Result<WebhookData, ServiceError> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| ServiceError::ValidationError(format!("malformed webhook data: {}", e)))
    }
}

#[derive(Clone)]
pub struct PayOsClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    api_key: String,
    checksum_key: String,
    return_url: String,
    cancel_url: String,
}

impl PayOsClient {
    pub fn new(config: &PayOsConfig, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            api_key: config.api_key.clone(),
            checksum_key: config.checksum_key.clone(),
            return_url: config.return_url.clone(),
            cancel_url: config.cancel_url.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.api_key.is_empty() && !self.checksum_key.is_empty()
    }

    #[instrument(skip(self), fields(order_code = request.order_code))]
    pub async fn create_payment_link(
        &self,
        request: &PaymentLinkRequest,
    ) -> Result<PaymentLink, ServiceError> {
        if !self.is_configured() {
            return Err(ServiceError::ServiceUnavailable(
                "PayOS credentials are not configured".to_string(),
            ));
        }

        let description = truncate_description(&request.description);
        let signature = self.sign(&link_signature_payload(
            request.amount,
            &self.cancel_url,
            &description,
            request.order_code,
            &self.return_url,
        ))?;

        let response = self
            .client
            .post(format!("{}{}", self.base_url, PAYMENT_REQUESTS_PATH))
            .header("x-client-id", &self.client_id)
            .header("x-api-key", &self.api_key)
            .json(&CreateLinkBody {
                order_code: request.order_code,
                amount: request.amount,
                description: &description,
                return_url: &self.return_url,
                cancel_url: &self.cancel_url,
                signature,
            })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(%status, "PayOS response");

        let envelope: Envelope = serde_json::from_str(&text).map_err(|e| {
            ServiceError::ExternalServiceError(format!(
                "PayOS returned an unreadable body (HTTP {}): {}",
                status, e
            ))
        })?;
        if !status.is_success() || envelope.code != SUCCESS_CODE {
            return Err(ServiceError::PaymentFailed(format!(
                "PayOS rejected payment link with code {}: {}",
                envelope.code, envelope.desc
            )));
        }
        envelope
            .data
            .ok_or_else(|| ServiceError::ExternalServiceError("PayOS returned no link data".to_string()))
    }

    /// Checks the webhook signature against the checksum key.
    pub fn verify_webhook(&self, body: &WebhookBody) -> Result<(), ServiceError> {
        if self.checksum_key.is_empty() {
            return Err(ServiceError::Unauthorized(
                "PayOS checksum key is not configured".to_string(),
            ));
        }
        let Value::Object(fields) = &body.data else {
            return Err(ServiceError::ValidationError(
                "webhook data must be an object".to_string(),
            ));
        };

        let mut entries: Vec<(&String, &Value)> = fields.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let payload = entries
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, signature_value(v)))
            .collect::<Vec<_>>()
            .join("&");

        let expected = self.sign(&payload)?;
        if bool::from(expected.as_bytes().ct_eq(body.signature.to_ascii_lowercase().as_bytes())) {
            Ok(())
        } else {
            Err(ServiceError::Unauthorized("invalid PayOS signature".to_string()))
        }
    }

    fn sign(&self, payload: &str) -> Result<String, ServiceError> {
        let mut mac = HmacSha256::new_from_slice(self.checksum_key.as_bytes())
            .map_err(|e| ServiceError::InternalError(format!("invalid checksum key: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

pub(crate) fn link_signature_payload(
    amount: i64,
    cancel_url: &str,
    description: &str,
    order_code: i64,
    return_url: &str,
) -> String {
    format!(
        "amount={}&cancelUrl={}&description={}&orderCode={}&returnUrl={}",
        amount, cancel_url, description, order_code, return_url
    )
}

fn signature_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) if s == "null" || s == "undefined" => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate_description(description: &str) -> String {
    description.chars().take(MAX_DESCRIPTION_CHARS).collect()
}
