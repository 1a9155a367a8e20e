//! Hand-off of priced order previews between the preview and confirm calls.
//!
//! A preview is written once with an absolute expiry and read back by id.
//! Confirmation consumes it with [`CacheBackend::take`], so a preview id can
//! produce at most one order even when confirm requests race.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::{CacheBackend, CacheError};

const KEY_PREFIX: &str = "order_preview";

/// Cached payload plus the instant it stops being valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPreview<T> {
    pub expires_at: DateTime<Utc>,
    pub payload: T,
}

impl<T> StoredPreview<T> {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Option<Duration> {
        (self.expires_at - now)
            .to_std()
            .ok()
            .filter(|d| !d.is_zero())
    }
}

#[derive(Clone)]
pub struct PreviewStore {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl PreviewStore {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key(id: Uuid) -> String {
        format!("{}:{}", KEY_PREFIX, id)
    }

    /// Stores `payload` under `id` and returns its expiry.
    pub async fn save<T: Serialize>(
        &self,
        id: Uuid,
        payload: &T,
    ) -> Result<DateTime<Utc>, CacheError> {
        let ttl = ChronoDuration::from_std(self.ttl).map_err(|_| CacheError::InvalidTTL)?;
        let expires_at = Utc::now() + ttl;
        let envelope = StoredPreview {
            expires_at,
            payload,
        };
        let body = serde_json::to_string(&envelope)?;
        self.backend
            .set(&Self::key(id), &body, Some(self.ttl))
            .await?;
        Ok(expires_at)
    }

    /// Reads without consuming. Expired envelopes read as absent.
    pub async fn load<T: DeserializeOwned>(
        &self,
        id: Uuid,
    ) -> Result<Option<StoredPreview<T>>, CacheError> {
        let raw = self.backend.get(&Self::key(id)).await?;
        Self::decode(raw)
    }

    /// Removes the preview and returns it if this caller won the removal and
    /// it had not expired.
    pub async fn consume<T: DeserializeOwned>(
        &self,
        id: Uuid,
    ) -> Result<Option<StoredPreview<T>>, CacheError> {
        let raw = self.backend.take(&Self::key(id)).await?;
        Self::decode(raw)
    }

    /// Puts a consumed preview back for whatever lifetime it had left.
    /// Returns false when nothing was left to restore.
    pub async fn restore<T: Serialize>(
        &self,
        id: Uuid,
        stored: &StoredPreview<T>,
    ) -> Result<bool, CacheError> {
        let Some(remaining) = stored.remaining_ttl(Utc::now()) else {
            return Ok(false);
        };
        let body = serde_json::to_string(stored)?;
        self.backend
            .set(&Self::key(id), &body, Some(remaining))
            .await?;
        Ok(true)
    }

    fn decode<T: DeserializeOwned>(
        raw: Option<String>,
    ) -> Result<Option<StoredPreview<T>>, CacheError> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        let stored: StoredPreview<T> = serde_json::from_str(&raw)?;
        if stored.is_expired_at(Utc::now()) {
            return Ok(None);
        }
        Ok(Some(stored))
    }
}
