//! Tokens, request signing and the per-identity token cache.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::ApiError;

pub const HEADER_UID: &str = "uid";
pub const HEADER_TIMESTAMP: &str = "x-beehive-timestamp";
pub const HEADER_SIGN: &str = "sign";

type HmacSha256 = Hmac<Sha256>;

/// Bearer token plus the optional secret used to sign requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    pub seckey: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Parse a token endpoint reply.
    ///
    /// Accepts `access_token` (or `token`), an optional `seckey`, and either
    /// `expires_in` seconds or `expires_at` (RFC 3339 or unix seconds).
    pub fn from_reply(reply: &Value, now: DateTime<Utc>) -> Result<Self, String> {
        let token = reply
            .get("access_token")
            .or_else(|| reply.get("token"))
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| "token reply has no access_token".to_string())?;
        let seckey = reply
            .get("seckey")
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
            .map(str::to_string);
        let expires_at = match (reply.get("expires_in"), reply.get("expires_at")) {
            (Some(seconds), _) if seconds.as_i64().is_some() => {
                Some(now + ChronoDuration::seconds(seconds.as_i64().unwrap_or_default()))
            }
            (_, Some(Value::String(text))) => Some(
                DateTime::parse_from_rfc3339(text)
                    .map_err(|e| format!("invalid expires_at '{text}': {e}"))?
                    .with_timezone(&Utc),
            ),
            (_, Some(Value::Number(number))) => number.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
            _ => None,
        };
        Ok(Self {
            token: token.to_string(),
            seckey,
            expires_at,
        })
    }

    /// Headers authenticating one request.
    ///
    /// With a secret key: `uid`, `x-beehive-timestamp` and `sign`; otherwise a
    /// bearer `Authorization` header.
    pub fn request_headers(&self, method: &str, path: &str, body: &[u8], timestamp: i64) -> Result<Vec<(String, String)>, ApiError> {
        match &self.seckey {
            Some(seckey) => Ok(vec![
                (HEADER_UID.to_string(), self.token.clone()),
                (HEADER_TIMESTAMP.to_string(), timestamp.to_string()),
                (HEADER_SIGN.to_string(), sign_request(seckey, method, path, timestamp, body)?),
            ]),
            None => Ok(vec![("Authorization".to_string(), format!("Bearer {}", self.token))]),
        }
    }
}

/// `hex(HMAC-SHA256(seckey, METHOD\nPATH\nTIMESTAMP\nhex(SHA256(body))))`.
pub fn sign_request(seckey: &str, method: &str, path: &str, timestamp: i64, body: &[u8]) -> Result<String, ApiError> {
    let body_hash = hex::encode(Sha256::digest(body));
    let canonical = format!("{}\n{}\n{}\n{}", method.to_ascii_uppercase(), path, timestamp, body_hash);
    let mut mac = HmacSha256::new_from_slice(seckey.as_bytes()).map_err(|e| ApiError::AuthSetup {
        reason: format!("invalid signing key: {e}"),
    })?;
    mac.update(canonical.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

type Slot = Arc<AsyncMutex<Option<AuthToken>>>;

/// Token cache with one slot per credential identity.
///
/// Each slot has its own async mutex: a refresh holds only the slot of the
/// identity being refreshed.
#[derive(Debug, Default)]
pub struct TokenCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, identity: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.entry(identity.to_string()).or_default().clone()
    }

    /// Return the cached token for `identity`, calling `refresh` when there is
    /// none or it has expired.
    pub async fn get_or_refresh<F, Fut>(&self, identity: &str, refresh: F) -> Result<AuthToken, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AuthToken, ApiError>>,
    {
        let slot = self.slot(identity);
        let mut guard = slot.lock().await;
        if let Some(token) = guard.as_ref()
            && !token.is_expired(Utc::now())
        {
            return Ok(token.clone());
        }
        *guard = None;
        debug!(identity, "requesting a new token");
        let token = refresh().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token if it is still `stale`.
    pub async fn invalidate(&self, identity: &str, stale: &str) {
        let slot = self.slot(identity);
        let mut guard = slot.lock().await;
        if guard.as_ref().is_some_and(|token| token.token == stale) {
            *guard = None;
        }
    }

    /// Currently cached token, without refreshing.
    pub async fn peek(&self, identity: &str) -> Option<AuthToken> {
        self.slot(identity).lock().await.clone()
    }
}
