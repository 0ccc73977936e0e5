use brokersync_core::{BrokerError, RawTrade};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// API version sent in the `X-Kite-Version` header.
pub const KITE_API_VERSION: &str = "3";

/// Standard Kite response envelope.
///
/// Success: `{"status": "success", "data": ...}`.
/// Failure: `{"status": "error", "message": ..., "error_type": ...}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
}

/// `data` of a successful `POST /session/token`.
#[derive(Debug, Deserialize)]
pub struct SessionData {
    pub user_id: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// `data` of `GET /trades`. Records are kept as-is for the normalizer.
pub type TradesData = Vec<RawTrade>;

/// Session checksum: hex SHA-256 of `api_key + request_token + api_secret`.
pub fn session_checksum(api_key: &str, request_token: &str, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hasher.update(request_token.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Unwrap a Kite response body into its `data` payload.
pub fn decode_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, BrokerError> {
    let success = (200..300).contains(&status);

    let envelope: Envelope<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if !success => {
            return Err(BrokerError::Api {
                status,
                error_type: None,
                message: body.trim().to_string(),
            })
        }
        Err(e) => return Err(BrokerError::Decode(e.to_string())),
    };

    if !success || envelope.status != "success" {
        return Err(BrokerError::Api {
            status,
            error_type: envelope.error_type,
            message: envelope
                .message
                .unwrap_or_else(|| format!("request failed with status {}", envelope.status)),
        });
    }

    envelope
        .data
        .ok_or_else(|| BrokerError::Decode("response has no data".to_string()))
}
