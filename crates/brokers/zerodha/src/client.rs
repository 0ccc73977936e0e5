use async_trait::async_trait;
use brokersync_core::expiry::end_of_day_expiry;
use brokersync_core::*;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::protocol::*;

/// Configuration for the Kite Connect API.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZerodhaConfig {
    pub api_key: String,
    pub api_secret: String,
    /// Page the user is redirected to for login.
    pub login_url: String,
    /// Root of the REST API.
    pub api_root: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ZerodhaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            login_url: "https://kite.zerodha.com/connect/login".to_string(),
            api_root: "https://api.kite.trade".to_string(),
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for ZerodhaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZerodhaConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("login_url", &self.login_url)
            .field("api_root", &self.api_root)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Zerodha Kite Connect adapter.
///
/// An unbound adapter can only build login URLs and exchange request tokens;
/// [`ZerodhaBroker::bind`] yields one that can fetch trades.
#[derive(Clone)]
pub struct ZerodhaBroker {
    config: ZerodhaConfig,
    client: reqwest::Client,
    access_token: Option<String>,
}

fn transport_error(e: reqwest::Error) -> BrokerError {
    BrokerError::ConnectionFailed(e.to_string())
}

impl ZerodhaBroker {
    pub fn new(config: ZerodhaConfig) -> Result<Self, BrokerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BrokerError::Other(format!("Failed to initialize HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            access_token: None,
        })
    }

    /// A copy of this adapter bound to `access_token`. Shares the HTTP client.
    pub fn bind(&self, access_token: &str) -> Self {
        Self {
            config: self.config.clone(),
            client: self.client.clone(),
            access_token: Some(access_token.to_string()),
        }
    }

    pub fn config(&self) -> &ZerodhaConfig {
        &self.config
    }

    /// URL the user has to visit to start a Kite login.
    pub fn login_url(&self) -> String {
        format!("{}?v={}&api_key={}", self.config.login_url, KITE_API_VERSION, self.config.api_key)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_root.trim_end_matches('/'), path)
    }

    fn require_api_credentials(&self) -> Result<(), BrokerError> {
        if self.config.api_key.is_empty() || self.config.api_secret.is_empty() {
            return Err(BrokerError::InvalidRequest(
                "Zerodha API key and secret are not configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Exchange the one-time `request_token` from the login redirect for a
    /// session.
    ///
    /// Kite does not report an expiry; the session is assumed valid until the
    /// end of the current calendar day.
    pub async fn generate_session(&self, request_token: &str) -> Result<BrokerSession, BrokerError> {
        if request_token.trim().is_empty() {
            return Err(BrokerError::InvalidRequest("request_token is required".to_string()));
        }
        self.require_api_credentials()?;

        let checksum = session_checksum(&self.config.api_key, request_token, &self.config.api_secret);
        let response = self
            .client
            .post(self.endpoint("/session/token"))
            .header("X-Kite-Version", KITE_API_VERSION)
            .form(&[
                ("api_key", self.config.api_key.as_str()),
                ("request_token", request_token),
                ("checksum", checksum.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let session: SessionData = read_response(response).await?;
        info!(user_id = %session.user_id, "Kite session generated");

        Ok(BrokerSession {
            access_token: session.access_token,
            refresh_token: session.refresh_token.filter(|t| !t.is_empty()),
            user_id: session.user_id,
            expires_at: Some(end_of_day_expiry()),
        })
    }
}

async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BrokerError> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(transport_error)?;
    decode_response(status, &body)
}

#[async_trait]
impl BrokerAdapter for ZerodhaBroker {
    fn kind(&self) -> BrokerKind {
        BrokerKind::ZerodhaReal
    }

    async fn fetch_trades(&self) -> Result<Vec<RawTrade>, BrokerError> {
        let access_token = self
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BrokerError::NotAuthenticated("No access token provided".to_string()))?;

        let response = self
            .client
            .get(self.endpoint("/trades"))
            .header("X-Kite-Version", KITE_API_VERSION)
            .header(
                AUTHORIZATION,
                format!("token {}:{}", self.config.api_key, access_token),
            )
            .send()
            .await
            .map_err(transport_error)?;

        let trades: TradesData = read_response(response).await?;
        debug!(count = trades.len(), "Fetched trades from Kite");
        Ok(trades)
    }

    // No refresh_session override: Kite requires a full re-login.
}
