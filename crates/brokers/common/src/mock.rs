use async_trait::async_trait;
use brokersync_core::expiry::expiry_in;
use brokersync_core::*;
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Configuration for the mock broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockBrokerConfig {
    /// Simulated latency of a trade fetch.
    pub fetch_latency_ms: u64,
    /// Simulated latency of a session refresh.
    pub refresh_latency_ms: u64,
    /// Lifetime of a session issued by `login`. Kept short so the refresh
    /// path can be exercised by hand.
    pub login_ttl_secs: i64,
    /// Lifetime of a session issued by a refresh.
    pub refresh_ttl_days: i64,
}

impl Default for MockBrokerConfig {
    fn default() -> Self {
        Self {
            fetch_latency_ms: 500,
            refresh_latency_ms: 300,
            login_ttl_secs: 5 * 60,
            refresh_ttl_days: 7,
        }
    }
}

impl MockBrokerConfig {
    /// No simulated latency. Used by tests.
    pub fn instant() -> Self {
        Self {
            fetch_latency_ms: 0,
            refresh_latency_ms: 0,
            ..Default::default()
        }
    }
}

/// A simulated broker that needs no network.
///
/// Returns the same three Kite-shaped trades on every fetch and always
/// succeeds when asked to refresh.
#[derive(Debug, Clone)]
pub struct MockBroker {
    config: MockBrokerConfig,
    user_id: Option<String>,
    access_token: Option<String>,
}

impl MockBroker {
    /// An adapter with no credential. Only useful for `login`.
    pub fn new(config: MockBrokerConfig) -> Self {
        Self {
            config,
            user_id: None,
            access_token: None,
        }
    }

    /// An adapter bound to a stored credential.
    pub fn with_credential(config: MockBrokerConfig, token: &TokenData) -> Self {
        Self {
            config,
            user_id: Some(token.user_id.clone()),
            access_token: Some(token.access_token.clone()),
        }
    }

    /// Issue a brand new short-lived session for `user_id`.
    pub fn login(&self, user_id: &str) -> BrokerSession {
        info!(user_id = %user_id, "Issuing mock login session");
        BrokerSession {
            access_token: mint("mock_token"),
            refresh_token: Some(mint("mock_refresh")),
            user_id: user_id.to_string(),
            expires_at: Some(expiry_in(
                ChronoDuration::try_seconds(self.config.login_ttl_secs).unwrap_or(ChronoDuration::MAX),
            )),
        }
    }

    /// The fixed trade list every fetch returns.
    pub fn fixture_trades() -> Vec<RawTrade> {
        vec![
            RawTrade(json!({
                "trade_id": "T001",
                "tradingsymbol": "RELIANCE",
                "transaction_type": "BUY",
                "quantity": 10,
                "average_price": 2500.50,
                "order_timestamp": "2025-01-10T10:30:00Z"
            })),
            RawTrade(json!({
                "trade_id": "T002",
                "tradingsymbol": "TCS",
                "transaction_type": "SELL",
                "quantity": 5,
                "average_price": 3800.75,
                "order_timestamp": "2025-01-10T14:15:00Z"
            })),
            RawTrade(json!({
                "trade_id": "T003",
                "tradingsymbol": "INFY",
                "transaction_type": "BUY",
                "quantity": 20,
                "average_price": 1450.25,
                "order_timestamp": "2025-01-11T09:45:00Z"
            })),
        ]
    }
}

fn mint(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

async fn simulate_latency(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[async_trait]
impl BrokerAdapter for MockBroker {
    fn kind(&self) -> BrokerKind {
        BrokerKind::Mock
    }

    async fn fetch_trades(&self) -> Result<Vec<RawTrade>, BrokerError> {
        if self.access_token.as_deref().map_or(true, str::is_empty) {
            return Err(BrokerError::NotAuthenticated(
                "No access token provided".to_string(),
            ));
        }

        simulate_latency(self.config.fetch_latency_ms).await;
        let trades = Self::fixture_trades();
        debug!(count = trades.len(), "Mock broker returned trades");
        Ok(trades)
    }

    async fn refresh_session(&self) -> Result<BrokerSession, BrokerError> {
        let user_id = self.user_id.clone().ok_or_else(|| {
            BrokerError::NotAuthenticated("Mock adapter has no bound user".to_string())
        })?;

        simulate_latency(self.config.refresh_latency_ms).await;
        info!(user_id = %user_id, "Mock broker refreshed session");

        Ok(BrokerSession {
            access_token: mint("mock_token"),
            refresh_token: Some(mint("mock_refresh")),
            user_id,
            expires_at: Some(expiry_in(
                ChronoDuration::try_days(self.config.refresh_ttl_days).unwrap_or(ChronoDuration::MAX),
            )),
        })
    }
}
