use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Broker
// ---------------------------------------------------------------------------

/// The closed set of brokers the sync engine can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrokerKind {
    /// Zerodha Kite Connect (live API).
    #[serde(rename = "zerodha-real")]
    ZerodhaReal,
    /// In-process simulated broker.
    #[serde(rename = "mock")]
    Mock,
}

impl BrokerKind {
    pub const ALL: [BrokerKind; 2] = [BrokerKind::ZerodhaReal, BrokerKind::Mock];

    /// Canonical tag, used as the token store key and as `Trade::broker`.
    pub const fn tag(&self) -> &'static str {
        match self {
            BrokerKind::ZerodhaReal => "zerodha-real",
            BrokerKind::Mock => "mock",
        }
    }
}

impl fmt::Display for BrokerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for BrokerKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zerodha" | "zerodha-real" => Ok(BrokerKind::ZerodhaReal),
            "mock" => Ok(BrokerKind::Mock),
            _ => Err(SyncError::UnsupportedBroker(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// Trade side. Serialized as `BUY` / `SELL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Collapse a raw transaction type into a side.
    ///
    /// Only the exact string `BUY` is a buy. Everything else, including
    /// lower-case `buy` and garbage values, is treated as a sell.
    pub fn from_transaction_type(raw: Option<&str>) -> Self {
        match raw {
            Some("BUY") => Side::Buy,
            _ => Side::Sell,
        }
    }
}

/// A canonical, broker-independent trade record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub broker: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// A broker-native trade record, exactly as the broker returned it.
///
/// Only the normalizer looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTrade(pub serde_json::Value);

impl RawTrade {
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for RawTrade {
    fn from(value: serde_json::Value) -> Self {
        RawTrade(value)
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// The stored credential for one (user, broker) pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub broker: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for TokenData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenData")
            .field("user_id", &self.user_id)
            .field("broker", &self.broker)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Result of a login or refresh call. Never stored as-is.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl BrokerSession {
    /// Build the record that replaces `previous` after a successful refresh.
    ///
    /// The refresh token and expiry are carried forward from `previous` when
    /// the session does not supply new ones. The record is keyed by the
    /// session's own user id.
    pub fn refreshed(self, previous: &TokenData) -> TokenData {
        TokenData {
            user_id: self.user_id,
            broker: previous.broker.clone(),
            access_token: self.access_token,
            refresh_token: self.refresh_token.or_else(|| previous.refresh_token.clone()),
            expires_at: self.expires_at.unwrap_or(previous.expires_at),
        }
    }

    /// Build a fresh record from a login session.
    pub fn into_token_data(self, broker: BrokerKind, default_expiry: DateTime<Utc>) -> TokenData {
        TokenData {
            user_id: self.user_id,
            broker: broker.tag().to_string(),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_at.unwrap_or(default_expiry),
        }
    }
}

impl fmt::Debug for BrokerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerSession")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
