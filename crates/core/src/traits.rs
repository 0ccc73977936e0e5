use crate::models::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Whether a broker's access tokens carry a meaningful expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryCheck {
    /// Tokens are treated as never expiring.
    Never,
    /// Tokens expire at their stored `expires_at`.
    AtExpiresAt,
}

/// What happens once a broker's token has expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSupport {
    /// The broker can exchange the current credential for a new session.
    Refreshable,
    /// The broker requires a full re-login.
    ReloginRequired,
}

/// Capability descriptor for one broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerCapabilities {
    pub expiry: ExpiryCheck,
    pub refresh: RefreshSupport,
}

impl BrokerKind {
    pub const fn capabilities(&self) -> BrokerCapabilities {
        match self {
            BrokerKind::ZerodhaReal => BrokerCapabilities {
                expiry: ExpiryCheck::AtExpiresAt,
                refresh: RefreshSupport::ReloginRequired,
            },
            BrokerKind::Mock => BrokerCapabilities {
                expiry: ExpiryCheck::AtExpiresAt,
                refresh: RefreshSupport::Refreshable,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Broker Adapter Trait
// ---------------------------------------------------------------------------

/// Errors that can occur during broker operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),
    #[error("Broker {broker} does not support token refresh; a full re-login is required")]
    RefreshUnsupported { broker: BrokerKind },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Broker API error ({status}): {message}")]
    Api {
        status: u16,
        error_type: Option<String>,
        message: String,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Malformed broker response: {0}")]
    Decode(String),
    #[error("Broker error: {0}")]
    Other(String),
}

/// A broker adapter bound to a single credential.
///
/// Adapters are cheap, short-lived values: the sync engine builds one per
/// call from the stored credential and drops it afterwards.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    /// Which broker this adapter talks to.
    fn kind(&self) -> BrokerKind;

    /// What this broker supports. Defaults to the broker kind's descriptor.
    fn capabilities(&self) -> BrokerCapabilities {
        self.kind().capabilities()
    }

    /// Fetch the broker-native trade list for the bound credential.
    async fn fetch_trades(&self) -> Result<Vec<RawTrade>, BrokerError>;

    /// Exchange the bound credential for a new session.
    ///
    /// Brokers that require a full re-login keep this default.
    async fn refresh_session(&self) -> Result<BrokerSession, BrokerError> {
        Err(BrokerError::RefreshUnsupported { broker: self.kind() })
    }

    /// Whether `expires_at` has already passed.
    fn is_token_expired(&self, expires_at: DateTime<Utc>) -> bool {
        crate::expiry::is_expired(expires_at)
    }
}
