use crate::traits::BrokerError;

/// Application-level failure of a sync or login call.
///
/// Every variant maps to an HTTP-style status code through
/// [`SyncError::status_code`]. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("No token found for user {user_id} with broker {broker}. Please login first.")]
    NotAuthenticated { user_id: String, broker: String },
    #[error("Token expired and broker {broker} does not support refresh. Please re-login.")]
    RefreshUnsupported { broker: String },
    #[error("Token refresh failed: {reason}. Please re-login.")]
    RefreshFailed { reason: String },
    #[error("Unsupported broker: {0}")]
    UnsupportedBroker(String),
    #[error(transparent)]
    Fetch(#[from] BrokerError),
    #[error("Login failed: {0}")]
    Login(#[source] BrokerError),
}

impl SyncError {
    pub fn status_code(&self) -> u16 {
        match self {
            SyncError::NotAuthenticated { .. }
            | SyncError::RefreshUnsupported { .. }
            | SyncError::RefreshFailed { .. } => 401,
            SyncError::UnsupportedBroker(_) => 400,
            SyncError::Fetch(err) => match err {
                BrokerError::NotAuthenticated(_) => 401,
                BrokerError::Api { status: 401 | 403, .. } => 401,
                BrokerError::Api { .. }
                | BrokerError::ConnectionFailed(_)
                | BrokerError::Decode(_) => 502,
                _ => 500,
            },
            SyncError::Login(err) => match err {
                BrokerError::InvalidRequest(_) => 400,
                BrokerError::Api { status, .. } if (400..500).contains(status) => 400,
                _ => 502,
            },
        }
    }

    /// Whether the caller has to (re-)authenticate before trying again.
    pub fn requires_login(&self) -> bool {
        self.status_code() == 401
    }
}
