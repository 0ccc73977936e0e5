use brokersync_brokers_common::{MockBroker, MockBrokerConfig};
use brokersync_brokers_zerodha::{ZerodhaBroker, ZerodhaConfig};
use brokersync_core::*;

/// Builds an adapter bound to a stored credential.
pub trait AdapterFactory: Send + Sync {
    fn adapter(&self, kind: BrokerKind, token: &TokenData) -> Box<dyn BrokerAdapter>;
}

/// The production set of broker adapters.
pub struct BrokerAdapters {
    zerodha: ZerodhaBroker,
    mock: MockBrokerConfig,
}

impl BrokerAdapters {
    pub fn new(zerodha: ZerodhaConfig, mock: MockBrokerConfig) -> Result<Self, BrokerError> {
        Ok(Self {
            zerodha: ZerodhaBroker::new(zerodha)?,
            mock,
        })
    }

    /// The unbound Kite adapter, for login URL and request token exchange.
    pub fn zerodha(&self) -> &ZerodhaBroker {
        &self.zerodha
    }

    /// An unbound mock adapter, for mock logins.
    pub fn mock(&self) -> MockBroker {
        MockBroker::new(self.mock.clone())
    }
}

impl AdapterFactory for BrokerAdapters {
    fn adapter(&self, kind: BrokerKind, token: &TokenData) -> Box<dyn BrokerAdapter> {
        match kind {
            BrokerKind::ZerodhaReal => Box::new(self.zerodha.bind(&token.access_token)),
            BrokerKind::Mock => Box::new(MockBroker::with_credential(self.mock.clone(), token)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_adapter_matches_kind() {
        let adapters =
            BrokerAdapters::new(ZerodhaConfig::default(), MockBrokerConfig::instant()).unwrap();
        let token = TokenData {
            user_id: "u1".to_string(),
            broker: "mock".to_string(),
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at: Utc::now(),
        };
        for kind in BrokerKind::ALL {
            let adapter = adapters.adapter(kind, &token);
            assert_eq!(adapter.kind(), kind);
            assert_eq!(adapter.capabilities(), kind.capabilities());
        }
    }
}
