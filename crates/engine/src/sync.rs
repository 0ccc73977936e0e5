use brokersync_core::*;
use brokersync_data::{normalize_trades, TokenKey, TokenStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::factory::{AdapterFactory, BrokerAdapters};
use crate::locks::KeyedLocks;

/// Expiry view of a stored credential, without the secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
    pub user_id: String,
    pub broker: String,
    pub is_expired: bool,
    pub expires_at: DateTime<Utc>,
}

/// Syncs trades for a (user, broker) pair, refreshing an expired credential
/// first when the broker allows it.
///
/// Each call reads the stored credential, builds an adapter for it, checks
/// expiry, optionally refreshes and persists the new credential, then fetches
/// and normalizes. The credential check and refresh run under a per-key lock,
/// so concurrent syncs for the same pair refresh at most once.
pub struct SyncOrchestrator<F: AdapterFactory = BrokerAdapters> {
    store: Arc<TokenStore>,
    factory: F,
    locks: KeyedLocks,
}

impl<F: AdapterFactory> SyncOrchestrator<F> {
    pub fn with_factory(store: Arc<TokenStore>, factory: F) -> Self {
        Self {
            store,
            factory,
            locks: KeyedLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Fetch and normalize every trade for `user_id` at `broker_name`.
    pub async fn sync_trades(&self, user_id: &str, broker_name: &str) -> Result<Vec<Trade>, SyncError> {
        let kind: BrokerKind = broker_name.parse()?;
        let adapter = self.ready_adapter(user_id, kind).await?;

        let raw_trades = adapter.fetch_trades().await?;
        let trades = normalize_trades(&raw_trades, kind.tag())?;
        info!(user_id = %user_id, broker = %kind, count = trades.len(), "Synced trades");
        Ok(trades)
    }

    /// An adapter bound to a credential that is usable right now.
    async fn ready_adapter(
        &self,
        user_id: &str,
        kind: BrokerKind,
    ) -> Result<Box<dyn BrokerAdapter>, SyncError> {
        let broker = kind.tag();
        let _guard = self.locks.lock(TokenKey::new(user_id, broker)).await;

        let token = self
            .store
            .get_token(user_id, broker)
            .await
            .ok_or_else(|| SyncError::NotAuthenticated {
                user_id: user_id.to_string(),
                broker: broker.to_string(),
            })?;

        let adapter = self.factory.adapter(kind, &token);
        let capabilities = adapter.capabilities();

        let expired = match capabilities.expiry {
            ExpiryCheck::Never => false,
            ExpiryCheck::AtExpiresAt => adapter.is_token_expired(token.expires_at),
        };
        if !expired {
            return Ok(adapter);
        }

        info!(user_id = %user_id, broker = %kind, expires_at = %token.expires_at, "Token expired, attempting refresh");

        match capabilities.refresh {
            RefreshSupport::ReloginRequired => {
                warn!(user_id = %user_id, broker = %kind, "Broker cannot refresh tokens, re-login required");
                Err(SyncError::RefreshUnsupported {
                    broker: broker.to_string(),
                })
            }
            RefreshSupport::Refreshable => {
                let session = adapter.refresh_session().await.map_err(|e| {
                    error!(user_id = %user_id, broker = %kind, error = %e, "Token refresh failed");
                    SyncError::RefreshFailed {
                        reason: e.to_string(),
                    }
                })?;

                let refreshed = session.refreshed(&token);
                info!(user_id = %refreshed.user_id, broker = %kind, expires_at = %refreshed.expires_at, "Token refreshed");
                self.store.set_token(refreshed.clone()).await;

                Ok(self.factory.adapter(kind, &refreshed))
            }
        }
    }

    /// Expiry status of the stored credential, if any.
    pub async fn token_status(
        &self,
        user_id: &str,
        broker_name: &str,
    ) -> Result<Option<TokenStatus>, SyncError> {
        let kind: BrokerKind = broker_name.parse()?;
        Ok(self
            .store
            .get_token(user_id, kind.tag())
            .await
            .map(|token| TokenStatus {
                is_expired: expiry::is_expired(token.expires_at),
                user_id: token.user_id,
                broker: token.broker,
                expires_at: token.expires_at,
            }))
    }
}

impl SyncOrchestrator<BrokerAdapters> {
    pub fn new(store: Arc<TokenStore>, adapters: BrokerAdapters) -> Self {
        Self::with_factory(store, adapters)
    }

    /// Kite login page URL.
    pub fn login_url(&self) -> String {
        self.factory.zerodha().login_url()
    }

    /// Exchange a Kite request token and store the resulting credential.
    ///
    /// Kite never issues a usable refresh token, so none is stored.
    pub async fn complete_zerodha_login(&self, request_token: &str) -> Result<TokenData, SyncError> {
        let session = self
            .factory
            .zerodha()
            .generate_session(request_token)
            .await
            .map_err(|e| {
                warn!(error = %e, "Kite session exchange failed");
                SyncError::Login(e)
            })?;

        let token = TokenData {
            refresh_token: None,
            ..session.into_token_data(BrokerKind::ZerodhaReal, Utc::now())
        };
        self.store.set_token(token.clone()).await;
        info!(user_id = %token.user_id, broker = %token.broker, "Zerodha login complete");
        Ok(token)
    }

    /// Issue and store a fresh mock session for `user_id`.
    pub async fn mock_login(&self, user_id: &str) -> TokenData {
        let session = self.factory.mock().login(user_id);
        let token = session.into_token_data(BrokerKind::Mock, Utc::now());
        self.store.set_token(token.clone()).await;
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use brokersync_brokers_common::{MockBroker, MockBrokerConfig};
    use brokersync_brokers_zerodha::ZerodhaConfig;
    use brokersync_data::normalize_kite_trade;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn adapters(mock: MockBrokerConfig) -> BrokerAdapters {
        BrokerAdapters::new(ZerodhaConfig::default(), mock).unwrap()
    }

    fn orchestrator() -> SyncOrchestrator {
        SyncOrchestrator::new(Arc::new(TokenStore::new()), adapters(MockBrokerConfig::instant()))
    }

    fn token(user_id: &str, broker: &str, expires_in: Duration) -> TokenData {
        TokenData {
            user_id: user_id.to_string(),
            broker: broker.to_string(),
            access_token: "stale_access".to_string(),
            refresh_token: Some("stale_refresh".to_string()),
            expires_at: Utc::now() + expires_in,
        }
    }

    fn expected_mock_trades() -> Vec<Trade> {
        MockBroker::fixture_trades()
            .iter()
            .map(|raw| normalize_kite_trade(raw, "mock"))
            .collect()
    }

    /// Wraps every adapter so refresh calls can be counted.
    struct Counting<F> {
        inner: F,
        refreshes: Arc<AtomicUsize>,
    }

    struct CountingAdapter {
        inner: Box<dyn BrokerAdapter>,
        refreshes: Arc<AtomicUsize>,
    }

    impl<F: AdapterFactory> AdapterFactory for Counting<F> {
        fn adapter(&self, kind: BrokerKind, token: &TokenData) -> Box<dyn BrokerAdapter> {
            Box::new(CountingAdapter {
                inner: self.inner.adapter(kind, token),
                refreshes: self.refreshes.clone(),
            })
        }
    }

    #[async_trait]
    impl BrokerAdapter for CountingAdapter {
        fn kind(&self) -> BrokerKind {
            self.inner.kind()
        }

        fn capabilities(&self) -> BrokerCapabilities {
            self.inner.capabilities()
        }

        async fn fetch_trades(&self) -> Result<Vec<RawTrade>, BrokerError> {
            self.inner.fetch_trades().await
        }

        async fn refresh_session(&self) -> Result<BrokerSession, BrokerError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            self.inner.refresh_session().await
        }
    }

    fn counting(mock: MockBrokerConfig) -> (SyncOrchestrator<Counting<BrokerAdapters>>, Arc<AtomicUsize>) {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let factory = Counting {
            inner: adapters(mock),
            refreshes: refreshes.clone(),
        };
        (
            SyncOrchestrator::with_factory(Arc::new(TokenStore::new()), factory),
            refreshes,
        )
    }

    /// A refreshable broker whose refresh is always rejected.
    #[derive(Clone)]
    struct RejectingRefresh;

    #[async_trait]
    impl BrokerAdapter for RejectingRefresh {
        fn kind(&self) -> BrokerKind {
            BrokerKind::Mock
        }

        async fn fetch_trades(&self) -> Result<Vec<RawTrade>, BrokerError> {
            Ok(Vec::new())
        }

        async fn refresh_session(&self) -> Result<BrokerSession, BrokerError> {
            Err(BrokerError::Api {
                status: 400,
                error_type: None,
                message: "refresh token revoked".to_string(),
            })
        }
    }

    /// A broker whose tokens never expire.
    #[derive(Clone)]
    struct NeverExpires;

    #[async_trait]
    impl BrokerAdapter for NeverExpires {
        fn kind(&self) -> BrokerKind {
            BrokerKind::Mock
        }

        fn capabilities(&self) -> BrokerCapabilities {
            BrokerCapabilities {
                expiry: ExpiryCheck::Never,
                refresh: RefreshSupport::ReloginRequired,
            }
        }

        async fn fetch_trades(&self) -> Result<Vec<RawTrade>, BrokerError> {
            Ok(MockBroker::fixture_trades())
        }
    }

    /// Hands out the same adapter regardless of credential.
    struct Fixed<A>(A);

    impl<A: BrokerAdapter + Clone + 'static> AdapterFactory for Fixed<A> {
        fn adapter(&self, _kind: BrokerKind, _token: &TokenData) -> Box<dyn BrokerAdapter> {
            Box::new(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_valid_token_syncs_without_refresh() {
        let (sync, refreshes) = counting(MockBrokerConfig::instant());
        sync.store().set_token(token("alice", "mock", Duration::minutes(5))).await;

        let trades = sync.sync_trades("alice", "mock").await.unwrap();

        assert_eq!(trades, expected_mock_trades());
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
        let stored = sync.store().get_token("alice", "mock").await.unwrap();
        assert_eq!(stored.access_token, "stale_access");
    }

    #[tokio::test]
    async fn test_expired_mock_token_is_refreshed_once() {
        let (sync, refreshes) = counting(MockBrokerConfig::instant());
        sync.store().set_token(token("alice", "mock", -Duration::minutes(1))).await;

        let trades = sync.sync_trades("alice", "mock").await.unwrap();

        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(trades, expected_mock_trades());
        assert_eq!(trades.len(), 3);
        assert_eq!(trades[0].price, dec!(2500.50));

        let stored = sync.store().get_token("alice", "mock").await.unwrap();
        assert_ne!(stored.access_token, "stale_access");
        assert_ne!(stored.refresh_token.as_deref(), Some("stale_refresh"));
        assert!(stored.expires_at > Utc::now());
        assert_eq!(sync.store().len().await, 1);

        // The refreshed token is valid, so the next sync does not refresh again.
        sync.sync_trades("alice", "mock").await.unwrap();
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_syncs_refresh_once() {
        let (sync, refreshes) = counting(MockBrokerConfig {
            fetch_latency_ms: 5,
            refresh_latency_ms: 50,
            ..MockBrokerConfig::instant()
        });
        sync.store().set_token(token("alice", "mock", -Duration::minutes(1))).await;

        let results =
            futures_util::future::join_all((0..4).map(|_| sync.sync_trades("alice", "mock"))).await;

        for result in results {
            assert_eq!(result.unwrap().len(), 3);
        }
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_token_is_not_authenticated() {
        let sync = orchestrator();

        let err = sync.sync_trades("nobody", "mock").await.unwrap_err();

        assert!(matches!(err, SyncError::NotAuthenticated { .. }));
        assert_eq!(err.status_code(), 401);
        assert!(err.to_string().contains("Please login first"));
        assert!(sync.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_zerodha_token_requires_relogin() {
        let (sync, refreshes) = counting(MockBrokerConfig::instant());
        let stale = token("AB1234", "zerodha-real", -Duration::minutes(1));
        sync.store().set_token(stale.clone()).await;

        let err = sync.sync_trades("AB1234", "zerodha-real").await.unwrap_err();

        match &err {
            SyncError::RefreshUnsupported { broker } => assert_eq!(broker, "zerodha-real"),
            other => panic!("Expected refresh unsupported, got {:?}", other),
        }
        assert_eq!(err.status_code(), 401);
        assert!(err.to_string().contains("re-login"));
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(sync.store().get_token("AB1234", "zerodha-real").await, Some(stale));
    }

    #[tokio::test]
    async fn test_broker_alias_uses_canonical_key() {
        let sync = orchestrator();
        sync.store()
            .set_token(token("AB1234", "zerodha-real", -Duration::minutes(1)))
            .await;

        let err = sync.sync_trades("AB1234", "Zerodha").await.unwrap_err();
        assert!(matches!(err, SyncError::RefreshUnsupported { .. }));
    }

    #[tokio::test]
    async fn test_unknown_broker_is_bad_request() {
        let sync = orchestrator();
        let err = sync.sync_trades("alice", "robinhood").await.unwrap_err();
        assert!(matches!(err, SyncError::UnsupportedBroker(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_terminal() {
        let sync = SyncOrchestrator::with_factory(Arc::new(TokenStore::new()), Fixed(RejectingRefresh));
        let stale = token("alice", "mock", -Duration::minutes(1));
        sync.store().set_token(stale.clone()).await;

        let err = sync.sync_trades("alice", "mock").await.unwrap_err();

        match &err {
            SyncError::RefreshFailed { reason } => assert!(reason.contains("refresh token revoked")),
            other => panic!("Expected refresh failed, got {:?}", other),
        }
        assert_eq!(err.status_code(), 401);
        assert_eq!(sync.store().get_token("alice", "mock").await, Some(stale));
    }

    #[tokio::test]
    async fn test_never_expiring_broker_skips_expiry_check() {
        let sync = SyncOrchestrator::with_factory(Arc::new(TokenStore::new()), Fixed(NeverExpires));
        sync.store().set_token(token("alice", "mock", -Duration::days(30))).await;

        let trades = sync.sync_trades("alice", "mock").await.unwrap();
        assert_eq!(trades.len(), 3);
    }

    #[tokio::test]
    async fn test_refresh_carries_forward_missing_fields() {
        #[derive(Clone)]
        struct PartialRefresh;

        #[async_trait]
        impl BrokerAdapter for PartialRefresh {
            fn kind(&self) -> BrokerKind {
                BrokerKind::Mock
            }

            async fn fetch_trades(&self) -> Result<Vec<RawTrade>, BrokerError> {
                Ok(Vec::new())
            }

            async fn refresh_session(&self) -> Result<BrokerSession, BrokerError> {
                Ok(BrokerSession {
                    access_token: "partial_access".to_string(),
                    refresh_token: None,
                    user_id: "alice".to_string(),
                    expires_at: None,
                })
            }
        }

        let sync = SyncOrchestrator::with_factory(Arc::new(TokenStore::new()), Fixed(PartialRefresh));
        let stale = token("alice", "mock", -Duration::minutes(1));
        sync.store().set_token(stale.clone()).await;

        sync.sync_trades("alice", "mock").await.unwrap();

        let stored = sync.store().get_token("alice", "mock").await.unwrap();
        assert_eq!(stored.access_token, "partial_access");
        assert_eq!(stored.refresh_token.as_deref(), Some("stale_refresh"));
        assert_eq!(stored.expires_at, stale.expires_at);
    }

    #[tokio::test]
    async fn test_mock_login_then_status() {
        let sync = orchestrator();
        let token = sync.mock_login("bob").await;
        assert_eq!(token.broker, "mock");
        assert!(token.access_token.starts_with("mock_token_"));

        let status = sync.token_status("bob", "mock").await.unwrap().unwrap();
        assert_eq!(status.user_id, "bob");
        assert!(!status.is_expired);
        assert_eq!(status.expires_at, token.expires_at);

        assert_eq!(sync.token_status("carol", "mock").await.unwrap(), None);
        assert!(sync.token_status("bob", "robinhood").await.is_err());

        assert_eq!(sync.sync_trades("bob", "mock").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_zerodha_login_requires_configuration() {
        let sync = orchestrator();
        assert!(sync.login_url().starts_with("https://kite.zerodha.com/connect/login?v=3"));

        let err = sync.complete_zerodha_login("request").await.unwrap_err();
        assert!(matches!(err, SyncError::Login(BrokerError::InvalidRequest(_))));
        assert_eq!(err.status_code(), 400);
        assert!(sync.store().is_empty().await);
    }

    mod kite {
        use axum::extract::Form;
        use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
        use axum::{Json, Router};
        use serde_json::{json, Value};
        use std::collections::HashMap;

        pub const API_KEY: &str = "kite_key";

        async fn session_token(Form(form): Form<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
            if form.get("request_token").map(String::as_str) == Some("good_request") {
                (
                    StatusCode::OK,
                    Json(json!({
                        "status": "success",
                        "data": { "user_id": "AB1234", "access_token": "live_token", "refresh_token": "unused" }
                    })),
                )
            } else {
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({ "status": "error", "message": "Token is invalid or has expired.", "error_type": "TokenException" })),
                )
            }
        }

        async fn trades(headers: HeaderMap) -> (StatusCode, Json<Value>) {
            let auth = headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if auth == format!("token {}:live_token", API_KEY) {
                (
                    StatusCode::OK,
                    Json(json!({
                        "status": "success",
                        "data": [
                            { "trade_id": "1001", "tradingsymbol": "SBIN", "transaction_type": "BUY", "quantity": 1, "average_price": 800.1, "order_timestamp": "2025-01-10 09:15:00" },
                            { "trade_id": "1002", "tradingsymbol": "SBIN", "transaction_type": "SELL", "quantity": 1, "average_price": 805, "order_timestamp": "2025-01-10 15:00:00" }
                        ]
                    })),
                )
            } else {
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({ "status": "error", "message": "Incorrect `api_key` or `access_token`.", "error_type": "TokenException" })),
                )
            }
        }

        /// Serves a minimal Kite API on a random local port and returns its root.
        pub async fn serve() -> String {
            let app = Router::new()
                .route("/session/token", axum::routing::post(session_token))
                .route("/trades", axum::routing::get(trades));
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{}", addr)
        }
    }

    async fn kite_orchestrator() -> SyncOrchestrator {
        let zerodha = ZerodhaConfig {
            api_key: kite::API_KEY.to_string(),
            api_secret: "kite_secret".to_string(),
            api_root: kite::serve().await,
            timeout_secs: 5,
            ..Default::default()
        };
        let adapters = BrokerAdapters::new(zerodha, MockBrokerConfig::instant()).unwrap();
        SyncOrchestrator::new(Arc::new(TokenStore::new()), adapters)
    }

    #[tokio::test]
    async fn test_zerodha_login_stores_session() {
        let sync = kite_orchestrator().await;

        let token = sync.complete_zerodha_login("good_request").await.unwrap();

        assert_eq!(token.user_id, "AB1234");
        assert_eq!(token.broker, "zerodha-real");
        assert_eq!(token.access_token, "live_token");
        assert_eq!(token.refresh_token, None);
        assert!(token.expires_at > Utc::now());
        assert_eq!(sync.store().get_token("AB1234", "zerodha-real").await, Some(token));
        assert_eq!(sync.store().len().await, 1);
    }

    #[tokio::test]
    async fn test_zerodha_login_rejected_by_kite() {
        let sync = kite_orchestrator().await;

        let err = sync.complete_zerodha_login("stale_request").await.unwrap_err();

        assert!(matches!(err, SyncError::Login(BrokerError::Api { status: 403, .. })));
        assert_eq!(err.status_code(), 400);
        assert!(sync.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_zerodha_sync_normalizes_kite_trades() {
        let sync = kite_orchestrator().await;
        sync.complete_zerodha_login("good_request").await.unwrap();

        let trades = sync.sync_trades("AB1234", "zerodha-real").await.unwrap();

        assert_eq!(trades.len(), 2);
        assert!(trades.iter().all(|t| t.broker == "zerodha-real"));
        assert_eq!(trades[0].id, "1001");
        assert_eq!(trades[0].side, Side::Buy);
        assert_eq!(trades[0].price, dec!(800.1));
        // Naive Kite timestamps are IST.
        assert_eq!(trades[0].timestamp.to_rfc3339(), "2025-01-10T03:45:00+00:00");
        assert_eq!(trades[1].id, "1002");
        assert_eq!(trades[1].side, Side::Sell);
        assert_eq!(trades[1].price, dec!(805));
    }

    #[tokio::test]
    async fn test_zerodha_rejected_credential_is_unauthorized() {
        let sync = kite_orchestrator().await;
        let revoked = TokenData {
            access_token: "revoked_token".to_string(),
            refresh_token: None,
            ..token("AB1234", "zerodha-real", Duration::hours(1))
        };
        sync.store().set_token(revoked.clone()).await;

        let err = sync.sync_trades("AB1234", "zerodha-real").await.unwrap_err();

        match &err {
            SyncError::Fetch(BrokerError::Api { status, error_type, .. }) => {
                assert_eq!(*status, 403);
                assert_eq!(error_type.as_deref(), Some("TokenException"));
            }
            other => panic!("Expected fetch error, got {:?}", other),
        }
        assert_eq!(err.status_code(), 401);
        assert_eq!(sync.store().get_token("AB1234", "zerodha-real").await, Some(revoked));
    }

    #[tokio::test]
    async fn test_fetch_failure_after_refresh_keeps_new_token() {
        #[derive(Clone)]
        struct RefreshThenReject;

        #[async_trait]
        impl BrokerAdapter for RefreshThenReject {
            fn kind(&self) -> BrokerKind {
                BrokerKind::Mock
            }

            async fn fetch_trades(&self) -> Result<Vec<RawTrade>, BrokerError> {
                Err(BrokerError::Api {
                    status: 403,
                    error_type: None,
                    message: "session revoked".to_string(),
                })
            }

            async fn refresh_session(&self) -> Result<BrokerSession, BrokerError> {
                Ok(BrokerSession {
                    access_token: "fresh_access".to_string(),
                    refresh_token: Some("fresh_refresh".to_string()),
                    user_id: "alice".to_string(),
                    expires_at: Some(Utc::now() + Duration::days(1)),
                })
            }
        }

        let sync = SyncOrchestrator::with_factory(Arc::new(TokenStore::new()), Fixed(RefreshThenReject));
        sync.store().set_token(token("alice", "mock", -Duration::minutes(1))).await;

        let err = sync.sync_trades("alice", "mock").await.unwrap_err();

        assert!(matches!(err, SyncError::Fetch(BrokerError::Api { status: 403, .. })));
        assert_eq!(err.status_code(), 401);
        let stored = sync.store().get_token("alice", "mock").await.unwrap();
        assert_eq!(stored.access_token, "fresh_access");
        assert_eq!(stored.refresh_token.as_deref(), Some("fresh_refresh"));
        assert!(!expiry::is_expired(stored.expires_at));
    }
}
