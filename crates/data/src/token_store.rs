use brokersync_core::TokenData;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Composite key for a stored credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenKey {
    pub user_id: String,
    pub broker: String,
}

impl TokenKey {
    pub fn new(user_id: &str, broker: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            broker: broker.to_string(),
        }
    }
}

/// In-memory credential store keyed by (user, broker).
///
/// Holds at most one [`TokenData`] per key. Every operation touches a single
/// key and is atomic with respect to it. Expiry is not enforced here; callers
/// decide what an expired record means.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: RwLock<HashMap<TokenKey, TokenData>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or wholesale-replace the record for `(data.user_id, data.broker)`.
    pub async fn set_token(&self, data: TokenData) {
        let key = TokenKey::new(&data.user_id, &data.broker);
        debug!(user_id = %key.user_id, broker = %key.broker, "Storing token");
        self.tokens.write().await.insert(key, data);
    }

    pub async fn get_token(&self, user_id: &str, broker: &str) -> Option<TokenData> {
        self.tokens
            .read()
            .await
            .get(&TokenKey::new(user_id, broker))
            .cloned()
    }

    /// Remove the record, returning whether one was present.
    pub async fn delete_token(&self, user_id: &str, broker: &str) -> bool {
        let removed = self
            .tokens
            .write()
            .await
            .remove(&TokenKey::new(user_id, broker))
            .is_some();
        if removed {
            debug!(user_id = %user_id, broker = %broker, "Deleted token");
        }
        removed
    }

    pub async fn has_token(&self, user_id: &str, broker: &str) -> bool {
        self.tokens
            .read()
            .await
            .contains_key(&TokenKey::new(user_id, broker))
    }

    /// Snapshot of every stored record. Diagnostics only.
    pub async fn get_all_tokens(&self) -> Vec<TokenData> {
        self.tokens.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}
