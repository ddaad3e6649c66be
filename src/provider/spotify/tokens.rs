use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dao::{
    session_repository::AUTH_TOKENS_KEY,
    storage::{KeyValueStore, StorageError, StorageResult},
};

/// Access credentials kept under the auth key. A reset never removes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotifyTokens {
    /// Bearer token sent with every request.
    pub access_token: String,
    /// Instant after which the token must not be used.
    pub expires_at: SystemTime,
    /// Token used to obtain a new access token, when the login flow returned one.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl SpotifyTokens {
    /// Token valid for `lifetime` from now.
    pub fn new(access_token: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: SystemTime::now() + lifetime,
            refresh_token: None,
        }
    }

    /// Whether the access token has not expired yet.
    pub fn is_valid(&self) -> bool {
        self.expires_at > SystemTime::now()
    }

    /// Stored tokens, if any were saved and can be parsed.
    pub fn load(store: &dyn KeyValueStore) -> Option<Self> {
        let raw = store.get(AUTH_TOKENS_KEY)?;
        serde_json::from_str(&raw)
            .inspect_err(|err| warn!(error = %err, "ignoring malformed stored credentials"))
            .ok()
    }

    /// Persist the tokens under the auth key.
    pub fn save(&self, store: &dyn KeyValueStore) -> StorageResult<()> {
        let payload = serde_json::to_string(self).map_err(|source| {
            StorageError::unavailable("failed to encode credentials".into(), source)
        })?;
        store.set(AUTH_TOKENS_KEY, payload)
    }
}
