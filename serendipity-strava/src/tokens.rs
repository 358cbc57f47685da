use chrono::Utc;
use serde::{Deserialize, Serialize};
use serendipity_request::CallContext;

/// Snapshot of a user's credentials. Replaced wholesale on every refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Epoch seconds.
    pub expires_at: i64,
}

impl Tokens {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: i64,
    ) -> Self {
        Tokens {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
        }
    }

    /// A token expiring exactly at `now` is still valid.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at < now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }
}

/// Persists refreshed tokens for a user.
///
/// Failures are logged by the client and never fail the call that triggered the refresh, so
/// the in-memory snapshot can run ahead of the stored one.
#[async_trait::async_trait]
pub trait TokenManager: Send + Sync {
    async fn set_user_tokens(
        &self,
        ctx: &CallContext,
        user_id: &str,
        tokens: &Tokens,
    ) -> anyhow::Result<()>;
}
