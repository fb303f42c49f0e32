use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;

/// an upstream authorization token plus the window it's trusted for
///
/// `issued_at` is a tokio instant so paused-clock tests can walk it past the ttl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub issued_at: Instant,
    pub ttl: Duration,
}

impl CachedToken {
    pub fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            issued_at: Instant::now(),
            ttl,
        }
    }

    /// rebuild a token that was issued elsewhere and only has `remaining` of `ttl` left
    pub fn with_remaining(value: String, ttl: Duration, remaining: Duration) -> Self {
        let age = ttl.saturating_sub(remaining);
        let now = Instant::now();

        Self {
            value,
            issued_at: now.checked_sub(age).unwrap_or(now),
            ttl,
        }
    }

    /// valid iff `now - issued_at < ttl`
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.issued_at) < self.ttl
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Instant::now())
    }

    pub fn expires_in(&self) -> Duration {
        self.ttl
            .saturating_sub(Instant::now().saturating_duration_since(self.issued_at))
    }
}

pub type DynTokenRepository = Arc<dyn TokenRepository + Send + Sync>;

/// durable mirror of the in-memory token cache, everything here is best effort
#[async_trait::async_trait]
pub trait TokenRepository {
    /// returns the token and how long it has left, if any
    async fn load_token(&self, identity: &str) -> Result<Option<(String, Duration)>>;

    async fn store_token(&self, identity: &str, token: &str, ttl: Duration) -> Result<()>;
}
