use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use metrics::counter;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    database::token::{CachedToken, DynTokenRepository},
    server::{extractors::ClientIdentity, services::token_issuer_services::DynTokenIssuer},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no token available for {identity}: {reason}")]
pub struct TokenUnavailable {
    pub identity: String,
    pub reason: String,
}

type Flight = Shared<BoxFuture<'static, Result<CachedToken, TokenUnavailable>>>;

/// identity -> upstream token, one instance per process
///
/// fresh entries are served under a read lock. a miss starts at most one issuance per
/// identity, every caller that shows up while it runs awaits the same shared future and gets
/// the same token or the same error. failures are never cached.
#[derive(Clone)]
pub struct TokenCache {
    inner: Arc<TokenCacheInner>,
}

struct TokenCacheInner {
    issuer: DynTokenIssuer,
    repository: Option<DynTokenRepository>,
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedToken>>,
    inflight: Mutex<HashMap<String, Flight>>,
}

impl TokenCache {
    pub fn new(
        issuer: DynTokenIssuer,
        repository: Option<DynTokenRepository>,
        ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(TokenCacheInner {
                issuer,
                repository,
                ttl,
                entries: RwLock::new(HashMap::new()),
                inflight: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// entries physically held, expired ones included
    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn get(&self, identity: &ClientIdentity) -> Result<CachedToken, TokenUnavailable> {
        if let Some(token) = self.inner.fresh(identity.key()) {
            counter!("token_cache_hits_total").increment(1);
            return Ok(token);
        }

        let flight = {
            let mut inflight = self
                .inner
                .inflight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            // a flight may have landed between the read above and taking this lock, and a
            // landed flight always writes its entry before it leaves the map
            if let Some(token) = self.inner.fresh(identity.key()) {
                counter!("token_cache_hits_total").increment(1);
                return Ok(token);
            }

            inflight
                .entry(identity.key().to_string())
                .or_insert_with(|| {
                    debug!("Starting token issuance for {}", identity);
                    TokenCacheInner::start_flight(self.inner.clone(), identity.clone())
                })
                .clone()
        };

        flight.await
    }
}

impl TokenCacheInner {
    fn fresh(&self, key: &str) -> Option<CachedToken> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .filter(|token| token.is_valid())
            .cloned()
    }

    // the issuance runs as its own task, a waiter going away mid-flight doesn't park it
    fn start_flight(inner: Arc<Self>, identity: ClientIdentity) -> Flight {
        let short = identity.to_string();

        let task = tokio::spawn(async move {
            let result = inner.refresh(&identity).await;
            let key = identity.key().to_string();

            // entry first, then leave the in-flight map, see TokenCache::get
            if let Ok(token) = &result {
                inner
                    .entries
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key.clone(), token.clone());
            }

            inner
                .inflight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key);

            result
        });

        task.map(move |joined| {
            joined.unwrap_or_else(|e| {
                Err(TokenUnavailable {
                    identity: short,
                    reason: format!("issuance task failed: {}", e),
                })
            })
        })
        .boxed()
        .shared()
    }

    async fn refresh(&self, identity: &ClientIdentity) -> Result<CachedToken, TokenUnavailable> {
        if let Some(token) = self.load_mirrored(identity).await {
            return Ok(token);
        }

        counter!("token_cache_misses_total").increment(1);

        match self.issuer.issue(identity).await {
            Ok(value) => {
                counter!("token_issuance_total", "outcome" => "success").increment(1);
                info!("Issued new token for {}", identity);

                let token = CachedToken::new(value, self.ttl);
                self.mirror(identity, &token);
                Ok(token)
            }
            Err(e) => {
                counter!("token_issuance_total", "outcome" => "failure").increment(1);
                warn!("Token issuance failed for {}: {}", identity, e);

                Err(TokenUnavailable {
                    identity: identity.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    // a token that survived a restart in the mirror keeps only the lifetime it has left
    async fn load_mirrored(&self, identity: &ClientIdentity) -> Option<CachedToken> {
        let repository = self.repository.as_ref()?;

        match repository.load_token(identity.key()).await {
            Ok(Some((value, remaining))) => {
                let token = CachedToken::with_remaining(value, self.ttl, remaining.min(self.ttl));
                if token.is_valid() {
                    debug!("Adopted mirrored token for {}", identity);
                    Some(token)
                } else {
                    None
                }
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Token mirror read failed for {}: {:#}", identity, e);
                None
            }
        }
    }

    // the in-memory entry is what counts, the mirror only saves an issuance after a restart
    fn mirror(&self, identity: &ClientIdentity, token: &CachedToken) {
        let Some(repository) = self.repository.clone() else {
            return;
        };

        let key = identity.key().to_string();
        let short = identity.to_string();
        let value = token.value.clone();
        let ttl = token.ttl;

        tokio::spawn(async move {
            if let Err(e) = repository.store_token(&key, &value, ttl).await {
                warn!("Token mirror write failed for {}: {:#}", short, e);
            }
        });
    }
}
