use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use redis::AsyncCommands;
use tracing::debug;

use super::TokenRepository;
use crate::database::RedisDatabase;

pub struct RedisTokenRepository {
    redis: Arc<RedisDatabase>,
}

impl RedisTokenRepository {
    pub fn new(redis: Arc<RedisDatabase>) -> Self {
        Self { redis }
    }

    fn token_key(identity: &str) -> String {
        format!("token_cache:{}", identity)
    }
}

#[async_trait::async_trait]
impl TokenRepository for RedisTokenRepository {
    async fn load_token(&self, identity: &str) -> Result<Option<(String, Duration)>> {
        let key = Self::token_key(identity);
        let mut conn = self.redis.connection.clone();

        // value and ttl in one round trip
        let (token, ttl): (Option<String>, i64) = redis::pipe()
            .get(&key)
            .ttl(&key)
            .query_async(&mut conn)
            .await
            .context("Failed to load token from redis")?;

        // -2 is a missing key, -1 a key without expiry which we never write
        match token {
            Some(token) if ttl > 0 => {
                debug!("Loaded mirrored token for {} ({}s left)", identity, ttl);
                Ok(Some((token, Duration::from_secs(ttl as u64))))
            }
            _ => Ok(None),
        }
    }

    async fn store_token(&self, identity: &str, token: &str, ttl: Duration) -> Result<()> {
        let key = Self::token_key(identity);
        let mut conn = self.redis.connection.clone();

        let _: () = conn
            .set_ex(&key, token, ttl.as_secs().max(1))
            .await
            .context("Failed to store token in redis")?;

        debug!("Mirrored token for {} (TTL {}s)", identity, ttl.as_secs());
        Ok(())
    }
}
