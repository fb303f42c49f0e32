use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::{
    config::AppConfig,
    database::{
        RedisDatabase,
        token::{DynTokenRepository, RedisTokenRepository},
    },
    server::services::{
        catalog_services::Catalog,
        manifest_services::ManifestRewriter,
        token_cache_services::TokenCache,
        token_issuer_services::{DynTokenIssuer, HttpTokenIssuer},
        upstream_services::UpstreamFetcher,
    },
};

/// everything a handler can reach, cloned into each request through an Extension
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<Catalog>,
    pub tokens: TokenCache,
    pub upstream: Arc<UpstreamFetcher>,
    pub rewriter: Arc<ManifestRewriter>,
    // only there when a redis url was configured and reachable
    pub redis: Option<Arc<RedisDatabase>>,
    pub config: Arc<AppConfig>,
}

impl AppServices {
    pub fn new(
        config: Arc<AppConfig>,
        catalog: Catalog,
        redis_db: Option<RedisDatabase>,
    ) -> anyhow::Result<Self> {
        info!("starting relay services...");

        let issuer = Arc::new(HttpTokenIssuer::new(&config)?) as DynTokenIssuer;
        let redis = redis_db.map(Arc::new);

        let repository = redis
            .clone()
            .map(|r| Arc::new(RedisTokenRepository::new(r)) as DynTokenRepository);

        if repository.is_none() {
            info!("no redis, tokens will only live in memory");
        }

        Self::from_parts(config, catalog, issuer, repository, redis)
    }

    /// same as `new` but with the collaborators handed in, tests swap the issuer here
    pub fn from_parts(
        config: Arc<AppConfig>,
        catalog: Catalog,
        issuer: DynTokenIssuer,
        repository: Option<DynTokenRepository>,
        redis: Option<Arc<RedisDatabase>>,
    ) -> anyhow::Result<Self> {
        let upstream = Arc::new(UpstreamFetcher::new(&config)?);
        let rewriter = Arc::new(ManifestRewriter::new(config.proxy_base()));
        let tokens = TokenCache::new(
            issuer,
            repository,
            Duration::from_secs(config.token_ttl_seconds),
        );

        info!(
            "services ok, {} channels, token ttl {}s, proxy base {}",
            catalog.len(),
            config.token_ttl_seconds,
            rewriter.proxy_base()
        );

        Ok(Self {
            catalog: Arc::new(catalog),
            tokens,
            upstream,
            rewriter,
            redis,
            config,
        })
    }
}
