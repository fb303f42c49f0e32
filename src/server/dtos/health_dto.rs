use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    // redis is optional, so "not there" isn't a failure
    Disabled,
}

#[derive(Debug, Serialize)]
pub struct RedisHealth {
    pub status: HealthStatus,
    pub response_time_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct CatalogHealth {
    pub status: HealthStatus,
    pub channels: usize,
}

#[derive(Debug, Serialize)]
pub struct TokenCacheHealth {
    pub entries: usize,
    pub ttl_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealthDetails {
    pub catalog: CatalogHealth,
    pub redis: RedisHealth,
    pub token_cache: TokenCacheHealth,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub version: String,
    pub environment: String,
    pub services: ServiceHealthDetails,
}
