use axum::Extension;
use axum::Json;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::error;

use crate::logger::Logger;
use crate::server::dtos::health_dto::{
    CatalogHealth, HealthResponse, HealthStatus, RedisHealth, ServiceHealthDetails,
    TokenCacheHealth,
};
use crate::server::services::AppServices;
use crate::server::{get_app_version, get_uptime_seconds};

/// health endpoint - catalog, redis (if there is one) and the token cache
pub async fn health_endpoint(
    Extension(services): Extension<AppServices>,
) -> (StatusCode, Json<HealthResponse>) {
    let redis_health = check_redis_health(&services).await;

    // an empty catalog can't serve anything
    let catalog_health = CatalogHealth {
        status: if services.catalog.is_empty() {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Healthy
        },
        channels: services.catalog.len(),
    };

    // redis going away only costs the warm start, tokens still work from memory
    let overall_status = if catalog_health.status == HealthStatus::Unhealthy {
        HealthStatus::Unhealthy
    } else if redis_health.status == HealthStatus::Unhealthy {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    let response = HealthResponse {
        status: overall_status,
        timestamp: Utc::now(),
        uptime_seconds: get_uptime_seconds(),
        version: get_app_version().to_string(),
        environment: Logger::environment_name(services.config.cargo_env).to_string(),
        services: ServiceHealthDetails {
            catalog: catalog_health,
            redis: redis_health,
            token_cache: TokenCacheHealth {
                entries: services.tokens.len(),
                ttl_seconds: services.tokens.ttl().as_secs(),
            },
        },
    };

    let http_status = match overall_status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (http_status, Json(response))
}

async fn check_redis_health(services: &AppServices) -> RedisHealth {
    let Some(redis) = &services.redis else {
        return RedisHealth {
            status: HealthStatus::Disabled,
            response_time_ms: 0.0,
        };
    };

    match redis.health_check().await {
        Ok(response_time) => RedisHealth {
            status: HealthStatus::Healthy,
            response_time_ms: response_time,
        },
        Err(e) => {
            error!("Redis health check failed: {}", e);
            RedisHealth {
                status: HealthStatus::Unhealthy,
                response_time_ms: 0.0,
            }
        }
    }
}
