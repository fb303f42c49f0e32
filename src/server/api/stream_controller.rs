use axum::{
    Extension, Json, Router,
    extract::Query,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{debug, error, info};

use crate::{
    database::{channel::ChannelDescriptor, token::CachedToken},
    server::{
        dtos::stream_dto::{
            ChannelListResponse, ChannelStatsResponse, StreamQuery, StreamUrlResponse,
        },
        error::{AppResult, Error},
        extractors::ClientIdentity,
        services::{AppServices, catalog_services::ChannelFilter},
    },
};

// these can't follow a redirect that carries the token, they get the url as text instead
const TEXT_URL_AGENTS: [&str; 2] = ["vlc", "mplayer"];

pub struct StreamController;

impl StreamController {
    pub fn app() -> Router {
        Router::new()
            .route("/stream", get(Self::stream_redirect))
            .route("/get-stream-url", get(Self::stream_url_json))
            .route("/channels", get(Self::list_channels))
            .route("/channels/stats", get(Self::channel_stats))
    }

    /// 302 to the real upstream url with the token appended
    async fn stream_redirect(
        Extension(services): Extension<AppServices>,
        identity: ClientIdentity,
        Query(query): Query<StreamQuery>,
    ) -> AppResult<Response> {
        let (channel, token) = Self::authorize(&services, &identity, query.id.as_deref()).await?;
        let stream_url = Self::authorized_url(&channel.url, &token.value);

        info!("Handing out stream for channel {} to {}", channel.id, identity);

        let wants_text = query.format.as_deref() == Some("url") || {
            let agent = identity.user_agent().to_lowercase();
            TEXT_URL_AGENTS.iter().any(|a| agent.contains(a))
        };

        if wants_text {
            return Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                stream_url,
            )
                .into_response());
        }

        let location = HeaderValue::from_str(&stream_url).map_err(|_| {
            Error::InternalServerErrorWithContext("Channel url is not a valid header".to_string())
        })?;

        Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
    }

    /// same lookup as the redirect, but as json for the listing page
    async fn stream_url_json(
        Extension(services): Extension<AppServices>,
        identity: ClientIdentity,
        Query(query): Query<StreamQuery>,
    ) -> Response {
        match Self::authorize(&services, &identity, query.id.as_deref()).await {
            Ok((channel, token)) => Json(StreamUrlResponse {
                success: true,
                channel: Some((&channel).into()),
                stream_url: Some(Self::authorized_url(&channel.url, &token.value)),
                base_url: Some(channel.url.clone()),
                expires_in: Some(token.expires_in().as_secs()),
                error: None,
            })
            .into_response(),
            Err(e) => (e.status_code(), Json(StreamUrlResponse::failure(e.to_string())))
                .into_response(),
        }
    }

    async fn list_channels(
        Extension(services): Extension<AppServices>,
        Query(filter): Query<ChannelFilter>,
    ) -> Json<ChannelListResponse> {
        let channels: Vec<ChannelDescriptor> = services
            .catalog
            .search(&filter)
            .into_iter()
            .cloned()
            .collect();

        Json(ChannelListResponse {
            total: channels.len(),
            channels,
        })
    }

    async fn channel_stats(Extension(services): Extension<AppServices>) -> Json<ChannelStatsResponse> {
        let catalog = &services.catalog;

        Json(ChannelStatsResponse {
            total: catalog.len(),
            genres: catalog.genres(),
            languages: catalog.languages(),
            countries: catalog.countries(),
        })
    }

    // catalog first, so an unknown channel never costs a token
    async fn authorize(
        services: &AppServices,
        identity: &ClientIdentity,
        id: Option<&str>,
    ) -> AppResult<(ChannelDescriptor, CachedToken)> {
        let id = id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::ClientInput("Channel id not found in query parameter".to_string()))?;

        let channel = services.catalog.lookup(id).cloned().ok_or_else(|| {
            debug!("Channel not found: {}", id);
            Error::IdentifierNotFound("Channel".to_string())
        })?;

        let token = services.tokens.get(identity).await.map_err(|e| {
            error!("No token for channel {} (client {}): {}", channel.id, identity, e.reason);
            Error::TokenUnavailable
        })?;

        Ok((channel, token))
    }

    pub fn authorized_url(channel_url: &str, token: &str) -> String {
        let separator = if channel_url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", channel_url, separator, token)
    }
}
