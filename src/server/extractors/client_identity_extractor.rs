use std::fmt;

use axum::Extension;
use axum::extract::FromRequestParts;
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::server::error::Error;
use crate::server::services::app_services::AppServices;

/// who is asking, as far as the token cache cares
///
/// derived only from the declared user agent so the same player always maps onto the same
/// upstream token, the agent itself is kept around because the token source wants to see it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity {
    key: String,
    user_agent: String,
}

impl ClientIdentity {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(user_agent.as_bytes());

        Self {
            key: hex::encode(hasher.finalize()),
            user_agent: user_agent.to_string(),
        }
    }

    /// stable hex digest, used as the cache and mirror key
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

// logs only ever show the short digest
impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key[..self.key.len().min(12)])
    }
}

impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(services): Extension<AppServices> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|err| Error::InternalServerErrorWithContext(err.to_string()))?;

        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
            .unwrap_or(&services.config.default_user_agent);

        let identity = Self::from_user_agent(user_agent);
        debug!("Client identity {} for agent {:?}", identity, user_agent);

        Ok(identity)
    }
}
