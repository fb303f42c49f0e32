use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
#[cfg(test)]
use mockall::automock;
use regex::Regex;
use reqwest::header;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{config::AppConfig, server::extractors::ClientIdentity};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssueError {
    #[error("token source returned {0}")]
    Status(u16),
    #[error("token source unreachable: {0}")]
    Transport(String),
    #[error("token source response carried no token")]
    NoToken,
}

pub type DynTokenIssuer = Arc<dyn TokenIssuer + Send + Sync>;

/// hands out upstream authorization tokens, slow and rate limited so it sits behind the cache
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait TokenIssuer {
    async fn issue(&self, identity: &ClientIdentity) -> Result<String, IssueError>;
}

/// asks a token source page with the client's own user agent and scrapes the token out
pub struct HttpTokenIssuer {
    http: reqwest::Client,
    source_url: String,
    pattern: Regex,
}

impl HttpTokenIssuer {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let pattern = Regex::new(&config.token_pattern).context("Invalid token pattern")?;

        // redirects are left alone, some sources only put the token in the first hop
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build token source http client")?;

        Ok(Self {
            http,
            source_url: config.token_source_url.clone(),
            pattern,
        })
    }

    fn extract(&self, body: &str) -> Option<String> {
        self.pattern.find(body).map(|m| m.as_str().to_string())
    }
}

#[async_trait::async_trait]
impl TokenIssuer for HttpTokenIssuer {
    async fn issue(&self, identity: &ClientIdentity) -> Result<String, IssueError> {
        debug!("Requesting token for {}", identity);

        let response = self
            .http
            .get(&self.source_url)
            .header(header::USER_AGENT, identity.user_agent())
            .header(header::ACCEPT, "*/*")
            .send()
            .await
            .map_err(|e| IssueError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() && !status.is_redirection() {
            warn!("Token source answered {} for {}", status, identity);
            return Err(IssueError::Status(status.as_u16()));
        }

        // a Location header can carry the token as well as the body
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| IssueError::Transport(e.to_string()))?;

        self.extract(&body)
            .or_else(|| location.as_deref().and_then(|l| self.extract(l)))
            .ok_or(IssueError::NoToken)
    }
}
