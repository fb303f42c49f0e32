use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, Error>;

/// everything a handler can fail with, mapped onto a status and a short message
///
/// messages here end up in the response body, so they never carry upstream
/// internals or token values.
#[derive(Error, Debug)]
pub enum Error {
    /// missing or malformed locator/identifier, nothing upstream was touched
    #[error("{0}")]
    ClientInput(String),

    #[error("{0} not found")]
    IdentifierNotFound(String),

    /// non-2xx from the cdn, or it never answered (status is None then)
    #[error("Failed to fetch content from upstream")]
    UpstreamFetch { status: Option<u16> },

    #[error("Unable to obtain an authorization token")]
    TokenUnavailable,

    #[error("{0}")]
    InternalServerErrorWithContext(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ClientInput(_) => StatusCode::BAD_REQUEST,
            Self::IdentifierNotFound(_) => StatusCode::NOT_FOUND,
            // surface whatever the cdn said, falling back to a gateway error when it said nothing
            // usable
            Self::UpstreamFetch { status } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::TokenUnavailable | Self::InternalServerErrorWithContext(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!("Responding with {}: {}", status, self);
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}
