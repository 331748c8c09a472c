use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasourceError {
    /// The request never produced an HTTP response (DNS, connect, timeout, ...).
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("bosun returned HTTP {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("could not decode bosun response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl DatasourceError {
    /// Status reported to the host when a call fails.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DatasourceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DatasourceError::Transport { .. }
            | DatasourceError::UnexpectedStatus { .. }
            | DatasourceError::Decode(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

pub type Result<T> = std::result::Result<T, DatasourceError>;
