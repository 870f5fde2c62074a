use common::data::ErrorEnvelope;
use common::error::Error as UpstreamError;
use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("Invalid messages format")]
    InvalidMessages,

    #[error("Invalid max_context_docs")]
    InvalidContextDocs,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("failed to build client")]
    FailedToBuildClient,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::MalformedBody(_) | Error::InvalidMessages | Error::InvalidContextDocs => {
                StatusCode::BAD_REQUEST
            }
            Error::Upstream(_) | Error::FailedToBuildClient => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The JSON body sent to the caller. Transport failures stay generic;
    /// upstream rejections keep their status and body in `details`.
    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            Error::MalformedBody(e) => ErrorEnvelope::with_details("Malformed request body", e.to_string()),
            Error::InvalidMessages | Error::InvalidContextDocs => ErrorEnvelope::new(self.to_string()),
            Error::Upstream(e @ UpstreamError::Configuration(_)) => ErrorEnvelope::new(e.to_string()),
            Error::Upstream(UpstreamError::Transport(_) | UpstreamError::Io(_)) => {
                ErrorEnvelope::with_details("Internal Server Error", "upstream connection failed")
            }
            Error::Upstream(e) => ErrorEnvelope::with_details("Internal Server Error", e.to_string()),
            Error::FailedToBuildClient => ErrorEnvelope::new("Internal Server Error"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
