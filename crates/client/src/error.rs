use common::data::ErrorEnvelope;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("a reply is still in progress")]
    Busy,
    #[error("message is empty")]
    EmptyMessage,
    #[error("relay answered {status}")]
    Relay {
        status:   u16,
        envelope: Option<ErrorEnvelope>,
    },
    #[error("relay connection failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("relay stream broke: {0}")]
    Stream(#[from] common::error::Error),
    #[error("transcript storage failed: {0}")]
    Storage(#[from] storage::error::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Text shown under the apology, when the relay said something useful.
    pub fn apology_detail(&self) -> Option<String> {
        match self {
            Error::Relay {
                envelope: Some(envelope),
                ..
            } => Some(match envelope.detail_text() {
                Some(detail) => format!("{}: {detail}", envelope.error),
                None => envelope.error.to_string(),
            }),
            Error::Relay { status, .. } => Some(format!("HTTP {status}")),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
