use faststr::FastStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A credential or endpoint the adapter needs was never provided.
    #[error("{0} not configured")]
    Configuration(&'static str),
    #[error("Invalid config value for {0}: {1}")]
    InvalidConfig(&'static str, FastStr),
    #[error("Upstream API error: {status} - {body}")]
    Upstream { status: u16, body: FastStr },
    #[error("Reqwest error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("delta receiver closed")]
    ReceiverClosed,
}

impl Error {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Error::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Sent down the relay body channel when the upstream stream breaks after
/// bytes were already written.
#[derive(Debug, Clone, Error)]
#[error("upstream stream aborted: {0}")]
pub struct StreamAborted(pub FastStr);

pub type Result<T> = std::result::Result<T, Error>;
