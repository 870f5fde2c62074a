use faststr::FastStr;
use serde::{Deserialize, Serialize};

/// JSON error body shared by the relay and the RAG backend. Backends use both
/// `detail` and `details`, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error:   FastStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail:  Option<FastStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<FastStr>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<FastStr>) -> Self {
        Self {
            error:   error.into(),
            detail:  None,
            details: None,
        }
    }

    pub fn with_details(error: impl Into<FastStr>, details: impl Into<FastStr>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::new(error)
        }
    }

    pub fn detail_text(&self) -> Option<&str> {
        self.details.as_deref().or(self.detail.as_deref())
    }
}
