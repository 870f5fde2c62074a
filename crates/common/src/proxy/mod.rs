mod gateway;
mod rag;

pub use gateway::{GatewayAdapter, GatewayConfig, LEGAL_SYSTEM_PROMPT};
pub use rag::{RagAdapter, RagConfig};

use crate::{data::LegalChatRequest, error::Result, stream::ByteStream};
use bytes::Bytes;

/// What an upstream hands back to the relay.
pub enum UpstreamReply {
    /// SSE-framed body, still to be demultiplexed.
    Stream(ByteStream),
    /// Fully materialized JSON answer, forwarded byte for byte.
    Document(Bytes),
}

impl std::fmt::Debug for UpstreamReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Document(doc) => write!(f, "Document({} bytes)", doc.len()),
        }
    }
}

/// One outbound POST per call. Implementations must fail with
/// `Error::Configuration` before touching the network when a credential is
/// missing.
pub trait UpstreamAdapter: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn dispatch(
        &self,
        request: &LegalChatRequest,
    ) -> impl Future<Output = Result<UpstreamReply>> + Send;
}

/// The adapter chosen for this process by `RELAY_MODE`.
#[derive(Debug, Clone)]
pub enum Upstream {
    Gateway(GatewayAdapter),
    Rag(RagAdapter),
}

impl UpstreamAdapter for Upstream {
    fn name(&self) -> &'static str {
        match self {
            Upstream::Gateway(a) => a.name(),
            Upstream::Rag(a) => a.name(),
        }
    }

    async fn dispatch(&self, request: &LegalChatRequest) -> Result<UpstreamReply> {
        match self {
            Upstream::Gateway(a) => a.dispatch(request).await,
            Upstream::Rag(a) => a.dispatch(request).await,
        }
    }
}
