//! The relay endpoint's request lifecycle, independent of the HTTP server.
//!
//! ```text
//! Received -> Validating -> Dispatching -> Streaming -> Closed
//!                                      \-> Buffering -> Closed
//! (any non-terminal state) -> Failed
//! ```
//!
//! Streaming replies are pumped by a spawned task into an unbounded channel
//! that backs the response body, one frame per delta. Once the lifecycle
//! reaches `Failed` nothing more is written.

use crate::error::{Error, Result};
use crate::requests::parse_chat_request;
use crate::tools::generate_request_id;
use bytes::Bytes;
use common::error::{Error as UpstreamError, StreamAborted};
use common::proxy::{UpstreamAdapter, UpstreamReply};
use common::stream::ByteStream;
use common::stream::sse::{SseHandler, sse_stream};
use faststr::FastStr;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

pub type DeltaStream = UnboundedReceiverStream<std::result::Result<Bytes, StreamAborted>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Received,
    Validating,
    Dispatching,
    Streaming,
    Buffering,
    Closed,
    Failed,
}

impl RelayState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RelayState::Closed | RelayState::Failed)
    }

    pub fn can_advance(self, next: RelayState) -> bool {
        use RelayState::*;
        match (self, next) {
            (Received, Validating)
            | (Validating, Dispatching)
            | (Dispatching, Streaming)
            | (Dispatching, Buffering)
            | (Streaming, Closed)
            | (Buffering, Closed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Per-request state tracker; every transition is logged.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    request_id: FastStr,
    state:      RelayState,
}

impl Lifecycle {
    pub fn new(request_id: FastStr) -> Self {
        Self {
            request_id,
            state: RelayState::Received,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn advance(&mut self, next: RelayState) -> bool {
        if !self.state.can_advance(next) {
            warn!(request_id = %self.request_id, from = ?self.state, to = ?next, "illegal relay transition");
            return false;
        }
        debug!(request_id = %self.request_id, from = ?self.state, to = ?next, "relay transition");
        self.state = next;
        true
    }

    fn fail(&mut self, err: &Error) {
        warn!(request_id = %self.request_id, status = err.status().as_u16(), "relay failed: {err}");
        self.advance(RelayState::Failed);
    }
}

/// A successful relay outcome, ready to be written to the client.
#[derive(Debug)]
pub enum RelayOutput {
    Stream(DeltaStream),
    Document(Bytes),
}

/// Validation and error-envelope logic shared by every upstream; the
/// adapter decides whether the reply streams or buffers.
pub struct Relay<A> {
    upstream: Arc<A>,
}

impl<A> Clone for Relay<A> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
        }
    }
}

impl<A: UpstreamAdapter> Relay<A> {
    pub fn new(upstream: A) -> Self {
        Self {
            upstream: Arc::new(upstream),
        }
    }

    pub fn upstream_name(&self) -> &'static str {
        self.upstream.name()
    }

    pub async fn handle(&self, body: &[u8]) -> Result<RelayOutput> {
        let mut lifecycle = Lifecycle::new(generate_request_id());
        let result = self.run(&mut lifecycle, body).await;
        if let Err(err) = &result {
            lifecycle.fail(err);
        }
        result
    }

    async fn run(&self, lifecycle: &mut Lifecycle, body: &[u8]) -> Result<RelayOutput> {
        lifecycle.advance(RelayState::Validating);
        let request = parse_chat_request(body)?;
        info!(
            request_id = %lifecycle.request_id,
            messages = request.messages.len(),
            max_context_docs = ?request.max_context_docs,
            upstream = self.upstream.name(),
            "relay request accepted"
        );

        lifecycle.advance(RelayState::Dispatching);
        match self.upstream.dispatch(&request).await? {
            UpstreamReply::Stream(upstream) => {
                lifecycle.advance(RelayState::Streaming);
                let (tx, rx) = unbounded_channel();
                tokio::spawn(pump(upstream, SseHandler::new(tx), lifecycle.clone()));
                Ok(RelayOutput::Stream(UnboundedReceiverStream::new(rx)))
            }
            UpstreamReply::Document(doc) => {
                lifecycle.advance(RelayState::Buffering);
                lifecycle.advance(RelayState::Closed);
                Ok(RelayOutput::Document(doc))
            }
        }
    }
}

async fn pump(upstream: ByteStream, mut handler: SseHandler, mut lifecycle: Lifecycle) {
    match sse_stream(upstream, &mut handler).await {
        Ok(()) => {
            info!(request_id = %lifecycle.request_id, deltas = handler.forwarded(), "stream relayed");
            lifecycle.advance(RelayState::Closed);
        }
        Err(UpstreamError::ReceiverClosed) => {
            warn!(request_id = %lifecycle.request_id, "client went away, dropping upstream stream");
            lifecycle.advance(RelayState::Failed);
        }
        Err(err) => {
            warn!(request_id = %lifecycle.request_id, deltas = handler.forwarded(), "upstream stream broke: {err}");
            lifecycle.advance(RelayState::Failed);
            handler.abort(err.to_string());
        }
    }
}
