//! Server-Sent-Events demultiplexer for OpenAI-style chat completion streams.
//!
//! Bytes are buffered until a full line is available, so neither a line nor a
//! multi-byte character is ever cut by a network read. Each line then goes
//! through a small state machine:
//!
//! - `AwaitingPrefix`: lines without the `data:` prefix are skipped.
//! - `ParsingPayload`: `[DONE]` ends the stream; anything else must be JSON
//!   carrying `choices[0].delta.content`. Payloads that do not parse are
//!   dropped and counted, never reported as errors.
//! - `Terminal`: everything after the sentinel is ignored, including the rest
//!   of the chunk that carried it.
//!
//! A line longer than [`MAX_LINE_BYTES`] is discarded and counted as dropped.

use super::ByteStream;
use crate::error::{Error, Result, StreamAborted};
use crate::text::preview;
use bytes::Bytes;
use faststr::FastStr;
use futures_util::StreamExt;
use serde_json::Value;
use std::fmt::Display;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

pub const DATA_PREFIX: &str = "data:";
pub const DONE_SENTINEL: &str = "[DONE]";
pub const MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Delta(FastStr),
    Done,
}

impl Display for SseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delta(t) => write!(f, "{t}"),
            Self::Done => write!(f, "Done"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DemuxState {
    #[default]
    AwaitingPrefix,
    ParsingPayload,
    Terminal,
}

#[derive(Debug, PartialEq, Eq)]
enum LineOutcome {
    Skipped,
    Empty,
    Dropped,
    Delta(FastStr),
    Done,
}

#[derive(Debug, Default)]
pub struct SseDemuxer {
    pending:    Vec<u8>,
    state:      DemuxState,
    dropped:    usize,
    /// Set while skipping the remainder of an oversized line.
    overflowed: bool,
}

impl SseDemuxer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DemuxState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state == DemuxState::Terminal
    }

    /// Payload lines that were not valid JSON, plus oversized lines.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if self.is_terminal() {
            return events;
        }
        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(pos) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + pos;
            let range = start..end;
            start = end + 1;
            if std::mem::take(&mut self.overflowed) {
                continue;
            }
            if range.len() > MAX_LINE_BYTES {
                self.drop_oversized(range.len());
                continue;
            }
            let line = String::from_utf8_lossy(&self.pending[range]).into_owned();
            self.push_line(&line, &mut events);
            if self.is_terminal() {
                self.pending.clear();
                return events;
            }
        }
        self.pending.drain(..start);
        if self.pending.len() > MAX_LINE_BYTES {
            if !self.overflowed {
                self.drop_oversized(self.pending.len());
                self.overflowed = true;
            }
            self.pending.clear();
        }
        events
    }

    fn drop_oversized(&mut self, len: usize) {
        self.dropped += 1;
        debug!(len, "dropping oversized sse line");
    }

    /// Processes a trailing line that never got its newline.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if self.is_terminal() || self.pending.is_empty() || std::mem::take(&mut self.overflowed) {
            self.pending.clear();
            return events;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        self.push_line(&line, &mut events);
        events
    }

    fn push_line(&mut self, line: &str, events: &mut Vec<SseEvent>) {
        match self.process_line(line) {
            LineOutcome::Delta(text) => events.push(SseEvent::Delta(text)),
            LineOutcome::Done => events.push(SseEvent::Done),
            LineOutcome::Skipped | LineOutcome::Empty | LineOutcome::Dropped => {}
        }
    }

    fn process_line(&mut self, line: &str) -> LineOutcome {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return LineOutcome::Skipped;
        };
        let payload = payload.strip_prefix(' ').unwrap_or(payload);

        self.state = DemuxState::ParsingPayload;
        if payload == DONE_SENTINEL {
            self.state = DemuxState::Terminal;
            return LineOutcome::Done;
        }

        let outcome = match serde_json::from_str::<Value>(payload) {
            Ok(data) => match data["choices"][0]["delta"]["content"]
                .as_str()
                .filter(|v| !v.is_empty())
            {
                Some(text) => LineOutcome::Delta(text.to_owned().into()),
                None => LineOutcome::Empty,
            },
            Err(err) => {
                self.dropped += 1;
                debug!(payload = preview(payload, 64), "dropping unparseable sse payload: {err}");
                LineOutcome::Dropped
            }
        };
        self.state = DemuxState::AwaitingPrefix;
        outcome
    }
}

/// Forwards demultiplexed deltas to the relay response body.
pub struct SseHandler {
    sender:    UnboundedSender<std::result::Result<Bytes, StreamAborted>>,
    forwarded: usize,
}

impl SseHandler {
    pub fn new(sender: UnboundedSender<std::result::Result<Bytes, StreamAborted>>) -> Self {
        Self {
            sender,
            forwarded: 0,
        }
    }

    pub fn forwarded(&self) -> usize {
        self.forwarded
    }

    pub fn text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        debug!(delta = preview(text, 32), "forwarding delta");
        if self
            .sender
            .send(Ok(Bytes::copy_from_slice(text.as_bytes())))
            .is_err()
        {
            return Err(Error::ReceiverClosed);
        }
        self.forwarded += 1;
        Ok(())
    }

    pub fn done(&mut self) {
        debug!(forwarded = self.forwarded, "SseEvent: Done");
    }

    /// Fails the response body. Nothing may be sent after this.
    pub fn abort(self, reason: impl Into<FastStr>) {
        let reason = StreamAborted(reason.into());
        if self.sender.send(Err(reason)).is_err() {
            warn!("failed to abort delta stream, receiver already closed");
        }
    }
}

/// Reads `upstream` to completion (or to the `[DONE]` sentinel), pushing each
/// delta through `handler` as soon as it is decoded.
pub async fn sse_stream(mut upstream: ByteStream, handler: &mut SseHandler) -> Result<()> {
    let mut demuxer = SseDemuxer::new();
    while let Some(chunk) = upstream.next().await {
        let chunk = chunk?;
        debug!(
            len = chunk.len(),
            preview = preview(&String::from_utf8_lossy(&chunk), 100),
            "upstream chunk received"
        );
        for event in demuxer.feed(&chunk) {
            match event {
                SseEvent::Delta(text) => handler.text(&text)?,
                SseEvent::Done => {
                    debug!("upstream stream [DONE]");
                    handler.done();
                    return Ok(());
                }
            }
        }
    }
    for event in demuxer.finish() {
        if let SseEvent::Delta(text) = event {
            handler.text(&text)?;
        }
    }
    debug!(dropped = demuxer.dropped(), "upstream stream ended without sentinel");
    handler.done();
    Ok(())
}
