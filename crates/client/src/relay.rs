use crate::error::{Error, Result};
use common::data::{ErrorEnvelope, LegalChatRequest, LegalChatResponse, RagReply};
use common::messages::ChatMessage;
use common::stream::ByteStream;
use faststr::FastStr;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, warn};

pub const CHAT_PATH: &str = "/api/chat";

/// What the relay sent back for one turn.
pub enum RelayReply {
    /// Raw UTF-8 text deltas, in arrival order.
    Stream(ByteStream),
    Answer(LegalChatResponse),
}

impl std::fmt::Debug for RelayReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayReply::Stream(_) => f.write_str("Stream(..)"),
            RelayReply::Answer(answer) => f.debug_tuple("Answer").field(answer).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    client:   reqwest::Client,
    endpoint: FastStr,
}

impl RelayClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        let endpoint = format!("{}{CHAT_PATH}", base_url.trim_end_matches('/'));
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Posts the conversation. A JSON reply is decoded as a RAG answer;
    /// anything else is handed back as a byte stream.
    pub async fn send(&self, messages: Vec<ChatMessage>) -> Result<RelayReply> {
        info!(endpoint = %self.endpoint, messages = messages.len(), "sending turn");
        let res = self
            .client
            .post(self.endpoint.as_str())
            .json(&LegalChatRequest::new(messages))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "relay rejected turn");
            return Err(Error::Relay {
                status:   status.as_u16(),
                envelope: serde_json::from_str::<ErrorEnvelope>(&body).ok(),
            });
        }

        let is_json = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        if !is_json {
            debug!("relay answered with a text stream");
            return Ok(RelayReply::Stream(Box::pin(
                res.bytes_stream().map(|chunk| chunk.map_err(common::error::Error::from)),
            )));
        }

        match res.json::<RagReply>().await? {
            RagReply::Answer(answer) => Ok(RelayReply::Answer(answer)),
            RagReply::Failure(envelope) => Err(Error::Relay {
                status: status.as_u16(),
                envelope: Some(envelope),
            }),
        }
    }
}
