use super::gateway::check_status;
use super::{UpstreamAdapter, UpstreamReply};
use crate::data::{LegalChatRequest, RequestData};
use crate::error::Result;
use faststr::FastStr;
use serde::de::IgnoredAny;
use serde_json::json;
use tracing::{debug, info};

pub const DEFAULT_RAG_BASE: &str = "http://localhost:8000";
pub const RAG_CHAT_PATH: &str = "/chat";

#[derive(Debug, Clone)]
pub struct RagConfig {
    pub api_base:         FastStr,
    /// Used when the client sends no `max_context_docs`.
    pub max_context_docs: u32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            api_base:         DEFAULT_RAG_BASE.into(),
            max_context_docs: 5,
        }
    }
}

/// Buffered question answering against the retrieval backend.
#[derive(Debug, Clone)]
pub struct RagAdapter {
    client: reqwest::Client,
    config: RagConfig,
}

impl RagAdapter {
    pub fn new(client: reqwest::Client, config: RagConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    fn prepare(&self, request: &LegalChatRequest) -> RequestData {
        let url = format!(
            "{}{RAG_CHAT_PATH}",
            self.config.api_base.trim_end_matches('/')
        );
        let body = json!({
            "messages": request.messages,
            "max_context_docs": request.max_context_docs.unwrap_or(self.config.max_context_docs),
        });
        RequestData::new(url, body)
    }
}

impl UpstreamAdapter for RagAdapter {
    fn name(&self) -> &'static str {
        "rag"
    }

    async fn dispatch(&self, request: &LegalChatRequest) -> Result<UpstreamReply> {
        let request_data = self.prepare(request);
        info!(url = %request_data.url, messages = request.messages.len(), "calling rag backend");
        let res = request_data.into_builder(&self.client).send().await?;
        let res = check_status(res).await?;
        let body = res.bytes().await?;
        // must be JSON, but is never re-encoded
        serde_json::from_slice::<IgnoredAny>(&body)?;
        debug!(bytes = body.len(), "rag answer received");
        Ok(UpstreamReply::Document(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::messages::ChatMessage;
    use serde_json::Value;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> RagAdapter {
        RagAdapter::new(
            reqwest::Client::new(),
            RagConfig {
                api_base: format!("{}/", server.uri()).into(),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_document_forwarded_as_is() {
        let server = MockServer::start().await;
        let answer = json!({
            "user_query": "Q",
            "ai_response": "R",
            "context_documents": [],
            "total_context_docs": 0,
            "model": "backend-specific"
        });
        Mock::given(method("POST"))
            .and(path(RAG_CHAT_PATH))
            .and(body_partial_json(json!({ "max_context_docs": 5 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let reply = adapter(&server)
            .dispatch(&LegalChatRequest::new(vec![ChatMessage::user("Q")]))
            .await
            .unwrap();
        match reply {
            UpstreamReply::Document(doc) => {
                assert_eq!(serde_json::from_slice::<Value>(&doc).unwrap(), answer)
            }
            other => panic!("expected document, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_doc_hint_wins() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "max_context_docs": 2 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ai_response": "R" })))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = LegalChatRequest::new(vec![ChatMessage::user("Q")]);
        request.max_context_docs = Some(2);
        adapter(&server).dispatch(&request).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let body: Value = received[0].body_json().unwrap();
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("index warming up"))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .dispatch(&LegalChatRequest::new(vec![ChatMessage::user("Q")]))
            .await
            .unwrap_err();
        assert_eq!(err.upstream_status(), Some(503));
        assert!(matches!(err, Error::Upstream { ref body, .. } if body.as_str() == "index warming up"));
    }

    #[tokio::test]
    async fn test_document_bytes_untouched() {
        let server = MockServer::start().await;
        let raw = r#"{"user_query":"Q","ai_response":"R","context_documents":[],"total_context_docs":0,"big":12345678901234567890123}"#;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(raw, "application/json"))
            .mount(&server)
            .await;

        let reply = adapter(&server)
            .dispatch(&LegalChatRequest::new(vec![ChatMessage::user("Q")]))
            .await
            .unwrap();
        match reply {
            UpstreamReply::Document(doc) => assert_eq!(&doc[..], raw.as_bytes()),
            other => panic!("expected document, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_answer_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html>gateway</html>", "text/html"))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .dispatch(&LegalChatRequest::new(vec![ChatMessage::user("Q")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SerdeError(_)), "unexpected error: {err}");
    }
}
