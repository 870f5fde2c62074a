use crate::messages::ChatMessage;
use faststr::FastStr;
use serde::{Deserialize, Serialize};

/// Body accepted by the relay and forwarded to the RAG backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegalChatRequest {
    pub messages:         Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_context_docs: Option<u32>,
}

impl LegalChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_context_docs: None,
        }
    }
}

/// OpenAI-style chat completion body sent to the gateway.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletionsData {
    #[serde(rename = "model")]
    pub model_name:  FastStr,
    pub messages:    Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub max_tokens:  Option<u32>,
    pub stream:      bool,
}

impl ChatCompletionsData {
    /// Builds the upstream body with `system` placed ahead of the conversation.
    pub fn with_system_prompt(
        model_name: impl Into<FastStr>,
        system: &str,
        conversation: &[ChatMessage],
    ) -> Self {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(ChatMessage::system(system.to_owned()));
        messages.extend_from_slice(conversation);
        Self {
            model_name: model_name.into(),
            messages,
            temperature: None,
            max_tokens: None,
            stream: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessageRole;

    #[test]
    fn test_system_prompt_leads() {
        let conversation = vec![ChatMessage::user("q1"), ChatMessage::assistant("a1")];
        let data = ChatCompletionsData::with_system_prompt("m", "be precise", &conversation);
        assert_eq!(data.messages.len(), 3);
        assert_eq!(data.messages[0].role, MessageRole::System);
        assert_eq!(data.messages[0].content, "be precise");
        assert_eq!(&data.messages[1..], conversation.as_slice());
    }

    #[test]
    fn test_request_omits_absent_doc_hint() {
        let req = LegalChatRequest::new(vec![ChatMessage::user("q")]);
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("max_context_docs").is_none());
    }
}
