use super::ErrorEnvelope;
use faststr::FastStr;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalChatResponse {
    #[serde(default)]
    pub user_query:         FastStr,
    pub ai_response:        FastStr,
    #[serde(default)]
    pub context_documents:  Vec<ContextDocument>,
    #[serde(default)]
    pub total_context_docs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDocument {
    #[serde(default)]
    pub document:         FastStr,
    #[serde(default)]
    pub similarity_score: f64,
    #[serde(default)]
    pub metadata:         DocumentMetadata,
}

/// Statute metadata attached to a retrieved article. Keys the backend adds
/// beyond the named ones are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(rename = "LawID", default, skip_serializing_if = "Option::is_none")]
    pub law_id:        Option<FastStr>,
    #[serde(rename = "LawTitle", default, skip_serializing_if = "Option::is_none")]
    pub law_title:     Option<FastStr>,
    #[serde(rename = "ArticleTitle", default, skip_serializing_if = "Option::is_none")]
    pub article_title: Option<FastStr>,
    #[serde(rename = "LawType", default, skip_serializing_if = "Option::is_none")]
    pub law_type:      Option<FastStr>,
    #[serde(rename = "ArticleNum", default, skip_serializing_if = "Option::is_none")]
    pub article_num:   Option<Value>,
    #[serde(flatten)]
    pub extra:         BTreeMap<String, Value>,
}

/// A JSON reply from the relay: either an error envelope or an answer,
/// told apart by the presence of `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RagReply {
    Failure(ErrorEnvelope),
    Answer(LegalChatResponse),
}
