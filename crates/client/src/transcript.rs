use chrono::{DateTime, Utc};
use common::data::ContextDocument;
use common::messages::ChatMessage;
use common::text::excerpt;
use faststr::FastStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const GREETING: &str =
    "こんにちは！私は法律AIです。条文に基づいた法律への質問回答を行います。どのようなご要件ですか？";
pub const CLEARED_NOTICE: &str = "(チャット履歴をクリアしました)";
pub const APOLOGY: &str = "エラーが発生しました。もう一度お試しください。";

const LAW_URL_BASE: &str = "https://laws.e-gov.go.jp/law/";
const REFERENCE_EXCERPT_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRole {
    User,
    Assistant,
    /// Display-only notices; never persisted or sent upstream.
    System,
    ReferenceUrl,
}

/// One line of the transcript. Content only changes through the reducer,
/// and only while the entry is the open streaming reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    id:        FastStr,
    content:   FastStr,
    role:      EntryRole,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context_document_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url:       Option<FastStr>,
}

impl Entry {
    pub fn new(role: EntryRole, content: impl Into<FastStr>) -> Self {
        Self {
            id: Uuid::new_v4().to_string().into(),
            content: content.into(),
            role,
            timestamp: Utc::now(),
            context_document_count: None,
            url: None,
        }
    }

    pub fn greeting() -> Self {
        Self::new(EntryRole::Assistant, GREETING)
    }

    pub fn apology(detail: Option<&str>) -> Self {
        match detail {
            Some(detail) => Self::new(EntryRole::Assistant, format!("{APOLOGY}\n{detail}")),
            None => Self::new(EntryRole::Assistant, APOLOGY),
        }
    }

    pub fn with_context_documents(mut self, count: u32) -> Self {
        self.context_document_count = (count > 0).then_some(count);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn role(&self) -> EntryRole {
        self.role
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn context_document_count(&self) -> Option<u32> {
        self.context_document_count
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub(crate) fn append(&mut self, fragment: &str) {
        let mut content = String::with_capacity(self.content.len() + fragment.len());
        content.push_str(&self.content);
        content.push_str(fragment);
        self.content = content.into();
    }

    /// The upstream view of this entry, if it belongs in the conversation.
    pub fn as_message(&self) -> Option<ChatMessage> {
        match self.role {
            EntryRole::User => Some(ChatMessage::user(self.content.clone())),
            EntryRole::Assistant => Some(ChatMessage::assistant(self.content.clone())),
            EntryRole::System | EntryRole::ReferenceUrl => None,
        }
    }
}

/// One reference link per retrieved statute article.
pub fn reference_entries(documents: &[ContextDocument]) -> Vec<Entry> {
    documents.iter().map(reference_entry).collect()
}

fn reference_entry(doc: &ContextDocument) -> Entry {
    let meta = &doc.metadata;
    let label = match (meta.law_title.as_deref(), meta.article_title.as_deref()) {
        (Some(law), Some(article)) => format!("{law} {article}"),
        (Some(law), None) => law.to_owned(),
        _ => excerpt(&doc.document, REFERENCE_EXCERPT_CHARS).into_owned(),
    };
    let mut entry = Entry::new(EntryRole::ReferenceUrl, label);
    entry.url = meta
        .law_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .map(|id| FastStr::from(format!("{LAW_URL_BASE}{id}")));
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::data::DocumentMetadata;

    fn document(law_id: Option<&str>, title: Option<&str>, article: Option<&str>) -> ContextDocument {
        ContextDocument {
            document:         "第三十六条　急迫不正の侵害に対して、自己又は他人の権利を防衛するため、やむを得ずにした行為は、罰しない。".into(),
            similarity_score: 0.91,
            metadata:         DocumentMetadata {
                law_id: law_id.map(|s| FastStr::from(s.to_owned())),
                law_title: title.map(|s| FastStr::from(s.to_owned())),
                article_title: article.map(|s| FastStr::from(s.to_owned())),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_reference_entry_links_to_law() {
        let refs = reference_entries(&[document(Some("140AC0000000045"), Some("刑法"), Some("第三十六条"))]);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].role(), EntryRole::ReferenceUrl);
        assert_eq!(refs[0].content(), "刑法 第三十六条");
        assert_eq!(refs[0].url(), Some("https://laws.e-gov.go.jp/law/140AC0000000045"));
    }

    #[test]
    fn test_reference_entry_without_titles_uses_excerpt() {
        let refs = reference_entries(&[document(None, None, None)]);
        assert!(refs[0].content().starts_with("第三十六条"));
        assert!(refs[0].content().chars().count() <= REFERENCE_EXCERPT_CHARS + 1);
        assert_eq!(refs[0].url(), None);
    }

    #[test]
    fn test_serialized_shape() {
        let entry = Entry::new(EntryRole::ReferenceUrl, "刑法 第三十六条").with_context_documents(0);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["role"], "reference_url");
        assert!(json.get("contextDocumentCount").is_none());
        assert!(json["timestamp"].as_str().unwrap().contains('T'));

        let answer = Entry::new(EntryRole::Assistant, "R").with_context_documents(3);
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["contextDocumentCount"], 3);
    }

    #[test]
    fn test_transcript_round_trip() {
        let mut streamed = Entry::new(EntryRole::Assistant, "");
        streamed.append("正当");
        streamed.append("防衛");
        let entries = vec![Entry::greeting(), Entry::new(EntryRole::User, "正当防衛とは？"), streamed];

        let json = serde_json::to_string(&entries).unwrap();
        let restored: Vec<Entry> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, entries);
        assert_eq!(restored[2].content(), "正当防衛");
    }

    #[test]
    fn test_apology_carries_detail_on_second_line() {
        assert_eq!(Entry::apology(None).content(), APOLOGY);
        let entry = Entry::apology(Some("HTTP 502"));
        assert_eq!(entry.content().lines().collect::<Vec<_>>(), vec![APOLOGY, "HTTP 502"]);
    }

    #[test]
    fn test_only_conversation_roles_go_upstream() {
        assert!(Entry::new(EntryRole::System, CLEARED_NOTICE).as_message().is_none());
        assert!(Entry::new(EntryRole::ReferenceUrl, "x").as_message().is_none());
        let message = Entry::new(EntryRole::User, "q").as_message().unwrap();
        assert!(message.role.is_user());
    }
}
