//! Transcript reducer: every change to what the user sees goes through
//! [`reduce`]. Persistence is the caller's job, after each reduction.

use crate::transcript::{CLEARED_NOTICE, Entry, EntryRole, reference_entries};
use common::data::LegalChatResponse;
use common::messages::ChatMessage;
use faststr::FastStr;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub enum ChatEvent {
    UserSent(FastStr),
    DeltaReceived(FastStr),
    StreamEnded,
    AnswerReceived(LegalChatResponse),
    ErrorOccurred { detail: Option<String> },
    HistoryCleared,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingResponse,
    Streaming,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatState {
    entries: Vec<Entry>,
    phase:   Phase,
    /// Index of the assistant entry still receiving deltas.
    open:    Option<usize>,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::restore(Vec::new())
    }
}

impl ChatState {
    /// Rehydrates a saved transcript; an empty one starts from the greeting.
    pub fn restore(entries: Vec<Entry>) -> Self {
        let entries = if entries.is_empty() {
            vec![Entry::greeting()]
        } else {
            entries
        };
        Self {
            entries,
            phase: Phase::Idle,
            open: None,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn open_entry(&self) -> Option<&Entry> {
        self.open.and_then(|idx| self.entries.get(idx))
    }

    /// History sent to the relay: user and assistant turns only.
    pub fn conversation(&self) -> Vec<ChatMessage> {
        self.entries.iter().filter_map(Entry::as_message).collect()
    }

    /// Entries written to the durable store.
    pub fn persistable(&self) -> Vec<&Entry> {
        self.entries
            .iter()
            .filter(|e| e.role() != EntryRole::System)
            .collect()
    }
}

pub fn reduce(mut state: ChatState, event: ChatEvent) -> ChatState {
    match event {
        ChatEvent::UserSent(content) => {
            if !state.is_idle() {
                warn!(phase = ?state.phase, "send rejected while a reply is in flight");
                return state;
            }
            state.entries.push(Entry::new(EntryRole::User, content));
            state.phase = Phase::AwaitingResponse;
        }
        ChatEvent::DeltaReceived(text) => {
            if state.phase == Phase::AwaitingResponse {
                state.entries.push(Entry::new(EntryRole::Assistant, ""));
                state.open = Some(state.entries.len() - 1);
                state.phase = Phase::Streaming;
            }
            if state.phase != Phase::Streaming {
                debug!("delta ignored, no turn in flight");
                return state;
            }
            if let Some(entry) = state.open.and_then(|idx| state.entries.get_mut(idx)) {
                entry.append(&text);
            }
        }
        ChatEvent::StreamEnded => {
            state.open = None;
            state.phase = Phase::Idle;
        }
        ChatEvent::AnswerReceived(answer) => {
            if state.phase != Phase::AwaitingResponse {
                debug!(phase = ?state.phase, "answer ignored, no turn awaiting one");
                return state;
            }
            state.entries.push(
                Entry::new(EntryRole::Assistant, answer.ai_response)
                    .with_context_documents(answer.total_context_docs),
            );
            state
                .entries
                .extend(reference_entries(&answer.context_documents));
            state.phase = Phase::Idle;
        }
        ChatEvent::ErrorOccurred { detail } => {
            state.open = None;
            state.entries.push(Entry::apology(detail.as_deref()));
            state.phase = Phase::Idle;
        }
        ChatEvent::HistoryCleared => {
            state.entries = vec![Entry::new(EntryRole::System, CLEARED_NOTICE), Entry::greeting()];
            state.open = None;
            state.phase = Phase::Idle;
        }
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{APOLOGY, GREETING};
    use common::data::{ContextDocument, DocumentMetadata};

    fn run(state: ChatState, events: Vec<ChatEvent>) -> ChatState {
        events.into_iter().fold(state, reduce)
    }

    fn delta(text: &str) -> ChatEvent {
        ChatEvent::DeltaReceived(text.to_owned().into())
    }

    fn assistants(state: &ChatState) -> Vec<&str> {
        state
            .entries()
            .iter()
            .skip(1)
            .filter(|e| e.role() == EntryRole::Assistant)
            .map(Entry::content)
            .collect()
    }

    #[test]
    fn test_new_state_has_greeting() {
        let state = ChatState::default();
        assert_eq!(state.entries().len(), 1);
        assert_eq!(state.entries()[0].content(), GREETING);
        assert!(state.is_idle());
    }

    #[test]
    fn test_deltas_fill_one_assistant_entry() {
        let deltas = ["労働", "基準", "法", "第20条", "によれば"];
        let mut events = vec![ChatEvent::UserSent("解雇予告は？".into())];
        events.extend(deltas.iter().map(|d| delta(d)));
        let mid = run(ChatState::default(), events);
        assert_eq!(mid.phase(), Phase::Streaming);
        assert_eq!(mid.open_entry().map(Entry::content), Some("労働基準法第20条によれば"));

        let id = mid.open_entry().unwrap().id().to_owned();
        let done = reduce(mid, ChatEvent::StreamEnded);
        assert!(done.is_idle());
        assert!(done.open_entry().is_none());
        assert_eq!(assistants(&done), vec![deltas.concat()]);
        assert_eq!(done.entries().last().unwrap().id(), id);
    }

    #[test]
    fn test_first_delta_opens_entry_and_stray_delta_ignored() {
        let idle = reduce(ChatState::default(), delta("x"));
        assert_eq!(idle.entries().len(), 1);
        assert!(idle.is_idle());

        let state = run(ChatState::default(), vec![ChatEvent::UserSent("q".into()), delta("A")]);
        assert_eq!(state.entries().len(), 3);
        let open = state.open_entry().unwrap();
        assert_eq!(open.role(), EntryRole::Assistant);
        assert_eq!(open.content(), "A");
    }

    #[test]
    fn test_streamed_ab() {
        let state = run(
            ChatState::default(),
            vec![ChatEvent::UserSent("q".into()), delta("A"), delta("B"), ChatEvent::StreamEnded],
        );
        assert_eq!(assistants(&state), vec!["AB"]);
    }

    #[test]
    fn test_rag_answer_adds_references() {
        let answer = LegalChatResponse {
            user_query:         "Q".into(),
            ai_response:        "R".into(),
            context_documents:  vec![ContextDocument {
                document:         "...".into(),
                similarity_score: 0.8,
                metadata:         DocumentMetadata {
                    law_id: Some("123".into()),
                    law_title: Some("T".into()),
                    article_title: Some("Art1".into()),
                    ..Default::default()
                },
            }],
            total_context_docs: 1,
        };
        let state = run(
            ChatState::default(),
            vec![ChatEvent::UserSent("Q".into()), ChatEvent::AnswerReceived(answer)],
        );
        assert!(state.is_idle());
        let tail = &state.entries()[2..];
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content(), "R");
        assert_eq!(tail[0].context_document_count(), Some(1));
        assert_eq!(tail[1].role(), EntryRole::ReferenceUrl);
        assert!(tail[1].url().unwrap().contains("123"));
    }

    #[test]
    fn test_failure_keeps_partial_reply() {
        let state = run(
            ChatState::default(),
            vec![
                ChatEvent::UserSent("q".into()),
                delta("A"),
                delta("B"),
                ChatEvent::ErrorOccurred { detail: None },
            ],
        );
        assert!(state.is_idle());
        assert_eq!(assistants(&state), vec!["AB", APOLOGY]);

        // a late delta must not reopen the frozen entry
        let state = reduce(state, delta("C"));
        assert_eq!(assistants(&state), vec!["AB", APOLOGY]);
    }

    #[test]
    fn test_send_rejected_while_busy() {
        let busy = run(ChatState::default(), vec![ChatEvent::UserSent("one".into())]);
        let after = reduce(busy.clone(), ChatEvent::UserSent("two".into()));
        assert_eq!(after, busy);
    }

    #[test]
    fn test_clear_history() {
        let state = run(
            ChatState::default(),
            vec![ChatEvent::UserSent("q".into()), delta("A"), ChatEvent::StreamEnded, ChatEvent::HistoryCleared],
        );
        let roles: Vec<_> = state.entries().iter().map(Entry::role).collect();
        assert_eq!(roles, vec![EntryRole::System, EntryRole::Assistant]);
        assert_eq!(state.entries()[0].content(), CLEARED_NOTICE);

        let saved = state.persistable();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].content(), GREETING);
    }

    #[test]
    fn test_conversation_skips_notices_and_references() {
        let mut state = reduce(ChatState::default(), ChatEvent::HistoryCleared);
        state = reduce(state, ChatEvent::UserSent("q".into()));
        let history = state.conversation();
        assert_eq!(history.len(), 2);
        assert!(history[0].role.is_assistant());
        assert!(history[1].role.is_user());
    }
}
