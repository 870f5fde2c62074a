mod chat;
mod envelope;
mod rag;
mod request;

pub use chat::{ChatCompletionsData, LegalChatRequest};
pub use envelope::ErrorEnvelope;
pub use rag::{ContextDocument, DocumentMetadata, LegalChatResponse, RagReply};
pub use request::RequestData;
