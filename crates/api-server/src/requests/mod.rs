mod chat;

pub use chat::parse_chat_request;
