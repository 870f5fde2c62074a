mod chat;
mod debug;

pub use chat::chat_router;
pub use debug::{Diagnostics, debug_router};
