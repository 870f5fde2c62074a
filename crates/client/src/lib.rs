pub mod config;
pub mod error;
pub mod reducer;
pub mod relay;
pub mod session;
pub mod store;
pub mod transcript;

pub use reducer::{ChatEvent, ChatState, Phase, reduce};
pub use relay::{RelayClient, RelayReply};
pub use session::ChatSession;
pub use store::TranscriptStore;
pub use transcript::{Entry, EntryRole};
