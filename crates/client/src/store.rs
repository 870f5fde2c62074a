use crate::error::Result;
use crate::transcript::Entry;
use faststr::FastStr;
use storage::{KVCache, Storage};
use tracing::{debug, warn};

pub const STORAGE_KEY: &str = "legal-ai-chat-messages";

/// The transcript as one JSON array under a single key.
#[derive(Clone)]
pub struct TranscriptStore<C> {
    storage: Storage<C>,
}

impl<C: KVCache<FastStr>> TranscriptStore<C> {
    pub fn new(storage: Storage<C>) -> Self {
        Self { storage }
    }

    /// A missing or unreadable record yields an empty transcript.
    pub async fn load(&self) -> Result<Vec<Entry>> {
        let Some(raw) = self.storage.get(STORAGE_KEY).await? else {
            debug!("no saved transcript");
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<Entry>>(&raw) {
            Ok(entries) => {
                debug!(entries = entries.len(), "transcript restored");
                Ok(entries)
            }
            Err(e) => {
                warn!("discarding unreadable transcript: {e}");
                Ok(Vec::new())
            }
        }
    }

    pub async fn save(&self, entries: &[&Entry]) -> Result<()> {
        let raw = serde_json::to_string(entries)?;
        self.storage.put(STORAGE_KEY, raw).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::EntryRole;
    use storage::RecordCache;

    async fn memory_store() -> TranscriptStore<RecordCache> {
        TranscriptStore::new(Storage::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_empty_store_loads_nothing() {
        let store = memory_store().await;
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = memory_store().await;
        let entries = vec![Entry::greeting(), Entry::new(EntryRole::User, "相続放棄の期限は？")];
        store.save(&entries.iter().collect::<Vec<_>>()).await.unwrap();

        let restored = store.load().await.unwrap();
        assert_eq!(restored, entries);
        assert_eq!(restored[1].timestamp(), entries[1].timestamp());
    }

    #[tokio::test]
    async fn test_unreadable_record_is_discarded() {
        let store = memory_store().await;
        store.storage.put(STORAGE_KEY, "{not a transcript").await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }
}
