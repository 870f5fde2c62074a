use crate::error::{Error, Result};
use crate::reducer::{ChatEvent, ChatState, reduce};
use crate::relay::{RelayClient, RelayReply};
use crate::store::TranscriptStore;
use common::stream::ByteStream;
use common::text::Utf8Accumulator;
use faststr::FastStr;
use futures_util::StreamExt;
use storage::KVCache;
use tracing::{error, info, warn};

/// One client's conversation: the reducer state, the relay it talks to
/// and the store it persists to after every change.
pub struct ChatSession<C> {
    state: ChatState,
    relay: RelayClient,
    store: TranscriptStore<C>,
}

impl<C: KVCache<FastStr>> ChatSession<C> {
    pub async fn open(relay: RelayClient, store: TranscriptStore<C>) -> Result<Self> {
        let entries = store.load().await?;
        info!(entries = entries.len(), relay = relay.endpoint(), "chat session opened");
        Ok(Self {
            state: ChatState::restore(entries),
            relay,
            store,
        })
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub async fn send(&mut self, content: &str) -> Result<()> {
        self.send_with(content, |_: &ChatState| {}).await
    }

    /// Runs one turn to completion, calling `on_change` after every
    /// reduction. Relay failures end up in the transcript as an apology,
    /// not as an `Err`.
    pub async fn send_with<F>(&mut self, content: &str, mut on_change: F) -> Result<()>
    where
        F: FnMut(&ChatState),
    {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::EmptyMessage);
        }
        if !self.state.is_idle() {
            return Err(Error::Busy);
        }

        self.apply(ChatEvent::UserSent(content.to_owned().into()), &mut on_change)
            .await;
        let history = self.state.conversation();

        match self.relay.send(history).await {
            Ok(RelayReply::Stream(stream)) => self.consume(stream, &mut on_change).await,
            Ok(RelayReply::Answer(answer)) => {
                self.apply(ChatEvent::AnswerReceived(answer), &mut on_change)
                    .await
            }
            Err(e) => self.fail(&e, &mut on_change).await,
        }
        Ok(())
    }

    pub async fn clear_history(&mut self) -> Result<()> {
        if !self.state.is_idle() {
            return Err(Error::Busy);
        }
        let mut quiet = |_: &ChatState| {};
        self.apply(ChatEvent::HistoryCleared, &mut quiet).await;
        Ok(())
    }

    async fn consume<F>(&mut self, mut stream: ByteStream, on_change: &mut F)
    where
        F: FnMut(&ChatState),
    {
        let mut decoder = Utf8Accumulator::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    let text = decoder.push(&bytes);
                    if !text.is_empty() {
                        self.apply(ChatEvent::DeltaReceived(text.into()), on_change)
                            .await;
                    }
                }
                Err(e) => {
                    self.fail(&Error::from(e), on_change).await;
                    return;
                }
            }
        }
        let tail = decoder.finish();
        if !tail.is_empty() {
            self.apply(ChatEvent::DeltaReceived(tail.into()), on_change)
                .await;
        }
        self.apply(ChatEvent::StreamEnded, on_change).await;
    }

    async fn fail<F>(&mut self, err: &Error, on_change: &mut F)
    where
        F: FnMut(&ChatState),
    {
        warn!("turn failed: {err}");
        let detail = err.apology_detail();
        self.apply(ChatEvent::ErrorOccurred { detail }, on_change)
            .await;
    }

    async fn apply<F>(&mut self, event: ChatEvent, on_change: &mut F)
    where
        F: FnMut(&ChatState),
    {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, event);
        on_change(&self.state);
        if let Err(e) = self.store.save(&self.state.persistable()).await {
            error!("failed to persist transcript: {e}");
        }
    }
}
