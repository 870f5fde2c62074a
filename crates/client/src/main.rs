use anyhow::Result;
use client::config::ClientConfig;
use client::{ChatSession, ChatState, Entry, EntryRole, RelayClient, TranscriptStore};
use dotenvy::dotenv;
use std::io::Write;
use storage::{RecordCache, Storage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

const PROMPT: &str = "> ";

/// Writes transcript changes to stdout, streaming the open reply in place.
#[derive(Default)]
struct Printer {
    shown:    usize,
    streamed: usize,
}

impl Printer {
    fn render(&mut self, state: &ChatState) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        let entries = state.entries();
        if entries.len() < self.shown {
            *self = Self::default();
        }
        while let Some(entry) = entries.get(self.shown) {
            if state.open_entry().is_some_and(|open| open.id() == entry.id()) {
                if self.streamed == 0 {
                    write!(out, "{}", label(entry))?;
                }
                write!(out, "{}", &entry.content()[self.streamed..])?;
                self.streamed = entry.content().len();
                return out.flush();
            }
            if self.streamed > 0 {
                writeln!(out, "{}", &entry.content()[self.streamed..])?;
                self.streamed = 0;
            } else {
                writeln!(out, "{}{}", label(entry), entry.content())?;
                if let Some(url) = entry.url() {
                    writeln!(out, "    {url}")?;
                }
            }
            self.shown += 1;
        }
        out.flush()
    }
}

fn label(entry: &Entry) -> &'static str {
    match entry.role() {
        EntryRole::User => "you: ",
        EntryRole::Assistant => "ai: ",
        EntryRole::System => "-- ",
        EntryRole::ReferenceUrl => "  ref: ",
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();
    let _guard = common::logging_stderr();

    let config = ClientConfig::from_env();
    let storage = Storage::<RecordCache>::new(&config.database_url).await?;
    let relay = RelayClient::new(reqwest::Client::new(), &config.relay_url);
    let mut session = ChatSession::open(relay, TranscriptStore::new(storage)).await?;

    let mut printer = Printer::default();
    printer.render(session.state())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/clear" => {
                session.clear_history().await?;
                printer = Printer::default();
            }
            message => {
                session
                    .send_with(message, |state| {
                        if let Err(e) = printer.render(state) {
                            warn!("failed to render transcript: {e}");
                        }
                    })
                    .await?;
                continue;
            }
        }
        printer.render(session.state())?;
    }
    Ok(())
}
