use std::sync::Arc;

use {
    futures::future::join_all,
    mapion_registry::{NormalizedPlate, PlateLookup},
    mapion_sessions::{SearchMode, SessionStore},
    tracing::{debug, info},
};

use crate::replies;

/// Which branch handled a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// One plate, looked up after the search command.
    Single,
    /// Single mode, but the plate failed validation; nothing was looked up.
    Rejected,
    /// One line per token.
    Batch,
    /// The message contained no tokens.
    Empty,
}

/// Reply produced for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub kind: QueryKind,
    pub text: String,
}

/// Split a message into plate tokens on commas and newlines, dropping blanks.
#[must_use]
pub fn split_tokens(text: &str) -> Vec<&str> {
    text.split([',', '\n'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Routes each inbound message to single or batch handling and arms the
/// conversation's session timer after every lookup.
#[derive(Clone)]
pub struct QueryDispatcher {
    lookup: Arc<dyn PlateLookup>,
    sessions: SessionStore,
}

impl QueryDispatcher {
    pub fn new(lookup: Arc<dyn PlateLookup>, sessions: SessionStore) -> Self {
        Self { lookup, sessions }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle the search command: the next message may be a single plate.
    pub fn begin_search(&self, chat_id: &str) -> &'static str {
        self.sessions.begin_search(chat_id);
        replies::SEARCH_PROMPT
    }

    /// Handle the text of one inbound message.
    ///
    /// Single mode applies only when the conversation is awaiting a single
    /// query and the message holds exactly one token; everything else is a
    /// batch. The awaiting flag is consumed either way.
    pub async fn dispatch(&self, chat_id: &str, text: &str) -> Dispatched {
        let mode = self.sessions.take_mode(chat_id);
        let tokens = split_tokens(text);

        let dispatched = match (mode, tokens.as_slice()) {
            (_, []) => Dispatched {
                kind: QueryKind::Empty,
                text: replies::NO_PLATES.to_string(),
            },
            (SearchMode::AwaitingSingleQuery, [raw]) => self.single(chat_id, raw).await,
            (_, tokens) => self.batch(chat_id, tokens).await,
        };

        debug!(
            chat_id,
            kind = ?dispatched.kind,
            open_sessions = self.sessions.len(),
            "query dispatched"
        );
        dispatched
    }

    async fn single(&self, chat_id: &str, raw: &str) -> Dispatched {
        let plate = match NormalizedPlate::parse(raw) {
            Ok(plate) => plate,
            Err(e) => {
                debug!(chat_id, error = %e, "single query rejected");
                return Dispatched {
                    kind: QueryKind::Rejected,
                    text: replies::INVALID_FORMAT.to_string(),
                };
            },
        };

        info!(chat_id, %plate, format = %plate.format(), "single plate query");
        let result = self.lookup.lookup(&plate).await;
        let text = replies::single(&plate, &result);
        self.sessions.arm_timer(chat_id);

        Dispatched {
            kind: QueryKind::Single,
            text,
        }
    }

    async fn batch(&self, chat_id: &str, tokens: &[&str]) -> Dispatched {
        info!(chat_id, count = tokens.len(), "batch plate query");

        // join_all yields results in input order regardless of completion order.
        let lines = join_all(tokens.iter().map(|raw| async move {
            match NormalizedPlate::parse(raw) {
                Ok(plate) => {
                    let result = self.lookup.lookup(&plate).await;
                    replies::batch_line(&plate, &result)
                },
                Err(_) => replies::batch_invalid(raw),
            }
        }))
        .await;

        self.sessions.arm_timer(chat_id);

        Dispatched {
            kind: QueryKind::Batch,
            text: lines.join("\n"),
        }
    }
}
