use std::{future::Future, time::Duration};

use {
    async_trait::async_trait,
    mapion_search::replies,
    mapion_sessions::ExpiryNotifier,
    teloxide::{
        RequestError,
        payloads::SendMessageSetters,
        prelude::*,
        types::{ChatAction, ChatId, KeyboardMarkup},
    },
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

/// Telegram's per-message text limit.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Outbound message sender for Telegram.
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send plain text, split into several messages if it is too long.
    pub async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        let chat_id = parse_chat_id(to)?;
        let chunks = chunk_lines(text, TELEGRAM_MAX_MESSAGE_LEN);
        debug!(chat_id = to, chunks = chunks.len(), "sending telegram reply");

        for chunk in &chunks {
            self.run_telegram_request_with_retry(to, "send message", || {
                let req = self.bot.send_message(chat_id, chunk.as_str());
                async move { req.await }
            })
            .await?;
        }
        Ok(())
    }

    /// Send text with a reply keyboard attached.
    pub async fn send_with_keyboard(
        &self,
        to: &str,
        text: &str,
        keyboard: KeyboardMarkup,
    ) -> Result<()> {
        let chat_id = parse_chat_id(to)?;
        self.run_telegram_request_with_retry(to, "send keyboard", || {
            let req = self
                .bot
                .send_message(chat_id, text)
                .reply_markup(keyboard.clone());
            async move { req.await }
        })
        .await?;
        Ok(())
    }

    /// Best-effort typing indicator while lookups run.
    pub async fn send_typing(&self, to: &str) {
        let Ok(chat_id) = parse_chat_id(to) else {
            return;
        };
        if let Err(e) = self.bot.send_chat_action(chat_id, ChatAction::Typing).await {
            debug!(chat_id = to, error = %e, "failed to send typing action");
        }
    }

    async fn run_telegram_request_with_retry<T, F, Fut>(
        &self,
        to: &str,
        operation: &'static str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id = to,
                            operation,
                            retries,
                            max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        chat_id = to,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

#[async_trait]
impl ExpiryNotifier for TelegramOutbound {
    async fn session_expired(&self, chat_id: &str) {
        if let Err(e) = self.send_text(chat_id, replies::SESSION_EXPIRED).await {
            warn!(chat_id, error = %e, "failed to send session expiry notice");
        }
    }
}

fn parse_chat_id(to: &str) -> Result<ChatId> {
    to.parse::<i64>()
        .map(ChatId)
        .map_err(|_| Error::InvalidChatId(to.to_string()))
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

/// Split `text` into chunks of at most `max_chars` characters, breaking on
/// line boundaries where possible. Lines longer than the limit are split
/// mid-line.
fn chunk_lines(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.split('\n') {
        let mut rest = line;
        loop {
            let line_len = rest.chars().count();
            let sep = usize::from(!current.is_empty());
            if current_len + sep + line_len <= max_chars {
                if sep == 1 {
                    current.push('\n');
                }
                current.push_str(rest);
                current_len += sep + line_len;
                break;
            }
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
                continue;
            }
            let split_at = rest
                .char_indices()
                .nth(max_chars)
                .map_or(rest.len(), |(i, _)| i);
            chunks.push(rest[..split_at].to_string());
            rest = &rest[split_at..];
            if rest.is_empty() {
                break;
            }
        }
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}
