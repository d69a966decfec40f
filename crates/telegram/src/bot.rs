use std::{sync::Arc, time::Duration};

use {
    mapion_config::TelegramConfig,
    mapion_registry::PlateLookup,
    mapion_search::QueryDispatcher,
    mapion_sessions::{ExpiryNotifier, SessionStore},
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, Update},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    commands,
    error::{Error, Result},
    handlers,
    outbound::TelegramOutbound,
    state::BotState,
};

/// Added to the long-poll timeout for the HTTP client timeout.
const CLIENT_TIMEOUT_MARGIN: Duration = Duration::from_secs(15);

const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// A running polling loop.
pub struct PollingHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollingHandle {
    /// Token that stops the loop; also cancelled by the loop itself when
    /// another instance takes over the bot token.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop polling and wait for the loop to exit. Update tasks already
    /// spawned are left to finish on their own.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "telegram polling task ended abnormally");
        }
    }
}

/// Connect the bot and start long polling.
///
/// Also creates the session store, whose expiry notices go out through the
/// bot's outbound sender.
pub async fn start_polling(
    config: &TelegramConfig,
    lookup: Arc<dyn PlateLookup>,
    idle_timeout: Duration,
) -> Result<PollingHandle> {
    if !config.has_token() {
        return Err(Error::message("telegram bot token is not configured"));
    }

    let poll_timeout = config.poll_timeout_secs;
    let bot = build_bot(config.token.expose_secret(), poll_timeout)?;

    // Verify credentials and get bot username.
    let me = bot.get_me().await?;
    let bot_username = me.username.clone();

    // Delete any existing webhook so long polling works.
    bot.delete_webhook().send().await?;

    if let Err(e) = bot.set_my_commands(commands::bot_commands()).await {
        warn!(error = %e, "failed to register bot commands");
    }

    info!(
        username = ?bot_username,
        idle_secs = idle_timeout.as_secs(),
        "telegram bot connected (webhook cleared)"
    );

    let outbound = Arc::new(TelegramOutbound::new(bot.clone()));
    let sessions = SessionStore::new(
        Arc::clone(&outbound) as Arc<dyn ExpiryNotifier>,
        idle_timeout,
    );
    let cancel = CancellationToken::new();
    let state = Arc::new(BotState {
        bot,
        bot_username,
        dispatcher: QueryDispatcher::new(lookup, sessions),
        outbound,
        cancel: cancel.clone(),
    });

    let task = tokio::spawn(poll_updates(state, poll_timeout));
    Ok(PollingHandle { cancel, task })
}

/// Bot whose HTTP client outlives one long poll.
fn build_bot(token: &str, poll_timeout: u32) -> Result<Bot> {
    // teloxide pins its own reqwest, so its error type is not ours.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(poll_timeout)) + CLIENT_TIMEOUT_MARGIN)
        .build()
        .map_err(|e| Error::message(format!("building telegram http client: {e}")))?;
    Ok(Bot::with_client(token, client))
}

async fn poll_updates(state: Arc<BotState>, poll_timeout: u32) {
    info!("starting telegram manual polling loop");
    let mut offset: i32 = 0;

    loop {
        let request = state
            .bot
            .get_updates()
            .offset(offset)
            .timeout(poll_timeout)
            .allowed_updates(vec![AllowedUpdate::Message])
            .send();

        let result = tokio::select! {
            () = state.cancel.cancelled() => break,
            result = request => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    spawn_update(update, &state);
                }
            },
            Err(e) => {
                // Another bot instance is running with the same token.
                if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                    warn!(
                        "telegram polling disabled: another instance is already running with this token"
                    );
                    state.cancel.cancel();
                    break;
                }

                warn!(error = %e, "telegram getUpdates failed");
                tokio::select! {
                    () = state.cancel.cancelled() => break,
                    () = tokio::time::sleep(POLL_ERROR_BACKOFF) => {},
                }
            },
        }
    }

    info!("telegram polling stopped");
}

/// One task per update.
fn spawn_update(update: Update, state: &Arc<BotState>) {
    tokio::spawn(handlers::handle_update(update, Arc::clone(state)));
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        async_trait::async_trait,
        mapion_registry::{LookupResult, NormalizedPlate},
    };

    use super::*;

    struct NeverCalled;

    #[async_trait]
    impl PlateLookup for NeverCalled {
        async fn lookup(&self, _plate: &NormalizedPlate) -> LookupResult {
            panic!("no lookup expected");
        }
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let result = start_polling(
            &TelegramConfig::default(),
            Arc::new(NeverCalled),
            Duration::from_secs(600),
        )
        .await;
        assert!(matches!(result, Err(Error::Message { .. })));
    }

    #[test]
    fn bot_client_builds_without_network() {
        let bot = build_bot("123:ABC", 30).unwrap();
        assert_eq!(bot.token(), "123:ABC");
    }
}
