use std::sync::Arc;

use {mapion_search::QueryDispatcher, tokio_util::sync::CancellationToken};

use crate::outbound::TelegramOutbound;

/// Runtime state shared by the polling loop and every update task.
pub struct BotState {
    pub bot: teloxide::Bot,
    pub bot_username: Option<String>,
    pub dispatcher: QueryDispatcher,
    pub outbound: Arc<TelegramOutbound>,
    pub cancel: CancellationToken,
}
