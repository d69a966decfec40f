use std::sync::Arc;

use {
    teloxide::types::{Message, Update, UpdateKind},
    tracing::{debug, error, info},
};

use crate::{
    commands::{self, Command},
    error::Result,
    state::BotState,
};

/// Entry point for one polled update. Runs in its own task.
pub async fn handle_update(update: Update, state: Arc<BotState>) {
    match update.kind {
        UpdateKind::Message(msg) => {
            let chat_id = msg.chat.id.0;
            if let Err(e) = handle_message(msg, &state).await {
                error!(chat_id, error = %e, "error handling telegram message");
            }
        },
        other => {
            debug!("ignoring non-message update: {other:?}");
        },
    }
}

/// Route one inbound message: photos get a fixed reply, slash commands go to
/// the command handlers, any other text goes to the query dispatcher.
pub async fn handle_message(msg: Message, state: &BotState) -> Result<()> {
    let chat_id = msg.chat.id.0.to_string();

    if msg.photo().is_some() {
        info!(chat_id, "photo received");
        return state
            .outbound
            .send_text(&chat_id, commands::PHOTO_REPLY)
            .await;
    }

    let Some(text) = msg.text() else {
        debug!(chat_id, "ignoring non-text message");
        return Ok(());
    };

    if let Some(command) = commands::parse_command(text, state.bot_username.as_deref()) {
        return handle_command(command, &msg, &chat_id, state).await;
    }

    state.outbound.send_typing(&chat_id).await;
    let dispatched = state.dispatcher.dispatch(&chat_id, text).await;
    state.outbound.send_text(&chat_id, &dispatched.text).await
}

async fn handle_command(
    command: Command,
    msg: &Message,
    chat_id: &str,
    state: &BotState,
) -> Result<()> {
    info!(chat_id, ?command, "command received");
    let outbound = &state.outbound;

    match command {
        Command::Start => {
            let first_name = msg.from.as_ref().map(|u| u.first_name.as_str());
            outbound
                .send_with_keyboard(
                    chat_id,
                    &commands::greeting(first_name),
                    commands::main_keyboard(),
                )
                .await
        },
        Command::Help => outbound.send_text(chat_id, commands::HELP_TEXT).await,
        Command::Date => {
            let now = chrono::Local::now();
            outbound
                .send_text(chat_id, &commands::date_reply(&now))
                .await
        },
        Command::Search(None) => {
            let prompt = state.dispatcher.begin_search(chat_id);
            outbound.send_text(chat_id, prompt).await
        },
        Command::Search(Some(query)) => {
            state.dispatcher.begin_search(chat_id);
            outbound.send_typing(chat_id).await;
            let dispatched = state.dispatcher.dispatch(chat_id, &query).await;
            outbound.send_text(chat_id, &dispatched.text).await
        },
        Command::Unknown(_) => outbound.send_text(chat_id, commands::UNKNOWN_COMMAND).await,
        Command::OtherBot => Ok(()),
    }
}
