//! Telegram front-end for mapion.
//!
//! Long-polls the Bot API, routes commands, hands plate queries to the
//! dispatcher and sends replies and session expiry notices back.

pub mod bot;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod outbound;
pub mod state;

#[cfg(test)]
mod testing;

pub use {
    bot::{PollingHandle, start_polling},
    error::{Error, Result},
    outbound::TelegramOutbound,
};
