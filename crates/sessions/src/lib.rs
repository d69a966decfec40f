//! Per-conversation search sessions.
//!
//! A session carries the conversation's search mode and a single expiry
//! timer. Re-arming the timer cancels the previous one, so one idle period
//! produces at most one expiry notice.

pub mod store;
pub mod timer;

pub use store::{ExpiryNotifier, SearchMode, SessionStore};
