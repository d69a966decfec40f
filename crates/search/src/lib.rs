//! Plate query dispatch: single vs. batch routing and reply composition.

pub mod dispatcher;
pub mod replies;

pub use dispatcher::{Dispatched, QueryDispatcher, QueryKind, split_tokens};

/// Command (without the leading `/`) that starts a single-plate search.
pub const SEARCH_COMMAND: &str = "consultar";
