use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    tracing::{debug, info},
};

use crate::timer::ExpiryTimer;

/// Default idle window before a session expires.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// What the next message in a conversation is expected to be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// Any message is handled as a batch query.
    #[default]
    Idle,
    /// The search command was issued; the next message may be a single plate.
    AwaitingSingleQuery,
}

/// Receives the notice when a session's idle window elapses.
#[async_trait]
pub trait ExpiryNotifier: Send + Sync {
    async fn session_expired(&self, chat_id: &str);
}

#[derive(Debug, Default)]
struct SessionState {
    mode: SearchMode,
    timer: Option<ExpiryTimer>,
    /// Whether `timer` sends the expiry notice. A search that was begun but
    /// never dispatched only gets a silent cleanup timer.
    notifies: bool,
}

impl SessionState {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

struct Inner {
    sessions: Mutex<HashMap<String, SessionState>>,
    notifier: Arc<dyn ExpiryNotifier>,
    idle_timeout: Duration,
    next_generation: AtomicU64,
}

impl Inner {
    /// std mutex: every critical section is a synchronous map operation and is
    /// never held across an `.await`.
    fn sessions(&self) -> MutexGuard<'_, HashMap<String, SessionState>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Session values keyed by conversation id.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new(notifier: Arc<dyn ExpiryNotifier>, idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: Mutex::new(HashMap::new()),
                notifier,
                idle_timeout,
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// Create or update the session so the next message may be a single query.
    ///
    /// Unless an expiry notice is already pending, the session is discarded
    /// silently after the idle window if no message follows.
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin_search(&self, chat_id: &str) {
        let mut sessions = self.inner.sessions();
        let state = sessions.entry(chat_id.to_string()).or_default();
        state.mode = SearchMode::AwaitingSingleQuery;
        if !state.notifies {
            state.cancel_timer();
            state.timer = Some(self.schedule(chat_id));
        }
        debug!(chat_id, "search session awaiting single query");
    }

    /// Current mode without consuming it.
    pub fn mode(&self, chat_id: &str) -> SearchMode {
        self.inner
            .sessions()
            .get(chat_id)
            .map(|s| s.mode)
            .unwrap_or_default()
    }

    /// Return the current mode and reset it to [`SearchMode::Idle`].
    ///
    /// The awaiting flag applies to exactly one message, whichever branch ends
    /// up handling it. A session left with no pending expiry notice is
    /// dropped here; a later [`arm_timer`](Self::arm_timer) recreates it.
    pub fn take_mode(&self, chat_id: &str) -> SearchMode {
        let mut sessions = self.inner.sessions();
        let Some(state) = sessions.get_mut(chat_id) else {
            return SearchMode::Idle;
        };
        let mode = std::mem::take(&mut state.mode);
        if !state.notifies
            && let Some(mut state) = sessions.remove(chat_id)
        {
            state.cancel_timer();
            debug!(chat_id, "search session closed");
        }
        mode
    }

    /// (Re)start the expiry timer for `chat_id`, cancelling any pending one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm_timer(&self, chat_id: &str) {
        // Scheduled under the lock so the timer cannot observe the map before
        // it has been registered as current.
        let mut sessions = self.inner.sessions();
        let timer = self.schedule(chat_id);
        let generation = timer.generation();
        let state = sessions.entry(chat_id.to_string()).or_default();
        state.cancel_timer();
        state.timer = Some(timer);
        state.notifies = true;
        debug!(
            chat_id,
            generation,
            idle_secs = self.inner.idle_timeout.as_secs(),
            "session timer armed"
        );
    }

    fn schedule(&self, chat_id: &str) -> ExpiryTimer {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        ExpiryTimer::schedule(
            generation,
            self.inner.idle_timeout,
            expire(
                Arc::downgrade(&self.inner),
                chat_id.to_string(),
                generation,
            ),
        )
    }

    #[cfg(test)]
    fn has_pending_timer(&self, chat_id: &str) -> bool {
        self.inner
            .sessions()
            .get(chat_id)
            .filter(|s| s.notifies)
            .and_then(|s| s.timer.as_ref())
            .is_some_and(|t| !t.is_finished())
    }

    pub fn len(&self) -> usize {
        self.inner.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Timer body: destroy the session, but only if this timer is still the one
/// armed for the conversation. Notifies when the session had dispatched a
/// query.
async fn expire(inner: Weak<Inner>, chat_id: String, generation: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };

    let removed = {
        let mut sessions = inner.sessions();
        let is_current = sessions
            .get(&chat_id)
            .and_then(|s| s.timer.as_ref())
            .is_some_and(|t| t.generation() == generation);
        if is_current {
            sessions.remove(&chat_id)
        } else {
            None
        }
    };

    match removed {
        Some(state) if state.notifies => {
            info!(chat_id = %chat_id, "search session expired");
            inner.notifier.session_expired(&chat_id).await;
        },
        Some(_) => debug!(chat_id = %chat_id, "unused search session discarded"),
        None => debug!(chat_id = %chat_id, generation, "stale session timer ignored"),
    }
}
