use std::{future::Future, time::Duration};

use tokio::task::JoinHandle;

/// A cancellable deferred task tagged with the generation it was armed for.
///
/// Dropping an `ExpiryTimer` detaches the task rather than aborting it; call
/// [`ExpiryTimer::cancel`] to stop it.
#[derive(Debug)]
pub struct ExpiryTimer {
    handle: JoinHandle<()>,
    generation: u64,
}

impl ExpiryTimer {
    /// Run `on_fire` after `delay` on the current tokio runtime.
    pub fn schedule<F>(generation: u64, delay: Duration, on_fire: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire.await;
        });
        Self { handle, generation }
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let timer = ExpiryTimer::schedule(7, Duration::from_secs(10), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(timer.generation(), 7);

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let timer = ExpiryTimer::schedule(1, Duration::from_secs(10), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel();

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
