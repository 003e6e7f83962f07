//! Deferred navigation to the login page once a session has ended.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Performs the actual navigation. In a browser this would change the
/// location, in the CLI it drops the cached session.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate(&self, target: &str) {
        self(target)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, target: &str) {
        info!(%target, "navigating to login page");
    }
}

/// Holds at most one pending navigation.
pub struct RedirectScheduler {
    navigator: Arc<dyn Navigator>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for RedirectScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectScheduler").finish_non_exhaustive()
    }
}

impl RedirectScheduler {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        RedirectScheduler {
            navigator,
            pending: Mutex::new(None),
        }
    }

    /// Navigate to `target` after `delay`. Returns false if a navigation was
    /// already pending, in which case that one stands and this is dropped.
    pub async fn schedule(&self, target: &str, delay: Duration) -> bool {
        let mut pending = self.pending.lock().await;
        if let Some(handle) = pending.as_ref() {
            if !handle.is_finished() {
                debug!(%target, "redirect already pending, coalescing");
                return false;
            }
        }

        debug!(%target, ?delay, "scheduling redirect");
        let navigator = self.navigator.clone();
        let target = target.to_string();
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(&target);
        }));
        true
    }

    /// Abort a pending navigation. Returns true if one was cancelled.
    pub async fn cancel(&self) -> bool {
        let mut pending = self.pending.lock().await;
        match pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                debug!("pending redirect cancelled");
                true
            }
            _ => false,
        }
    }

    pub async fn is_pending(&self) -> bool {
        let pending = self.pending.lock().await;
        pending
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Wait for a pending navigation to happen.
    pub async fn wait(&self) {
        let handle = self.pending.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!(?e, "redirect task failed");
                }
            }
        }
    }

    /// Navigate straight away, replacing anything pending.
    pub async fn navigate_now(&self, target: &str) {
        self.cancel().await;
        self.navigator.navigate(target);
    }
}
