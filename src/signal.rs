use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::TransportError;

/// Cancellation signal shared between a caller and its in-flight request.
///
/// Clones observe the same state. The client checks it before every attempt,
/// and races both the transport call and the backoff wait against it.
#[derive(Clone, Debug)]
pub struct AbortSignal {
    notify: Arc<watch::Sender<bool>>,
}

impl Default for AbortSignal {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            notify: Arc::new(tx),
        }
    }
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation. Idempotent.
    pub fn abort(&self) {
        self.notify.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.notify.borrow()
    }

    /// Resolves once [`AbortSignal::abort`] has been called.
    pub async fn aborted(&self) {
        let mut rx = self.notify.subscribe();
        // The sender lives in `self`, so `changed` cannot fail while we wait.
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

/// Runs `fut` unless `signal` fires first.
pub(crate) async fn abortable<F>(
    signal: Option<&AbortSignal>,
    fut: F,
) -> Result<F::Output, TransportError>
where
    F: Future,
{
    let Some(signal) = signal else {
        return Ok(fut.await);
    };
    tokio::select! {
        biased;
        _ = signal.aborted() => Err(TransportError::Aborted),
        output = fut => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{abortable, AbortSignal};
    use crate::TransportError;

    #[test]
    fn clones_share_state() {
        let signal = AbortSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_aborted());
        signal.abort();
        signal.abort();
        assert!(observer.is_aborted());
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_wakes_waiters() {
        let signal = AbortSignal::new();
        let trigger = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.abort();
        });

        let result = abortable(
            Some(&signal),
            tokio::time::sleep(Duration::from_secs(60)),
        )
        .await;
        assert!(matches!(result, Err(TransportError::Aborted)));
    }

    #[tokio::test]
    async fn runs_to_completion_without_signal() {
        let result = abortable(None, async { 7 }).await;
        assert!(matches!(result, Ok(7)));
    }
}
