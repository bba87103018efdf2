use std::{future::Future, io};

use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// Turns an interrupt signal into a cancellation of the crawl token.
pub(crate) struct ShutdownListener {
    tracker: TaskTracker,
    done: CancellationToken,
}

impl ShutdownListener {
    pub(crate) fn spawn<F>(signal: F, token: CancellationToken) -> Self
    where
        F: Future<Output = io::Result<()>> + Send + 'static,
    {
        let tracker = TaskTracker::new();
        let done = CancellationToken::new();
        let stop = done.clone();
        tracker.spawn(async move {
            tokio::select! {
                res = signal => match res {
                    Ok(()) => {
                        tracing::warn!("crawler: interrupt received, stopping after current step");
                        token.cancel();
                    }
                    Err(error) => tracing::error!("Failed to listen for event: {:?}", error),
                },
                _ = stop.cancelled() => {}
            }
        });
        tracker.close();
        Self { tracker, done }
    }

    /// Stops listening once the run is over.
    pub(crate) async fn stop(self) {
        self.done.cancel();
        self.tracker.wait().await;
    }
}
