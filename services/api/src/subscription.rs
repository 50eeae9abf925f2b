//! Live query subscriptions.
//!
//! A subscription couples a change-hub receiver with a query closure: it
//! runs the query once immediately, then re-runs it after every hub event
//! for its topic, delivering the complete current result each time. The
//! consumer never sees diffs, only full snapshots, so a missed event at
//! worst delays a snapshot rather than corrupting state.

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

/// A live query handle. Dropping it (or calling [`cancel`](Self::cancel))
/// stops the background task and releases the hub receiver.
pub struct Subscription<T> {
    rx: mpsc::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Subscription<T> {
    /// Spawn the refresh loop: deliver one snapshot now, then one after
    /// every event on `events`.
    pub(crate) fn start<F, Fut>(mut events: broadcast::Receiver<()>, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = T> + Send,
    {
        let (tx, rx) = mpsc::channel(8);

        let task = tokio::spawn(async move {
            loop {
                let snapshot = fetch().await;
                if tx.send(snapshot).await.is_err() {
                    // Consumer dropped the handle.
                    break;
                }

                match events.recv().await {
                    Ok(()) => {}
                    // Falling behind is fine: the next refetch reads the
                    // current state, which already folds in every missed
                    // event.
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        debug!("Subscription lagged by {} events, refetching", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self { rx, task }
    }

    /// Receive the next snapshot, or `None` once the subscription ends.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Explicitly stop the subscription.
    pub fn cancel(self) {
        // Drop runs the abort.
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
