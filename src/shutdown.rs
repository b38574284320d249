//! The main control loop and the interrupt signal that ends it.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{dispatch, echo, Listener};

/// Process-wide stop request, observed only by [`serve`].
pub struct StopSignal(CancellationToken);

impl StopSignal {
    /// Fires on the first Ctrl-C / SIGINT. Must be called inside the runtime.
    pub fn ctrl_c() -> Self {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Interrupt received, shutting down");
                    trigger.cancel();
                }
                // keep serving, the process can still be killed
                Err(err) => tracing::error!("Unable to listen for interrupt: {err}"),
            }
        });
        Self(token)
    }

    /// Fires when `token` is cancelled.
    pub fn from_token(token: CancellationToken) -> Self {
        Self(token)
    }

    async fn stopped(&self) {
        self.0.cancelled().await
    }
}

/// Serves echo connections from `listener` until `stop` fires.
///
/// Accepted connections wait in a queue of `queue_capacity` slots, each one
/// is handed to its own echo task as soon as it's dequeued. On stop the loop
/// exits without draining the queue or waiting on echo tasks, then closes the
/// listener and returns once its socket has been released.
pub async fn serve(listener: Listener, stop: StopSignal, queue_capacity: usize) {
    let close = listener.close_handle();
    let (tx, mut rx) = mpsc::channel(queue_capacity.max(1));
    let accept_task = dispatch::spawn(listener, tx);

    // once accepting fails for good only stop is left to wait on
    let mut accepting = true;
    loop {
        tokio::select! {
            _ = stop.stopped() => break,
            conn = rx.recv(), if accepting => match conn {
                Some(conn) => echo::spawn(conn),
                None => accepting = false,
            },
        }
    }

    drop(rx);
    close.close();
    if let Err(err) = accept_task.await {
        tracing::error!("accept task failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn stops_with_nothing_in_flight() {
        let listener = Listener::bind("127.0.0.1:0").await.unwrap();
        let token = CancellationToken::new();
        let server = tokio::spawn(serve(listener, StopSignal::from_token(token.clone()), 4));
        token.cancel();
        timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn stop_already_requested_returns_promptly() {
        let listener = Listener::bind("127.0.0.1:0").await.unwrap();
        let token = CancellationToken::new();
        token.cancel();
        timeout(Duration::from_secs(5), serve(listener, StopSignal::from_token(token), 1))
            .await
            .unwrap();
    }
}
