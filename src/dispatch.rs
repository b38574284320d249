//! The accept task: moves connections from the listener into the intake queue.

use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

use crate::{Error, Listener, PendingConnection};

/// Accepts connections on `listener` until accepting fails, pushing each one
/// onto `queue` in accept order. A full queue pauses accepting, so nothing is
/// dropped. The listener is dropped, releasing its socket, when the task ends.
pub fn spawn(listener: Listener, queue: Sender<PendingConnection>) -> JoinHandle<()> {
    tokio::spawn(accept_loop(listener, queue))
}

async fn accept_loop(listener: Listener, queue: Sender<PendingConnection>) {
    loop {
        let conn = match listener.accept().await {
            Ok(conn) => conn,
            Err(err @ Error::ListenerClosed) => {
                tracing::info!("Failed to accept connection: {err}");
                break;
            }
            Err(err) => {
                tracing::error!("Failed to accept connection: {err}");
                break;
            }
        };
        tracing::trace!("{} connected", conn.peer);
        if queue.send(conn).await.is_err() {
            tracing::debug!("intake queue closed, no longer accepting");
            break;
        }
    }
}
