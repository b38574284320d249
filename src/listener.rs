use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// An accepted connection that hasn't been handed to a handler yet.
#[derive(Debug)]
pub struct PendingConnection {
    pub stream: TcpStream,
    pub peer: SocketAddr,
}

/// The server's single listening socket.
///
/// The socket is released when the `Listener` is dropped. Closing it through
/// a [`CloseHandle`] only makes [`Listener::accept`] fail from then on, so
/// whoever owns the listener stops accepting and drops it.
pub struct Listener {
    inner: TcpListener,
    closed: CancellationToken,
}

#[derive(Clone)]
pub struct CloseHandle(CancellationToken);

impl CloseHandle {
    /// Safe to call any number of times, from any task.
    pub fn close(&self) {
        self.0.cancel();
    }
}

impl Listener {
    pub async fn bind(address: &str) -> Result<Self> {
        let inner = TcpListener::bind(address)
            .await
            .map_err(|source| Error::Bind {
                address: address.to_owned(),
                source,
            })?;
        Ok(Self {
            inner,
            closed: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle(self.closed.clone())
    }

    /// Waits for the next peer. Returns [`Error::ListenerClosed`] as soon as
    /// the listener is closed, even if a call is already waiting.
    pub async fn accept(&self) -> Result<PendingConnection> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(Error::ListenerClosed),
            accepted = self.inner.accept() => {
                let (stream, peer) = accepted.map_err(Error::Accept)?;
                Ok(PendingConnection { stream, peer })
            },
        }
    }
}
