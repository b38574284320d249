use std::io;
use std::net::SocketAddr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The listen address is malformed, taken, or not ours to bind.
    #[error("unable to listen on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The listener was closed, which is how accepting normally ends.
    #[error("listener closed")]
    ListenerClosed,

    /// Accepting failed for a reason other than the listener closing.
    #[error("{0}")]
    Accept(#[source] io::Error),

    /// Reading from or writing to one peer failed.
    #[error("{peer}: {source}")]
    Connection {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },
}
