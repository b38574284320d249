//! Per-connection echo: every byte read from a peer is written back to it.

use tokio::io;

use crate::{Error, PendingConnection, Result};

/// Copies the connection onto itself until the peer stops sending, returning
/// how many bytes went round. The stream is closed on return either way.
pub async fn handle(conn: PendingConnection) -> Result<u64> {
    let PendingConnection { mut stream, peer } = conn;
    let (mut reader, mut writer) = stream.split();
    io::copy(&mut reader, &mut writer)
        .await
        .map_err(|source| Error::Connection { peer, source })
}

/// Runs [`handle`] on its own task and reports the outcome. Nothing waits on
/// the task, and its failure stays with it.
pub fn spawn(conn: PendingConnection) {
    tokio::spawn(async move {
        let peer = conn.peer;
        match handle(conn).await {
            Ok(copied) => tracing::info!("Copied {copied} bytes for {peer}"),
            Err(err) => tracing::error!("Error when handling connection: {err}"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Listener;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn connected_pair() -> (TcpStream, PendingConnection) {
        let listener = Listener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let conn = listener.accept().await.unwrap();
        (client, conn)
    }

    #[tokio::test]
    async fn echoes_ping() {
        let (mut client, conn) = connected_pair().await;
        let handler = tokio::spawn(handle(conn));

        client.write_all(b"ping").await.unwrap();
        client.shutdown().await.unwrap();
        let mut echoed = Vec::new();
        client.read_to_end(&mut echoed).await.unwrap();

        assert_eq!(echoed, b"ping");
        assert_eq!(handler.await.unwrap().unwrap(), 4);
    }

    #[tokio::test]
    async fn immediate_close_copies_nothing() {
        let (client, conn) = connected_pair().await;
        drop(client);
        assert_eq!(handle(conn).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn echoes_large_payload_in_order() {
        let (client, conn) = connected_pair().await;
        let handler = tokio::spawn(handle(conn));

        let mut payload = vec![0u8; 1 << 20];
        fastrand::fill(&mut payload);
        let (mut reader, mut writer) = client.into_split();
        let sent = payload.clone();
        let sender = tokio::spawn(async move {
            writer.write_all(&sent).await.unwrap();
            writer.shutdown().await.unwrap();
        });
        let mut echoed = Vec::with_capacity(payload.len());
        reader.read_to_end(&mut echoed).await.unwrap();
        sender.await.unwrap();

        assert_eq!(echoed, payload);
        assert_eq!(handler.await.unwrap().unwrap(), payload.len() as u64);
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn reset_by_peer_is_connection_error() {
        let (mut client, conn) = connected_pair().await;
        let peer = conn.peer;
        client.write_all(b"abc").await.unwrap();
        client.set_linger(Some(Duration::ZERO)).unwrap();
        drop(client);

        match handle(conn).await {
            Err(err @ Error::Connection { .. }) => {
                assert!(err.to_string().starts_with(&format!("{peer}: ")), "{err}");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
