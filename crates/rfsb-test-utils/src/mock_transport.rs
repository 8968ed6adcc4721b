//! In-memory transport for testing without a network.
//!
//! A `MockStream` pair behaves like the two ends of one connection: what
//! one side sends, the other receives in order. Dropping one side makes
//! the other see `Error::ConnectionClosed`.

use std::future::Future;

use tokio::sync::mpsc;

use rfsb_core::error::{Error, Result};
use rfsb_core::protocol::Message;
use rfsb_core::transport::StreamPair;

/// Default per-direction buffer, in messages.
const DEFAULT_CAPACITY: usize = 64;

/// One end of an in-memory bidirectional stream.
#[derive(Debug)]
pub struct MockStream {
    rx: mpsc::Receiver<Message>,
    tx: mpsc::Sender<Message>,
    closed: bool,
}

impl MockStream {
    /// Create a stream from channel endpoints.
    pub fn new(tx: mpsc::Sender<Message>, rx: mpsc::Receiver<Message>) -> Self {
        Self {
            rx,
            tx,
            closed: false,
        }
    }

    /// Check if this end has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Receive everything the peer sends until it goes away.
    pub async fn drain(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Some(msg) = self.rx.recv().await {
            messages.push(msg);
        }
        messages
    }
}

impl StreamPair for MockStream {
    fn send(&mut self, msg: &Message) -> impl Future<Output = Result<()>> + Send {
        async move {
            if self.closed {
                return Err(Error::ConnectionClosed);
            }
            self.tx
                .send(msg.clone())
                .await
                .map_err(|_| Error::ConnectionClosed)
        }
    }

    fn recv(&mut self) -> impl Future<Output = Result<Message>> + Send {
        async move {
            if self.closed {
                return Err(Error::ConnectionClosed);
            }
            self.rx.recv().await.ok_or(Error::ConnectionClosed)
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Create a connected pair of streams with the default buffer size.
pub fn mock_stream_pair() -> (MockStream, MockStream) {
    mock_stream_pair_with_capacity(DEFAULT_CAPACITY)
}

/// Create a connected pair of streams buffering `capacity` messages per direction.
pub fn mock_stream_pair_with_capacity(capacity: usize) -> (MockStream, MockStream) {
    let (tx1, rx1) = mpsc::channel(capacity);
    let (tx2, rx2) = mpsc::channel(capacity);
    (MockStream::new(tx1, rx2), MockStream::new(tx2, rx1))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rfsb_core::protocol::{BrowseRequest, FetchSummary};

    #[tokio::test]
    async fn mock_stream_send_recv() {
        let (mut client, mut server) = mock_stream_pair();

        let msg = Message::BrowseRequest(BrowseRequest { dir: "docs".into() });
        client.send(&msg).await.unwrap();
        assert_eq!(server.recv().await.unwrap(), msg);
    }

    #[tokio::test]
    async fn mock_stream_close() {
        let (mut client, _server) = mock_stream_pair();

        assert!(!client.is_closed());
        client.close();
        assert!(client.is_closed());

        let result = client.send(&Message::FetchEnd(FetchSummary::default())).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn dropped_peer_closes_connection() {
        let (mut client, server) = mock_stream_pair();
        drop(server);

        assert!(matches!(client.recv().await, Err(Error::ConnectionClosed)));
        let result = client.send(&Message::FetchEnd(FetchSummary::default())).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn drain_collects_until_peer_drops() {
        let (mut client, mut server) = mock_stream_pair();
        tokio::spawn(async move {
            for files in 0..3 {
                let summary = FetchSummary {
                    files,
                    ..FetchSummary::default()
                };
                client.send(&Message::FetchEnd(summary)).await.unwrap();
            }
        });

        let messages = server.drain().await;
        assert_eq!(messages.len(), 3);
    }
}
