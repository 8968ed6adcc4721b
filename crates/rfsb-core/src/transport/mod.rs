//! Transport abstractions for rfsb.
//!
//! The fetch pipeline only needs an ordered, bidirectional message stream
//! with a way to detect the peer going away:
//! - `TcpTransport` over a real socket
//! - `MockStream` (rfsb-test-utils) over in-memory channels

mod tcp;

pub use tcp::TcpTransport;

use std::future::Future;

use crate::error::Result;
use crate::protocol::Message;

/// A bidirectional stream for sending and receiving messages.
///
/// Messages are delivered in order in each direction. `recv` returns
/// `Error::ConnectionClosed` once the peer has gone away.
pub trait StreamPair: Send {
    /// Send a message on this stream.
    fn send(&mut self, msg: &Message) -> impl Future<Output = Result<()>> + Send;

    /// Receive a message from this stream.
    fn recv(&mut self) -> impl Future<Output = Result<Message>> + Send;

    /// Close the stream. Further sends fail.
    fn close(&mut self);
}
