//! TCP transport carrying length-prefixed frames.

use std::future::Future;
use std::net::SocketAddr;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::trace;

use super::StreamPair;
use crate::error::{Error, Result};
use crate::protocol::{Codec, Message};

/// Initial capacity of the receive buffer.
const RECV_BUFFER_SIZE: usize = 128 * 1024;

/// Minimum free space made available before each socket read.
const RECV_READ_SIZE: usize = 16 * 1024;

/// A message stream over one TCP connection.
///
/// [`StreamPair::close`] drops the write half, which shuts down the
/// sending side so the peer sees end of stream. Receiving keeps working.
pub struct TcpTransport {
    reader: OwnedReadHalf,
    /// `None` once closed.
    writer: Option<OwnedWriteHalf>,
    recv_buf: BytesMut,
    send_buf: BytesMut,
    peer: SocketAddr,
}

impl TcpTransport {
    /// Wrap an accepted or connected socket.
    pub fn new(stream: TcpStream) -> Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader,
            writer: Some(writer),
            recv_buf: BytesMut::with_capacity(RECV_BUFFER_SIZE),
            send_buf: BytesMut::new(),
            peer,
        })
    }

    /// Connect to a server.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::Transport {
                message: format!("failed to connect: {}", e),
            })?;
        Self::new(stream)
    }

    /// Address of the remote peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl StreamPair for TcpTransport {
    fn send(&mut self, msg: &Message) -> impl Future<Output = Result<()>> + Send {
        async move {
            let Some(writer) = self.writer.as_mut() else {
                return Err(Error::ConnectionClosed);
            };

            self.send_buf.clear();
            Codec::encode_into(msg, &mut self.send_buf)?;
            trace!(peer = %self.peer, kind = msg.kind(), len = self.send_buf.len(), "tcp send");

            writer
                .write_all(&self.send_buf)
                .await
                .map_err(|e| Error::Transport {
                    message: format!("send to {} failed: {}", self.peer, e),
                })
        }
    }

    fn recv(&mut self) -> impl Future<Output = Result<Message>> + Send {
        async move {
            loop {
                if let Some(msg) = Codec::decode(&mut self.recv_buf)? {
                    trace!(peer = %self.peer, kind = msg.kind(), "tcp recv");
                    return Ok(msg);
                }

                self.recv_buf.reserve(RECV_READ_SIZE);
                let n = self
                    .reader
                    .read_buf(&mut self.recv_buf)
                    .await
                    .map_err(|e| Error::Transport {
                        message: format!("recv from {} failed: {}", self.peer, e),
                    })?;

                if n == 0 {
                    if !self.recv_buf.is_empty() {
                        return Err(Error::Transport {
                            message: format!(
                                "connection closed mid-frame ({} bytes buffered)",
                                self.recv_buf.len()
                            ),
                        });
                    }
                    trace!(peer = %self.peer, "tcp recv EOF");
                    return Err(Error::ConnectionClosed);
                }
            }
        }
    }

    fn close(&mut self) {
        if self.writer.take().is_some() {
            trace!(peer = %self.peer, "tcp write half shut down");
        }
    }
}
