//! Client side of a connection: browse and fetch requests.

use std::path::Path;

use tokio::net::ToSocketAddrs;
use tracing::{debug, info};

use rfsb_core::error::{Error, Result};
use rfsb_core::file::normalize;
use rfsb_core::protocol::{BrowseRequest, BrowseResponse, FetchRequest, Message};
use rfsb_core::transport::{StreamPair, TcpTransport};

use crate::reassembler::{ClientReassembler, FetchReport, FileReport};

/// A connection to an rfsb server.
pub struct Client<S: StreamPair> {
    stream: S,
}

impl Client<TcpTransport> {
    /// Connect over TCP.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let transport = TcpTransport::connect(addr).await?;
        info!(peer = %transport.peer_addr(), "Connected");
        Ok(Self::new(transport))
    }
}

impl<S: StreamPair> Client<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// List the direct children of a remote directory.
    pub async fn browse(&mut self, dir: &str) -> Result<BrowseResponse> {
        self.stream
            .send(&Message::BrowseRequest(BrowseRequest {
                dir: dir.to_string(),
            }))
            .await?;

        match self.stream.recv().await? {
            Message::BrowseResponse(response) => Ok(response),
            Message::Error(payload) => Err(Error::Remote {
                message: payload.message,
            }),
            other => Err(unexpected(&other)),
        }
    }

    /// Fetch files and directories into `dest`.
    pub async fn fetch(&mut self, request: FetchRequest, dest: &Path) -> Result<FetchReport> {
        self.fetch_with(request, dest, |_| {}).await
    }

    /// Fetch into `dest`, calling `on_file` as each file completes.
    ///
    /// Transport errors and malformed chunk sequences abort the fetch.
    pub async fn fetch_with<F>(
        &mut self,
        request: FetchRequest,
        dest: &Path,
        mut on_file: F,
    ) -> Result<FetchReport>
    where
        F: FnMut(&FileReport) + Send,
    {
        let dest = if dest.is_absolute() {
            normalize(dest)
        } else {
            normalize(&std::env::current_dir()?.join(dest))
        };
        debug!(
            dirs = request.dirs.len(),
            files = request.files.len(),
            dest = %dest.display(),
            "Sending fetch request"
        );
        self.stream.send(&Message::FetchRequest(request)).await?;

        let mut reassembler = ClientReassembler::new(dest);
        let summary = loop {
            match self.stream.recv().await? {
                Message::Chunk(chunk) => {
                    if let Some(report) = reassembler.accept(chunk).await? {
                        on_file(&report);
                    }
                }
                Message::FetchEnd(summary) => break summary,
                Message::Error(payload) => {
                    return Err(Error::Remote {
                        message: payload.message,
                    });
                }
                other => return Err(unexpected(&other)),
            }
        };

        let report = reassembler.finish(Some(summary));
        info!(
            files = report.files.len(),
            verified = report.verified_count(),
            chunks = summary.chunks,
            bytes = summary.bytes,
            "Fetch finished"
        );
        Ok(report)
    }

    /// Close the connection.
    pub fn close(mut self) {
        self.stream.close();
    }
}

fn unexpected(msg: &Message) -> Error {
    Error::Protocol {
        message: format!("unexpected message: {}", msg.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfsb_core::file::digest_hex;
    use rfsb_core::protocol::{Chunk, ErrorPayload, FetchSummary};
    use rfsb_test_utils::mock_stream_pair;
    use tempfile::tempdir;

    #[tokio::test]
    async fn browse_maps_remote_error() {
        let (client_end, mut server_end) = mock_stream_pair();
        let mut client = Client::new(client_end);

        let server = tokio::spawn(async move {
            let request = server_end.recv().await.unwrap();
            assert!(matches!(request, Message::BrowseRequest(ref r) if r.dir == "missing"));
            server_end
                .send(&Message::Error(ErrorPayload {
                    message: "not found: missing".into(),
                }))
                .await
                .unwrap();
        });

        let err = client.browse("missing").await.unwrap_err();
        assert!(matches!(err, Error::Remote { message } if message.contains("missing")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn fetch_reports_each_file() {
        let dir = tempdir().unwrap();
        let (client_end, mut server_end) = mock_stream_pair();
        let mut client = Client::new(client_end);

        let server = tokio::spawn(async move {
            assert!(matches!(server_end.recv().await.unwrap(), Message::FetchRequest(_)));
            server_end
                .send(&Message::Chunk(Chunk {
                    name: "x/one.txt".into(),
                    size: 3,
                    data: b"one".to_vec(),
                    part: 1,
                    parts: 1,
                    digest: Some(digest_hex(b"one")),
                }))
                .await
                .unwrap();
            server_end
                .send(&Message::FetchEnd(FetchSummary {
                    files: 1,
                    chunks: 1,
                    bytes: 3,
                }))
                .await
                .unwrap();
        });

        let mut seen = Vec::new();
        let report = client
            .fetch_with(
                FetchRequest::new(["x"], Vec::<String>::new()),
                dir.path(),
                |file| seen.push(file.name.clone()),
            )
            .await
            .unwrap();
        server.await.unwrap();

        assert_eq!(seen, vec!["x/one.txt"]);
        assert!(report.all_verified());
        assert_eq!(std::fs::read(dir.path().join("x/one.txt")).unwrap(), b"one");
    }

    #[tokio::test]
    async fn connection_lost_mid_fetch() {
        let dir = tempdir().unwrap();
        let (client_end, mut server_end) = mock_stream_pair();
        let mut client = Client::new(client_end);

        tokio::spawn(async move {
            let _ = server_end.recv().await;
            drop(server_end);
        });

        let err = client
            .fetch(FetchRequest::new(Vec::<String>::new(), ["f"]), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }
}
