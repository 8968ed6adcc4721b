//! TCP listener: accepts connections and runs one session each.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use rfsb_core::config::FetchConfig;
use rfsb_core::error::Result;
use rfsb_core::transport::TcpTransport;

use crate::browse::Browser;
use crate::config::ServerConfig;
use crate::fetch::FetchCoordinator;
use crate::session::Session;

/// A bound server, ready to accept clients.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    root: PathBuf,
    fetch: FetchConfig,
}

impl Server {
    /// Validate `config` and bind its address.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let root = config.validate()?;
        let listener = TcpListener::bind(config.bind_addr).await?;
        Self::from_listener(listener, root, config.fetch)
    }

    /// Serve `root` on an already bound listener.
    ///
    /// `root` must be absolute and normalized.
    pub fn from_listener(listener: TcpListener, root: PathBuf, fetch: FetchConfig) -> Result<Self> {
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            root,
            fetch,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Accept connections until `shutdown` is cancelled.
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        info!(addr = %self.local_addr, root = %self.root.display(), "Server listening");
        let browser = Browser::new(self.root.clone());
        let fetcher = FetchCoordinator::new(self.root.clone(), self.fetch.clone());

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutting down listener");
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    // Accept errors (e.g. EMFILE) are per-connection.
                    warn!(error = %e, "Failed to accept connection");
                    continue;
                }
            };

            let transport = match TcpTransport::new(stream) {
                Ok(transport) => transport,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "Failed to set up connection");
                    continue;
                }
            };

            info!(peer = %peer, "Client connected");
            let session = Session::new(transport, browser.clone(), fetcher.clone());
            tokio::spawn(async move {
                match session.run().await {
                    Ok(stats) => debug!(peer = %peer, ?stats, "Client session finished"),
                    Err(e) => error!(peer = %peer, error = %e, "Client session failed"),
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfsb_core::protocol::{BrowseRequest, Message};
    use rfsb_core::transport::StreamPair;
    use rfsb_test_utils::TestTree;

    #[tokio::test]
    async fn accepts_and_serves_browse() {
        let tree = TestTree::new();
        tree.file("hello.txt", b"hi");

        let config = ServerConfig::new(tree.path()).with_bind_addr("127.0.0.1:0".parse().unwrap());
        let server = Server::bind(config).await.unwrap();
        let addr = server.local_addr();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.serve(shutdown.clone()));

        let mut client = TcpTransport::connect(addr).await.unwrap();
        client
            .send(&Message::BrowseRequest(BrowseRequest { dir: String::new() }))
            .await
            .unwrap();
        match client.recv().await.unwrap() {
            Message::BrowseResponse(resp) => assert_eq!(resp.files, vec!["hello.txt"]),
            other => panic!("unexpected {:?}", other),
        }

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn bind_rejects_missing_root() {
        let tree = TestTree::new();
        let config = ServerConfig::new(tree.join("absent"))
            .with_bind_addr("127.0.0.1:0".parse().unwrap());
        assert!(Server::bind(config).await.is_err());
    }
}
