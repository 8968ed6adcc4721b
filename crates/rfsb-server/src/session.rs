//! Per-connection request loop.
//!
//! A connection carries any number of sequential requests. Browse
//! failures and unexpected messages are answered with `Message::Error`;
//! transport errors end the session.

use tracing::{debug, info, warn};

use rfsb_core::error::{Error, Result};
use rfsb_core::protocol::{ErrorPayload, Message};
use rfsb_core::transport::StreamPair;

use crate::browse::Browser;
use crate::fetch::FetchCoordinator;

/// Counters for one finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub browses: u64,
    pub fetches: u64,
    pub errors: u64,
}

/// Serves requests from one client.
pub struct Session<S: StreamPair> {
    stream: S,
    browser: Browser,
    fetcher: FetchCoordinator,
    stats: SessionStats,
}

impl<S: StreamPair> Session<S> {
    pub fn new(stream: S, browser: Browser, fetcher: FetchCoordinator) -> Self {
        Self {
            stream,
            browser,
            fetcher,
            stats: SessionStats::default(),
        }
    }

    /// Handle requests until the client disconnects.
    pub async fn run(mut self) -> Result<SessionStats> {
        loop {
            let msg = match self.stream.recv().await {
                Ok(msg) => msg,
                Err(Error::ConnectionClosed) => {
                    debug!("Client disconnected");
                    break;
                }
                Err(e) => return Err(e),
            };
            debug!(kind = msg.kind(), "Request received");

            match msg {
                Message::BrowseRequest(request) => {
                    self.stats.browses += 1;
                    match self.browser.browse(&request).await {
                        Ok(response) => {
                            self.stream.send(&Message::BrowseResponse(response)).await?;
                        }
                        Err(e) => {
                            warn!(dir = %request.dir, error = %e, "Browse failed");
                            self.send_error(e.to_string()).await?;
                        }
                    }
                }
                Message::FetchRequest(request) => {
                    self.stats.fetches += 1;
                    self.fetcher.run(request, &mut self.stream).await?;
                }
                other => {
                    warn!(kind = other.kind(), "Unexpected message from client");
                    self.send_error(format!("unexpected message: {}", other.kind()))
                        .await?;
                }
            }
        }

        self.stream.close();
        info!(
            browses = self.stats.browses,
            fetches = self.stats.fetches,
            errors = self.stats.errors,
            "Session ended"
        );
        Ok(self.stats)
    }

    async fn send_error(&mut self, message: String) -> Result<()> {
        self.stats.errors += 1;
        self.stream
            .send(&Message::Error(ErrorPayload { message }))
            .await
    }
}
