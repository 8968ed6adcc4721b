//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use rfsb_core::config::FetchConfig;
use rfsb_core::constants::DEFAULT_PORT;
use rfsb_core::error::{Error, Result};
use rfsb_core::file::normalize;

/// Everything the listener needs to serve one root directory.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    /// Directory all request paths are relative to.
    pub root: PathBuf,
    /// Fetch pipeline tuning.
    pub fetch: FetchConfig,
}

impl ServerConfig {
    /// Config serving `root` on the default port.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            root: root.into(),
            fetch: FetchConfig::default(),
        }
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    /// Check the fetch settings and resolve the root to an absolute directory.
    pub fn validate(&self) -> Result<PathBuf> {
        self.fetch.validate()?;
        resolve_root(&self.root)
    }
}

/// Canonicalize `root` and check that it is a directory.
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    let resolved = root.canonicalize().map_err(|e| Error::Config {
        message: format!("root {}: {}", root.display(), e),
    })?;
    if !resolved.is_dir() {
        return Err(Error::Config {
            message: format!("root {} is not a directory", root.display()),
        });
    }
    Ok(normalize(&resolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfsb_test_utils::TestTree;

    #[test]
    fn default_bind_addr() {
        let config = ServerConfig::new("/srv");
        assert_eq!(config.bind_addr.port(), 50051);
        assert!(config.bind_addr.ip().is_unspecified());
    }

    #[test]
    fn validate_resolves_root() {
        let tree = TestTree::new();
        tree.dir("served");
        let config = ServerConfig::new(tree.join("served/../served"));
        let root = config.validate().unwrap();
        assert!(root.is_absolute());
        assert!(root.ends_with("served"));
    }

    #[test]
    fn validate_rejects_bad_roots() {
        let tree = TestTree::new();
        tree.file("plain.txt", b"x");

        assert!(matches!(
            ServerConfig::new(tree.join("missing")).validate(),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            ServerConfig::new(tree.join("plain.txt")).validate(),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            ServerConfig::new(tree.path())
                .with_fetch(FetchConfig::default().with_chunk_size(0))
                .validate(),
            Err(Error::Config { .. })
        ));
    }
}
