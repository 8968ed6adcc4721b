//! Fetch pipeline configuration.

use crate::constants::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_DIR_LISTINGS,
    DEFAULT_MAX_OPEN_FILES, MAX_CHUNK_SIZE,
};
use crate::error::{Error, Result};

/// Tuning knobs for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Maximum payload bytes per chunk.
    pub chunk_size: usize,
    /// Capacity of the shared chunk channel; producers wait when it is full.
    pub channel_capacity: usize,
    /// Maximum number of files streamed concurrently.
    pub max_open_files: usize,
    /// Maximum number of directories listed concurrently.
    pub max_dir_listings: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            max_dir_listings: DEFAULT_MAX_DIR_LISTINGS,
        }
    }
}

impl FetchConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the chunk channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the concurrent open file limit.
    pub fn with_max_open_files(mut self, max: usize) -> Self {
        self.max_open_files = max;
        self
    }

    /// Set the concurrent directory listing limit.
    pub fn with_max_dir_listings(mut self, max: usize) -> Self {
        self.max_dir_listings = max;
        self
    }

    /// Check that every limit is usable.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::Config {
                message: format!(
                    "chunk size must be between 1 and {} bytes, got {}",
                    MAX_CHUNK_SIZE, self.chunk_size
                ),
            });
        }
        let limits = [
            ("channel capacity", self.channel_capacity),
            ("max open files", self.max_open_files),
            ("max dir listings", self.max_dir_listings),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(Error::Config {
                    message: format!("{name} must be at least 1"),
                });
            }
        }
        Ok(())
    }
}
