//! Protocol and configuration constants for rfsb.

/// Default TCP port for the rfsb server.
pub const DEFAULT_PORT: u16 = 50051;

/// Maximum message payload size (16 MiB).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// Fetch Defaults
// =============================================================================

/// Default chunk size for fetched files (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Largest chunk size that still fits a frame with room for metadata.
pub const MAX_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Default capacity of the shared chunk channel, in chunks.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Default limit on concurrently open files during a fetch.
pub const DEFAULT_MAX_OPEN_FILES: usize = 64;

/// Default limit on concurrently running directory listings.
pub const DEFAULT_MAX_DIR_LISTINGS: usize = 16;

// =============================================================================
// Local Output
// =============================================================================

/// Permission bits for directories created by the client.
pub const DIR_MODE: u32 = 0o755;

/// Permission bits for files written by the client.
pub const FILE_MODE: u32 = 0o644;
