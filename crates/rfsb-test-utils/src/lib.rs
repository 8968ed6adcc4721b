//! rfsb-test-utils: Test infrastructure for rfsb.
//!
//! Provides:
//! - MockStream: In-memory transport for testing without network
//! - TestTree: Temporary directory trees to serve and fetch into

mod fixtures;
mod mock_transport;

pub use fixtures::{TestTree, patterned_bytes};
pub use mock_transport::{MockStream, mock_stream_pair, mock_stream_pair_with_capacity};
