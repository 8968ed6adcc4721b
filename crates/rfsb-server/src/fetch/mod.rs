//! Fetch pipeline.
//!
//! - `DirectoryExpander`: walks requested directories and spawns producers
//! - `FileProducer`: streams one file's chunks onto the shared channel
//! - `CompletionTracker`: knows when every discovered file has finished
//! - `FetchCoordinator`: owns the channel and forwards chunks to the client

mod coordinator;
mod expander;
mod producer;
mod report;
mod tracker;

pub use coordinator::FetchCoordinator;
pub use expander::DirectoryExpander;
pub use producer::{FileJob, FileProducer, ProducerContext};
pub use report::{
    ExpansionReport, FailedItem, FetchOutcome, FileOutcome, SkipReason, SkippedItem, format_bytes,
};
pub use tracker::{CompletionTracker, DiscoveryGuard, FileTicket, Phase, TrackerSnapshot};
