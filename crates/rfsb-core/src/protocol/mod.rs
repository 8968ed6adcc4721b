//! Protocol module for the rfsb wire format.
//!
//! This module provides:
//! - Browse and fetch request/response messages
//! - The `Chunk` record streamed for every fetched file
//! - Length-prefixed bincode codec

mod codec;
mod message;

pub use codec::{Codec, FRAME_HEADER_LEN};
pub use message::*;
