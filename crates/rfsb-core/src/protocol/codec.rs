//! Wire codec for rfsb messages.
//!
//! Format: 4-byte little-endian length prefix + bincode-encoded Message.
//! A frame larger than `MAX_MESSAGE_SIZE` is rejected on both sides.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::constants::MAX_MESSAGE_SIZE;
use crate::error::{Error, Result};
use crate::protocol::Message;

/// Length of the frame header (4 bytes, little-endian u32).
pub const FRAME_HEADER_LEN: usize = 4;

/// Codec for length-prefixed bincode frames.
pub struct Codec;

impl Codec {
    /// Encode a message into a standalone frame.
    pub fn encode(msg: &Message) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        Self::encode_into(msg, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Append one encoded frame to `buf`.
    pub fn encode_into(msg: &Message, buf: &mut BytesMut) -> Result<()> {
        let payload = bincode::serialize(msg).map_err(|e| Error::Codec {
            message: format!("failed to serialize {}: {}", msg.kind(), e),
        })?;
        check_frame_len(payload.len())?;

        buf.reserve(FRAME_HEADER_LEN + payload.len());
        buf.put_u32_le(payload.len() as u32);
        buf.put_slice(&payload);
        Ok(())
    }

    /// Decode one frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` and leaves `buf` untouched when the frame is not
    /// complete yet.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Message>> {
        let Some(len) = peek_frame_len(buf) else {
            return Ok(None);
        };
        check_frame_len(len)?;

        if buf.len() < FRAME_HEADER_LEN + len {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_LEN);
        let payload = buf.split_to(len);
        bincode::deserialize(&payload)
            .map(Some)
            .map_err(|e| Error::Codec {
                message: format!("failed to deserialize frame of {} bytes: {}", len, e),
            })
    }
}

fn peek_frame_len(buf: &[u8]) -> Option<usize> {
    let header: [u8; FRAME_HEADER_LEN] = buf.get(..FRAME_HEADER_LEN)?.try_into().ok()?;
    Some(u32::from_le_bytes(header) as usize)
}

fn check_frame_len(len: usize) -> Result<()> {
    if len > MAX_MESSAGE_SIZE {
        return Err(Error::Codec {
            message: format!("frame of {} bytes exceeds maximum {}", len, MAX_MESSAGE_SIZE),
        });
    }
    Ok(())
}
