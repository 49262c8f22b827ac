/*!
 * Versioned Binary Frames
 * bincode payloads wrapped in a fixed header for crossing the trust boundary
 *
 * Format: [1-byte version][4-byte little-endian length][bincode data]
 * The version byte lets either side reject a peer built from a different
 * revision; the length lets a stream transport split frames without parsing.
 */

use bytes::{BufMut, Bytes, BytesMut};
use serde::{de::DeserializeOwned, Serialize};

/// Current frame format version
pub const FRAME_VERSION: u8 = 1;

/// Header size: version byte plus u32 length
pub const HEADER_LEN: usize = 5;

/// Largest payload accepted from a peer (16 MiB)
pub const MAX_FRAME_PAYLOAD: usize = 16 * 1024 * 1024;

/// Result type for frame operations
pub type BincodeResult<T> = Result<T, BincodeError>;

/// Binary serialization errors with rich context
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BincodeError {
    #[error("Serialization failed: {context}")]
    Serialization {
        context: &'static str,
        #[source]
        source: Box<bincode::ErrorKind>,
    },

    #[error("Deserialization failed: {context}")]
    Deserialization {
        context: &'static str,
        #[source]
        source: Box<bincode::ErrorKind>,
    },

    #[error("Buffer too small: expected {expected} bytes, got {actual} bytes")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("Invalid format version: expected {expected}, got {actual}")]
    InvalidVersion { expected: u8, actual: u8 },

    #[error("Frame payload of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
}

/// Serialize to plain bincode bytes
#[inline]
pub fn to_vec<T: Serialize>(value: &T) -> BincodeResult<Vec<u8>> {
    bincode::serialize(value).map_err(|source| BincodeError::Serialization {
        context: "payload serialization",
        source,
    })
}

/// Deserialize from plain bincode bytes
#[inline]
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> BincodeResult<T> {
    bincode::deserialize(bytes).map_err(|source| BincodeError::Deserialization {
        context: "payload deserialization",
        source,
    })
}

/// Serialize a value into a complete frame
pub fn to_frame<T: Serialize>(value: &T) -> BincodeResult<Bytes> {
    let data = to_vec(value)?;
    if data.len() > MAX_FRAME_PAYLOAD {
        return Err(BincodeError::FrameTooLarge {
            len: data.len(),
            max: MAX_FRAME_PAYLOAD,
        });
    }

    let mut frame = BytesMut::with_capacity(HEADER_LEN + data.len());
    frame.put_u8(FRAME_VERSION);
    frame.put_u32_le(data.len() as u32);
    frame.extend_from_slice(&data);
    Ok(frame.freeze())
}

/// Read the header of a (possibly partial) frame.
///
/// Returns `Ok(None)` while fewer than `HEADER_LEN` bytes are buffered,
/// otherwise the total frame length (header included).
pub fn peek_frame_len(buf: &[u8]) -> BincodeResult<Option<usize>> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }

    let version = buf[0];
    if version != FRAME_VERSION {
        return Err(BincodeError::InvalidVersion {
            expected: FRAME_VERSION,
            actual: version,
        });
    }

    let len = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
    if len > MAX_FRAME_PAYLOAD {
        return Err(BincodeError::FrameTooLarge {
            len,
            max: MAX_FRAME_PAYLOAD,
        });
    }

    Ok(Some(HEADER_LEN + len))
}

/// Deserialize a complete frame; trailing bytes after the frame are rejected
pub fn from_frame<T: DeserializeOwned>(frame: &[u8]) -> BincodeResult<T> {
    let total = peek_frame_len(frame)?.ok_or(BincodeError::BufferTooSmall {
        expected: HEADER_LEN,
        actual: frame.len(),
    })?;

    if frame.len() != total {
        return Err(BincodeError::BufferTooSmall {
            expected: total,
            actual: frame.len(),
        });
    }

    from_slice(&frame[HEADER_LEN..])
}
