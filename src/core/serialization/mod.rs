/*!
 * Serialization Utilities
 * Versioned bincode frames for broker/caller messages
 */

pub mod frame;

pub use self::frame::{
    from_frame, peek_frame_len, to_frame, BincodeError, BincodeResult, FRAME_VERSION, HEADER_LEN,
    MAX_FRAME_PAYLOAD,
};
