/*!
 * IPC Module
 * Channels between callers and the broker, and the frames they carry
 */

pub mod channel;
pub mod codec;

// Re-export for convenience
pub use channel::{BrokerService, ChannelHandle, TransportError};
pub use codec::{
    decode_request, decode_response, encode_request, encode_response, CodecError, CodecResult,
    EncodedResponse,
};
