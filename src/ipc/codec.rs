/*!
 * Response Codec
 * Request and response frames exchanged between caller and broker
 *
 * Frames are versioned, length-prefixed bincode. An opened descriptor never
 * appears in the frame: it travels beside it (the way SCM_RIGHTS carries
 * descriptors next to a socket message) and is handed back at decode.
 */

use crate::core::serialization::{from_frame, to_frame, BincodeError};
use crate::core::types::ErrorCode;
use crate::syscalls::{OperationRequest, OperationResponse, ResponsePayload, StatResult};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::os::fd::OwnedFd;
use thiserror::Error;

/// Codec result
pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Frame(#[from] BincodeError),

    #[error("Response announces a descriptor but none was supplied")]
    MissingDescriptor,

    #[error("Descriptor supplied for a response that carries none")]
    UnexpectedDescriptor,
}

/// Payload as it appears on the wire
#[derive(Debug, Serialize, Deserialize)]
enum WirePayload {
    None,
    Descriptor,
    Data(Vec<u8>),
    Written(i64),
    Stat(StatResult),
    Entries(Vec<String>),
    Link(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct WireResponse {
    error: ErrorCode,
    payload: WirePayload,
}

/// Encoded response plus the descriptor that travels out-of-band
#[derive(Debug)]
pub struct EncodedResponse {
    pub frame: Bytes,
    pub descriptor: Option<OwnedFd>,
}

pub fn encode_request(request: &OperationRequest) -> CodecResult<Bytes> {
    Ok(to_frame(request)?)
}

pub fn decode_request(frame: &[u8]) -> CodecResult<OperationRequest> {
    Ok(from_frame(frame)?)
}

pub fn encode_response(response: OperationResponse) -> CodecResult<EncodedResponse> {
    let OperationResponse { error, payload } = response;

    let mut descriptor = None;
    let payload = match payload {
        ResponsePayload::None => WirePayload::None,
        ResponsePayload::Descriptor(fd) => {
            descriptor = Some(fd);
            WirePayload::Descriptor
        }
        ResponsePayload::Data(data) => WirePayload::Data(data),
        ResponsePayload::Written(n) => WirePayload::Written(n as i64),
        ResponsePayload::Stat(stat) => WirePayload::Stat(stat),
        ResponsePayload::Entries(entries) => WirePayload::Entries(entries),
        ResponsePayload::Link(target) => WirePayload::Link(target),
    };

    let frame = to_frame(&WireResponse { error, payload })?;
    Ok(EncodedResponse { frame, descriptor })
}

/// Rebuild a response. A descriptor that does not belong to the frame is
/// closed and reported rather than leaked.
pub fn decode_response(
    frame: &[u8],
    descriptor: Option<OwnedFd>,
) -> CodecResult<OperationResponse> {
    let wire: WireResponse = from_frame(frame)?;

    let payload = match (wire.payload, descriptor) {
        (WirePayload::Descriptor, Some(fd)) => ResponsePayload::Descriptor(fd),
        (WirePayload::Descriptor, None) => return Err(CodecError::MissingDescriptor),
        (_, Some(_)) => return Err(CodecError::UnexpectedDescriptor),
        (WirePayload::None, None) => ResponsePayload::None,
        (WirePayload::Data(data), None) => ResponsePayload::Data(data),
        (WirePayload::Written(n), None) => ResponsePayload::Written(n as isize),
        (WirePayload::Stat(stat), None) => ResponsePayload::Stat(stat),
        (WirePayload::Entries(entries), None) => ResponsePayload::Entries(entries),
        (WirePayload::Link(target), None) => ResponsePayload::Link(target),
    };

    Ok(OperationResponse::new(wire.error, payload))
}

impl EncodedResponse {
    /// Decode on the receiving side, consuming the descriptor
    pub fn decode(self) -> CodecResult<OperationResponse> {
        decode_response(&self.frame, self.descriptor)
    }
}
