/*!
 * Codec Tests
 * Frame layout and out-of-band descriptors
 */

use os_file_broker::core::serialization::{BincodeError, FRAME_VERSION, HEADER_LEN};
use os_file_broker::ipc::{
    decode_request, decode_response, encode_request, encode_response, CodecError,
};
use os_file_broker::{ErrorCode, OperationRequest, OperationResponse, ResponsePayload};
use pretty_assertions::assert_eq;
use std::os::fd::OwnedFd;

#[test]
fn test_request_frame_header() {
    let request = OperationRequest::Rename {
        from: "/srv/a".into(),
        to: "/srv/b".into(),
    };
    let frame = encode_request(&request).unwrap();

    assert_eq!(frame[0], FRAME_VERSION);
    let len = u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]) as usize;
    assert_eq!(frame.len(), HEADER_LEN + len);
    assert_eq!(decode_request(&frame).unwrap(), request);
}

#[test]
fn test_wrong_version_rejected() {
    let mut frame = encode_request(&OperationRequest::Close { fd: 3 })
        .unwrap()
        .to_vec();
    frame[0] = FRAME_VERSION + 1;

    assert!(matches!(
        decode_request(&frame),
        Err(CodecError::Frame(BincodeError::InvalidVersion { .. }))
    ));
}

#[test]
fn test_descriptor_travels_beside_frame() {
    let file = tempfile::tempfile().unwrap();
    let response = OperationResponse::success(ResponsePayload::Descriptor(OwnedFd::from(file)));

    let encoded = encode_response(response).unwrap();
    assert!(encoded.descriptor.is_some());

    let decoded = decode_response(&encoded.frame, encoded.descriptor).unwrap();
    assert!(decoded.is_success());
    assert!(decoded.into_descriptor().is_some());
}

#[test]
fn test_stray_descriptor_rejected() {
    let encoded = encode_response(OperationResponse::ok()).unwrap();
    let stray = OwnedFd::from(tempfile::tempfile().unwrap());

    assert!(matches!(
        decode_response(&encoded.frame, Some(stray)),
        Err(CodecError::UnexpectedDescriptor)
    ));
}

#[test]
fn test_payloads_preserved() {
    let responses = vec![
        OperationResponse::success(ResponsePayload::Data(b"bytes".to_vec())),
        OperationResponse::success(ResponsePayload::Written(5)),
        OperationResponse::write_failure(ErrorCode::from_errno(libc::ENOSPC)),
        OperationResponse::success(ResponsePayload::Entries(vec!["a".into(), "b".into()])),
        OperationResponse::success(ResponsePayload::Link("../target".into())),
        OperationResponse::denied(),
    ];

    for response in responses {
        let expected = format!("{:?}", response);
        let decoded = encode_response(response).unwrap().decode().unwrap();
        assert_eq!(format!("{:?}", decoded), expected);
    }
}
