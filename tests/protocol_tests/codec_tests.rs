//! Codec Tests
//!
//! Tests for request and response framing.

use std::io::Cursor;

use driftkv::protocol::{
    decode_frame, encode_frame, read_request, read_response, write_request, write_response,
    ErrorKind, Request, Response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
use driftkv::DriftError;

// =============================================================================
// Frame Layout Tests
// =============================================================================

#[test]
fn test_frame_header_layout() {
    let frame = encode_frame(&Request::Ping).unwrap();

    let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    let crc = u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]);

    assert_eq!(frame.len(), HEADER_SIZE + len);
    assert_eq!(crc, crc32fast::hash(&frame[HEADER_SIZE..]));
}

#[test]
fn test_encode_decode_set_key() {
    let request = Request::SetKey {
        key: "mykey".to_string(),
        value: b"myvalue".to_vec(),
    };

    let frame = encode_frame(&request).unwrap();
    let decoded: Request = decode_frame(&frame).unwrap();

    assert_eq!(decoded, request);
}

#[test]
fn test_encode_decode_error_response() {
    let response = Response::error(ErrorKind::NotFound, "missing");

    let frame = encode_frame(&response).unwrap();
    let decoded: Response = decode_frame(&frame).unwrap();

    assert_eq!(decoded, response);
}

// =============================================================================
// Error Detection Tests
// =============================================================================

#[test]
fn test_decode_incomplete_header() {
    let result: Result<Request, _> = decode_frame(&[0u8; 4]);
    assert!(matches!(result, Err(DriftError::Protocol(_))));
}

#[test]
fn test_decode_incomplete_payload() {
    let frame = encode_frame(&Request::GetKey {
        key: "hello".to_string(),
    })
    .unwrap();

    let result: Result<Request, _> = decode_frame(&frame[..frame.len() - 1]);
    assert!(matches!(result, Err(DriftError::Protocol(_))));
}

#[test]
fn test_decode_checksum_mismatch() {
    let mut frame = encode_frame(&Request::GetKey {
        key: "hello".to_string(),
    })
    .unwrap();
    let last = frame.len() - 1;
    frame[last] ^= 0x01;

    let result: Result<Request, _> = decode_frame(&frame);
    match result {
        Err(DriftError::Protocol(msg)) => assert!(msg.contains("checksum")),
        other => panic!("Expected checksum error, got {:?}", other),
    }
}

#[test]
fn test_decode_oversized_length() {
    let mut frame = Vec::new();
    frame.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());
    frame.extend_from_slice(&0u32.to_be_bytes());

    let mut cursor = Cursor::new(frame);
    assert!(matches!(
        read_request(&mut cursor),
        Err(DriftError::Protocol(_))
    ));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_of_requests() {
    let requests = vec![
        Request::Hello {
            subject: "root".to_string(),
        },
        Request::GetStream {
            keys: vec!["a".to_string(), "b".to_string()],
        },
        Request::SetStream,
        Request::EndStream,
    ];

    let mut buffer = Vec::new();
    for request in &requests {
        write_request(&mut buffer, request).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &requests {
        assert_eq!(&read_request(&mut cursor).unwrap(), expected);
    }

    // Nothing left: the next read hits EOF
    assert!(matches!(read_request(&mut cursor), Err(DriftError::Io(_))));
}

#[test]
fn test_stream_of_responses() {
    let mut buffer = Vec::new();
    write_response(
        &mut buffer,
        &Response::Value {
            key: "hello".to_string(),
            value: b"world".to_vec(),
        },
    )
    .unwrap();
    write_response(&mut buffer, &Response::StreamEnd).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert!(matches!(
        read_response(&mut cursor).unwrap(),
        Response::Value { ref key, .. } if key == "hello"
    ));
    assert_eq!(read_response(&mut cursor).unwrap(), Response::StreamEnd);
}

// =============================================================================
// Error Mapping Tests
// =============================================================================

#[test]
fn test_not_found_carries_key() {
    let response = Response::from_error(&DriftError::KeyNotFound("gone".to_string()));

    match response {
        Response::Error { kind, message } => {
            assert_eq!(kind, ErrorKind::NotFound);
            let err = Response::into_error(kind, message);
            assert!(matches!(err, DriftError::KeyNotFound(ref key) if key == "gone"));
        }
        other => panic!("Expected error response, got {:?}", other),
    }
}

#[test]
fn test_permission_denied_maps_back() {
    let response = Response::from_error(&DriftError::PermissionDenied("nope".to_string()));

    match response {
        Response::Error { kind, message } => {
            assert_eq!(kind, ErrorKind::PermissionDenied);
            assert!(matches!(
                Response::into_error(kind, message),
                DriftError::PermissionDenied(_)
            ));
        }
        other => panic!("Expected error response, got {:?}", other),
    }
}
