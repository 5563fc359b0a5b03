//! Codec Tests
//!
//! Tests for command and response encoding/decoding.

use std::io::Cursor;

use serde_json::json;

use gridstore::model::{Cell, MergeSpan, ResourceKey, Row, TableSnapshot};
use gridstore::protocol::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, Command, CommandType, Response, Status,
    HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
use gridstore::GridError;

fn key() -> ResourceKey {
    ResourceKey::new("mem://codec", "sheets", "budget")
}

fn sample_rows() -> Vec<Row> {
    vec![
        Row::new().with_cell(0, Cell::from_text("a")).with_cell(1, Cell::from_text("b")),
        Row::new().with_cell(0, Cell::from_text("c")),
    ]
}

/// Frame a raw JSON body the way a foreign client would
fn raw_frame(cmd: u8, body: &[u8]) -> Vec<u8> {
    let mut bytes = vec![cmd];
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);
    bytes
}

// =============================================================================
// Command Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_save_table() {
    let cmd = Command::SaveTable { key: key(), rows: sample_rows() };
    let encoded = encode_command(&cmd).unwrap();

    assert_eq!(encoded[0], CommandType::SaveTable as u8);
    assert_eq!(decode_command(&encoded).unwrap(), cmd);
}

#[test]
fn test_encode_decode_save_all() {
    let cmd = Command::SaveAll {
        key: key(),
        snapshot: TableSnapshot::new(sample_rows(), vec![MergeSpan::new(0, 0, 1, 2)]),
    };
    let encoded = encode_command(&cmd).unwrap();
    assert_eq!(decode_command(&encoded).unwrap(), cmd);
}

#[test]
fn test_encode_decode_reads() {
    for cmd in [
        Command::GetTable { key: key() },
        Command::GetMerges { key: key() },
        Command::GetAll { key: key() },
    ] {
        let encoded = encode_command(&cmd).unwrap();
        assert_eq!(decode_command(&encoded).unwrap(), cmd);
    }
}

#[test]
fn test_encode_decode_ping() {
    let encoded = encode_command(&Command::Ping).unwrap();

    assert_eq!(encoded.len(), HEADER_SIZE);
    assert_eq!(decode_command(&encoded).unwrap(), Command::Ping);
}

#[test]
fn test_body_uses_wire_field_names() {
    let cmd = Command::SaveMerges { key: key(), spans: vec![MergeSpan::new(1, 2, 3, 4)] };
    let encoded = encode_command(&cmd).unwrap();

    let body: serde_json::Value = serde_json::from_slice(&encoded[HEADER_SIZE..]).unwrap();
    assert_eq!(
        body,
        json!({
            "target": "mem://codec",
            "database": "sheets",
            "collection": "budget",
            "merged_cells": [{ "row": 1, "col": 2, "row_span": 3, "col_span": 4 }]
        })
    );
}

#[test]
fn test_decode_accepts_alias_fields() {
    let body = json!({
        "uri": "mem://codec",
        "db_name": "sheets",
        "collection_name": "budget",
        "data": [{ "0": "plain" }]
    });
    let bytes = raw_frame(0x07, body.to_string().as_bytes());

    match decode_command(&bytes).unwrap() {
        Command::AppendTable { key: k, rows } => {
            assert_eq!(k, key());
            assert_eq!(rows[0].get(0), Some(&Cell::from_text("plain")));
        }
        other => panic!("Expected APPEND_TABLE command, got {:?}", other),
    }
}

// =============================================================================
// Command Error Tests
// =============================================================================

#[test]
fn test_decode_incomplete_header() {
    let result = decode_command(&[0x01, 0x00]);
    assert!(matches!(result, Err(GridError::Protocol(_))));
}

#[test]
fn test_decode_incomplete_payload() {
    let mut bytes = raw_frame(0x02, b"{}");
    bytes.truncate(HEADER_SIZE + 1);
    assert!(matches!(decode_command(&bytes), Err(GridError::Protocol(_))));
}

#[test]
fn test_decode_unknown_command() {
    let bytes = raw_frame(0xFF, b"");
    assert!(matches!(decode_command(&bytes), Err(GridError::Protocol(_))));
}

#[test]
fn test_decode_payload_too_large() {
    let mut bytes = vec![0x02];
    bytes.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());
    assert!(matches!(decode_command(&bytes), Err(GridError::Protocol(_))));
}

#[test]
fn test_decode_ping_with_payload() {
    let bytes = raw_frame(0x08, b"{}");
    assert!(matches!(decode_command(&bytes), Err(GridError::Protocol(_))));
}

#[test]
fn test_decode_invalid_json_is_malformed_payload() {
    let bytes = raw_frame(0x02, b"{not json");
    assert!(matches!(decode_command(&bytes), Err(GridError::MalformedPayload(_))));
}

#[test]
fn test_decode_wrong_shape_is_malformed_payload() {
    let missing_data = json!({ "target": "mem://x", "database": "d", "collection": "c" });
    let bytes = raw_frame(0x01, missing_data.to_string().as_bytes());
    assert!(matches!(decode_command(&bytes), Err(GridError::MalformedPayload(_))));

    let bytes = raw_frame(0x02, b"[1, 2, 3]");
    assert!(matches!(decode_command(&bytes), Err(GridError::MalformedPayload(_))));

    let bad_row = json!({
        "target": "mem://x", "database": "d", "collection": "c", "data": ["row"]
    });
    let bytes = raw_frame(0x01, bad_row.to_string().as_bytes());
    assert!(matches!(decode_command(&bytes), Err(GridError::MalformedPayload(_))));
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_message_response() {
    let resp = Response::message("Table data saved successfully");
    let encoded = encode_response(&resp).unwrap();

    assert_eq!(encoded[0], Status::Success as u8);
    assert_eq!(decode_response(&encoded).unwrap(), resp);
}

#[test]
fn test_encode_decode_data_response() {
    let resp = Response::data(json!([{ "0": { "text": "a" } }]));
    let encoded = encode_response(&resp).unwrap();
    assert_eq!(decode_response(&encoded).unwrap(), resp);
}

#[test]
fn test_envelope_omits_absent_fields() {
    let encoded = encode_response(&Response::error("boom")).unwrap();
    let envelope: serde_json::Value = serde_json::from_slice(&encoded[HEADER_SIZE..]).unwrap();

    assert_eq!(envelope, json!({ "status": "error", "message": "boom" }));
}

#[test]
fn test_decode_response_status_mismatch() {
    let envelope = json!({ "status": "success", "message": "ok" });
    let bytes = raw_frame(Status::Error as u8, envelope.to_string().as_bytes());
    assert!(matches!(decode_response(&bytes), Err(GridError::Protocol(_))));
}

#[test]
fn test_error_response_into_result() {
    let result = Response::error("Backing store unavailable").into_result();
    match result {
        Err(GridError::Remote(msg)) => assert_eq!(msg, "Backing store unavailable"),
        other => panic!("Expected Remote error, got {:?}", other),
    }
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_command_roundtrip() {
    let mut buffer = Vec::new();
    write_command(&mut buffer, &Command::GetAll { key: key() }).unwrap();
    write_command(&mut buffer, &Command::Ping).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_command(&mut cursor).unwrap(), Command::GetAll { key: key() });
    assert_eq!(read_command(&mut cursor).unwrap(), Command::Ping);
}

#[test]
fn test_stream_response_roundtrip() {
    let mut buffer = Vec::new();
    write_response(&mut buffer, &Response::message("PONG")).unwrap();

    let mut cursor = Cursor::new(buffer);
    let resp = read_response(&mut cursor).unwrap();
    assert_eq!(resp.message.as_deref(), Some("PONG"));
}

#[test]
fn test_stream_eof_is_io_error() {
    let mut cursor = Cursor::new(Vec::<u8>::new());
    match read_command(&mut cursor) {
        Err(GridError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("Expected EOF, got {:?}", other),
    }
}
