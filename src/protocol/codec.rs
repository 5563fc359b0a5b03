//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         JSON body           │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Body by Command Type
//! - SAVE_TABLE / APPEND_TABLE: key fields + `data`
//! - SAVE_MERGES:               key fields + `merged_cells`
//! - SAVE_ALL:                  key fields + `data` + `merged_cells`
//! - GET_*:                     key fields
//! - PING:                      empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │  JSON {status,data,message} │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use serde_json::{Map, Value};

use super::payload::{self, MERGES_FIELD, ROWS_FIELD};
use super::{Command, CommandType, Response, Status};
use crate::error::{GridError, Result};
use crate::model::TableSnapshot;

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + JSON body
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    let cmd_type = command.command_type() as u8;

    let payload = match command_body(command) {
        Some(body) => serde_json::to_vec(&Value::Object(body))
            .map_err(|e| GridError::Serialization(e.to_string()))?,
        None => Vec::new(),
    };

    Ok(frame(cmd_type, &payload))
}

fn command_body(command: &Command) -> Option<Map<String, Value>> {
    let key = command.key()?;
    let mut body = Map::new();
    payload::key_to_json(key, &mut body);

    match command {
        Command::SaveTable { rows, .. } | Command::AppendTable { rows, .. } => {
            body.insert(ROWS_FIELD.to_string(), payload::rows_to_json(rows));
        }
        Command::SaveMerges { spans, .. } => {
            body.insert(MERGES_FIELD.to_string(), payload::spans_to_json(spans));
        }
        Command::SaveAll { snapshot, .. } => {
            body.insert(ROWS_FIELD.to_string(), payload::rows_to_json(&snapshot.rows));
            body.insert(MERGES_FIELD.to_string(), payload::spans_to_json(&snapshot.merges));
        }
        Command::GetTable { .. }
        | Command::GetMerges { .. }
        | Command::GetAll { .. }
        | Command::Ping => {}
    }

    Some(body)
}

/// Decode a command from bytes
///
/// Framing problems are `Protocol` errors; a well-framed body that is not
/// JSON or has the wrong shape is a `MalformedPayload` error.
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = split_frame(bytes, "command")?;

    let cmd_type = CommandType::from_byte(cmd_type).ok_or_else(|| {
        GridError::Protocol(format!("Unknown command type: 0x{:02x}", cmd_type))
    })?;

    if cmd_type == CommandType::Ping {
        if !payload.is_empty() {
            return Err(GridError::Protocol(format!(
                "PING command: unexpected payload of {} bytes",
                payload.len()
            )));
        }
        return Ok(Command::Ping);
    }

    let body: Value = serde_json::from_slice(payload).map_err(|e| {
        GridError::MalformedPayload(format!(
            "{} command: invalid JSON body: {}",
            cmd_type.name(),
            e
        ))
    })?;
    let body = body.as_object().ok_or_else(|| {
        GridError::MalformedPayload(format!("{} body must be a JSON object", cmd_type.name()))
    })?;

    let key = payload::parse_key(body)?;
    let field = |name: &str| {
        body.get(name).ok_or_else(|| {
            GridError::MalformedPayload(format!("{}: missing field {}", cmd_type.name(), name))
        })
    };

    let command = match cmd_type {
        CommandType::SaveTable => Command::SaveTable {
            key,
            rows: payload::parse_rows(field(ROWS_FIELD)?)?,
        },
        CommandType::AppendTable => Command::AppendTable {
            key,
            rows: payload::parse_rows(field(ROWS_FIELD)?)?,
        },
        CommandType::SaveMerges => Command::SaveMerges {
            key,
            spans: payload::parse_spans(field(MERGES_FIELD)?)?,
        },
        CommandType::SaveAll => Command::SaveAll {
            key,
            snapshot: TableSnapshot::new(
                payload::parse_rows(field(ROWS_FIELD)?)?,
                payload::parse_spans(field(MERGES_FIELD)?)?,
            ),
        },
        CommandType::GetTable => Command::GetTable { key },
        CommandType::GetMerges => Command::GetMerges { key },
        CommandType::GetAll => Command::GetAll { key },
        CommandType::Ping => Command::Ping,
    };

    Ok(command)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + JSON envelope
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    let payload =
        serde_json::to_vec(response).map_err(|e| GridError::Serialization(e.to_string()))?;
    Ok(frame(response.status as u8, &payload))
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let status = Status::from_byte(status_byte).ok_or_else(|| {
        GridError::Protocol(format!("Unknown response status: 0x{:02x}", status_byte))
    })?;

    let response: Response = serde_json::from_slice(payload)
        .map_err(|e| GridError::Protocol(format!("Invalid response envelope: {}", e)))?;

    if response.status != status {
        return Err(GridError::Protocol(format!(
            "Response status byte {:?} disagrees with envelope {:?}",
            status, response.status
        )));
    }

    Ok(response)
}

// =============================================================================
// Framing helpers
// =============================================================================

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(tag);
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(payload);
    message
}

/// Validate header and length; returns the tag byte and the payload
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(GridError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let tag = bytes[0];
    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;

    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(GridError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(GridError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((tag, &bytes[HEADER_SIZE..total_len]))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    // Read header first
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    // Parse payload length
    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;

    // Validate payload length
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(GridError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    // Read payload after the header
    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }

    Ok(message)
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let message = read_frame(reader)?;
    decode_command(&message)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader)?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
