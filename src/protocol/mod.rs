//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (V1 - Binary framing, JSON bodies)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         JSON body           │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: SAVE_TABLE    - {target, database, collection, data}
//! - 0x02: GET_TABLE     - {target, database, collection}
//! - 0x03: SAVE_MERGES   - {target, database, collection, merged_cells}
//! - 0x04: GET_MERGES    - {target, database, collection}
//! - 0x05: SAVE_ALL      - {target, database, collection, data, merged_cells}
//! - 0x06: GET_ALL       - {target, database, collection}
//! - 0x07: APPEND_TABLE  - {target, database, collection, data}
//! - 0x08: PING          - empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │  {status, data?, message?}  │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: SUCCESS
//! - 0x01: ERROR

mod codec;
mod command;
pub mod payload;
mod response;

pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
pub use command::{Command, CommandType};
pub use response::{Response, Status};
