//! Response definitions
//!
//! The `{status, data?, message?}` envelope returned for every request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GridError, Result};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Status {
    Success = 0x00,
    Error = 0x01,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Success),
            0x01 => Some(Status::Error),
            _ => None,
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Result of a read operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Confirmation of a write, or the error description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    /// Create a success response carrying data
    pub fn data(data: Value) -> Self {
        Self {
            status: Status::Success,
            data: Some(data),
            message: None,
        }
    }

    /// Create a success response carrying a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Create an error response
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Turn an error envelope into `GridError::Remote`, otherwise yield the data
    pub fn into_result(self) -> Result<Option<Value>> {
        match self.status {
            Status::Success => Ok(self.data),
            Status::Error => Err(GridError::Remote(
                self.message.unwrap_or_else(|| "unknown error".to_string()),
            )),
        }
    }
}
