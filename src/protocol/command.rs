//! Command definitions
//!
//! Represents requests from clients.

use crate::model::{MergeSpan, ResourceKey, Row, TableSnapshot};

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    SaveTable = 0x01,
    GetTable = 0x02,
    SaveMerges = 0x03,
    GetMerges = 0x04,
    SaveAll = 0x05,
    GetAll = 0x06,
    AppendTable = 0x07,
    Ping = 0x08,
}

impl CommandType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(CommandType::SaveTable),
            0x02 => Some(CommandType::GetTable),
            0x03 => Some(CommandType::SaveMerges),
            0x04 => Some(CommandType::GetMerges),
            0x05 => Some(CommandType::SaveAll),
            0x06 => Some(CommandType::GetAll),
            0x07 => Some(CommandType::AppendTable),
            0x08 => Some(CommandType::Ping),
            _ => None,
        }
    }

    /// Operation name used in logs and messages
    pub fn name(&self) -> &'static str {
        match self {
            CommandType::SaveTable => "save_table",
            CommandType::GetTable => "get_table",
            CommandType::SaveMerges => "save_merged_cells",
            CommandType::GetMerges => "get_merged_cells",
            CommandType::SaveAll => "save_all",
            CommandType::GetAll => "get_all",
            CommandType::AppendTable => "append_table",
            CommandType::Ping => "ping",
        }
    }
}

/// A parsed, validated command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace all rows
    SaveTable { key: ResourceKey, rows: Vec<Row> },

    /// Read all rows
    GetTable { key: ResourceKey },

    /// Upsert the merge-span record
    SaveMerges { key: ResourceKey, spans: Vec<MergeSpan> },

    /// Read the merge-span record
    GetMerges { key: ResourceKey },

    /// Replace rows and merge spans together
    SaveAll { key: ResourceKey, snapshot: TableSnapshot },

    /// Read rows and merge spans together
    GetAll { key: ResourceKey },

    /// Insert rows after the existing ones
    AppendTable { key: ResourceKey, rows: Vec<Row> },

    /// Health check
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::SaveTable { .. } => CommandType::SaveTable,
            Command::GetTable { .. } => CommandType::GetTable,
            Command::SaveMerges { .. } => CommandType::SaveMerges,
            Command::GetMerges { .. } => CommandType::GetMerges,
            Command::SaveAll { .. } => CommandType::SaveAll,
            Command::GetAll { .. } => CommandType::GetAll,
            Command::AppendTable { .. } => CommandType::AppendTable,
            Command::Ping => CommandType::Ping,
        }
    }

    /// The resource this command addresses (`None` for ping)
    pub fn key(&self) -> Option<&ResourceKey> {
        match self {
            Command::SaveTable { key, .. }
            | Command::GetTable { key }
            | Command::SaveMerges { key, .. }
            | Command::GetMerges { key }
            | Command::SaveAll { key, .. }
            | Command::GetAll { key }
            | Command::AppendTable { key, .. } => Some(key),
            Command::Ping => None,
        }
    }
}
