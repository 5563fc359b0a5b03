//! TCP Client
//!
//! Blocking client speaking the gridstore wire protocol, one request at a
//! time over a single connection.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde_json::Value;

use crate::error::{GridError, Result};
use crate::model::{MergeSpan, ResourceKey, Row, TableSnapshot};
use crate::protocol::payload;
use crate::protocol::{read_response, write_command, Command, Response};

/// Client connection to a gridstore server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<Self> {
        let stream = TcpStream::connect(&addr)
            .map_err(|e| GridError::Network(format!("failed to connect to {:?}: {}", addr, e)))?;
        stream.set_nodelay(true)?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }

    /// Bound how long a single request may take (`None` waits forever)
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        self.writer.get_ref().set_write_timeout(timeout)?;
        Ok(())
    }

    /// Send a command and return the raw envelope
    pub fn call(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    pub fn ping(&mut self) -> Result<()> {
        self.call(&Command::Ping)?.into_result().map(|_| ())
    }

    pub fn save_table(&mut self, key: &ResourceKey, rows: Vec<Row>) -> Result<()> {
        self.write(Command::SaveTable { key: key.clone(), rows })
    }

    pub fn get_table(&mut self, key: &ResourceKey) -> Result<Vec<Row>> {
        let data = self.read(Command::GetTable { key: key.clone() })?;
        payload::parse_rows(&data)
    }

    pub fn append_table(&mut self, key: &ResourceKey, rows: Vec<Row>) -> Result<()> {
        self.write(Command::AppendTable { key: key.clone(), rows })
    }

    pub fn save_merges(&mut self, key: &ResourceKey, spans: Vec<MergeSpan>) -> Result<()> {
        self.write(Command::SaveMerges { key: key.clone(), spans })
    }

    pub fn get_merges(&mut self, key: &ResourceKey) -> Result<Vec<MergeSpan>> {
        let data = self.read(Command::GetMerges { key: key.clone() })?;
        payload::parse_spans(&data)
    }

    pub fn save_all(&mut self, key: &ResourceKey, snapshot: TableSnapshot) -> Result<()> {
        self.write(Command::SaveAll { key: key.clone(), snapshot })
    }

    pub fn get_all(&mut self, key: &ResourceKey) -> Result<TableSnapshot> {
        let data = self.read(Command::GetAll { key: key.clone() })?;
        payload::parse_snapshot(&data)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write(&mut self, command: Command) -> Result<()> {
        self.call(&command)?.into_result().map(|_| ())
    }

    fn read(&mut self, command: Command) -> Result<Value> {
        let name = command.command_type().name();
        self.call(&command)?
            .into_result()?
            .ok_or_else(|| GridError::Protocol(format!("{} response carried no data", name)))
    }
}
