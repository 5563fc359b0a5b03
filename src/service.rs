//! Service Module
//!
//! The request-facing table store API.
//!
//! ## Responsibilities
//! - Validate the resource key before anything else runs
//! - Resolve the key to its handle through the registry
//! - Run the operation on the dispatcher and wait for it
//! - Map results into the `{status, data?, message?}` envelope
//!
//! ## Request lifecycle
//! ```text
//! RECEIVED → QUEUED → (LOCK_WAIT) → EXECUTING → COMPLETED | FAILED
//! ```
//! Nothing is retried; a failed request is reported to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::{DefaultConnector, StoreConnector};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::model::{MergeSpan, ResourceKey, Row, TableSnapshot};
use crate::protocol::payload;
use crate::protocol::{Command, CommandType, Response};
use crate::store::{HandleRegistry, ResourceHandle};

/// Concurrent table store
///
/// Stateless between requests apart from the handle registry; every call
/// names its `ResourceKey`. Calls block the calling thread until the
/// operation has completed or failed on a worker.
pub struct TableStoreService {
    /// One handle per key, created on first use
    registry: HandleRegistry,

    /// Bounded pool running the store operations
    dispatcher: Dispatcher,

    /// Deadline applied to every call
    call_timeout: Option<Duration>,
}

impl TableStoreService {
    /// Create a service that binds keys through `connector`
    pub fn new(config: &Config, connector: Arc<dyn StoreConnector>) -> Result<Self> {
        let dispatcher = Dispatcher::new(config.worker_threads, config.queue_capacity)?;

        Ok(Self {
            registry: HandleRegistry::new(connector),
            dispatcher,
            call_timeout: config.call_timeout,
        })
    }

    /// Create a service resolving `mem://` and `file://` targets
    pub fn open(config: &Config) -> Result<Self> {
        Self::new(config, Arc::new(DefaultConnector))
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Replace all rows of `key`
    pub fn save_table(&self, key: &ResourceKey, rows: Vec<Row>) -> Result<()> {
        self.dispatch(CommandType::SaveTable, key, move |handle| handle.save_table(rows))
    }

    /// Current rows of `key`
    pub fn get_table(&self, key: &ResourceKey) -> Result<Vec<Row>> {
        self.dispatch(CommandType::GetTable, key, |handle| handle.get_table())
    }

    /// Add rows to `key` without touching existing rows or merge spans
    pub fn append_table(&self, key: &ResourceKey, rows: Vec<Row>) -> Result<()> {
        self.dispatch(CommandType::AppendTable, key, move |handle| handle.append_table(rows))
    }

    /// Upsert the merge spans of `key`
    pub fn save_merges(&self, key: &ResourceKey, spans: Vec<MergeSpan>) -> Result<()> {
        validate_spans(&spans)?;
        self.dispatch(CommandType::SaveMerges, key, move |handle| handle.save_merges(spans))
    }

    /// Merge spans of `key`; empty if none were saved
    pub fn get_merges(&self, key: &ResourceKey) -> Result<Vec<MergeSpan>> {
        self.dispatch(CommandType::GetMerges, key, |handle| handle.get_merges())
    }

    /// Replace rows and merge spans of `key` atomically
    pub fn save_all(&self, key: &ResourceKey, snapshot: TableSnapshot) -> Result<()> {
        validate_spans(&snapshot.merges)?;
        self.dispatch(CommandType::SaveAll, key, move |handle| handle.save_all(snapshot))
    }

    /// Rows and merge spans of `key` as one consistent pair
    pub fn get_all(&self, key: &ResourceKey) -> Result<TableSnapshot> {
        self.dispatch(CommandType::GetAll, key, |handle| handle.get_all())
    }

    /// Execute a decoded command and build its response envelope
    ///
    /// Every error ends up in the envelope; nothing escapes the request
    /// boundary.
    pub fn execute(&self, command: Command) -> Response {
        let outcome = match command {
            Command::SaveTable { key, rows } => self
                .save_table(&key, rows)
                .map(|()| Response::message("Table data saved successfully")),
            Command::GetTable { key } => self
                .get_table(&key)
                .map(|rows| Response::data(payload::rows_to_json(&rows))),
            Command::SaveMerges { key, spans } => self
                .save_merges(&key, spans)
                .map(|()| Response::message("Merged cells data saved successfully")),
            Command::GetMerges { key } => self
                .get_merges(&key)
                .map(|spans| Response::data(payload::spans_to_json(&spans))),
            Command::SaveAll { key, snapshot } => self
                .save_all(&key, snapshot)
                .map(|()| Response::message("Table data and merged cells saved successfully")),
            Command::GetAll { key } => self
                .get_all(&key)
                .map(|snapshot| Response::data(payload::snapshot_to_json(&snapshot))),
            Command::AppendTable { key, rows } => self
                .append_table(&key, rows)
                .map(|()| Response::message("Table data appended successfully")),
            Command::Ping => Ok(Response::message("PONG")),
        };

        outcome.unwrap_or_else(|e| Response::error(e.to_string()))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Stop the worker pool; later calls fail with a dispatcher error
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn dispatch<T, F>(&self, op: CommandType, key: &ResourceKey, f: F) -> Result<T>
    where
        F: FnOnce(&ResourceHandle) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        key.validate()?;
        let handle = self.registry.get_or_create(key)?;

        let started = Instant::now();
        tracing::trace!("[{}] {} queued", key, op.name());

        let result = self.dispatcher.run(self.call_timeout, move || {
            tracing::trace!("[{}] {} executing", handle.key(), op.name());
            f(&*handle)
        });

        match &result {
            Ok(_) => tracing::debug!("[{}] {} completed in {:?}", key, op.name(), started.elapsed()),
            Err(e) if e.is_store_failure() => {
                tracing::warn!("[{}] {} store failure after {:?}: {}", key, op.name(), started.elapsed(), e)
            }
            Err(e) => tracing::warn!("[{}] {} failed after {:?}: {}", key, op.name(), started.elapsed(), e),
        }

        result
    }
}

fn validate_spans(spans: &[MergeSpan]) -> Result<()> {
    spans.iter().try_for_each(MergeSpan::validate)
}
