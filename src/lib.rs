//! # gridstore
//!
//! A concurrent table store for shared spreadsheet grids:
//! - Styled cell rows plus merge-span records per logical table
//! - One fair reader/writer lock per table
//! - Atomic rows + merge-span saves and reads
//! - Bounded worker pool between requests and the backing store
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │          (thread per connection, JSON bodies)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 TableStoreService                            │
//! │       (key validation, envelope, per-call deadline)          │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐               ┌──────────────────┐
//!   │ HandleRegistry  │               │    Dispatcher    │
//!   │ (Mutex<HashMap>)│               │ (bounded workers)│
//!   └────────┬────────┘               └────────┬─────────┘
//!            │ one per key                     │ runs on
//!            ▼                                 ▼
//!   ┌──────────────────────────────────────────────────┐
//!   │        ResourceHandle (fair RwLock)              │
//!   └─────────────────────┬────────────────────────────┘
//!                         ▼
//!   ┌──────────────────────────────────────────────────┐
//!   │   BackingStore  (mem:// | file:// | custom)      │
//!   └──────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod model;
pub mod backend;
pub mod store;
pub mod dispatch;
pub mod service;
pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{GridError, Result};
pub use config::Config;
pub use model::{Cell, MergeSpan, ResourceKey, Row, TableSnapshot};
pub use service::TableStoreService;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of gridstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
