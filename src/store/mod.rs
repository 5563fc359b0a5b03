//! Store Module
//!
//! Per-resource handles and the registry that owns them.
//!
//! ## Lock Ordering
//! ```text
//!   HandleRegistry mutex          (lookup / insert only)
//!          │ released
//!          ▼
//!   ResourceHandle RwLock         (read: get_*, write: save_* / append)
//!          │ held across
//!          ▼
//!   BackingStore calls
//! ```
//! The registry mutex is always released before a handle lock is taken, so
//! the two never nest.

mod handle;
mod registry;

pub use handle::ResourceHandle;
pub use registry::HandleRegistry;
