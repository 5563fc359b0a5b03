//! Handle Registry
//!
//! Maps each `ResourceKey` to its single `ResourceHandle`, creating handles
//! lazily on first use and reusing them for the registry's lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::StoreConnector;
use crate::error::Result;
use crate::model::ResourceKey;

use super::ResourceHandle;

/// Owns every resource handle of a service
///
/// ## Concurrency:
/// - `handles`: short `Mutex` critical section, held only for
///   check-then-insert (plus the I/O-free `connect`)
/// - The mutex is independent of any handle's lock and is never held while
///   a store is read or written, so different keys never serialize on it
///   beyond the lookup itself.
///
/// Handles are never evicted.
pub struct HandleRegistry {
    /// Binds new keys to backing stores
    connector: Arc<dyn StoreConnector>,

    /// One handle per key identity, for the registry's lifetime
    handles: Mutex<HashMap<ResourceKey, Arc<ResourceHandle>>>,
}

impl HandleRegistry {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            connector,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Get the handle for `key`, creating it if this is the first request.
    ///
    /// Keys are registered under the connector's identity, so two spellings
    /// of the same store share one handle. Concurrent callers with equal
    /// identities all receive the same handle; the first one to take the
    /// mutex constructs it.
    pub fn get_or_create(&self, key: &ResourceKey) -> Result<Arc<ResourceHandle>> {
        let key = self.connector.identity(key);
        let mut handles = self.handles.lock();

        if let Some(handle) = handles.get(&key) {
            return Ok(Arc::clone(handle));
        }

        let store = self.connector.connect(&key)?;
        let handle = Arc::new(ResourceHandle::new(key.clone(), store));
        handles.insert(key.clone(), Arc::clone(&handle));

        tracing::debug!("Created handle for {} ({} open)", key, handles.len());
        Ok(handle)
    }

    /// Existing handle for `key`, without creating one
    pub fn get(&self, key: &ResourceKey) -> Option<Arc<ResourceHandle>> {
        let key = self.connector.identity(key);
        self.handles.lock().get(&key).cloned()
    }

    /// Number of handles created so far
    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }
}
