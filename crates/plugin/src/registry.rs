//! Instance registry
//!
//! The host stores a single opaque value per output instance and hands it
//! back on every flush. Instead of passing a pointer across the boundary,
//! instances live in this process-wide registry keyed by a non-zero
//! integer handle; the host only ever sees the handle.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::instance::Instance;

/// Handle-keyed store of live plugin instances.
pub struct Registry {
    next_handle: AtomicU64,
    instances: Mutex<HashMap<u64, Arc<Instance>>>,
}

impl Registry {
    fn new() -> Self {
        Self {
            // 0 is reserved as the init-failure sentinel
            next_handle: AtomicU64::new(1),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Store an instance and return its handle.
    pub fn insert(&self, instance: Instance) -> u64 {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.instances.lock().insert(handle, Arc::new(instance));
        handle
    }

    /// Look up a live instance.
    pub fn get(&self, handle: u64) -> Option<Arc<Instance>> {
        self.instances.lock().get(&handle).cloned()
    }

    /// Remove an instance; it shuts down when the last reference drops.
    pub fn remove(&self, handle: u64) -> Option<Arc<Instance>> {
        self.instances.lock().remove(&handle)
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }
}

/// The process-wide registry used by the plugin entry points.
pub fn global() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::new)
}
