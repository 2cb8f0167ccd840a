//! Handle table for simulation sources
//!
//! The control thread registers sources and receives small integer handles;
//! effects on the audio thread carry those handles as parameters and resolve
//! them back to sources each block.
//!
//! Two independent locks guard the free-handle pool and the handle-to-source
//! map, so lookups are never serialized behind handle allocation. The locks are
//! never nested.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Integer handle for a registered simulation source.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceHandle(i32);

impl SourceHandle {
    /// Returned when a source could not be registered.
    pub const INVALID: SourceHandle = SourceHandle(-1);

    pub fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> i32 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }
}

impl std::fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SourceHandle({})", self.0)
    }
}

#[derive(Default)]
struct HandlePool {
    next: i32,
    free: Vec<i32>,
}

impl HandlePool {
    fn allocate(&mut self) -> i32 {
        // Most recently freed first.
        self.free.pop().unwrap_or_else(|| {
            let handle = self.next;
            self.next += 1;
            handle
        })
    }
}

/// Maps handles to reference-counted sources.
pub struct SourceRegistry<S> {
    handles: Mutex<HandlePool>,
    sources: Mutex<HashMap<SourceHandle, Arc<S>>>,
}

impl<S> Default for SourceRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SourceRegistry<S> {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(HandlePool::default()),
            sources: Mutex::new(HashMap::new()),
        }
    }

    /// Retains `source` and returns a handle unique among registered sources.
    pub fn register(&self, source: Arc<S>) -> SourceHandle {
        let handle = SourceHandle(self.handles.lock().allocate());

        let previous = self.sources.lock().insert(handle, source);
        debug_assert!(previous.is_none(), "{handle} was still registered");

        log::debug!("Registered simulation source as {}", handle);
        handle
    }

    /// Releases the source behind `handle` and returns the handle to the pool.
    ///
    /// Returns false, and leaves the pool untouched, if nothing was registered
    /// under `handle`.
    pub fn unregister(&self, handle: SourceHandle) -> bool {
        let removed = self.sources.lock().remove(&handle);
        if removed.is_none() {
            log::warn!("Ignoring removal of unregistered {}", handle);
            return false;
        }

        self.handles.lock().free.push(handle.0);
        log::debug!("Unregistered simulation source {}", handle);
        true
    }

    /// The source registered under `handle`, if any.
    pub fn resolve(&self, handle: SourceHandle) -> Option<Arc<S>> {
        self.sources.lock().get(&handle).cloned()
    }

    pub fn len(&self) -> usize {
        self.sources.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> Drop for SourceRegistry<S> {
    fn drop(&mut self) {
        let remaining = self.sources.get_mut().len();
        if remaining > 0 {
            log::debug!("Releasing {} simulation sources with registry", remaining);
        }
    }
}
