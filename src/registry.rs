use std::collections::HashMap;
use std::sync::Arc;

use crate::driver::CollectionHandle;
use crate::errors::DbError;
use crate::types::CollectionName;

/// Handle table: logical collection name to open collection handle.
///
/// Owned by a single adapter; populated during bootstrap and cleared on close.
#[derive(Default)]
pub struct CollectionRegistry {
    handles: HashMap<CollectionName, Arc<dyn CollectionHandle>>,
}

impl std::fmt::Debug for CollectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionRegistry").field("names", &self.names()).finish()
    }
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handle, returning the one it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<CollectionName>,
        handle: Arc<dyn CollectionHandle>,
    ) -> Option<Arc<dyn CollectionHandle>> {
        self.handles.insert(name.into(), handle)
    }

    /// # Errors
    /// Returns `NoSuchCollection` when `name` was never registered.
    pub fn get(&self, name: &str) -> Result<Arc<dyn CollectionHandle>, DbError> {
        self.handles.get(name).cloned().ok_or_else(|| DbError::NoSuchCollection(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn CollectionHandle>> {
        self.handles.remove(name)
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<CollectionName> {
        let mut names: Vec<_> = self.handles.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
