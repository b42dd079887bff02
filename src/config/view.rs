//! Read-only configuration handle shared by all selectors.

use crate::config::field::FieldValue;
use crate::config::store::Store;
use crate::error::Result;
use std::sync::Arc;

/// Shared, read-only view of the steering [`Store`].
///
/// Cloning the view is cheap; the underlying store cannot be mutated through it.
#[derive(Debug, Clone)]
pub struct ConfigView {
    store: Arc<Store>,
}

impl ConfigView {
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn from_arc(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Key of a selector-scoped parameter, `"<stage>::<name>"`.
    pub fn param(stage: &str, name: &str) -> String {
        format!("{}::{}", stage, name)
    }

    pub fn get<T: FieldValue>(&self, key: &str) -> Result<T> {
        self.store.get(key)
    }

    pub fn getif<T: FieldValue>(&self, key: &str, out: &mut T) -> Result<bool> {
        self.store.getif(key, out)
    }

    pub fn get_or<T: FieldValue>(&self, key: &str, default: T) -> Result<T> {
        self.store.get_or(key, default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl From<Store> for ConfigView {
    fn from(store: Store) -> Self {
        Self::new(store)
    }
}
