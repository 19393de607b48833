//! Storage backends for saved state.
//!
//! A [`StateStore`] is where a [`SavedMap`](crate::registry::SavedMap) goes
//! between compositions — the stand-in for whatever the platform keeps
//! alive across a host recreation. The store also owns the storability
//! policy the registry validates against before committing a save.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{SaveError, value_kind};
use crate::registry::SavedMap;

pub trait StateStore {
    /// Whether this backend can hold `value` as-is.
    fn can_store(&self, value: &Value) -> bool;

    /// Replaces the stored state with `saved`. Must reject state containing
    /// values [`can_store`](StateStore::can_store) refuses, leaving the
    /// previous contents intact.
    fn persist(&self, saved: SavedMap) -> Result<(), SaveError>;

    /// The state most recently persisted, empty if none.
    fn load(&self) -> SavedMap;
}

/// In-memory store accepting any value. Shared by clone, so it survives
/// the teardown of the composition it served — the moral equivalent of the
/// platform keeping a saved-state bundle across recreation.
#[derive(Clone, Default)]
pub struct MemoryStore {
    slots: Arc<RwLock<SavedMap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Current contents (diagnostics and tests).
    pub fn snapshot(&self) -> SavedMap {
        self.slots.read().clone()
    }
}

impl StateStore for MemoryStore {
    fn can_store(&self, _value: &Value) -> bool {
        true
    }

    fn persist(&self, saved: SavedMap) -> Result<(), SaveError> {
        *self.slots.write() = saved;
        Ok(())
    }

    fn load(&self) -> SavedMap {
        self.slots.read().clone()
    }
}

/// Restrictive store: scalars and strings, plus arrays/objects nested at
/// most `max_depth` levels deep. Mirrors backends with a flat native
/// format, where arbitrarily structured values need a custom saver.
#[derive(Clone)]
pub struct ScalarStore {
    slots: Arc<RwLock<SavedMap>>,
    max_depth: usize,
}

impl ScalarStore {
    pub fn new(max_depth: usize) -> Self {
        Self {
            slots: Arc::new(RwLock::new(SavedMap::new())),
            max_depth,
        }
    }

    pub fn snapshot(&self) -> SavedMap {
        self.slots.read().clone()
    }

    fn fits(&self, value: &Value, depth: usize) -> bool {
        match value {
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => true,
            Value::Array(items) => {
                depth < self.max_depth && items.iter().all(|v| self.fits(v, depth + 1))
            }
            Value::Object(fields) => {
                depth < self.max_depth && fields.values().all(|v| self.fits(v, depth + 1))
            }
        }
    }
}

impl StateStore for ScalarStore {
    fn can_store(&self, value: &Value) -> bool {
        self.fits(value, 0)
    }

    fn persist(&self, saved: SavedMap) -> Result<(), SaveError> {
        for (key, value) in &saved {
            if !self.can_store(value) {
                return Err(SaveError::Unstorable {
                    key: key.clone(),
                    kind: value_kind(value),
                });
            }
        }
        *self.slots.write() = saved;
        Ok(())
    }

    fn load(&self) -> SavedMap {
        self.slots.read().clone()
    }
}
