//! The saveable state registry.
//!
//! One registry backs one composition. Call sites register a *value
//! provider* under a stable string key; at save time every live provider is
//! queried and the produced representations are validated against the
//! store's policy before any of them are committed. Values restored from a
//! previous life are handed out through [`consume_restored`], once per key.
//!
//! [`consume_restored`]: SaveableStateRegistry::consume_restored

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use serde_json::Value;
use slotmap::{SlotMap, new_key_type};

use crate::error::{SaveError, value_kind};

/// Saved state of one registry, keyed by provider key.
pub type SavedMap = BTreeMap<String, Value>;

type ValueProvider = Rc<dyn Fn() -> Result<Option<Value>, SaveError>>;

new_key_type! {
    struct ProviderId;
}

struct ProviderEntry {
    key: String,
    provide: ValueProvider,
}

struct Inner {
    restored: SavedMap,
    providers: SlotMap<ProviderId, ProviderEntry>,
    by_key: BTreeMap<String, ProviderId>,
    can_store: Rc<dyn Fn(&Value) -> bool>,
}

/// Registry of saveable state providers, keyed by stable structural
/// identifiers.
///
/// Invariant: each key resolves to at most one live provider. Registering
/// over an occupied key replaces the prior provider; the displaced
/// [`Registration`] handle becomes inert.
#[derive(Clone)]
pub struct SaveableStateRegistry {
    inner: Rc<RefCell<Inner>>,
}

impl SaveableStateRegistry {
    pub fn new(can_store: impl Fn(&Value) -> bool + 'static) -> Self {
        Self::with_restored(SavedMap::new(), can_store)
    }

    /// A registry seeded with previously saved state.
    pub fn with_restored(restored: SavedMap, can_store: impl Fn(&Value) -> bool + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                restored,
                providers: SlotMap::with_key(),
                by_key: BTreeMap::new(),
                can_store: Rc::new(can_store),
            })),
        }
    }

    /// Takes the restored value for `key`, at most once per registry life.
    pub fn consume_restored(&self, key: &str) -> Option<Value> {
        let value = self.inner.borrow_mut().restored.remove(key);
        if value.is_some() {
            log::debug!("restored saveable state for key '{key}'");
        }
        value
    }

    /// Registers `provide` as the single value provider for `key`.
    ///
    /// The provider is queried at save time, not now; returning `Ok(None)`
    /// skips the key for that save. Dropping the returned [`Registration`]
    /// (or calling [`Registration::unregister`]) removes the provider.
    pub fn register(
        &self,
        key: impl Into<String>,
        provide: impl Fn() -> Result<Option<Value>, SaveError> + 'static,
    ) -> Registration {
        let key = key.into();
        let mut inner = self.inner.borrow_mut();

        if let Some(old) = inner.by_key.remove(&key) {
            inner.providers.remove(old);
            log::warn!(
                "saveable state provider for key '{}' replaced; \
                 a key identifies a single provider at a time.",
                key
            );
        }

        let id = inner.providers.insert(ProviderEntry {
            key: key.clone(),
            provide: Rc::new(provide),
        });
        inner.by_key.insert(key.clone(), id);

        Registration {
            registry: Rc::downgrade(&self.inner),
            key,
            id,
        }
    }

    /// Whether the active store accepts `value` as-is.
    pub fn can_be_saved(&self, value: &Value) -> bool {
        let can_store = self.inner.borrow().can_store.clone();
        can_store(value)
    }

    /// Number of live providers (diagnostics and tests).
    pub fn provider_count(&self) -> usize {
        self.inner.borrow().by_key.len()
    }

    /// Queries every live provider and returns the combined saved state.
    ///
    /// All-or-nothing: every produced value is validated against the store
    /// policy, and the first failure aborts the save with nothing written.
    /// Restored values that no provider re-claimed are carried forward so
    /// they survive the next life too.
    pub fn save_all(&self) -> Result<SavedMap, SaveError> {
        // Snapshot the provider list before querying: providers are free to
        // read other state while we hold no borrow.
        let (mut out, providers, can_store) = {
            let inner = self.inner.borrow();
            let providers: Vec<(String, ValueProvider)> = inner
                .by_key
                .iter()
                .filter_map(|(key, id)| {
                    inner
                        .providers
                        .get(*id)
                        .map(|entry| (key.clone(), entry.provide.clone()))
                })
                .collect();
            (inner.restored.clone(), providers, inner.can_store.clone())
        };

        for (key, provide) in providers {
            if let Some(value) = provide()? {
                if !can_store(&value) {
                    return Err(SaveError::Unstorable {
                        key,
                        kind: value_kind(&value),
                    });
                }
                out.insert(key, value);
            }
        }

        log::debug!("collected saveable state for {} key(s)", out.len());
        Ok(out)
    }
}

/// Handle for one provider registration.
///
/// Unregisters on drop. A handle whose key was since claimed by a newer
/// registration does nothing: the replacement owns the key.
pub struct Registration {
    registry: Weak<RefCell<Inner>>,
    key: String,
    id: ProviderId,
}

impl Registration {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn unregister(self) {
        drop(self);
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            let mut inner = inner.borrow_mut();
            inner.providers.remove(self.id);
            if inner.by_key.get(&self.key) == Some(&self.id) {
                inner.by_key.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SaveableStateRegistry {
        SaveableStateRegistry::new(|_| true)
    }

    #[test]
    fn save_all_queries_providers_late() {
        let reg = registry();
        let current = Rc::new(RefCell::new(1));

        let _r = reg.register("count", {
            let current = current.clone();
            move || Ok(Some(json!(*current.borrow())))
        });

        *current.borrow_mut() = 5;
        let saved = reg.save_all().unwrap();
        assert_eq!(saved.get("count"), Some(&json!(5)));
    }

    #[test]
    fn reregistering_replaces_instead_of_duplicating() {
        let reg = registry();
        let _old = reg.register("name", || Ok(Some(json!("old"))));
        let _new = reg.register("name", || Ok(Some(json!("new"))));

        assert_eq!(reg.provider_count(), 1);
        let saved = reg.save_all().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved.get("name"), Some(&json!("new")));
    }

    #[test]
    fn displaced_handle_cannot_evict_its_replacement() {
        let reg = registry();
        let old = reg.register("name", || Ok(Some(json!("old"))));
        let _new = reg.register("name", || Ok(Some(json!("new"))));

        old.unregister();
        assert_eq!(reg.provider_count(), 1);
        assert_eq!(reg.save_all().unwrap().get("name"), Some(&json!("new")));
    }

    #[test]
    fn dropping_the_handle_unregisters() {
        let reg = registry();
        {
            let _r = reg.register("gone", || Ok(Some(json!(1))));
            assert_eq!(reg.provider_count(), 1);
        }
        assert_eq!(reg.provider_count(), 0);
        assert!(reg.save_all().unwrap().is_empty());
    }

    #[test]
    fn consume_restored_yields_each_key_once() {
        let mut restored = SavedMap::new();
        restored.insert("count".into(), json!(3));
        let reg = SaveableStateRegistry::with_restored(restored, |_| true);

        assert_eq!(reg.consume_restored("count"), Some(json!(3)));
        assert_eq!(reg.consume_restored("count"), None);
        assert_eq!(reg.consume_restored("missing"), None);
    }

    #[test]
    fn unconsumed_restored_values_carry_forward() {
        let mut restored = SavedMap::new();
        restored.insert("dormant".into(), json!("still here"));
        let reg = SaveableStateRegistry::with_restored(restored, |_| true);

        let _r = reg.register("live", || Ok(Some(json!(1))));
        let saved = reg.save_all().unwrap();
        assert_eq!(saved.get("dormant"), Some(&json!("still here")));
        assert_eq!(saved.get("live"), Some(&json!(1)));
    }

    #[test]
    fn provider_claims_override_carried_restores() {
        let mut restored = SavedMap::new();
        restored.insert("count".into(), json!(1));
        let reg = SaveableStateRegistry::with_restored(restored, |_| true);

        // Registered without consuming: the live value wins on save.
        let _r = reg.register("count", || Ok(Some(json!(2))));
        assert_eq!(reg.save_all().unwrap().get("count"), Some(&json!(2)));
    }

    #[test]
    fn skipped_providers_leave_no_entry() {
        let reg = registry();
        let _r = reg.register("maybe", || Ok(None));
        assert!(reg.save_all().unwrap().is_empty());
    }

    #[test]
    fn unstorable_value_fails_the_whole_save() {
        let reg = SaveableStateRegistry::new(|v| !v.is_array());
        let _ok = reg.register("a", || Ok(Some(json!(1))));
        let _bad = reg.register("b", || Ok(Some(json!([1, 2]))));

        let err = reg.save_all().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("`b`"), "unexpected message: {message}");
        assert!(message.contains("custom Saver"), "unexpected message: {message}");
    }
}
