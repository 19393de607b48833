//! `remember_saveable`: remembered state that survives host recreation.
//!
//! Same slot discipline as `remember`, with one addition: the value is
//! wrapped in a `Signal` and a late-binding provider is registered with the
//! ambient [`SaveableStateRegistry`] so the current value can be collected
//! at save time. On first composition the call site consumes its restored
//! value (if the previous life saved one); on scope teardown the provider
//! unregisters.

use std::cell::RefCell;
use std::rc::Rc;

use retain_core::{
    Signal, current_slot_position, local, on_unmount, remember, scoped_effect, signal, with_local,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SaveError;
use crate::registry::{Registration, SaveableStateRegistry};
use crate::saver::{Saver, auto_saver};

/// Provides `registry` as the ambient registry for every
/// `remember_saveable` call site composed inside `f`.
pub fn with_state_registry<R>(registry: SaveableStateRegistry, f: impl FnOnce() -> R) -> R {
    with_local(registry, f)
}

/// The ambient registry, if one is provided.
pub fn state_registry() -> Option<SaveableStateRegistry> {
    local::<SaveableStateRegistry>()
}

struct Holder<T: 'static> {
    signal: Rc<Signal<T>>,
    // Refreshed every pass so saves use the latest strategy.
    saver: Rc<RefCell<Rc<dyn Saver<T>>>>,
    key: RefCell<String>,
    registration: Rc<RefCell<Option<Registration>>>,
}

/// Remembered, persisted state with the default serde strategy and a key
/// derived from the call site's structural position.
pub fn remember_saveable<T>(init: impl FnOnce() -> T) -> Rc<Signal<T>>
where
    T: Serialize + DeserializeOwned + Clone + 'static,
{
    remember_saveable_with(None, auto_saver::<T>(), init)
}

/// Remembered, persisted state under a caller-supplied key.
pub fn remember_saveable_keyed<T>(key: &str, init: impl FnOnce() -> T) -> Rc<Signal<T>>
where
    T: Serialize + DeserializeOwned + Clone + 'static,
{
    remember_saveable_with(Some(key), auto_saver::<T>(), init)
}

/// Full form: explicit strategy, optional explicit key (`None` or an empty
/// key falls back to the structural position).
pub fn remember_saveable_with<T: Clone + 'static>(
    key: Option<&str>,
    saver: impl Saver<T>,
    init: impl FnOnce() -> T,
) -> Rc<Signal<T>> {
    let position = current_slot_position();
    let saver: Rc<dyn Saver<T>> = Rc::new(saver);
    let requested = match key {
        Some(k) if !k.is_empty() => k.to_string(),
        _ => format!("slot:{position}"),
    };

    let holder = remember({
        let saver = saver.clone();
        let requested = requested.clone();
        move || {
            let registry = local::<SaveableStateRegistry>();
            let value = registry
                .as_ref()
                .and_then(|r| r.consume_restored(&requested))
                .and_then(|saved| saver.restore(&saved))
                .unwrap_or_else(init);

            let holder = Holder {
                signal: Rc::new(signal(value)),
                saver: Rc::new(RefCell::new(saver)),
                key: RefCell::new(requested.clone()),
                registration: Rc::new(RefCell::new(None)),
            };

            match registry {
                Some(registry) => install(&holder, &registry, &requested),
                None => log::debug!(
                    "remember_saveable: no ambient registry; '{requested}' will not be persisted"
                ),
            }

            // Unregister when the owning scope is torn down.
            scoped_effect({
                let registration = holder.registration.clone();
                move || {
                    on_unmount(move || {
                        registration.borrow_mut().take();
                    })
                }
            });

            holder
        }
    });

    *holder.saver.borrow_mut() = saver;

    if *holder.key.borrow() != requested {
        // Key changed: the prior provider goes away before the new key is
        // claimed. The current value carries over untouched.
        holder.registration.borrow_mut().take();
        *holder.key.borrow_mut() = requested.clone();
        if let Some(registry) = local::<SaveableStateRegistry>() {
            install(&holder, &registry, &requested);
        }
    }

    holder.signal.clone()
}

fn install<T: Clone + 'static>(holder: &Holder<T>, registry: &SaveableStateRegistry, key: &str) {
    let provide = {
        let signal = holder.signal.clone();
        let saver = holder.saver.clone();
        let key = key.to_string();
        move || -> Result<Option<Value>, SaveError> {
            let strategy = saver.borrow().clone();
            signal
                .with(|v| strategy.save(v))
                .map(Some)
                .map_err(|source| SaveError::Saver {
                    key: key.clone(),
                    source,
                })
        }
    };
    *holder.registration.borrow_mut() = Some(registry.register(key, provide));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saver::saver;
    use retain_core::Composition;
    use serde_json::json;

    fn registry() -> SaveableStateRegistry {
        SaveableStateRegistry::new(|_| true)
    }

    #[test]
    fn registers_a_provider_and_saves_the_live_value() {
        let reg = registry();
        let composition = Composition::new();

        let count = composition.compose({
            let reg = reg.clone();
            move || with_state_registry(reg, || remember_saveable(|| 0i64))
        });

        count.set(41);
        count.update(|v| *v += 1);

        let saved = reg.save_all().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved.values().next(), Some(&json!(42)));
    }

    #[test]
    fn recomposition_does_not_duplicate_the_provider() {
        let reg = registry();
        let composition = Composition::new();
        let build = {
            let reg = reg.clone();
            move || with_state_registry(reg.clone(), || remember_saveable(|| 0i64))
        };

        composition.compose(&build);
        composition.compose(&build);
        composition.compose(&build);

        assert_eq!(reg.provider_count(), 1);
    }

    #[test]
    fn structural_keys_distinguish_sibling_call_sites() {
        let reg = registry();
        let composition = Composition::new();

        composition.compose({
            let reg = reg.clone();
            move || {
                with_state_registry(reg, || {
                    let a = remember_saveable(|| 1i64);
                    let b = remember_saveable(|| 2i64);
                    a.set(10);
                    b.set(20);
                })
            }
        });

        let saved = reg.save_all().unwrap();
        let values: Vec<_> = saved.values().cloned().collect();
        assert_eq!(saved.len(), 2);
        assert!(values.contains(&json!(10)));
        assert!(values.contains(&json!(20)));
    }

    #[test]
    fn restores_from_a_seeded_registry() {
        let mut restored = crate::registry::SavedMap::new();
        restored.insert("count".into(), json!(17));
        let reg = SaveableStateRegistry::with_restored(restored, |_| true);

        let composition = Composition::new();
        let count = composition.compose({
            let reg = reg.clone();
            move || with_state_registry(reg, || remember_saveable_keyed("count", || 0i64))
        });

        assert_eq!(count.get(), 17);
    }

    #[test]
    fn restore_shape_mismatch_falls_back_to_init() {
        let mut restored = crate::registry::SavedMap::new();
        restored.insert("count".into(), json!("not a number"));
        let reg = SaveableStateRegistry::with_restored(restored, |_| true);

        let composition = Composition::new();
        let count = composition.compose({
            let reg = reg.clone();
            move || with_state_registry(reg, || remember_saveable_keyed("count", || 5i64))
        });

        assert_eq!(count.get(), 5);
    }

    #[test]
    fn key_change_unregisters_the_prior_provider() {
        let reg = registry();
        let composition = Composition::new();
        let key = Rc::new(RefCell::new("first".to_string()));

        let build = {
            let reg = reg.clone();
            let key = key.clone();
            move || {
                let k = key.borrow().clone();
                with_state_registry(reg.clone(), || {
                    let v = remember_saveable_keyed(&k, || 0i64);
                    v.set(9);
                })
            }
        };

        composition.compose(&build);
        assert!(reg.save_all().unwrap().contains_key("first"));

        *key.borrow_mut() = "second".to_string();
        composition.compose(&build);

        let saved = reg.save_all().unwrap();
        assert!(!saved.contains_key("first"));
        assert_eq!(saved.get("second"), Some(&json!(9)));
        assert_eq!(reg.provider_count(), 1);
    }

    #[test]
    fn disposal_unregisters_every_provider() {
        let reg = registry();
        let composition = Composition::new();

        composition.compose({
            let reg = reg.clone();
            move || {
                with_state_registry(reg, || {
                    let _a = remember_saveable(|| 1i64);
                    let _b = remember_saveable(|| 2i64);
                })
            }
        });
        assert_eq!(reg.provider_count(), 2);

        composition.dispose();
        assert_eq!(reg.provider_count(), 0);
        assert!(reg.save_all().unwrap().is_empty());
    }

    #[test]
    fn latest_saver_wins_at_save_time() {
        let reg = registry();
        let composition = Composition::new();
        let tag = Rc::new(RefCell::new("v1"));

        let build = {
            let reg = reg.clone();
            let tag = tag.clone();
            move || {
                let tag = *tag.borrow();
                with_state_registry(reg.clone(), || {
                    remember_saveable_with(
                        Some("tagged"),
                        saver(
                            move |v: &i64| json!({ "tag": tag, "value": v }),
                            |saved| saved.get("value").and_then(Value::as_i64),
                        ),
                        || 3,
                    );
                })
            }
        };

        composition.compose(&build);
        *tag.borrow_mut() = "v2";
        composition.compose(&build);

        let saved = reg.save_all().unwrap();
        assert_eq!(saved.get("tagged"), Some(&json!({ "tag": "v2", "value": 3 })));
    }

    #[test]
    fn composes_without_an_ambient_registry() {
        let composition = Composition::new();
        let count = composition.compose(|| remember_saveable(|| 12i64));
        assert_eq!(count.get(), 12);
    }
}
