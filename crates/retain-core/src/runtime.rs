use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::invalidate::{self, CompositionId, PassGuard};
use crate::scope::Scope;

thread_local! {
    static COMPOSER: RefCell<Rc<RefCell<Composer>>> =
        RefCell::new(Rc::new(RefCell::new(Composer::default())));
}

/// Slot storage for one composition: positional slots resolved by call
/// order, plus keyed slots for branch-stable storage.
#[derive(Default)]
pub struct Composer {
    slots: Vec<Box<dyn Any>>,
    cursor: usize,
    keyed_slots: HashMap<String, Box<dyn Any>>,
}

impl Composer {
    pub fn clear(&mut self) {
        self.slots.clear();
        self.keyed_slots.clear();
        self.cursor = 0;
    }
}

fn with_composer<R>(f: impl FnOnce(&mut Composer) -> R) -> R {
    let composer = COMPOSER.with(|c| c.borrow().clone());
    let mut composer = composer.borrow_mut();
    f(&mut composer)
}

fn swap_composer(new: Rc<RefCell<Composer>>) -> Rc<RefCell<Composer>> {
    COMPOSER.with(|c| std::mem::replace(&mut *c.borrow_mut(), new))
}

/// Position the next positional `remember` call will occupy in the current
/// pass. Stable across recompositions with the same call order, distinct
/// between sibling call sites, so it can serve as a structural identifier.
pub fn current_slot_position() -> usize {
    with_composer(|c| c.cursor)
}

/// Slot-based remember (sequential composition only)
pub fn remember<T: 'static>(init: impl FnOnce() -> T) -> Rc<T> {
    with_composer(|c| {
        let cursor = c.cursor;
        c.cursor += 1;

        if cursor >= c.slots.len() {
            let rc: Rc<T> = Rc::new(init());
            c.slots.push(Box::new(rc.clone()));
            return rc;
        }

        if let Some(rc) = c.slots[cursor].downcast_ref::<Rc<T>>() {
            rc.clone()
        } else {
            log::warn!(
                "remember: slot {} type changed; replacing. \
                 If this is due to conditional composition, prefer remember_with_key.",
                cursor
            );
            let rc: Rc<T> = Rc::new(init());
            c.slots[cursor] = Box::new(rc.clone());
            rc
        }
    })
}

/// Key-based remember
pub fn remember_with_key<T: 'static>(key: impl Into<String>, init: impl FnOnce() -> T) -> Rc<T> {
    with_composer(|c| {
        let key = key.into();

        if let Some(existing) = c.keyed_slots.get(&key) {
            if let Some(rc) = existing.downcast_ref::<Rc<T>>() {
                return rc.clone();
            } else {
                log::warn!(
                    "remember_with_key: key '{}' reused with a different type; replacing.",
                    key
                );
            }
        }

        let rc: Rc<T> = Rc::new(init());
        c.keyed_slots.insert(key, Box::new(rc.clone()));
        rc
    })
}

pub fn remember_state<T: 'static>(init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
    remember(|| RefCell::new(init()))
}

pub fn remember_state_with_key<T: 'static>(
    key: impl Into<String>,
    init: impl FnOnce() -> T,
) -> Rc<RefCell<T>> {
    remember_with_key(key, || RefCell::new(init()))
}

/// One composable tree: owns its slot storage and root scope, and drives
/// passes over a build closure.
///
/// Calling [`compose`](Composition::compose) again with the same closure is
/// a recomposition: the positional cursor resets and slots are resolved by
/// call order, so `remember` values survive between passes. Dropping (or
/// [`dispose`](Composition::dispose)-ing) the composition tears down the
/// scope, which runs every registered disposer.
pub struct Composition {
    id: CompositionId,
    composer: Rc<RefCell<Composer>>,
    scope: Scope,
}

struct ComposerGuard {
    prev: Rc<RefCell<Composer>>,
}

impl Drop for ComposerGuard {
    fn drop(&mut self) {
        swap_composer(self.prev.clone());
    }
}

impl Composition {
    pub fn new() -> Self {
        Self {
            id: invalidate::new_composition(),
            composer: Rc::new(RefCell::new(Composer::default())),
            scope: Scope::new(),
        }
    }

    /// Runs one pass of `f` against this composition's slots and scope.
    pub fn compose<R>(&self, f: impl FnOnce() -> R) -> R {
        let prev = swap_composer(self.composer.clone());
        let _composer_guard = ComposerGuard { prev };
        self.composer.borrow_mut().cursor = 0;

        let _pass = PassGuard::begin(self.id);
        self.scope.run(f)
    }

    /// True when a signal read during the last pass has since been written.
    pub fn is_invalidated(&self) -> bool {
        invalidate::is_dirty(self.id)
    }

    /// Recomposes only when a dependency changed; returns the pass result.
    pub fn recompose_if_invalidated<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        if self.is_invalidated() {
            Some(self.compose(f))
        } else {
            None
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Tears down the root scope (running all disposers) and releases the
    /// slot storage.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Default for Composition {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Composition {
    fn drop(&mut self) {
        // Disposers run against still-live slots, then storage goes away.
        self.scope.clone().dispose();
        self.composer.borrow_mut().clear();
        invalidate::retire_composition(self.id);
    }
}
