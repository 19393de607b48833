//! Drives the save/restore lifecycle end to end.

use std::rc::Rc;

use retain_core::Composition;

use crate::error::SaveError;
use crate::registry::SaveableStateRegistry;
use crate::saveable::with_state_registry;
use crate::store::StateStore;

/// In-process stand-in for the platform owner of saved state.
///
/// The host pairs a [`StateStore`] with the current composition and its
/// registry: `compose` seeds a fresh registry from the store,
/// [`save`](RestorationHost::save) collects and persists, and
/// [`recreate`](RestorationHost::recreate) does a full
/// save → teardown → restore cycle, the in-process equivalent of the
/// platform destroying and rebuilding the UI.
pub struct RestorationHost<S: StateStore + Clone + 'static> {
    store: S,
    composition: Option<Composition>,
    registry: Option<SaveableStateRegistry>,
    content: Option<Rc<dyn Fn()>>,
}

impl<S: StateStore + Clone + 'static> RestorationHost<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            composition: None,
            registry: None,
            content: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> Option<&SaveableStateRegistry> {
        self.registry.as_ref()
    }

    /// Composes `content` against a registry seeded from the store. Any
    /// previous composition is torn down first.
    pub fn compose(&mut self, content: impl Fn() + 'static) {
        self.compose_rc(Rc::new(content));
    }

    fn compose_rc(&mut self, content: Rc<dyn Fn()>) {
        if let Some(old) = self.composition.take() {
            old.dispose();
        }

        let store = self.store.clone();
        let registry =
            SaveableStateRegistry::with_restored(self.store.load(), move |v| store.can_store(v));
        let composition = Composition::new();

        composition.compose({
            let registry = registry.clone();
            let content = content.clone();
            || with_state_registry(registry, move || content())
        });

        self.composition = Some(composition);
        self.registry = Some(registry);
        self.content = Some(content);
    }

    /// Runs another pass over the current content.
    pub fn recompose(&mut self) {
        if let (Some(composition), Some(registry), Some(content)) =
            (&self.composition, &self.registry, &self.content)
        {
            let registry = registry.clone();
            let content = content.clone();
            composition.compose(|| with_state_registry(registry, move || content()));
        }
    }

    /// Recomposes only when a signal read by the last pass has changed.
    /// Returns whether a pass ran.
    pub fn recompose_if_invalidated(&mut self) -> bool {
        let invalidated = self
            .composition
            .as_ref()
            .is_some_and(|c| c.is_invalidated());
        if invalidated {
            self.recompose();
        }
        invalidated
    }

    /// Collects state from every live provider and persists it.
    ///
    /// All-or-nothing: on error the store keeps its previous contents.
    pub fn save(&self) -> Result<(), SaveError> {
        let Some(registry) = &self.registry else {
            return Ok(());
        };
        let saved = registry.save_all()?;
        self.store.persist(saved)
    }

    /// Saves, tears the composition down, then composes the same content
    /// afresh so every `remember_saveable` call site restores.
    pub fn recreate(&mut self) -> Result<(), SaveError> {
        self.save()?;
        if let Some(content) = self.content.clone() {
            self.compose_rc(content);
        }
        Ok(())
    }

    /// Tears down without saving.
    pub fn dispose(&mut self) {
        if let Some(composition) = self.composition.take() {
            composition.dispose();
        }
        self.registry = None;
        self.content = None;
    }
}
