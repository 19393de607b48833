//! # Saveable state
//!
//! State held in `remember` slots dies with its composition. This crate
//! adds the piece that survives: `remember_saveable`, a remembered
//! `Signal` whose value is collected into a [`StateStore`] on save and
//! handed back on the next composition of the same call site.
//!
//! ```rust
//! use retain_saveable::{MemoryStore, RestorationHost, remember_saveable};
//!
//! let mut host = RestorationHost::new(MemoryStore::new());
//! let count = std::rc::Rc::new(std::cell::RefCell::new(None));
//!
//! let slot = count.clone();
//! host.compose(move || {
//!     *slot.borrow_mut() = Some(remember_saveable(|| 0i64));
//! });
//!
//! count.borrow().as_ref().unwrap().set(3);
//! host.recreate().unwrap(); // save, tear down, compose afresh
//! assert_eq!(count.borrow().as_ref().unwrap().get(), 3);
//! ```
//!
//! Three layers, each usable on its own:
//!
//! - [`Saver`] — a pure save/restore strategy pair. [`AutoSaver`] covers
//!   anything serde can round-trip; [`saver`] and [`map_saver`] build
//!   custom strategies for everything else.
//! - [`SaveableStateRegistry`] — value providers keyed by stable
//!   structural identifiers, one provider per key, queried late and
//!   validated before anything is committed.
//! - [`StateStore`] — where saved state lives between compositions, and
//!   the policy deciding what is storable at all.

pub mod error;
pub mod host;
pub mod registry;
pub mod saveable;
pub mod saver;
pub mod store;

pub use error::{SaveError, SaverError};
pub use host::RestorationHost;
pub use registry::{Registration, SaveableStateRegistry, SavedMap};
pub use saveable::{
    remember_saveable, remember_saveable_keyed, remember_saveable_with, state_registry,
    with_state_registry,
};
pub use saver::{AutoSaver, FnSaver, Saver, auto_saver, map_saver, saver};
pub use store::{MemoryStore, ScalarStore, StateStore};
