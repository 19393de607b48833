//! # Signals, slots, and scopes
//!
//! Retain's substrate is a small reactive core rather than a widget tree
//! with mutable fields. Three pieces matter:
//!
//! - `Signal<T>` — observable, reactive value.
//! - `remember*` — lifecycle-aware storage bound to composition.
//! - `Scope` / `scoped_effect` — explicit teardown hooks.
//!
//! ## Signals
//!
//! `Signal<T>` is a cloneable handle to a piece of state:
//!
//! ```rust
//! use retain_core::*;
//!
//! let count = signal(0);
//! count.set(1);
//! count.update(|v| *v += 1);
//! assert_eq!(count.get(), 2);
//! ```
//!
//! Reads performed during a composition pass register that composition in a
//! dependency graph; later writes mark it dirty so the driver knows a
//! recomposition is due.
//!
//! ## Remembered state
//!
//! State lives in `remember_*` slots owned by a [`Composition`]:
//!
//! ```rust
//! use retain_core::*;
//!
//! let composition = Composition::new();
//! let build = || {
//!     let count = remember_state(|| 0); // Rc<RefCell<i32>>
//!     *count.borrow_mut() += 1;
//!     *count.borrow()
//! };
//!
//! assert_eq!(composition.compose(build), 1);
//! assert_eq!(composition.compose(build), 2); // same slot, same cell
//! ```
//!
//! - `remember` and `remember_state` are order-based: the Nth call in a
//!   pass always refers to the Nth stored value.
//! - `remember_with_key` and `remember_state_with_key` are key-based and
//!   stable across conditional branches.
//!
//! ## Scopes and cleanup
//!
//! Disposal of a [`Composition`] tears down its root [`Scope`], running
//! every disposer registered through `scoped_effect` / `on_unmount`. This
//! is the hook persistent-state registrations use to unregister themselves
//! when the owning subtree goes away.

pub mod effects;
pub mod invalidate;
pub mod locals;
pub mod prelude;
pub mod runtime;
pub mod scope;
pub mod signal;

pub use effects::*;
pub use locals::*;
pub use prelude::*;
pub use runtime::*;
pub use scope::*;
pub use signal::*;
