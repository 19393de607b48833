//! # Composition locals
//!
//! Ambient values scoped to the dynamic extent of a composition subtree.
//! A local is keyed by its type: `with_local(value, f)` makes `value`
//! visible to every `local::<T>()` lookup performed while `f` runs,
//! innermost provider winning.
//!
//! ```rust
//! use retain_core::locals::{local, with_local};
//!
//! #[derive(Clone, PartialEq, Debug)]
//! struct Density(f32);
//!
//! with_local(Density(2.0), || {
//!     assert_eq!(local::<Density>(), Some(Density(2.0)));
//!     with_local(Density(3.0), || {
//!         assert_eq!(local::<Density>(), Some(Density(3.0)));
//!     });
//! });
//! assert_eq!(local::<Density>(), None);
//! ```

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static LOCALS_STACK: RefCell<Vec<HashMap<TypeId, Box<dyn Any>>>> = RefCell::new(Vec::new());
}

fn with_locals_frame<R>(f: impl FnOnce() -> R) -> R {
    // Frame guard ensures pop on unwind
    struct Guard;
    impl Drop for Guard {
        fn drop(&mut self) {
            LOCALS_STACK.with(|st| {
                st.borrow_mut().pop();
            });
        }
    }
    LOCALS_STACK.with(|st| st.borrow_mut().push(HashMap::new()));
    let _guard = Guard;
    f()
}

/// Provides `value` as the ambient `T` for the duration of `f`.
pub fn with_local<T: Clone + 'static, R>(value: T, f: impl FnOnce() -> R) -> R {
    with_locals_frame(|| {
        LOCALS_STACK.with(|st| {
            if let Some(top) = st.borrow_mut().last_mut() {
                top.insert(TypeId::of::<T>(), Box::new(value));
            }
        });
        f()
    })
}

/// Innermost ambient `T`, if any provider is in scope.
pub fn local<T: Clone + 'static>() -> Option<T> {
    LOCALS_STACK.with(|st| {
        for frame in st.borrow().iter().rev() {
            if let Some(v) = frame.get(&TypeId::of::<T>())
                && let Some(t) = v.downcast_ref::<T>()
            {
                return Some(t.clone());
            }
        }
        None
    })
}

/// Like [`local`], falling back to `T::default()`.
pub fn local_or_default<T: Clone + Default + 'static>() -> T {
    local::<T>().unwrap_or_default()
}
