pub use crate::effects::{Dispose, effect, on_unmount};
pub use crate::locals::{local, local_or_default, with_local};
pub use crate::runtime::{
    Composition, current_slot_position, remember, remember_state, remember_state_with_key,
    remember_with_key,
};
pub use crate::scope::{Scope, current_scope, scoped_effect};
pub use crate::signal::{Signal, signal};
