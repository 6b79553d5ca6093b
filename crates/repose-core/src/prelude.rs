pub use crate::clock::{Clock, ManualClock, SystemClock, now, set_clock};
pub use crate::effects::{Dispose, on_unmount};
pub use crate::effects_ext::{
    Latest, disposable_effect, disposable_effect_with, mount_effect, remember_latest, side_effect,
};
pub use crate::executor::{pump, run_until_idle, spawn_local};
pub use crate::locals::{local, local_or_default, provide};
pub use crate::runtime::{
    Composition, Invalidator, after_compose, current_invalidator, remember, remember_state,
    remember_state_with_key, remember_with_key,
};
pub use crate::scope::{Liveness, Scope, current_liveness, current_scope, scoped_effect};
pub use crate::signal::{Signal, signal};
pub use crate::state::{MutableState, remember_mutable_state};
pub use crate::timer::sleep;
