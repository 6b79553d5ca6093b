//! # Compositions, State, and Effects
//!
//! `repose-core` is the small runtime that Repose components (and the hooks
//! in `repose-hooks`) run on. There are four main pieces:
//!
//! - `Composition`: one component instance, with remembered slots, a scope, and
//!   an "invalid" flag the host polls to decide when to compose again.
//! - `remember*` / `MutableState<T>`: lifecycle‑aware storage bound to the
//!   composition.
//! - `disposable_effect` / `side_effect`: side‑effects that run after a
//!   pass, with cleanup on key change and on teardown.
//! - `executor` / `timer` / `clock`: a single‑threaded task pool and
//!   clock‑driven timers for anything asynchronous.
//!
//! ## Composing
//!
//! ```rust
//! use repose_core::*;
//!
//! fn counter() -> (i32, MutableState<i32>) {
//!     let count = remember_mutable_state(|| 0);
//!     (count.get(), count)
//! }
//!
//! let comp = Composition::new();
//! let (value, count) = comp.compose(counter);
//! assert_eq!(value, 0);
//!
//! count.update(|c| *c += 1);
//! assert!(comp.is_invalidated());
//! assert_eq!(comp.compose(counter).0, 1);
//! ```
//!
//! - `remember` and `remember_state` are order‑based: the Nth call in a
//!   composition pass always refers to the Nth stored value.
//! - `remember_with_key` and `remember_state_with_key` are key‑based and more
//!   stable across conditional branches.
//!
//! ## Effects and cleanup
//!
//! ```rust
//! use repose_core::*;
//!
//! fn example() {
//!     disposable_effect((), || {
//!         log::info!("Mounted example");
//!         on_unmount(|| log::info!("Unmounted example"))
//!     });
//! }
//!
//! let comp = Composition::new();
//! comp.compose(example);
//! comp.dispose();
//! ```
//!
//! Effects run after the body of `compose` returns, in call order. Disposing
//! a composition marks its `Liveness` dead before any cleanup runs, so async
//! work that checks liveness can never write into a torn‑down component.

pub mod clock;
pub mod effects;
pub mod effects_ext;
pub mod executor;
pub mod locals;
pub mod prelude;
pub mod runtime;
pub mod scope;
pub mod signal;
pub mod state;
pub mod timer;

pub use effects::*;
pub use effects_ext::*;
pub use locals::*;
pub use prelude::*;
pub use runtime::*;
pub use scope::*;
pub use signal::*;
pub use state::*;
