//! # Hooks
//!
//! Reusable component logic for Repose compositions. Every `use_*` function
//! is meant to be called from a composition body, in the same order on every
//! pass, like `remember`.
//!
//! The centrepiece is [`use_promise`], which tracks an async task, resolves
//! overlapping runs by a race policy and never publishes into a disposed
//! component. Around it sit smaller hooks:
//!
//! - state: [`use_boolean`], [`use_mounted_state`], [`use_delayed_value`],
//!   [`use_snapshot_state`], [`use_persistent_state`], [`use_previous`]
//! - lifecycle and effects: [`use_did_mount`], [`use_will_unmount`],
//!   [`use_is_mounted`], [`use_selective_effect`], [`use_update`]
//! - rendering: [`use_render_count`], [`use_re_render_trigger`]
//! - host facing: [`use_media_query`], [`use_dimensions`],
//!   [`use_media_dimensions`], [`use_event_listener`]
//!
//! Defaults for unset options come from [`HookSettings`], provided through
//! [`with_settings`].
//!
//! ```rust
//! use repose_core::*;
//! use repose_hooks::*;
//!
//! fn toggle() -> (bool, u64, BoolHandle) {
//!     let (open, handle) = use_boolean(false);
//!     let renders = use_render_count();
//!     (open, renders.get(), handle)
//! }
//!
//! let comp = Composition::new();
//! let (open, renders, handle) = comp.compose(toggle);
//! assert!(!open);
//! assert_eq!(renders, 0);
//!
//! handle.toggle();
//! let (open, renders, _) = comp.compose(toggle);
//! assert!(open);
//! assert_eq!(renders, 1);
//! ```

pub mod boolean;
pub mod delayed;
pub mod dimensions;
pub mod error;
pub mod event_listener;
pub mod lifecycle;
pub mod media_query;
pub mod persistent;
pub mod previous;
pub mod promise;
pub mod render;
pub mod selective;
pub mod settings;
pub mod snapshot;
pub mod update;

#[cfg(test)]
mod testing;

pub use boolean::{BoolHandle, use_boolean};
pub use delayed::{DelayFn, DelayedSetter, DelayedValueOptions, use_delayed_value};
pub use dimensions::{
    Dimensions, DimensionsTracker, Measurable, MediaCatalog, MediaKind, MediaProbe, use_dimensions,
    use_media_dimensions,
};
pub use error::{HookError, Result};
pub use event_listener::{EventBus, EventTarget, ListenerOptions, use_event_listener};
pub use lifecycle::{
    IsMounted, MountedSetter, use_did_mount, use_is_mounted, use_mounted_state, use_will_unmount,
};
pub use media_query::{
    MediaEnvironment, MediaMatcher, MediaQuery, MediaQueryOptions, Viewport, use_media_queries,
    use_media_query,
};
pub use persistent::{
    JsonFileStorage, MemoryStorage, PersistentSetter, PersistentStateOptions, Storage,
    use_persistent_state,
};
pub use previous::{Previous, use_previous};
pub use promise::{
    PromiseOptions, PromiseTracker, RaceResolution, Status, TriggerMode, UsePromise, use_promise,
};
pub use render::{ReRender, RenderCount, use_re_render_trigger, use_render_count};
pub use selective::{use_selective_effect, use_selective_effect_by};
pub use settings::{HookSettings, settings, with_settings};
pub use snapshot::{ExternalControls, SnapshotSetter, use_snapshot_state};
pub use update::{UpdateOptions, UpdateReset, use_update};
