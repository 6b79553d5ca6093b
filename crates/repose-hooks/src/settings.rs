//! # Settings
//!
//! Library-wide defaults for every hook option that is left unset. Provide a
//! different [`HookSettings`] around a composition to change them for
//! everything composed inside:
//!
//! ```rust
//! use repose_core::Composition;
//! use repose_hooks::settings::*;
//! use web_time::Duration;
//!
//! let fast = HookSettings {
//!     delay: Duration::from_millis(50),
//!     ..HookSettings::default()
//! };
//!
//! let comp = Composition::new();
//! comp.compose(|| {
//!     with_settings(fast, || {
//!         assert_eq!(settings().delay, Duration::from_millis(50));
//!     })
//! });
//! ```

use web_time::Duration;

use crate::delayed::DelayFn;

#[derive(Clone, Debug, PartialEq)]
pub struct HookSettings {
    /// Shared default for debounce/throttle delays.
    pub delay: Duration,
    pub delayed_value: DelayedValueDefaults,
    pub media_query: MediaQueryDefaults,
    pub persistent_state: PersistentStateDefaults,
    pub update: UpdateDefaults,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelayedValueDefaults {
    pub delay_fn: DelayFn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MediaQueryDefaults {
    pub track: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PersistentStateDefaults {
    /// Remove entries that fail to parse instead of leaving them in storage.
    pub clear_on_parsing_error: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateDefaults {
    pub nth_update: u32,
    pub with_cleanup: bool,
    pub once: bool,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(300),
            delayed_value: DelayedValueDefaults {
                delay_fn: DelayFn::Debounce,
            },
            media_query: MediaQueryDefaults { track: true },
            persistent_state: PersistentStateDefaults {
                clear_on_parsing_error: true,
            },
            update: UpdateDefaults {
                nth_update: 1,
                with_cleanup: true,
                once: false,
            },
        }
    }
}

pub fn with_settings<R>(settings: HookSettings, f: impl FnOnce() -> R) -> R {
    repose_core::provide(settings, f)
}

/// Settings in effect for the code currently being composed.
pub fn settings() -> HookSettings {
    repose_core::local_or_default::<HookSettings>()
}
