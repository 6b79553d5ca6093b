use std::cell::Cell;
use std::rc::Rc;

use repose_core::{Dispose, disposable_effect, remember};

use crate::settings::{UpdateDefaults, settings};

/// Unset fields fall back to [`HookSettings::update`](crate::settings::HookSettings).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Dependency changes to let pass before the effect runs; the mount
    /// counts as the first one.
    pub nth_update: Option<u32>,
    /// Keep the cleanup the effect returns.
    pub with_cleanup: Option<bool>,
    /// Run on the nth change only, never after.
    pub once: Option<bool>,
}

impl UpdateOptions {
    fn resolve(self, defaults: UpdateDefaults) -> UpdateDefaults {
        UpdateDefaults {
            nth_update: self.nth_update.unwrap_or(defaults.nth_update),
            with_cleanup: self.with_cleanup.unwrap_or(defaults.with_cleanup),
            once: self.once.unwrap_or(defaults.once),
        }
    }
}

struct UpdateState {
    options: Cell<UpdateDefaults>,
    countdown: Cell<i64>,
}

impl UpdateState {
    /// Consumes one dependency change; true when the effect should run.
    fn tick(&self) -> bool {
        let left = self.countdown.get();
        self.countdown.set(left - 1);
        if self.options.get().once {
            left == 0
        } else {
            left <= 0
        }
    }
}

/// Re-arms a [`use_update`] counter.
#[derive(Clone)]
pub struct UpdateReset(Rc<UpdateState>);

impl UpdateReset {
    /// Start counting again. Fields set in `overrides` replace the hook's
    /// current options; the rest are kept.
    pub fn reset(&self, overrides: UpdateOptions) {
        let state = &self.0;
        let next = overrides.resolve(state.options.get());
        state.countdown.set(i64::from(next.nth_update));
        state.options.set(next);
    }
}

/// Effect that ignores the first `nth_update` changes of `deps`.
///
/// Options are read on the first pass only; use the returned
/// [`UpdateReset`] to change them later.
pub fn use_update<D: Clone + PartialEq + 'static>(
    effect: impl FnOnce() -> Dispose + 'static,
    deps: D,
    options: UpdateOptions,
) -> UpdateReset {
    let defaults = settings().update;
    let state = remember(|| {
        let resolved = options.resolve(defaults);
        UpdateState {
            options: Cell::new(resolved),
            countdown: Cell::new(i64::from(resolved.nth_update)),
        }
    });

    let counter = state.clone();
    disposable_effect(deps, move || {
        if !counter.tick() {
            return Dispose::noop();
        }
        let cleanup = effect();
        if counter.options.get().with_cleanup {
            cleanup
        } else {
            Dispose::noop()
        }
    });

    UpdateReset(state)
}
