use repose_core::{Dispose, disposable_effect_with};

/// Effect that re-runs only when `deps` differ from the deps of its last run.
pub fn use_selective_effect<D: Clone + PartialEq + 'static>(
    effect: impl FnOnce() -> Dispose + 'static,
    deps: D,
) {
    use_selective_effect_by(effect, deps, |prev, curr| prev == curr);
}

/// [`use_selective_effect`] with a custom comparison: `same(prev, curr)`
/// returning true keeps the last run. The previous cleanup runs right before
/// the effect runs again, and on disposal.
pub fn use_selective_effect_by<D: Clone + 'static>(
    effect: impl FnOnce() -> Dispose + 'static,
    deps: D,
    same: impl Fn(&D, &D) -> bool,
) {
    disposable_effect_with(deps, same, effect);
}
