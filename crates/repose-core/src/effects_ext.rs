use std::cell::RefCell;
use std::rc::Rc;

use crate::{Dispose, after_compose, on_unmount, remember, scoped_effect};

struct KeyedEffect<K> {
    last_key: RefCell<Option<K>>,
    cleanup: RefCell<Option<Dispose>>,
}

impl<K> KeyedEffect<K> {
    fn run_cleanup(&self) {
        let d = self.cleanup.borrow_mut().take();
        if let Some(d) = d {
            d.run();
        }
    }
}

/// Effect that runs after the pass whenever `key` changes, cleaning up the
/// previous run first. The last cleanup runs on unmount.
pub fn disposable_effect<K: PartialEq + Clone + 'static>(
    key: K,
    effect: impl FnOnce() -> Dispose + 'static,
) {
    disposable_effect_with(key, |prev, next| prev == next, effect)
}

/// [`disposable_effect`] with a custom "same key" comparison.
pub fn disposable_effect_with<K: Clone + 'static>(
    key: K,
    same: impl Fn(&K, &K) -> bool,
    effect: impl FnOnce() -> Dispose + 'static,
) {
    // Slot-based (like Compose). For branch-stability use `remember_with_key` variants.
    let mut first = false;
    let slot = remember(|| {
        first = true;
        KeyedEffect::<K> {
            last_key: RefCell::new(None),
            cleanup: RefCell::new(None),
        }
    });

    // Install a single unmount disposer for this callsite.
    if first {
        let slot = slot.clone();
        scoped_effect(move || on_unmount(move || slot.run_cleanup()));
    }

    let changed = match slot.last_key.borrow().as_ref() {
        Some(prev) => !same(prev, &key),
        None => true,
    };
    if changed {
        *slot.last_key.borrow_mut() = Some(key);
        after_compose(move || {
            slot.run_cleanup();
            let d = effect();
            *slot.cleanup.borrow_mut() = Some(d);
        });
    }
}

/// Runs after every composition pass.
pub fn side_effect(effect: impl FnOnce() + 'static) {
    after_compose(effect);
}

/// Runs once, after the first pass. The cleanup runs on unmount.
pub fn mount_effect(effect: impl FnOnce() -> Dispose + 'static) {
    disposable_effect((), effect)
}

/// Latest value of something captured by long-lived closures.
///
/// Handlers registered once (listeners, tasks) read through this so they see
/// what the most recent pass supplied, without being re-registered.
pub struct Latest<T>(Rc<RefCell<Option<T>>>);

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Latest<T> {
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.0.borrow().as_ref().map(f)
    }

    pub fn get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.0.borrow().clone()
    }
}

pub fn remember_latest<T: 'static>(value: T) -> Latest<T> {
    let mut value = Some(value);
    let cell = remember(|| RefCell::new(value.take()));
    if let Some(v) = value {
        *cell.borrow_mut() = Some(v);
    }
    Latest(cell)
}
