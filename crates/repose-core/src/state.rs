use crate::runtime::{Invalidator, current_invalidator, remember};
use crate::signal::{Signal, SubId};

/// A signal bound to the composition that created it: every write asks that
/// composition to run again.
pub struct MutableState<T: 'static> {
    inner: Signal<T>,
    invalidator: Invalidator,
}

impl<T> Clone for MutableState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            invalidator: self.invalidator.clone(),
        }
    }
}

impl<T: 'static> MutableState<T> {
    /// Bound to the current composition, or to nothing outside of one.
    pub fn new(value: T) -> Self {
        Self {
            inner: Signal::new(value),
            invalidator: current_invalidator().unwrap_or_else(Invalidator::detached),
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    pub fn set(&self, v: T) {
        self.inner.set(v);
        self.invalidator.invalidate();
    }

    /// Like `set`, but skips the write (and the recomposition) if unchanged.
    pub fn set_if_changed(&self, v: T)
    where
        T: PartialEq,
    {
        if self.inner.with(|cur| *cur != v) {
            self.set(v);
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.inner.update(f);
        self.invalidator.invalidate();
    }

    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> SubId {
        self.inner.subscribe(f)
    }

    pub fn unsubscribe(&self, id: SubId) -> bool {
        self.inner.unsubscribe(id)
    }

    pub fn signal(&self) -> &Signal<T> {
        &self.inner
    }
}

/// Remembered [`MutableState`]; `init` runs on the first pass only.
pub fn remember_mutable_state<T: 'static>(init: impl FnOnce() -> T) -> MutableState<T> {
    (*remember(|| MutableState::new(init()))).clone()
}
