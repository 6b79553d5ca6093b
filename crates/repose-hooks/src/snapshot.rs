use std::cell::RefCell;
use std::rc::Rc;

use repose_core::{Dispose, Latest, MutableState, disposable_effect, remember, remember_latest};

/// Value and setter supplied by a parent that wants to control the state.
/// Either may be left out.
pub struct ExternalControls<T> {
    pub value: Option<T>,
    pub set_value: Option<Rc<dyn Fn(&T)>>,
}

impl<T> Default for ExternalControls<T> {
    fn default() -> Self {
        Self {
            value: None,
            set_value: None,
        }
    }
}

impl<T> ExternalControls<T> {
    /// No external control: the state is purely internal.
    pub fn uncontrolled() -> Self {
        Self::default()
    }

    pub fn controlled(value: T, set_value: impl Fn(&T) + 'static) -> Self {
        Self {
            value: Some(value),
            set_value: Some(Rc::new(set_value)),
        }
    }
}

struct Snapshot<T: 'static> {
    snapshot: RefCell<T>,
    internal: MutableState<T>,
}

impl<T: Clone + PartialEq + 'static> Snapshot<T> {
    fn apply(&self, value: T) {
        *self.snapshot.borrow_mut() = value.clone();
        self.internal.set_if_changed(value);
    }
}

/// Setter returned by [`use_snapshot_state`].
pub struct SnapshotSetter<T: 'static> {
    inner: Rc<Snapshot<T>>,
    external: Latest<Option<Rc<dyn Fn(&T)>>>,
}

impl<T> Clone for SnapshotSetter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            external: self.external.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> SnapshotSetter<T> {
    pub fn set(&self, value: T) {
        self.update(move |_| value);
    }

    /// Computes the next value from the latest snapshot, so several updates
    /// between passes compose.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.inner.snapshot.borrow());
        self.inner.apply(next.clone());
        if let Some(Some(forward)) = self.external.get() {
            forward(&next);
        }
    }
}

/// State for components that can be either controlled or uncontrolled.
///
/// An external value for which `is_valid` holds wins and is mirrored into
/// the internal snapshot after the pass. Without one, the internal value is
/// used. Writes update the snapshot and are forwarded to the external setter.
pub fn use_snapshot_state<T: Clone + PartialEq + 'static>(
    initial: impl FnOnce() -> T,
    external: ExternalControls<T>,
    is_valid: impl Fn(&T) -> bool,
) -> (T, SnapshotSetter<T>) {
    let external_value = external.value.filter(|v| is_valid(v));

    let inner = remember(|| {
        let start = external_value.clone().unwrap_or_else(initial);
        Snapshot {
            snapshot: RefCell::new(start.clone()),
            internal: MutableState::new(start),
        }
    });
    let forward = remember_latest(external.set_value);

    {
        let inner = inner.clone();
        let mirrored = external_value.clone();
        disposable_effect(external_value.clone(), move || {
            if let Some(value) = mirrored {
                inner.apply(value);
            }
            Dispose::noop()
        });
    }

    let value = external_value.unwrap_or_else(|| inner.internal.get());
    (
        value,
        SnapshotSetter {
            inner,
            external: forward,
        },
    )
}
