use std::cell::Cell;
use std::rc::Rc;

use repose_core::{Dispose, MutableState, mount_effect, on_unmount, remember, remember_mutable_state};

/// Runs `callback` once, after the first composition pass.
pub fn use_did_mount(callback: impl FnOnce() + 'static) {
    mount_effect(move || {
        callback();
        Dispose::noop()
    });
}

/// Runs `callback` once, when the composition is disposed. Only the callback
/// of the first pass is kept.
pub fn use_will_unmount(callback: impl FnOnce() + 'static) {
    mount_effect(move || on_unmount(callback));
}

/// Whether the calling component is mounted: false while its first pass is
/// being composed, true once the pass's effects ran, false again after
/// disposal.
#[derive(Clone, Debug)]
pub struct IsMounted(Rc<Cell<bool>>);

impl IsMounted {
    pub fn get(&self) -> bool {
        self.0.get()
    }
}

pub fn use_is_mounted() -> IsMounted {
    let flag = remember(|| Cell::new(false));
    {
        let flag = flag.clone();
        mount_effect(move || {
            flag.set(true);
            on_unmount(move || flag.set(false))
        });
    }
    IsMounted(flag)
}

/// Setter that silently drops writes while its component is not mounted.
pub struct MountedSetter<T: 'static> {
    state: MutableState<T>,
    mounted: IsMounted,
}

impl<T> Clone for MountedSetter<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            mounted: self.mounted.clone(),
        }
    }
}

impl<T: 'static> MountedSetter<T> {
    pub fn set(&self, value: T) {
        if self.mounted.get() {
            self.state.set(value);
        } else {
            log::trace!("mounted state: write while unmounted dropped");
        }
    }

    /// Like `set`, but skips the write (and the recomposition) if unchanged.
    pub fn set_if_changed(&self, value: T)
    where
        T: PartialEq,
    {
        if self.mounted.get() {
            self.state.set_if_changed(value);
        }
    }

    /// Compute the next value from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        if self.mounted.get() {
            let next = self.state.with(f);
            self.state.set(next);
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }
}

pub fn use_mounted_state<T: Clone + 'static>(init: impl FnOnce() -> T) -> (T, MountedSetter<T>) {
    let state = remember_mutable_state(init);
    let mounted = use_is_mounted();
    (state.get(), MountedSetter { state, mounted })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use repose_core::Composition;

    use super::*;

    #[test]
    fn mount_and_unmount_run_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let comp = Composition::new();
        let body = || {
            let l = log.clone();
            use_did_mount(move || l.borrow_mut().push("mount"));
            let l = log.clone();
            use_will_unmount(move || l.borrow_mut().push("unmount"));
        };

        comp.compose(body);
        comp.compose(body);
        comp.compose(body);
        assert_eq!(*log.borrow(), vec!["mount"]);

        comp.dispose();
        comp.dispose();
        assert_eq!(*log.borrow(), vec!["mount", "unmount"]);
    }

    #[test]
    fn is_mounted_follows_lifecycle() {
        let comp = Composition::new();
        let during_first = Rc::new(Cell::new(true));
        let seen = during_first.clone();
        let mounted = comp.compose(move || {
            let m = use_is_mounted();
            seen.set(m.get());
            m
        });
        assert!(!during_first.get());
        assert!(mounted.get());

        comp.dispose();
        assert!(!mounted.get());
    }

    #[test]
    fn mounted_setter_drops_writes_after_disposal() {
        let comp = Composition::new();
        let (value, set) = comp.compose(|| use_mounted_state(|| 1));
        assert_eq!(value, 1);

        set.update(|v| v + 1);
        assert!(comp.is_invalidated());
        assert_eq!(comp.compose(|| use_mounted_state(|| 1)).0, 2);

        comp.dispose();
        set.set(10);
        assert!(!set.is_mounted());
    }
}
