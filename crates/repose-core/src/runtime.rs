use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::scope::{Liveness, Scope};

thread_local! {
    static CURRENT: RefCell<Vec<Rc<CompositionInner>>> = const { RefCell::new(Vec::new()) };
}

/// Slot table of one composition.
#[derive(Default)]
pub struct Composer {
    pub slots: Vec<Box<dyn Any>>,
    pub cursor: usize,
    pub keyed_slots: HashMap<String, Box<dyn Any>>,
}

struct CompositionInner {
    composer: RefCell<Composer>,
    scope: Scope,
    invalid: Cell<bool>,
    passes: Cell<u64>,
    after_compose: RefCell<Vec<Box<dyn FnOnce()>>>,
    on_invalidate: RefCell<Option<Rc<dyn Fn()>>>,
}

/// One component instance: its remembered slots, its scope, and whether it
/// needs to be composed again.
///
/// ```rust
/// use repose_core::*;
///
/// let comp = Composition::new();
/// let count = comp.compose(|| remember_mutable_state(|| 0));
/// count.set(1);
/// assert!(comp.is_invalidated());
///
/// let value = comp.compose(|| remember_mutable_state(|| 0).get());
/// assert_eq!(value, 1);
/// ```
pub struct Composition {
    inner: Rc<CompositionInner>,
}

impl Default for Composition {
    fn default() -> Self {
        Self::new()
    }
}

impl Composition {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(CompositionInner {
                composer: RefCell::new(Composer::default()),
                scope: Scope::new(),
                invalid: Cell::new(true),
                passes: Cell::new(0),
                after_compose: RefCell::new(Vec::new()),
                on_invalidate: RefCell::new(None),
            }),
        }
    }

    /// Run one composition pass: `body` sees this composition's slots in
    /// call order, then effects queued with [`after_compose`] run.
    pub fn compose<R>(&self, body: impl FnOnce() -> R) -> R {
        if !self.is_live() {
            log::warn!("compose: composition already disposed; effects will not run");
        }
        self.inner.invalid.set(false);
        self.inner.composer.borrow_mut().cursor = 0;

        let out = {
            let _guard = ComposeGuard::begin(self.inner.clone());
            self.inner.scope.run(body)
        };

        self.inner.passes.set(self.inner.passes.get() + 1);
        self.flush_after_compose();
        out
    }

    fn flush_after_compose(&self) {
        loop {
            let batch = std::mem::take(&mut *self.inner.after_compose.borrow_mut());
            if batch.is_empty() {
                break;
            }
            if !self.is_live() {
                continue;
            }
            self.inner.scope.run(|| {
                for f in batch {
                    f();
                }
            });
        }
    }

    /// True when some state read by the last pass has changed since.
    pub fn is_invalidated(&self) -> bool {
        self.inner.invalid.get()
    }

    /// Completed composition passes.
    pub fn passes(&self) -> u64 {
        self.inner.passes.get()
    }

    pub fn invalidator(&self) -> Invalidator {
        Invalidator(Rc::downgrade(&self.inner))
    }

    /// Called whenever the composition becomes invalid, e.g. to request a
    /// frame from the platform.
    pub fn set_on_invalidate(&self, f: impl Fn() + 'static) {
        *self.inner.on_invalidate.borrow_mut() = Some(Rc::new(f));
    }

    pub fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    pub fn liveness(&self) -> Liveness {
        self.inner.scope.liveness()
    }

    pub fn is_live(&self) -> bool {
        self.inner.scope.is_live()
    }

    /// Tear the component down: runs scope disposers, drops pending effects.
    pub fn dispose(&self) {
        self.inner.after_compose.borrow_mut().clear();
        self.inner.scope.dispose();
    }
}

impl Drop for Composition {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Marks the current composition on the thread while alive.
struct ComposeGuard;

impl ComposeGuard {
    fn begin(inner: Rc<CompositionInner>) -> Self {
        CURRENT.with(|c| c.borrow_mut().push(inner));
        ComposeGuard
    }
}

impl Drop for ComposeGuard {
    fn drop(&mut self) {
        CURRENT.with(|c| {
            c.borrow_mut().pop();
        });
    }
}

fn current() -> Option<Rc<CompositionInner>> {
    CURRENT.with(|c| c.borrow().last().cloned())
}

/// Weak handle that asks a composition to run again.
#[derive(Clone)]
pub struct Invalidator(Weak<CompositionInner>);

impl Invalidator {
    pub fn invalidate(&self) {
        let Some(inner) = self.0.upgrade() else {
            return;
        };
        if !inner.scope.is_live() {
            return;
        }
        inner.invalid.set(true);
        let cb = inner.on_invalidate.borrow().clone();
        if let Some(cb) = cb {
            cb();
        }
    }

    /// An invalidator attached to nothing.
    pub fn detached() -> Self {
        Invalidator(Weak::new())
    }
}

pub fn current_invalidator() -> Option<Invalidator> {
    current().map(|inner| Invalidator(Rc::downgrade(&inner)))
}

/// Queue `f` to run once the current composition pass has finished.
/// Outside of a composition `f` runs immediately.
pub fn after_compose(f: impl FnOnce() + 'static) {
    match current() {
        Some(inner) => inner.after_compose.borrow_mut().push(Box::new(f)),
        None => f(),
    }
}

/// Slot-based remember (sequential composition only)
pub fn remember<T: 'static>(init: impl FnOnce() -> T) -> Rc<T> {
    let Some(inner) = current() else {
        log::warn!("remember: called outside of a composition; value will not persist");
        return Rc::new(init());
    };

    let cursor = {
        let mut c = inner.composer.borrow_mut();
        let cursor = c.cursor;
        c.cursor += 1;
        if let Some(slot) = c.slots.get(cursor) {
            if let Some(rc) = slot.downcast_ref::<Rc<T>>() {
                return rc.clone();
            }
            log::warn!(
                "remember: slot {} type changed; replacing. \
                 If this is due to conditional composition, prefer remember_with_key.",
                cursor
            );
        }
        cursor
    };

    // init may itself call remember, so the composer is not borrowed here
    let rc: Rc<T> = Rc::new(init());
    let mut c = inner.composer.borrow_mut();
    if cursor < c.slots.len() {
        c.slots[cursor] = Box::new(rc.clone());
    } else {
        c.slots.push(Box::new(rc.clone()));
    }
    rc
}

/// Key-based remember
pub fn remember_with_key<T: 'static>(key: impl Into<String>, init: impl FnOnce() -> T) -> Rc<T> {
    let key = key.into();
    let Some(inner) = current() else {
        log::warn!("remember_with_key: '{key}' used outside of a composition");
        return Rc::new(init());
    };

    if let Some(existing) = inner.composer.borrow().keyed_slots.get(&key) {
        if let Some(rc) = existing.downcast_ref::<Rc<T>>() {
            return rc.clone();
        }
        log::warn!(
            "remember_with_key: key '{}' reused with a different type; replacing.",
            key
        );
    }

    let rc: Rc<T> = Rc::new(init());
    inner
        .composer
        .borrow_mut()
        .keyed_slots
        .insert(key, Box::new(rc.clone()));
    rc
}

pub fn remember_state<T: 'static>(init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
    remember(|| RefCell::new(init()))
}

pub fn remember_state_with_key<T: 'static>(
    key: impl Into<String>,
    init: impl FnOnce() -> T,
) -> Rc<RefCell<T>> {
    remember_with_key(key, || RefCell::new(init()))
}
