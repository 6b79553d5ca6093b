use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::Dispose;

thread_local! {
    static CURRENT_SCOPE: RefCell<Option<Weak<ScopeInner>>> = const { RefCell::new(None) };
}

/// Whether the owner of a scope is still active.
///
/// Cheap to clone and safe to hold from async tasks: it outlives the scope and
/// simply reports `false` once the scope is disposed or dropped.
#[derive(Clone, Debug)]
pub struct Liveness(Rc<Cell<bool>>);

impl Liveness {
    /// A flag that never goes down, for owners without a scope.
    pub fn always() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn is_live(&self) -> bool {
        self.0.get()
    }
}

pub struct Scope {
    inner: Rc<ScopeInner>,
}

struct ScopeInner {
    live: Liveness,
    disposers: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                live: Liveness::always(),
                disposers: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        // restore the outer scope even if `f` unwinds
        struct Restore(Option<Weak<ScopeInner>>);
        impl Drop for Restore {
            fn drop(&mut self) {
                let prev = self.0.take();
                CURRENT_SCOPE.with(|current| *current.borrow_mut() = prev);
            }
        }

        let prev = CURRENT_SCOPE.with(|current| {
            current
                .borrow_mut()
                .replace(Rc::downgrade(&self.inner))
        });
        let _restore = Restore(prev);
        f()
    }

    pub fn add_disposer(&self, disposer: impl FnOnce() + 'static) {
        if !self.is_live() {
            log::debug!("add_disposer on a disposed scope; running it now");
            disposer();
            return;
        }
        self.inner.disposers.borrow_mut().push(Box::new(disposer));
    }

    pub fn liveness(&self) -> Liveness {
        self.inner.live.clone()
    }

    pub fn is_live(&self) -> bool {
        self.inner.live.is_live()
    }

    /// Mark the scope dead, then run its disposers in reverse registration
    /// order. Idempotent.
    pub fn dispose(&self) {
        if !self.is_live() {
            return;
        }
        self.inner.live.0.set(false);
        self.inner.run_disposers();
    }
}

impl ScopeInner {
    fn run_disposers(&self) {
        // disposers may register more disposers; drain until empty
        loop {
            let batch = std::mem::take(&mut *self.disposers.borrow_mut());
            if batch.is_empty() {
                break;
            }
            for disposer in batch.into_iter().rev() {
                disposer();
            }
        }
    }
}

impl Clone for Scope {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub fn current_scope() -> Option<Scope> {
    CURRENT_SCOPE.with(|current| {
        current
            .borrow()
            .as_ref()
            .and_then(|weak| weak.upgrade().map(|inner| Scope { inner }))
    })
}

/// Liveness of the current scope, or an always-live flag outside of one.
pub fn current_liveness() -> Liveness {
    current_scope()
        .map(|s| s.liveness())
        .unwrap_or_else(Liveness::always)
}

/// Run `f` now and tie the returned cleanup to the current scope.
pub fn scoped_effect<F>(f: F)
where
    F: FnOnce() -> Dispose + 'static,
{
    let cleanup = f();
    if let Some(scope) = current_scope() {
        scope.add_disposer(move || cleanup.run());
    } else {
        log::debug!("scoped_effect outside of a scope; cleanup will never run");
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if self.live.is_live() {
            self.live.0.set(false);
            self.run_disposers();
        }
    }
}
