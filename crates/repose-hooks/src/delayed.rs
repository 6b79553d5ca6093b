use std::cell::{Cell, RefCell};
use std::rc::Rc;

use repose_core::clock;
use repose_core::timer::{sleep, sleep_until};
use repose_core::{remember, spawn_local};
use web_time::{Duration, Instant};

use crate::lifecycle::{MountedSetter, use_mounted_state};
use crate::settings::settings;

/// How a [`DelayedSetter`] spaces out writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DelayFn {
    /// Write once calls have stopped for the whole delay; the last value wins.
    #[default]
    Debounce,
    /// Write the first value at once, then at most one value (the latest)
    /// at the end of each delay window.
    Throttle,
}

/// Unset fields fall back to [`HookSettings`](crate::settings::HookSettings).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DelayedValueOptions {
    pub delay: Option<Duration>,
    pub delay_fn: Option<DelayFn>,
}

struct Delayed<T: 'static> {
    sink: Rc<dyn Fn(T)>,
    delay: Cell<Duration>,
    delay_fn: Cell<DelayFn>,
    /// Bumped to orphan scheduled timers.
    generation: Cell<u64>,
    pending: RefCell<Option<T>>,
    window_end: Cell<Option<Instant>>,
}

impl<T: 'static> Delayed<T> {
    fn bump(&self) -> u64 {
        let g = self.generation.get() + 1;
        self.generation.set(g);
        g
    }

    fn apply_pending(&self) {
        let next = self.pending.borrow_mut().take();
        if let Some(value) = next {
            (self.sink)(value);
        }
    }

    fn open_window(self: &Rc<Self>, from: Instant) {
        let end = from + self.delay.get();
        self.window_end.set(Some(end));
        let generation = self.generation.get();
        let timer = sleep_until(end);
        let weak = Rc::downgrade(self);
        spawn_local(async move {
            timer.await;
            let Some(this) = weak.upgrade() else {
                return;
            };
            if this.generation.get() != generation {
                return;
            }
            this.window_end.set(None);
            let trailing = this.pending.borrow_mut().take();
            if let Some(value) = trailing {
                (this.sink)(value);
                this.open_window(clock::now());
            }
        });
    }
}

/// Debounced or throttled setter returned by [`use_delayed_value`].
///
/// Writes from [`use_delayed_value`] go through a [`MountedSetter`], so
/// anything still scheduled when the component is disposed is dropped.
pub struct DelayedSetter<T: 'static> {
    inner: Rc<Delayed<T>>,
}

impl<T> Clone for DelayedSetter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> DelayedSetter<T> {
    pub(crate) fn new(sink: impl Fn(T) + 'static, delay: Duration, delay_fn: DelayFn) -> Self {
        Self {
            inner: Rc::new(Delayed {
                sink: Rc::new(sink),
                delay: Cell::new(delay),
                delay_fn: Cell::new(delay_fn),
                generation: Cell::new(0),
                pending: RefCell::new(None),
                window_end: Cell::new(None),
            }),
        }
    }

    fn configure(&self, delay: Duration, delay_fn: DelayFn) {
        if self.inner.delay.get() == delay && self.inner.delay_fn.get() == delay_fn {
            return;
        }
        log::debug!("delayed value: reconfigured to {delay_fn:?} every {delay:?}");
        self.cancel();
        self.inner.delay.set(delay);
        self.inner.delay_fn.set(delay_fn);
    }

    pub fn call(&self, value: T) {
        match self.inner.delay_fn.get() {
            DelayFn::Debounce => self.debounce(value),
            DelayFn::Throttle => self.throttle(value),
        }
    }

    fn debounce(&self, value: T) {
        *self.inner.pending.borrow_mut() = Some(value);
        let generation = self.inner.bump();
        let timer = sleep(self.inner.delay.get());
        let weak = Rc::downgrade(&self.inner);
        spawn_local(async move {
            timer.await;
            if let Some(this) = weak.upgrade()
                && this.generation.get() == generation
            {
                this.apply_pending();
            }
        });
    }

    fn throttle(&self, value: T) {
        let now = clock::now();
        match self.inner.window_end.get() {
            Some(end) if now < end => {
                *self.inner.pending.borrow_mut() = Some(value);
            }
            _ => {
                (self.inner.sink)(value);
                self.inner.open_window(now);
            }
        }
    }

    /// Drop the scheduled value, if any.
    pub fn cancel(&self) {
        self.inner.bump();
        self.inner.pending.borrow_mut().take();
        self.inner.window_end.set(None);
    }

    /// Apply the scheduled value now instead of at the end of the delay.
    pub fn flush(&self) {
        self.inner.bump();
        self.inner.window_end.set(None);
        self.inner.apply_pending();
    }

    pub fn is_pending(&self) -> bool {
        self.inner.pending.borrow().is_some()
    }
}

/// State with a delayed setter: returns the current value, the debounced
/// (or throttled) setter and the immediate one.
pub fn use_delayed_value<T: Clone + 'static>(
    initial: impl FnOnce() -> T,
    options: DelayedValueOptions,
) -> (T, DelayedSetter<T>, MountedSetter<T>) {
    let defaults = settings();
    let delay = options.delay.unwrap_or(defaults.delay);
    let delay_fn = options.delay_fn.unwrap_or(defaults.delayed_value.delay_fn);

    let (value, set_now) = use_mounted_state(initial);
    let delayed = (*remember(|| {
        let target = set_now.clone();
        DelayedSetter::new(move |value| target.set(value), delay, delay_fn)
    }))
    .clone();
    delayed.configure(delay, delay_fn);
    (value, delayed, set_now)
}
