//! # Clock
//!
//! Everything time-based in Repose (timers, debounced setters, throttled
//! listeners) reads the time through [`now`], which asks the clock installed
//! for the current thread. Platforms leave the default [`SystemClock`] in
//! place; tests install a [`ManualClock`] and move it forward explicitly:
//!
//! ```rust
//! use repose_core::clock::*;
//! use web_time::Duration;
//!
//! let clock = ManualClock::new();
//! set_clock(Box::new(clock.clone()));
//!
//! let t0 = now();
//! clock.advance(Duration::from_millis(250));
//! assert_eq!(now() - t0, Duration::from_millis(250));
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use web_time::{Duration, Instant};

pub trait Clock: 'static {
    fn now(&self) -> Instant;
}

pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

thread_local! {
    static CLOCK: RefCell<Option<Box<dyn Clock>>> = const { RefCell::new(None) };
}

/// Current time according to the clock installed on this thread.
pub fn now() -> Instant {
    CLOCK.with(|c| {
        c.borrow()
            .as_ref()
            .map(|c| c.now())
            .unwrap_or_else(Instant::now)
    })
}

/// Install a clock for the current thread, replacing any previous one.
pub fn set_clock(clock: Box<dyn Clock>) {
    CLOCK.with(|c| *c.borrow_mut() = Some(clock));
}

/// Go back to the system clock.
pub fn reset_clock() {
    CLOCK.with(|c| *c.borrow_mut() = None);
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone)]
pub struct ManualClock {
    t: Rc<Cell<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(t: Instant) -> Self {
        Self {
            t: Rc::new(Cell::new(t)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.t.set(self.t.get() + by);
    }

    pub fn set(&self, t: Instant) {
        self.t.set(t);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.t.get()
    }
}
