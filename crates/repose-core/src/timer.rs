use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use slotmap::{SlotMap, new_key_type};
use web_time::{Duration, Instant};

use crate::clock;

new_key_type! {
    pub struct TimerKey;
}

struct Pending {
    deadline: Instant,
    waker: Waker,
}

thread_local! {
    static TIMERS: RefCell<SlotMap<TimerKey, Pending>> = RefCell::new(SlotMap::with_key());
}

/// Future that completes once the installed clock reaches the deadline.
///
/// Sleepers are woken by [`fire_due_timers`], which the executor's `pump`
/// calls after every stall.
pub struct Sleep {
    deadline: Instant,
    key: Option<TimerKey>,
}

pub fn sleep(duration: Duration) -> Sleep {
    sleep_until(clock::now() + duration)
}

pub fn sleep_until(deadline: Instant) -> Sleep {
    Sleep {
        deadline,
        key: None,
    }
}

impl Sleep {
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    fn unregister(&mut self) {
        if let Some(key) = self.key.take() {
            // gone already when the thread's executor outlives the registry
            let _ = TIMERS.try_with(|t| {
                t.borrow_mut().remove(key);
            });
        }
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if clock::now() >= self.deadline {
            self.unregister();
            return Poll::Ready(());
        }

        let deadline = self.deadline;
        let key = self.key;
        let key = TIMERS.with(|t| {
            let mut t = t.borrow_mut();
            match key.and_then(|k| t.get_mut(k).map(|p| (k, p))) {
                Some((k, pending)) => {
                    pending.waker.clone_from(cx.waker());
                    k
                }
                // not registered yet, or already fired and removed
                None => t.insert(Pending {
                    deadline,
                    waker: cx.waker().clone(),
                }),
            }
        });
        self.key = Some(key);
        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        self.unregister();
    }
}

/// Wake every sleeper whose deadline has passed. Returns how many were woken.
pub fn fire_due_timers() -> usize {
    let now = clock::now();
    let due: Vec<Waker> = TIMERS.with(|t| {
        let mut t = t.borrow_mut();
        let keys: Vec<TimerKey> = t
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(k, _)| k)
            .collect();
        keys.into_iter()
            .filter_map(|k| t.remove(k))
            .map(|p| p.waker)
            .collect()
    });
    let n = due.len();
    for w in due {
        w.wake();
    }
    n
}

/// Earliest deadline among registered sleepers.
pub fn next_deadline() -> Option<Instant> {
    TIMERS.with(|t| t.borrow().values().map(|p| p.deadline).min())
}

pub fn pending_timers() -> usize {
    TIMERS.with(|t| t.borrow().len())
}
