//! Single-threaded task executor.
//!
//! Hooks that wait on something (tracked futures, debounced setters) spawn
//! onto the thread's local pool. Nothing runs until the host drives it: a
//! platform runner calls [`pump`] once per frame, tests call it after
//! advancing a `ManualClock`, and command-line tools can block in
//! [`run_until_idle`].

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;

use crate::{clock, timer};

struct Executor {
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
    active: Rc<Cell<usize>>,
}

thread_local! {
    static EXECUTOR: Executor = {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Executor {
            pool: RefCell::new(pool),
            spawner,
            active: Rc::new(Cell::new(0)),
        }
    };
}

struct ActiveGuard(Rc<Cell<usize>>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Queue a future on this thread's pool. It is first polled by the next
/// [`pump`].
pub fn spawn_local(fut: impl Future<Output = ()> + 'static) {
    EXECUTOR.with(|ex| {
        ex.active.set(ex.active.get() + 1);
        let guard = ActiveGuard(ex.active.clone());
        let task = async move {
            let _guard = guard;
            fut.await;
        };
        if let Err(e) = ex.spawner.spawn_local(task) {
            log::error!("spawn_local: executor rejected task: {e}");
        }
    });
}

/// Number of spawned tasks that have not completed yet.
pub fn active_tasks() -> usize {
    EXECUTOR.with(|ex| ex.active.get())
}

/// Poll every ready task until none can make progress.
pub fn run_until_stalled() {
    EXECUTOR.with(|ex| match ex.pool.try_borrow_mut() {
        Ok(mut pool) => pool.run_until_stalled(),
        Err(_) => log::warn!("run_until_stalled: called re-entrantly from inside a task; ignored"),
    });
}

/// Run tasks, fire due timers, repeat until nothing else is ready.
pub fn pump() {
    loop {
        run_until_stalled();
        if timer::fire_due_timers() == 0 {
            break;
        }
    }
}

/// Block the thread until every spawned task has finished, sleeping between
/// timer deadlines. Returns early if tasks remain but none of them waits on a
/// timer, since nothing on this thread could wake them.
pub fn run_until_idle() {
    loop {
        pump();
        if active_tasks() == 0 {
            return;
        }
        match timer::next_deadline() {
            Some(deadline) => {
                let now = clock::now();
                if deadline > now {
                    std::thread::sleep(deadline - now);
                    if clock::now() < deadline {
                        log::warn!("run_until_idle: installed clock does not follow wall time");
                        return;
                    }
                }
            }
            None => {
                log::warn!(
                    "run_until_idle: {} task(s) stalled with no pending timer",
                    active_tasks()
                );
                return;
            }
        }
    }
}
