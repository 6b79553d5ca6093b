//! # Tracked async tasks
//!
//! [`use_promise`] runs an async task on behalf of a component and exposes
//! its latest outcome as plain composition values: `data`, `error` and
//! `status`. Overlapping runs are resolved by a [`RaceResolution`] policy so
//! a stale response can never overwrite a newer one, and nothing is published
//! once the owning composition has been disposed.
//!
//! ```rust
//! use repose_core::*;
//! use repose_hooks::promise::*;
//!
//! fn user_name(id: Option<u32>) -> UsePromise<String, String, (Option<u32>,)> {
//!     use_promise(
//!         |(id,): (Option<u32>,)| async move { Ok(format!("user {}", id.unwrap_or_default())) },
//!         TriggerMode::Auto((id,)),
//!         PromiseOptions::new(),
//!     )
//! }
//!
//! let comp = Composition::new();
//! assert_eq!(comp.compose(|| user_name(None)).status, Status::Idle);
//!
//! comp.compose(|| user_name(Some(7)));
//! pump();
//! let p = comp.compose(|| user_name(Some(7)));
//! assert_eq!(p.data.as_deref(), Some("user 7"));
//! assert_eq!(p.status, Status::Resolved);
//! ```
//!
//! Tasks are spawned on the thread's executor, so something has to drive it
//! (`pump` per frame, or `run_until_idle` in tools and tests).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use repose_core::{
    Invalidator, Liveness, current_invalidator, current_liveness, remember, side_effect,
    spawn_local,
};

pub mod deps;
pub mod options;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use deps::Deps;
pub use options::{PromiseOptions, RaceResolution, Status, TriggerMode};
pub use tracker::{Published, RunId, TrackerState};

type Factory<T, E, A> = Rc<dyn Fn(A) -> LocalBoxFuture<'static, Result<T, E>>>;

fn boxed_factory<T, E, A, F, Fut>(factory: F) -> Factory<T, E, A>
where
    F: Fn(A) -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    Rc::new(move |args| factory(args).boxed_local())
}

struct Inner<T, E, A> {
    state: RefCell<TrackerState<T, E, A>>,
    factory: RefCell<Factory<T, E, A>>,
    options: RefCell<PromiseOptions<T, E, A>>,
    live: Liveness,
    invalidator: Invalidator,
    // the pending pass was asked for by a state change of this tracker
    self_invalidated: Cell<bool>,
}

/// Owner of one async task's runs and its published outcome.
///
/// Clones share the same state. Every state change invalidates the
/// composition the tracker was created in; callbacks always run after the
/// state has been updated and never while it is borrowed, so they may call
/// back into the tracker.
pub struct PromiseTracker<T, E, A> {
    inner: Rc<Inner<T, E, A>>,
}

impl<T, E, A> Clone for PromiseTracker<T, E, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E, A> fmt::Debug for PromiseTracker<T, E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("PromiseTracker")
            .field("status", &state.status())
            .field("current_run", &state.current_run())
            .field("latest_run", &state.latest_run())
            .field("live", &self.inner.live.is_live())
            .finish()
    }
}

impl<T, E, A> PromiseTracker<T, E, A>
where
    T: Clone + 'static,
    E: Clone + 'static,
    A: Clone + 'static,
{
    /// Runs publish only while `live` is up. Inside a composition the tracker
    /// also invalidates it on every state change.
    pub fn new<F, Fut>(factory: F, options: PromiseOptions<T, E, A>, live: Liveness) -> Self
    where
        F: Fn(A) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
    {
        Self::from_boxed(boxed_factory(factory), options, live)
    }

    fn from_boxed(
        factory: Factory<T, E, A>,
        options: PromiseOptions<T, E, A>,
        live: Liveness,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(TrackerState::new()),
                factory: RefCell::new(factory),
                options: RefCell::new(options),
                live,
                invalidator: current_invalidator().unwrap_or_else(Invalidator::detached),
                self_invalidated: Cell::new(false),
            }),
        }
    }

    /// Runs started from now on use `factory`.
    pub fn replace_factory<F, Fut>(&self, factory: F)
    where
        F: Fn(A) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
    {
        *self.inner.factory.borrow_mut() = boxed_factory(factory);
    }

    /// Callbacks and skip rule apply immediately, also to runs in flight.
    /// The race policy of a run is fixed when it starts.
    pub fn set_options(&self, options: PromiseOptions<T, E, A>) {
        *self.inner.options.borrow_mut() = options;
    }

    pub fn status(&self) -> Status {
        self.inner.state.borrow().status()
    }

    pub fn data(&self) -> Option<T> {
        self.inner.state.borrow().data().cloned()
    }

    pub fn error(&self) -> Option<E> {
        self.inner.state.borrow().error().cloned()
    }

    pub fn is_processing(&self) -> bool {
        self.inner.state.borrow().is_processing()
    }

    pub fn is_live(&self) -> bool {
        self.inner.live.is_live()
    }

    /// Drop the published error. The status stays as it is.
    pub fn clear_error(&self) {
        self.inner.state.borrow_mut().clear_error();
        self.invalidate();
    }

    /// Drop the published value. The status stays as it is.
    pub fn clear_data(&self) {
        self.inner.state.borrow_mut().clear_data();
        self.invalidate();
    }

    /// Start a run with `args` on the thread's executor.
    pub fn trigger(&self, args: A) {
        spawn_local(self.run(args));
    }

    /// Start a run with `args` and return the future that settles it.
    ///
    /// The run starts (or is refused by the race policy) right here, before
    /// the returned future is first polled. Awaiting the future only waits
    /// for the outcome to be published or discarded.
    pub fn run(&self, args: A) -> impl Future<Output = ()> + 'static {
        let started = self.start(args);
        let this = self.clone();
        async move {
            if let Some((run, race, task)) = started {
                let outcome = task.await;
                this.settle(run, race, outcome);
            }
        }
    }

    fn start(
        &self,
        args: A,
    ) -> Option<(RunId, RaceResolution, LocalBoxFuture<'static, Result<T, E>>)> {
        if !self.inner.live.is_live() {
            log::debug!("promise: owner torn down; trigger ignored");
            return None;
        }
        let options = self.inner.options.borrow().clone();
        let race = options.resolve_race;
        if !self.inner.state.borrow().admits(race) {
            log::trace!("promise: run in flight; trigger ignored ({race:?})");
            return None;
        }

        options.notify_start();

        // on_start may have started a run of its own
        let run = self.inner.state.borrow_mut().begin(race)?;
        log::debug!("promise: {run} started");
        self.invalidate();

        let factory = self.inner.factory.borrow().clone();
        Some((run, race, factory(args)))
    }

    fn invalidate(&self) {
        self.inner.self_invalidated.set(true);
        self.inner.invalidator.invalidate();
    }

    fn settle(&self, run: RunId, race: RaceResolution, outcome: Result<T, E>) {
        if !self.inner.live.is_live() {
            log::debug!("promise: {run} settled after teardown; discarded");
            return;
        }
        let published = self.inner.state.borrow_mut().settle(run, race, outcome);
        let Some(published) = published else {
            log::trace!("promise: {run} superseded; discarded");
            return;
        };
        log::debug!("promise: {run} published");
        self.invalidate();

        let options = self.inner.options.borrow().clone();
        match &published {
            Published::Value(value) => options.notify_success(value),
            Published::Error(error) => options.notify_error(error),
        }
        options.notify_any();
    }
}

impl<T, E, A> PromiseTracker<T, E, A>
where
    T: Clone + 'static,
    E: Clone + 'static,
    A: Deps,
{
    /// Apply the auto-trigger rule for this pass's `mode`.
    ///
    /// With `trigger_on_same_deps`, unchanged inputs start a run only on
    /// passes this tracker did not request itself, so a run's own start and
    /// settlement never feed back into another run.
    pub fn evaluate(&self, mode: &TriggerMode<A>) {
        let own_pass = self.inner.self_invalidated.replace(false);
        let TriggerMode::Auto(inputs) = mode else {
            return;
        };
        let options = self.inner.options.borrow().clone();
        let skip = options.should_skip(inputs);
        let go = self.inner.state.borrow_mut().should_auto_trigger(
            inputs,
            skip,
            options.trigger_on_same_deps && !own_pass,
        );
        if go {
            self.trigger(inputs.clone());
        } else if skip {
            log::trace!("promise: auto-trigger skipped");
        }
    }
}

/// What [`use_promise`] hands back for one pass.
#[derive(Debug)]
pub struct UsePromise<T, E, A> {
    pub data: Option<T>,
    pub error: Option<E>,
    pub status: Status,
    pub tracker: PromiseTracker<T, E, A>,
}

impl<T, E, A> UsePromise<T, E, A>
where
    T: Clone + 'static,
    E: Clone + 'static,
    A: Clone + 'static,
{
    pub fn is_processing(&self) -> bool {
        self.status == Status::Running
    }

    pub fn trigger(&self, args: A) {
        self.tracker.trigger(args);
    }

    pub fn clear_error(&self) {
        self.tracker.clear_error();
    }

    pub fn clear_data(&self) {
        self.tracker.clear_data();
    }
}

/// Track an async task from a component.
///
/// `factory` and `options` are taken from every pass, so callbacks can close
/// over fresh values. In [`TriggerMode::Auto`] the inputs are checked after
/// the pass and a run starts when they differ from the last ones that
/// started a run. With `trigger_on_same_deps` every pass starts one, except
/// passes caused by the tracker's own state changes.
pub fn use_promise<T, E, A, F, Fut>(
    factory: F,
    mode: TriggerMode<A>,
    options: PromiseOptions<T, E, A>,
) -> UsePromise<T, E, A>
where
    T: Clone + 'static,
    E: Clone + 'static,
    A: Deps,
    F: Fn(A) -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    let factory = boxed_factory(factory);
    let tracker = (*remember(|| {
        PromiseTracker::from_boxed(factory.clone(), options.clone(), current_liveness())
    }))
    .clone();
    *tracker.inner.factory.borrow_mut() = factory;
    tracker.set_options(options);

    {
        let tracker = tracker.clone();
        side_effect(move || tracker.evaluate(&mode));
    }

    let state = tracker.inner.state.borrow();
    let out = UsePromise {
        data: state.data().cloned(),
        error: state.error().cloned(),
        status: state.status(),
        tracker: tracker.clone(),
    };
    drop(state);
    out
}
