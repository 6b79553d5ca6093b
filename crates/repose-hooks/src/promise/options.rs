use std::fmt;
use std::rc::Rc;

use super::deps::Deps;

/// Which of several overlapping runs may publish.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RaceResolution {
    /// While a run is in flight, new triggers are ignored.
    TakeFirst,
    /// Every trigger starts a run; only the most recently started one
    /// publishes.
    #[default]
    TakeLast,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Status {
    /// Nothing has been triggered yet.
    #[default]
    Idle,
    Running,
    Resolved,
    Rejected,
}

impl Status {
    pub fn is_settled(self) -> bool {
        matches!(self, Status::Resolved | Status::Rejected)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Idle => "idle",
            Status::Running => "running",
            Status::Resolved => "resolved",
            Status::Rejected => "rejected",
        })
    }
}

/// How a tracker is driven from composition.
#[derive(Clone, Debug, PartialEq)]
pub enum TriggerMode<A> {
    /// Only explicit `trigger` calls start runs.
    Manual,
    /// Inputs are checked after every pass and a run starts when they change.
    Auto(A),
    /// Auto-triggering is switched off for this pass.
    Skipped,
}

impl<A> From<Option<A>> for TriggerMode<A> {
    fn from(inputs: Option<A>) -> Self {
        match inputs {
            Some(a) => TriggerMode::Auto(a),
            None => TriggerMode::Skipped,
        }
    }
}

/// Options for [`use_promise`](super::use_promise) and
/// [`PromiseTracker`](super::PromiseTracker).
///
/// ```rust
/// use repose_hooks::promise::*;
///
/// let opts = PromiseOptions::<String, String, (u32,)>::new()
///     .take_first()
///     .on_success(|v: &String| log::info!("loaded {v}"))
///     .skip(|(id,): &(u32,)| *id == 0);
/// assert_eq!(opts.resolve_race, RaceResolution::TakeFirst);
/// ```
pub struct PromiseOptions<T, E, A> {
    pub resolve_race: RaceResolution,
    /// Auto-trigger even when inputs equal the previous ones.
    pub trigger_on_same_deps: bool,
    on_start: Option<Rc<dyn Fn()>>,
    on_success: Option<Rc<dyn Fn(&T)>>,
    on_error: Option<Rc<dyn Fn(&E)>>,
    on_any: Option<Rc<dyn Fn()>>,
    skip: Option<Rc<dyn Fn(&A) -> bool>>,
}

impl<T, E, A> Default for PromiseOptions<T, E, A> {
    fn default() -> Self {
        Self {
            resolve_race: RaceResolution::default(),
            trigger_on_same_deps: false,
            on_start: None,
            on_success: None,
            on_error: None,
            on_any: None,
            skip: None,
        }
    }
}

impl<T, E, A> Clone for PromiseOptions<T, E, A> {
    fn clone(&self) -> Self {
        Self {
            resolve_race: self.resolve_race,
            trigger_on_same_deps: self.trigger_on_same_deps,
            on_start: self.on_start.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            on_any: self.on_any.clone(),
            skip: self.skip.clone(),
        }
    }
}

impl<T, E, A> fmt::Debug for PromiseOptions<T, E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseOptions")
            .field("resolve_race", &self.resolve_race)
            .field("trigger_on_same_deps", &self.trigger_on_same_deps)
            .field("on_start", &self.on_start.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_any", &self.on_any.is_some())
            .field("skip", &self.skip.is_some())
            .finish()
    }
}

impl<T, E, A> PromiseOptions<T, E, A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve_race(mut self, race: RaceResolution) -> Self {
        self.resolve_race = race;
        self
    }

    pub fn take_first(self) -> Self {
        self.resolve_race(RaceResolution::TakeFirst)
    }

    pub fn take_last(self) -> Self {
        self.resolve_race(RaceResolution::TakeLast)
    }

    pub fn trigger_on_same_deps(mut self, yes: bool) -> Self {
        self.trigger_on_same_deps = yes;
        self
    }

    /// Called when a run is about to start, before the factory.
    pub fn on_start(mut self, f: impl Fn() + 'static) -> Self {
        self.on_start = Some(Rc::new(f));
        self
    }

    /// Called with the value of the winning run.
    pub fn on_success(mut self, f: impl Fn(&T) + 'static) -> Self {
        self.on_success = Some(Rc::new(f));
        self
    }

    /// Called with the error of the winning run.
    pub fn on_error(mut self, f: impl Fn(&E) + 'static) -> Self {
        self.on_error = Some(Rc::new(f));
        self
    }

    /// Called after the winning run published, whatever its outcome.
    pub fn on_any(mut self, f: impl Fn() + 'static) -> Self {
        self.on_any = Some(Rc::new(f));
        self
    }

    /// Replaces the default "any input missing" auto-trigger skip rule.
    pub fn skip(mut self, f: impl Fn(&A) -> bool + 'static) -> Self {
        self.skip = Some(Rc::new(f));
        self
    }

    pub(crate) fn should_skip(&self, inputs: &A) -> bool
    where
        A: Deps,
    {
        match &self.skip {
            Some(f) => f(inputs),
            None => inputs.has_missing(),
        }
    }

    pub(crate) fn notify_start(&self) {
        if let Some(f) = &self.on_start {
            f();
        }
    }

    pub(crate) fn notify_success(&self, value: &T) {
        if let Some(f) = &self.on_success {
            f(value);
        }
    }

    pub(crate) fn notify_error(&self, error: &E) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }

    pub(crate) fn notify_any(&self) {
        if let Some(f) = &self.on_any {
            f();
        }
    }
}
