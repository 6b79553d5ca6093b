use std::fmt;

use super::deps::Deps;
use super::options::{RaceResolution, Status};

/// Identity of one run. Ids only grow, so a newer run always compares greater.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run#{}", self.0)
    }
}

/// Outcome of a run that won its race.
#[derive(Clone, Debug, PartialEq)]
pub enum Published<T, E> {
    Value(T),
    Error(E),
}

/// Bookkeeping of a tracker, independent of any executor.
///
/// Every transition is a single `&mut self` call, so publishing a result
/// and moving the status happen together or not at all.
#[derive(Debug)]
pub struct TrackerState<T, E, A> {
    status: Status,
    data: Option<T>,
    error: Option<E>,
    /// Run that blocks `TakeFirst` triggers; cleared when the winner settles.
    current_run: Option<RunId>,
    /// Most recently started run; the only `TakeLast` candidate.
    latest_run: Option<RunId>,
    next_run: u64,
    previous_inputs: Option<A>,
}

impl<T, E, A> Default for TrackerState<T, E, A> {
    fn default() -> Self {
        Self {
            status: Status::Idle,
            data: None,
            error: None,
            current_run: None,
            latest_run: None,
            next_run: 0,
            previous_inputs: None,
        }
    }
}

impl<T, E, A> TrackerState<T, E, A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&E> {
        self.error.as_ref()
    }

    pub fn is_processing(&self) -> bool {
        self.status == Status::Running
    }

    pub fn current_run(&self) -> Option<RunId> {
        self.current_run
    }

    pub fn latest_run(&self) -> Option<RunId> {
        self.latest_run
    }

    /// Whether a trigger under `race` would start a run right now.
    pub fn admits(&self, race: RaceResolution) -> bool {
        !(race == RaceResolution::TakeFirst && self.current_run.is_some())
    }

    /// Start a run: new id, status `Running`, previous results cleared. The
    /// run becomes `current_run` only when nothing else is in flight.
    /// Returns `None` (and changes nothing) when the race gate is closed.
    pub fn begin(&mut self, race: RaceResolution) -> Option<RunId> {
        if !self.admits(race) {
            return None;
        }
        let run = RunId(self.next_run);
        self.next_run += 1;
        self.latest_run = Some(run);
        if self.current_run.is_none() {
            self.current_run = Some(run);
        }
        self.status = Status::Running;
        self.data = None;
        self.error = None;
        Some(run)
    }

    pub fn is_eligible(&self, run: RunId, race: RaceResolution) -> bool {
        match race {
            RaceResolution::TakeFirst => self.current_run == Some(run),
            RaceResolution::TakeLast => self.latest_run == Some(run),
        }
    }

    /// Publish the outcome of `run` if it is still eligible. Losing runs get
    /// `None` and leave the state untouched.
    pub fn settle(
        &mut self,
        run: RunId,
        race: RaceResolution,
        outcome: Result<T, E>,
    ) -> Option<Published<T, E>>
    where
        T: Clone,
        E: Clone,
    {
        if !self.is_eligible(run, race) {
            return None;
        }
        self.current_run = None;
        Some(match outcome {
            Ok(value) => {
                self.data = Some(value.clone());
                self.status = Status::Resolved;
                Published::Value(value)
            }
            Err(error) => {
                self.error = Some(error.clone());
                self.status = Status::Rejected;
                Published::Error(error)
            }
        })
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn clear_data(&mut self) {
        self.data = None;
    }

    /// Auto-trigger gate. Remembers `inputs` whenever it lets them through.
    pub fn should_auto_trigger(&mut self, inputs: &A, skip: bool, trigger_on_same_deps: bool) -> bool
    where
        A: Deps,
    {
        if skip {
            return false;
        }
        let unchanged = self.previous_inputs.as_ref().is_some_and(|prev| prev.same(inputs));
        if unchanged && !trigger_on_same_deps {
            return false;
        }
        self.previous_inputs = Some(inputs.clone());
        true
    }
}
