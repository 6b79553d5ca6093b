use std::cell::{Cell, RefCell};
use std::rc::Rc;

use repose_core::executor::active_tasks;
use repose_core::*;
use web_time::Duration;

use super::*;
use crate::testing::{advance, manual_clock};

async fn after<T>(ms: u64, outcome: Result<T, String>) -> Result<T, String> {
    sleep(Duration::from_millis(ms)).await;
    outcome
}

#[test]
fn resolves_after_delay() {
    let clock = manual_clock();
    let comp = Composition::new();
    let body = || {
        use_promise(
            |_: ()| after(400, Ok::<u32, String>(1)),
            TriggerMode::Auto(()),
            PromiseOptions::new(),
        )
    };

    assert_eq!(comp.compose(body).status, Status::Idle);
    assert!(comp.is_invalidated());
    let p = comp.compose(body);
    assert_eq!(p.status, Status::Running);
    assert!(p.is_processing());

    advance(&clock, 399);
    assert_eq!(comp.compose(body).status, Status::Running);

    advance(&clock, 1);
    assert!(comp.is_invalidated());
    let p = comp.compose(body);
    assert_eq!(p.data, Some(1));
    assert_eq!(p.error, None);
    assert_eq!(p.status, Status::Resolved);
}

#[test]
fn rejects_with_error() {
    let clock = manual_clock();
    let comp = Composition::new();
    let body = || {
        use_promise(
            |_: ()| after::<u32>(400, Err("Error".into())),
            TriggerMode::Auto(()),
            PromiseOptions::new(),
        )
    };

    comp.compose(body);
    advance(&clock, 400);
    let p = comp.compose(body);
    assert_eq!(p.data, None);
    assert_eq!(p.error.as_deref(), Some("Error"));
    assert_eq!(p.status, Status::Rejected);
}

struct Race {
    calls: Rc<Cell<u32>>,
    started: Rc<Cell<u32>>,
    successes: Rc<RefCell<Vec<u64>>>,
    settled: Rc<Cell<u32>>,
}

impl Race {
    fn new() -> Self {
        Self {
            calls: Rc::default(),
            started: Rc::default(),
            successes: Rc::default(),
            settled: Rc::default(),
        }
    }

    fn compose(&self, race: RaceResolution) -> UsePromise<u64, String, u64> {
        let calls = self.calls.clone();
        let started = self.started.clone();
        let successes = self.successes.clone();
        let settled = self.settled.clone();
        use_promise(
            move |ms: u64| {
                calls.set(calls.get() + 1);
                after(ms, Ok(ms))
            },
            TriggerMode::Manual,
            PromiseOptions::new()
                .resolve_race(race)
                .on_start(move || started.set(started.get() + 1))
                .on_success(move |v: &u64| successes.borrow_mut().push(*v))
                .on_any(move || settled.set(settled.get() + 1)),
        )
    }
}

#[test]
fn take_first_keeps_first_run() {
    let clock = manual_clock();
    let comp = Composition::new();
    let race = Race::new();

    let p = comp.compose(|| race.compose(RaceResolution::TakeFirst));
    for ms in [500, 1000, 250] {
        p.trigger(ms);
        pump();
    }
    assert_eq!(race.calls.get(), 1);
    assert_eq!(race.started.get(), 1);

    advance(&clock, 1000);
    let p = comp.compose(|| race.compose(RaceResolution::TakeFirst));
    assert_eq!(p.data, Some(500));
    assert_eq!(p.status, Status::Resolved);
    assert_eq!(*race.successes.borrow(), vec![500]);
    assert_eq!(race.settled.get(), 1);
}

#[test]
fn take_last_keeps_latest_run() {
    let clock = manual_clock();
    let comp = Composition::new();
    let race = Race::new();

    let p = comp.compose(|| race.compose(RaceResolution::TakeLast));
    for ms in [500, 1000, 250] {
        p.trigger(ms);
        pump();
    }
    assert_eq!(race.calls.get(), 3);
    assert_eq!(race.started.get(), 3);

    advance(&clock, 250);
    assert_eq!(p.tracker.data(), Some(250));

    // the slower runs settle later and are dropped
    advance(&clock, 750);
    let p = comp.compose(|| race.compose(RaceResolution::TakeLast));
    assert_eq!(p.data, Some(250));
    assert_eq!(*race.successes.borrow(), vec![250]);
    assert_eq!(race.settled.get(), 1);
    assert_eq!(active_tasks(), 0);
}

#[test]
fn take_last_stays_running_while_latest_is_pending() {
    let clock = manual_clock();
    let comp = Composition::new();
    let race = Race::new();

    let p = comp.compose(|| race.compose(RaceResolution::TakeLast));
    p.trigger(100);
    p.trigger(300);
    advance(&clock, 100);
    assert_eq!(p.tracker.status(), Status::Running);
    assert_eq!(p.tracker.data(), None);

    advance(&clock, 200);
    assert_eq!(p.tracker.data(), Some(300));
}

#[test]
fn take_first_accepts_trigger_after_settlement() {
    let clock = manual_clock();
    let comp = Composition::new();
    let race = Race::new();

    let p = comp.compose(|| race.compose(RaceResolution::TakeFirst));
    p.trigger(100);
    advance(&clock, 100);
    p.trigger(50);
    assert_eq!(race.calls.get(), 2);
    assert_eq!(p.tracker.data(), None);
    advance(&clock, 50);
    assert_eq!(p.tracker.data(), Some(50));
}

#[test]
fn clearing_keeps_status_and_invalidates() {
    let clock = manual_clock();
    let comp = Composition::new();
    let body = || {
        use_promise(
            |fail: bool| after(10, if fail { Err("nope".to_string()) } else { Ok(7u8) }),
            TriggerMode::Manual,
            PromiseOptions::new(),
        )
    };

    let p = comp.compose(body);
    p.trigger(true);
    advance(&clock, 10);
    comp.compose(body);

    p.clear_error();
    assert!(comp.is_invalidated());
    let p = comp.compose(body);
    assert_eq!(p.error, None);
    assert_eq!(p.status, Status::Rejected);

    p.trigger(false);
    advance(&clock, 10);
    p.clear_data();
    let p = comp.compose(body);
    assert_eq!(p.data, None);
    assert_eq!(p.status, Status::Resolved);
}

#[test]
fn new_run_clears_previous_outcome() {
    let clock = manual_clock();
    let comp = Composition::new();
    let race = Race::new();

    let p = comp.compose(|| race.compose(RaceResolution::TakeLast));
    p.trigger(10);
    advance(&clock, 10);
    assert_eq!(p.tracker.data(), Some(10));

    p.trigger(20);
    let p = comp.compose(|| race.compose(RaceResolution::TakeLast));
    assert_eq!(p.data, None);
    assert_eq!(p.status, Status::Running);
}

#[test]
fn status_sequence_is_observable_per_run() {
    let clock = manual_clock();
    let comp = Composition::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let body = || {
        let p = use_promise(
            |ms: u64| after(ms, Ok::<_, String>(ms)),
            TriggerMode::Auto(100),
            PromiseOptions::new(),
        );
        seen.borrow_mut().push(p.status);
        p
    };

    comp.compose(body);
    while comp.is_invalidated() {
        comp.compose(body);
    }
    advance(&clock, 100);
    while comp.is_invalidated() {
        comp.compose(body);
    }

    assert_eq!(
        *seen.borrow(),
        vec![Status::Idle, Status::Running, Status::Resolved]
    );
}

#[test]
fn auto_trigger_only_on_changed_inputs() {
    let _clock = manual_clock();
    let comp = Composition::new();
    let calls = Rc::new(Cell::new(0));
    let body = |id: u32, same: bool| {
        let calls = calls.clone();
        use_promise(
            move |(id,): (u32,)| {
                calls.set(calls.get() + 1);
                async move { Ok::<_, String>(id) }
            },
            TriggerMode::Auto((id,)),
            PromiseOptions::new().trigger_on_same_deps(same),
        )
    };

    comp.compose(|| body(1, false));
    comp.compose(|| body(1, false));
    comp.compose(|| body(1, false));
    assert_eq!(calls.get(), 1);

    comp.compose(|| body(2, false));
    assert_eq!(calls.get(), 2);

    // every pass the caller asks for runs again with trigger_on_same_deps
    for expected in [3, 4] {
        pump();
        while comp.is_invalidated() {
            comp.compose(|| body(2, true));
        }
        comp.compose(|| body(2, true));
        assert_eq!(calls.get(), expected);
    }
}

#[test]
fn same_deps_runs_do_not_feed_themselves() {
    let _clock = manual_clock();
    let comp = Composition::new();
    let calls = Rc::new(Cell::new(0));
    let body = || {
        let calls = calls.clone();
        use_promise(
            move |(id,): (u32,)| {
                calls.set(calls.get() + 1);
                async move { Ok::<_, String>(id) }
            },
            TriggerMode::Auto((1,)),
            PromiseOptions::new().trigger_on_same_deps(true),
        )
    };

    let mut passes = 1;
    comp.compose(body);
    while comp.is_invalidated() && passes < 50 {
        pump();
        comp.compose(body);
        passes += 1;
    }
    assert!(!comp.is_invalidated());
    assert_eq!(calls.get(), 1);
    assert_eq!(comp.compose(body).data, Some(1));
    assert_eq!(calls.get(), 2);
}

#[test]
fn nan_input_settles_after_one_run() {
    let _clock = manual_clock();
    let comp = Composition::new();
    let calls = Rc::new(Cell::new(0));
    let body = || {
        let calls = calls.clone();
        use_promise(
            move |(x,): (f64,)| {
                calls.set(calls.get() + 1);
                async move { Ok::<_, String>(x) }
            },
            TriggerMode::Auto((f64::NAN,)),
            PromiseOptions::new(),
        )
    };

    comp.compose(body);
    for _ in 0..5 {
        pump();
        comp.compose(body);
    }
    assert!(!comp.is_invalidated());
    assert_eq!(calls.get(), 1);
}

#[test]
fn missing_input_skips_but_falsy_does_not() {
    let _clock = manual_clock();
    let comp = Composition::new();
    let calls = Rc::new(Cell::new(0));
    let body = |id: Option<u32>| {
        let calls = calls.clone();
        use_promise(
            move |(id,): (Option<u32>,)| {
                calls.set(calls.get() + 1);
                async move { Ok::<_, String>(id) }
            },
            TriggerMode::Auto((id,)),
            PromiseOptions::new(),
        )
    };

    comp.compose(|| body(None));
    pump();
    assert_eq!(calls.get(), 0);
    assert_eq!(comp.compose(|| body(None)).status, Status::Idle);

    comp.compose(|| body(Some(0)));
    pump();
    assert_eq!(calls.get(), 1);
    assert_eq!(comp.compose(|| body(Some(0))).data, Some(Some(0)));
}

#[test]
fn custom_skip_replaces_default_rule() {
    let _clock = manual_clock();
    let comp = Composition::new();
    let calls = Rc::new(Cell::new(0));
    let body = |id: u32| {
        let calls = calls.clone();
        use_promise(
            move |(id,): (u32,)| {
                calls.set(calls.get() + 1);
                async move { Ok::<_, String>(id) }
            },
            TriggerMode::Auto((id,)),
            PromiseOptions::new().skip(|(id,): &(u32,)| *id == 0),
        )
    };

    comp.compose(|| body(0));
    assert_eq!(calls.get(), 0);
    comp.compose(|| body(3));
    assert_eq!(calls.get(), 1);
}

#[test]
fn skipped_and_manual_modes_never_auto_trigger() {
    let _clock = manual_clock();
    let comp = Composition::new();
    let calls = Rc::new(Cell::new(0));
    let body = |mode: TriggerMode<u32>| {
        let calls = calls.clone();
        use_promise(
            move |id: u32| {
                calls.set(calls.get() + 1);
                async move { Ok::<_, String>(id) }
            },
            mode,
            PromiseOptions::new(),
        )
    };

    comp.compose(|| body(TriggerMode::Skipped));
    comp.compose(|| body(TriggerMode::Manual));
    comp.compose(|| body(None::<u32>.into()));
    assert_eq!(calls.get(), 0);

    // auto after manual, then manual again with the same args
    let p = comp.compose(|| body(TriggerMode::Auto(5)));
    assert_eq!(calls.get(), 1);
    p.trigger(5);
    assert_eq!(calls.get(), 2);
}

#[test]
fn nothing_is_published_after_teardown() {
    let clock = manual_clock();
    let comp = Composition::new();
    let race = Race::new();

    let p = comp.compose(|| race.compose(RaceResolution::TakeLast));
    p.trigger(100);
    pump();
    comp.dispose();

    advance(&clock, 100);
    assert!(race.successes.borrow().is_empty());
    assert_eq!(race.settled.get(), 0);
    assert_eq!(p.tracker.data(), None);
    assert_eq!(active_tasks(), 0);

    // and no new runs start
    p.trigger(10);
    assert_eq!(race.calls.get(), 1);
}

#[test]
fn callbacks_see_published_state() {
    let clock = manual_clock();
    let comp = Composition::new();
    let observed = Rc::new(RefCell::new(None));

    let p = comp.compose(|| {
        use_promise(
            |_: ()| after::<u8>(5, Err("bad".into())),
            TriggerMode::Manual,
            PromiseOptions::new(),
        )
    });
    let tracker = p.tracker.clone();
    let sink = observed.clone();
    p.tracker.set_options(PromiseOptions::new().on_error(move |e: &String| {
        *sink.borrow_mut() = Some((e.clone(), tracker.status(), tracker.error()));
    }));

    p.trigger(());
    advance(&clock, 5);
    assert_eq!(
        *observed.borrow(),
        Some(("bad".to_string(), Status::Rejected, Some("bad".to_string())))
    );
}

#[test]
fn run_future_settles_outside_composition() {
    let tracker = PromiseTracker::new(
        |x: u32| async move { Ok::<_, String>(x * 2) },
        PromiseOptions::new(),
        Liveness::always(),
    );
    futures::executor::block_on(tracker.run(21));
    assert_eq!(tracker.data(), Some(42));
    assert_eq!(tracker.status(), Status::Resolved);
}
