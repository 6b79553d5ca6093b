use repose_core::*;
use repose_hooks::*;
use web_time::{Duration, Instant};

/// Pretend request that answers with its own latency.
async fn fetch(ms: u64) -> Result<u64, String> {
    sleep(Duration::from_millis(ms)).await;
    if ms == 0 {
        return Err("empty request".into());
    }
    Ok(ms)
}

fn search(race: RaceResolution) -> UsePromise<u64, String, u64> {
    use_promise(
        fetch,
        TriggerMode::Manual,
        PromiseOptions::new()
            .resolve_race(race)
            .on_start(move || log::debug!("{race:?}: run started"))
            .on_success(move |ms: &u64| log::info!("{race:?}: published {ms} ms response"))
            .on_error(move |e: &String| log::warn!("{race:?}: {e}")),
    )
}

fn race(policy: RaceResolution, latencies: &[u64]) -> anyhow::Result<u64> {
    let comp = Composition::new();
    let started = Instant::now();

    let p = comp.compose(|| search(policy));
    for &ms in latencies {
        p.trigger(ms);
    }
    run_until_idle();

    let p = comp.compose(|| search(policy));
    log::info!(
        "{policy:?}: settled as {:?} after {:?}",
        p.status,
        started.elapsed()
    );
    comp.dispose();
    p.data
        .ok_or_else(|| anyhow::anyhow!("{policy:?} published nothing ({:?})", p.error))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let latencies = [500, 1000, 250];
    let first = race(RaceResolution::TakeFirst, &latencies)?;
    let last = race(RaceResolution::TakeLast, &latencies)?;
    println!("take first: {first} ms, take last: {last} ms");
    Ok(())
}
