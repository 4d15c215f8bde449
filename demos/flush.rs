//! Flush a handful of live metrics every few seconds.
//!
//! Reads its settings from `SFX_TOKEN`, `SFX_ENDPOINT`, `SFX_PREFIX` and
//! `SFX_DIMENSIONS`, see `Config::from_env`.

use std::time::Duration;

use metrics64_signalfx::{Config, CounterDef, Flusher, MeterDef, TimerDef, DEFAULT_REGISTRY};

const REQUESTS: CounterDef = CounterDef::new("demo/requests");
const RPS: MeterDef = MeterDef::new("demo/rps");
const LATENCY: TimerDef = TimerDef::new("demo/latency");

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let config = Config::from_env()?.with_host_dimension();
    let flusher = Flusher::new(config)?;
    let handle = flusher.spawn(&*DEFAULT_REGISTRY, Duration::from_secs(5));

    let requests = REQUESTS.register()?;
    let rps = RPS.register()?;
    let latency = LATENCY.register()?;
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    for _ in 0..120 {
        ticker.tick().await;
        latency.time(|| {
            requests.incr();
            rps.mark_one();
        });
    }
    handle.abort();
    Ok(())
}
