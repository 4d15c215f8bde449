//! Meters count events and derive exponentially weighted moving average rates
//! from them, the same 1/5/15 minute load-average style rates unix reports.
//! Instead of running a background ticker we catch up on any elapsed ticks
//! whenever the meter is touched.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

const TICK_INTERVAL: Duration = Duration::from_secs(5);
const TICK_SECS: f64 = 5.0;
const SECS_PER_MINUTE: f64 = 60.0;

/// An exponentially weighted moving average of a per-second rate, advanced
/// once per [`TICK_INTERVAL`].
#[derive(Debug)]
struct Ewma {
    alpha: f64,
    rate: f64,
    initialized: bool,
}

impl Ewma {
    fn with_minutes(minutes: f64) -> Self {
        Self {
            alpha: 1.0 - (-TICK_SECS / SECS_PER_MINUTE / minutes).exp(),
            rate: 0.0,
            initialized: false,
        }
    }

    fn tick(&mut self, count: u64) {
        let instant_rate = count as f64 / TICK_SECS;
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }

    /// Apply `ticks` ticks that saw no events. Closed form so a meter that sat
    /// idle for hours does not loop once per missed tick.
    fn decay(&mut self, ticks: u32) {
        if self.initialized {
            self.rate *= (1.0 - self.alpha).powf(f64::from(ticks));
        }
    }
}

#[derive(Debug)]
struct MeterInner {
    count: u64,
    uncounted: u64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
    start: Instant,
    last_tick: Instant,
}

impl MeterInner {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            uncounted: 0,
            m1: Ewma::with_minutes(1.0),
            m5: Ewma::with_minutes(5.0),
            m15: Ewma::with_minutes(15.0),
            start: now,
            last_tick: now,
        }
    }

    fn tick_if_necessary(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        let ticks = elapsed.as_nanos() / TICK_INTERVAL.as_nanos();
        if ticks == 0 {
            return;
        }
        let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
        self.last_tick += TICK_INTERVAL * ticks;

        let uncounted = std::mem::take(&mut self.uncounted);
        for ewma in [&mut self.m1, &mut self.m5, &mut self.m15] {
            ewma.tick(uncounted);
            ewma.decay(ticks - 1);
        }
    }

    fn mark(&mut self, n: u64, now: Instant) {
        self.tick_if_necessary(now);
        self.count += n;
        self.uncounted += n;
    }

    fn rate_mean(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.count as f64 / elapsed
    }
}

/// Counts events and tracks their rate in events per second.
#[derive(Clone, Debug)]
pub struct Meter {
    inner: Arc<Mutex<MeterInner>>,
}

impl Default for Meter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MeterInner::new(Instant::now()))),
        }
    }
}

impl Meter {
    pub fn mark(&self, n: u64) {
        self.inner.lock().mark(n, Instant::now());
    }

    pub fn mark_one(&self) {
        self.mark(1);
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().count
    }

    /// One minute moving average rate.
    pub fn rate1(&self) -> f64 {
        let mut inner = self.inner.lock();
        inner.tick_if_necessary(Instant::now());
        inner.m1.rate
    }

    /// Five minute moving average rate.
    pub fn rate5(&self) -> f64 {
        let mut inner = self.inner.lock();
        inner.tick_if_necessary(Instant::now());
        inner.m5.rate
    }

    /// Fifteen minute moving average rate.
    pub fn rate15(&self) -> f64 {
        let mut inner = self.inner.lock();
        inner.tick_if_necessary(Instant::now());
        inner.m15.rate
    }

    /// Average rate since the meter was created.
    pub fn rate_mean(&self) -> f64 {
        self.inner.lock().rate_mean(Instant::now())
    }

    /// Pretend the meter was created `by` earlier, so the next read sees
    /// that much time as already elapsed.
    #[cfg(test)]
    pub(crate) fn rewind(&self, by: Duration) {
        let mut inner = self.inner.lock();
        inner.start -= by;
        inner.last_tick -= by;
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{Meter, MeterInner, TICK_INTERVAL};

    #[test]
    fn no_rate_before_first_tick() {
        let now = Instant::now();
        let mut meter = MeterInner::new(now);
        meter.mark(10, now);
        meter.tick_if_necessary(now + Duration::from_secs(4));
        assert_eq!(meter.m1.rate, 0.0);
        assert_eq!(meter.count, 10);
    }

    #[test]
    fn first_tick_is_instant_rate() {
        let now = Instant::now();
        let mut meter = MeterInner::new(now);
        meter.mark(36, now);
        meter.tick_if_necessary(now + TICK_INTERVAL);
        assert_eq!(meter.m1.rate, 7.2);
        assert_eq!(meter.m5.rate, 7.2);
        assert_eq!(meter.m15.rate, 7.2);
        assert_eq!(meter.uncounted, 0);
    }

    #[test]
    fn one_minute_rate_decays() {
        let now = Instant::now();
        let mut meter = MeterInner::new(now);
        meter.mark(3, now);
        meter.tick_if_necessary(now + TICK_INTERVAL);
        assert!((meter.m1.rate - 0.6).abs() < 1e-12);

        // a further minute of silence: twelve ticks of e^(-5/60) each
        meter.tick_if_necessary(now + TICK_INTERVAL * 13);
        let expected = 0.6 * (-1.0f64).exp();
        assert!((meter.m1.rate - expected).abs() < 1e-9);
        assert!(meter.m5.rate > meter.m1.rate);
        assert!(meter.m15.rate > meter.m5.rate);
    }

    #[test]
    fn decay_matches_ticking_one_by_one() {
        let now = Instant::now();
        let mut stepped = MeterInner::new(now);
        let mut jumped = MeterInner::new(now);
        stepped.mark(100, now);
        jumped.mark(100, now);
        for i in 1..=10 {
            stepped.tick_if_necessary(now + TICK_INTERVAL * i);
        }
        jumped.tick_if_necessary(now + TICK_INTERVAL * 10);
        assert!((stepped.m1.rate - jumped.m1.rate).abs() < 1e-9);
        assert!((stepped.m15.rate - jumped.m15.rate).abs() < 1e-9);
    }

    #[test]
    fn rate_mean() {
        let now = Instant::now();
        let mut meter = MeterInner::new(now);
        meter.mark(20, now);
        assert_eq!(meter.rate_mean(now), 0.0);
        assert_eq!(meter.rate_mean(now + Duration::from_secs(10)), 2.0);
    }

    #[test]
    fn handle_reads_tick() {
        let meter = Meter::default();
        meter.mark(36);
        meter.rewind(TICK_INTERVAL);
        assert_eq!(meter.rate1(), 7.2);
        assert_eq!(meter.count(), 36);
    }
}
