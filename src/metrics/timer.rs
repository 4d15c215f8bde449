use std::time::{Duration, Instant};

use super::{histogram::Histogram, meter::Meter};

/// Tracks how long something takes and how often it happens. Durations are
/// recorded in nanoseconds, so [`Timer::mean`] is a nanosecond value.
#[derive(Clone, Default, Debug)]
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
}

impl Timer {
    pub fn update(&self, duration: Duration) {
        self.histogram.record(duration.as_nanos() as f64);
        self.meter.mark_one();
    }

    pub fn update_since(&self, start: Instant) {
        self.update(start.elapsed());
    }

    /// Run `f` and record how long it took.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let res = f();
        self.update_since(start);
        res
    }

    pub fn count(&self) -> u64 {
        self.histogram.count()
    }

    pub fn mean(&self) -> f64 {
        self.histogram.mean()
    }

    pub fn min(&self) -> f64 {
        self.histogram.min()
    }

    pub fn max(&self) -> f64 {
        self.histogram.max()
    }

    pub fn rate1(&self) -> f64 {
        self.meter.rate1()
    }
}
