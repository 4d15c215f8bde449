use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

/// Running summary of every recorded value. Only the moments we export are
/// kept, there are no buckets.
#[derive(Debug)]
struct HistogramInner {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Default for HistogramInner {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0f64,
            min: f64::MAX,
            max: f64::MIN,
        }
    }
}

impl HistogramInner {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }
}

/// A threadsafe histogram tracking count, sum, min and max of the recorded
/// values. Reading never resets it.
#[derive(Default, Clone, Debug)]
pub struct Histogram {
    inner: Arc<Mutex<HistogramInner>>,
}

impl Histogram {
    pub fn record(&self, value: f64) {
        self.inner.lock().record(value);
    }

    pub fn record_duration_ms(&self, value: Duration) {
        self.record(value.as_secs_f64() * 1_000.0)
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().count
    }

    pub fn sum(&self) -> f64 {
        self.inner.lock().sum
    }

    /// Smallest recorded value, 0 for an empty histogram.
    pub fn min(&self) -> f64 {
        let inner = self.inner.lock();
        if inner.count == 0 {
            0.0
        } else {
            inner.min
        }
    }

    /// Largest recorded value, 0 for an empty histogram.
    pub fn max(&self) -> f64 {
        let inner = self.inner.lock();
        if inner.count == 0 {
            0.0
        } else {
            inner.max
        }
    }

    /// Arithmetic mean of every recorded value, 0 for an empty histogram.
    pub fn mean(&self) -> f64 {
        self.inner.lock().mean()
    }
}
