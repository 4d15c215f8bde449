use std::sync::{atomic, Arc};

#[derive(Clone, Default, Debug)]
pub struct Gauge {
    inner: Arc<atomic::AtomicI64>,
}

impl Gauge {
    pub fn incr_by(&self, count: i64) {
        self.inner.fetch_add(count, atomic::Ordering::Relaxed);
    }

    pub fn incr(&self) {
        self.incr_by(1);
    }

    pub fn decr(&self) {
        self.incr_by(-1)
    }

    pub fn set(&self, val: i64) {
        self.inner.store(val, atomic::Ordering::Relaxed)
    }

    pub fn value(&self) -> i64 {
        self.inner.load(atomic::Ordering::Relaxed)
    }
}

/// A gauge holding an `f64`. The value is stored as its raw bits in an
/// atomic so reads and writes stay lock free.
#[derive(Clone, Default, Debug)]
pub struct FloatGauge {
    bits: Arc<atomic::AtomicU64>,
}

impl FloatGauge {
    pub fn set(&self, val: f64) {
        self.bits.store(val.to_bits(), atomic::Ordering::Relaxed)
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(atomic::Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::{FloatGauge, Gauge};

    #[test]
    fn gauge_set_and_adjust() {
        let gauge = Gauge::default();
        gauge.set(10);
        gauge.incr();
        gauge.decr();
        gauge.incr_by(-4);
        assert_eq!(gauge.value(), 6);
    }

    #[test]
    fn float_gauge_defaults_to_zero() {
        let gauge = FloatGauge::default();
        assert_eq!(gauge.value(), 0.0);
        gauge.set(-12.5);
        assert_eq!(gauge.clone().value(), -12.5);
    }
}
