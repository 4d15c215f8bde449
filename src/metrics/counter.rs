use std::sync::{atomic, Arc};

/// A cumulative counter. Reading the count never resets it, the exported
/// value is always the total since creation (or the last [`Counter::clear`]).
#[derive(Clone, Default, Debug)]
pub struct Counter {
    inner: Arc<atomic::AtomicI64>,
}

impl Counter {
    pub fn incr_by(&self, count: i64) {
        self.inner.fetch_add(count, atomic::Ordering::Relaxed);
    }

    pub fn incr(&self) {
        self.incr_by(1);
    }

    pub fn decr(&self) {
        self.incr_by(-1);
    }

    pub fn count(&self) -> i64 {
        self.inner.load(atomic::Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.inner.store(0, atomic::Ordering::Relaxed);
    }
}
