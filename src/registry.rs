use parking_lot::RwLock;
use std::{
    collections::{btree_map::Entry, BTreeMap},
    sync::LazyLock,
};

use crate::{
    error::RegistryError,
    metrics::{Counter, FloatGauge, Gauge, Histogram, Instrument, Meter, Metric, Timer},
};

pub static DEFAULT_REGISTRY: LazyLock<MetricRegistry> = LazyLock::new(MetricRegistry::new);

/// The one capability the flusher needs from a registry: visit every
/// registered instrument along with its name. Implementations must be safe to
/// call while other threads keep mutating the instruments.
pub trait Registry: Send + Sync {
    fn each(&self, f: &mut dyn FnMut(&str, &Instrument));
}

/// A name keyed store of instruments. Names are unique across kinds, asking
/// for a counter under a name that already holds a gauge is an error.
#[derive(Default)]
pub struct MetricRegistry {
    metrics: RwLock<BTreeMap<String, Instrument>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            metrics: Default::default(),
        }
    }

    /// Store `instrument` under `name`. Fails if the name is already taken,
    /// whatever the kind of the existing instrument.
    pub fn register(
        &self,
        name: impl Into<String>,
        instrument: impl Into<Instrument>,
    ) -> Result<(), RegistryError> {
        let mut metrics = self.metrics.write();
        match metrics.entry(name.into()) {
            Entry::Occupied(oe) => Err(RegistryError::Duplicate {
                name: oe.key().clone(),
            }),
            Entry::Vacant(ve) => {
                ve.insert(instrument.into());
                Ok(())
            }
        }
    }

    /// Return the metric registered under `name`, creating it first if the
    /// name is free. Handles are cheap clones sharing the registered state.
    pub fn get_or_register<M: Metric>(&self, name: &str) -> Result<M, RegistryError> {
        if let Some(existing) = self.metrics.read().get(name) {
            return Self::downcast(name, existing);
        }
        let mut metrics = self.metrics.write();
        match metrics.entry(name.to_string()) {
            // someone registered it between our read and write lock
            Entry::Occupied(oe) => Self::downcast(name, oe.get()),
            Entry::Vacant(ve) => {
                let metric = M::must();
                ve.insert(metric.clone().into_instrument());
                Ok(metric)
            }
        }
    }

    fn downcast<M: Metric>(name: &str, existing: &Instrument) -> Result<M, RegistryError> {
        M::from_instrument(existing).ok_or_else(|| RegistryError::KindMismatch {
            name: name.to_string(),
            registered: existing.kind(),
            requested: M::KIND,
        })
    }

    pub fn get(&self, name: &str) -> Option<Instrument> {
        self.metrics.read().get(name).cloned()
    }

    pub fn unregister(&self, name: &str) -> Option<Instrument> {
        self.metrics.write().remove(name)
    }

    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }

    pub fn counter(&self, name: &str) -> Result<Counter, RegistryError> {
        self.get_or_register(name)
    }

    pub fn gauge(&self, name: &str) -> Result<Gauge, RegistryError> {
        self.get_or_register(name)
    }

    pub fn float_gauge(&self, name: &str) -> Result<FloatGauge, RegistryError> {
        self.get_or_register(name)
    }

    pub fn histogram(&self, name: &str) -> Result<Histogram, RegistryError> {
        self.get_or_register(name)
    }

    pub fn meter(&self, name: &str) -> Result<Meter, RegistryError> {
        self.get_or_register(name)
    }

    pub fn timer(&self, name: &str) -> Result<Timer, RegistryError> {
        self.get_or_register(name)
    }
}

impl Registry for MetricRegistry {
    /// Visits instruments in name order while holding the read lock.
    fn each(&self, f: &mut dyn FnMut(&str, &Instrument)) {
        let metrics = self.metrics.read();
        for (name, instrument) in metrics.iter() {
            f(name, instrument);
        }
    }
}

impl<R: Registry + ?Sized> Registry for &R {
    fn each(&self, f: &mut dyn FnMut(&str, &Instrument)) {
        (**self).each(f)
    }
}

impl<R: Registry + ?Sized> Registry for std::sync::Arc<R> {
    fn each(&self, f: &mut dyn FnMut(&str, &Instrument)) {
        (**self).each(f)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{CounterDef, GaugeDef};

    const REQUESTS: CounterDef = CounterDef::new("registry_test/requests");

    #[test]
    fn handles_share_state() {
        let registry = MetricRegistry::new();
        let counter = registry.counter("hits").unwrap();
        let again = registry.counter("hits").unwrap();
        counter.incr();
        again.incr();
        assert_eq!(registry.len(), 1);
        match registry.get("hits") {
            Some(Instrument::Counter(c)) => assert_eq!(c.count(), 2),
            other => panic!("unexpected instrument {other:?}"),
        }
    }

    #[test]
    fn kind_mismatch() {
        let registry = MetricRegistry::new();
        registry.gauge("queue").unwrap();
        let err = registry.counter("queue").unwrap_err();
        assert_eq!(
            err,
            RegistryError::KindMismatch {
                name: "queue".into(),
                registered: "gauge",
                requested: "counter",
            }
        );
    }

    #[test]
    fn register_rejects_duplicates() {
        let registry = MetricRegistry::new();
        registry
            .register("custom", Instrument::Other(Arc::new(5u8)))
            .unwrap();
        assert!(matches!(
            registry.register("custom", Counter::default()),
            Err(RegistryError::Duplicate { .. })
        ));
    }

    #[test]
    fn each_visits_in_name_order() {
        let registry = MetricRegistry::new();
        registry.timer("b").unwrap();
        registry.meter("c").unwrap();
        registry.histogram("a").unwrap();
        let mut seen = Vec::new();
        registry.each(&mut |name, instrument| seen.push((name.to_string(), instrument.kind())));
        assert_eq!(
            seen,
            vec![
                ("a".to_string(), "histogram"),
                ("b".to_string(), "timer"),
                ("c".to_string(), "meter"),
            ]
        );
        assert!(registry.unregister("b").is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn definitions() {
        let registry = MetricRegistry::new();
        let counter = REQUESTS.must_with(&registry);
        counter.incr_by(3);
        assert_eq!(REQUESTS.must_with(&registry).count(), 3);
        let gauge_def: GaugeDef = GaugeDef::new("registry_test/requests");
        assert!(gauge_def.register_with(&registry).is_err());

        // the default registry is process wide
        REQUESTS.must().incr();
        assert!(DEFAULT_REGISTRY.get(REQUESTS.name()).is_some());
    }
}
