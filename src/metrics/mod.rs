use std::{any::Any, fmt, marker::PhantomData, sync::Arc};

use crate::{
    error::RegistryError,
    registry::{MetricRegistry, DEFAULT_REGISTRY},
};

pub(crate) mod counter;
pub(crate) mod gauge;
pub(crate) mod histogram;
pub(crate) mod meter;
pub(crate) mod timer;

pub use counter::Counter;
pub use gauge::{FloatGauge, Gauge};
pub use histogram::Histogram;
pub use meter::Meter;
pub use timer::Timer;

/// Every kind of instrument a registry can hold. The six known kinds are
/// sampled by the flusher, anything stored as [`Instrument::Other`] is carried
/// by the registry but never exported.
#[derive(Clone)]
pub enum Instrument {
    Counter(Counter),
    Gauge(Gauge),
    FloatGauge(FloatGauge),
    Histogram(Histogram),
    Meter(Meter),
    Timer(Timer),
    Other(Arc<dyn Any + Send + Sync>),
}

impl Instrument {
    /// Short name of the instrument kind, used in registry errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Instrument::Counter(_) => "counter",
            Instrument::Gauge(_) => "gauge",
            Instrument::FloatGauge(_) => "float_gauge",
            Instrument::Histogram(_) => "histogram",
            Instrument::Meter(_) => "meter",
            Instrument::Timer(_) => "timer",
            Instrument::Other(_) => "other",
        }
    }
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instrument").field(&self.kind()).finish()
    }
}

/// A trait representing the public metric interface. This is common across
/// all metric kinds, and slots into the general [`MetricDef`] to convert
/// between the concrete handle and its registry slot.
pub trait Metric: Clone + Sized {
    const KIND: &'static str;

    fn must() -> Self;

    fn into_instrument(self) -> Instrument;

    fn from_instrument(instrument: &Instrument) -> Option<Self>;
}

macro_rules! impl_metric {
    ($ty:ident, $kind:literal) => {
        impl Metric for $ty {
            const KIND: &'static str = $kind;

            fn must() -> Self {
                Self::default()
            }

            fn into_instrument(self) -> Instrument {
                Instrument::$ty(self)
            }

            fn from_instrument(instrument: &Instrument) -> Option<Self> {
                match instrument {
                    Instrument::$ty(m) => Some(m.clone()),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Instrument {
            fn from(m: $ty) -> Self {
                m.into_instrument()
            }
        }
    };
}

impl_metric!(Counter, "counter");
impl_metric!(Gauge, "gauge");
impl_metric!(FloatGauge, "float_gauge");
impl_metric!(Histogram, "histogram");
impl_metric!(Meter, "meter");
impl_metric!(Timer, "timer");

/// A constant definition of a metric. Provides a single spot for defining a
/// metric at compile time, internally it calls out to the registry at runtime
/// to register the metric or fetch the already registered handle.
pub struct MetricDef<M> {
    name: &'static str,
    _kind: PhantomData<M>,
}

impl<M: Metric> MetricDef<M> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _kind: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fetch or create this metric in the [`DEFAULT_REGISTRY`].
    pub fn register(&self) -> Result<M, RegistryError> {
        self.register_with(&DEFAULT_REGISTRY)
    }

    pub fn register_with(&self, registry: &MetricRegistry) -> Result<M, RegistryError> {
        registry.get_or_register(self.name)
    }

    /// Like [`MetricDef::register`] but panics when the name is already taken
    /// by a different kind of metric. Meant for process-wide definitions where
    /// a clash is a programming error.
    pub fn must(&self) -> M {
        self.must_with(&DEFAULT_REGISTRY)
    }

    #[doc(hidden)]
    pub fn must_with(&self, registry: &MetricRegistry) -> M {
        match self.register_with(registry) {
            Ok(m) => m,
            Err(e) => panic!("{e}"),
        }
    }
}
