//! Periodically flush an in-process metrics registry to a SignalFx style
//! ingestion endpoint.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use metrics64_signalfx::{Config, CounterDef, Flusher, DEFAULT_REGISTRY};
//!
//! const REQUESTS: CounterDef = CounterDef::new("api/requests");
//!
//! # async fn doc() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::new("my-token")
//!     .with_prefix("api")
//!     .with_host_dimension();
//! let handle = Flusher::new(config)?.spawn(&*DEFAULT_REGISTRY, Duration::from_secs(10));
//!
//! REQUESTS.must().incr();
//! # handle.abort();
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod flusher;
pub mod metrics;
mod registry;
pub mod sample;

pub use config::{Config, Dimensions, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT, TOKEN_HEADER};
pub use error::{ConfigError, FlushError, RegistryError};
pub use flusher::{run, FlushOutcome, Flusher};
pub use metrics::{
    Counter, FloatGauge, Gauge, Histogram, Instrument, Meter, Metric, MetricDef, Timer,
};
pub use registry::{MetricRegistry, Registry, DEFAULT_REGISTRY};
pub use sample::{sample, Batch, Category, Datapoint};

pub type CounterDef = MetricDef<Counter>;
pub type GaugeDef = MetricDef<Gauge>;
pub type FloatGaugeDef = MetricDef<FloatGauge>;
pub type HistogramDef = MetricDef<Histogram>;
pub type MeterDef = MetricDef<Meter>;
pub type TimerDef = MetricDef<Timer>;
