//! Reduce every instrument of a registry to the single value we send for it.
//!
//! Counters are sent as cumulative counters, everything else as a gauge:
//! histograms and timers by their mean, meters by their one minute rate.

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize, Serializer};

use crate::{
    config::{Config, Dimensions},
    metrics::Instrument,
    registry::Registry,
};

/// How the ingestion endpoint should treat a datapoint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Counter,
    Gauge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub metric: String,
    #[serde(serialize_with = "serialize_value")]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Arc<Dimensions>>,
}

impl Datapoint {
    pub fn new(metric: impl Into<String>, value: f64) -> Self {
        Self {
            metric: metric.into(),
            value,
            dimensions: None,
        }
    }
}

/// Whole values go out as JSON integers, `3` rather than `3.0`.
fn serialize_value<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
    let v = *value;
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        s.serialize_i64(v as i64)
    } else {
        s.serialize_f64(v)
    }
}

/// One flush worth of datapoints, grouped by category. Serializes to
/// `{"counter": [...], "gauge": [...]}`, categories without datapoints are
/// left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch {
    datapoints: BTreeMap<Category, Vec<Datapoint>>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, category: Category, datapoint: Datapoint) {
        self.datapoints.entry(category).or_default().push(datapoint);
    }

    pub fn get(&self, category: Category) -> &[Datapoint] {
        self.datapoints
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.datapoints.values().all(Vec::is_empty)
    }

    /// Total number of datapoints across categories.
    pub fn len(&self) -> usize {
        self.datapoints.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &Datapoint)> {
        self.datapoints
            .iter()
            .flat_map(|(category, points)| points.iter().map(move |p| (*category, p)))
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Datapoint> {
        self.datapoints.values_mut().flatten()
    }
}

/// The value and category we export for an instrument, `None` for kinds we
/// don't know how to export.
pub fn reduce(instrument: &Instrument) -> Option<(Category, f64)> {
    let reduced = match instrument {
        Instrument::Counter(m) => (Category::Counter, m.count() as f64),
        Instrument::Gauge(m) => (Category::Gauge, m.value() as f64),
        Instrument::FloatGauge(m) => (Category::Gauge, m.value()),
        Instrument::Histogram(m) => (Category::Gauge, m.mean()),
        Instrument::Meter(m) => (Category::Gauge, m.rate1()),
        Instrument::Timer(m) => (Category::Gauge, m.mean()),
        Instrument::Other(_) => return None,
    };
    Some(reduced)
}

/// Take a point in time read of every instrument in `registry`.
pub fn sample<R: Registry + ?Sized>(registry: &R, config: &Config) -> Batch {
    let prefix = config.prefix.as_deref().filter(|p| !p.is_empty());
    let mut batch = Batch::new();

    registry.each(&mut |name, instrument| {
        let Some((category, value)) = reduce(instrument) else {
            return;
        };
        let metric = match prefix {
            Some(prefix) => format!("{prefix}.{name}"),
            None => name.to_string(),
        };
        batch.push(category, Datapoint::new(metric, value));
    });

    // Dimensions go on in a second pass to keep the reduction above about
    // values only.
    if let Some(dimensions) = &config.dimensions {
        for datapoint in batch.iter_mut() {
            datapoint.dimensions = Some(Arc::clone(dimensions));
        }
    }

    batch
}
