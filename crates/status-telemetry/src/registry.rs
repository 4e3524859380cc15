//! Metrics registry: aggregates measurements per label set.
//!
//! Sums for counters, distributions for histograms. The registry is the
//! metric reader behind the `/metrics` endpoint: [`MetricsRegistry::families`]
//! takes a point-in-time copy that [`crate::render_prometheus`] turns into
//! text.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::attribute::KeyValue;
use crate::error::{TelemetryError, TelemetryResult};
use crate::metrics::{Instrument, InstrumentDescriptor, InstrumentKind, Meter};

/// Histogram bucket upper bounds, in the instrument's unit (milliseconds
/// for durations).
pub const DEFAULT_BUCKETS: [i64; 15] = [
    0, 5, 10, 25, 50, 75, 100, 250, 500, 750, 1000, 2500, 5000, 7500, 10000,
];

/// Sorted `(key, value)` pairs identifying one series.
pub type LabelSet = Vec<(String, String)>;

/// Aggregated value of one series.
#[derive(Debug, Clone, PartialEq)]
pub enum PointValue {
    Sum(i64),
    Histogram {
        count: u64,
        sum: i64,
        /// Per-bucket (non-cumulative) counts; one more entry than
        /// [`DEFAULT_BUCKETS`] for the overflow bucket.
        bucket_counts: Vec<u64>,
    },
}

/// One series of an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub labels: LabelSet,
    pub value: PointValue,
}

/// All series of an instrument.
#[derive(Debug, Clone)]
pub struct MetricFamily {
    pub descriptor: InstrumentDescriptor,
    pub points: Vec<MetricPoint>,
}

/// Aggregating meter shared by every probe.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    /// Registered instruments: name → aggregate.
    instruments: Arc<RwLock<HashMap<String, Arc<Aggregate>>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy of every instrument, sorted by name.
    pub fn families(&self) -> Vec<MetricFamily> {
        let instruments = self
            .instruments
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut families: Vec<MetricFamily> =
            instruments.values().map(|agg| agg.snapshot()).collect();
        families.sort_by(|a, b| a.descriptor.name.cmp(&b.descriptor.name));
        families
    }

    /// Sum of every series of `name` whose labels include all of `filter`.
    ///
    /// For histograms this is the sum of recorded values.
    pub fn sum_where(&self, name: &str, filter: &[(&str, &str)]) -> i64 {
        self.matching_points(name, filter)
            .iter()
            .map(|point| match &point.value {
                PointValue::Sum(v) => *v,
                PointValue::Histogram { sum, .. } => *sum,
            })
            .sum()
    }

    /// Number of histogram records across matching series of `name`.
    pub fn count_where(&self, name: &str, filter: &[(&str, &str)]) -> u64 {
        self.matching_points(name, filter)
            .iter()
            .map(|point| match &point.value {
                PointValue::Sum(_) => 0,
                PointValue::Histogram { count, .. } => *count,
            })
            .sum()
    }

    fn matching_points(&self, name: &str, filter: &[(&str, &str)]) -> Vec<MetricPoint> {
        let instruments = self
            .instruments
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(agg) = instruments.get(name) else {
            return Vec::new();
        };
        agg.snapshot()
            .points
            .into_iter()
            .filter(|point| {
                filter.iter().all(|(k, v)| {
                    point
                        .labels
                        .iter()
                        .any(|(lk, lv)| lk.as_str() == *k && lv.as_str() == *v)
                })
            })
            .collect()
    }
}

impl Meter for MetricsRegistry {
    fn instrument(&self, descriptor: InstrumentDescriptor) -> TelemetryResult<Arc<dyn Instrument>> {
        let mut instruments = self
            .instruments
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = instruments.get(&descriptor.name) {
            if existing.descriptor.kind != descriptor.kind {
                return Err(TelemetryError::InstrumentConflict {
                    name: descriptor.name,
                    existing: existing.descriptor.kind.as_str(),
                    requested: descriptor.kind.as_str(),
                });
            }
            return Ok(existing.clone());
        }

        debug!(name = %descriptor.name, kind = %descriptor.kind, "instrument registered");
        let agg = Arc::new(Aggregate {
            descriptor: descriptor.clone(),
            series: Mutex::new(BTreeMap::new()),
        });
        instruments.insert(descriptor.name, agg.clone());
        Ok(agg)
    }
}

/// Per-instrument aggregation state.
struct Aggregate {
    descriptor: InstrumentDescriptor,
    series: Mutex<BTreeMap<LabelSet, PointValue>>,
}

impl Aggregate {
    fn snapshot(&self) -> MetricFamily {
        let series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        MetricFamily {
            descriptor: self.descriptor.clone(),
            points: series
                .iter()
                .map(|(labels, value)| MetricPoint {
                    labels: labels.clone(),
                    value: value.clone(),
                })
                .collect(),
        }
    }
}

impl Instrument for Aggregate {
    fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    fn record(&self, value: i64, attributes: &[KeyValue]) {
        if self.descriptor.kind == InstrumentKind::Counter && value < 0 {
            warn!(name = %self.descriptor.name, value, "negative value dropped for monotonic counter");
            return;
        }

        let labels = label_set(attributes);
        let mut series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        match self.descriptor.kind {
            InstrumentKind::Counter | InstrumentKind::UpDownCounter => {
                let entry = series.entry(labels).or_insert(PointValue::Sum(0));
                if let PointValue::Sum(total) = entry {
                    *total += value;
                }
            }
            InstrumentKind::Histogram => {
                let entry = series.entry(labels).or_insert_with(|| PointValue::Histogram {
                    count: 0,
                    sum: 0,
                    bucket_counts: vec![0; DEFAULT_BUCKETS.len() + 1],
                });
                if let PointValue::Histogram {
                    count,
                    sum,
                    bucket_counts,
                } = entry
                {
                    *count += 1;
                    *sum += value;
                    let bucket = DEFAULT_BUCKETS
                        .iter()
                        .position(|bound| value <= *bound)
                        .unwrap_or(DEFAULT_BUCKETS.len());
                    bucket_counts[bucket] += 1;
                }
            }
        }
    }
}

/// Stringify and sort attributes; a repeated key keeps its last value.
fn label_set(attributes: &[KeyValue]) -> LabelSet {
    let labels: BTreeMap<String, String> = attributes
        .iter()
        .map(|kv| (kv.key.clone(), kv.value.to_string()))
        .collect();
    labels.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(v: &str) -> KeyValue {
        KeyValue::string("name", v)
    }

    #[test]
    fn up_down_counter_sums_signed_deltas() {
        let registry = MetricsRegistry::new();
        let status = registry.i64_up_down_counter("status", "1", "Status").unwrap();

        status.record(1, &[name("a"), KeyValue::string("class", "2xx")]);
        status.record(0, &[name("a"), KeyValue::string("class", "5xx")]);
        status.record(-1, &[name("a"), KeyValue::string("class", "2xx")]);
        status.record(1, &[name("a"), KeyValue::string("class", "5xx")]);

        assert_eq!(registry.sum_where("status", &[("class", "2xx")]), 0);
        assert_eq!(registry.sum_where("status", &[("class", "5xx")]), 1);
        assert_eq!(registry.sum_where("status", &[("name", "a")]), 1);
    }

    #[test]
    fn counter_drops_negative_values() {
        let registry = MetricsRegistry::new();
        let errors = registry.u64_counter("errors", "1", "Errors").unwrap();
        errors.record(1, &[name("a")]);
        errors.record(-5, &[name("a")]);
        errors.record(1, &[name("a")]);
        assert_eq!(registry.sum_where("errors", &[]), 2);
    }

    #[test]
    fn histogram_buckets_values() {
        let registry = MetricsRegistry::new();
        let duration = registry.i64_histogram("duration", "ms", "Duration").unwrap();
        for v in [3, 5, 120, 20_000] {
            duration.record(v, &[name("a")]);
        }

        assert_eq!(registry.count_where("duration", &[("name", "a")]), 4);
        assert_eq!(registry.sum_where("duration", &[]), 3 + 5 + 120 + 20_000);

        let families = registry.families();
        let PointValue::Histogram { bucket_counts, .. } = &families[0].points[0].value else {
            panic!("expected histogram");
        };
        assert_eq!(bucket_counts[1], 2); // <= 5
        assert_eq!(bucket_counts[7], 1); // <= 250
        assert_eq!(bucket_counts[DEFAULT_BUCKETS.len()], 1); // overflow
    }

    #[test]
    fn same_name_returns_shared_instrument() {
        let registry = MetricsRegistry::new();
        let a = registry.u64_counter("errors", "1", "").unwrap();
        let b = registry.u64_counter("errors", "1", "").unwrap();
        a.record(1, &[]);
        b.record(1, &[]);
        assert_eq!(registry.sum_where("errors", &[]), 2);
        assert_eq!(registry.families().len(), 1);
    }

    #[test]
    fn kind_conflict_rejected() {
        let registry = MetricsRegistry::new();
        registry.u64_counter("x", "1", "").unwrap();
        assert!(registry.i64_histogram("x", "ms", "").is_err());
    }

    #[test]
    fn families_sorted_and_labels_normalised() {
        let registry = MetricsRegistry::new();
        let b = registry.u64_counter("b", "1", "").unwrap();
        let a = registry.u64_counter("a", "1", "").unwrap();
        b.record(1, &[KeyValue::string("z", "1"), KeyValue::i64("code", 200)]);
        a.record(1, &[]);

        let families = registry.families();
        assert_eq!(families[0].descriptor.name, "a");
        assert_eq!(families[1].descriptor.name, "b");
        assert_eq!(
            families[1].points[0].labels,
            vec![
                ("code".to_string(), "200".to_string()),
                ("z".to_string(), "1".to_string())
            ]
        );
    }

    #[test]
    fn unknown_instrument_sums_to_zero() {
        let registry = MetricsRegistry::new();
        assert_eq!(registry.sum_where("missing", &[]), 0);
    }
}
