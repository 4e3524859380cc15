//! Metric capability.

use std::fmt;
use std::sync::Arc;

use crate::attribute::KeyValue;
use crate::error::TelemetryResult;

/// The three instrument primitives probes may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    /// Monotonic sum; negative values are dropped.
    Counter,
    /// Signed sum.
    UpDownCounter,
    /// Distribution of recorded values.
    Histogram,
}

impl InstrumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::Counter => "counter",
            InstrumentKind::UpDownCounter => "up_down_counter",
            InstrumentKind::Histogram => "histogram",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of an instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentDescriptor {
    pub name: String,
    pub kind: InstrumentKind,
    pub unit: String,
    pub description: String,
}

impl InstrumentDescriptor {
    pub fn new(
        kind: InstrumentKind,
        name: impl Into<String>,
        unit: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            unit: unit.into(),
            description: description.into(),
        }
    }
}

/// A handle measurements are recorded against.
pub trait Instrument: Send + Sync {
    fn descriptor(&self) -> &InstrumentDescriptor;

    fn record(&self, value: i64, attributes: &[KeyValue]);
}

/// Hands out instruments. Shared by every probe.
pub trait Meter: Send + Sync {
    /// Get or create the instrument described by `descriptor`.
    fn instrument(&self, descriptor: InstrumentDescriptor) -> TelemetryResult<Arc<dyn Instrument>>;

    fn i64_histogram(
        &self,
        name: &str,
        unit: &str,
        description: &str,
    ) -> TelemetryResult<Arc<dyn Instrument>> {
        self.instrument(InstrumentDescriptor::new(
            InstrumentKind::Histogram,
            name,
            unit,
            description,
        ))
    }

    fn i64_up_down_counter(
        &self,
        name: &str,
        unit: &str,
        description: &str,
    ) -> TelemetryResult<Arc<dyn Instrument>> {
        self.instrument(InstrumentDescriptor::new(
            InstrumentKind::UpDownCounter,
            name,
            unit,
            description,
        ))
    }

    fn u64_counter(
        &self,
        name: &str,
        unit: &str,
        description: &str,
    ) -> TelemetryResult<Arc<dyn Instrument>> {
        self.instrument(InstrumentDescriptor::new(
            InstrumentKind::Counter,
            name,
            unit,
            description,
        ))
    }
}
