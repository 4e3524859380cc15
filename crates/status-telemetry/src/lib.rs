//! status-telemetry: the telemetry sink seen by probes.
//!
//! Probes never reach for a process-wide provider. The driver builds one
//! [`Telemetry`] value and passes it to every probe constructor.
//!
//! # Architecture
//!
//! ```text
//! Telemetry
//!   ├── Arc<dyn Tracer> → start_span() → Box<dyn Span> (wrapped in SpanGuard)
//!   └── Arc<dyn Meter>  → instrument() → Arc<dyn Instrument> → record()
//!
//! Implementations
//!   ├── LogTracer        one tracing event per ended span
//!   ├── MetricsRegistry  aggregated sums and histograms per label set
//!   │     └── render_prometheus() → text/plain for /metrics
//!   └── RecordingSink    keeps every span and measurement (tests)
//! ```

pub mod attribute;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod prometheus;
pub mod recording;
pub mod registry;
pub mod trace;

use std::sync::Arc;

pub use attribute::{KeyValue, Value, label_name, validate_key};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::LogTracer;
pub use metrics::{Instrument, InstrumentDescriptor, InstrumentKind, Meter};
pub use prometheus::render_prometheus;
pub use recording::{FinishedSpan, Measurement, RecordingSink};
pub use registry::{DEFAULT_BUCKETS, MetricFamily, MetricPoint, MetricsRegistry, PointValue};
pub use trace::{Span, SpanGuard, SpanKind, SpanStatus, Tracer, error_chain};

/// The span and metric capabilities handed to every probe.
#[derive(Clone)]
pub struct Telemetry {
    tracer: Arc<dyn Tracer>,
    meter: Arc<dyn Meter>,
}

impl Telemetry {
    pub fn new(tracer: Arc<dyn Tracer>, meter: Arc<dyn Meter>) -> Self {
        Self { tracer, meter }
    }

    /// Both capabilities backed by one [`RecordingSink`].
    pub fn recording(sink: &RecordingSink) -> Self {
        Self::new(Arc::new(sink.clone()), Arc::new(sink.clone()))
    }

    pub fn tracer(&self) -> &Arc<dyn Tracer> {
        &self.tracer
    }

    pub fn meter(&self) -> &Arc<dyn Meter> {
        &self.meter
    }
}
