//! In-memory sink that keeps every span and measurement.
//!
//! Nothing is aggregated or dropped, so tests can assert on exactly what a
//! probe emitted during one execution.

use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::attribute::{self, KeyValue, Value};
use crate::error::{TelemetryError, TelemetryResult};
use crate::metrics::{Instrument, InstrumentDescriptor, InstrumentKind, Meter};
use crate::trace::{Span, SpanKind, SpanStatus, Tracer, error_chain};

/// A span after `end` was called.
#[derive(Debug, Clone)]
pub struct FinishedSpan {
    pub name: String,
    pub kind: SpanKind,
    pub attributes: Vec<KeyValue>,
    pub status: SpanStatus,
    /// Messages passed to `record_error`, with their source chains.
    pub errors: Vec<String>,
    pub duration: Duration,
}

impl FinishedSpan {
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        attribute::find(&self.attributes, key)
    }
}

/// One recorded value.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub instrument: String,
    pub kind: InstrumentKind,
    pub value: i64,
    pub attributes: Vec<KeyValue>,
}

impl Measurement {
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        attribute::find(&self.attributes, key)
    }
}

#[derive(Default)]
struct Recorded {
    spans: Vec<FinishedSpan>,
    measurements: Vec<Measurement>,
    instruments: HashMap<String, InstrumentKind>,
}

/// Tracer and meter that record into shared memory.
#[derive(Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ended spans, oldest first.
    pub fn spans(&self) -> Vec<FinishedSpan> {
        self.lock().spans.clone()
    }

    /// Every measurement, oldest first.
    pub fn measurements(&self) -> Vec<Measurement> {
        self.lock().measurements.clone()
    }

    /// Measurements recorded against the instrument called `name`.
    pub fn measurements_for(&self, name: &str) -> Vec<Measurement> {
        self.lock()
            .measurements
            .iter()
            .filter(|m| m.instrument == name)
            .cloned()
            .collect()
    }

    /// Forget everything recorded so far. Instruments stay registered.
    pub fn clear(&self) {
        let mut recorded = self.lock();
        recorded.spans.clear();
        recorded.measurements.clear();
    }
}

impl Tracer for RecordingSink {
    fn start_span(
        &self,
        name: String,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
    ) -> Box<dyn Span> {
        Box::new(RecordingSpan {
            sink: self.clone(),
            started: Instant::now(),
            data: Some(FinishedSpan {
                name,
                kind,
                attributes,
                status: SpanStatus::Unset,
                errors: Vec::new(),
                duration: Duration::ZERO,
            }),
        })
    }
}

impl Meter for RecordingSink {
    fn instrument(&self, descriptor: InstrumentDescriptor) -> TelemetryResult<Arc<dyn Instrument>> {
        let mut recorded = self.lock();
        let existing = *recorded
            .instruments
            .entry(descriptor.name.clone())
            .or_insert(descriptor.kind);
        if existing != descriptor.kind {
            return Err(TelemetryError::InstrumentConflict {
                name: descriptor.name,
                existing: existing.as_str(),
                requested: descriptor.kind.as_str(),
            });
        }
        Ok(Arc::new(RecordingInstrument {
            descriptor,
            sink: self.clone(),
        }))
    }
}

struct RecordingSpan {
    sink: RecordingSink,
    started: Instant,
    /// Taken on `end`.
    data: Option<FinishedSpan>,
}

impl Span for RecordingSpan {
    fn set_attributes(&mut self, attributes: Vec<KeyValue>) {
        if let Some(data) = self.data.as_mut() {
            data.attributes.extend(attributes);
        }
    }

    fn record_error(&mut self, error: &(dyn Error + 'static)) {
        if let Some(data) = self.data.as_mut() {
            data.errors.push(error_chain(error));
        }
    }

    fn set_status(&mut self, status: SpanStatus) {
        if let Some(data) = self.data.as_mut() {
            data.status = status;
        }
    }

    fn end(&mut self) {
        if let Some(mut data) = self.data.take() {
            data.duration = self.started.elapsed();
            self.sink.lock().spans.push(data);
        }
    }
}

struct RecordingInstrument {
    descriptor: InstrumentDescriptor,
    sink: RecordingSink,
}

impl Instrument for RecordingInstrument {
    fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    fn record(&self, value: i64, attributes: &[KeyValue]) {
        self.sink.lock().measurements.push(Measurement {
            instrument: self.descriptor.name.clone(),
            kind: self.descriptor.kind,
            value,
            attributes: attributes.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_span_lifecycle() {
        let sink = RecordingSink::new();
        let mut span = sink.start_span(
            "GET http://example.com/".to_string(),
            SpanKind::Client,
            vec![KeyValue::string("http.method", "GET")],
        );
        span.set_attributes(vec![KeyValue::i64("http.status_code", 503)]);
        span.set_status(SpanStatus::error("HTTP status code 503"));
        assert!(sink.spans().is_empty(), "span is only visible once ended");

        span.end();
        span.end();
        span.set_status(SpanStatus::Ok);

        let spans = sink.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, SpanKind::Client);
        assert_eq!(
            spans[0].attribute("http.status_code").and_then(Value::as_i64),
            Some(503)
        );
        assert_eq!(spans[0].status, SpanStatus::error("HTTP status code 503"));
    }

    #[test]
    fn records_measurements_per_instrument() {
        let sink = RecordingSink::new();
        let counter = sink.u64_counter("errors", "1", "Errors").unwrap();
        let histogram = sink.i64_histogram("duration", "ms", "Duration").unwrap();

        counter.record(1, &[KeyValue::string("name", "a")]);
        histogram.record(42, &[]);
        counter.record(1, &[KeyValue::string("name", "b")]);

        assert_eq!(sink.measurements().len(), 3);
        let errors = sink.measurements_for("errors");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].attribute("name").and_then(Value::as_str), Some("b"));
        assert_eq!(sink.measurements_for("duration")[0].value, 42);

        sink.clear();
        assert!(sink.measurements().is_empty());
    }

    #[test]
    fn conflicting_instrument_kind_rejected() {
        let sink = RecordingSink::new();
        sink.u64_counter("status", "1", "").unwrap();
        assert!(matches!(
            sink.i64_up_down_counter("status", "1", ""),
            Err(TelemetryError::InstrumentConflict { .. })
        ));
        // Same kind again is fine.
        sink.u64_counter("status", "1", "").unwrap();
    }
}
