//! Tracer that reports ended spans as `tracing` events.

use std::error::Error;
use std::time::Instant;

use tracing::{info, warn};

use crate::attribute::KeyValue;
use crate::trace::{Span, SpanKind, SpanStatus, Tracer, error_chain};

/// Emits one log event per ended span.
#[derive(Debug, Clone)]
pub struct LogTracer {
    service: String,
}

impl LogTracer {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl Tracer for LogTracer {
    fn start_span(
        &self,
        name: String,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
    ) -> Box<dyn Span> {
        Box::new(LogSpan {
            service: self.service.clone(),
            name,
            kind,
            attributes,
            status: SpanStatus::Unset,
            errors: Vec::new(),
            started: Instant::now(),
            ended: false,
        })
    }
}

struct LogSpan {
    service: String,
    name: String,
    kind: SpanKind,
    attributes: Vec<KeyValue>,
    status: SpanStatus,
    errors: Vec<String>,
    started: Instant,
    ended: bool,
}

impl LogSpan {
    fn rendered_attributes(&self) -> String {
        self.attributes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Span for LogSpan {
    fn set_attributes(&mut self, attributes: Vec<KeyValue>) {
        if !self.ended {
            self.attributes.extend(attributes);
        }
    }

    fn record_error(&mut self, error: &(dyn Error + 'static)) {
        if !self.ended {
            self.errors.push(error_chain(error));
        }
    }

    fn set_status(&mut self, status: SpanStatus) {
        if !self.ended {
            self.status = status;
        }
    }

    fn end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        let duration_ms = self.started.elapsed().as_millis() as u64;
        let attributes = self.rendered_attributes();
        if self.status.is_error() {
            warn!(
                service = %self.service,
                span = %self.name,
                kind = %self.kind,
                duration_ms,
                status = %self.status,
                errors = ?self.errors,
                %attributes,
                "span ended"
            );
        } else {
            info!(
                service = %self.service,
                span = %self.name,
                kind = %self.kind,
                duration_ms,
                status = %self.status,
                %attributes,
                "span ended"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::SpanGuard;

    #[test]
    fn span_lifecycle_is_idempotent() {
        let tracer = LogTracer::new("statusd");
        let mut guard = SpanGuard::start(
            &tracer,
            "GET http://example.com/".to_string(),
            SpanKind::Client,
            vec![KeyValue::string("http.method", "GET")],
        );
        guard.set_attributes(vec![KeyValue::i64("http.status_code", 404)]);
        guard.set_status(SpanStatus::error("HTTP status code 404"));
        guard.end();
    }

    #[test]
    fn ended_span_ignores_updates() {
        let tracer = LogTracer::new("statusd");
        let mut span = tracer.start_span("op".to_string(), SpanKind::Internal, vec![]);
        span.end();
        span.set_attributes(vec![KeyValue::bool("late", true)]);
        span.set_status(SpanStatus::Ok);
        span.end();
    }
}
