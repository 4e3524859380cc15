//! Span capability.

use std::error::Error;
use std::fmt;

use crate::attribute::KeyValue;

/// The role of the traced operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Internal,
    /// Outbound call to a remote service.
    Client,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Internal => "internal",
            SpanKind::Client => "client",
        }
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded on a span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error(String),
}

impl SpanStatus {
    pub fn error(message: impl Into<String>) -> Self {
        SpanStatus::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SpanStatus::Error(_))
    }
}

impl fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanStatus::Unset => f.write_str("unset"),
            SpanStatus::Ok => f.write_str("ok"),
            SpanStatus::Error(message) => write!(f, "error: {message}"),
        }
    }
}

/// A single traced operation.
///
/// Calls after `end` are ignored; calling `end` twice is harmless.
pub trait Span: Send {
    fn set_attributes(&mut self, attributes: Vec<KeyValue>);

    fn record_error(&mut self, error: &(dyn Error + 'static));

    fn set_status(&mut self, status: SpanStatus);

    fn end(&mut self);
}

/// Starts spans. Shared by every probe, so it must be safe for concurrent use.
pub trait Tracer: Send + Sync {
    fn start_span(&self, name: String, kind: SpanKind, attributes: Vec<KeyValue>)
    -> Box<dyn Span>;
}

/// Ends the wrapped span when dropped, on every exit path.
pub struct SpanGuard {
    span: Box<dyn Span>,
}

impl SpanGuard {
    pub fn new(span: Box<dyn Span>) -> Self {
        Self { span }
    }

    /// Start a span on `tracer` and guard it.
    pub fn start(
        tracer: &dyn Tracer,
        name: String,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
    ) -> Self {
        Self::new(tracer.start_span(name, kind, attributes))
    }

    pub fn set_attributes(&mut self, attributes: Vec<KeyValue>) {
        self.span.set_attributes(attributes);
    }

    pub fn record_error(&mut self, error: &(dyn Error + 'static)) {
        self.span.record_error(error);
    }

    pub fn set_status(&mut self, status: SpanStatus) {
        self.span.set_status(status);
    }

    pub fn end(mut self) {
        self.span.end();
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        self.span.end();
    }
}

/// Render an error and all of its sources as `outer: inner: root`.
pub fn error_chain(error: &(dyn Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // Some wrappers already include their source in their own message.
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
