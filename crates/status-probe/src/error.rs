//! Probe error types.

use std::time::Duration;

use thiserror::Error;

use status_telemetry::TelemetryError;

/// Boxed error from the HTTP stack.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The probe could not be built; fatal at startup.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("probe name must not be empty")]
    EmptyName,

    #[error("parsing URL {url:?}: {source}")]
    UrlParse {
        url: String,
        #[source]
        source: http::uri::InvalidUri,
    },

    #[error("URL {0:?} must be absolute with a scheme and host")]
    RelativeUrl(String),

    #[error("unsupported scheme {scheme:?} in URL {url:?}")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),

    #[error("invalid attribute key {0:?}")]
    InvalidAttributeKey(String),

    #[error("attribute key {0:?} is set by the probe itself")]
    ReservedAttributeKey(String),

    #[error("attribute key {key:?} exports under the same label name as {other:?}")]
    AttributeKeyCollision { key: String, other: String },

    #[error("creating {name} instrument: {source}")]
    Instrument {
        name: &'static str,
        #[source]
        source: TelemetryError,
    },

    #[error("configuring TLS: {0}")]
    Tls(#[from] rustls::Error),
}

/// An execution could not reach a response.
///
/// Recorded on the span and the error counter, then returned to the
/// scheduler. The next scheduled firing still happens.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{context}: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("{context}: timed out after {after:?}")]
    Timeout {
        context: &'static str,
        after: Duration,
    },
}

impl ProbeError {
    pub fn transport(context: &'static str, source: impl Into<BoxError>) -> Self {
        ProbeError::Transport {
            context,
            source: source.into(),
        }
    }

    /// The step that failed, e.g. "doing HTTP client".
    pub fn context(&self) -> &'static str {
        match self {
            ProbeError::Transport { context, .. } | ProbeError::Timeout { context, .. } => context,
        }
    }
}
