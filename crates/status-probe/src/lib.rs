//! status-probe: probes and the status-class encoder.
//!
//! A probe checks one external target per execution and reports the
//! outcome as one span plus metric measurements on the [`Telemetry`] it
//! was built with. The scheduler only sees the [`Probe`] trait.
//!
//! # Architecture
//!
//! ```text
//! HttpProbe::execute()
//!   ├── SpanGuard "<METHOD> <url>" (client kind, ended on every path)
//!   ├── transport failure → span error + status.http.error += 1 → Err(ProbeError)
//!   └── response
//!       ├── span http.status_code (error status when >= 400)
//!       ├── status.http.duration histogram record
//!       └── StatusClassEncoder (per-probe lock) → one status.http.status
//!           delta per class bucket
//! ```
//!
//! # Transport failure vs. unhealthy target
//!
//! Only failures of the probing machinery (DNS, connect, TLS, timeout)
//! are returned as errors. A 4xx/5xx response is a successful execution
//! that reports an unhealthy target through the span status and the
//! status-class series.
//!
//! [`Telemetry`]: status_telemetry::Telemetry

pub mod encoder;
pub mod error;
pub mod http;
pub mod probe;

pub use crate::encoder::{HTTP_STATUS_CLASSES, StatusClassEncoder, http_status_class};
pub use crate::error::{BoxError, ConstructionError, ProbeError};
pub use crate::http::HttpProbe;
pub use crate::probe::{Probe, ProbeOutcome, ProbeResult};
