//! HTTP probe.
//!
//! Issues one body-less request per execution and reports it following
//! the HTTP client span conventions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, StatusCode, Uri, header};
use http_body_util::{BodyExt, Empty};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, info, warn};

use status_core::{HttpProbeSpec, ProbeConfig};
use status_telemetry::{
    Instrument, KeyValue, SpanGuard, SpanKind, SpanStatus, Telemetry, Tracer, error_chain,
    label_name, validate_key,
};

use crate::encoder::{HTTP_STATUS_CLASSES, StatusClassEncoder, http_status_class};
use crate::error::{BoxError, ConstructionError, ProbeError};
use crate::probe::{PLUGIN_NAME_KEY, Probe, ProbeOutcome, ProbeResult};

/// Probe type tag.
pub const PLUGIN_NAME: &str = "http";

// ── Instruments ────────────────────────────────────────────────────

pub const DURATION_METRIC: &str = "status.http.duration";
pub const ERROR_METRIC: &str = "status.http.error";
pub const STATUS_METRIC: &str = "status.http.status";

// ── Attribute keys ─────────────────────────────────────────────────

pub const NAME_KEY: &str = "status.http.name";
pub const DURATION_KEY: &str = "status.http.duration_ms";
pub const STATUS_CLASS_KEY: &str = "http.status_class";
pub const ERROR_MESSAGE_KEY: &str = "error.message";
pub const HTTP_METHOD: &str = "http.method";
pub const HTTP_SCHEME: &str = "http.scheme";
pub const HTTP_URL: &str = "http.url";
pub const HTTP_STATUS_CODE: &str = "http.status_code";
pub const NET_PEER_NAME: &str = "net.peer.name";
pub const NET_PEER_PORT: &str = "net.peer.port";

/// Keys the probe sets itself, plus the histogram bucket label.
const RESERVED_KEYS: &[&str] = &[
    PLUGIN_NAME_KEY,
    NAME_KEY,
    DURATION_KEY,
    STATUS_CLASS_KEY,
    ERROR_MESSAGE_KEY,
    HTTP_METHOD,
    HTTP_SCHEME,
    HTTP_URL,
    HTTP_STATUS_CODE,
    NET_PEER_NAME,
    NET_PEER_PORT,
    "le",
];

const USER_AGENT: &str = concat!("statusd/", env!("CARGO_PKG_VERSION"));

const HTTP_STATUS_CLASS_COUNT: usize = HTTP_STATUS_CLASSES.len();

type HttpsClient = Client<HttpsConnector<HttpConnector>, Empty<Bytes>>;

/// Checks one URL and reports the outcome as a span plus metrics.
pub struct HttpProbe {
    config: ProbeConfig,
    method: Method,
    url: Uri,
    /// `<METHOD> <url>`.
    span_name: String,
    /// Probe tag, request target, and configured extras.
    span_attributes: Vec<KeyValue>,
    /// Configured extras, attached to every measurement too.
    extra_attributes: Vec<KeyValue>,
    timeout: Option<Duration>,
    client: HttpsClient,
    tracer: Arc<dyn Tracer>,
    duration: Arc<dyn Instrument>,
    errors: Arc<dyn Instrument>,
    status: Arc<dyn Instrument>,
    /// Read-modify-write per execution; overlapping executions serialize here.
    encoder: Mutex<StatusClassEncoder<HTTP_STATUS_CLASS_COUNT>>,
}

impl HttpProbe {
    /// Build a probe; URL, method, and attribute keys are checked here.
    pub fn new(
        config: ProbeConfig,
        spec: HttpProbeSpec,
        telemetry: &Telemetry,
    ) -> Result<Self, ConstructionError> {
        if config.name.trim().is_empty() {
            return Err(ConstructionError::EmptyName);
        }

        let method = Method::from_bytes(spec.method.trim().as_bytes())
            .map_err(|_| ConstructionError::InvalidMethod(spec.method.clone()))?;
        let url = parse_target(&spec.url)?;

        // Every exported label name must stay unique within a series.
        let mut label_names: HashMap<String, &str> = RESERVED_KEYS
            .iter()
            .map(|key| (label_name(key), *key))
            .collect();
        let mut extra_attributes = Vec::with_capacity(spec.attributes.len());
        for (key, value) in &spec.attributes {
            validate_key(key).map_err(|_| ConstructionError::InvalidAttributeKey(key.clone()))?;
            if RESERVED_KEYS.contains(&key.as_str()) {
                return Err(ConstructionError::ReservedAttributeKey(key.clone()));
            }
            if let Some(other) = label_names.insert(label_name(key), key.as_str()) {
                return Err(ConstructionError::AttributeKeyCollision {
                    key: key.clone(),
                    other: other.to_string(),
                });
            }
            extra_attributes.push(KeyValue::string(key, value));
        }

        let scheme = url.scheme_str().unwrap_or("http");
        let host = url.host().unwrap_or_default();
        let port = url
            .port_u16()
            .unwrap_or(if scheme == "https" { 443 } else { 80 });
        let mut span_attributes = vec![
            KeyValue::string(PLUGIN_NAME_KEY, PLUGIN_NAME),
            KeyValue::string(HTTP_METHOD, method.as_str()),
            KeyValue::string(HTTP_SCHEME, scheme),
            KeyValue::string(HTTP_URL, url.to_string()),
            KeyValue::string(NET_PEER_NAME, host),
            KeyValue::i64(NET_PEER_PORT, i64::from(port)),
        ];
        span_attributes.extend(extra_attributes.iter().cloned());

        let meter = telemetry.meter();
        let duration = meter
            .i64_histogram(DURATION_METRIC, "ms", "Duration of the HTTP request")
            .map_err(|source| ConstructionError::Instrument {
                name: DURATION_METRIC,
                source,
            })?;
        let errors = meter
            .u64_counter(ERROR_METRIC, "1", "Error of the HTTP request")
            .map_err(|source| ConstructionError::Instrument {
                name: ERROR_METRIC,
                source,
            })?;
        let status = meter
            .i64_up_down_counter(STATUS_METRIC, "1", "Status of the HTTP request")
            .map_err(|source| ConstructionError::Instrument {
                name: STATUS_METRIC,
                source,
            })?;

        Ok(Self {
            span_name: format!("{method} {url}"),
            config,
            method,
            url,
            span_attributes,
            extra_attributes,
            timeout: spec.timeout,
            client: build_client()?,
            tracer: telemetry.tracer().clone(),
            duration,
            errors,
            status,
            encoder: Mutex::new(StatusClassEncoder::new()),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// Name and target labels, then `extra`, then the configured extras.
    fn labels(&self, extra: Vec<KeyValue>) -> Vec<KeyValue> {
        let mut labels = Vec::with_capacity(2 + extra.len() + self.extra_attributes.len());
        labels.push(KeyValue::string(NAME_KEY, &self.config.name));
        labels.push(KeyValue::string(HTTP_URL, self.url.to_string()));
        labels.extend(extra);
        labels.extend(self.extra_attributes.iter().cloned());
        labels
    }

    fn build_request(&self) -> Result<Request<Empty<Bytes>>, http::Error> {
        Request::builder()
            .method(self.method.clone())
            .uri(self.url.clone())
            .header(header::USER_AGENT, USER_AGENT)
            .body(Empty::new())
    }

    /// Send the request and read the whole body.
    ///
    /// A body read failure does not fail the exchange; it is handed back
    /// for the span.
    async fn exchange(
        &self,
        request: Request<Empty<Bytes>>,
    ) -> Result<(StatusCode, Option<BoxError>), ProbeError> {
        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ProbeError::transport("doing HTTP client", e))?;
        let status = response.status();
        let body_error = response
            .into_body()
            .collect()
            .await
            .err()
            .map(BoxError::from);
        Ok((status, body_error))
    }

    /// Report a transport failure and hand the error back for returning.
    fn fail(&self, span: &mut SpanGuard, error: ProbeError) -> ProbeError {
        let message = error_chain(&error);
        warn!(
            plugin = PLUGIN_NAME,
            probe = %self.config.name,
            url = %self.url,
            error = %message,
            "probe failed"
        );
        span.record_error(&error);
        span.set_status(SpanStatus::Error(message.clone()));
        self.errors.record(
            1,
            &self.labels(vec![KeyValue::string(ERROR_MESSAGE_KEY, message)]),
        );
        error
    }

    /// Feed the encoder and emit one delta per class bucket.
    ///
    /// The lock is held while recording so that overlapping executions of
    /// this probe never interleave their batches.
    fn record_status_class(&self, code: u16, class: Option<usize>) {
        let mut encoder = self.encoder.lock().unwrap_or_else(PoisonError::into_inner);
        let deltas = encoder.observe(class);
        for (bucket, delta) in HTTP_STATUS_CLASSES.iter().zip(deltas) {
            self.status.record(
                delta,
                &self.labels(vec![
                    KeyValue::i64(HTTP_STATUS_CODE, i64::from(code)),
                    KeyValue::string(HTTP_METHOD, self.method.as_str()),
                    KeyValue::string(STATUS_CLASS_KEY, *bucket),
                ]),
            );
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn config(&self) -> &ProbeConfig {
        &self.config
    }

    fn kind(&self) -> &'static str {
        PLUGIN_NAME
    }

    async fn execute(&self) -> Result<ProbeResult, ProbeError> {
        let start = Instant::now();
        let mut span = SpanGuard::start(
            self.tracer.as_ref(),
            self.span_name.clone(),
            SpanKind::Client,
            self.span_attributes.clone(),
        );

        let request = match self.build_request() {
            Ok(request) => request,
            Err(e) => {
                return Err(self.fail(&mut span, ProbeError::transport("creating HTTP request", e)));
            }
        };

        let exchanged = match self.timeout {
            Some(after) => tokio::time::timeout(after, self.exchange(request))
                .await
                .unwrap_or(Err(ProbeError::Timeout {
                    context: "doing HTTP client",
                    after,
                })),
            None => self.exchange(request).await,
        };
        let (status, body_error) = match exchanged {
            Ok(exchanged) => exchanged,
            Err(e) => return Err(self.fail(&mut span, e)),
        };

        let elapsed = start.elapsed();
        let elapsed_ms = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
        let code = status.as_u16();
        let class = http_status_class(code);

        info!(
            plugin = PLUGIN_NAME,
            probe = %self.config.name,
            url = %self.url,
            status = code,
            duration_ms = elapsed_ms,
            "probe completed"
        );

        span.set_attributes(vec![
            KeyValue::i64(HTTP_STATUS_CODE, i64::from(code)),
            KeyValue::i64(DURATION_KEY, elapsed_ms),
        ]);
        let outcome = if class.is_none() {
            span.set_status(SpanStatus::error(format!(
                "unclassified HTTP status code {code}"
            )));
            ProbeOutcome::HttpError
        } else if code >= 400 {
            span.set_status(SpanStatus::error(format!("HTTP status code {code}")));
            ProbeOutcome::HttpError
        } else {
            ProbeOutcome::Success
        };

        self.duration.record(elapsed_ms, &self.labels(Vec::new()));
        self.record_status_class(code, class);

        if let Some(source) = body_error {
            let error = ProbeError::transport("closing HTTP response body", source);
            debug!(probe = %self.config.name, error = %error_chain(&error), "response body not fully read");
            span.record_error(&error);
        }

        Ok(ProbeResult {
            outcome,
            elapsed,
            status_code: Some(code),
        })
    }
}

/// Parse and check an absolute http(s) URL.
fn parse_target(raw: &str) -> Result<Uri, ConstructionError> {
    let url: Uri = raw
        .trim()
        .parse()
        .map_err(|source| ConstructionError::UrlParse {
            url: raw.to_string(),
            source,
        })?;

    let Some(scheme) = url.scheme_str() else {
        return Err(ConstructionError::RelativeUrl(raw.to_string()));
    };
    if !matches!(scheme, "http" | "https") {
        return Err(ConstructionError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: scheme.to_string(),
        });
    }
    if url.host().is_none_or(str::is_empty) {
        return Err(ConstructionError::RelativeUrl(raw.to_string()));
    }
    Ok(url)
}

/// HTTP/1 client that speaks both plain HTTP and TLS with webpki roots.
fn build_client() -> Result<HttpsClient, ConstructionError> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(roots)
    .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);

    let https = HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    Ok(Client::builder(TokioExecutor::new()).build(https))
}
