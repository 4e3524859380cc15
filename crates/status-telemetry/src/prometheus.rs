//! Prometheus text exposition format.
//!
//! Renders registry snapshots into the Prometheus text exposition format
//! for scraping by a Prometheus server or compatible agent.

use std::fmt::Write;

use crate::attribute::label_name;
use crate::metrics::InstrumentKind;
use crate::registry::{DEFAULT_BUCKETS, MetricFamily, PointValue};

/// Render metric families into Prometheus text format.
///
/// Counters become `counter`, up/down counters `gauge`, histograms
/// `histogram` with cumulative `_bucket` series.
pub fn render_prometheus(families: &[MetricFamily]) -> String {
    let mut out = String::new();

    for family in families {
        let name = metric_name(&family.descriptor.name, &family.descriptor.unit);
        let kind = match family.descriptor.kind {
            InstrumentKind::Counter => "counter",
            InstrumentKind::UpDownCounter => "gauge",
            InstrumentKind::Histogram => "histogram",
        };

        let _ = writeln!(
            out,
            "# HELP {name} {}",
            escape_help(&family.descriptor.description)
        );
        let _ = writeln!(out, "# TYPE {name} {kind}");

        for point in &family.points {
            match &point.value {
                PointValue::Sum(value) => {
                    let _ = writeln!(out, "{name}{} {value}", labels(&point.labels, None));
                }
                PointValue::Histogram {
                    count,
                    sum,
                    bucket_counts,
                } => {
                    let mut cumulative = 0u64;
                    for (bound, n) in DEFAULT_BUCKETS.iter().zip(bucket_counts) {
                        cumulative += n;
                        let le = bound.to_string();
                        let _ = writeln!(
                            out,
                            "{name}_bucket{} {cumulative}",
                            labels(&point.labels, Some(&le))
                        );
                    }
                    let _ = writeln!(
                        out,
                        "{name}_bucket{} {count}",
                        labels(&point.labels, Some("+Inf"))
                    );
                    let _ = writeln!(out, "{name}_sum{} {sum}", labels(&point.labels, None));
                    let _ = writeln!(out, "{name}_count{} {count}", labels(&point.labels, None));
                }
            }
        }
    }

    out
}

/// `status.http.duration` + `ms` → `status_http_duration_ms`.
fn metric_name(name: &str, unit: &str) -> String {
    let mut out = label_name(name);
    let unit = match unit {
        "ms" => "ms",
        "s" => "seconds",
        "By" => "bytes",
        _ => "",
    };
    if !unit.is_empty() && !out.ends_with(unit) {
        out.push('_');
        out.push_str(unit);
    }
    out
}

fn labels(labels: &[(String, String)], le: Option<&str>) -> String {
    if labels.is_empty() && le.is_none() {
        return String::new();
    }
    let mut parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", label_name(k), escape_value(v)))
        .collect();
    if let Some(le) = le {
        parts.push(format!("le=\"{le}\""));
    }
    format!("{{{}}}", parts.join(","))
}

fn escape_value(v: &str) -> String {
    v.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}
