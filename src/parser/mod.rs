//! GC log normalization.
//!
//! Detects the collector family from format signatures, dispatches to the
//! unified (JDK 11+) or legacy (JDK 8) line parser, merges multi-file
//! input, and assigns sequence ids in ordering-key order.

pub mod legacy;
pub mod unified;

use crate::models::{CollectorType, GcEvent};
use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

/// Flag set on events triggered by an allocation failure.
pub const ALLOCATION_FAILURE_FLAG: &str = "allocation_failure";

static ALLOCATION_FAILURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Allocation\s+Failure|to-space\s+exhausted|evacuation\s+failure").unwrap()
});

static UNIFIED_STAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\[(?P<ts>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}[.,]\d{3}[+-]\d{4})\]|^\[(?P<up>\d+[.,]\d+)s\]",
    )
    .unwrap()
});

static LEGACY_STAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<ts>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}[.,]\d{3}[+-]\d{4}):\s*|^(?P<up>\d+[.,]\d+):\s*",
    )
    .unwrap()
});

static JVM_FLAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-XX:[+\-]?\w+(?:=\S+)?").unwrap());

/// Header lines scanned for the JVM banner and flags.
const HEADER_SCAN_LINES: usize = 50;

/// Fatal normalization failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// No known collector signature matched the input.
    #[error("unsupported GC log format: no known collector signature matched{0}")]
    UnsupportedFormat(String),
}

/// Result of normalizing one or more log buffers.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub collector_type: CollectorType,
    pub events: Vec<GcEvent>,
    /// Records that looked like GC output but matched no known grammar.
    pub skipped_records: usize,
    /// JVM version banner from the log header, when present.
    pub jvm_version: Option<String>,
    /// `-XX:` flags found in the log header, in first-seen order.
    pub gc_flags: Vec<String>,
}

/// Detect the collector family from format signatures in the buffer.
pub fn detect_collector(content: &str) -> Option<CollectorType> {
    let lower = content.to_lowercase();

    if lower.contains("using g1") || lower.contains("g1 heap") || lower.contains("[gc,heap") {
        Some(CollectorType::G1)
    } else if lower.contains("using z garbage collector") || lower.contains("zgc") {
        Some(CollectorType::Zgc)
    } else if lower.contains("shenandoah") {
        Some(CollectorType::Shenandoah)
    } else if lower.contains("using parallel") || lower.contains("psyounggen") {
        Some(CollectorType::Parallel)
    } else if lower.contains("cms") || lower.contains("concurrent mark sweep") {
        Some(CollectorType::Cms)
    } else if lower.contains("using serial") || lower.contains("defnew") {
        Some(CollectorType::Serial)
    } else {
        None
    }
}

/// Normalize a single log buffer.
pub fn parse_log(content: &str) -> Result<ParseOutcome, ParseError> {
    parse_logs(&[("log", content)])
}

/// Normalize one or more named log buffers into one event stream.
///
/// Each buffer must carry a known collector signature. Events from all
/// buffers are merged, re-sorted by the ordering key (timestamp when every
/// event has one, else uptime, else input order), and numbered.
pub fn parse_logs(inputs: &[(&str, &str)]) -> Result<ParseOutcome, ParseError> {
    let mut collector: Option<CollectorType> = None;

    for (name, content) in inputs {
        match detect_collector(content) {
            Some(detected) => {
                if collector.is_none() {
                    collector = Some(detected);
                } else if collector != Some(detected) {
                    warn!(
                        "collector mismatch in {}: {} (run uses {})",
                        name,
                        detected,
                        collector.unwrap()
                    );
                }
            }
            None => {
                return Err(ParseError::UnsupportedFormat(format!(" in {}", name)));
            }
        }
    }

    let collector = collector
        .ok_or_else(|| ParseError::UnsupportedFormat(String::new()))?;

    let mut events = Vec::new();
    let mut skipped_records = 0;
    let mut jvm_version: Option<String> = None;
    let mut gc_flags: Vec<String> = Vec::new();

    for (name, content) in inputs {
        let (version, flags) = extract_jvm_info(content);
        if jvm_version.is_none() {
            jvm_version = version;
        }
        for flag in flags {
            if !gc_flags.contains(&flag) {
                gc_flags.push(flag);
            }
        }

        let (mut parsed, skipped) = if collector.is_unified() {
            unified::parse(content, collector)
        } else {
            legacy::parse(content, collector)
        };
        debug!(
            "parsed {}: {} events, {} skipped records",
            name,
            parsed.len(),
            skipped
        );
        events.append(&mut parsed);
        skipped_records += skipped;
    }

    sort_and_number(&mut events);

    Ok(ParseOutcome {
        collector_type: collector,
        events,
        skipped_records,
        jvm_version,
        gc_flags,
    })
}

/// Scan the log header for the JVM version banner and `-XX:` flags.
fn extract_jvm_info(content: &str) -> (Option<String>, Vec<String>) {
    let mut version = None;
    let mut flags = Vec::new();

    for line in content.lines().take(HEADER_SCAN_LINES) {
        if line.contains("VM") || line.to_lowercase().contains("version") {
            version = Some(line.trim().to_string());
        }
        if line.contains("-XX:") {
            for m in JVM_FLAG.find_iter(line) {
                flags.push(m.as_str().to_string());
            }
        }
    }

    (version, flags)
}

/// Sort merged events by the ordering key and assign sequence ids.
fn sort_and_number(events: &mut [GcEvent]) {
    if !events.is_empty() {
        if events.iter().all(|e| e.timestamp.is_some()) {
            events.sort_by_key(|e| e.timestamp);
        } else if events.iter().all(|e| e.uptime_seconds.is_some()) {
            events.sort_by(|a, b| {
                a.uptime_seconds
                    .partial_cmp(&b.uptime_seconds)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        // Otherwise keep file-then-line order.
    }

    for (idx, event) in events.iter_mut().enumerate() {
        event.gc_id = idx as u64;
        event.heap_reclaimed_mb = (event.heap_before_mb - event.heap_after_mb).max(0.0);
    }
}

/// Strip timestamp/uptime prefixes from a line.
///
/// Unified lines may stack both a date stamp and an uptime stamp; both are
/// captured. Returns the remainder of the line after all stamps.
pub(crate) fn split_stamp(line: &str) -> (Option<DateTime<FixedOffset>>, Option<f64>, &str) {
    let mut timestamp = None;
    let mut uptime = None;
    let mut rest = line;

    loop {
        let Some(caps) = UNIFIED_STAMP.captures(rest) else {
            break;
        };
        if let Some(ts) = caps.name("ts") {
            timestamp = timestamp.or_else(|| parse_wall_clock(ts.as_str()));
        } else if let Some(up) = caps.name("up") {
            uptime = uptime.or_else(|| up.as_str().replace(',', ".").parse::<f64>().ok());
        }
        rest = &rest[caps.get(0).unwrap().end()..];
    }

    if timestamp.is_none() && uptime.is_none() {
        if let Some(caps) = LEGACY_STAMP.captures(rest) {
            if let Some(ts) = caps.name("ts") {
                timestamp = parse_wall_clock(ts.as_str());
            } else if let Some(up) = caps.name("up") {
                uptime = up.as_str().replace(',', ".").parse::<f64>().ok();
            }
            if timestamp.is_some() || uptime.is_some() {
                rest = &rest[caps.get(0).unwrap().end()..];
            }
        }
    }

    (timestamp, uptime, rest)
}

fn parse_wall_clock(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(&raw.replace(',', "."), "%Y-%m-%dT%H:%M:%S%.3f%z").ok()
}

/// Convert a K/M/G-suffixed size to MB.
pub(crate) fn normalize_size(value: f64, unit: &str) -> f64 {
    match unit.to_ascii_uppercase().as_str() {
        "K" => value / 1024.0,
        "G" => value * 1024.0,
        _ => value,
    }
}

pub(crate) fn has_allocation_failure(line: &str) -> bool {
    ALLOCATION_FAILURE.is_match(line)
}
