//! Legacy JDK 8 `-XX:+PrintGCDetails` parser (Parallel, CMS, Serial).

use crate::models::{CollectorType, GcEvent};
use crate::parser::{has_allocation_failure, split_stamp, ALLOCATION_FAILURE_FLAG};
use once_cell::sync::Lazy;
use regex::Regex;

static JDK8_GC_EVENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[(?P<gtype>GC|Full GC)\s*(?:\((?P<cause>[^)]+)\))?\s*(?:(?P<before>\d+)K->(?P<after>\d+)K\((?P<total>\d+)K\))?,?\s*(?:(?P<pause>\d+(?:\.\d+)?)\s*(?P<punit>secs|ms))?\]",
    )
    .unwrap()
});

static GENERATION_GC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[(?P<gtype>PSYoungGen|ParOldGen|DefNew|Tenured|Full GC):\s+(?P<before>\d+)K->(?P<after>\d+)K\((?P<total>\d+)K\)",
    )
    .unwrap()
});

// Overall pause at the tail of a detail line, e.g. ", 0.0123456 secs]".
static TRAILING_PAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*(?P<secs>\d+(?:\.\d+)?)\s*secs\]\s*$").unwrap());

static CMS_PHASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[(?P<phase>CMS-initial-mark|CMS-concurrent-mark|CMS-concurrent-preclean|CMS-concurrent-abortable-preclean|CMS-concurrent-sweep|CMS-concurrent-reset)(?::\s*(?P<dur>\d+(?:\.\d+)?)(?:/\d+(?:\.\d+)?)?\s*secs)?",
    )
    .unwrap()
});

/// Parse a legacy-format buffer into events plus a skipped-record count.
pub(crate) fn parse(content: &str, collector: CollectorType) -> (Vec<GcEvent>, usize) {
    let mut events = Vec::new();
    let mut skipped = 0;

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let (timestamp, uptime, _rest) = split_stamp(line);

        if let Some(caps) = JDK8_GC_EVENT.captures(line) {
            let gc_type = caps["gtype"].to_string();
            let is_full_gc = gc_type.to_lowercase().contains("full");

            let mut pause_ms = 0.0;
            if let Some(pause) = caps.name("pause") {
                pause_ms = pause.as_str().parse().unwrap_or(0.0);
                if caps.name("punit").map(|u| u.as_str()) == Some("secs") {
                    pause_ms *= 1000.0;
                }
            }

            let mut event = GcEvent {
                gc_id: 0,
                native_id: None,
                timestamp,
                uptime_seconds: uptime,
                gc_type,
                pause_type: String::new(),
                cause: caps.name("cause").map(|c| c.as_str().to_string()),
                pause_ms,
                concurrent_ms: 0.0,
                heap_before_mb: kb_field(&caps, "before"),
                heap_after_mb: kb_field(&caps, "after"),
                heap_total_mb: kb_field(&caps, "total"),
                heap_reclaimed_mb: 0.0,
                is_full_gc,
                is_concurrent: false,
                flags: Vec::new(),
            };
            if has_allocation_failure(line) {
                event.flags.push(ALLOCATION_FAILURE_FLAG.to_string());
            }
            events.push(event);
            continue;
        }

        if let Some(caps) = GENERATION_GC.captures(line) {
            let gc_type = caps["gtype"].to_string();
            let lower = gc_type.to_lowercase();
            let is_full_gc =
                lower.contains("full") || lower.contains("old") || lower.contains("tenured");

            // The overall stop-the-world time trails the generation detail.
            let pause_ms = TRAILING_PAUSE
                .captures(line)
                .and_then(|p| p["secs"].parse::<f64>().ok())
                .map(|s| s * 1000.0)
                .unwrap_or(0.0);

            let mut event = GcEvent {
                gc_id: 0,
                native_id: None,
                timestamp,
                uptime_seconds: uptime,
                gc_type,
                pause_type: String::new(),
                cause: None,
                pause_ms,
                concurrent_ms: 0.0,
                heap_before_mb: kb_field(&caps, "before"),
                heap_after_mb: kb_field(&caps, "after"),
                heap_total_mb: kb_field(&caps, "total"),
                heap_reclaimed_mb: 0.0,
                is_full_gc,
                is_concurrent: false,
                flags: Vec::new(),
            };
            if has_allocation_failure(line) {
                event.flags.push(ALLOCATION_FAILURE_FLAG.to_string());
            }
            events.push(event);
            continue;
        }

        if collector == CollectorType::Cms {
            if let Some(caps) = CMS_PHASE.captures(line) {
                let phase = caps["phase"].to_string();
                let is_concurrent = phase.contains("concurrent");
                let duration_ms = caps
                    .name("dur")
                    .and_then(|d| d.as_str().parse::<f64>().ok())
                    .map(|s| s * 1000.0)
                    .unwrap_or(0.0);

                events.push(GcEvent {
                    gc_id: 0,
                    native_id: None,
                    timestamp,
                    uptime_seconds: uptime,
                    gc_type: collector.to_string(),
                    pause_type: phase,
                    cause: None,
                    pause_ms: if is_concurrent { 0.0 } else { duration_ms },
                    concurrent_ms: if is_concurrent { duration_ms } else { 0.0 },
                    heap_before_mb: 0.0,
                    heap_after_mb: 0.0,
                    heap_total_mb: 0.0,
                    heap_reclaimed_mb: 0.0,
                    is_full_gc: false,
                    is_concurrent,
                    flags: Vec::new(),
                });
                continue;
            }
        }

        if line.contains("[GC") || line.contains("[Full GC") {
            skipped += 1;
        }
    }

    (events, skipped)
}

fn kb_field(caps: &regex::Captures<'_>, name: &str) -> f64 {
    caps.name(name)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|kb| kb / 1024.0)
        .unwrap_or(0.0)
}
