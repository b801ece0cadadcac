//! JDK 11+ unified logging parser (G1, ZGC, Shenandoah).
//!
//! Record-oriented: pause lines emit events, heap occupancy lines attach
//! to the pending pause event with the same native gc id, concurrent
//! phase lines emit non-pausing events.

use crate::models::{CollectorType, GcEvent};
use crate::parser::{has_allocation_failure, normalize_size, split_stamp, ALLOCATION_FAILURE_FLAG};
use once_cell::sync::Lazy;
use regex::Regex;

static UNIFIED_PAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"GC\((?P<id>\d+)\)\s+Pause\s+(?P<ptype>Young|Mixed|Full|Remark|Cleanup|Init Mark|Final Mark|Init Update Refs|Final Update Refs|Degenerated GC|Mark Start|Mark End|Relocate Start|[A-Za-z]+)(?:\s+\((?P<cause>[^)]+)\))?.*?\s(?P<ms>\d+(?:\.\d+)?)ms\s*$",
    )
    .unwrap()
});

static UNIFIED_HEAP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"GC\((?P<id>\d+)\).*?(?P<before>\d+)(?P<bu>[KMG])->(?P<after>\d+)(?P<au>[KMG])\((?P<total>\d+)(?P<tu>[KMG])\)",
    )
    .unwrap()
});

static UNIFIED_CONCURRENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"GC\((?P<id>\d+)\)\s+Concurrent\s+(?P<phase>\w+(?:\s+\w+)*)\s+(?P<ms>\d+(?:\.\d+)?)ms")
        .unwrap()
});

/// Parse a unified-format buffer into events plus a skipped-record count.
pub(crate) fn parse(content: &str, collector: CollectorType) -> (Vec<GcEvent>, usize) {
    let mut events: Vec<GcEvent> = Vec::new();
    let mut skipped = 0;
    // Index and native id of the pause event still awaiting heap occupancy.
    let mut pending: Option<(usize, u64)> = None;

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let (timestamp, uptime, _rest) = split_stamp(line);

        if let Some(caps) = UNIFIED_PAUSE.captures(line) {
            let native_id = caps["id"].parse::<u64>().unwrap_or(0);
            let pause_type = caps["ptype"].to_string();
            let is_full_gc = pause_type.to_lowercase().contains("full");

            let mut event = GcEvent {
                gc_id: 0,
                native_id: Some(native_id),
                timestamp,
                uptime_seconds: uptime,
                gc_type: collector.to_string(),
                pause_type,
                cause: caps.name("cause").map(|c| c.as_str().to_string()),
                pause_ms: caps["ms"].parse().unwrap_or(0.0),
                concurrent_ms: 0.0,
                heap_before_mb: 0.0,
                heap_after_mb: 0.0,
                heap_total_mb: 0.0,
                heap_reclaimed_mb: 0.0,
                is_full_gc,
                is_concurrent: false,
                flags: Vec::new(),
            };
            if has_allocation_failure(line) {
                event.flags.push(ALLOCATION_FAILURE_FLAG.to_string());
            }
            // Heap occupancy is usually inline on the pause line itself.
            if let Some(heap) = UNIFIED_HEAP.captures(line) {
                apply_heap(&mut event, &heap);
                events.push(event);
                pending = None;
            } else {
                events.push(event);
                pending = Some((events.len() - 1, native_id));
            }
            continue;
        }

        if let Some(heap) = UNIFIED_HEAP.captures(line) {
            let heap_id = heap["id"].parse::<u64>().unwrap_or(0);
            match pending.take() {
                Some((idx, native_id)) if native_id == heap_id => {
                    apply_heap(&mut events[idx], &heap);
                }
                // Out-of-order heap line: drop it and clear the pending
                // slot so a later stray line cannot attach to this event.
                _ => {}
            }
            continue;
        }

        if let Some(caps) = UNIFIED_CONCURRENT.captures(line) {
            events.push(GcEvent {
                gc_id: 0,
                native_id: caps["id"].parse::<u64>().ok(),
                timestamp,
                uptime_seconds: uptime,
                gc_type: collector.to_string(),
                pause_type: format!("Concurrent {}", &caps["phase"]),
                cause: None,
                pause_ms: 0.0,
                concurrent_ms: caps["ms"].parse().unwrap_or(0.0),
                heap_before_mb: 0.0,
                heap_after_mb: 0.0,
                heap_total_mb: 0.0,
                heap_reclaimed_mb: 0.0,
                is_full_gc: false,
                is_concurrent: true,
                flags: Vec::new(),
            });
            continue;
        }

        // A GC record that matched none of the grammars.
        if line.contains("GC(")
            && (line.contains("Pause") || line.contains("Concurrent") || line.contains("->"))
        {
            skipped += 1;
        }
    }

    (events, skipped)
}

fn apply_heap(event: &mut GcEvent, caps: &regex::Captures<'_>) {
    event.heap_before_mb = normalize_size(
        caps["before"].parse().unwrap_or(0.0),
        &caps["bu"],
    );
    event.heap_after_mb = normalize_size(
        caps["after"].parse().unwrap_or(0.0),
        &caps["au"],
    );
    event.heap_total_mb = normalize_size(
        caps["total"].parse().unwrap_or(0.0),
        &caps["tu"],
    );
}
