//! Rule-based issue detection.
//!
//! Each rule is an independent function of `(&[GcEvent], &Statistics)`
//! returning zero or one `Issue`. The engine runs every rule and collects
//! the non-empty results; rule order does not affect the output set.

use crate::models::{GcEvent, Issue, IssueSeverity, Statistics};
use crate::parser::ALLOCATION_FAILURE_FLAG;

/// Pauses above this are reported as an issue.
const LONG_PAUSE_THRESHOLD_MS: f64 = 500.0;
/// Full-GC counts above this are reported; above 2x it is critical.
const FULL_GC_WARNING_COUNT: usize = 5;
const FULL_GC_CRITICAL_COUNT: usize = 10;
/// Minimum observed window before frequency/throughput rules apply.
const MIN_WINDOW_SECONDS: f64 = 60.0;
const GC_FREQUENCY_THRESHOLD_PER_MIN: f64 = 10.0;
const THROUGHPUT_WARNING_PERCENT: f64 = 95.0;
const THROUGHPUT_CRITICAL_PERCENT: f64 = 90.0;
/// Post-GC utilization averaged over the most recent heap-reporting events.
const HEAP_UTILIZATION_WINDOW: usize = 10;
const HEAP_UTILIZATION_THRESHOLD_PERCENT: f64 = 85.0;

type Rule = fn(&[GcEvent], &Statistics) -> Option<Issue>;

const RULES: &[Rule] = &[
    long_pause_rule,
    frequent_full_gc_rule,
    allocation_failure_rule,
    high_gc_frequency_rule,
    low_throughput_rule,
    high_heap_utilization_rule,
];

/// Run every rule against the frozen run data.
pub fn detect_issues(events: &[GcEvent], statistics: &Statistics) -> Vec<Issue> {
    RULES
        .iter()
        .filter_map(|rule| rule(events, statistics))
        .collect()
}

/// Any stop-the-world pause above 500 ms.
pub fn long_pause_rule(events: &[GcEvent], _stats: &Statistics) -> Option<Issue> {
    let long_pauses: Vec<&GcEvent> = events
        .iter()
        .filter(|e| e.pause_ms > LONG_PAUSE_THRESHOLD_MS)
        .collect();
    if long_pauses.is_empty() {
        return None;
    }

    let max_pause = long_pauses
        .iter()
        .map(|e| e.pause_ms)
        .fold(0.0_f64, f64::max);

    Some(Issue {
        issue_type: "long_pause".to_string(),
        severity: IssueSeverity::Critical,
        count: Some(long_pauses.len()),
        description: format!(
            "Detected {} GC pauses > {:.0}ms (max: {:.1}ms)",
            long_pauses.len(),
            LONG_PAUSE_THRESHOLD_MS,
            max_pause
        ),
    })
}

/// More full collections than a healthy steady state should show.
pub fn frequent_full_gc_rule(_events: &[GcEvent], stats: &Statistics) -> Option<Issue> {
    if stats.full_gc_count <= FULL_GC_WARNING_COUNT {
        return None;
    }

    let severity = if stats.full_gc_count > FULL_GC_CRITICAL_COUNT {
        IssueSeverity::Critical
    } else {
        IssueSeverity::Warning
    };

    Some(Issue {
        issue_type: "frequent_full_gc".to_string(),
        severity,
        count: Some(stats.full_gc_count),
        description: format!(
            "Detected {} Full GC events - may indicate memory pressure",
            stats.full_gc_count
        ),
    })
}

/// Any collection triggered by an allocation failure.
pub fn allocation_failure_rule(events: &[GcEvent], _stats: &Statistics) -> Option<Issue> {
    let failures = events
        .iter()
        .filter(|e| e.has_flag(ALLOCATION_FAILURE_FLAG))
        .count();
    if failures == 0 {
        return None;
    }

    Some(Issue {
        issue_type: "allocation_failure".to_string(),
        severity: IssueSeverity::Critical,
        count: Some(failures),
        description: format!(
            "Detected {} allocation failures - heap may be too small",
            failures
        ),
    })
}

pub fn high_gc_frequency_rule(events: &[GcEvent], stats: &Statistics) -> Option<Issue> {
    let window = crate::analysis::observed_window_seconds(events)?;
    if window <= MIN_WINDOW_SECONDS {
        return None;
    }
    let per_minute = stats.gc_frequency_per_minute?;
    if per_minute <= GC_FREQUENCY_THRESHOLD_PER_MIN {
        return None;
    }

    Some(Issue {
        issue_type: "high_gc_frequency".to_string(),
        severity: IssueSeverity::Warning,
        count: Some(stats.pause_events),
        description: format!("High GC frequency: {:.1} GCs/minute", per_minute),
    })
}

pub fn low_throughput_rule(events: &[GcEvent], stats: &Statistics) -> Option<Issue> {
    let window = crate::analysis::observed_window_seconds(events)?;
    if window <= MIN_WINDOW_SECONDS || stats.pause_events == 0 {
        return None;
    }
    let throughput = stats.throughput_percent?;
    if throughput >= THROUGHPUT_WARNING_PERCENT {
        return None;
    }

    let severity = if throughput < THROUGHPUT_CRITICAL_PERCENT {
        IssueSeverity::Critical
    } else {
        IssueSeverity::Warning
    };

    Some(Issue {
        issue_type: "low_throughput".to_string(),
        severity,
        count: None,
        description: format!(
            "Low application throughput: {:.1}% (target: >{:.0}%)",
            throughput, THROUGHPUT_WARNING_PERCENT
        ),
    })
}

/// Recent post-GC occupancy persistently near the heap ceiling.
pub fn high_heap_utilization_rule(events: &[GcEvent], _stats: &Statistics) -> Option<Issue> {
    let heap_events: Vec<&GcEvent> = events
        .iter()
        .filter(|e| e.heap_after_mb > 0.0 && e.heap_total_mb > 0.0)
        .collect();
    if heap_events.len() <= HEAP_UTILIZATION_WINDOW {
        return None;
    }

    let recent = &heap_events[heap_events.len() - HEAP_UTILIZATION_WINDOW..];
    let avg_util = recent
        .iter()
        .map(|e| e.heap_after_mb / e.heap_total_mb * 100.0)
        .sum::<f64>()
        / recent.len() as f64;

    if avg_util <= HEAP_UTILIZATION_THRESHOLD_PERCENT {
        return None;
    }

    Some(Issue {
        issue_type: "high_heap_utilization".to_string(),
        severity: IssueSeverity::Warning,
        count: None,
        description: format!(
            "High heap utilization: {:.1}% average in recent GCs",
            avg_util
        ),
    })
}
