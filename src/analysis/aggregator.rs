//! Statistics aggregation.
//!
//! Pure function of the event stream: the same `GcEvent` slice always
//! produces the same `Statistics`.

use crate::models::{GcEvent, PauseDistribution, Statistics};

/// Compute aggregate statistics for one run.
///
/// Pause statistics cover events with `pause_ms > 0` only; they are
/// absent (not zero) when no such event exists. Throughput and frequency
/// need an observed time window and are absent without one.
pub fn compute_statistics(events: &[GcEvent]) -> Statistics {
    let mut stats = Statistics {
        total_gc_events: events.len(),
        ..Default::default()
    };

    if events.is_empty() {
        return stats;
    }

    let mut pause_times: Vec<f64> = Vec::new();
    let mut distribution = PauseDistribution::default();

    for event in events {
        if event.pause_ms > 0.0 {
            pause_times.push(event.pause_ms);
            distribution.record(event.pause_ms);
        }
        if event.is_full_gc {
            stats.full_gc_count += 1;
        }
        if event.is_concurrent {
            stats.concurrent_gc_count += 1;
        }
    }

    stats.pause_events = pause_times.len();
    stats.pause_distribution = distribution;

    let total_pause_ms: f64 = pause_times.iter().sum();
    stats.total_pause_time_ms = total_pause_ms;
    stats.total_pause_time_seconds = total_pause_ms / 1000.0;

    if !pause_times.is_empty() {
        let mut sorted = pause_times.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        stats.min_pause_ms = sorted.first().copied();
        stats.max_pause_ms = sorted.last().copied();
        stats.avg_pause_ms = Some(total_pause_ms / sorted.len() as f64);
        stats.median_pause_ms = Some(sorted[sorted.len() / 2]);
        stats.p95_pause_ms = Some(percentile(&sorted, 0.95));
        stats.p99_pause_ms = Some(percentile(&sorted, 0.99));
    }

    let heap_points: Vec<(f64, f64)> = events
        .iter()
        .filter(|e| e.heap_total_mb > 0.0)
        .map(|e| (e.heap_after_mb, e.heap_total_mb))
        .collect();

    if !heap_points.is_empty() {
        stats.max_heap_mb = heap_points
            .iter()
            .map(|(_, total)| *total)
            .fold(None, fold_max);
        stats.max_heap_used_mb = heap_points
            .iter()
            .map(|(used, _)| *used)
            .fold(None, fold_max);
        stats.avg_heap_used_mb = Some(
            heap_points.iter().map(|(used, _)| used).sum::<f64>() / heap_points.len() as f64,
        );
    }

    if let Some(window) = observed_window_seconds(events) {
        if window > 0.0 {
            stats.throughput_percent =
                Some(((window - stats.total_pause_time_seconds) / window) * 100.0);
            if stats.pause_events > 0 {
                stats.gc_frequency_per_minute =
                    Some((stats.pause_events as f64 / window) * 60.0);
            }
        }
    }

    stats
}

/// The elapsed window of the run, from timestamps when every event has
/// one, else from the highest uptime. `None` without a time axis.
pub fn observed_window_seconds(events: &[GcEvent]) -> Option<f64> {
    if events.is_empty() {
        return None;
    }

    if events.iter().all(|e| e.timestamp.is_some()) {
        let first = events.iter().filter_map(|e| e.timestamp).min()?;
        let last = events.iter().filter_map(|e| e.timestamp).max()?;
        let millis = (last - first).num_milliseconds();
        return Some(millis as f64 / 1000.0);
    }

    events
        .iter()
        .filter_map(|e| e.uptime_seconds)
        .fold(None, fold_max)
}

fn fold_max(acc: Option<f64>, value: f64) -> Option<f64> {
    match acc {
        Some(current) if current >= value => Some(current),
        _ => Some(value),
    }
}

fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.len() <= 1 {
        return sorted.last().copied().unwrap_or(0.0);
    }
    let idx = ((sorted.len() as f64) * pct) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CollectorType;

    fn pause_event(id: u64, uptime: f64, pause_ms: f64, full: bool) -> GcEvent {
        GcEvent {
            gc_id: id,
            native_id: Some(id),
            timestamp: None,
            uptime_seconds: Some(uptime),
            gc_type: CollectorType::G1.to_string(),
            pause_type: if full { "Full" } else { "Young" }.to_string(),
            cause: None,
            pause_ms,
            concurrent_ms: 0.0,
            heap_before_mb: 0.0,
            heap_after_mb: 0.0,
            heap_total_mb: 0.0,
            heap_reclaimed_mb: 0.0,
            is_full_gc: full,
            is_concurrent: false,
            flags: Vec::new(),
        }
    }

    #[test]
    fn test_empty_events_give_empty_statistics() {
        let stats = compute_statistics(&[]);
        assert_eq!(stats.total_gc_events, 0);
        assert!(stats.max_pause_ms.is_none());
        assert!(stats.avg_pause_ms.is_none());
        assert!(stats.throughput_percent.is_none());
    }

    #[test]
    fn test_pause_stats_absent_without_pauses() {
        let mut e = pause_event(0, 1.0, 0.0, false);
        e.is_concurrent = true;
        let stats = compute_statistics(&[e]);
        assert_eq!(stats.total_gc_events, 1);
        assert_eq!(stats.pause_events, 0);
        assert!(stats.max_pause_ms.is_none());
        assert!(stats.avg_pause_ms.is_none());
        assert_eq!(stats.pause_distribution.total(), 0);
    }

    #[test]
    fn test_distribution_partitions_pause_events() {
        let events = vec![
            pause_event(0, 1.0, 5.0, false),
            pause_event(1, 2.0, 45.0, false),
            pause_event(2, 3.0, 0.0, false),
            pause_event(3, 4.0, 650.0, true),
            pause_event(4, 5.0, 1500.0, true),
        ];
        let stats = compute_statistics(&events);
        assert_eq!(stats.pause_events, 4);
        assert_eq!(stats.pause_distribution.total(), stats.pause_events);
    }

    #[test]
    fn test_scenario_two_event_g1_log() {
        let mut young = pause_event(0, 1.0, 12.0, false);
        young.heap_before_mb = 24.0;
        young.heap_after_mb = 4.0;
        young.heap_total_mb = 256.0;
        let mut full = pause_event(1, 2.0, 650.0, true);
        full.heap_before_mb = 200.0;
        full.heap_after_mb = 40.0;
        full.heap_total_mb = 256.0;

        let stats = compute_statistics(&[young, full]);
        assert_eq!(stats.full_gc_count, 1);
        assert_eq!(stats.max_pause_ms, Some(650.0));
        assert_eq!(stats.pause_distribution.up_to_50ms, 1);
        assert_eq!(stats.pause_distribution.up_to_1s, 1);
        assert_eq!(stats.max_heap_mb, Some(256.0));
    }

    #[test]
    fn test_throughput_over_uptime_window() {
        // 1000ms paused over a 100s window: 99% throughput.
        let events = vec![
            pause_event(0, 10.0, 400.0, false),
            pause_event(1, 100.0, 600.0, false),
        ];
        let stats = compute_statistics(&events);
        let tp = stats.throughput_percent.unwrap();
        assert!((tp - 99.0).abs() < 1e-9);
        let freq = stats.gc_frequency_per_minute.unwrap();
        assert!((freq - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_same_input_same_statistics() {
        let events = vec![
            pause_event(0, 1.0, 10.0, false),
            pause_event(1, 2.0, 20.0, false),
        ];
        let a = compute_statistics(&events);
        let b = compute_statistics(&events);
        assert_eq!(a.avg_pause_ms, b.avg_pause_ms);
        assert_eq!(a.pause_distribution, b.pause_distribution);
    }
}
