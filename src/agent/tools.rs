//! Investigation tools for the GC analysis agent.
//!
//! Tools are read-only queries over the frozen analysis results. Each
//! returns a `ToolOutput` carrying observation text plus any structured
//! findings; the agent loop owns the trace and folds those findings in.

use crate::models::{
    CollectorType, GcEvent, Issue, IssueSeverity, Priority, Recommendation, Statistics,
};
use crate::parser::ALLOCATION_FAILURE_FLAG;
use serde_json::Value;
use tracing::debug;

const LONG_PAUSE_DEFAULT_THRESHOLD_MS: f64 = 200.0;
const LONG_PAUSE_ROWS: usize = 10;
const FULL_GC_ROWS: usize = 5;
const ALLOCATION_FAILURE_ROWS: usize = 5;
const PHASE_ROWS: usize = 8;
// Heap trend over first third vs last third of post-GC occupancy.
const TREND_WARNING_PERCENT: f64 = 20.0;
const TREND_CRITICAL_PERCENT: f64 = 50.0;
// Pause outliers beyond three standard deviations.
const SPIKE_Z_SCORE: f64 = 3.0;
const INCREASING_PAUSE_FACTOR: f64 = 1.5;

/// A tool the agent can invoke, described for the system prompt.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: &'static str,
}

/// Result of one tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub text: String,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<Recommendation>,
}

impl ToolOutput {
    fn text(text: String) -> Self {
        Self {
            text,
            ..Default::default()
        }
    }
}

/// Read-only view of one analyzed log, shared by every tool.
pub struct ToolRegistry<'a> {
    collector: CollectorType,
    events: &'a [GcEvent],
    statistics: &'a Statistics,
    issues: &'a [Issue],
}

impl<'a> ToolRegistry<'a> {
    pub fn new(
        collector: CollectorType,
        events: &'a [GcEvent],
        statistics: &'a Statistics,
        issues: &'a [Issue],
    ) -> Self {
        Self {
            collector,
            events,
            statistics,
            issues,
        }
    }

    /// Dispatch a named tool. Unknown names return an observation naming
    /// the valid tools, so the model can recover on the next step.
    pub fn dispatch(&self, name: &str, input: &Value) -> ToolOutput {
        debug!("Executing tool {} with input {}", name, input);

        match name {
            "get_summary" => self.get_summary(),
            "get_long_pauses" => self.get_long_pauses(input),
            "get_full_gcs" => self.get_full_gcs(),
            "get_allocation_failures" => self.get_allocation_failures(),
            "analyze_heap_trend" => self.analyze_heap_trend(),
            "analyze_pause_pattern" => self.analyze_pause_pattern(),
            "compare_gc_phases" => self.compare_gc_phases(),
            "get_tuning_recommendations" => self.get_tuning_recommendations(),
            _ => {
                let names: Vec<&str> = tool_definitions()
                    .iter()
                    .map(|t| t.name)
                    .chain(std::iter::once("final_answer"))
                    .collect();
                ToolOutput::text(format!(
                    "Unknown tool: {}. Available tools: {}",
                    name,
                    names.join(", ")
                ))
            }
        }
    }

    fn get_summary(&self) -> ToolOutput {
        let s = self.statistics;
        ToolOutput::text(format!(
            "GC Summary for {}:\n\
             - Total GC Events: {}\n\
             - Pause Events: {}\n\
             - Full GC Count: {}\n\
             - Total Pause Time: {:.2}s\n\
             - Throughput: {}\n\
             - Min Pause: {}\n\
             - Max Pause: {}\n\
             - Avg Pause: {}\n\
             - P95 Pause: {}\n\
             - P99 Pause: {}\n\
             - Max Heap: {}\n\
             - GC Frequency: {}\n\
             - Known Issues: {}",
            self.collector,
            s.total_gc_events,
            s.pause_events,
            s.full_gc_count,
            s.total_pause_time_seconds,
            fmt_pct(s.throughput_percent),
            fmt_ms(s.min_pause_ms),
            fmt_ms(s.max_pause_ms),
            fmt_ms(s.avg_pause_ms),
            fmt_ms(s.p95_pause_ms),
            fmt_ms(s.p99_pause_ms),
            fmt_mb(s.max_heap_mb),
            fmt_per_min(s.gc_frequency_per_minute),
            self.issues.len()
        ))
    }

    fn get_long_pauses(&self, input: &Value) -> ToolOutput {
        let threshold = input
            .get("threshold_ms")
            .and_then(parse_number)
            .unwrap_or(LONG_PAUSE_DEFAULT_THRESHOLD_MS);

        let long_pauses: Vec<&GcEvent> = self
            .events
            .iter()
            .filter(|e| e.pause_ms > threshold)
            .collect();

        if long_pauses.is_empty() {
            return ToolOutput::text(format!("No pauses found longer than {}ms", threshold));
        }

        let mut text = format!("Found {} pauses > {}ms:\n", long_pauses.len(), threshold);
        for e in long_pauses.iter().take(LONG_PAUSE_ROWS) {
            text.push_str(&format!("- {}: {:.1}ms", e.phase_label(), e.pause_ms));
            if let Some(cause) = &e.cause {
                text.push_str(&format!(" (cause: {})", cause));
            }
            if e.heap_before_mb > 0.0 && e.heap_after_mb > 0.0 {
                text.push_str(&format!(
                    ", heap: {:.0}MB -> {:.0}MB",
                    e.heap_before_mb, e.heap_after_mb
                ));
            }
            text.push('\n');
        }
        if long_pauses.len() > LONG_PAUSE_ROWS {
            text.push_str(&format!(
                "... and {} more\n",
                long_pauses.len() - LONG_PAUSE_ROWS
            ));
        }

        ToolOutput::text(text)
    }

    fn get_full_gcs(&self) -> ToolOutput {
        let full_gcs: Vec<&GcEvent> = self.events.iter().filter(|e| e.is_full_gc).collect();

        if full_gcs.is_empty() {
            return ToolOutput::text("No Full GC events found - this is good!".to_string());
        }

        let total_pause: f64 = full_gcs.iter().map(|e| e.pause_ms).sum();
        let avg_pause = total_pause / full_gcs.len() as f64;

        let mut text = format!("Found {} Full GC events:\n", full_gcs.len());
        text.push_str(&format!(
            "- Total pause time from Full GCs: {:.1}ms ({:.2}s)\n",
            total_pause,
            total_pause / 1000.0
        ));
        text.push_str(&format!("- Average Full GC pause: {:.1}ms\n\nDetails:\n", avg_pause));

        for e in full_gcs.iter().take(FULL_GC_ROWS) {
            text.push_str(&format!("- {:.1}ms", e.pause_ms));
            if let Some(cause) = &e.cause {
                text.push_str(&format!(" (cause: {})", cause));
            }
            if e.heap_before_mb > 0.0 && e.heap_after_mb > 0.0 {
                text.push_str(&format!(", reclaimed: {:.0}MB", e.heap_reclaimed_mb));
            }
            text.push('\n');
        }
        if full_gcs.len() > FULL_GC_ROWS {
            text.push_str(&format!("... and {} more\n", full_gcs.len() - FULL_GC_ROWS));
        }

        ToolOutput::text(text)
    }

    fn get_allocation_failures(&self) -> ToolOutput {
        let failures: Vec<&GcEvent> = self
            .events
            .iter()
            .filter(|e| e.has_flag(ALLOCATION_FAILURE_FLAG))
            .collect();

        if failures.is_empty() {
            return ToolOutput::text(
                "No allocation failures detected - heap sizing appears adequate.".to_string(),
            );
        }

        let mut text = format!("Found {} allocation failures:\n", failures.len());
        text.push_str(
            "This indicates the heap is too small or there's excessive allocation pressure.\n\n",
        );
        for e in failures.iter().take(ALLOCATION_FAILURE_ROWS) {
            text.push_str(&format!("- {}: {:.1}ms", e.phase_label(), e.pause_ms));
            if e.heap_before_mb > 0.0 {
                text.push_str(&format!(", heap was {:.0}MB", e.heap_before_mb));
            }
            text.push('\n');
        }

        ToolOutput::text(text)
    }

    fn analyze_heap_trend(&self) -> ToolOutput {
        let after_values: Vec<f64> = self
            .events
            .iter()
            .filter(|e| e.heap_after_mb > 0.0)
            .map(|e| e.heap_after_mb)
            .collect();

        if after_values.len() < 3 {
            return ToolOutput::text("Not enough heap data points to analyze trend.".to_string());
        }

        let third = after_values.len() / 3;
        let first_avg = after_values[..third].iter().sum::<f64>() / third as f64;
        let last_avg =
            after_values[after_values.len() - third..].iter().sum::<f64>() / third as f64;

        let trend_pct = if first_avg > 0.0 {
            (last_avg - first_avg) / first_avg * 100.0
        } else {
            0.0
        };

        let mut text = format!(
            "Heap Trend Analysis:\n\
             - Early GCs: avg {:.0}MB after GC\n\
             - Recent GCs: avg {:.0}MB after GC\n\
             - Trend: {:+.1}%\n\n",
            first_avg, last_avg, trend_pct
        );
        let mut output = ToolOutput::default();

        if trend_pct > TREND_CRITICAL_PERCENT {
            text.push_str("CRITICAL: Strong upward trend in heap usage - likely memory leak!\n");
            output.issues.push(Issue {
                issue_type: "memory_leak_likely".to_string(),
                severity: IssueSeverity::Critical,
                count: None,
                description: format!("Post-GC heap grew {:+.1}% over the log window", trend_pct),
            });
        } else if trend_pct > TREND_WARNING_PERCENT {
            text.push_str(
                "CONCERN: Heap usage after GC is trending upward significantly.\n\
                 This could indicate a memory leak or insufficient heap size.\n",
            );
            output.issues.push(Issue {
                issue_type: "memory_leak_suspected".to_string(),
                severity: IssueSeverity::Warning,
                count: None,
                description: format!("Post-GC heap grew {:+.1}% over the log window", trend_pct),
            });
        } else {
            text.push_str("Heap usage appears stable - no obvious memory leak.\n");
        }

        output.text = text;
        output
    }

    fn analyze_pause_pattern(&self) -> ToolOutput {
        let pauses: Vec<f64> = self
            .events
            .iter()
            .filter(|e| e.pause_ms > 0.0)
            .map(|e| e.pause_ms)
            .collect();

        if pauses.is_empty() {
            return ToolOutput::text("No pause data to analyze.".to_string());
        }

        let mean = pauses.iter().sum::<f64>() / pauses.len() as f64;
        let variance =
            pauses.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / pauses.len() as f64;
        let std_dev = variance.sqrt();

        let mut text = "Pause Pattern Analysis:\n".to_string();
        let mut output = ToolOutput::default();

        let spikes: Vec<f64> = if std_dev > 0.0 {
            pauses
                .iter()
                .copied()
                .filter(|p| (p - mean) / std_dev > SPIKE_Z_SCORE)
                .collect()
        } else {
            Vec::new()
        };

        if !spikes.is_empty() {
            let max_spike = spikes.iter().copied().fold(0.0_f64, f64::max);
            text.push_str(&format!(
                "Significant pause spikes detected: {} pauses beyond 3 standard deviations (max {:.1}ms vs avg {:.1}ms)\n",
                spikes.len(),
                max_spike,
                mean
            ));
            output.issues.push(Issue {
                issue_type: "pause_spikes".to_string(),
                severity: IssueSeverity::Warning,
                count: Some(spikes.len()),
                description: format!(
                    "Pause outliers up to {:.1}ms against a {:.1}ms average",
                    max_spike, mean
                ),
            });
        }

        let dist = &self.statistics.pause_distribution;
        let long_pauses = dist.up_to_1s + dist.over_1s;
        if long_pauses > 0 {
            let total = dist.total().max(1);
            let pct = long_pauses as f64 / total as f64 * 100.0;
            text.push_str(&format!(
                "- {} pauses ({:.1}%) are >= 500ms\n",
                long_pauses, pct
            ));
            if pct > 5.0 {
                text.push_str("  This is concerning for latency-sensitive applications.\n");
            }
        }

        if pauses.len() > 10 {
            let half = pauses.len() / 2;
            let first_avg = pauses[..half].iter().sum::<f64>() / half as f64;
            let second_avg =
                pauses[half..].iter().sum::<f64>() / (pauses.len() - half) as f64;

            if second_avg > first_avg * INCREASING_PAUSE_FACTOR {
                text.push_str(&format!(
                    "Pause times increasing over time: {:.1}ms -> {:.1}ms\n",
                    first_avg, second_avg
                ));
                output.issues.push(Issue {
                    issue_type: "increasing_pauses".to_string(),
                    severity: IssueSeverity::Warning,
                    count: None,
                    description: format!(
                        "Average pause rose from {:.1}ms to {:.1}ms between log halves",
                        first_avg, second_avg
                    ),
                });
            }
        }

        output.text = text;
        output
    }

    fn compare_gc_phases(&self) -> ToolOutput {
        // Insertion-ordered so equal totals keep first-seen order.
        let mut phases: Vec<(String, usize, f64, f64)> = Vec::new();

        for e in self.events {
            let label = e.phase_label().to_string();
            match phases.iter_mut().find(|(name, ..)| *name == label) {
                Some((_, count, total_ms, max_ms)) => {
                    *count += 1;
                    *total_ms += e.pause_ms;
                    *max_ms = max_ms.max(e.pause_ms);
                }
                None => phases.push((label, 1, e.pause_ms, e.pause_ms)),
            }
        }

        if phases.is_empty() {
            return ToolOutput::text("No phase data available.".to_string());
        }

        phases.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

        let mut text = "GC Phase Comparison:\n".to_string();
        for (name, count, total_ms, max_ms) in phases.iter().take(PHASE_ROWS) {
            let avg = total_ms / *count as f64;
            text.push_str(&format!(
                "- {}: {} events, total {:.1}ms, avg {:.1}ms, max {:.1}ms\n",
                name, count, total_ms, avg, max_ms
            ));
        }

        let (worst_name, _, worst_total, _) = &phases[0];
        text.push_str(&format!(
            "\nMost time-consuming phase: {} ({:.1}ms total)\n",
            worst_name, worst_total
        ));

        ToolOutput::text(text)
    }

    fn get_tuning_recommendations(&self) -> ToolOutput {
        let stats = self.statistics;
        let mut recommendations = Vec::new();

        match self.collector {
            CollectorType::G1 => {
                if stats.max_pause_ms.unwrap_or(0.0) > 200.0 {
                    recommendations.push(Recommendation {
                        flag: "-XX:MaxGCPauseMillis=200".to_string(),
                        reason: "Set target max pause time to 200ms".to_string(),
                        priority: Priority::High,
                    });
                }
                if stats.full_gc_count > 0 {
                    recommendations.push(Recommendation {
                        flag: "-XX:G1HeapRegionSize=<size>".to_string(),
                        reason: "Adjust region size (try 16m or 32m for large heaps)".to_string(),
                        priority: Priority::Medium,
                    });
                    recommendations.push(Recommendation {
                        flag: "-XX:InitiatingHeapOccupancyPercent=35".to_string(),
                        reason: "Start marking earlier to avoid Full GCs".to_string(),
                        priority: Priority::High,
                    });
                }
            }
            CollectorType::Zgc => {
                recommendations.push(Recommendation {
                    flag: "-XX:+UseZGC -XX:+ZGenerational".to_string(),
                    reason: "Use generational ZGC for better performance (JDK 21+)".to_string(),
                    priority: Priority::Medium,
                });
            }
            CollectorType::Parallel => {
                if stats.throughput_percent.unwrap_or(100.0) < 95.0 {
                    recommendations.push(Recommendation {
                        flag: "-XX:GCTimeRatio=19".to_string(),
                        reason: "Target 95% throughput (1/(1+19) = 5% GC time)".to_string(),
                        priority: Priority::Medium,
                    });
                }
            }
            _ => {}
        }

        let max_heap = stats.max_heap_mb.unwrap_or(1.0);
        if stats.max_heap_used_mb.unwrap_or(0.0) > max_heap * 0.85 {
            recommendations.push(Recommendation {
                flag: "-Xmx<larger>".to_string(),
                reason: "Heap utilization is >85%, consider increasing max heap".to_string(),
                priority: Priority::High,
            });
        }

        if self.issues.iter().any(|i| i.issue_type == "allocation_failure") {
            recommendations.push(Recommendation {
                flag: "-Xms<same as Xmx>".to_string(),
                reason: "Set initial heap equal to max to avoid resizing".to_string(),
                priority: Priority::High,
            });
        }

        if stats.gc_frequency_per_minute.unwrap_or(0.0) > 10.0 {
            recommendations.push(Recommendation {
                flag: "-XX:NewRatio=2".to_string(),
                reason: "Adjust young/old generation ratio to reduce GC frequency".to_string(),
                priority: Priority::Medium,
            });
        }

        let mut text = format!("Tuning Recommendations for {}:\n\n", self.collector);
        for rec in &recommendations {
            text.push_str(&format!("[{}] {}\n   Reason: {}\n\n", rec.priority, rec.flag, rec.reason));
        }
        if recommendations.is_empty() {
            text.push_str("No specific tuning recommendations - GC appears well-configured.\n");
        }

        ToolOutput {
            text,
            issues: Vec::new(),
            recommendations,
        }
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn fmt_ms(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}ms", v),
        None => "n/a".to_string(),
    }
}

fn fmt_mb(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.0}MB", v),
        None => "n/a".to_string(),
    }
}

fn fmt_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => "n/a".to_string(),
    }
}

fn fmt_per_min(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}/min", v),
        None => "n/a".to_string(),
    }
}

/// Tool list for the system prompt. `final_answer` is handled by the
/// agent loop itself, not the registry.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_summary",
            description:
                "Get overall GC statistics summary including pause times, throughput, and heap usage",
            parameters: "{}",
        },
        ToolDefinition {
            name: "get_long_pauses",
            description: "Get all GC pauses longer than a specified threshold in milliseconds",
            parameters: r#"{"threshold_ms": "minimum pause time in milliseconds (default: 200)"}"#,
        },
        ToolDefinition {
            name: "get_full_gcs",
            description: "Get all Full GC events with their details",
            parameters: "{}",
        },
        ToolDefinition {
            name: "get_allocation_failures",
            description: "Get events with allocation failures or to-space exhaustion",
            parameters: "{}",
        },
        ToolDefinition {
            name: "analyze_heap_trend",
            description: "Analyze heap usage trend over time to detect memory leaks or sizing issues",
            parameters: "{}",
        },
        ToolDefinition {
            name: "analyze_pause_pattern",
            description: "Analyze pause time patterns to identify problematic periods",
            parameters: "{}",
        },
        ToolDefinition {
            name: "compare_gc_phases",
            description: "Compare different GC phases to identify which phase is causing issues",
            parameters: "{}",
        },
        ToolDefinition {
            name: "get_tuning_recommendations",
            description: "Get specific JVM tuning recommendations based on current findings",
            parameters: r#"{"issue_type": "type of issue to get recommendations for"}"#,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(uptime: f64, pause_ms: f64, full: bool) -> GcEvent {
        GcEvent {
            gc_id: 0,
            native_id: None,
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

    fn stats_for(events: &[GcEvent]) -> Statistics {
        crate::analysis::compute_statistics(events)
    }

    #[test]
    fn test_get_summary_includes_collector_and_counts() {
        let events = vec![event(1.0, 10.0, false), event(2.0, 650.0, true)];
        let stats = stats_for(&events);
        let registry = ToolRegistry::new(CollectorType::G1, &events, &stats, &[]);

        let out = registry.dispatch("get_summary", &json!({}));
        assert!(out.text.contains("GC Summary for G1GC"));
        assert!(out.text.contains("Full GC Count: 1"));
        assert!(out.issues.is_empty());
    }

    #[test]
    fn test_long_pauses_caps_rows_and_honors_threshold() {
        let events: Vec<GcEvent> = (0..15).map(|i| event(i as f64, 300.0, false)).collect();
        let stats = stats_for(&events);
        let registry = ToolRegistry::new(CollectorType::G1, &events, &stats, &[]);

        let out = registry.dispatch("get_long_pauses", &json!({}));
        assert!(out.text.contains("Found 15 pauses > 200ms"));
        assert!(out.text.contains("... and 5 more"));

        let out = registry.dispatch("get_long_pauses", &json!({"threshold_ms": 400}));
        assert!(out.text.contains("No pauses found longer than 400ms"));
    }

    #[test]
    fn test_threshold_accepts_string_number() {
        let events = vec![event(1.0, 300.0, false)];
        let stats = stats_for(&events);
        let registry = ToolRegistry::new(CollectorType::G1, &events, &stats, &[]);

        let out = registry.dispatch("get_long_pauses", &json!({"threshold_ms": "250"}));
        assert!(out.text.contains("Found 1 pauses > 250ms"));
    }

    #[test]
    fn test_long_pauses_narrow_threshold_is_subset_of_wide() {
        let events: Vec<GcEvent> = [5.0, 60.0, 250.0, 650.0]
            .iter()
            .enumerate()
            .map(|(i, &p)| event(i as f64, p, false))
            .collect();
        let stats = stats_for(&events);
        let registry = ToolRegistry::new(CollectorType::G1, &events, &stats, &[]);

        let wide = registry.dispatch("get_long_pauses", &json!({"threshold_ms": 0}));
        let narrow = registry.dispatch("get_long_pauses", &json!({"threshold_ms": 300}));

        // Every row reported at the higher threshold appears at the lower one.
        for row in narrow.text.lines().filter(|l| l.starts_with("- ")) {
            assert!(wide.text.contains(row), "missing row: {}", row);
        }
        assert!(narrow.text.contains("Found 1 pauses > 300ms"));
        assert!(wide.text.contains("Found 4 pauses > 0ms"));
    }

    #[test]
    fn test_heap_trend_reports_leak_suspicion() {
        let mut events = Vec::new();
        for i in 0..9 {
            let mut e = event(i as f64, 10.0, false);
            e.heap_after_mb = 100.0 + 10.0 * i as f64;
            e.heap_total_mb = 512.0;
            events.push(e);
        }
        let stats = stats_for(&events);
        let registry = ToolRegistry::new(CollectorType::G1, &events, &stats, &[]);

        let out = registry.dispatch("analyze_heap_trend", &json!({}));
        assert_eq!(out.issues.len(), 1);
        // First third avg 110MB, last third avg 170MB: ~54.5% growth.
        assert_eq!(out.issues[0].issue_type, "memory_leak_likely");
        assert_eq!(out.issues[0].severity, IssueSeverity::Critical);
    }

    #[test]
    fn test_pause_pattern_flags_spikes() {
        let mut events: Vec<GcEvent> = (0..30).map(|i| event(i as f64, 10.0, false)).collect();
        events.push(event(31.0, 900.0, true));
        let stats = stats_for(&events);
        let registry = ToolRegistry::new(CollectorType::G1, &events, &stats, &[]);

        let out = registry.dispatch("analyze_pause_pattern", &json!({}));
        assert!(out.issues.iter().any(|i| i.issue_type == "pause_spikes"));
    }

    #[test]
    fn test_pause_pattern_stable_log_is_quiet() {
        let events: Vec<GcEvent> = (0..20).map(|i| event(i as f64, 10.0, false)).collect();
        let stats = stats_for(&events);
        let registry = ToolRegistry::new(CollectorType::G1, &events, &stats, &[]);

        let out = registry.dispatch("analyze_pause_pattern", &json!({}));
        assert!(out.issues.is_empty());
    }

    #[test]
    fn test_compare_phases_sorted_by_total_time() {
        let mut events = vec![event(1.0, 5.0, false), event(2.0, 5.0, false)];
        events.push(event(3.0, 650.0, true));
        let stats = stats_for(&events);
        let registry = ToolRegistry::new(CollectorType::G1, &events, &stats, &[]);

        let out = registry.dispatch("compare_gc_phases", &json!({}));
        assert!(out.text.contains("Most time-consuming phase: Full"));
    }

    #[test]
    fn test_tuning_recommendations_for_g1_with_full_gcs() {
        let events = vec![event(1.0, 650.0, true)];
        let stats = stats_for(&events);
        let issues = vec![Issue {
            issue_type: "allocation_failure".to_string(),
            severity: IssueSeverity::Critical,
            count: Some(1),
            description: String::new(),
        }];
        let registry = ToolRegistry::new(CollectorType::G1, &events, &stats, &issues);

        let out = registry.dispatch("get_tuning_recommendations", &json!({}));
        let flags: Vec<&str> = out.recommendations.iter().map(|r| r.flag.as_str()).collect();
        assert!(flags.contains(&"-XX:MaxGCPauseMillis=200"));
        assert!(flags.contains(&"-XX:InitiatingHeapOccupancyPercent=35"));
        assert!(flags.contains(&"-Xms<same as Xmx>"));
    }

    #[test]
    fn test_unknown_tool_lists_available_names() {
        let events = Vec::new();
        let stats = Statistics::default();
        let registry = ToolRegistry::new(CollectorType::G1, &events, &stats, &[]);

        let out = registry.dispatch("read_file", &json!({}));
        assert!(out.text.starts_with("Unknown tool: read_file"));
        assert!(out.text.contains("get_summary"));
        assert!(out.text.contains("final_answer"));
    }

    #[test]
    fn test_dispatch_does_not_mutate_inputs() {
        let events = vec![event(1.0, 650.0, true)];
        let stats = stats_for(&events);
        let registry = ToolRegistry::new(CollectorType::G1, &events, &stats, &[]);

        let a = registry.dispatch("get_full_gcs", &json!({}));
        let b = registry.dispatch("get_full_gcs", &json!({}));
        assert_eq!(a.text, b.text);
    }
}
