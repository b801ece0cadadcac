//! Data models for GC log analysis.
//!
//! This module contains the core data structures shared by the parser,
//! the aggregator, the agent, and the report generator.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The JVM garbage collector family a log was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectorType {
    #[serde(rename = "G1GC")]
    G1,
    #[serde(rename = "ZGC")]
    Zgc,
    Shenandoah,
    Parallel,
    #[serde(rename = "CMS")]
    Cms,
    Serial,
}

impl CollectorType {
    /// True for collectors that log in the JDK 11+ unified format.
    pub fn is_unified(&self) -> bool {
        matches!(self, Self::G1 | Self::Zgc | Self::Shenandoah)
    }
}

impl fmt::Display for CollectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectorType::G1 => write!(f, "G1GC"),
            CollectorType::Zgc => write!(f, "ZGC"),
            CollectorType::Shenandoah => write!(f, "Shenandoah"),
            CollectorType::Parallel => write!(f, "Parallel"),
            CollectorType::Cms => write!(f, "CMS"),
            CollectorType::Serial => write!(f, "Serial"),
        }
    }
}

/// A single normalized GC event.
///
/// Events are immutable once the parser has emitted them; the whole
/// analysis run shares one frozen `Vec<GcEvent>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcEvent {
    /// Sequence id assigned in ordering-key order, unique within a run.
    pub gc_id: u64,
    /// Collector-native GC(n) id, when the log format carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_id: Option<u64>,
    /// Wall-clock instant, present only for date-stamped logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// JVM uptime in seconds, present for uptime-stamped logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<f64>,
    /// Collector family or generation label (e.g. "G1GC", "PSYoungGen").
    pub gc_type: String,
    /// Collection phase label (e.g. "Young", "Mixed", "Full").
    pub pause_type: String,
    /// Trigger reported by the collector, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Stop-the-world pause duration; 0 for occupancy-only records.
    pub pause_ms: f64,
    /// Concurrent phase duration for non-pausing records.
    pub concurrent_ms: f64,
    pub heap_before_mb: f64,
    pub heap_after_mb: f64,
    pub heap_total_mb: f64,
    /// `heap_before_mb - heap_after_mb`, clamped to >= 0.
    pub heap_reclaimed_mb: f64,
    pub is_full_gc: bool,
    pub is_concurrent: bool,
    /// Condition markers such as `allocation_failure`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

impl GcEvent {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    /// Label used when grouping by phase: pause_type if set, else gc_type.
    pub fn phase_label(&self) -> &str {
        if self.pause_type.is_empty() {
            &self.gc_type
        } else {
            &self.pause_type
        }
    }
}

/// The six fixed pause-duration buckets.
///
/// Together the buckets partition every event with `pause_ms > 0`
/// exactly once. Boundaries are at 10/50/100/500/1000 ms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseDistribution {
    #[serde(rename = "0-10ms")]
    pub up_to_10ms: usize,
    #[serde(rename = "10-50ms")]
    pub up_to_50ms: usize,
    #[serde(rename = "50-100ms")]
    pub up_to_100ms: usize,
    #[serde(rename = "100-500ms")]
    pub up_to_500ms: usize,
    #[serde(rename = "500ms-1s")]
    pub up_to_1s: usize,
    #[serde(rename = ">1s")]
    pub over_1s: usize,
}

impl PauseDistribution {
    /// Count one pause into its bucket. Pauses of 0 ms are not recorded.
    pub fn record(&mut self, pause_ms: f64) {
        if pause_ms <= 0.0 {
            return;
        }
        if pause_ms <= 10.0 {
            self.up_to_10ms += 1;
        } else if pause_ms <= 50.0 {
            self.up_to_50ms += 1;
        } else if pause_ms <= 100.0 {
            self.up_to_100ms += 1;
        } else if pause_ms <= 500.0 {
            self.up_to_500ms += 1;
        } else if pause_ms <= 1000.0 {
            self.up_to_1s += 1;
        } else {
            self.over_1s += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.up_to_10ms
            + self.up_to_50ms
            + self.up_to_100ms
            + self.up_to_500ms
            + self.up_to_1s
            + self.over_1s
    }

    /// Buckets in their fixed order, for display.
    pub fn buckets(&self) -> [(&'static str, usize); 6] {
        [
            ("0-10ms", self.up_to_10ms),
            ("10-50ms", self.up_to_50ms),
            ("50-100ms", self.up_to_100ms),
            ("100-500ms", self.up_to_500ms),
            ("500ms-1s", self.up_to_1s),
            (">1s", self.over_1s),
        ]
    }
}

/// Aggregate statistics derived from one event stream.
///
/// Pause statistics cover events with `pause_ms > 0` only and are absent
/// when no such event exists. Throughput and frequency need a time axis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub total_gc_events: usize,
    pub pause_events: usize,
    pub full_gc_count: usize,
    pub concurrent_gc_count: usize,
    pub total_pause_time_ms: f64,
    pub total_pause_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_pause_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pause_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_pause_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_pause_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p95_pause_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p99_pause_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_heap_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_heap_used_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_heap_used_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gc_frequency_per_minute: Option<f64>,
    pub pause_distribution: PauseDistribution,
}

/// Severity level of a detected issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueSeverity::Info => write!(f, "info"),
            IssueSeverity::Warning => write!(f, "warning"),
            IssueSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// A single detected GC health issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: IssueSeverity,
    /// How many events triggered the rule, when countable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub description: String,
}

/// Overall health classification of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthSeverity {
    Healthy,
    Info,
    Warning,
    Critical,
}

impl fmt::Display for HealthSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthSeverity::Healthy => write!(f, "healthy"),
            HealthSeverity::Info => write!(f, "info"),
            HealthSeverity::Warning => write!(f, "warning"),
            HealthSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Human-readable summary of a run: max issue severity plus a one-liner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub severity: HealthSeverity,
    pub text: String,
    pub issue_count: usize,
    pub critical_count: usize,
    pub warning_count: usize,
}

impl Summary {
    /// Build the summary from detected issues and the stats line.
    pub fn from_issues(
        collector: CollectorType,
        statistics: &Statistics,
        issues: &[Issue],
    ) -> Self {
        let critical_count = issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Critical)
            .count();
        let warning_count = issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
            .count();

        let severity = if critical_count > 0 {
            HealthSeverity::Critical
        } else if warning_count > 0 {
            HealthSeverity::Warning
        } else if !issues.is_empty() {
            HealthSeverity::Info
        } else {
            HealthSeverity::Healthy
        };

        let mut text = format!(
            "{} collector, {} GC events",
            collector, statistics.total_gc_events
        );
        if let Some(max) = statistics.max_pause_ms {
            text.push_str(&format!(", max pause {:.1}ms", max));
        }
        if let Some(tp) = statistics.throughput_percent {
            text.push_str(&format!(", throughput {:.1}%", tp));
        }
        if critical_count > 0 {
            text.push_str(&format!(", {} critical issues", critical_count));
        }
        if warning_count > 0 {
            text.push_str(&format!(", {} warnings", warning_count));
        }

        Self {
            severity,
            text,
            issue_count: issues.len(),
            critical_count,
            warning_count,
        }
    }
}

/// Priority of a tuning recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
        }
    }
}

/// A concrete JVM flag suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub flag: String,
    pub reason: String,
    pub priority: Priority,
}

/// One recorded step of the agent's investigation.
///
/// Steps are appended to the trace in order and never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStep {
    pub step: usize,
    pub thought: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    pub is_final: bool,
}

/// The finished investigation: ordered trace plus structured extracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub steps: Vec<AgentStep>,
    pub total_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
    pub recommendations: Vec<Recommendation>,
    pub issues_found: Vec<Issue>,
    pub model: String,
}

/// Complete output of the parse + aggregate stage for one upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub collector_type: CollectorType,
    pub events: Vec<GcEvent>,
    pub statistics: Statistics,
    pub issues: Vec<Issue>,
    pub summary: Summary,
    /// Malformed records skipped during normalization.
    pub skipped_records: usize,
    pub filenames: Vec<String>,
    /// JVM version banner from the log header, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jvm_version: Option<String>,
    /// `-XX:` flags found in the log header.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gc_flags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(IssueSeverity::Info < IssueSeverity::Warning);
        assert!(IssueSeverity::Warning < IssueSeverity::Critical);
    }

    #[test]
    fn test_distribution_buckets() {
        let mut dist = PauseDistribution::default();
        dist.record(0.0); // not a pause, not counted
        dist.record(5.0);
        dist.record(10.0); // boundary: still 0-10ms
        dist.record(12.0);
        dist.record(99.0);
        dist.record(500.0); // boundary: still 100-500ms
        dist.record(650.0);
        dist.record(2500.0);

        assert_eq!(dist.up_to_10ms, 2);
        assert_eq!(dist.up_to_50ms, 1);
        assert_eq!(dist.up_to_100ms, 1);
        assert_eq!(dist.up_to_500ms, 1);
        assert_eq!(dist.up_to_1s, 1);
        assert_eq!(dist.over_1s, 1);
        assert_eq!(dist.total(), 7);
    }

    #[test]
    fn test_summary_severity_is_max() {
        let stats = Statistics::default();
        let issues = vec![
            Issue {
                issue_type: "high_gc_frequency".to_string(),
                severity: IssueSeverity::Warning,
                count: None,
                description: "frequent collections".to_string(),
            },
            Issue {
                issue_type: "long_pause".to_string(),
                severity: IssueSeverity::Critical,
                count: Some(2),
                description: "long pauses".to_string(),
            },
        ];

        let summary = Summary::from_issues(CollectorType::G1, &stats, &issues);
        assert_eq!(summary.severity, HealthSeverity::Critical);
        assert_eq!(summary.critical_count, 1);
        assert_eq!(summary.warning_count, 1);
        assert!(summary.text.contains("G1GC"));
    }

    #[test]
    fn test_summary_healthy_without_issues() {
        let stats = Statistics::default();
        let summary = Summary::from_issues(CollectorType::Parallel, &stats, &[]);
        assert_eq!(summary.severity, HealthSeverity::Healthy);
        assert_eq!(summary.issue_count, 0);
    }

    #[test]
    fn test_collector_serde_names() {
        let json = serde_json::to_string(&CollectorType::G1).unwrap();
        assert_eq!(json, "\"G1GC\"");
        let json = serde_json::to_string(&CollectorType::Cms).unwrap();
        assert_eq!(json, "\"CMS\"");
    }
}
