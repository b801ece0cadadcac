//! Markdown report generation.
//!
//! Builds the analysis report section by section from the assembled
//! `Report`, plus JSON serialization for machine consumers.

use crate::models::{AgentResult, Issue, IssueSeverity, Recommendation, Statistics, Summary};
use crate::report::{Report, ReportMetadata};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# GCProbe Analysis Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.summary));
    output.push_str(&generate_statistics_section(&report.statistics));
    output.push_str(&generate_issues_section(&report.issues));

    if let Some(agent) = &report.agent {
        output.push_str(&generate_agent_section(agent));
        output.push_str(&generate_recommendations_section(&agent.recommendations));
    }

    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Log Files:** {}\n",
        metadata.log_files.join(", ")
    ));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Collector:** {}\n", metadata.collector));
    if let Some(version) = &metadata.jvm_version {
        section.push_str(&format!("- **JVM:** {}\n", version));
    }
    if !metadata.gc_flags.is_empty() {
        section.push_str(&format!(
            "- **GC Flags:** `{}`\n",
            metadata.gc_flags.join(" ")
        ));
    }
    if let Some(model) = &metadata.model_used {
        section.push_str(&format!("- **Model Used:** `{}`\n", model));
    }
    section.push_str(&format!("- **Total Events:** {}\n", metadata.total_events));
    if metadata.skipped_records > 0 {
        section.push_str(&format!(
            "- **Skipped Records:** {}\n",
            metadata.skipped_records
        ));
    }
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_summary_section(summary: &Summary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "**Health: {}** - {}\n\n",
        summary.severity.to_string().to_uppercase(),
        summary.text
    ));
    if summary.issue_count > 0 {
        section.push_str(&format!(
            "{} issues detected ({} critical, {} warning).\n\n",
            summary.issue_count, summary.critical_count, summary.warning_count
        ));
    }

    section
}

fn generate_statistics_section(stats: &Statistics) -> String {
    let mut section = String::new();

    section.push_str("## Statistics\n\n");
    section.push_str("| Metric | Value |\n");
    section.push_str("|:---|:---:|\n");
    section.push_str(&format!("| Total GC Events | {} |\n", stats.total_gc_events));
    section.push_str(&format!("| Pause Events | {} |\n", stats.pause_events));
    section.push_str(&format!("| Full GCs | {} |\n", stats.full_gc_count));
    section.push_str(&format!("| Concurrent Phases | {} |\n", stats.concurrent_gc_count));
    section.push_str(&format!(
        "| Total Pause Time | {:.2}s |\n",
        stats.total_pause_time_seconds
    ));
    push_ms_row(&mut section, "Min Pause", stats.min_pause_ms);
    push_ms_row(&mut section, "Avg Pause", stats.avg_pause_ms);
    push_ms_row(&mut section, "Median Pause", stats.median_pause_ms);
    push_ms_row(&mut section, "P95 Pause", stats.p95_pause_ms);
    push_ms_row(&mut section, "P99 Pause", stats.p99_pause_ms);
    push_ms_row(&mut section, "Max Pause", stats.max_pause_ms);
    if let Some(v) = stats.throughput_percent {
        section.push_str(&format!("| Throughput | {:.1}% |\n", v));
    }
    if let Some(v) = stats.gc_frequency_per_minute {
        section.push_str(&format!("| GC Frequency | {:.1}/min |\n", v));
    }
    if let Some(v) = stats.max_heap_mb {
        section.push_str(&format!("| Max Heap | {:.0}MB |\n", v));
    }
    if let Some(v) = stats.max_heap_used_mb {
        section.push_str(&format!("| Max Heap Used | {:.0}MB |\n", v));
    }
    section.push('\n');

    if stats.pause_distribution.total() > 0 {
        section.push_str("### Pause Distribution\n\n");
        section.push_str("| Bucket | Count |\n");
        section.push_str("|:---|:---:|\n");
        for (label, count) in stats.pause_distribution.buckets() {
            section.push_str(&format!("| {} | {} |\n", label, count));
        }
        section.push('\n');
    }

    section
}

fn generate_issues_section(issues: &[Issue]) -> String {
    let mut section = String::new();

    section.push_str("## Issues\n\n");

    if issues.is_empty() {
        section.push_str("No issues detected. GC behavior looks healthy.\n\n");
        return section;
    }

    // Critical first.
    let mut sorted = issues.to_vec();
    sorted.sort_by(|a, b| b.severity.cmp(&a.severity));

    for issue in &sorted {
        section.push_str(&generate_issue_block(issue));
    }

    section
}

fn generate_issue_block(issue: &Issue) -> String {
    let mut block = String::new();

    let severity_badge = match issue.severity {
        IssueSeverity::Critical => "🔴 **CRITICAL**",
        IssueSeverity::Warning => "🟡 **WARNING**",
        IssueSeverity::Info => "🔵 **INFO**",
    };

    block.push_str(&format!("### {} {}\n\n", severity_badge, issue.issue_type));
    block.push_str(&format!("{}\n\n", issue.description));
    if let Some(count) = issue.count {
        block.push_str(&format!("**Occurrences:** {}\n\n", count));
    }
    block.push_str("---\n\n");

    block
}

fn generate_agent_section(agent: &AgentResult) -> String {
    let mut section = String::new();

    section.push_str("## Investigation\n\n");
    section.push_str(&format!(
        "*Model: `{}` | Steps: {}*\n\n",
        agent.model, agent.total_steps
    ));

    for step in &agent.steps {
        section.push_str(&format!("### Step {}\n\n", step.step));
        if !step.thought.is_empty() {
            section.push_str(&format!("**Thought:** {}\n\n", step.thought));
        }
        if let Some(action) = &step.action {
            section.push_str(&format!("**Action:** `{}`\n\n", action));
        }
        if let Some(observation) = &step.observation {
            section.push_str("<details>\n<summary>Observation</summary>\n\n```\n");
            section.push_str(observation);
            section.push_str("\n```\n</details>\n\n");
        }
    }

    if let Some(answer) = &agent.final_answer {
        section.push_str("### Conclusion\n\n");
        section.push_str(answer);
        section.push_str("\n\n");
    }

    if !agent.issues_found.is_empty() {
        section.push_str("### Findings\n\n");
        for issue in &agent.issues_found {
            section.push_str(&format!(
                "- **{}** ({}): {}\n",
                issue.issue_type, issue.severity, issue.description
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_recommendations_section(recommendations: &[Recommendation]) -> String {
    if recommendations.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Tuning Recommendations\n\n");
    section.push_str("| Priority | Flag | Reason |\n");
    section.push_str("|:---:|:---|:---|\n");
    for rec in recommendations {
        section.push_str(&format!(
            "| {} | `{}` | {} |\n",
            rec.priority, rec.flag, rec.reason
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by GCProbe*\n");

    footer
}

fn push_ms_row(section: &mut String, label: &str, value: Option<f64>) {
    if let Some(v) = value {
        section.push_str(&format!("| {} | {:.1}ms |\n", label, v));
    }
}

/// Write the Markdown report to a file.
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    let content = generate_markdown_report(report);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a JSON report to a file.
pub fn write_json_report(report: &Report, path: &Path) -> Result<()> {
    let content = generate_json_report(report)?;

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgentStep, AnalysisResult, CollectorType, GcEvent};

    fn create_test_report() -> Report {
        let events = vec![GcEvent {
            gc_id: 0,
            native_id: Some(0),
            timestamp: None,
            uptime_seconds: Some(2.0),
            gc_type: "G1GC".to_string(),
            pause_type: "Full".to_string(),
            cause: Some("Allocation Failure".to_string()),
            pause_ms: 650.0,
            concurrent_ms: 0.0,
            heap_before_mb: 200.0,
            heap_after_mb: 40.0,
            heap_total_mb: 256.0,
            heap_reclaimed_mb: 160.0,
            is_full_gc: true,
            is_concurrent: false,
            flags: vec![crate::parser::ALLOCATION_FAILURE_FLAG.to_string()],
        }];
        let statistics = crate::analysis::compute_statistics(&events);
        let issues = crate::analysis::detect_issues(&events, &statistics);
        let summary = Summary::from_issues(CollectorType::G1, &statistics, &issues);

        let analysis = AnalysisResult {
            collector_type: CollectorType::G1,
            events,
            statistics,
            issues,
            summary,
            skipped_records: 1,
            filenames: vec!["gc.log".to_string()],
            jvm_version: Some("OpenJDK 64-Bit Server VM (17.0.9+9)".to_string()),
            gc_flags: vec!["-XX:+UseG1GC".to_string()],
        };

        let agent = AgentResult {
            steps: vec![AgentStep {
                step: 1,
                thought: "Check the summary first.".to_string(),
                action: Some("get_summary".to_string()),
                action_input: None,
                observation: Some("GC Summary for G1GC".to_string()),
                is_final: true,
            }],
            total_steps: 1,
            final_answer: Some("The 650ms Full GC is the main problem.".to_string()),
            recommendations: vec![Recommendation {
                flag: "-XX:MaxGCPauseMillis=200".to_string(),
                reason: "Set target max pause time to 200ms".to_string(),
                priority: crate::models::Priority::High,
            }],
            issues_found: Vec::new(),
            model: "llama3.2:latest".to_string(),
        };

        Report::new(&analysis, Some(agent), 3.2)
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# GCProbe Analysis Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Statistics"));
        assert!(markdown.contains("## Issues"));
        assert!(markdown.contains("## Investigation"));
        assert!(markdown.contains("gc.log"));
        assert!(markdown.contains("OpenJDK 64-Bit Server VM"));
        assert!(markdown.contains("-XX:+UseG1GC"));
        assert!(markdown.contains("long_pause"));
        assert!(markdown.contains("650ms Full GC"));
        assert!(markdown.contains("-XX:MaxGCPauseMillis=200"));
    }

    #[test]
    fn test_issue_blocks_sorted_critical_first() {
        let report = create_test_report();
        let section = generate_issues_section(&report.issues);

        assert!(section.contains("CRITICAL"));
        let critical_pos = section.find("CRITICAL").unwrap();
        if let Some(warning_pos) = section.find("WARNING") {
            assert!(critical_pos < warning_pos);
        }
    }

    #[test]
    fn test_no_issues_section_is_positive() {
        let section = generate_issues_section(&[]);
        assert!(section.contains("No issues detected"));
    }

    #[test]
    fn test_report_without_agent_skips_investigation() {
        let mut report = create_test_report();
        report.agent = None;
        report.metadata.model_used = None;

        let markdown = generate_markdown_report(&report);
        assert!(!markdown.contains("## Investigation"));
        assert!(!markdown.contains("Model Used"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"collector\""));
        assert!(json.contains("\"statistics\""));
        assert!(json.contains("\"issues\""));
        assert!(json.contains("\"final_answer\""));
    }
}
