//! Report assembly.
//!
//! The `Report` ties the parsed log metadata, the aggregate analysis,
//! and the optional agent investigation into one serializable document.

pub mod generator;

use crate::models::{AgentResult, AnalysisResult, Issue, Statistics, Summary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub log_files: Vec<String>,
    pub analysis_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    pub collector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jvm_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gc_flags: Vec<String>,
    pub total_events: usize,
    pub skipped_records: usize,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: Summary,
    pub statistics: Statistics,
    pub issues: Vec<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentResult>,
}

impl Report {
    /// Assemble a report from an analysis run.
    pub fn new(
        analysis: &AnalysisResult,
        agent: Option<AgentResult>,
        duration_seconds: f64,
    ) -> Self {
        let model_used = agent.as_ref().map(|a| a.model.clone());

        Self {
            metadata: ReportMetadata {
                log_files: analysis.filenames.clone(),
                analysis_date: Utc::now(),
                model_used,
                collector: analysis.collector_type.to_string(),
                jvm_version: analysis.jvm_version.clone(),
                gc_flags: analysis.gc_flags.clone(),
                total_events: analysis.events.len(),
                skipped_records: analysis.skipped_records,
                duration_seconds,
            },
            summary: analysis.summary.clone(),
            statistics: analysis.statistics.clone(),
            issues: analysis.issues.clone(),
            agent,
        }
    }
}
