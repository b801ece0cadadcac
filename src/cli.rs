//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// GCProbe - JVM GC log analyzer with agentic AI investigation
///
/// Parse GC logs from G1, ZGC, Shenandoah, Parallel, CMS, and Serial
/// collectors, detect performance issues, and optionally let a local
/// LLM investigate the data with analysis tools. Markdown/JSON reports.
///
/// Examples:
///   gcprobe gc.log
///   gcprobe gc.log --model qwen2.5:14b
///   gcprobe gc-part1.log gc-part2.log --format json -o report.json
///   gcprobe gc.log --dry-run
///   gcprobe gc.log --ask "Why are the pauses so long?"
///   gcprobe --check-health
///   gcprobe --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// GC log file(s) to analyze
    ///
    /// Multiple files are merged into one event stream, ordered by
    /// timestamp or JVM uptime. Not required with --init-config or
    /// --check-health.
    #[arg(
        value_name = "LOGFILE",
        required_unless_present_any = ["init_config", "check_health"]
    )]
    pub log_files: Vec<PathBuf>,

    /// Ollama model to use for the investigation
    ///
    /// Can also be set via OLLAMA_MODEL env var or .gcprobe.toml config.
    #[arg(short, long, default_value = "qwen2.5:14b", env = "OLLAMA_MODEL")]
    pub model: String,

    /// Ollama API endpoint URL
    #[arg(long, default_value = "http://localhost:11434", env = "OLLAMA_URL")]
    pub ollama_url: String,

    /// Output file path for the report
    #[arg(short, long, default_value = "gcprobe_report.md", value_name = "FILE")]
    pub output: PathBuf,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .gcprobe.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum investigation steps for the agent
    #[arg(long, default_value = "8", value_name = "COUNT")]
    pub max_steps: usize,

    /// LLM request timeout in seconds
    ///
    /// Default: from config or 60s per agent step.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Temperature for LLM responses (0.0 - 1.0)
    ///
    /// Lower values produce more consistent/deterministic output
    #[arg(long, default_value = "0.2")]
    pub temperature: f32,

    /// Ask a single question about the log instead of running the agent
    #[arg(long, value_name = "QUESTION")]
    pub ask: Option<String>,

    /// Fail if issues at or above this severity are found
    ///
    /// Useful for CI pipelines. Exit code 2 when threshold is exceeded.
    /// Values: info, warning, critical
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnLevel>,

    /// Dry run: parse and analyze without calling the LLM
    ///
    /// Prints the statistics and detected issues and exits.
    #[arg(long)]
    pub dry_run: bool,

    /// Check whether Ollama is reachable and list served models
    #[arg(long)]
    pub check_health: bool,

    /// Generate a default .gcprobe.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Severity level for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum FailOnLevel {
    Info,
    Warning,
    Critical,
}

impl FailOnLevel {
    /// The matching issue severity threshold.
    pub fn as_severity(self) -> crate::models::IssueSeverity {
        match self {
            FailOnLevel::Info => crate::models::IssueSeverity::Info,
            FailOnLevel::Warning => crate::models::IssueSeverity::Warning,
            FailOnLevel::Critical => crate::models::IssueSeverity::Critical,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if !self.check_health && self.log_files.is_empty() {
            return Err("At least one log file is required".to_string());
        }

        for path in &self.log_files {
            if !path.exists() {
                return Err(format!("Log file does not exist: {}", path.display()));
            }
            if !path.is_file() {
                return Err(format!("Not a file: {}", path.display()));
            }
        }

        // Ollama URL is only needed when the LLM will be called
        if !self.dry_run
            && !self.ollama_url.starts_with("http://")
            && !self.ollama_url.starts_with("https://")
        {
            return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
        }

        if !(0.0..=1.0).contains(&self.temperature) {
            return Err("Temperature must be between 0.0 and 1.0".to_string());
        }

        if self.max_steps == 0 {
            return Err("Max steps must be at least 1".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            log_files: Vec::new(),
            model: "qwen2.5:14b".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            output: PathBuf::from("gcprobe_report.md"),
            format: OutputFormat::Markdown,
            config: None,
            max_steps: 8,
            timeout: None,
            temperature: 0.2,
            ask: None,
            fail_on: None,
            dry_run: false,
            check_health: true,
            init_config: false,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_validation_requires_log_files() {
        let mut args = make_args();
        args.check_health = false;
        assert!(args.validate().is_err());

        args.check_health = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_file() {
        let mut args = make_args();
        args.log_files = vec![PathBuf::from("/no/such/gc.log")];
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_ollama_url() {
        let mut args = make_args();
        args.ollama_url = "localhost:11434".to_string();
        assert!(args.validate().is_err());

        args.dry_run = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_temperature_range() {
        let mut args = make_args();
        args.temperature = 1.5;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_fail_on_maps_to_severity() {
        assert_eq!(
            FailOnLevel::Critical.as_severity(),
            crate::models::IssueSeverity::Critical
        );
        assert!(
            FailOnLevel::Warning.as_severity() < FailOnLevel::Critical.as_severity()
        );
    }
}
