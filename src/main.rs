//! GCProbe - JVM GC log analyzer with agentic AI investigation
//!
//! A CLI tool that parses GC logs from six collector families,
//! computes pause/heap statistics, flags known GC health issues, and
//! optionally lets a local Ollama model investigate the data through
//! a fixed set of analysis tools.
//!
//! Exit codes:
//!   0 - Success (no issues above threshold, or no --fail-on set)
//!   1 - Runtime error (unreadable file, unknown log format, connection failure, etc.)
//!   2 - Issues found above --fail-on threshold

mod agent;
mod analysis;
mod cli;
mod config;
mod llm;
mod models;
mod parser;
mod report;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use llm::{GenerateOptions, LlmBackend, OllamaClient};
use models::{AnalysisResult, Summary};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const ASK_TIMEOUT_SECONDS: u64 = 120;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("GCProbe v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            eprintln!("\nError: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .gcprobe.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".gcprobe.toml");

    if path.exists() {
        eprintln!(".gcprobe.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .gcprobe.toml")?;

    println!("Created .gcprobe.toml with default settings.");
    println!("Edit it to customize the model, endpoint, and agent behavior.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete analysis workflow. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Handle --check-health: probe Ollama and exit
    if args.check_health {
        return handle_check_health(&config).await;
    }

    // Step 1: Read and parse the logs
    let mut contents: Vec<(String, String)> = Vec::new();
    for path in &args.log_files {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read log file: {}", path.display()))?;
        contents.push((path.display().to_string(), content));
    }

    let inputs: Vec<(&str, &str)> = contents
        .iter()
        .map(|(name, content)| (name.as_str(), content.as_str()))
        .collect();

    let outcome = parser::parse_logs(&inputs)?;
    info!(
        "Parsed {} events ({} records skipped) from {} collector",
        outcome.events.len(),
        outcome.skipped_records,
        outcome.collector_type
    );

    // Step 2: Aggregate and detect issues
    let statistics = analysis::compute_statistics(&outcome.events);
    let issues = analysis::detect_issues(&outcome.events, &statistics);
    let summary = Summary::from_issues(outcome.collector_type, &statistics, &issues);

    let analysis_result = AnalysisResult {
        collector_type: outcome.collector_type,
        events: outcome.events,
        statistics,
        issues,
        summary,
        skipped_records: outcome.skipped_records,
        filenames: contents.iter().map(|(name, _)| name.clone()).collect(),
        jvm_version: outcome.jvm_version,
        gc_flags: outcome.gc_flags,
    };

    print_analysis_summary(&analysis_result);

    // Handle --dry-run: no LLM calls
    if args.dry_run {
        println!("\nDry run complete. No LLM calls were made.");
        return Ok(exit_code_for(&args, &analysis_result, None));
    }

    // Handle --ask: one question, one answer
    if let Some(question) = &args.ask {
        let client = OllamaClient::new(
            &config.model.ollama_url,
            &config.model.name,
            ASK_TIMEOUT_SECONDS,
        )?;
        return handle_ask(&client, &config, &analysis_result, question).await;
    }

    // Step 3: Run the agent investigation
    println!("\nStarting investigation...");
    println!("   Model: {}", config.model.name);
    println!("   Ollama: {}", config.model.ollama_url);
    println!("   Max steps: {}", config.agent.max_steps);
    println!("   Timeout: {}s per step\n", config.model.timeout_seconds);

    let client = OllamaClient::new(
        &config.model.ollama_url,
        &config.model.name,
        config.model.timeout_seconds,
    )?;

    let agent_config = agent::AgentConfig {
        max_steps: config.agent.max_steps,
        temperature: config.model.temperature,
        num_predict: config.agent.num_predict,
    };

    let investigator = agent::GcInvestigator::new(
        agent_config,
        &client,
        analysis_result.collector_type,
        &analysis_result.events,
        &analysis_result.statistics,
        &analysis_result.issues,
        &config.model.name,
    );

    let agent_result = investigator.run().await;
    info!(
        "Investigation finished in {} steps, {} findings",
        agent_result.total_steps,
        agent_result.issues_found.len()
    );

    if let Some(answer) = &agent_result.final_answer {
        println!("Conclusion:\n{}\n", answer);
    }

    // Step 4: Generate and save the report
    let duration = start_time.elapsed().as_secs_f64();
    let report = report::Report::new(&analysis_result, Some(agent_result.clone()), duration);

    match args.format {
        OutputFormat::Json => report::generator::write_json_report(&report, &args.output),
        OutputFormat::Markdown => report::generator::write_report(&report, &args.output),
    }
    .with_context(|| format!("Failed to write report to {}", args.output.display()))?;

    println!(
        "Analysis complete in {:.1}s. Report saved to: {}",
        duration,
        args.output.display()
    );

    Ok(exit_code_for(&args, &analysis_result, Some(&agent_result)))
}

/// Handle --check-health: probe the Ollama endpoint and report.
async fn handle_check_health(config: &Config) -> Result<i32> {
    let client = OllamaClient::new(&config.model.ollama_url, &config.model.name, 10)?;
    let status = client.health_check().await;

    println!("{}", serde_json::to_string_pretty(&status)?);

    if status.available {
        Ok(0)
    } else {
        Ok(1)
    }
}

/// Handle --ask: answer one question with the analysis as context.
async fn handle_ask(
    client: &OllamaClient,
    config: &Config,
    analysis: &AnalysisResult,
    question: &str,
) -> Result<i32> {
    println!("\nAsking {}...\n", config.model.name);

    let stats = &analysis.statistics;
    let prompt = format!(
        "You are an expert JVM GC analyst. A user analyzed a {} GC log with these results:\n\
         - Total Events: {}\n\
         - Full GCs: {}\n\
         - Max Pause: {:.1}ms\n\
         - Avg Pause: {:.1}ms\n\
         - Throughput: {:.1}%\n\
         - Detected issues: {}\n\n\
         Question: {}\n\n\
         Answer concisely and concretely, referencing the numbers above where relevant.",
        analysis.collector_type,
        stats.total_gc_events,
        stats.full_gc_count,
        stats.max_pause_ms.unwrap_or(0.0),
        stats.avg_pause_ms.unwrap_or(0.0),
        stats.throughput_percent.unwrap_or(0.0),
        analysis
            .issues
            .iter()
            .map(|i| i.issue_type.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        question
    );

    let options = GenerateOptions {
        temperature: config.model.temperature,
        num_predict: config.agent.num_predict,
    };
    let answer = client.generate(&prompt, options).await?;
    println!("{}", answer.trim());

    Ok(0)
}

/// Print the parse/analysis digest to stdout.
fn print_analysis_summary(analysis: &AnalysisResult) {
    let stats = &analysis.statistics;

    println!("\nAnalysis Summary:");
    println!("   Collector: {}", analysis.collector_type);
    if let Some(version) = &analysis.jvm_version {
        println!("   JVM: {}", version);
    }
    println!(
        "   Events: {} ({} pauses, {} Full GCs, {} concurrent)",
        stats.total_gc_events, stats.pause_events, stats.full_gc_count, stats.concurrent_gc_count
    );
    if analysis.skipped_records > 0 {
        println!("   Skipped records: {}", analysis.skipped_records);
    }
    if let Some(max) = stats.max_pause_ms {
        println!(
            "   Pauses: max {:.1}ms, avg {:.1}ms, p99 {:.1}ms",
            max,
            stats.avg_pause_ms.unwrap_or(0.0),
            stats.p99_pause_ms.unwrap_or(0.0)
        );
    }
    if let Some(tp) = stats.throughput_percent {
        println!("   Throughput: {:.1}%", tp);
    }
    println!(
        "   Health: {} - {}",
        analysis.summary.severity, analysis.summary.text
    );

    if analysis.issues.is_empty() {
        println!("   Issues: none");
    } else {
        println!("   Issues:");
        for issue in &analysis.issues {
            println!(
                "     [{}] {}: {}",
                issue.severity, issue.issue_type, issue.description
            );
        }
    }
}

/// Apply the --fail-on threshold across rule issues and agent findings.
fn exit_code_for(
    args: &Args,
    analysis: &AnalysisResult,
    agent_result: Option<&models::AgentResult>,
) -> i32 {
    let Some(fail_level) = args.fail_on else {
        return 0;
    };
    let threshold = fail_level.as_severity();

    let rule_hit = analysis.issues.iter().any(|i| i.severity >= threshold);
    let agent_hit = agent_result
        .map(|a| a.issues_found.iter().any(|i| i.severity >= threshold))
        .unwrap_or(false);

    if rule_hit || agent_hit {
        warn!(
            "Issues found at or above {:?} severity. Failing (exit code 2).",
            fail_level
        );
        2
    } else {
        0
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .gcprobe.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
