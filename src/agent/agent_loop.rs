//! The investigation loop.
//!
//! ReAct-style text protocol: each model turn is parsed for
//! `Thought:` / `Action:` / `Action Input:` lines, the named tool runs
//! against the registry, and the observation is appended to the
//! conversation. The loop is bounded by `max_steps` and always ends
//! with a final step, whether the model concluded or not.

use crate::agent::tools::{tool_definitions, ToolRegistry};
use crate::llm::{GenerateOptions, LlmBackend};
use crate::models::{
    AgentResult, AgentStep, CollectorType, GcEvent, Issue, Recommendation, Statistics,
};
use serde_json::Value;
use tracing::{debug, warn};

/// Knobs for the investigation loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_steps: usize,
    pub temperature: f32,
    pub num_predict: i32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 8,
            temperature: 0.2,
            num_predict: 500,
        }
    }
}

/// Drives one bounded investigation over a single analyzed log.
pub struct GcInvestigator<'a> {
    config: AgentConfig,
    backend: &'a dyn LlmBackend,
    registry: ToolRegistry<'a>,
    collector: CollectorType,
    statistics: &'a Statistics,
    issue_count: usize,
    model_name: String,
}

impl<'a> GcInvestigator<'a> {
    pub fn new(
        config: AgentConfig,
        backend: &'a dyn LlmBackend,
        collector: CollectorType,
        events: &'a [GcEvent],
        statistics: &'a Statistics,
        issues: &'a [Issue],
        model_name: &str,
    ) -> Self {
        Self {
            config,
            backend,
            registry: ToolRegistry::new(collector, events, statistics, issues),
            collector,
            statistics,
            issue_count: issues.len(),
            model_name: model_name.to_string(),
        }
    }

    /// Run the loop to completion and return the full trace.
    ///
    /// Never fails: LLM errors end the investigation early with whatever
    /// was gathered so far, and a missing conclusion is synthesized (or
    /// stubbed) rather than reported as an error.
    pub async fn run(&self) -> AgentResult {
        let mut conversation = format!("{}\n\n{}", self.system_prompt(), self.initial_context());
        let mut steps: Vec<AgentStep> = Vec::new();
        let mut final_answer: Option<String> = None;
        let mut issues_found: Vec<Issue> = Vec::new();
        let mut recommendations: Vec<Recommendation> = Vec::new();

        let options = GenerateOptions {
            temperature: self.config.temperature,
            num_predict: self.config.num_predict,
        };

        for step_num in 1..=self.config.max_steps {
            let response = match self.backend.generate(&conversation, options).await {
                Ok(r) => r,
                Err(e) => {
                    warn!("LLM call failed at step {}: {}", step_num, e);
                    break;
                }
            };

            let (thought, action, action_input) = parse_agent_response(&response);
            debug!("Step {}: action {:?}", step_num, action);

            let mut step = AgentStep {
                step: step_num,
                thought: thought.clone(),
                action: action.clone(),
                action_input: Some(action_input.clone()),
                observation: None,
                is_final: false,
            };

            match action.as_deref() {
                Some("final_answer") => {
                    let conclusion = action_input
                        .get("conclusion")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string())
                        .filter(|s| !s.is_empty())
                        .unwrap_or_else(|| thought.clone());
                    step.observation = Some(conclusion.clone());
                    step.is_final = true;
                    final_answer = Some(conclusion);
                    steps.push(step);
                    break;
                }
                Some(name) => {
                    let output = self.registry.dispatch(name, &action_input);
                    step.observation = Some(output.text.clone());
                    merge_issues(&mut issues_found, output.issues);
                    recommendations.extend(output.recommendations);
                }
                None => {
                    step.observation = Some(
                        "No action given. Respond with Thought, Action, and Action Input lines."
                            .to_string(),
                    );
                }
            }

            conversation.push_str(&format!(
                "\n\nThought: {}\nAction: {}\nAction Input: {}\nObservation: {}\n",
                step.thought,
                step.action.as_deref().unwrap_or(""),
                step.action_input.as_ref().cloned().unwrap_or(Value::Null),
                step.observation.as_deref().unwrap_or("")
            ));
            steps.push(step);
        }

        if final_answer.is_none() {
            final_answer = Some(self.synthesize_conclusion(&conversation, &steps).await);
        }

        // The trace must always end with a final step, even when the
        // backend was down before the first step could be recorded.
        if steps.is_empty() {
            steps.push(AgentStep {
                step: 1,
                thought: final_answer.clone().unwrap_or_default(),
                action: None,
                action_input: None,
                observation: final_answer.clone(),
                is_final: true,
            });
        }

        if let Some(last) = steps.last_mut() {
            last.is_final = true;
        }

        AgentResult {
            total_steps: steps.len(),
            steps,
            final_answer,
            recommendations,
            issues_found,
            model: self.model_name.clone(),
        }
    }

    /// Ask for a closing summary; fall back to a static digest of what
    /// the tools observed if the model is unreachable.
    async fn synthesize_conclusion(&self, conversation: &str, steps: &[AgentStep]) -> String {
        let prompt = format!(
            "{}\n\nBased on your investigation, provide a final summary of findings and recommendations.",
            conversation
        );
        let options = GenerateOptions {
            temperature: self.config.temperature,
            num_predict: self.config.num_predict,
        };

        match self.backend.generate(&prompt, options).await {
            Ok(response) if !response.trim().is_empty() => response,
            _ => {
                let mut fallback = format!(
                    "Investigation ended after {} steps without a model conclusion.",
                    steps.len()
                );
                if let Some(max_pause) = self.statistics.max_pause_ms {
                    fallback.push_str(&format!(
                        " Observed {} collector with max pause {:.1}ms and {} Full GCs.",
                        self.collector, max_pause, self.statistics.full_gc_count
                    ));
                }
                if self.issue_count > 0 {
                    fallback.push_str(&format!(
                        " {} issues were flagged by rule-based analysis.",
                        self.issue_count
                    ));
                }
                fallback
            }
        }
    }

    fn system_prompt(&self) -> String {
        let mut tools_desc = String::from("Available tools:\n\n");
        for tool in tool_definitions() {
            tools_desc.push_str(&format!("- {}: {}\n", tool.name, tool.description));
            if tool.parameters != "{}" {
                tools_desc.push_str(&format!("  Parameters: {}\n", tool.parameters));
            }
        }
        tools_desc.push_str(
            "- final_answer: Provide the final analysis conclusion when investigation is complete\n",
        );
        tools_desc.push_str("  Parameters: {\"conclusion\": \"the final analysis conclusion\"}\n");

        format!(
            "You are an expert JVM GC analyst investigating garbage collection issues.\n\
             You have access to GC log data from a {} collector.\n\n\
             {}\n\
             Follow this format for each step:\n\
             Thought: [your reasoning about what to investigate next]\n\
             Action: [the tool name to use]\n\
             Action Input: {{\"param\": \"value\"}}\n\n\
             When you have enough information, use the final_answer tool.\n\n\
             Be systematic: start with summary, identify issues, drill into specifics, then provide recommendations.",
            self.collector, tools_desc
        )
    }

    fn initial_context(&self) -> String {
        format!(
            "Analyze this GC log data and identify any performance issues.\n\n\
             Quick stats:\n\
             - Collector: {}\n\
             - Total Events: {}\n\
             - Max Pause: {:.1}ms\n\
             - Throughput: {:.1}%\n\
             - Full GCs: {}\n\
             - Known Issues: {}\n\n\
             Begin your investigation.",
            self.collector,
            self.statistics.total_gc_events,
            self.statistics.max_pause_ms.unwrap_or(0.0),
            self.statistics.throughput_percent.unwrap_or(0.0),
            self.statistics.full_gc_count,
            self.issue_count
        )
    }
}

/// Keep the first finding of each type.
fn merge_issues(collected: &mut Vec<Issue>, new: Vec<Issue>) {
    for issue in new {
        if !collected.iter().any(|i| i.issue_type == issue.issue_type) {
            collected.push(issue);
        }
    }
}

/// Extract `(thought, action, action_input)` from a model turn.
///
/// Tolerant by design: section labels are case-insensitive, multi-line
/// thoughts are joined, and unparseable action input is wrapped as
/// `{"value": <raw>}` instead of dropped.
pub fn parse_agent_response(response: &str) -> (String, Option<String>, Value) {
    let mut thought = String::new();
    let mut action: Option<String> = None;
    let mut action_input = Value::Object(serde_json::Map::new());

    #[derive(PartialEq)]
    enum Section {
        None,
        Thought,
        ActionInput,
    }
    let mut current = Section::None;

    for line in response.trim().lines() {
        let lower = line.to_lowercase();
        let lower = lower.trim();

        if lower.starts_with("thought:") {
            current = Section::Thought;
            thought = after_colon(line);
        } else if lower.starts_with("action:") {
            current = Section::None;
            let name = after_colon(line);
            if !name.is_empty() {
                action = Some(name);
            }
        } else if lower.starts_with("action input:") || lower.starts_with("action_input:") {
            current = Section::ActionInput;
            let raw = after_colon(line);
            if !raw.is_empty() {
                action_input = parse_input(&raw);
            }
        } else {
            match current {
                Section::Thought => {
                    if !thought.is_empty() {
                        thought.push(' ');
                    }
                    thought.push_str(line.trim());
                }
                Section::ActionInput => {
                    if let Ok(value) = serde_json::from_str::<Value>(line.trim()) {
                        action_input = value;
                    }
                }
                Section::None => {}
            }
        }
    }

    (thought.trim().to_string(), action, action_input)
}

fn after_colon(line: &str) -> String {
    line.split_once(':')
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_default()
}

fn parse_input(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::json!({ "value": raw }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GenerateOptions, LlmError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Backend that replays a fixed script, then repeats its last line.
    struct ScriptedBackend {
        responses: Mutex<Vec<String>>,
        fail_after: Option<usize>,
        calls: Mutex<usize>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
                fail_after: None,
                calls: Mutex::new(0),
            }
        }

        fn failing_after(responses: Vec<&str>, fail_after: usize) -> Self {
            let mut backend = Self::new(responses);
            backend.fail_after = Some(fail_after);
            backend
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn generate(
            &self,
            _prompt: &str,
            _options: GenerateOptions,
        ) -> Result<String, LlmError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if let Some(limit) = self.fail_after {
                if *calls > limit {
                    return Err(LlmError::Connect {
                        url: "http://localhost:11434".to_string(),
                    });
                }
            }

            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                Ok(responses.remove(0))
            } else {
                Ok(responses
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "Summary of findings.".to_string()))
            }
        }
    }

    fn sample_events() -> Vec<crate::models::GcEvent> {
        vec![
            crate::models::GcEvent {
                gc_id: 0,
                native_id: Some(0),
                timestamp: None,
                uptime_seconds: Some(1.0),
                gc_type: "G1GC".to_string(),
                pause_type: "Young".to_string(),
                cause: None,
                pause_ms: 12.0,
                concurrent_ms: 0.0,
                heap_before_mb: 24.0,
                heap_after_mb: 4.0,
                heap_total_mb: 256.0,
                heap_reclaimed_mb: 20.0,
                is_full_gc: false,
                is_concurrent: false,
                flags: Vec::new(),
            },
            crate::models::GcEvent {
                gc_id: 1,
                native_id: Some(1),
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
            },
        ]
    }

    fn run_agent(backend: &dyn LlmBackend, config: AgentConfig) -> AgentResult {
        let events = sample_events();
        let statistics = crate::analysis::compute_statistics(&events);
        let issues = crate::analysis::detect_issues(&events, &statistics);
        let investigator = GcInvestigator::new(
            config,
            backend,
            CollectorType::G1,
            &events,
            &statistics,
            &issues,
            "llama3.2:latest",
        );
        tokio_test::block_on(investigator.run())
    }

    #[test]
    fn test_final_answer_ends_the_loop() {
        let backend = ScriptedBackend::new(vec![
            "Thought: Start with the summary.\nAction: get_summary\nAction Input: {}",
            "Thought: I have enough.\nAction: final_answer\nAction Input: {\"conclusion\": \"Full GC at 650ms is the problem.\"}",
        ]);

        let result = run_agent(&backend, AgentConfig::default());
        assert_eq!(result.total_steps, 2);
        assert!(result.steps[1].is_final);
        assert_eq!(
            result.final_answer.as_deref(),
            Some("Full GC at 650ms is the problem.")
        );
    }

    #[test]
    fn test_step_cap_with_synthesized_conclusion() {
        // Model never concludes; the loop must stop at max_steps and the
        // extra synthesis call supplies the conclusion.
        let backend = ScriptedBackend::new(vec![
            "Thought: Looking around.\nAction: get_summary\nAction Input: {}",
        ]);

        let config = AgentConfig {
            max_steps: 4,
            ..Default::default()
        };
        let result = run_agent(&backend, config);

        assert_eq!(result.total_steps, 4);
        assert!(result.steps.last().unwrap().is_final);
        assert!(result.final_answer.is_some());
    }

    #[test]
    fn test_llm_failure_terminates_early_with_fallback() {
        let backend = ScriptedBackend::failing_after(
            vec!["Thought: Step one.\nAction: get_summary\nAction Input: {}"],
            2,
        );

        let result = run_agent(&backend, AgentConfig::default());
        assert_eq!(result.total_steps, 2);
        let answer = result.final_answer.unwrap();
        assert!(answer.contains("without a model conclusion"));
    }

    #[test]
    fn test_backend_down_from_start_still_ends_final() {
        // Every call fails, including the synthesis call: the trace must
        // still carry exactly one step, marked final, with the fallback
        // conclusion.
        let backend = ScriptedBackend::failing_after(Vec::new(), 0);

        let result = run_agent(&backend, AgentConfig::default());
        assert_eq!(result.total_steps, 1);
        let last = result.steps.last().unwrap();
        assert!(last.is_final);
        let answer = result.final_answer.unwrap();
        assert!(answer.contains("without a model conclusion"));
        assert_eq!(last.observation.as_deref(), Some(answer.as_str()));
    }

    #[test]
    fn test_unknown_tool_becomes_observation_not_error() {
        let backend = ScriptedBackend::new(vec![
            "Thought: Try something odd.\nAction: read_file\nAction Input: {\"path\": \"gc.log\"}",
            "Thought: Back on track.\nAction: final_answer\nAction Input: {\"conclusion\": \"done\"}",
        ]);

        let result = run_agent(&backend, AgentConfig::default());
        assert!(result.steps[0]
            .observation
            .as_deref()
            .unwrap()
            .starts_with("Unknown tool: read_file"));
        assert_eq!(result.final_answer.as_deref(), Some("done"));
    }

    #[test]
    fn test_tool_findings_folded_into_result() {
        let backend = ScriptedBackend::new(vec![
            "Thought: Check tuning.\nAction: get_tuning_recommendations\nAction Input: {}",
            "Thought: Done.\nAction: final_answer\nAction Input: {\"conclusion\": \"tune it\"}",
        ]);

        let result = run_agent(&backend, AgentConfig::default());
        assert!(!result.recommendations.is_empty());
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.flag.contains("InitiatingHeapOccupancyPercent")));
    }

    #[test]
    fn test_parse_response_sections() {
        let (thought, action, input) = parse_agent_response(
            "Thought: The max pause is high.\nI should look closer.\nAction: get_long_pauses\nAction Input: {\"threshold_ms\": 500}",
        );
        assert_eq!(thought, "The max pause is high. I should look closer.");
        assert_eq!(action.as_deref(), Some("get_long_pauses"));
        assert_eq!(input, json!({"threshold_ms": 500}));
    }

    #[test]
    fn test_parse_response_wraps_invalid_json_input() {
        let (_, action, input) =
            parse_agent_response("Thought: x\nAction: get_long_pauses\nAction Input: over 500 please");
        assert_eq!(action.as_deref(), Some("get_long_pauses"));
        assert_eq!(input, json!({"value": "over 500 please"}));
    }

    #[test]
    fn test_parse_response_without_action() {
        let (thought, action, _) = parse_agent_response("I think the log looks fine overall.");
        assert!(action.is_none());
        assert!(thought.is_empty());
    }
}
