//! Agentic investigation over analyzed GC data.
//!
//! The agent runs a bounded think/act/observe loop against a local LLM,
//! querying the frozen analysis results through a fixed tool registry.

pub mod agent_loop;
pub mod tools;

pub use agent_loop::{AgentConfig, GcInvestigator};
pub use tools::{ToolOutput, ToolRegistry};
