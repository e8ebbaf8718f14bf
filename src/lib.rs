//! Planwise - plan, execute and report on a task with a tool-calling LLM
//!
//! Turns a free-text request into a structured plan, works through the plan
//! step by step with file, shell and CSV analysis tools, and finishes with a
//! written report.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Provider abstraction (OpenAI-compatible, Ollama, mock) and the
//!   retrying completion client
//! - **Tools**: Closed tool set, registry, and the built-in tool handlers
//! - **Agent**: Phase state machine, plan model, run state and tool loop
//!
//! # Usage
//!
//! ```rust,no_run
//! use planwise::{Agent, Config};
//!
//! #[tokio::main]
//! async fn main() -> planwise::Result<()> {
//!     let agent = Agent::from_config(&Config::load())?;
//!     let state = agent.run("Analyze ./data/sales.csv and write a report").await?;
//!     println!("{}", state.final_report);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod core;
pub mod llm;
pub mod tools;

// Re-export commonly used items
pub use agent::{Agent, Phase, Plan, RunState};
pub use core::{Config, PlanwiseError, Result};
