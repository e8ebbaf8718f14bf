//! Agent module - orchestration and conversation management
//!
//! Contains the phase state machine, the plan model, the run state and the
//! tool execution loop that the execute and report phases share.

pub mod conversation;
pub mod executor;
pub mod loop_state;
pub mod orchestrator;
pub mod plan;
pub mod prompts;
pub mod state;

pub use conversation::{observation_seed, MessageLog};
pub use executor::{LoopOutcome, ToolLoop};
pub use loop_state::{LoopExit, ToolLoopState};
pub use orchestrator::Agent;
pub use plan::{extract_json, Plan, Step, StepStatus};
pub use state::{Phase, RunState, TaskFolder};
