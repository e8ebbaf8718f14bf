//! Tool loop state management
//!
//! Tracks one run of the tool execution loop: how many model rounds it took,
//! how many tools were dispatched and why it stopped.

use serde::{Deserialize, Serialize};

use crate::llm::TokenUsage;

/// Why the tool loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopExit {
    /// The model answered without requesting tools
    Finished,
    /// The model wrote a `<tool_call>` marker as text instead of a
    /// structured call
    PseudoToolCall,
    /// The configured round limit was reached
    RoundLimit,
}

/// State of the tool execution loop
#[derive(Debug, Clone)]
pub struct ToolLoopState {
    /// Completed model rounds
    pub round: usize,
    /// Optional cap on model rounds
    pub max_rounds: Option<usize>,
    /// Tool calls dispatched so far
    pub tool_calls: usize,
    /// Set once the loop is over
    pub exit: Option<LoopExit>,
    /// Tokens reported by the provider across all rounds
    pub usage: TokenUsage,
}

impl ToolLoopState {
    pub fn new(max_rounds: Option<usize>) -> Self {
        Self {
            round: 0,
            max_rounds,
            tool_calls: 0,
            exit: None,
            usage: TokenUsage::default(),
        }
    }

    /// Check if the loop should ask the model again
    pub fn should_continue(&self) -> bool {
        self.exit.is_none()
    }

    /// Count a round that requested `calls` tools. Hitting the round limit
    /// ends the loop.
    pub fn record_round(&mut self, calls: usize) {
        self.round += 1;
        self.tool_calls += calls;
        if self.max_rounds.is_some_and(|max| self.round >= max) {
            self.exit = Some(LoopExit::RoundLimit);
        }
    }

    /// Providers that do not report usage leave the totals unchanged
    pub fn record_usage(&mut self, usage: Option<&TokenUsage>) {
        if let Some(usage) = usage {
            self.usage.add(usage);
        }
    }

    pub fn finish(&mut self, exit: LoopExit) {
        self.round += 1;
        self.exit = Some(exit);
    }
}
