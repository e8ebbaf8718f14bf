//! Run state
//!
//! Everything one task owns from submission to its final report. Only the
//! orchestrator's phase handlers mutate it.

use serde::{Deserialize, Serialize};

use crate::agent::conversation::MessageLog;
use crate::agent::plan::Plan;
use crate::core::{Message, Result};

/// Phases of the orchestrator state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    CreatePlanner,
    Execute,
    UpdatePlanner,
    Report,
    Done,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::CreatePlanner => "create_planner",
            Phase::Execute => "execute",
            Phase::UpdatePlanner => "update_planner",
            Phase::Report => "report",
            Phase::Done => "done",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Done
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The run's output folder. Assigned at most once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskFolder {
    /// Not provisioned yet
    #[default]
    Unassigned,
    /// Provisioned; path relative to the workspace root
    Assigned(String),
    /// Provisioning failed; tools fall back to the default output location
    Unavailable,
}

impl TaskFolder {
    pub fn path(&self) -> Option<&str> {
        match self {
            TaskFolder::Assigned(path) => Some(path),
            TaskFolder::Unassigned | TaskFolder::Unavailable => None,
        }
    }
}

/// State of one task run
#[derive(Debug, Clone)]
pub struct RunState {
    pub user_message: String,
    pub plan: Plan,
    /// Unfiltered running log, used when re-planning
    pub full_messages: MessageLog,
    pub task_folder: TaskFolder,
    pub final_report: String,
    pub phase: Phase,
    /// Step summaries carried between phases; never holds tool results
    observations: Vec<Message>,
}

impl RunState {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            plan: Plan::default(),
            full_messages: MessageLog::new(),
            task_folder: TaskFolder::Unassigned,
            final_report: String::new(),
            phase: Phase::CreatePlanner,
            observations: Vec::new(),
        }
    }

    pub fn observations(&self) -> &[Message] {
        &self.observations
    }

    /// Record an assistant summary in both the observations and the full log
    pub fn record_summary(&mut self, summary: impl Into<String>) {
        let summary = summary.into();
        self.observations.push(Message::assistant(summary.clone()));
        self.full_messages.add_assistant(summary);
    }

    /// Provision the task folder unless this run already tried.
    ///
    /// A failure is logged and recorded as [`TaskFolder::Unavailable`]; the
    /// run carries on without a folder.
    pub fn ensure_task_folder<F>(&mut self, create: F) -> Option<&str>
    where
        F: FnOnce(&str) -> Result<String>,
    {
        if self.task_folder == TaskFolder::Unassigned {
            self.task_folder = match create(&self.user_message) {
                Ok(path) => {
                    tracing::info!(task_folder = %path, "Created task folder");
                    TaskFolder::Assigned(path)
                }
                Err(e) => {
                    tracing::error!("Failed to create task folder: {}", e);
                    TaskFolder::Unavailable
                }
            };
        }
        self.task_folder.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlanwiseError;
    use std::cell::Cell;

    #[test]
    fn test_new_state() {
        let state = RunState::new("analyze");
        assert_eq!(state.phase, Phase::CreatePlanner);
        assert_eq!(state.task_folder, TaskFolder::Unassigned);
        assert!(state.observations().is_empty());
        assert!(state.full_messages.is_empty());
    }

    #[test]
    fn test_ensure_task_folder_is_idempotent() {
        let calls = Cell::new(0);
        let mut state = RunState::new("analyze sales");

        for _ in 0..2 {
            let path = state.ensure_task_folder(|msg| {
                calls.set(calls.get() + 1);
                Ok(format!("output/{}", msg.replace(' ', "_")))
            });
            assert_eq!(path, Some("output/analyze_sales"));
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_failed_folder_is_not_retried() {
        let calls = Cell::new(0);
        let mut state = RunState::new("x");

        for _ in 0..2 {
            let path = state.ensure_task_folder(|_| {
                calls.set(calls.get() + 1);
                Err(PlanwiseError::TaskFolder("read-only".into()))
            });
            assert_eq!(path, None);
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(state.task_folder, TaskFolder::Unavailable);
    }

    #[test]
    fn test_record_summary_goes_to_both_logs() {
        let mut state = RunState::new("x");
        state.record_summary("step done");

        assert_eq!(state.observations(), &[Message::assistant("step done")]);
        assert_eq!(state.full_messages.len(), 1);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::UpdatePlanner.to_string(), "update_planner");
        assert!(Phase::Done.is_terminal());
        assert!(!Phase::Report.is_terminal());
    }
}
