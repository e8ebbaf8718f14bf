//! Agent orchestrator
//!
//! Drives one task through the phase state machine:
//! `create_planner → execute → (report | update_planner → execute) → report → done`.
//!
//! Each phase handler mutates the [`RunState`] and returns the next phase.
//! Whether a completed step is followed by another step or by a re-plan is
//! chosen by [`AgentConfig::replan_after_each_step`].

use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use crate::agent::conversation::observation_seed;
use crate::agent::executor::ToolLoop;
use crate::agent::plan::Plan;
use crate::agent::prompts;
use crate::agent::state::{Phase, RunState};
use crate::core::{AgentConfig, Config, Message, PlanwiseError, Result};
use crate::llm::{create_provider, CompletionClient, LLMProvider};
use crate::tools::{TaskFolders, ToolRegistry, Workspace, EXECUTE_TOOLS, REPORT_TOOLS};

/// Main agent that plans, executes and reports on a task
pub struct Agent {
    /// Completion client shared by every phase
    client: CompletionClient,
    /// Tool handlers
    registry: ToolRegistry,
    /// Task folder provisioning
    folders: TaskFolders,
    /// Orchestrator settings
    config: AgentConfig,
}

impl Agent {
    /// Assemble an agent. Fails if a tool of either phase subset has no
    /// handler.
    pub fn new(
        client: CompletionClient,
        registry: ToolRegistry,
        folders: TaskFolders,
        config: AgentConfig,
    ) -> Result<Self> {
        registry.ensure_bound(EXECUTE_TOOLS)?;
        registry.ensure_bound(REPORT_TOOLS)?;

        Ok(Self {
            client,
            registry,
            folders,
            config,
        })
    }

    /// Create an agent from configuration with the configured provider
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let provider = create_provider(&config.llm)?;
        Self::with_provider(provider, config)
    }

    /// Create an agent from configuration with an explicit provider
    pub fn with_provider(provider: Arc<dyn LLMProvider>, config: &Config) -> Result<Self> {
        let client = CompletionClient::new(provider, &config.llm).with_debug(config.agent.debug);
        let workspace = Workspace::from_config(&config.workspace);

        Self::new(
            client,
            ToolRegistry::builtin(workspace.clone()),
            TaskFolders::new(workspace),
            config.agent.clone(),
        )
    }

    /// Run a task to completion and return its final state
    pub async fn run(&self, user_message: &str) -> Result<RunState> {
        let mut state = RunState::new(user_message);
        info!(
            model = %self.client.describe(),
            replan_after_each_step = self.config.replan_after_each_step,
            "Starting task"
        );

        while !state.phase.is_terminal() {
            self.step(&mut state).await?;
        }

        info!(
            steps = state.plan.steps.len(),
            completed = state.plan.completed_count(),
            plan_complete = state.plan.is_complete(),
            task_folder = state.task_folder.path().unwrap_or(""),
            "Task complete"
        );
        Ok(state)
    }

    /// Run the current phase and move the state to the phase it selects
    pub async fn step(&self, state: &mut RunState) -> Result<Phase> {
        let phase = state.phase;
        let span = info_span!("phase", name = %phase);

        let run = &mut *state;
        let next = async move {
            match phase {
                Phase::CreatePlanner => self.create_planner(run).await,
                Phase::Execute => self.execute(run).await,
                Phase::UpdatePlanner => self.update_planner(run).await,
                Phase::Report => self.report(run).await,
                Phase::Done => Ok(Phase::Done),
            }
        }
        .instrument(span)
        .await?;

        state.phase = next;
        Ok(next)
    }

    /// Provision the task folder and ask the model for the initial plan
    pub async fn create_planner(&self, state: &mut RunState) -> Result<Phase> {
        info!("Creating plan");
        let folders = &self.folders;
        state.ensure_task_folder(|message| folders.create(message));

        let messages = [
            Message::system(prompts::PLAN_SYSTEM),
            Message::user(prompts::plan_create(&state.user_message)),
        ];
        let response = self.client.complete(&messages, None).await?;
        let plan = Plan::parse(&response.content)?;

        info!(
            goal = %plan.goal,
            steps = plan.steps.len(),
            tokens = response.usage.map_or(0, |u| u.total_tokens),
            "Plan created"
        );
        state.full_messages.add_assistant(plan.to_json());
        state.plan = plan;
        Ok(Phase::Execute)
    }

    /// Work on the first pending step with the execution tools
    pub async fn execute(&self, state: &mut RunState) -> Result<Phase> {
        let Some(index) = state.plan.next_pending() else {
            info!("No pending step, moving to report");
            return Ok(Phase::Report);
        };

        let step = state.plan.steps[index].clone();
        info!(
            step = index + 1,
            of = state.plan.steps.len(),
            title = %step.title,
            "Executing step"
        );

        let mut context = observation_seed(state.observations());
        context.push(Message::system(prompts::EXECUTE_SYSTEM));
        context.push(Message::user(prompts::execution(
            &state.user_message,
            &step.description,
            state.task_folder.path(),
        )));

        let outcome = ToolLoop::new(&self.client, &self.registry, EXECUTE_TOOLS)
            .with_task_folder(state.task_folder.path())
            .with_max_rounds(self.config.max_tool_rounds)
            .run(context)
            .await?;

        info!(
            rounds = outcome.state.round,
            tool_calls = outcome.state.tool_calls,
            tokens = outcome.state.usage.total_tokens,
            "Step summary: {}",
            outcome.summary()
        );

        state.plan.complete_step(index);
        state.record_summary(outcome.summary());

        Ok(self.after_step(&state.plan))
    }

    /// Transition taken once a step has completed
    fn after_step(&self, plan: &Plan) -> Phase {
        let remaining = plan.pending_count();
        if remaining == 0 {
            info!("All steps completed, moving to report");
            Phase::Report
        } else if self.config.replan_after_each_step {
            info!(remaining, "Re-planning before the next step");
            Phase::UpdatePlanner
        } else {
            info!(remaining, "Continuing with the next step");
            Phase::Execute
        }
    }

    /// Ask the model to revise the pending part of the plan
    pub async fn update_planner(&self, state: &mut RunState) -> Result<Phase> {
        info!("Updating plan");
        state.full_messages.push(Message::system(prompts::PLAN_SYSTEM));
        state.full_messages.add_user(prompts::update_plan(
            &state.plan.to_json_pretty(),
            &state.plan.goal,
        ));

        let attempts = self.config.max_replan_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let response = self
                .client
                .complete(state.full_messages.messages(), None)
                .await?;

            match Plan::parse(&response.content) {
                Ok(revised) => {
                    state.full_messages.add_assistant(response.content);
                    state.plan.merge_revision(revised);
                    info!(
                        goal = %state.plan.goal,
                        pending = state.plan.pending_count(),
                        "Plan updated"
                    );
                    return Ok(Phase::Execute);
                }
                Err(e) => {
                    warn!(attempt, attempts, "Revised plan did not parse: {}", e);
                    last_error = e.to_string();
                    state.full_messages.add_assistant(response.content);
                    state
                        .full_messages
                        .add_user(prompts::plan_correction(&last_error));
                }
            }
        }

        Err(PlanwiseError::PlanUpdateFailed {
            attempts,
            last_error,
        })
    }

    /// Write the final report with the reporting tools
    pub async fn report(&self, state: &mut RunState) -> Result<Phase> {
        info!("Writing report");
        let mut context = observation_seed(state.observations());
        context.push(Message::system(prompts::report_system(
            state.task_folder.path(),
        )));

        let outcome = ToolLoop::new(&self.client, &self.registry, REPORT_TOOLS)
            .with_task_folder(state.task_folder.path())
            .with_max_rounds(self.config.max_tool_rounds)
            .run(context)
            .await?;

        info!(
            rounds = outcome.state.round,
            tool_calls = outcome.state.tool_calls,
            tokens = outcome.state.usage.total_tokens,
            "Report generated"
        );

        state.final_report = outcome.response.content;
        state.full_messages.add_assistant(state.final_report.clone());
        Ok(Phase::Done)
    }
}
