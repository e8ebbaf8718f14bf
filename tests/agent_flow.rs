//! End-to-end tests of the phase state machine
//!
//! Drives full runs against a scripted mock provider and a temporary
//! workspace.

use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use planwise::agent::{Agent, Phase, RunState, StepStatus, TaskFolder};
use planwise::core::{
    AgentConfig, Config, LlmConfig, Message, PlanwiseError, ToolCall, WorkspaceConfig,
};
use planwise::llm::mock::{MockProvider, MockResponse};
use planwise::llm::CompletionClient;
use planwise::tools::{TaskFolders, ToolRegistry, Workspace};

/// Helper to build a config rooted in `root` with no retry delays
fn test_config(root: &Path, replan: bool) -> Config {
    Config {
        llm: LlmConfig {
            max_retries: 1,
            retry_base_delay_ms: 0,
            ..LlmConfig::default()
        },
        agent: AgentConfig {
            replan_after_each_step: replan,
            max_replan_attempts: 3,
            max_tool_rounds: None,
            debug: false,
        },
        workspace: WorkspaceConfig {
            root: root.to_path_buf(),
            output_dir: "output".into(),
        },
    }
}

fn agent(mock: &MockProvider, root: &Path, replan: bool) -> Agent {
    Agent::with_provider(Arc::new(mock.clone()), &test_config(root, replan)).unwrap()
}

fn plan_json(steps: &[&str]) -> String {
    let steps: Vec<_> = steps
        .iter()
        .map(|t| json!({"title": t, "description": format!("do {}", t), "status": "pending"}))
        .collect();
    json!({"thought": "t", "goal": "G", "steps": steps}).to_string()
}

fn task_folders(root: &Path) -> Vec<String> {
    std::fs::read_dir(root.join("output"))
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

/// Full run: plan two steps, use a tool in the first, report
#[tokio::test]
async fn test_full_run_executes_every_step() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockProvider::new().with_responses([
        MockResponse::text(format!("```json\n{}\n```", plan_json(&["A", "B"]))),
        MockResponse::tool_call(
            "call_1",
            "create_file",
            json!({"file_name": "a_summary.md", "file_contents": "# A"}),
        ),
        MockResponse::text("A done"),
        MockResponse::text("B done"),
        MockResponse::text("# Final report"),
    ]);

    let state = agent(&mock, dir.path(), false).run("analyze sales").await.unwrap();

    assert_eq!(state.phase, Phase::Done);
    assert_eq!(state.final_report, "# Final report");
    assert!(state.plan.steps.iter().all(|s| s.status == StepStatus::Completed));
    assert_eq!(
        state.observations(),
        &[Message::assistant("A done"), Message::assistant("B done")]
    );

    // plan, A (2 turns), B, report
    let requests = mock.requests();
    assert_eq!(requests.len(), 5);
    assert!(requests[0].tool_names.is_empty());
    assert_eq!(requests[1].tool_names.len(), 13);
    assert_eq!(requests[4].tool_names.len(), 5);

    // The file landed in the run's single task folder
    let folders = task_folders(dir.path());
    assert_eq!(folders.len(), 1);
    let folder = state.task_folder.path().unwrap();
    assert_eq!(folder, format!("output/{}", folders[0]));
    assert!(dir.path().join(folder).join("a_summary.md").is_file());
}

/// Observations never carry tool results, so later phases start from summaries
#[tokio::test]
async fn test_later_phases_see_no_tool_results() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockProvider::new().with_responses([
        MockResponse::text(plan_json(&["A", "B"])),
        MockResponse::tool_call("call_1", "list_files", json!({})),
        MockResponse::text("A done"),
        MockResponse::text("B done"),
        MockResponse::text("report"),
    ]);

    let state = agent(&mock, dir.path(), false).run("task").await.unwrap();
    assert!(state.observations().iter().all(|m| !m.is_tool_result()));

    let requests = mock.requests();
    // The second turn of step A sees its own tool result
    assert!(requests[2].messages.iter().any(|m| m.is_tool_result()));
    // Step B and the report are seeded without it
    for request in &requests[3..] {
        assert!(request.messages.iter().all(|m| !m.is_tool_result()));
        assert_eq!(request.messages[0], Message::assistant("A done"));
    }
}

/// A plan with no steps goes straight to the report
#[tokio::test]
async fn test_empty_plan_skips_execution() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockProvider::new().with_responses([
        MockResponse::text("prefix ```json\n{\"goal\":\"x\",\"steps\":[]}\n``` suffix"),
        MockResponse::text("nothing to do"),
    ]);

    let state = agent(&mock, dir.path(), false).run("impossible").await.unwrap();

    assert_eq!(state.plan.goal, "x");
    assert!(state.plan.steps.is_empty());
    assert_eq!(state.final_report, "nothing to do");
    assert_eq!(mock.call_count(), 2);
}

/// Re-planning between steps keeps completed work and adopts new steps
#[tokio::test]
async fn test_replan_between_steps() {
    let dir = tempfile::tempdir().unwrap();
    let revised = json!({
        "goal": "",
        "steps": [
            {"title": "A (edited)", "description": "x", "status": "completed"},
            {"title": "C", "description": "do C", "status": "pending"}
        ]
    });
    let mock = MockProvider::new().with_responses([
        MockResponse::text(plan_json(&["A", "B"])),
        MockResponse::text("A done"),
        MockResponse::text(revised.to_string()),
        MockResponse::text("C done"),
        MockResponse::text("report"),
    ]);

    let state = agent(&mock, dir.path(), true).run("task").await.unwrap();

    let titles: Vec<&str> = state.plan.steps.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "C"]);
    assert_eq!(state.plan.goal, "G");
    assert_eq!(state.final_report, "report");

    // The re-planning request is built from the full log, ending with the
    // current plan
    let replan = &mock.requests()[2];
    assert!(replan.tool_names.is_empty());
    let last = replan.messages.last().unwrap();
    assert!(last.content().contains("\"title\": \"B\""));
    assert!(last.content().ends_with("Goal:\nG"));
}

/// Re-planning gives up after the configured number of bad replies
#[tokio::test]
async fn test_replan_gives_up() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockProvider::new().with_responses([
        MockResponse::text(plan_json(&["A", "B"])),
        MockResponse::text("A done"),
        MockResponse::text("no"),
        MockResponse::text("still no"),
        MockResponse::text("never"),
    ]);

    let err = agent(&mock, dir.path(), true).run("task").await.unwrap_err();

    match err {
        PlanwiseError::PlanUpdateFailed { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(mock.remaining(), 0);
}

/// The initial planner does not retry a bad plan
#[tokio::test]
async fn test_unparseable_plan_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockProvider::new().with_responses([
        MockResponse::text("Sure! Here is my plan: step one..."),
        MockResponse::text(plan_json(&["A"])),
    ]);

    let err = agent(&mock, dir.path(), false).run("task").await.unwrap_err();

    assert!(matches!(err, PlanwiseError::PlanParse { .. }));
    assert_eq!(mock.call_count(), 1);
    // The folder was provisioned before planning
    assert_eq!(task_folders(dir.path()).len(), 1);
}

/// Transient provider failures are retried, others end the run
#[tokio::test]
async fn test_provider_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockProvider::new().with_responses([
        MockResponse::Status(503),
        MockResponse::text(plan_json(&[])),
        MockResponse::Status(401),
    ]);

    let err = agent(&mock, dir.path(), false).run("task").await.unwrap_err();

    assert!(matches!(err, PlanwiseError::LlmStatus { status: 401, .. }));
    assert_eq!(mock.call_count(), 3);
}

/// Failing tools are reported to the model, not raised
#[tokio::test]
async fn test_tool_failures_become_results() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockProvider::new().with_responses([
        MockResponse::text(plan_json(&["A"])),
        MockResponse::tool_call("call_1", "read_csv_data", json!({"file_path": "missing.csv"})),
        MockResponse::tool_call("call_2", "send_messages", json!({"messages": "hi"})),
        MockResponse::text("could not read the data"),
        MockResponse::text("report"),
    ]);

    let state = agent(&mock, dir.path(), false).run("task").await.unwrap();
    assert_eq!(state.final_report, "report");

    let requests = mock.requests();
    let csv_result = requests[2].messages.last().unwrap();
    assert!(csv_result.content().contains("\"error\""));
    assert!(csv_result.content().contains("missing.csv"));

    let unknown = requests[3].messages.last().unwrap();
    assert!(unknown.content().contains("Unknown tool: send_messages"));
}

/// The report phase only offers the reporting tools
#[tokio::test]
async fn test_report_rejects_execution_only_tools() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockProvider::new().with_responses([
        MockResponse::text(plan_json(&[])),
        MockResponse::tool_call("call_1", "outlier_detection", json!({})),
        MockResponse::text("report"),
    ]);

    agent(&mock, dir.path(), false).run("task").await.unwrap();

    let result = mock.requests()[2].messages.last().unwrap().clone();
    assert!(result.content().contains("not available in this phase"));
}

/// Data tools write into the run's folder once the model passes it on
#[tokio::test]
async fn test_data_tool_results_land_in_task_folder() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("sales.csv"),
        "city,sales\nBeijing,10\nShanghai,20\nBeijing,5\n",
    )
    .unwrap();
    let mock = MockProvider::new().with_response(MockResponse::text(plan_json(&["Profile"])));
    let agent = agent(&mock, dir.path(), false);

    let mut state = RunState::new("analyze sales");
    assert_eq!(agent.step(&mut state).await.unwrap(), Phase::Execute);
    let folder = state.task_folder.path().unwrap().to_string();

    mock.push(MockResponse::tool_calls(vec![
        ToolCall::new(
            "call_1",
            "data_statistics_analysis",
            json!({"file_path": "sales.csv", "task_folder": folder}),
        ),
        ToolCall::new(
            "call_2",
            "create_visualization",
            json!({
                "file_path": "sales.csv",
                "chart_type": "bar",
                "x_column": "city",
                "y_column": "sales",
                "task_folder": folder
            }),
        ),
    ]));
    mock.push(MockResponse::text("profiled"));
    mock.push(MockResponse::text("report"));

    while !state.phase.is_terminal() {
        agent.step(&mut state).await.unwrap();
    }

    // Both the step prompt and the report instructions name the folder
    let requests = mock.requests();
    let expected = format!("task_folder=\"{}\"", folder);
    assert!(requests[1].messages.last().unwrap().content().contains(&expected));
    let report_system = requests[3]
        .messages
        .iter()
        .find(|m| m.role() == "system")
        .unwrap();
    assert!(report_system.content().contains(&expected));

    let folder_path = dir.path().join(&folder);
    assert!(folder_path.join("statistics_analysis.json").is_file());
    assert!(folder_path.join("bar_city.vl.json").is_file());
    assert!(!dir.path().join("output/bar_city.vl.json").exists());
}

/// A run whose folder cannot be created still finishes, writing to `output/`
#[tokio::test]
async fn test_run_continues_without_task_folder() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();

    let config = test_config(dir.path(), false);
    let mock = MockProvider::new().with_responses([
        MockResponse::text(plan_json(&["A"])),
        MockResponse::tool_call(
            "call_1",
            "create_file",
            json!({"file_name": "a_summary.md", "file_contents": "# A"}),
        ),
        MockResponse::text("A done"),
        MockResponse::text("report"),
    ]);
    let agent = Agent::new(
        CompletionClient::new(Arc::new(mock.clone()), &config.llm),
        ToolRegistry::builtin(Workspace::from_config(&config.workspace)),
        // Directories cannot be created below a regular file
        TaskFolders::new(Workspace::new(blocker.clone(), "output")),
        config.agent.clone(),
    )
    .unwrap();

    let state = agent.run("task").await.unwrap();

    assert_eq!(state.task_folder, TaskFolder::Unavailable);
    assert_eq!(state.final_report, "report");
    assert!(state.plan.is_complete());
    assert!(dir.path().join("output/a_summary.md").is_file());

    let requests = mock.requests();
    assert!(!requests[1].messages.last().unwrap().content().contains("<task_folder>"));
    let result = requests[2].messages.last().unwrap();
    assert!(result.is_tool_result());
    assert!(!result.content().contains("task_folder"));
    assert!(result.content().contains("Successfully created file"));
}
