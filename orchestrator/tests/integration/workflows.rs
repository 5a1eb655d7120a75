//! Workflow engine: ordering, conditions, templates, retries, timeouts and fallbacks

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use orchestrator::{
    builtin_workflows, ErrorHandling, ErrorPolicy, ExecutionStore, InMemoryExecutionStore, StepStatus, WorkflowCondition,
    WorkflowDefinition, WorkflowStatus, WorkflowStep, MAX_STEP_RETRIES,
};
use scholar_agent::{ExecutionContext, JsonMap, ProviderType};

use crate::support::{map, orchestrator, Reply, ScriptedProvider};

fn run_input() -> JsonMap {
    JsonMap::new()
}

#[tokio::test]
async fn test_steps_run_in_dependency_order() {
    let task = ScriptedProvider::new(ProviderType::Task).build();
    let orchestrator = orchestrator(&[task.clone()]);

    // Declared out of order on purpose
    let workflow = WorkflowDefinition::new("chain", "Chain")
        .with_step(WorkflowStep::new("c", ProviderType::Task, "third").depends_on(["a", "b"]))
        .with_step(WorkflowStep::new("b", ProviderType::Task, "second").depends_on(["a"]))
        .with_step(WorkflowStep::new("a", ProviderType::Task, "first"));

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Completed);
    let recorded: Vec<&str> = response.results.keys().map(String::as_str).collect();
    assert_eq!(recorded, vec!["a", "b", "c"]);

    let actions: Vec<String> = task.requests();
    assert!(actions[0].starts_with("Execute action 'first'"));
    assert!(actions[2].starts_with("Execute action 'third'"));
}

#[tokio::test]
async fn test_cycle_fails_before_any_step_runs() {
    let task = ScriptedProvider::new(ProviderType::Task).build();
    let orchestrator = orchestrator(&[task.clone()]);

    let workflow = WorkflowDefinition::new("loop", "Loop")
        .with_step(WorkflowStep::new("start", ProviderType::Task, "act"))
        .with_step(WorkflowStep::new("a", ProviderType::Task, "act").depends_on(["b"]))
        .with_step(WorkflowStep::new("b", ProviderType::Task, "act").depends_on(["a"]));

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Failed);
    assert_eq!(response.error.as_deref(), Some("Circular dependency detected in workflow steps"));
    assert!(response.results.is_empty());
    assert_eq!(task.calls(), 0);
}

#[tokio::test]
async fn test_retry_succeeds_on_third_attempt() {
    let grant = ScriptedProvider::new(ProviderType::Grant)
        .fail("attempt 1")
        .fail("attempt 2")
        .complete(json!({"fit": "strong"}))
        .build();
    let orchestrator = orchestrator(&[grant.clone()]);

    let workflow = WorkflowDefinition::new("retry", "Retry")
        .with_step(WorkflowStep::new("fit", ProviderType::Grant, "analyze_fit").with_retries(2));

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Completed);
    let fit = &response.results["fit"];
    assert_eq!(fit.status, StepStatus::Completed);
    assert_eq!(fit.output["fit"], "strong");
    assert!(fit.error.is_none());
    assert_eq!(grant.calls(), 3);
}

#[tokio::test]
async fn test_retry_exhaustion_keeps_last_error() {
    let grant = ScriptedProvider::new(ProviderType::Grant)
        .fail("first failure")
        .fail("second failure")
        .build();
    let orchestrator = orchestrator(&[grant.clone()]);

    let workflow = WorkflowDefinition::new("retry", "Retry").with_step(
        WorkflowStep::new("fit", ProviderType::Grant, "analyze_fit")
            .with_retries(1)
            .with_on_error(ErrorPolicy::Skip),
    );

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    // Skip absorbs the failure
    assert_eq!(response.status, WorkflowStatus::Completed);
    let fit = &response.results["fit"];
    assert_eq!(fit.status, StepStatus::Failed);
    assert_eq!(fit.error.as_deref(), Some("second failure"));
    assert_eq!(grant.calls(), 2);
}

#[tokio::test]
async fn test_unbounded_retries_are_capped() {
    let mut grant = ScriptedProvider::new(ProviderType::Grant);
    for attempt in 0..=MAX_STEP_RETRIES + 5 {
        grant = grant.fail(&format!("failure {}", attempt));
    }
    let grant = grant.build();
    let orchestrator = orchestrator(&[grant.clone()]);

    let workflow = WorkflowDefinition::new("retry", "Retry").with_step(
        WorkflowStep::new("fit", ProviderType::Grant, "analyze_fit").with_retries(u32::MAX),
    );

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Failed);
    assert_eq!(grant.calls(), MAX_STEP_RETRIES as usize + 1);
    assert_eq!(
        response.results["fit"].error.as_deref(),
        Some(format!("failure {}", MAX_STEP_RETRIES).as_str())
    );
}

#[tokio::test]
async fn test_failing_step_aborts_with_partial_results() {
    let task = ScriptedProvider::new(ProviderType::Task)
        .complete(json!({"ok": true}))
        .fail("backend down")
        .build();
    let orchestrator = orchestrator(&[task.clone()]);

    let workflow = WorkflowDefinition::new("abort", "Abort")
        .with_step(WorkflowStep::new("one", ProviderType::Task, "act"))
        .with_step(WorkflowStep::new("two", ProviderType::Task, "act").depends_on(["one"]))
        .with_step(WorkflowStep::new("three", ProviderType::Task, "act").depends_on(["two"]));

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Failed);
    assert_eq!(response.error.as_deref(), Some("Step failed: two - backend down"));
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results["one"].status, StepStatus::Completed);
    assert_eq!(response.results["two"].status, StepStatus::Failed);
    assert_eq!(task.calls(), 2);
}

#[tokio::test]
async fn test_step_output_flows_into_later_input() {
    let task = ScriptedProvider::new(ProviderType::Task).complete(json!({"x": "42"})).build();
    let writing = ScriptedProvider::new(ProviderType::Writing).build();
    let orchestrator = orchestrator(&[task, writing.clone()]);

    let workflow = WorkflowDefinition::new("flow", "Flow")
        .with_step(WorkflowStep::new("a", ProviderType::Task, "produce"))
        .with_step(
            WorkflowStep::new("b", ProviderType::Writing, "consume")
                .with_input("value", "{{steps.a.output.x}}")
                .with_input("topic", "{{input.topic}}")
                .depends_on(["a"]),
        );

    let input = map(json!({"topic": "grants"}));
    let response = orchestrator
        .orchestrate(&workflow, &input, &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Completed);
    assert_eq!(
        writing.requests(),
        vec![r#"Execute action 'consume' with parameters: {"topic":"grants","value":"42"}"#.to_string()]
    );
}

#[tokio::test]
async fn test_reference_to_failed_step_resolves_empty() {
    let task = ScriptedProvider::new(ProviderType::Task).fail("no output").build();
    let writing = ScriptedProvider::new(ProviderType::Writing).build();
    let orchestrator = orchestrator(&[task, writing.clone()]);

    let workflow = WorkflowDefinition::new("flow", "Flow")
        .with_step(WorkflowStep::new("a", ProviderType::Task, "produce").with_on_error(ErrorPolicy::Skip))
        .with_step(
            WorkflowStep::new("b", ProviderType::Writing, "consume")
                .with_input("value", "{{steps.a.output.x}}")
                .with_input("missing", "{{steps.ghost.output.x}}"),
        );

    orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(
        writing.requests(),
        vec![r#"Execute action 'consume' with parameters: {"missing":"","value":""}"#.to_string()]
    );
}

#[tokio::test]
async fn test_fallback_result_replaces_primary() {
    let grant = ScriptedProvider::new(ProviderType::Grant)
        .fail("primary down")
        .fail("primary down")
        .build();
    let planner = ScriptedProvider::new(ProviderType::Planner)
        .complete(json!({"response": "fallback answer"}))
        .build();
    let orchestrator = orchestrator(&[grant.clone(), planner.clone()]);

    let workflow = WorkflowDefinition::new("fallback", "Fallback").with_step(
        WorkflowStep::new("fit", ProviderType::Grant, "analyze_fit")
            .with_retries(1)
            .with_on_error(ErrorPolicy::Fallback)
            .with_fallback(ProviderType::Planner),
    );

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Completed);
    assert_eq!(response.results.len(), 1);
    let fit = &response.results["fit"];
    assert_eq!(fit.status, StepStatus::Completed);
    assert_eq!(fit.step_id, "fit_fallback");
    assert_eq!(fit.provider_type, ProviderType::Planner);
    assert_eq!(fit.output["response"], "fallback answer");
    assert_eq!(grant.calls(), 2);
    assert_eq!(planner.calls(), 1);
}

#[tokio::test]
async fn test_failed_fallback_still_overwrites_and_runs_once() {
    let grant = (0..4)
        .fold(ScriptedProvider::new(ProviderType::Grant), |p, _| p.fail("primary down"))
        .build();
    let planner = ScriptedProvider::new(ProviderType::Planner).fail("fallback down").build();
    let orchestrator = orchestrator(&[grant, planner.clone()]);

    let workflow = WorkflowDefinition::new("fallback", "Fallback")
        .with_step(
            WorkflowStep::new("fit", ProviderType::Grant, "analyze_fit")
                .with_retries(3)
                .with_on_error(ErrorPolicy::Fallback)
                .with_fallback(ProviderType::Planner),
        )
        .with_step(WorkflowStep::new("after", ProviderType::Planner, "summarize"));

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    let fit = &response.results["fit"];
    assert_eq!(fit.status, StepStatus::Failed);
    assert_eq!(fit.error.as_deref(), Some("fallback down"));
    assert_eq!(fit.provider_type, ProviderType::Planner);
    // One fallback attempt, then the unrelated "after" step
    assert_eq!(planner.calls(), 2);
    assert_eq!(response.status, WorkflowStatus::Completed);
}

#[tokio::test]
async fn test_false_condition_records_skip_and_unblocks_dependents() {
    let task = ScriptedProvider::new(ProviderType::Task).fail("no luck").build();
    let writing = ScriptedProvider::new(ProviderType::Writing).build();
    let orchestrator = orchestrator(&[task, writing.clone()]);

    let workflow = WorkflowDefinition::new("cond", "Conditional")
        .with_step(WorkflowStep::new("a", ProviderType::Task, "try").with_on_error(ErrorPolicy::Skip))
        .with_step(
            WorkflowStep::new("b", ProviderType::Writing, "celebrate")
                .with_condition(WorkflowCondition::if_completed("steps.a")),
        )
        .with_step(
            WorkflowStep::new("c", ProviderType::Writing, "recover")
                .with_condition(WorkflowCondition::unless_completed("steps.a")),
        )
        .with_step(WorkflowStep::new("d", ProviderType::Writing, "wrap_up").depends_on(["b"]));

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Completed);
    assert_eq!(response.results["b"].status, StepStatus::Skipped);
    assert_eq!(response.results["c"].status, StepStatus::Completed);
    assert_eq!(response.results["d"].status, StepStatus::Completed);
    assert_eq!(writing.calls(), 2);
}

#[tokio::test]
async fn test_unmet_dependency_under_fail_fast_aborts() {
    let task = ScriptedProvider::new(ProviderType::Task).fail("boom").build();
    let orchestrator = orchestrator(&[task]);

    let workflow = WorkflowDefinition::new("deps", "Deps")
        .with_step(WorkflowStep::new("a", ProviderType::Task, "act").with_on_error(ErrorPolicy::Skip))
        .with_step(WorkflowStep::new("b", ProviderType::Task, "act").depends_on(["a"]));

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Failed);
    assert_eq!(response.error.as_deref(), Some("Dependencies not met for step: b"));
    assert!(!response.results.contains_key("b"));
}

#[tokio::test]
async fn test_unmet_dependency_under_continue_is_passed_over() {
    let task = ScriptedProvider::new(ProviderType::Task).fail("boom").build();
    let orchestrator = orchestrator(&[task.clone()]);

    let workflow = WorkflowDefinition::new("deps", "Deps")
        .with_error_handling(ErrorHandling::Continue)
        .with_step(WorkflowStep::new("a", ProviderType::Task, "act").with_on_error(ErrorPolicy::Skip))
        .with_step(WorkflowStep::new("b", ProviderType::Task, "act").depends_on(["a"]))
        .with_step(WorkflowStep::new("c", ProviderType::Task, "act").depends_on(["b"]))
        .with_step(WorkflowStep::new("d", ProviderType::Task, "act"));

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Completed);
    let recorded: Vec<&str> = response.results.keys().map(String::as_str).collect();
    assert_eq!(recorded, vec!["a", "d"]);
    assert_eq!(task.calls(), 2);
}

#[tokio::test]
async fn test_unregistered_step_provider_fails_the_step() {
    let orchestrator = orchestrator(&[ScriptedProvider::new(ProviderType::Task).build()]);

    let workflow = WorkflowDefinition::new("missing", "Missing")
        .with_step(WorkflowStep::new("a", ProviderType::Calendar, "book").with_on_error(ErrorPolicy::Skip));

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.results["a"].error.as_deref(), Some("Unknown agent: calendar"));
}

#[tokio::test]
async fn test_panicking_step_is_a_failed_attempt() {
    let research = ScriptedProvider::new(ProviderType::Research)
        .reply(Reply::Panic("index corrupted".to_string()))
        .complete(json!({"papers": 3}))
        .build();
    let orchestrator = orchestrator(&[research.clone()]);

    let workflow = WorkflowDefinition::new("panic", "Panic")
        .with_step(WorkflowStep::new("search", ProviderType::Research, "search").with_retries(1));

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Completed);
    assert_eq!(response.results["search"].output["papers"], 3);
    assert_eq!(research.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_step_timeout_consumes_attempts() {
    let calendar = ScriptedProvider::new(ProviderType::Calendar)
        .reply(Reply::Sleep(Duration::from_secs(60), JsonMap::new()))
        .reply(Reply::Sleep(Duration::from_secs(60), JsonMap::new()))
        .build();
    let orchestrator = orchestrator(&[calendar.clone()]);

    let workflow = WorkflowDefinition::new("slow", "Slow").with_step(
        WorkflowStep::new("book", ProviderType::Calendar, "find_slot")
            .with_timeout(5)
            .with_retries(1),
    );

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Failed);
    assert_eq!(response.error.as_deref(), Some("Step failed: book - Step timed out"));
    assert_eq!(response.results["book"].error.as_deref(), Some("Step timed out"));
    assert_eq!(calendar.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_default_step_timeout_applies() {
    let calendar = ScriptedProvider::new(ProviderType::Calendar)
        .reply(Reply::Sleep(Duration::from_secs(30), JsonMap::new()))
        .build();
    let orchestrator = orchestrator(&[calendar]).with_step_timeout(Duration::from_secs(10));

    let workflow = WorkflowDefinition::new("slow", "Slow")
        .with_step(WorkflowStep::new("book", ProviderType::Calendar, "find_slot").with_on_error(ErrorPolicy::Skip));

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.results["book"].error.as_deref(), Some("Step timed out"));
}

#[tokio::test(start_paused = true)]
async fn test_zero_default_step_timeout_keeps_builtin_default() {
    let calendar = ScriptedProvider::new(ProviderType::Calendar)
        .reply(Reply::Sleep(Duration::from_secs(30), map(json!({"slot": "Friday 10:00"}))))
        .build();
    let orchestrator = orchestrator(&[calendar]).with_step_timeout(Duration::ZERO);

    let workflow = WorkflowDefinition::new("slow", "Slow")
        .with_step(WorkflowStep::new("book", ProviderType::Calendar, "find_slot"));

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Completed);
    assert_eq!(response.results["book"].output["slot"], "Friday 10:00");
}

#[tokio::test(start_paused = true)]
async fn test_workflow_timeout_stops_before_next_step() {
    let writing = ScriptedProvider::new(ProviderType::Writing)
        .reply(Reply::Sleep(Duration::from_secs(20), JsonMap::new()))
        .build();
    let orchestrator = orchestrator(&[writing.clone()]);

    let workflow = WorkflowDefinition::new("budget", "Budget")
        .with_timeout(10)
        .with_step(WorkflowStep::new("draft", ProviderType::Writing, "draft").with_timeout(60))
        .with_step(WorkflowStep::new("edit", ProviderType::Writing, "edit").depends_on(["draft"]));

    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Failed);
    assert_eq!(response.error.as_deref(), Some("Workflow timed out after 10s"));
    assert_eq!(response.results["draft"].status, StepStatus::Completed);
    assert!(!response.results.contains_key("edit"));
    assert_eq!(writing.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_status_visible_while_running_and_removed_after() {
    let project = ScriptedProvider::new(ProviderType::Project)
        .reply(Reply::Sleep(Duration::from_secs(30), JsonMap::new()))
        .build();
    let store = Arc::new(InMemoryExecutionStore::new());
    let orchestrator = Arc::new(orchestrator(&[project]).with_execution_store(store.clone()));

    let workflow = WorkflowDefinition::new("weekly", "Weekly")
        .with_step(WorkflowStep::new("summarize", ProviderType::Project, "summarize_all"));

    let running = {
        let orchestrator = orchestrator.clone();
        let workflow = workflow.clone();
        tokio::spawn(async move {
            orchestrator
                .orchestrate(&workflow, &JsonMap::new(), &ExecutionContext::new("s-9", "w", "u"))
                .await
        })
    };

    let execution_id = loop {
        if let Some(id) = store.active_ids().into_iter().next() {
            break id;
        }
        tokio::task::yield_now().await;
    };

    let snapshot = orchestrator.get_workflow_status(&execution_id).unwrap();
    assert_eq!(snapshot.status, WorkflowStatus::Running);
    assert_eq!(snapshot.workflow_id, "weekly");
    assert_eq!(snapshot.session_id, "s-9");
    assert_eq!(snapshot.current_step.as_deref(), Some("summarize"));

    let response = running.await.unwrap();
    assert_eq!(response.execution_id, execution_id);
    assert_eq!(response.status, WorkflowStatus::Completed);
    assert!(orchestrator.get_workflow_status(&execution_id).is_none());
    assert!(store.active_ids().is_empty());
}

#[tokio::test]
async fn test_failed_run_is_also_removed() {
    let orchestrator = orchestrator(&[ScriptedProvider::new(ProviderType::Task).fail("boom").build()]);

    let workflow = WorkflowDefinition::new("fails", "Fails").with_step(WorkflowStep::new("a", ProviderType::Task, "act"));
    let response = orchestrator
        .orchestrate(&workflow, &run_input(), &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Failed);
    assert!(orchestrator.get_workflow_status(&response.execution_id).is_none());
}

#[tokio::test]
async fn test_builtin_email_to_tasks_pipes_extracted_tasks() {
    let task = ScriptedProvider::new(ProviderType::Task)
        .complete(json!({"tasks": ["Send slides", "Book room"]}))
        .complete(json!({"prioritized": true}))
        .build();
    let orchestrator = orchestrator(&[task.clone()]);

    let workflows = builtin_workflows();
    let input = map(json!({"email_content": "Please send slides and book a room"}));
    let response = orchestrator
        .orchestrate(&workflows["email-to-tasks"], &input, &ExecutionContext::default())
        .await;

    assert_eq!(response.status, WorkflowStatus::Completed);
    let requests = task.requests();
    assert_eq!(
        requests[0],
        r#"Execute action 'extract_tasks' with parameters: {"text":"Please send slides and book a room"}"#
    );
    assert_eq!(
        requests[1],
        r#"Execute action 'prioritize_tasks' with parameters: {"tasks":"[\"Send slides\",\"Book room\"]"}"#
    );
}
