//! Chat path: provider resolution, handoffs and error responses

use serde_json::json;

use orchestrator::{ChatRequest, OrchestratorError};
use scholar_agent::{ExecutionContext, ExecutionResult, Handoff, JsonMap, ProviderType};

use crate::support::{orchestrator, Reply, ScriptedProvider};

#[tokio::test]
async fn test_routes_to_keyword_owner() {
    let grant = ScriptedProvider::new(ProviderType::Grant).keywords(&["grant", "funding"]).build();
    let writing = ScriptedProvider::new(ProviderType::Writing).keywords(&["draft", "edit"]).build();
    let orchestrator = orchestrator(&[grant.clone(), writing.clone()]);

    let response = orchestrator
        .chat(&ChatRequest::new("Any funding for me?"), &ExecutionContext::default())
        .await
        .unwrap();

    assert_eq!(response.provider_type, ProviderType::Grant);
    assert_eq!(response.content, "grant handled it");
    assert_eq!(response.session_id, "default");
    assert_eq!(response.metadata["status"], "completed");
    assert!(response.metadata["routing_confidence"].as_f64().unwrap() > 0.0);
    assert_eq!(grant.calls(), 1);
    assert_eq!(writing.calls(), 0);
}

#[tokio::test]
async fn test_explicit_provider_skips_routing() {
    let grant = ScriptedProvider::new(ProviderType::Grant).score(1.0).build();
    let writing = ScriptedProvider::new(ProviderType::Writing).build();
    let orchestrator = orchestrator(&[grant.clone(), writing.clone()]);

    let request = ChatRequest::new("Any funding for me?").with_provider("writing").with_session("s-1");
    let response = orchestrator.chat(&request, &ExecutionContext::default()).await.unwrap();

    assert_eq!(response.provider_type, ProviderType::Writing);
    assert_eq!(response.session_id, "s-1");
    assert!(!response.metadata.contains_key("routing_confidence"));
    assert_eq!(grant.calls(), 0);
}

#[tokio::test]
async fn test_unknown_explicit_provider_is_an_error() {
    let orchestrator = orchestrator(&[ScriptedProvider::new(ProviderType::Task).build()]);
    let context = ExecutionContext::default();

    let err = orchestrator
        .chat(&ChatRequest::new("hi").with_provider("astrology"), &context)
        .await
        .unwrap_err();
    assert_eq!(err, OrchestratorError::UnknownProviderType("astrology".to_string()));

    // A real type that simply is not registered
    let err = orchestrator
        .chat(&ChatRequest::new("hi").with_provider("grant"), &context)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown agent type: grant");
}

#[tokio::test]
async fn test_unclaimed_request_falls_back_to_planner() {
    let task = ScriptedProvider::new(ProviderType::Task).keywords(&["todo"]).build();
    let planner = ScriptedProvider::new(ProviderType::Planner).keywords(&["strategy"]).build();
    let orchestrator = orchestrator(&[task.clone(), planner.clone()]);

    let response = orchestrator
        .chat(&ChatRequest::new("hello there"), &ExecutionContext::default())
        .await
        .unwrap();

    assert_eq!(response.provider_type, ProviderType::Planner);
    assert_eq!(planner.calls(), 1);
    assert_eq!(task.calls(), 0);
}

#[tokio::test]
async fn test_no_fallback_provider_means_no_providers_available() {
    let orchestrator = orchestrator(&[ScriptedProvider::new(ProviderType::Task).keywords(&["todo"]).build()]);

    let err = orchestrator
        .chat(&ChatRequest::new("hello there"), &ExecutionContext::default())
        .await
        .unwrap_err();
    assert_eq!(err, OrchestratorError::NoProvidersAvailable);
}

#[tokio::test]
async fn test_configured_default_provider_is_used() {
    let writing = ScriptedProvider::new(ProviderType::Writing).keywords(&["draft"]).build();
    let orchestrator = orchestrator(&[writing.clone()]).with_default_provider(ProviderType::Writing);

    let response = orchestrator
        .chat(&ChatRequest::new("hello there"), &ExecutionContext::default())
        .await
        .unwrap();
    assert_eq!(response.provider_type, ProviderType::Writing);
}

#[tokio::test]
async fn test_pre_execution_handoff_is_followed_once() {
    let planner = ScriptedProvider::new(ProviderType::Planner)
        .score(0.9)
        .handoff_to(ProviderType::Grant)
        .build();
    // Would hand back to the planner if handoffs were chased
    let grant = ScriptedProvider::new(ProviderType::Grant)
        .handoff_to(ProviderType::Planner)
        .build();
    let orchestrator = orchestrator(&[planner.clone(), grant.clone()]);

    let response = orchestrator
        .chat(&ChatRequest::new("find me a grant"), &ExecutionContext::default())
        .await
        .unwrap();

    assert_eq!(response.provider_type, ProviderType::Grant);
    assert_eq!(grant.calls(), 1);
    assert_eq!(planner.calls(), 0);
}

#[tokio::test]
async fn test_handoff_to_unregistered_target_keeps_provider() {
    let planner = ScriptedProvider::new(ProviderType::Planner)
        .score(0.9)
        .handoff_to(ProviderType::Calendar)
        .build();
    let orchestrator = orchestrator(&[planner.clone()]);

    let response = orchestrator
        .chat(&ChatRequest::new("book a slot"), &ExecutionContext::default())
        .await
        .unwrap();

    assert_eq!(response.provider_type, ProviderType::Planner);
    assert_eq!(planner.calls(), 1);
}

#[tokio::test]
async fn test_result_handoff_is_reported_not_followed() {
    let result = ExecutionResult::completed(ProviderType::Project, JsonMap::new())
        .with_output("response", "Your paper is on track")
        .with_handoff(Handoff::new(ProviderType::Project, ProviderType::Research, "Needs a literature check"));
    let project = ScriptedProvider::new(ProviderType::Project)
        .score(0.8)
        .reply(Reply::Respond(result))
        .build();
    let research = ScriptedProvider::new(ProviderType::Research).build();
    let orchestrator = orchestrator(&[project.clone(), research.clone()]);

    let response = orchestrator
        .chat(&ChatRequest::new("status of my paper"), &ExecutionContext::default())
        .await
        .unwrap();

    assert_eq!(response.provider_type, ProviderType::Project);
    assert_eq!(response.content, "Your paper is on track");
    assert_eq!(
        response.metadata["handoff"],
        json!({"to_provider": "research", "reason": "Needs a literature check"})
    );
    assert_eq!(research.calls(), 0);
}

#[tokio::test]
async fn test_failed_execution_becomes_error_response() {
    let task = ScriptedProvider::new(ProviderType::Task).score(0.5).fail("backend down").build();
    let orchestrator = orchestrator(&[task]);

    let response = orchestrator
        .chat(&ChatRequest::new("anything"), &ExecutionContext::default())
        .await
        .unwrap();

    assert_eq!(response.provider_type, ProviderType::Task);
    assert_eq!(
        response.content,
        "I encountered an error processing your request: backend down"
    );
    assert_eq!(response.metadata["status"], "failed");
    assert_eq!(response.metadata["error"], "backend down");
}

#[tokio::test]
async fn test_panicking_provider_becomes_error_response() {
    let grant = ScriptedProvider::new(ProviderType::Grant)
        .score(0.5)
        .reply(Reply::Panic("boom".to_string()))
        .build();
    let orchestrator = orchestrator(&[grant]);

    let response = orchestrator
        .chat(&ChatRequest::new("anything"), &ExecutionContext::default())
        .await
        .unwrap();

    assert_eq!(response.provider_type, ProviderType::Grant);
    assert_eq!(
        response.content,
        "I encountered an error processing your request: Agent panicked: boom"
    );
    assert_eq!(response.metadata["error"], "Agent panicked: boom");
}

#[tokio::test]
async fn test_tool_calls_and_suggestions_are_passed_through() {
    use scholar_agent::types::{SuggestedAction, ToolInvocation};

    let result = ExecutionResult::completed(ProviderType::Task, JsonMap::new())
        .with_output("response", "Found 2 tasks")
        .with_tool_calls(vec![ToolInvocation {
            id: "call_1".to_string(),
            name: "create_task".to_string(),
            arguments: JsonMap::new(),
        }])
        .with_suggested_actions(vec![SuggestedAction::new("View all tasks", "navigate")]);
    let task = ScriptedProvider::new(ProviderType::Task)
        .score(0.5)
        .reply(Reply::Respond(result))
        .build();
    let orchestrator = orchestrator(&[task]);

    let response = orchestrator
        .chat(&ChatRequest::new("tasks from this email"), &ExecutionContext::default())
        .await
        .unwrap();

    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].name, "create_task");
    assert_eq!(response.suggested_actions[0].label, "View all tasks");
}
