//! Inter-provider message queue through the orchestrator

use serde_json::json;

use orchestrator::{InterAgentMessage, MessageType, Recipient};
use scholar_agent::{ExecutionContext, ProviderType};

use crate::support::{map, orchestrator, ScriptedProvider};

#[test]
fn test_messages_are_queued_then_drained() {
    let task = ScriptedProvider::new(ProviderType::Task).build();
    let orchestrator = orchestrator(&[task.clone()]);
    let context = ExecutionContext::default();

    orchestrator.send_message(
        InterAgentMessage::new(ProviderType::Planner, Recipient::All, MessageType::Broadcast, context.clone())
            .with_content(map(json!({"note": "weekly planning"}))),
    );
    orchestrator.send_message(InterAgentMessage::new(
        ProviderType::Task,
        ProviderType::Grant,
        MessageType::Request,
        context.clone(),
    ));
    orchestrator.send_message(InterAgentMessage::new(
        ProviderType::Grant,
        Recipient::Orchestrator,
        MessageType::Status,
        context,
    ));

    assert_eq!(orchestrator.pending_messages(), 3);
    assert_eq!(orchestrator.process_messages(), 3);
    assert_eq!(orchestrator.pending_messages(), 0);
    assert_eq!(orchestrator.process_messages(), 0);

    // Queueing never dispatches to providers
    assert_eq!(task.calls(), 0);
}

#[test]
fn test_message_round_trips_through_json() {
    let message = InterAgentMessage::new(
        ProviderType::Project,
        Recipient::All,
        MessageType::Handoff,
        ExecutionContext::new("s", "w", "u"),
    );

    let value = serde_json::to_value(&message).unwrap();
    assert_eq!(value["recipient"], "all");
    assert_eq!(value["message_type"], "handoff");
    assert_eq!(value["priority"], 5);

    let back: InterAgentMessage = serde_json::from_value(value).unwrap();
    assert_eq!(back.recipient, Recipient::All);
    assert_eq!(back.context.session_id, "s");
}
