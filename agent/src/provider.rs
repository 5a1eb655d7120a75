//! Capability provider contract
//!
//! A provider is a polymorphic unit the orchestrator can route to. It
//! plans, executes, scores its own applicability to a request and may
//! ask for the request to be handed to another provider.

use async_trait::async_trait;

use crate::types::{ExecutionContext, ExecutionResult, Handoff, Plan, ProviderDescriptor, ProviderType};

/// Minimum keyword confidence for a provider to claim a request
pub const KEYWORD_CONFIDENCE_THRESHOLD: f32 = 0.2;

/// Trait implemented by every capability provider
#[async_trait]
pub trait Provider: Send + Sync {
    /// Static description: type, name, capabilities, routing keywords
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Registry key
    fn provider_type(&self) -> ProviderType {
        self.descriptor().provider_type
    }

    /// Produce an advisory plan for the request
    async fn plan(&self, request: &str, context: &ExecutionContext) -> Plan;

    /// Execute the request.
    ///
    /// Must always return a terminal status. Backend failures are reported
    /// as `ExecutionStatus::Failed` with error text, never propagated.
    async fn execute(&self, request: &str, context: &ExecutionContext, plan: Option<&Plan>) -> ExecutionResult;

    /// Score applicability of the request: `(claims_request, confidence in [0, 1])`
    async fn can_handle(&self, request: &str, _context: &ExecutionContext) -> (bool, f32) {
        keyword_confidence(&self.descriptor().keywords, request)
    }

    /// Decide, before execution, whether another provider should take over
    fn should_handoff(&self, _request: &str, _context: &ExecutionContext) -> Option<Handoff> {
        None
    }
}

/// Default routing score: fraction of keywords contained in the request
pub fn keyword_confidence(keywords: &[String], request: &str) -> (bool, f32) {
    let request = request.to_lowercase();
    let matches = keywords.iter().filter(|kw| request.contains(kw.as_str())).count();
    let confidence = (matches as f32 / keywords.len().max(1) as f32).min(1.0);

    (confidence > KEYWORD_CONFIDENCE_THRESHOLD, confidence)
}

/// True when any of the keywords occurs in the lowercased request
pub fn mentions_any(request_lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| request_lower.contains(kw))
}
