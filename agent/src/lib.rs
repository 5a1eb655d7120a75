//! Capability providers for the ScholarOS orchestrator
//!
//! Defines the provider contract, the data exchanged with the orchestrator,
//! the text-generation backend seam and the built-in persona providers.

pub mod config;
pub mod llm;
pub mod parsers;
pub mod personas;
pub mod provider;
pub mod types;

pub use provider::Provider;
pub use types::{
    ExecutionContext, ExecutionResult, ExecutionStatus, Handoff, JsonMap, Plan, ProviderDescriptor, ProviderInfo,
    ProviderType,
};
