//! Inline tool directive parsing
//!
//! Backends request tools inline as `[TOOL:name]{...json args...}`.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{JsonMap, ToolInvocation};

static TOOL_DIRECTIVE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[TOOL:(\w+)\]\s*(\{[^}]+\})").expect("Invalid tool directive regex")
});

/// Extract tool invocations from backend output.
///
/// Directives whose arguments are not a valid JSON object are skipped.
pub fn parse_tool_directives(text: &str) -> Vec<ToolInvocation> {
    TOOL_DIRECTIVE_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps[1].to_string();
            match serde_json::from_str::<JsonMap>(&caps[2]) {
                Ok(arguments) => Some(ToolInvocation {
                    id: format!("call_{}", &uuid::Uuid::new_v4().simple().to_string()[..8]),
                    name,
                    arguments,
                }),
                Err(e) => {
                    tracing::warn!("Failed to parse tool call arguments for {}: {}", name, e);
                    None
                }
            }
        })
        .collect()
}
