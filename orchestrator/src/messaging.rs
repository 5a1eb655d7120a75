//! Inter-provider message queue
//!
//! Messages are buffered FIFO and drained by `process_messages`. Delivery
//! to recipients is not dispatched anywhere yet; draining only logs.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scholar_agent::{ExecutionContext, JsonMap, ProviderType};

use crate::error::OrchestratorError;

/// Who a message is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Recipient {
    Provider(ProviderType),
    Orchestrator,
    All,
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Provider(provider_type) => f.write_str(provider_type.as_str()),
            Recipient::Orchestrator => f.write_str("orchestrator"),
            Recipient::All => f.write_str("all"),
        }
    }
}

impl FromStr for Recipient {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "orchestrator" => Ok(Recipient::Orchestrator),
            "all" => Ok(Recipient::All),
            other => other
                .parse()
                .map(Recipient::Provider)
                .map_err(|_| OrchestratorError::UnknownProviderType(s.to_string())),
        }
    }
}

impl TryFrom<String> for Recipient {
    type Error = OrchestratorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Recipient> for String {
    fn from(value: Recipient) -> Self {
        value.to_string()
    }
}

impl From<ProviderType> for Recipient {
    fn from(value: ProviderType) -> Self {
        Recipient::Provider(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Request,
    Response,
    Broadcast,
    Handoff,
    Status,
}

fn default_priority() -> u8 {
    5
}

/// A message exchanged between providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterAgentMessage {
    pub id: String,
    pub sender: ProviderType,
    pub recipient: Recipient,
    pub message_type: MessageType,
    #[serde(default)]
    pub content: JsonMap,
    pub context: ExecutionContext,
    /// 1 (highest) to 10
    #[serde(default = "default_priority")]
    pub priority: u8,
    pub timestamp: DateTime<Utc>,
}

impl InterAgentMessage {
    pub fn new(
        sender: ProviderType,
        recipient: impl Into<Recipient>,
        message_type: MessageType,
        context: ExecutionContext,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            recipient: recipient.into(),
            message_type,
            content: JsonMap::new(),
            context,
            priority: default_priority(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_content(mut self, content: JsonMap) -> Self {
        self.content = content;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(1, 10);
        self
    }
}

/// FIFO buffer of pending messages
#[derive(Debug, Default)]
pub struct MessageQueue {
    pending: Mutex<VecDeque<InterAgentMessage>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: InterAgentMessage) {
        self.lock().push_back(message);
    }

    /// Remove and return every pending message, oldest first
    pub fn drain(&self) -> Vec<InterAgentMessage> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<InterAgentMessage>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}
