//! Forward-request payload and its routing rules.
//!
//! The Coordinator sends a conversation plus routing information. Before any
//! upstream call is made the payload is [`resolve`](RelayPayload::resolve)d:
//! a payload that fails here is terminal and never retried.

use crate::core::error::DomainError;
use crate::stream::chunk::Participant;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Why a payload cannot be relayed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload contains no messages")]
    EmptyMessages,

    #[error("payload has no session_id to route to")]
    MissingSessionId,

    #[error("unknown routing mode '{0}'")]
    UnknownMode(String),

    #[error("unknown battle target '{0}'")]
    UnknownParticipant(String),
}

/// One message of the conversation as the provider expects it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplate {
    pub role: String,
    pub content: String,
    pub attachments: Vec<serde_json::Value>,
    #[serde(
        rename = "participantPosition",
        skip_serializing_if = "Option::is_none"
    )]
    pub participant_position: Option<String>,
}

/// How the provider multiplexes participants in its response stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingMode {
    /// One participant answers.
    #[default]
    DirectChat,
    /// Two participants answer side by side (pairwise comparison).
    Battle,
}

impl RoutingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingMode::DirectChat => "direct_chat",
            RoutingMode::Battle => "battle",
        }
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct_chat" | "direct" => Ok(RoutingMode::DirectChat),
            "battle" => Ok(RoutingMode::Battle),
            other => Err(DomainError::UnknownRoutingMode(other.to_string())),
        }
    }
}

/// Resolved routing: which participant's fragments belong to this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub mode: RoutingMode,
    pub participant: Participant,
}

impl Route {
    /// Whether a fragment tagged with `participant` should be forwarded.
    ///
    /// Untagged fragments always pass; only a multiplexed stream filters.
    pub fn accepts(&self, participant: Option<Participant>) -> bool {
        match (self.mode, participant) {
            (RoutingMode::Battle, Some(p)) => p == self.participant,
            _ => true,
        }
    }
}

/// The provider payload carried by a forward-request.
///
/// Unknown fields are preserved in `extra` and sent upstream untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayPayload {
    pub message_templates: Vec<MessageTemplate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battle_target: Option<String>,
    pub is_image_request: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RelayPayload {
    /// Check preconditions and work out the session's designated participant.
    pub fn resolve(&self) -> Result<Route, PayloadError> {
        if self.message_templates.is_empty() {
            return Err(PayloadError::EmptyMessages);
        }

        if self.routing_session().is_none() {
            return Err(PayloadError::MissingSessionId);
        }

        let mode = match self.mode.as_deref() {
            None => RoutingMode::DirectChat,
            Some(raw) => raw
                .parse()
                .map_err(|_| PayloadError::UnknownMode(raw.to_string()))?,
        };

        // Direct chat always answers as participant a
        let participant = match (mode, self.battle_target.as_deref()) {
            (RoutingMode::DirectChat, _) | (RoutingMode::Battle, None) => Participant::A,
            (RoutingMode::Battle, Some(raw)) => raw
                .parse()
                .map_err(|_| PayloadError::UnknownParticipant(raw.to_string()))?,
        };

        Ok(Route { mode, participant })
    }

    /// The provider-side session the request is routed to, if present.
    pub fn routing_session(&self) -> Option<&str> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
