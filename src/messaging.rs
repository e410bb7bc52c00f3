//! Inter-context message types
//!
//! These mirror the JSON shapes exchanged between the coordinator, page
//! agents and the broadcast channels. Delivery is never guaranteed: a
//! receiver may not be loaded yet, which surfaces as
//! [`MessageError::NoListener`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::site::Site;

/// Messaging failures. Neither is fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// Nobody answered (agent not loaded, wrong page, or it declined)
    #[error("No listener for message")]
    NoListener,
    /// The sending context was invalidated by an extension reload/update
    #[error("Extension context invalidated")]
    ContextInvalidated,
}

/// Style action sent from the coordinator to a page agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentAction {
    ApplyTwitterStyles,
    RemoveTwitterStyles,
    ApplyYoutubeStyles,
    RemoveYoutubeStyles,
}

impl AgentAction {
    pub fn site(&self) -> Site {
        match self {
            AgentAction::ApplyTwitterStyles | AgentAction::RemoveTwitterStyles => Site::Twitter,
            AgentAction::ApplyYoutubeStyles | AgentAction::RemoveYoutubeStyles => Site::YouTube,
        }
    }

    /// Whether the action turns styles on
    pub fn enables(&self) -> bool {
        matches!(
            self,
            AgentAction::ApplyTwitterStyles | AgentAction::ApplyYoutubeStyles
        )
    }
}

/// `{action}` request envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub action: AgentAction,
}

impl AgentMessage {
    pub fn new(action: AgentAction) -> Self {
        Self { action }
    }
}

/// `{success}` response envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub success: bool,
}

impl AgentResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }

    pub fn failed() -> Self {
        Self { success: false }
    }
}

/// Platform-level keyboard command, also used by page agents when they
/// forward a matched shortcut to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    ToggleYoutubeStyle,
    ToggleTwitterStyle,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::ToggleYoutubeStyle => "toggle-youtube-style",
            Command::ToggleTwitterStyle => "toggle-twitter-style",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "toggle-youtube-style" => Some(Command::ToggleYoutubeStyle),
            "toggle-twitter-style" => Some(Command::ToggleTwitterStyle),
            _ => None,
        }
    }

    pub fn site(&self) -> Site {
        match self {
            Command::ToggleYoutubeStyle => Site::YouTube,
            Command::ToggleTwitterStyle => Site::Twitter,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request sent by a page agent to the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorRequest {
    pub action: Command,
}

/// Cross-tab broadcast payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastAction {
    Enable,
    Disable,
}

impl BroadcastAction {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            BroadcastAction::Enable
        } else {
            BroadcastAction::Disable
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub action: BroadcastAction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_message_wire_format() {
        let msg = AgentMessage::new(AgentAction::ApplyYoutubeStyles);
        assert_eq!(
            serde_json::to_value(msg).unwrap(),
            json!({ "action": "apply-youtube-styles" })
        );

        let parsed: AgentMessage =
            serde_json::from_value(json!({ "action": "remove-twitter-styles" })).unwrap();
        assert_eq!(parsed.action, AgentAction::RemoveTwitterStyles);
        assert_eq!(parsed.action.site(), Site::Twitter);
        assert!(!parsed.action.enables());
    }

    #[test]
    fn test_unknown_action_rejected() {
        let parsed = serde_json::from_value::<AgentMessage>(json!({ "action": "explode" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_broadcast_wire_format() {
        let msg = BroadcastMessage {
            action: BroadcastAction::from_enabled(false),
        };
        assert_eq!(
            serde_json::to_value(msg).unwrap(),
            json!({ "action": "disable" })
        );
    }

    #[test]
    fn test_command_names() {
        for command in [Command::ToggleYoutubeStyle, Command::ToggleTwitterStyle] {
            assert_eq!(Command::parse(command.as_str()), Some(command));
            assert_eq!(
                serde_json::to_value(command).unwrap(),
                json!(command.as_str())
            );
        }
        assert_eq!(Command::parse("toggle-everything"), None);
    }
}
