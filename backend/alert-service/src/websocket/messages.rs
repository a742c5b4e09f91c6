/// Envelope types exchanged over an alert session
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Alert;

/// Server -> client envelopes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established confirmation
    Connected {
        user_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Unread snapshot sent right after `connected`
    UnreadCount { count: usize },

    /// A freshly created alert pushed to the owner's sessions
    Alert { data: Alert },

    /// Reply to a client `mark_read`
    MarkedRead { alert_id: String },

    /// Reply to a client `mark_all_read`
    AllMarkedRead { count: usize },

    /// Reply to a client `ping`
    Pong { timestamp: DateTime<Utc> },

    /// Emitted when a session has been idle for the heartbeat interval
    Heartbeat { timestamp: DateTime<Utc> },
}

impl ServerMessage {
    pub fn connected(user_id: impl Into<String>) -> Self {
        ServerMessage::Connected {
            user_id: user_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn pong() -> Self {
        ServerMessage::Pong {
            timestamp: Utc::now(),
        }
    }

    pub fn heartbeat() -> Self {
        ServerMessage::Heartbeat {
            timestamp: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Client -> server envelopes. Unrecognized kinds deserialize to `Unknown`
/// and are ignored, keeping the protocol forward-compatible; a frame that is
/// not a tagged JSON object at all fails to parse and closes the session.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    MarkRead { alert_id: String },
    MarkAllRead,
    Ping,
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertType, Severity};

    #[test]
    fn test_server_envelope_tags() {
        let msg = ServerMessage::connected("u1");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "connected");
        assert_eq!(value["user_id"], "u1");

        let msg = ServerMessage::UnreadCount { count: 3 };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "unread_count");
        assert_eq!(value["count"], 3);

        let value = serde_json::to_value(ServerMessage::heartbeat()).unwrap();
        assert_eq!(value["type"], "heartbeat");
        assert!(value.get("timestamp").is_some());
    }

    #[test]
    fn test_alert_envelope_nests_alert_under_data() {
        let alert = Alert::custom(
            "u1",
            AlertType::SavingsOpportunity,
            Severity::Info,
            "Save more",
            "Switch plans",
        );
        let msg = ServerMessage::Alert { data: alert.clone() };
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["type"], "alert");
        assert_eq!(value["data"]["alert_id"], alert.alert_id);
        assert_eq!(value["data"]["type"], "savings_opportunity");
    }

    #[test]
    fn test_client_message_parsing() {
        let msg = ClientMessage::from_json(r#"{"type":"mark_read","alert_id":"a1"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::MarkRead {
                alert_id: "a1".to_string()
            }
        );

        assert_eq!(
            ClientMessage::from_json(r#"{"type":"mark_all_read"}"#).unwrap(),
            ClientMessage::MarkAllRead
        );
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"ping"}"#).unwrap(),
            ClientMessage::Ping
        );
    }

    #[test]
    fn test_unrecognized_kind_is_unknown_not_error() {
        let msg = ClientMessage::from_json(r#"{"type":"subscribe_topics"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Unknown);

        // malformed envelope is a hard parse failure
        assert!(ClientMessage::from_json("not json").is_err());
    }
}
