//! Realtime change-feed frames (Phoenix channel protocol, `postgres_changes`).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const DEFAULT_SCHEMA: &str = "public";
pub const HEARTBEAT_TOPIC: &str = "phoenix";

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixFrame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl PhoenixFrame {
    pub fn join(
        topic: &str,
        filter: &ChangeFilter,
        access_token: Option<&str>,
        reference: u64,
    ) -> Self {
        let mut payload = json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [filter.to_config()],
            }
        });
        if let Some(token) = access_token {
            payload["access_token"] = Value::String(token.to_string());
        }
        Self {
            topic: topic.to_string(),
            event: EVENT_JOIN.to_string(),
            payload,
            reference: Some(reference.to_string()),
        }
    }

    pub fn leave(topic: &str, reference: u64) -> Self {
        Self {
            topic: topic.to_string(),
            event: EVENT_LEAVE.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    pub fn heartbeat(reference: u64) -> Self {
        Self {
            topic: HEARTBEAT_TOPIC.to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }
}

/// Row-level event kinds a subscription can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "*")]
    Any,
}

/// Which table rows a subscription is notified about, with an optional
/// single-column equality filter (`column=eq.value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub event: ChangeKind,
    pub schema: String,
    pub table: String,
    pub filter: Option<String>,
}

impl ChangeFilter {
    pub fn new(event: ChangeKind, table: impl Into<String>) -> Self {
        Self {
            event,
            schema: DEFAULT_SCHEMA.to_string(),
            table: table.into(),
            filter: None,
        }
    }

    pub fn inserts(table: impl Into<String>) -> Self {
        Self::new(ChangeKind::Insert, table)
    }

    pub fn updates(table: impl Into<String>) -> Self {
        Self::new(ChangeKind::Update, table)
    }

    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.filter = Some(format!("{column}=eq.{value}"));
        self
    }

    pub fn to_config(&self) -> Value {
        let mut config = json!({
            "event": self.event,
            "schema": self.schema,
            "table": self.table,
        });
        if let Some(filter) = &self.filter {
            config["filter"] = Value::String(filter.clone());
        }
        config
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        (self.event == ChangeKind::Any || self.event == event.kind) && self.table == event.table
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub record: Value,
    #[serde(default)]
    pub old_record: Option<Value>,
    #[serde(default)]
    pub commit_timestamp: Option<String>,
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

/// Incoming frame, classified by what the subscriber has to do with it.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeMessage {
    Reply { status: String, response: Value },
    Change(ChangeEvent),
    Closed,
    Error(String),
    Other,
}

impl RealtimeMessage {
    pub fn classify(frame: &PhoenixFrame) -> Self {
        match frame.event.as_str() {
            EVENT_REPLY => Self::Reply {
                status: frame
                    .payload
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                response: frame.payload.get("response").cloned().unwrap_or(Value::Null),
            },
            EVENT_POSTGRES_CHANGES => {
                let data = frame.payload.get("data").cloned().unwrap_or(Value::Null);
                match serde_json::from_value::<ChangeEvent>(data) {
                    Ok(change) => Self::Change(change),
                    Err(err) => Self::Error(format!("malformed change payload: {err}")),
                }
            }
            EVENT_CLOSE => Self::Closed,
            EVENT_ERROR => Self::Error(frame.payload.to_string()),
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_frame_carries_filtered_postgres_changes_config() {
        let filter = ChangeFilter::inserts("messages").eq("channel_id", 42);
        let frame = PhoenixFrame::join("realtime:messages:42", &filter, Some("jwt"), 1);
        let encoded = serde_json::to_value(&frame).expect("encode");

        assert_eq!(encoded["event"], "phx_join");
        assert_eq!(encoded["ref"], "1");
        assert_eq!(encoded["payload"]["access_token"], "jwt");
        let change = &encoded["payload"]["config"]["postgres_changes"][0];
        assert_eq!(change["event"], "INSERT");
        assert_eq!(change["schema"], "public");
        assert_eq!(change["table"], "messages");
        assert_eq!(change["filter"], "channel_id=eq.42");
    }

    #[test]
    fn unfiltered_config_omits_filter_key() {
        let config = ChangeFilter::updates("users").to_config();
        assert_eq!(config["event"], "UPDATE");
        assert!(config.get("filter").is_none());
    }

    #[test]
    fn classifies_change_frame() {
        let frame: PhoenixFrame = serde_json::from_str(
            r#"{"topic":"realtime:users-status","event":"postgres_changes","ref":null,
                "payload":{"ids":[9],"data":{"type":"UPDATE","schema":"public","table":"users",
                "record":{"status":"ONLINE"},"old_record":{"id":"a"},"commit_timestamp":"2024-01-01T00:00:00Z"}}}"#,
        )
        .expect("parse frame");

        let RealtimeMessage::Change(change) = RealtimeMessage::classify(&frame) else {
            panic!("expected change");
        };
        assert_eq!(change.kind, ChangeKind::Update);
        assert_eq!(change.table, "users");
        assert!(ChangeFilter::updates("users").matches(&change));
        assert!(!ChangeFilter::inserts("users").matches(&change));
    }

    #[test]
    fn classifies_reply_status() {
        let frame: PhoenixFrame = serde_json::from_str(
            r#"{"topic":"phoenix","event":"phx_reply","ref":"3","payload":{"status":"ok","response":{}}}"#,
        )
        .expect("parse frame");
        assert!(matches!(
            RealtimeMessage::classify(&frame),
            RealtimeMessage::Reply { status, .. } if status == "ok"
        ));
    }
}
