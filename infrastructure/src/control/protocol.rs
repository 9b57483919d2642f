//! Control-channel wire format.
//!
//! Frames are JSON text messages:
//!
//! - Identity (first frame after connect): `{"tab_id": "<instance id>"}`
//! - Inbound: `{"command": "...", "request_id": ..., "payload": ..., "retry_config": ...}`
//! - Outbound: `{"request_id": ..., "data": ...}` where `data` is a content
//!   string, `{"error": msg}`, `{"retry_info": {...}}` or [`DONE_SENTINEL`]
//!
//! [`parse_inbound`] is a pure function called once per frame by the
//! channel's reader loop.

use relay_domain::{
    ForwardRequest, RelayCommand, RelayOutput, RelayPayload, RequestId, RetryOverrides,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Completion sentinel sent as the last `data` of every non-cancelled session.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Frame is not a JSON object")]
    NotAnObject,

    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("Invalid request id: {0}")]
    InvalidRequestId(String),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// First frame sent after every (re)connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAnnouncement {
    pub tab_id: String,
}

impl IdentityAnnouncement {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            tab_id: instance_id.into(),
        }
    }

    pub fn encode(&self) -> String {
        json!({ "tab_id": self.tab_id }).to_string()
    }
}

/// Decode one inbound text frame into a command.
///
/// Command names are accepted in kebab-case and in their legacy snake-case
/// spellings. A frame carrying `request_id` and `payload` without a
/// `command` is a forward-request.
pub fn parse_inbound(text: &str) -> Result<RelayCommand, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(mut frame) = value else {
        return Err(ProtocolError::NotAnObject);
    };

    let command = frame
        .get("command")
        .and_then(Value::as_str)
        .map(str::to_owned);

    match command.as_deref() {
        Some("forward-request" | "forward_request") => parse_forward(&mut frame),
        None if frame.contains_key("request_id") && frame.contains_key("payload") => {
            parse_forward(&mut frame)
        }
        None => Err(ProtocolError::MissingField("command")),
        Some("cancel-request" | "cancel_request") => Ok(RelayCommand::CancelRequest {
            request_id: request_id(&frame)?,
        }),
        Some("reload" | "refresh") => Ok(RelayCommand::Reload),
        Some("activate-capture" | "activate_id_capture") => Ok(RelayCommand::ActivateCapture),
        Some(other) => Err(ProtocolError::UnknownCommand(other.to_string())),
    }
}

fn request_id(frame: &serde_json::Map<String, Value>) -> Result<RequestId, ProtocolError> {
    let raw = match frame.get("request_id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => return Err(ProtocolError::InvalidRequestId(other.to_string())),
        None => return Err(ProtocolError::MissingField("request_id")),
    };
    RequestId::new(raw).map_err(|e| ProtocolError::InvalidRequestId(e.to_string()))
}

fn parse_forward(frame: &mut serde_json::Map<String, Value>) -> Result<RelayCommand, ProtocolError> {
    let request_id = request_id(frame)?;

    let payload = frame
        .remove("payload")
        .ok_or(ProtocolError::MissingField("payload"))?;
    let payload: RelayPayload =
        serde_json::from_value(payload).map_err(|e| ProtocolError::InvalidField {
            field: "payload",
            reason: e.to_string(),
        })?;

    let retry = match frame.remove("retry_config") {
        None | Some(Value::Null) => RetryOverrides::default(),
        Some(value) => {
            serde_json::from_value(value).map_err(|e| ProtocolError::InvalidField {
                field: "retry_config",
                reason: e.to_string(),
            })?
        }
    };

    Ok(RelayCommand::ForwardRequest(ForwardRequest {
        request_id,
        payload,
        retry,
    }))
}

/// Encode one session output as an outbound frame.
pub fn encode_outbound(request_id: &RequestId, output: &RelayOutput) -> String {
    let data = match output {
        RelayOutput::Content(text) => Value::String(text.clone()),
        RelayOutput::Error(message) => json!({ "error": message }),
        RelayOutput::RetryNotice(notice) => json!({ "retry_info": notice }),
        RelayOutput::Done => Value::String(DONE_SENTINEL.to_string()),
    };
    json!({ "request_id": request_id, "data": data }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_domain::RetryNotice;

    #[test]
    fn parse_forward_request_with_retry_config() {
        let frame = r#"{
            "command": "forward-request",
            "request_id": "req-1",
            "payload": {
                "message_templates": [{"role": "user", "content": "hi", "attachments": []}],
                "target_model_id": "model-x",
                "session_id": "sess-1",
                "mode": "battle",
                "battle_target": "b",
                "client_hint": 7
            },
            "retry_config": {"max_retries": 2, "show_retry_info": true}
        }"#;

        let RelayCommand::ForwardRequest(req) = parse_inbound(frame).unwrap() else {
            panic!("expected forward-request");
        };
        assert_eq!(req.request_id.as_str(), "req-1");
        assert_eq!(req.payload.message_templates[0].content, "hi");
        assert_eq!(req.payload.battle_target.as_deref(), Some("b"));
        assert_eq!(req.payload.extra["client_hint"], 7);
        assert_eq!(req.retry.max_retries, Some(2));
        assert_eq!(req.retry.show_retry_info, Some(true));
        assert_eq!(req.retry.enabled, None);
    }

    #[test]
    fn parse_commandless_forward_request() {
        let frame = r#"{"request_id": "req-2", "payload": {"session_id": "s"}}"#;
        let RelayCommand::ForwardRequest(req) = parse_inbound(frame).unwrap() else {
            panic!("expected forward-request");
        };
        assert_eq!(req.request_id.as_str(), "req-2");
        assert_eq!(req.retry, RetryOverrides::default());
    }

    #[test]
    fn parse_cancel_in_both_spellings() {
        for name in ["cancel-request", "cancel_request"] {
            let frame = format!(r#"{{"command": "{name}", "request_id": "req-3"}}"#);
            assert_eq!(
                parse_inbound(&frame).unwrap(),
                RelayCommand::CancelRequest {
                    request_id: RequestId::new("req-3").unwrap()
                }
            );
        }
    }

    #[test]
    fn parse_simple_commands() {
        assert_eq!(
            parse_inbound(r#"{"command": "refresh"}"#).unwrap(),
            RelayCommand::Reload
        );
        assert_eq!(
            parse_inbound(r#"{"command": "activate_id_capture"}"#).unwrap(),
            RelayCommand::ActivateCapture
        );
    }

    #[test]
    fn parse_rejects_malformed_frames() {
        assert!(matches!(
            parse_inbound("not json"),
            Err(ProtocolError::InvalidJson(_))
        ));
        assert!(matches!(parse_inbound("[1]"), Err(ProtocolError::NotAnObject)));
        assert!(matches!(
            parse_inbound(r#"{"command": "explode"}"#),
            Err(ProtocolError::UnknownCommand(c)) if c == "explode"
        ));
        assert!(matches!(
            parse_inbound(r#"{"command": "cancel-request"}"#),
            Err(ProtocolError::MissingField("request_id"))
        ));
        assert!(matches!(
            parse_inbound(r#"{"command": "cancel-request", "request_id": "  "}"#),
            Err(ProtocolError::InvalidRequestId(_))
        ));
        assert!(matches!(
            parse_inbound(r#"{"request_id": "x"}"#),
            Err(ProtocolError::MissingField("command"))
        ));
        assert!(matches!(
            parse_inbound(r#"{"command": "forward-request", "request_id": "x", "payload": "text"}"#),
            Err(ProtocolError::InvalidField { field: "payload", .. })
        ));
    }

    #[test]
    fn encode_each_output_kind() {
        let id = RequestId::new("req-9").unwrap();
        let decode = |s: String| serde_json::from_str::<Value>(&s).unwrap();

        let content = decode(encode_outbound(&id, &RelayOutput::Content("a0:\"x\"\n".into())));
        assert_eq!(content, json!({"request_id": "req-9", "data": "a0:\"x\"\n"}));

        let error = decode(encode_outbound(&id, &RelayOutput::Error("boom".into())));
        assert_eq!(error["data"], json!({"error": "boom"}));

        let notice = RetryNotice {
            attempt: 1,
            max_attempts: 5,
            delay: 1000,
            reason: "empty response".into(),
        };
        let retry = decode(encode_outbound(&id, &RelayOutput::RetryNotice(notice)));
        assert_eq!(retry["data"]["retry_info"]["attempt"], 1);
        assert_eq!(retry["data"]["retry_info"]["delay"], 1000);

        let done = decode(encode_outbound(&id, &RelayOutput::Done));
        assert_eq!(done["data"], "[DONE]");
    }

    #[test]
    fn identity_frame() {
        let frame = IdentityAnnouncement::new("abc-123").encode();
        let parsed: IdentityAnnouncement = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed.tab_id, "abc-123");
    }
}
