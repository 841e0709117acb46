//! Wire protocol for streaming sessions.
//!
//! One websocket message carries one JSON payload, either
//!
//! - a command: `{"command": "change_mode", "args": {"mode": "EffortPSD"}}`
//! - a data chunk: `[12.5, 13.1, 11.8, ...]`
//!
//! Replies are only sent for `list_modes` (`{"modes": [...]}`) and for
//! commands that fail (`{"error": "..."}`). Malformed data frames are
//! dropped without a reply.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Object carrying a `command` field, not yet validated.
    Command(CommandFrame),
    /// One chunk of raw samples.
    Data(Vec<f64>),
}

impl Frame {
    /// Decode a text message.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::Decode(e.to_string()))?;

        let is_command = value
            .as_object()
            .map_or(false, |map| map.contains_key("command"));

        if is_command {
            let frame =
                serde_json::from_value(value).map_err(|e| ProtocolError::Decode(e.to_string()))?;
            Ok(Frame::Command(frame))
        } else if value.is_array() {
            let samples = serde_json::from_value(value)
                .map_err(|e| ProtocolError::Decode(format!("invalid sample chunk: {e}")))?;
            Ok(Frame::Data(samples))
        } else {
            Err(ProtocolError::Decode(
                "expected a command object or an array of samples".to_string(),
            ))
        }
    }
}

/// Raw command payload as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandFrame {
    pub command: Value,
    #[serde(default)]
    pub args: Value,
}

/// A validated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Clear the queue.
    Restart,
    /// Swap the active calculator, then restart.
    ChangeMode { mode: String },
    /// Report the registered calculator names.
    ListModes,
}

impl Command {
    /// Validate a raw command payload.
    pub fn parse(frame: &CommandFrame) -> Result<Self, ProtocolError> {
        let name = frame.command.as_str().ok_or(ProtocolError::InvalidField {
            field: "command",
            expected: "a string",
        })?;

        match name {
            "restart" => Ok(Command::Restart),
            "list_modes" => Ok(Command::ListModes),
            "change_mode" => {
                let mode = frame
                    .args
                    .get("mode")
                    .ok_or(ProtocolError::MissingField("args.mode"))?;
                let mode = mode.as_str().ok_or(ProtocolError::InvalidField {
                    field: "args.mode",
                    expected: "a string",
                })?;
                Ok(Command::ChangeMode {
                    mode: mode.to_string(),
                })
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }

    /// Wire form of this command, as a client would send it.
    pub fn to_frame(&self) -> CommandFrame {
        match self {
            Command::Restart => CommandFrame {
                command: Value::from("restart"),
                args: Value::Object(Default::default()),
            },
            Command::ChangeMode { mode } => CommandFrame {
                command: Value::from("change_mode"),
                args: serde_json::json!({ "mode": mode }),
            },
            Command::ListModes => CommandFrame {
                command: Value::from("list_modes"),
                args: Value::Object(Default::default()),
            },
        }
    }
}

/// Outbound reply payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Modes { modes: Vec<String> },
    Error { error: String },
}

impl Reply {
    pub fn error(err: &ProtocolError) -> Self {
        Reply::Error {
            error: err.to_string(),
        }
    }
}

/// Protocol-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The message is not valid JSON or not a recognised payload shape.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: expected {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("unknown mode: {0}")]
    UnknownMode(String),
}

impl ProtocolError {
    /// Whether the peer should be told about this failure. Data-frame decode
    /// failures are silent.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, ProtocolError::Decode(_))
    }
}
