//! Wire format for the shell connection
//!
//! Outgoing frames are `{"input": "<text>"}`. Incoming frames come in a few
//! shapes that all collapse into [`Incoming`]:
//!
//! ```text
//! {"type": "output", "data": "..."}
//! {"output": "..."}                      legacy
//! {"type": "error", "data": "..."}
//! {"type": "error", "error": "..."}
//! {"error": "..."}                       legacy
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TransportError, TransportResult};

/// Control byte sent for Ctrl+C
pub const INTERRUPT: &str = "\x03";

/// Longest command accepted for sending, in characters
pub const MAX_COMMAND_LENGTH: usize = 10_000;

/// Frame sent to the shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outgoing {
    pub input: String,
}

impl Outgoing {
    pub fn input(text: impl Into<String>) -> Self {
        Self { input: text.into() }
    }

    pub fn interrupt() -> Self {
        Self::input(INTERRUPT)
    }

    pub fn encode(&self) -> TransportResult<String> {
        serde_json::to_string(self).map_err(|e| TransportError::Send(e.to_string()))
    }
}

/// Decoded frame from the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Output(String),
    Error(String),
}

impl Incoming {
    /// Decode a JSON frame
    pub fn decode(frame: &str) -> TransportResult<Self> {
        let value: Value = serde_json::from_str(frame)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> TransportResult<Self> {
        let field = |name: &str| value.get(name).and_then(Value::as_str);

        match field("type") {
            Some("output") => Ok(Incoming::Output(
                field("data").unwrap_or_default().to_string(),
            )),
            Some("error") => Ok(Incoming::Error(
                field("error")
                    .or_else(|| field("data"))
                    .unwrap_or("Unknown error")
                    .to_string(),
            )),
            _ => {
                if let Some(output) = field("output") {
                    Ok(Incoming::Output(output.to_string()))
                } else if let Some(error) = field("error") {
                    Ok(Incoming::Error(error.to_string()))
                } else {
                    Err(TransportError::Decode(format!("unrecognized frame: {value}")))
                }
            }
        }
    }
}

/// Drops a frame identical to the one right before it
#[derive(Debug, Clone, Default)]
pub struct FrameDeduplicator {
    last: Option<Value>,
}

impl FrameDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `frame`, returning `None` when it repeats the previous frame.
    ///
    /// Frames are compared structurally, so key order and whitespace do not
    /// matter.
    pub fn accept(&mut self, frame: &str) -> TransportResult<Option<Incoming>> {
        let value: Value = serde_json::from_str(frame)?;
        if self.last.as_ref() == Some(&value) {
            tracing::debug!("Dropping duplicate frame");
            return Ok(None);
        }
        let incoming = Incoming::from_value(&value);
        self.last = Some(value);
        incoming.map(Some)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Whether `command` may be sent: non-empty, at most [`MAX_COMMAND_LENGTH`]
/// characters, and free of control characters other than tab and newlines
pub fn validate_command(command: &str) -> bool {
    let len = command.chars().count();
    if len == 0 || len > MAX_COMMAND_LENGTH {
        return false;
    }
    !command
        .chars()
        .any(|c| c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_input() {
        assert_eq!(Outgoing::input("ls -la").encode().unwrap(), r#"{"input":"ls -la"}"#);
        assert_eq!(Outgoing::interrupt().encode().unwrap(), r#"{"input":"\u0003"}"#);
    }

    #[test]
    fn test_decode_formats() {
        assert_eq!(
            Incoming::decode(r#"{"type":"output","data":"hi\n"}"#).unwrap(),
            Incoming::Output("hi\n".to_string())
        );
        assert_eq!(
            Incoming::decode(r#"{"output":"legacy"}"#).unwrap(),
            Incoming::Output("legacy".to_string())
        );
        assert_eq!(
            Incoming::decode(r#"{"type":"error","data":"boom"}"#).unwrap(),
            Incoming::Error("boom".to_string())
        );
        assert_eq!(
            Incoming::decode(r#"{"type":"error","error":"bad"}"#).unwrap(),
            Incoming::Error("bad".to_string())
        );
        assert_eq!(
            Incoming::decode(r#"{"type":"output"}"#).unwrap(),
            Incoming::Output(String::new())
        );
        assert_eq!(
            Incoming::decode(r#"{"type":"error"}"#).unwrap(),
            Incoming::Error("Unknown error".to_string())
        );
        assert_eq!(
            Incoming::decode(r#"{"error":"legacy"}"#).unwrap(),
            Incoming::Error("legacy".to_string())
        );
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(
            Incoming::decode("not json"),
            Err(TransportError::Decode(_))
        ));
        assert!(matches!(
            Incoming::decode(r#"{"type":"ping"}"#),
            Err(TransportError::Decode(_))
        ));
    }

    #[test]
    fn test_deduplicator() {
        let mut dedup = FrameDeduplicator::new();
        let first = dedup.accept(r#"{"type":"output","data":"x"}"#).unwrap();
        assert_eq!(first, Some(Incoming::Output("x".to_string())));

        // Same object, different key order
        assert_eq!(dedup.accept(r#"{"data":"x","type":"output"}"#).unwrap(), None);

        assert!(dedup.accept(r#"{"type":"output","data":"y"}"#).unwrap().is_some());
        assert!(dedup.accept(r#"{"type":"output","data":"x"}"#).unwrap().is_some());
    }

    #[test]
    fn test_validate_command() {
        assert!(validate_command("ls -la"));
        assert!(validate_command("echo\thi"));
        assert!(!validate_command(""));
        assert!(!validate_command("rm\x00"));
        assert!(!validate_command("a\x1b[31m"));
        assert!(!validate_command(&"x".repeat(MAX_COMMAND_LENGTH + 1)));
    }
}
