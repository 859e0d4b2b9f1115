//! # Command Output
//!
//! Replies to commands issued with a correlation token.
//!
//! The wire shape nests structured data inside strings twice: the optional
//! `DataSet` field is a JSON document encoded as a string, and each output
//! message parameter may itself be a JSON document encoded as a string.
//! Parsing unwraps both layers; a parameter that fails to parse as JSON is
//! kept as plain text, matching what servers actually send.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProtocolError;

/// Who triggered the command.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct CommandOrigin {
    /// Origin type discriminator.
    #[serde(rename = "Origin", default)]
    pub origin: i32,
    /// UUID of the origin, when player-issued.
    #[serde(rename = "UUID", default)]
    pub uuid: String,
    /// Request identifier assigned by the server.
    #[serde(rename = "RequestID", default)]
    pub request_id: String,
    /// Unique entity id of the issuing player, when any.
    #[serde(rename = "PlayerUniqueID", default)]
    pub player_unique_id: i64,
}

/// One line of command output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutputMessage {
    /// Whether this line reports success.
    pub success: bool,
    /// Message text or translation key.
    pub message: String,
    /// Parameters, each parsed as JSON when possible.
    pub parameters: Vec<Value>,
}

/// A complete command reply.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandOutput {
    /// Who triggered the command.
    pub origin: CommandOrigin,
    /// Output type discriminator.
    pub output_type: i32,
    /// Number of successful sub-results.
    pub success_count: u32,
    /// Output lines.
    pub messages: Vec<OutputMessage>,
    /// Structured dataset some commands attach (`querytarget` and friends).
    pub dataset: Option<Value>,
}

#[derive(Deserialize)]
struct RawOutputMessage {
    #[serde(rename = "Success", default)]
    success: bool,
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Parameters", default)]
    parameters: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct RawCommandOutput {
    #[serde(rename = "CommandOrigin", default)]
    origin: CommandOrigin,
    #[serde(rename = "OutputType", default)]
    output_type: i32,
    #[serde(rename = "SuccessCount", default)]
    success_count: u32,
    #[serde(rename = "OutputMessages", default)]
    messages: Option<Vec<RawOutputMessage>>,
    #[serde(rename = "DataSet", default)]
    dataset: Option<String>,
}

impl CommandOutput {
    /// Parses a command reply from its wire JSON, unwrapping the
    /// string-encoded dataset and parameters.
    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        let parsed: RawCommandOutput = serde_json::from_str(raw)?;

        let dataset = match parsed.dataset {
            Some(encoded) if !encoded.is_empty() => Some(serde_json::from_str(&encoded)?),
            _ => None,
        };

        let messages = parsed
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|message| OutputMessage {
                success: message.success,
                message: message.message,
                parameters: message
                    .parameters
                    .unwrap_or_default()
                    .into_iter()
                    .map(unwrap_parameter)
                    .collect(),
            })
            .collect();

        Ok(Self {
            origin: parsed.origin,
            output_type: parsed.output_type,
            success_count: parsed.success_count,
            messages,
            dataset,
        })
    }

    /// True when at least one sub-result succeeded.
    #[inline]
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.success_count > 0
    }
}

fn unwrap_parameter(value: Value) -> Value {
    match value {
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_reply() {
        let raw = r#"{
            "OutputType": 1,
            "SuccessCount": 1,
            "CommandOrigin": {"Origin": 5, "UUID": "u", "RequestID": "r", "PlayerUniqueID": 0},
            "OutputMessages": []
        }"#;
        let output = CommandOutput::from_json(raw).unwrap();
        assert_eq!(output.success_count, 1);
        assert_eq!(output.output_type, 1);
        assert_eq!(output.origin.origin, 5);
        assert!(output.messages.is_empty());
        assert!(output.dataset.is_none());
        assert!(output.succeeded());
    }

    #[test]
    fn test_dataset_is_parsed_twice() {
        let raw = r#"{
            "OutputType": 0,
            "SuccessCount": 1,
            "CommandOrigin": {},
            "DataSet": "[{\"uniqueId\": \"-42\"}]"
        }"#;
        let output = CommandOutput::from_json(raw).unwrap();
        let dataset = output.dataset.unwrap();
        assert_eq!(dataset[0]["uniqueId"], "-42");
    }

    #[test]
    fn test_empty_dataset_is_none() {
        let raw = r#"{"SuccessCount": 0, "CommandOrigin": {}, "DataSet": ""}"#;
        let output = CommandOutput::from_json(raw).unwrap();
        assert!(output.dataset.is_none());
        assert!(!output.succeeded());
    }

    #[test]
    fn test_string_parameters_unwrap_to_json() {
        let raw = r#"{
            "SuccessCount": 1,
            "CommandOrigin": {},
            "OutputMessages": [{
                "Success": true,
                "Message": "commands.tp.success",
                "Parameters": ["[{\"x\": 1.5}]", "plain text", 7]
            }]
        }"#;
        let output = CommandOutput::from_json(raw).unwrap();
        let parameters = &output.messages[0].parameters;
        assert_eq!(parameters[0][0]["x"], 1.5);
        assert_eq!(parameters[1], Value::String("plain text".to_string()));
        assert_eq!(parameters[2], Value::from(7));
    }

    #[test]
    fn test_malformed_dataset_rejected() {
        let raw = r#"{"SuccessCount": 1, "CommandOrigin": {}, "DataSet": "{broken"}"#;
        assert!(CommandOutput::from_json(raw).is_err());
    }
}
