//! Chat-like records: player chat, command-block output, intercepted input.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

fn default_chat_kind() -> i32 {
    1
}

/// One chat-like occurrence.
///
/// The same record shape covers regular player chat, named command-block
/// output, and intercepted player input. `speaker_name` carries the display
/// name the server rendered; `raw_speaker_name` the unformatted original.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name of the speaker.
    #[serde(rename = "Name", default)]
    pub speaker_name: String,
    /// Unformatted speaker name, may differ from the display name.
    #[serde(rename = "RawName", default)]
    pub raw_speaker_name: String,
    /// Message fragments, as the server split them.
    #[serde(rename = "Msg", default)]
    pub messages: Vec<String>,
    /// The raw, unsplit message text.
    #[serde(rename = "RawMsg", default)]
    pub raw_message: String,
    /// Wire message type (defaults to regular chat).
    #[serde(rename = "Type", default = "default_chat_kind")]
    pub kind: i32,
    /// Raw translation parameters, when the server attached any.
    #[serde(rename = "RawParameters", default)]
    pub parameters: Option<Value>,
    /// Auxiliary data attached by the access point.
    #[serde(rename = "Aux", default)]
    pub auxiliary: Option<Value>,
}

impl ChatMessage {
    /// Parses a chat payload from its wire JSON.
    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let raw = r#"{
            "Name": "Alice",
            "RawName": "§eAlice",
            "Msg": ["hello", "world"],
            "RawMsg": "hello world",
            "Type": 1,
            "RawParameters": null,
            "Aux": null
        }"#;
        let chat = ChatMessage::from_json(raw).unwrap();
        assert_eq!(chat.speaker_name, "Alice");
        assert_eq!(chat.raw_speaker_name, "\u{a7}eAlice");
        assert_eq!(chat.messages, vec!["hello", "world"]);
        assert_eq!(chat.raw_message, "hello world");
        assert_eq!(chat.kind, 1);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let chat = ChatMessage::from_json(r#"{"Name":"Bob"}"#).unwrap();
        assert_eq!(chat.speaker_name, "Bob");
        assert_eq!(chat.kind, 1);
        assert!(chat.messages.is_empty());
        assert!(chat.parameters.is_none());
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(ChatMessage::from_json("not json").is_err());
    }
}
