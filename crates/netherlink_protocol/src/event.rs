//! # Tagged Events
//!
//! The access point delivers data exclusively through a polling queue of
//! tagged events. Each polled event carries a kind tag and a retriever
//! string whose meaning depends on the kind: a correlation token for
//! command replies and intercepted input, a packet-type name for game
//! packets, a player identifier for player changes, a command-block name
//! for marker messages.
//!
//! Exactly one of the discard/consume actions must follow every poll; the
//! event itself never carries the payload.

use std::fmt;

/// Kind tag of a polled event.
///
/// A closed set of variants; tags this client does not recognize are kept
/// verbatim in [`EventKind::Unknown`] so the dispatch loop can still
/// acknowledge them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// The connection to the game server failed; payload is the reason.
    ConnError,
    /// Reply to a command issued with a correlation token.
    CommandReply,
    /// A game packet; retriever is the packet-type name.
    GamePacket,
    /// A player joined, left, or already existed; retriever is the player id.
    PlayerChange,
    /// A player's next input, captured for a registered intercept token.
    InterceptedInput,
    /// A chat-like message from a player or the server.
    Chat,
    /// Output of a named command block; retriever is the block name.
    CommandBlockMsg,
    /// A kind tag this client does not recognize.
    Unknown(String),
}

impl EventKind {
    /// Parses a wire kind tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "ConnError" => Self::ConnError,
            "CommandResponseCB" => Self::CommandReply,
            "MCPacket" => Self::GamePacket,
            "PlayerChange" => Self::PlayerChange,
            "PlayerInterceptInput" => Self::InterceptedInput,
            "Chat" => Self::Chat,
            "NamedCommandBlockMsg" => Self::CommandBlockMsg,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire tag for this kind.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::ConnError => "ConnError",
            Self::CommandReply => "CommandResponseCB",
            Self::GamePacket => "MCPacket",
            Self::PlayerChange => "PlayerChange",
            Self::InterceptedInput => "PlayerInterceptInput",
            Self::Chat => "Chat",
            Self::CommandBlockMsg => "NamedCommandBlockMsg",
            Self::Unknown(tag) => tag,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One polled event: kind tag plus retriever string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireEvent {
    /// What kind of payload is waiting.
    pub kind: EventKind,
    /// Kind-dependent routing key (token, packet name, player id, ...).
    pub retriever: String,
}

impl WireEvent {
    /// Builds an event from raw wire strings.
    #[must_use]
    pub fn new(kind_tag: &str, retriever: impl Into<String>) -> Self {
        Self {
            kind: EventKind::from_tag(kind_tag),
            retriever: retriever.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags_round_trip() {
        for tag in [
            "ConnError",
            "CommandResponseCB",
            "MCPacket",
            "PlayerChange",
            "PlayerInterceptInput",
            "Chat",
            "NamedCommandBlockMsg",
        ] {
            let kind = EventKind::from_tag(tag);
            assert!(!matches!(kind, EventKind::Unknown(_)), "tag {tag}");
            assert_eq!(kind.tag(), tag);
        }
    }

    #[test]
    fn test_unknown_tag_preserved() {
        let kind = EventKind::from_tag("FutureThing");
        assert_eq!(kind, EventKind::Unknown("FutureThing".to_string()));
        assert_eq!(kind.tag(), "FutureThing");
    }

    #[test]
    fn test_wire_event_new() {
        let event = WireEvent::new("MCPacket", "SetTime");
        assert_eq!(event.kind, EventKind::GamePacket);
        assert_eq!(event.retriever, "SetTime");
    }
}
