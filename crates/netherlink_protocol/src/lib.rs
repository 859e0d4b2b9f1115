//! # NETHERLINK Protocol
//!
//! Wire-level data model shared by the session engine and the transport
//! boundary.
//!
//! The access point serializes every payload as JSON with PascalCase field
//! names; the structs here pin those names with `#[serde(rename)]` so the
//! Rust side can use idiomatic field names without changing the wire format.
//! The only deliberately schema-free value is the command dataset, which
//! stays a [`serde_json::Value`].

pub mod chat;
pub mod command;
pub mod error;
pub mod event;
pub mod info;
pub mod player;

pub use chat::ChatMessage;
pub use command::{CommandOrigin, CommandOutput, OutputMessage};
pub use error::ProtocolError;
pub use event::{EventKind, WireEvent};
pub use info::{BotBasicInfo, BotExtendInfo, CommandBlockPlaceOption};
pub use player::{
    AbilityMaps, ActionPermissionMap, AdventureFlagsMap, PlayerChange, QueriedPlayerPos,
};
