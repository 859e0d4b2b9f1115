//! # NETHERLINK Transport
//!
//! The boundary between the session engine and the native transport that
//! actually talks to the game server.
//!
//! ## The event queue contract
//!
//! The transport delivers inbound data exclusively through a polling queue
//! of tagged events:
//!
//! ```text
//! ┌──────────────┐   poll_next_event()   ┌──────────────────┐
//! │   Transport   │ ───────────────────> │  Dispatch Loop   │
//! │ (event queue) │ <─────────────────── │ (single consumer)│
//! └──────────────┘  discard / consume_*  └──────────────────┘
//! ```
//!
//! Exactly one of `discard_event` / `consume_*` must follow every poll.
//! Calling neither stalls the queue; calling both is undefined. The
//! payload is read only by the consume call, so a consumer that does not
//! care about an event can skip the deserialization cost entirely.

pub mod sim;

use netherlink_protocol::WireEvent;
use thiserror::Error;

pub use sim::{SentCommand, SimPlayer, SimTransport};

/// Failures reported by a transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The event queue is closed for good; no further events will arrive.
    #[error("event queue closed")]
    Closed,
    /// The session behind the transport is gone.
    #[error("session unavailable")]
    Unavailable,
    /// A packet payload could not be converted to its JSON form.
    #[error("packet conversion failed: {0}")]
    PacketConvert(String),
    /// Any other transport-level failure.
    #[error("{0}")]
    Other(String),
}

/// Which command channel an outbound command rides on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandChannel {
    /// The websocket command origin.
    WebSocket,
    /// Commands executed as the bot player.
    Player,
}

/// The native transport contract.
///
/// Implementations are shared across threads: the dispatch loop polls and
/// acknowledges events while facade calls issue outbound traffic
/// concurrently. Consume methods return raw payload strings; typed parsing
/// is the caller's concern so the transport never pays for records nobody
/// asked for.
pub trait Transport: Send + Sync {
    /// Whether the session behind this transport is still usable.
    fn available(&self) -> bool;

    /// Blocks until the next event is available.
    ///
    /// An error means the queue is closed and no further events will ever
    /// arrive.
    fn poll_next_event(&self) -> Result<WireEvent, TransportError>;

    /// Acknowledges the just-polled event without reading its payload.
    fn discard_event(&self);

    /// Reads the disconnect reason of a connection-error event.
    fn consume_conn_error(&self) -> Result<String, TransportError>;
    /// Reads the JSON payload of a command-reply event.
    fn consume_command_reply(&self) -> Result<String, TransportError>;
    /// Reads the JSON payload of a game-packet event.
    ///
    /// Fails with [`TransportError::PacketConvert`] when the native side
    /// could not render the packet; the event still counts as consumed.
    fn consume_packet(&self) -> Result<String, TransportError>;
    /// Reads the action string of a player-change event.
    fn consume_player_change(&self) -> Result<String, TransportError>;
    /// Reads the chat payload of a chat, intercept, or marker event.
    fn consume_chat(&self) -> Result<String, TransportError>;

    /// Submits a command whose reply should be delivered under `token`.
    fn send_command_with_reply(
        &self,
        channel: CommandChannel,
        command: &str,
        token: &str,
    ) -> Result<(), TransportError>;
    /// Submits a command without asking for a reply.
    fn send_command_no_reply(
        &self,
        channel: CommandChannel,
        command: &str,
    ) -> Result<(), TransportError>;
    /// Submits a settings command.
    fn send_settings_command(&self, command: &str) -> Result<(), TransportError>;
    /// Submits a raw outbound packet by numeric type and JSON content.
    fn send_game_packet(&self, packet_id: i64, payload_json: &str) -> Result<(), TransportError>;
    /// Renders a packet to its wire bytes without sending it.
    fn encode_game_packet(
        &self,
        packet_id: i64,
        payload_json: &str,
    ) -> Result<Vec<u8>, TransportError>;

    /// Asks the transport to surface every game packet as an event.
    fn listen_all_packets(&self);
    /// Asks the transport to surface player-change events.
    fn listen_player_change(&self);
    /// Asks the transport to surface chat events.
    fn listen_chat(&self);
    /// Asks the transport to surface output of the named command block.
    fn listen_command_block(&self, name: &str);
    /// Captures the player's next input under the given token.
    fn intercept_next_input(&self, player_uuid: &str, token: &str) -> Result<(), TransportError>;

    /// The packet-type name to numeric id mapping, as a JSON object.
    fn packet_name_id_mapping(&self) -> Result<String, TransportError>;
    /// The immutable bot identity record, as JSON.
    fn bot_basic_info(&self) -> Result<String, TransportError>;
    /// The live world info record, as JSON.
    fn bot_extend_info(&self) -> Result<String, TransportError>;

    /// UUIDs of all online players, as a JSON array.
    fn all_online_players(&self) -> Result<String, TransportError>;
    /// UUID of the named player, empty when unknown.
    fn player_uuid_by_name(&self, name: &str) -> Result<String, TransportError>;
    /// Canonical UUID for the given identifier, empty when unknown.
    fn player_uuid_by_uuid(&self, uuid: &str) -> Result<String, TransportError>;
    /// Releases the native binding of a player handle.
    fn release_player(&self, uuid: &str);

    /// Display name of the player.
    fn player_name(&self, uuid: &str) -> Result<String, TransportError>;
    /// Unique entity id of the player.
    fn player_entity_unique_id(&self, uuid: &str) -> Result<i64, TransportError>;
    /// Runtime entity id of the player.
    fn player_entity_runtime_id(&self, uuid: &str) -> Result<u64, TransportError>;
    /// Whether the player is currently online.
    fn player_online(&self, uuid: &str) -> Result<bool, TransportError>;
    /// Whether the player has operator rights.
    fn player_is_op(&self, uuid: &str) -> Result<bool, TransportError>;
    /// Unix timestamp of the player's login.
    fn player_login_time(&self, uuid: &str) -> Result<i64, TransportError>;
    /// Platform chat id of the player.
    fn player_platform_chat_id(&self, uuid: &str) -> Result<String, TransportError>;
    /// Numeric build platform of the player's client.
    fn player_build_platform(&self, uuid: &str) -> Result<i32, TransportError>;
    /// Skin id of the player.
    fn player_skin_id(&self, uuid: &str) -> Result<String, TransportError>;
    /// Device id of the player.
    fn player_device_id(&self, uuid: &str) -> Result<String, TransportError>;
    /// Command permission level of the player.
    fn player_command_permission_level(&self, uuid: &str) -> Result<u32, TransportError>;
    /// Operator permission level of the player.
    fn player_op_permission_level(&self, uuid: &str) -> Result<u32, TransportError>;
    /// Entity metadata of the player, as JSON.
    fn player_entity_metadata(&self, uuid: &str) -> Result<String, TransportError>;
    /// Ability maps of the player, as JSON.
    fn player_ability_maps(&self, uuid: &str) -> Result<String, TransportError>;

    /// Sends a chat message to the player.
    fn player_chat(&self, uuid: &str, message: &str) -> Result<(), TransportError>;
    /// Shows a title (and optional subtitle) to the player.
    fn player_title(&self, uuid: &str, title: &str, subtitle: &str)
        -> Result<(), TransportError>;
    /// Shows an action-bar message to the player.
    fn player_action_bar(&self, uuid: &str, message: &str) -> Result<(), TransportError>;
    /// Replaces the player's ability maps with the given JSON record.
    fn set_player_ability(&self, uuid: &str, maps_json: &str) -> Result<(), TransportError>;

    /// Places a command block described by the given JSON options.
    fn place_command_block(&self, option_json: &str) -> Result<(), TransportError>;
}
