//! # Session Facade
//!
//! The synchronous-looking public surface over the dispatch engine.
//!
//! Every outward-facing operation first confirms the external session is
//! still usable and fails fast with [`SessionError::Unavailable`] if not —
//! the transport may already be dead even though the dispatch loop has not
//! observed a disconnect event yet.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use netherlink_protocol::{
    BotBasicInfo, BotExtendInfo, ChatMessage, CommandBlockPlaceOption, CommandOutput,
    PlayerChange, ProtocolError,
};
use netherlink_transport::{CommandChannel, Transport};
use serde_json::Value;

use crate::dispatch;
use crate::error::SessionError;
use crate::listeners::ListenerRegistry;
use crate::pending::PendingTable;
use crate::players::{PlayerHandle, PlayerRoster};
use crate::signal::DisconnectSignal;
use crate::spawner::TaskPool;
use crate::token::TokenCounter;
use crate::topics::resolve_packet_targets;

/// What happens to in-flight request waits when the session disconnects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisconnectPolicy {
    /// Leave them alone; each wait runs to its own timeout.
    #[default]
    LeavePending,
    /// Release every waiter empty-handed as soon as the disconnect is
    /// observed.
    ReleasePending,
}

/// Session configuration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Worker threads for listener fan-out.
    pub worker_threads: usize,
    /// Disconnect handling for in-flight request waits.
    pub disconnect_policy: DisconnectPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            disconnect_policy: DisconnectPolicy::LeavePending,
        }
    }
}

/// State shared between the facade, the dispatch loop, and player handles.
pub(crate) struct Shared {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) policy: DisconnectPolicy,
    pub(crate) cmd_tokens: TokenCounter,
    pub(crate) intercept_tokens: TokenCounter,
    pub(crate) pending_commands: PendingTable<CommandOutput>,
    pub(crate) pending_intercepts: PendingTable<ChatMessage>,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) players: PlayerRoster,
    pub(crate) disconnect: DisconnectSignal,
    pub(crate) pool: TaskPool,
    pub(crate) name_to_id: HashMap<String, i64>,
    pub(crate) id_to_name: HashMap<i64, String>,
    pub(crate) bot_info: BotBasicInfo,
}

impl Shared {
    pub(crate) fn ensure_available(&self) -> Result<(), SessionError> {
        if self.transport.available() {
            Ok(())
        } else {
            Err(SessionError::Unavailable)
        }
    }

    /// Records a disconnect once and applies the configured policy.
    pub(crate) fn note_disconnect(&self, reason: &str) {
        if !self.disconnect.set(reason) {
            return;
        }
        tracing::warn!(reason, "session disconnected");
        if self.policy == DisconnectPolicy::ReleasePending {
            self.pending_commands.release_all();
            self.pending_intercepts.release_all();
        }
    }

    /// Issues a command with a fresh correlation token and blocks for the
    /// reply. The pending entry is removed after the wait regardless of
    /// outcome; a reply arriving later is dropped on lookup.
    pub(crate) fn send_command_with_reply(
        &self,
        channel: CommandChannel,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<CommandOutput>, SessionError> {
        self.ensure_available()?;
        let token = self.cmd_tokens.next();
        let awaiter = self.pending_commands.insert(&token);
        if let Err(err) = self
            .transport
            .send_command_with_reply(channel, command, &token)
        {
            self.pending_commands.abandon(&token);
            return Err(err.into());
        }
        let reply = awaiter.wait(timeout);
        self.pending_commands.abandon(&token);
        Ok(reply)
    }

    /// Captures the player's next input and blocks for it, same pending
    /// discipline as command replies.
    pub(crate) fn intercept_next_input(
        &self,
        player: &PlayerHandle,
        timeout: Option<Duration>,
    ) -> Result<Option<ChatMessage>, SessionError> {
        self.ensure_available()?;
        let token = self.intercept_tokens.next();
        let awaiter = self.pending_intercepts.insert(&token);
        if let Err(err) = self.transport.intercept_next_input(player.uuid(), &token) {
            self.pending_intercepts.abandon(&token);
            return Err(err.into());
        }
        let input = awaiter.wait(timeout);
        self.pending_intercepts.abandon(&token);
        Ok(input)
    }

    /// Looks a player up by display name and resolves the cached handle.
    pub(crate) fn resolve_by_name(
        shared: &Arc<Self>,
        name: &str,
    ) -> Result<Option<Arc<PlayerHandle>>, SessionError> {
        let uuid = shared.transport.player_uuid_by_name(name)?;
        Ok(shared.players.resolve(shared, &uuid))
    }
}

/// Selects an outbound packet type by numeric id or by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketSelector<'a> {
    /// Numeric packet id, passed through unvalidated.
    Id(i64),
    /// Packet-type name, resolved against the known mapping.
    Name(&'a str),
}

impl From<i64> for PacketSelector<'static> {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a str> for PacketSelector<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

/// A live game-client session.
///
/// Constructing one attaches to an already-established transport, fetches
/// the immutable session data, and starts the dispatch loop. All methods
/// are callable from any thread; blocking methods suspend only their
/// caller.
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// Attaches to a transport and starts the engine.
    pub fn start(
        transport: Arc<dyn Transport>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        if !transport.available() {
            return Err(SessionError::Unavailable);
        }

        transport.listen_all_packets();
        transport.listen_player_change();
        transport.listen_chat();

        let mapping_raw = transport.packet_name_id_mapping()?;
        let name_to_id: HashMap<String, i64> =
            serde_json::from_str(&mapping_raw).map_err(ProtocolError::from)?;
        let id_to_name = name_to_id
            .iter()
            .map(|(name, id)| (*id, name.clone()))
            .collect();

        let bot_raw = transport.bot_basic_info()?;
        let bot_info = BotBasicInfo::from_json(&bot_raw)?;

        let shared = Arc::new(Shared {
            transport,
            policy: config.disconnect_policy,
            cmd_tokens: TokenCounter::new("cmd"),
            intercept_tokens: TokenCounter::new("intercept"),
            pending_commands: PendingTable::new(),
            pending_intercepts: PendingTable::new(),
            listeners: ListenerRegistry::new(),
            players: PlayerRoster::new(),
            disconnect: DisconnectSignal::new(),
            pool: TaskPool::new(config.worker_threads),
            name_to_id,
            id_to_name,
            bot_info,
        });

        let loop_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("netherlink-dispatch".to_string())
            .spawn(move || dispatch::run(&loop_shared))?;

        tracing::info!(bot = %shared.bot_info.name, "session started");
        Ok(Self { shared })
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Sends a websocket command and blocks for its reply; `None` on
    /// timeout.
    pub fn send_command(
        &self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<CommandOutput>, SessionError> {
        self.shared
            .send_command_with_reply(CommandChannel::WebSocket, command, timeout)
    }

    /// Sends a command as the bot player and blocks for its reply.
    pub fn send_player_command(
        &self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<CommandOutput>, SessionError> {
        self.shared
            .send_command_with_reply(CommandChannel::Player, command, timeout)
    }

    /// Sends a websocket command without asking for a reply.
    pub fn send_command_no_reply(&self, command: &str) -> Result<(), SessionError> {
        self.shared.ensure_available()?;
        Ok(self
            .shared
            .transport
            .send_command_no_reply(CommandChannel::WebSocket, command)?)
    }

    /// Sends a command as the bot player without asking for a reply.
    pub fn send_player_command_no_reply(&self, command: &str) -> Result<(), SessionError> {
        self.shared.ensure_available()?;
        Ok(self
            .shared
            .transport
            .send_command_no_reply(CommandChannel::Player, command)?)
    }

    /// Sends a settings command.
    pub fn send_settings_command(&self, command: &str) -> Result<(), SessionError> {
        self.shared.ensure_available()?;
        Ok(self.shared.transport.send_settings_command(command)?)
    }

    // ------------------------------------------------------------------
    // Raw packets
    // ------------------------------------------------------------------

    /// Sends a raw outbound packet with a JSON-shaped payload.
    pub fn send_game_packet<'a>(
        &self,
        selector: impl Into<PacketSelector<'a>>,
        payload: &Value,
    ) -> Result<(), SessionError> {
        self.shared.ensure_available()?;
        let id = self.packet_id_for(selector.into())?;
        let encoded = serde_json::to_string(payload).map_err(ProtocolError::from)?;
        Ok(self.shared.transport.send_game_packet(id, &encoded)?)
    }

    /// Renders a packet to `(packet id, wire bytes)` without sending it.
    pub fn encode_game_packet<'a>(
        &self,
        selector: impl Into<PacketSelector<'a>>,
        payload: &Value,
    ) -> Result<(i64, Vec<u8>), SessionError> {
        self.shared.ensure_available()?;
        let id = self.packet_id_for(selector.into())?;
        let encoded = serde_json::to_string(payload).map_err(ProtocolError::from)?;
        let bytes = self.shared.transport.encode_game_packet(id, &encoded)?;
        Ok((id, bytes))
    }

    fn packet_id_for(&self, selector: PacketSelector<'_>) -> Result<i64, SessionError> {
        match selector {
            PacketSelector::Id(id) => Ok(id),
            PacketSelector::Name(name) => self
                .shared
                .name_to_id
                .get(name)
                .copied()
                .ok_or_else(|| SessionError::InvalidTopic(name.to_string())),
        }
    }

    /// Numeric id of a packet-type name.
    pub fn packet_id(&self, name: &str) -> Result<i64, SessionError> {
        self.packet_id_for(PacketSelector::Name(name))
    }

    /// Packet-type name of a numeric id.
    pub fn packet_name(&self, id: i64) -> Result<String, SessionError> {
        self.shared
            .id_to_name
            .get(&id)
            .cloned()
            .ok_or_else(|| SessionError::InvalidTopic(id.to_string()))
    }

    /// The full packet-type name to id mapping.
    #[must_use]
    pub fn packet_mapping(&self) -> &HashMap<String, i64> {
        &self.shared.name_to_id
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Registers a packet listener for every topic the specs select.
    ///
    /// Specs: an exact packet-type name, a numeric id, `"all"`, or a
    /// `"!"`-prefixed exclusion. A spec matching nothing fails with
    /// [`SessionError::InvalidTopic`] and registers nothing.
    pub fn listen_packets(
        &self,
        specs: &[&str],
        callback: impl Fn(&str, &Value) + Send + Sync + 'static,
    ) -> Result<(), SessionError> {
        let targets =
            resolve_packet_targets(specs, &self.shared.name_to_id, &self.shared.id_to_name)?;
        let callback: Arc<dyn Fn(&str, &Value) + Send + Sync> = Arc::new(callback);
        for target in targets {
            self.shared
                .listeners
                .register_packet(&target, Arc::clone(&callback));
        }
        Ok(())
    }

    /// Registers a player-change listener; players already online are
    /// reported synchronously with [`PlayerChange::Exist`] first.
    pub fn listen_player_change(
        &self,
        callback: impl Fn(&Arc<PlayerHandle>, &PlayerChange) + Send + Sync + 'static,
    ) -> Result<(), SessionError> {
        for player in self.online_players()? {
            callback(&player, &PlayerChange::Exist);
        }
        self.shared.listeners.register_player_change(Arc::new(callback));
        Ok(())
    }

    /// Registers a global chat listener, fired for chat from recognized
    /// players with the resolved handle.
    pub fn listen_chat(
        &self,
        callback: impl Fn(&ChatMessage, &Arc<PlayerHandle>) + Send + Sync + 'static,
    ) {
        self.shared.listeners.register_chat(Arc::new(callback));
    }

    /// Registers a chat listener keyed to one speaker name (display or
    /// raw).
    pub fn listen_speaker_chat(
        &self,
        speaker: &str,
        callback: impl Fn(&ChatMessage) + Send + Sync + 'static,
    ) {
        self.shared
            .listeners
            .register_speaker(speaker, Arc::new(callback));
    }

    /// Subscribes to the named command block and registers a listener for
    /// its messages.
    pub fn listen_command_block(
        &self,
        name: &str,
        callback: impl Fn(&ChatMessage) + Send + Sync + 'static,
    ) -> Result<(), SessionError> {
        self.shared.ensure_available()?;
        self.shared.transport.listen_command_block(name);
        self.shared.listeners.register_marker(name, Arc::new(callback));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Captures the player's next input and blocks for it.
    pub fn intercept_next_input(
        &self,
        player: &PlayerHandle,
        timeout: Option<Duration>,
    ) -> Result<Option<ChatMessage>, SessionError> {
        self.shared.intercept_next_input(player, timeout)
    }

    /// Resolves the handle of a player by display name.
    pub fn player_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Arc<PlayerHandle>>, SessionError> {
        self.shared.ensure_available()?;
        Shared::resolve_by_name(&self.shared, name)
    }

    /// Resolves the handle of a player by identifier.
    pub fn player_by_uuid(
        &self,
        uuid: &str,
    ) -> Result<Option<Arc<PlayerHandle>>, SessionError> {
        self.shared.ensure_available()?;
        let canonical = self.shared.transport.player_uuid_by_uuid(uuid)?;
        Ok(self.shared.players.resolve(&self.shared, &canonical))
    }

    /// Handles of every player currently online.
    pub fn online_players(&self) -> Result<Vec<Arc<PlayerHandle>>, SessionError> {
        self.shared.ensure_available()?;
        let raw = self.shared.transport.all_online_players()?;
        let uuids: Vec<String> = serde_json::from_str(&raw).map_err(ProtocolError::from)?;
        Ok(uuids
            .iter()
            .filter_map(|uuid| self.shared.players.resolve(&self.shared, uuid))
            .collect())
    }

    // ------------------------------------------------------------------
    // Session data
    // ------------------------------------------------------------------

    /// The immutable bot identity, fetched once at startup.
    #[inline]
    #[must_use]
    pub fn bot_info(&self) -> &BotBasicInfo {
        &self.shared.bot_info
    }

    /// Live world info; any field may still be absent.
    pub fn extend_info(&self) -> Result<BotExtendInfo, SessionError> {
        self.shared.ensure_available()?;
        let raw = self.shared.transport.bot_extend_info()?;
        Ok(BotExtendInfo::from_json(&raw)?)
    }

    /// Places a command block in the world.
    pub fn place_command_block(
        &self,
        option: &CommandBlockPlaceOption,
    ) -> Result<(), SessionError> {
        self.shared.ensure_available()?;
        let encoded = serde_json::to_string(option).map_err(ProtocolError::from)?;
        Ok(self.shared.transport.place_command_block(&encoded)?)
    }

    // ------------------------------------------------------------------
    // Disconnect
    // ------------------------------------------------------------------

    /// Blocks until the session disconnects; returns the reason.
    #[must_use]
    pub fn wait_disconnect(&self) -> String {
        self.shared.disconnect.wait()
    }

    /// Bounded [`wait_disconnect`](Self::wait_disconnect).
    #[must_use]
    pub fn wait_disconnect_timeout(&self, timeout: Duration) -> Option<String> {
        self.shared.disconnect.wait_timeout(timeout)
    }

    /// The disconnect reason, when the session already disconnected.
    #[must_use]
    pub fn disconnect_reason(&self) -> Option<String> {
        self.shared.disconnect.reason()
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Number of request waits currently registered.
    #[must_use]
    pub fn in_flight_requests(&self) -> usize {
        self.shared.pending_commands.len() + self.shared.pending_intercepts.len()
    }

    /// Number of player handles cached so far.
    #[must_use]
    pub fn cached_players(&self) -> usize {
        self.shared.players.cached()
    }

    /// Blocks until every spawned listener invocation finished, bounded
    /// by the timeout; returns whether the pool went idle.
    #[must_use]
    pub fn wait_listeners_idle(&self, timeout: Duration) -> bool {
        self.shared.pool.wait_idle(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.disconnect_policy, DisconnectPolicy::LeavePending);
    }

    #[test]
    fn test_packet_selector_conversions() {
        assert_eq!(PacketSelector::from(10_i64), PacketSelector::Id(10));
        assert_eq!(PacketSelector::from("SetTime"), PacketSelector::Name("SetTime"));
    }
}
