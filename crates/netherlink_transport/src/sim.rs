//! # Transport Simulation
//!
//! An in-memory [`Transport`] for tests: events are injected by the test,
//! payload reads are counted, and outbound traffic is recorded instead of
//! hitting a real server.
//!
//! ## What it checks
//!
//! The discard/consume protocol is enforced: polling past an
//! unacknowledged event, acknowledging twice, or consuming with the wrong
//! typed reader all bump the violation counter that tests assert on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_channel::{unbounded, Receiver, Sender};
use netherlink_protocol::WireEvent;
use parking_lot::Mutex;

use crate::{CommandChannel, Transport, TransportError};

/// Payload variants the simulation can stage behind an event.
#[derive(Clone, Debug)]
enum SimPayload {
    ConnError(String),
    CommandReply(String),
    Packet(Result<String, String>),
    PlayerChange(String),
    Chat(String),
}

/// A scripted player visible to the simulation's directory.
#[derive(Clone, Debug)]
pub struct SimPlayer {
    /// Stable identifier.
    pub uuid: String,
    /// Display name.
    pub name: String,
    /// Unique entity id.
    pub entity_unique_id: i64,
    /// Runtime entity id.
    pub entity_runtime_id: u64,
    /// Currently online.
    pub online: bool,
    /// Operator rights.
    pub op: bool,
    /// Login timestamp.
    pub login_time: i64,
    /// Platform chat id.
    pub platform_chat_id: String,
    /// Numeric build platform.
    pub build_platform: i32,
    /// Skin id.
    pub skin_id: String,
    /// Device id.
    pub device_id: String,
    /// Command permission level.
    pub command_permission_level: u32,
    /// Operator permission level.
    pub op_permission_level: u32,
    /// Entity metadata, as JSON.
    pub entity_metadata_json: String,
    /// Ability maps, as JSON.
    pub ability_maps_json: String,
}

impl SimPlayer {
    /// A minimal online player.
    #[must_use]
    pub fn new(uuid: &str, name: &str) -> Self {
        Self {
            uuid: uuid.to_string(),
            name: name.to_string(),
            entity_unique_id: 0,
            entity_runtime_id: 0,
            online: true,
            op: false,
            login_time: 0,
            platform_chat_id: String::new(),
            build_platform: 0,
            skin_id: String::new(),
            device_id: String::new(),
            command_permission_level: 0,
            op_permission_level: 0,
            entity_metadata_json: "{}".to_string(),
            ability_maps_json: "{}".to_string(),
        }
    }
}

/// One outbound command the simulation recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentCommand {
    /// Channel the command rode on; `None` for settings commands.
    pub channel: Option<CommandChannel>,
    /// The command text.
    pub command: String,
    /// Correlation token, when a reply was requested.
    pub token: Option<String>,
}

#[derive(Default)]
struct Subscriptions {
    all_packets: AtomicBool,
    player_change: AtomicBool,
    chat: AtomicBool,
}

/// In-memory transport for driving the session engine in tests.
pub struct SimTransport {
    injector: Mutex<Option<Sender<(WireEvent, SimPayload)>>>,
    events: Mutex<Receiver<(WireEvent, SimPayload)>>,
    pending: Mutex<Option<SimPayload>>,
    available: AtomicBool,
    consumed: AtomicUsize,
    discarded: AtomicUsize,
    violations: AtomicUsize,
    outbound: Mutex<Vec<SentCommand>>,
    sent_packets: Mutex<Vec<(i64, String)>>,
    intercepts: Mutex<Vec<(String, String)>>,
    released: Mutex<Vec<String>>,
    markers: Mutex<Vec<String>>,
    placed_blocks: Mutex<Vec<String>>,
    players: Mutex<HashMap<String, SimPlayer>>,
    packet_mapping: Mutex<HashMap<String, i64>>,
    bot_info_json: Mutex<String>,
    extend_info_json: Mutex<String>,
    subscriptions: Subscriptions,
}

impl SimTransport {
    /// A fresh simulation with a small default packet mapping.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        let packet_mapping = [
            ("Text", 9_i64),
            ("SetTime", 10),
            ("UpdateBlock", 21),
            ("ChangeDimension", 61),
            ("MoveActorDelta", 111),
        ]
        .into_iter()
        .map(|(name, id)| (name.to_string(), id))
        .collect();

        Self {
            injector: Mutex::new(Some(sender)),
            events: Mutex::new(receiver),
            pending: Mutex::new(None),
            available: AtomicBool::new(true),
            consumed: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
            violations: AtomicUsize::new(0),
            outbound: Mutex::new(Vec::new()),
            sent_packets: Mutex::new(Vec::new()),
            intercepts: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
            markers: Mutex::new(Vec::new()),
            placed_blocks: Mutex::new(Vec::new()),
            players: Mutex::new(HashMap::new()),
            packet_mapping: Mutex::new(packet_mapping),
            bot_info_json: Mutex::new(
                r#"{"BotName":"Warden","BotRuntimeID":1,"BotUniqueID":-1,"BotIdentity":"warden","BotUUIDStr":"00000000-0000-0000-0000-000000000001"}"#
                    .to_string(),
            ),
            extend_info_json: Mutex::new("{}".to_string()),
            subscriptions: Subscriptions::default(),
        }
    }

    // ------------------------------------------------------------------
    // Scripting
    // ------------------------------------------------------------------

    /// Adds (or replaces) a player in the directory.
    pub fn add_player(&self, player: SimPlayer) {
        self.players.lock().insert(player.uuid.clone(), player);
    }

    /// Replaces the packet name/id mapping.
    pub fn set_packet_mapping(&self, mapping: HashMap<String, i64>) {
        *self.packet_mapping.lock() = mapping;
    }

    /// Flips the availability flag a real transport reports when its
    /// session dies.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Closes the event queue; the poller sees [`TransportError::Closed`]
    /// once the backlog drains.
    pub fn close(&self) {
        self.injector.lock().take();
    }

    fn inject(&self, event: WireEvent, payload: SimPayload) {
        let injector = self.injector.lock();
        match injector.as_ref() {
            Some(sender) => {
                let _ = sender.send((event, payload));
            }
            None => tracing::debug!("event injected after close, dropped"),
        }
    }

    /// Injects a game packet event carrying a JSON payload.
    pub fn inject_packet(&self, type_name: &str, payload_json: &str) {
        self.inject(
            WireEvent::new("MCPacket", type_name),
            SimPayload::Packet(Ok(payload_json.to_string())),
        );
    }

    /// Injects a game packet event whose payload fails to convert.
    pub fn inject_packet_convert_error(&self, type_name: &str, error: &str) {
        self.inject(
            WireEvent::new("MCPacket", type_name),
            SimPayload::Packet(Err(error.to_string())),
        );
    }

    /// Injects a command reply for the given correlation token.
    pub fn inject_command_reply(&self, token: &str, payload_json: &str) {
        self.inject(
            WireEvent::new("CommandResponseCB", token),
            SimPayload::CommandReply(payload_json.to_string()),
        );
    }

    /// Injects a connection-error event.
    pub fn inject_conn_error(&self, reason: &str) {
        self.inject(
            WireEvent::new("ConnError", ""),
            SimPayload::ConnError(reason.to_string()),
        );
    }

    /// Injects a player-change event.
    pub fn inject_player_change(&self, uuid: &str, action: &str) {
        self.inject(
            WireEvent::new("PlayerChange", uuid),
            SimPayload::PlayerChange(action.to_string()),
        );
    }

    /// Injects an intercepted-input event for the given token.
    pub fn inject_intercepted_input(&self, token: &str, chat_json: &str) {
        self.inject(
            WireEvent::new("PlayerInterceptInput", token),
            SimPayload::Chat(chat_json.to_string()),
        );
    }

    /// Injects a chat event.
    pub fn inject_chat(&self, chat_json: &str) {
        self.inject(
            WireEvent::new("Chat", ""),
            SimPayload::Chat(chat_json.to_string()),
        );
    }

    /// Injects a named command-block message.
    pub fn inject_marker_message(&self, marker: &str, chat_json: &str) {
        self.inject(
            WireEvent::new("NamedCommandBlockMsg", marker),
            SimPayload::Chat(chat_json.to_string()),
        );
    }

    /// Injects an event with an unknown kind tag.
    pub fn inject_unknown(&self, kind_tag: &str) {
        self.inject(
            WireEvent::new(kind_tag, ""),
            SimPayload::Chat(String::new()),
        );
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// How many payloads were read through a consume call.
    #[must_use]
    pub fn consumed_payloads(&self) -> usize {
        self.consumed.load(Ordering::SeqCst)
    }

    /// How many events were acknowledged without a payload read.
    #[must_use]
    pub fn discarded_events(&self) -> usize {
        self.discarded.load(Ordering::SeqCst)
    }

    /// How many discard/consume protocol violations were observed.
    #[must_use]
    pub fn protocol_violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    /// Every outbound command recorded so far.
    #[must_use]
    pub fn sent_commands(&self) -> Vec<SentCommand> {
        self.outbound.lock().clone()
    }

    /// The correlation token of the most recent reply-expecting command.
    #[must_use]
    pub fn last_command_token(&self) -> Option<String> {
        self.outbound
            .lock()
            .iter()
            .rev()
            .find_map(|sent| sent.token.clone())
    }

    /// Every raw packet sent, as `(packet_id, payload_json)`.
    #[must_use]
    pub fn sent_game_packets(&self) -> Vec<(i64, String)> {
        self.sent_packets.lock().clone()
    }

    /// Every intercept request, as `(player_uuid, token)`.
    #[must_use]
    pub fn intercept_requests(&self) -> Vec<(String, String)> {
        self.intercepts.lock().clone()
    }

    /// UUIDs whose native binding was released.
    #[must_use]
    pub fn released_players(&self) -> Vec<String> {
        self.released.lock().clone()
    }

    /// Command-block markers subscribed to.
    #[must_use]
    pub fn listened_markers(&self) -> Vec<String> {
        self.markers.lock().clone()
    }

    /// JSON options of every command block placed.
    #[must_use]
    pub fn placed_command_blocks(&self) -> Vec<String> {
        self.placed_blocks.lock().clone()
    }

    /// Whether the packet/player-change/chat feeds were subscribed.
    #[must_use]
    pub fn subscribed_feeds(&self) -> (bool, bool, bool) {
        (
            self.subscriptions.all_packets.load(Ordering::SeqCst),
            self.subscriptions.player_change.load(Ordering::SeqCst),
            self.subscriptions.chat.load(Ordering::SeqCst),
        )
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn take_pending(&self) -> Option<SimPayload> {
        self.pending.lock().take()
    }

    fn violation(&self, what: &str) -> TransportError {
        self.violations.fetch_add(1, Ordering::SeqCst);
        tracing::error!(what, "event queue protocol violation");
        TransportError::Other(format!("protocol violation: {what}"))
    }

    fn consume_with<T>(
        &self,
        expected: &str,
        extract: impl FnOnce(SimPayload) -> Result<T, SimPayload>,
    ) -> Result<T, TransportError> {
        let Some(payload) = self.take_pending() else {
            return Err(self.violation("consume without a polled event"));
        };
        match extract(payload) {
            Ok(value) => {
                self.consumed.fetch_add(1, Ordering::SeqCst);
                Ok(value)
            }
            Err(_) => Err(self.violation(expected)),
        }
    }

    fn with_player<T>(
        &self,
        uuid: &str,
        read: impl FnOnce(&SimPlayer) -> T,
    ) -> Result<T, TransportError> {
        self.players
            .lock()
            .get(uuid)
            .map(read)
            .ok_or_else(|| TransportError::Other(format!("unknown player {uuid}")))
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SimTransport {
    fn available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn poll_next_event(&self) -> Result<WireEvent, TransportError> {
        if self.pending.lock().is_some() {
            let _ = self.violation("poll with an unacknowledged event");
        }
        let receiver = self.events.lock().clone();
        let (event, payload) = receiver.recv().map_err(|_| TransportError::Closed)?;
        *self.pending.lock() = Some(payload);
        Ok(event)
    }

    fn discard_event(&self) {
        if self.take_pending().is_none() {
            let _ = self.violation("discard without a polled event");
        } else {
            self.discarded.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn consume_conn_error(&self) -> Result<String, TransportError> {
        self.consume_with("expected conn-error payload", |payload| match payload {
            SimPayload::ConnError(reason) => Ok(reason),
            other => Err(other),
        })
    }

    fn consume_command_reply(&self) -> Result<String, TransportError> {
        self.consume_with("expected command-reply payload", |payload| match payload {
            SimPayload::CommandReply(raw) => Ok(raw),
            other => Err(other),
        })
    }

    fn consume_packet(&self) -> Result<String, TransportError> {
        let result = self.consume_with("expected packet payload", |payload| match payload {
            SimPayload::Packet(result) => Ok(result),
            other => Err(other),
        })?;
        result.map_err(TransportError::PacketConvert)
    }

    fn consume_player_change(&self) -> Result<String, TransportError> {
        self.consume_with("expected player-change payload", |payload| match payload {
            SimPayload::PlayerChange(action) => Ok(action),
            other => Err(other),
        })
    }

    fn consume_chat(&self) -> Result<String, TransportError> {
        self.consume_with("expected chat payload", |payload| match payload {
            SimPayload::Chat(raw) => Ok(raw),
            other => Err(other),
        })
    }

    fn send_command_with_reply(
        &self,
        channel: CommandChannel,
        command: &str,
        token: &str,
    ) -> Result<(), TransportError> {
        self.outbound.lock().push(SentCommand {
            channel: Some(channel),
            command: command.to_string(),
            token: Some(token.to_string()),
        });
        Ok(())
    }

    fn send_command_no_reply(
        &self,
        channel: CommandChannel,
        command: &str,
    ) -> Result<(), TransportError> {
        self.outbound.lock().push(SentCommand {
            channel: Some(channel),
            command: command.to_string(),
            token: None,
        });
        Ok(())
    }

    fn send_settings_command(&self, command: &str) -> Result<(), TransportError> {
        self.outbound.lock().push(SentCommand {
            channel: None,
            command: command.to_string(),
            token: None,
        });
        Ok(())
    }

    fn send_game_packet(&self, packet_id: i64, payload_json: &str) -> Result<(), TransportError> {
        self.sent_packets
            .lock()
            .push((packet_id, payload_json.to_string()));
        Ok(())
    }

    fn encode_game_packet(
        &self,
        packet_id: i64,
        payload_json: &str,
    ) -> Result<Vec<u8>, TransportError> {
        let mut bytes = packet_id.to_le_bytes().to_vec();
        bytes.extend_from_slice(payload_json.as_bytes());
        Ok(bytes)
    }

    fn listen_all_packets(&self) {
        self.subscriptions.all_packets.store(true, Ordering::SeqCst);
    }

    fn listen_player_change(&self) {
        self.subscriptions
            .player_change
            .store(true, Ordering::SeqCst);
    }

    fn listen_chat(&self) {
        self.subscriptions.chat.store(true, Ordering::SeqCst);
    }

    fn listen_command_block(&self, name: &str) {
        self.markers.lock().push(name.to_string());
    }

    fn intercept_next_input(&self, player_uuid: &str, token: &str) -> Result<(), TransportError> {
        self.intercepts
            .lock()
            .push((player_uuid.to_string(), token.to_string()));
        Ok(())
    }

    fn packet_name_id_mapping(&self) -> Result<String, TransportError> {
        serde_json::to_string(&*self.packet_mapping.lock())
            .map_err(|err| TransportError::Other(err.to_string()))
    }

    fn bot_basic_info(&self) -> Result<String, TransportError> {
        Ok(self.bot_info_json.lock().clone())
    }

    fn bot_extend_info(&self) -> Result<String, TransportError> {
        Ok(self.extend_info_json.lock().clone())
    }

    fn all_online_players(&self) -> Result<String, TransportError> {
        let players = self.players.lock();
        let uuids: Vec<&str> = players
            .values()
            .filter(|player| player.online)
            .map(|player| player.uuid.as_str())
            .collect();
        serde_json::to_string(&uuids).map_err(|err| TransportError::Other(err.to_string()))
    }

    fn player_uuid_by_name(&self, name: &str) -> Result<String, TransportError> {
        let players = self.players.lock();
        Ok(players
            .values()
            .find(|player| player.name == name && player.online)
            .map(|player| player.uuid.clone())
            .unwrap_or_default())
    }

    fn player_uuid_by_uuid(&self, uuid: &str) -> Result<String, TransportError> {
        let players = self.players.lock();
        Ok(players
            .contains_key(uuid)
            .then(|| uuid.to_string())
            .unwrap_or_default())
    }

    fn release_player(&self, uuid: &str) {
        self.released.lock().push(uuid.to_string());
    }

    fn player_name(&self, uuid: &str) -> Result<String, TransportError> {
        self.with_player(uuid, |player| player.name.clone())
    }

    fn player_entity_unique_id(&self, uuid: &str) -> Result<i64, TransportError> {
        self.with_player(uuid, |player| player.entity_unique_id)
    }

    fn player_entity_runtime_id(&self, uuid: &str) -> Result<u64, TransportError> {
        self.with_player(uuid, |player| player.entity_runtime_id)
    }

    fn player_online(&self, uuid: &str) -> Result<bool, TransportError> {
        self.with_player(uuid, |player| player.online)
    }

    fn player_is_op(&self, uuid: &str) -> Result<bool, TransportError> {
        self.with_player(uuid, |player| player.op)
    }

    fn player_login_time(&self, uuid: &str) -> Result<i64, TransportError> {
        self.with_player(uuid, |player| player.login_time)
    }

    fn player_platform_chat_id(&self, uuid: &str) -> Result<String, TransportError> {
        self.with_player(uuid, |player| player.platform_chat_id.clone())
    }

    fn player_build_platform(&self, uuid: &str) -> Result<i32, TransportError> {
        self.with_player(uuid, |player| player.build_platform)
    }

    fn player_skin_id(&self, uuid: &str) -> Result<String, TransportError> {
        self.with_player(uuid, |player| player.skin_id.clone())
    }

    fn player_device_id(&self, uuid: &str) -> Result<String, TransportError> {
        self.with_player(uuid, |player| player.device_id.clone())
    }

    fn player_command_permission_level(&self, uuid: &str) -> Result<u32, TransportError> {
        self.with_player(uuid, |player| player.command_permission_level)
    }

    fn player_op_permission_level(&self, uuid: &str) -> Result<u32, TransportError> {
        self.with_player(uuid, |player| player.op_permission_level)
    }

    fn player_entity_metadata(&self, uuid: &str) -> Result<String, TransportError> {
        self.with_player(uuid, |player| player.entity_metadata_json.clone())
    }

    fn player_ability_maps(&self, uuid: &str) -> Result<String, TransportError> {
        self.with_player(uuid, |player| player.ability_maps_json.clone())
    }

    fn player_chat(&self, uuid: &str, message: &str) -> Result<(), TransportError> {
        self.with_player(uuid, |_| ())?;
        self.outbound.lock().push(SentCommand {
            channel: None,
            command: format!("chat@{uuid}: {message}"),
            token: None,
        });
        Ok(())
    }

    fn player_title(
        &self,
        uuid: &str,
        title: &str,
        subtitle: &str,
    ) -> Result<(), TransportError> {
        self.with_player(uuid, |_| ())?;
        self.outbound.lock().push(SentCommand {
            channel: None,
            command: format!("title@{uuid}: {title}/{subtitle}"),
            token: None,
        });
        Ok(())
    }

    fn player_action_bar(&self, uuid: &str, message: &str) -> Result<(), TransportError> {
        self.with_player(uuid, |_| ())?;
        self.outbound.lock().push(SentCommand {
            channel: None,
            command: format!("actionbar@{uuid}: {message}"),
            token: None,
        });
        Ok(())
    }

    fn set_player_ability(&self, uuid: &str, maps_json: &str) -> Result<(), TransportError> {
        let mut players = self.players.lock();
        let player = players
            .get_mut(uuid)
            .ok_or_else(|| TransportError::Other(format!("unknown player {uuid}")))?;
        player.ability_maps_json = maps_json.to_string();
        Ok(())
    }

    fn place_command_block(&self, option_json: &str) -> Result<(), TransportError> {
        self.placed_blocks.lock().push(option_json.to_string());
        Ok(())
    }
}
