//! # Player Handles
//!
//! One cached handle per remote player, resolved lazily by identifier.
//!
//! A handle caches nothing but the player's identity: every attribute may
//! change at any time server-side, so all accessors are read-through
//! queries against the transport. The cache hands out the identical
//! `Arc` for repeated resolutions of one identifier and never evicts; the
//! native binding is released exactly once, when the last reference drops.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use netherlink_protocol::{
    AbilityMaps, ChatMessage, CommandOutput, ProtocolError, QueriedPlayerPos,
};
use netherlink_transport::Transport;
use parking_lot::Mutex;

use crate::error::SessionError;
use crate::session::Shared;

/// Handle to one remote player, bound to the external session.
pub struct PlayerHandle {
    uuid: String,
    transport: Arc<dyn Transport>,
    session: Weak<Shared>,
}

impl PlayerHandle {
    pub(crate) fn bind(shared: &Arc<Shared>, uuid: &str) -> Self {
        Self {
            uuid: uuid.to_string(),
            transport: Arc::clone(&shared.transport),
            session: Arc::downgrade(shared),
        }
    }

    fn ensure_available(&self) -> Result<(), SessionError> {
        if self.transport.available() {
            Ok(())
        } else {
            Err(SessionError::Unavailable)
        }
    }

    fn session(&self) -> Result<Arc<Shared>, SessionError> {
        self.session.upgrade().ok_or(SessionError::Unavailable)
    }

    /// The stable identifier this handle is bound to.
    #[inline]
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Current display name.
    pub fn name(&self) -> Result<String, SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_name(&self.uuid)?)
    }

    /// Unique entity id.
    pub fn entity_unique_id(&self) -> Result<i64, SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_entity_unique_id(&self.uuid)?)
    }

    /// Runtime entity id.
    pub fn entity_runtime_id(&self) -> Result<u64, SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_entity_runtime_id(&self.uuid)?)
    }

    /// Whether the player is currently online.
    pub fn online(&self) -> Result<bool, SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_online(&self.uuid)?)
    }

    /// Whether the player has operator rights.
    pub fn is_op(&self) -> Result<bool, SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_is_op(&self.uuid)?)
    }

    /// Unix timestamp of the player's login.
    pub fn login_time(&self) -> Result<i64, SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_login_time(&self.uuid)?)
    }

    /// Platform chat id.
    pub fn platform_chat_id(&self) -> Result<String, SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_platform_chat_id(&self.uuid)?)
    }

    /// Numeric build platform of the player's client.
    pub fn build_platform(&self) -> Result<i32, SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_build_platform(&self.uuid)?)
    }

    /// Skin id.
    pub fn skin_id(&self) -> Result<String, SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_skin_id(&self.uuid)?)
    }

    /// Device id.
    pub fn device_id(&self) -> Result<String, SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_device_id(&self.uuid)?)
    }

    /// Command permission level.
    pub fn command_permission_level(&self) -> Result<u32, SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_command_permission_level(&self.uuid)?)
    }

    /// Operator permission level.
    pub fn op_permission_level(&self) -> Result<u32, SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_op_permission_level(&self.uuid)?)
    }

    /// Entity metadata, parsed.
    pub fn entity_metadata(&self) -> Result<serde_json::Value, SessionError> {
        self.ensure_available()?;
        let raw = self.transport.player_entity_metadata(&self.uuid)?;
        Ok(serde_json::from_str(&raw).map_err(ProtocolError::from)?)
    }

    /// Action permissions and adventure flags.
    pub fn ability_maps(&self) -> Result<AbilityMaps, SessionError> {
        self.ensure_available()?;
        let raw = self.transport.player_ability_maps(&self.uuid)?;
        Ok(AbilityMaps::from_json(&raw)?)
    }

    /// Replaces the player's ability maps.
    pub fn set_ability_maps(&self, maps: &AbilityMaps) -> Result<(), SessionError> {
        self.ensure_available()?;
        let encoded = serde_json::to_string(maps).map_err(ProtocolError::from)?;
        Ok(self.transport.set_player_ability(&self.uuid, &encoded)?)
    }

    /// Sends a chat message to the player.
    pub fn say(&self, message: &str) -> Result<(), SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_chat(&self.uuid, message)?)
    }

    /// Shows a title to the player; the subtitle only renders when the
    /// title is non-empty.
    pub fn title(&self, title: &str, subtitle: &str) -> Result<(), SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_title(&self.uuid, title, subtitle)?)
    }

    /// Shows an action-bar message to the player.
    pub fn action_bar(&self, message: &str) -> Result<(), SessionError> {
        self.ensure_available()?;
        Ok(self.transport.player_action_bar(&self.uuid, message)?)
    }

    /// Runs `querytarget` against this player, optionally with extra
    /// selector conditions.
    pub fn query(
        &self,
        conditions: &[&str],
        timeout: Option<Duration>,
    ) -> Result<Option<CommandOutput>, SessionError> {
        let session = self.session()?;
        let name = self.name()?;
        let mut selector = format!("querytarget @a[name=\"{name}\"");
        for condition in conditions {
            selector.push(',');
            selector.push_str(condition);
        }
        selector.push(']');
        session.send_command_with_reply(
            netherlink_transport::CommandChannel::WebSocket,
            &selector,
            timeout,
        )
    }

    /// Whether this player currently matches the given selector
    /// conditions. A timed-out query counts as no match.
    pub fn check_conditions(
        &self,
        conditions: &[&str],
        timeout: Option<Duration>,
    ) -> Result<bool, SessionError> {
        Ok(self
            .query(conditions, timeout)?
            .is_some_and(|output| output.succeeded()))
    }

    /// Current position, from a `querytarget` round trip. `None` when the
    /// query timed out.
    pub fn position(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Option<QueriedPlayerPos>, SessionError> {
        match self.query(&[], timeout)? {
            Some(output) => Ok(Some(QueriedPlayerPos::from_query_output(&output)?)),
            None => Ok(None),
        }
    }

    /// Shows a hint to the player and blocks until their next input is
    /// intercepted (or the timeout expires).
    pub fn ask(
        &self,
        hint: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<String>, SessionError> {
        let session = self.session()?;
        self.say(hint)?;
        let input: Option<ChatMessage> = session.intercept_next_input(self, timeout)?;
        Ok(input.map(|message| message.raw_message.trim().to_string()))
    }
}

impl fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("uuid", &self.uuid)
            .finish()
    }
}

impl Drop for PlayerHandle {
    fn drop(&mut self) {
        self.transport.release_player(&self.uuid);
    }
}

/// Lazy, memoizing cache of player handles.
///
/// Bounded by the distinct identifiers seen during one session; a session's
/// player population is small and short-lived relative to memory, so
/// entries are never evicted proactively.
pub(crate) struct PlayerRoster {
    handles: Mutex<HashMap<String, Arc<PlayerHandle>>>,
}

impl PlayerRoster {
    pub(crate) fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves a handle, creating and memoizing it on first reference.
    /// An empty identifier resolves to `None`.
    pub(crate) fn resolve(
        &self,
        shared: &Arc<Shared>,
        uuid: &str,
    ) -> Option<Arc<PlayerHandle>> {
        if uuid.is_empty() {
            return None;
        }
        // single locked entry keeps concurrent first resolutions from
        // constructing two handles
        let mut handles = self.handles.lock();
        let handle = handles
            .entry(uuid.to_string())
            .or_insert_with(|| Arc::new(PlayerHandle::bind(shared, uuid)));
        Some(Arc::clone(handle))
    }

    pub(crate) fn cached(&self) -> usize {
        self.handles.lock().len()
    }
}
