//! # Listener Registry
//!
//! Topic-keyed, ordered collections of callbacks.
//!
//! Registration only ever appends: there is no removal, duplicates are
//! allowed (and both fire), and insertion order is the order listeners are
//! handed to the task pool for one event. The `has_*` probes exist so the
//! dispatch loop can decide to discard an event before paying any
//! deserialization cost.

use std::collections::HashMap;
use std::sync::Arc;

use netherlink_protocol::{ChatMessage, PlayerChange};
use parking_lot::RwLock;
use serde_json::Value;

use crate::players::PlayerHandle;

/// Callback for a game packet: `(packet type name, packet data)`.
pub type PacketCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;
/// Callback for chat from a recognized player.
pub type ChatCallback = Arc<dyn Fn(&ChatMessage, &Arc<PlayerHandle>) + Send + Sync>;
/// Callback for chat keyed by speaker name, or a marker message.
pub type MessageCallback = Arc<dyn Fn(&ChatMessage) + Send + Sync>;
/// Callback for a player joining, leaving, or already existing.
pub type PlayerChangeCallback = Arc<dyn Fn(&Arc<PlayerHandle>, &PlayerChange) + Send + Sync>;

/// All listener collections of one session.
#[derive(Default)]
pub struct ListenerRegistry {
    packet: RwLock<HashMap<String, Vec<PacketCallback>>>,
    player_change: RwLock<Vec<PlayerChangeCallback>>,
    chat: RwLock<Vec<ChatCallback>>,
    speaker: RwLock<HashMap<String, Vec<MessageCallback>>>,
    marker: RwLock<HashMap<String, Vec<MessageCallback>>>,
}

impl ListenerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a packet listener for the given packet-type name.
    pub fn register_packet(&self, type_name: &str, callback: PacketCallback) {
        self.packet
            .write()
            .entry(type_name.to_string())
            .or_default()
            .push(callback);
    }

    /// Ordered packet listeners for a packet-type name.
    #[must_use]
    pub fn packet_listeners(&self, type_name: &str) -> Vec<PacketCallback> {
        self.packet
            .read()
            .get(type_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Appends an any-player-change listener.
    pub fn register_player_change(&self, callback: PlayerChangeCallback) {
        self.player_change.write().push(callback);
    }

    /// Ordered player-change listeners.
    #[must_use]
    pub fn player_change_listeners(&self) -> Vec<PlayerChangeCallback> {
        self.player_change.read().clone()
    }

    /// Whether any player-change listener is registered.
    #[must_use]
    pub fn has_player_change(&self) -> bool {
        !self.player_change.read().is_empty()
    }

    /// Appends a global chat listener.
    pub fn register_chat(&self, callback: ChatCallback) {
        self.chat.write().push(callback);
    }

    /// Ordered global chat listeners.
    #[must_use]
    pub fn chat_listeners(&self) -> Vec<ChatCallback> {
        self.chat.read().clone()
    }

    /// Appends a listener keyed to one speaker name (display or raw).
    pub fn register_speaker(&self, name: &str, callback: MessageCallback) {
        self.speaker
            .write()
            .entry(name.to_string())
            .or_default()
            .push(callback);
    }

    /// Ordered listeners keyed to the given speaker name.
    #[must_use]
    pub fn speaker_listeners(&self, name: &str) -> Vec<MessageCallback> {
        self.speaker.read().get(name).cloned().unwrap_or_default()
    }

    /// Whether any chat consumer exists at all (global or speaker-keyed).
    ///
    /// The speaker of a chat event is only known after its payload is
    /// read, so this is the gate the dispatch loop checks before
    /// consuming.
    #[must_use]
    pub fn has_any_chat(&self) -> bool {
        if !self.chat.read().is_empty() {
            return true;
        }
        self.speaker
            .read()
            .values()
            .any(|listeners| !listeners.is_empty())
    }

    /// Appends a listener for the named command-block marker.
    pub fn register_marker(&self, name: &str, callback: MessageCallback) {
        self.marker
            .write()
            .entry(name.to_string())
            .or_default()
            .push(callback);
    }

    /// Ordered listeners for the named command-block marker.
    #[must_use]
    pub fn marker_listeners(&self, name: &str) -> Vec<MessageCallback> {
        self.marker.read().get(name).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_packet_listeners_keep_registration_order() {
        let registry = ListenerRegistry::new();
        let order = Arc::new(RwLock::new(Vec::new()));
        for index in 0..4 {
            let order = Arc::clone(&order);
            let callback: PacketCallback = Arc::new(move |_, _| order.write().push(index));
            registry.register_packet("SetTime", callback);
        }

        for callback in registry.packet_listeners("SetTime") {
            callback("SetTime", &Value::Null);
        }
        assert_eq!(*order.read(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_duplicate_registration_fires_twice() {
        let registry = ListenerRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let callback: PacketCallback = {
            let count = Arc::clone(&count);
            Arc::new(move |_, _| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        registry.register_packet("SetTime", Arc::clone(&callback));
        registry.register_packet("SetTime", callback);

        for callback in registry.packet_listeners("SetTime") {
            callback("SetTime", &Value::Null);
        }
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_chat_gate() {
        let registry = ListenerRegistry::new();
        assert!(!registry.has_any_chat());

        registry.register_speaker("Alice", Arc::new(|_| {}));
        assert!(registry.has_any_chat());
        assert_eq!(registry.speaker_listeners("Alice").len(), 1);
        assert!(registry.speaker_listeners("Bob").is_empty());
    }

    #[test]
    fn test_unknown_topics_are_empty() {
        let registry = ListenerRegistry::new();
        assert!(registry.packet_listeners("SetTime").is_empty());
        assert!(registry.marker_listeners("gate").is_empty());
        assert!(!registry.has_player_change());
    }
}
