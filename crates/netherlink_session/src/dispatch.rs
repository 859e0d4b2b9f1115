//! # Dispatch Loop
//!
//! The single consumer of the transport's event queue.
//!
//! ```text
//!                 ┌───────────────────────────────────────────┐
//!                 │               DISPATCH LOOP               │
//!   poll ───────> │  gate check ──> discard                   │
//!                 │       │                                   │
//!                 │       └──> consume ──┬─> fulfil pending   │
//!                 │                      └─> task pool ──> listeners
//!                 └───────────────────────────────────────────┘
//! ```
//!
//! For every polled event exactly one of discard/consume is issued.
//! Events nobody listens for are discarded before their payload is ever
//! deserialized. Listener invocations are handed to the task pool in
//! registration order and never block the loop; malformed payloads are
//! logged at the point of consumption and never unwind past it.

use std::sync::Arc;

use netherlink_protocol::{ChatMessage, CommandOutput, EventKind, PlayerChange, WireEvent};
use netherlink_transport::Transport;
use serde_json::Value;

use crate::session::Shared;

/// Drains the event queue until the transport reports it closed.
pub(crate) fn run(shared: &Arc<Shared>) {
    loop {
        let event = match shared.transport.poll_next_event() {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(%err, "event queue closed, dispatch loop exiting");
                shared.note_disconnect("event queue closed");
                break;
            }
        };
        handle_event(shared, event);
    }
}

fn handle_event(shared: &Arc<Shared>, event: WireEvent) {
    match event.kind {
        EventKind::ConnError => on_conn_error(shared),
        EventKind::CommandReply => on_command_reply(shared, &event.retriever),
        EventKind::GamePacket => on_game_packet(shared, event.retriever),
        EventKind::PlayerChange => on_player_change(shared, &event.retriever),
        EventKind::InterceptedInput => on_intercepted_input(shared, &event.retriever),
        EventKind::Chat => on_chat(shared),
        EventKind::CommandBlockMsg => on_marker_message(shared, &event.retriever),
        EventKind::Unknown(tag) => {
            shared.transport.discard_event();
            tracing::warn!(kind = %tag, "discarding event of unrecognized kind");
        }
    }
}

fn on_conn_error(shared: &Arc<Shared>) {
    match shared.transport.consume_conn_error() {
        Ok(reason) => shared.note_disconnect(&reason),
        Err(err) => tracing::error!(%err, "failed to read disconnect reason"),
    }
}

fn on_command_reply(shared: &Arc<Shared>, token: &str) {
    let raw = match shared.transport.consume_command_reply() {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(token, %err, "command reply payload unavailable");
            return;
        }
    };
    match CommandOutput::from_json(&raw) {
        Ok(output) => {
            if !shared.pending_commands.fulfil(token, output) {
                // the caller timed out and walked away; drop on miss
                tracing::debug!(token, "late command reply dropped");
            }
        }
        Err(err) => tracing::error!(token, %err, "malformed command reply"),
    }
}

fn on_game_packet(shared: &Arc<Shared>, type_name: String) {
    let callbacks = shared.listeners.packet_listeners(&type_name);
    if callbacks.is_empty() {
        shared.transport.discard_event();
        return;
    }

    let raw = match shared.transport.consume_packet() {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(packet = %type_name, %err, "packet payload conversion failed");
            return;
        }
    };
    let payload: Value = match serde_json::from_str(&raw) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(packet = %type_name, %err, "malformed packet payload");
            return;
        }
    };

    let type_name: Arc<str> = type_name.into();
    let payload = Arc::new(payload);
    for callback in callbacks {
        let type_name = Arc::clone(&type_name);
        let payload = Arc::clone(&payload);
        shared.pool.spawn(move || callback(&type_name, &payload));
    }
}

fn on_player_change(shared: &Arc<Shared>, uuid: &str) {
    if !shared.listeners.has_player_change() {
        shared.transport.discard_event();
        return;
    }

    let action = match shared.transport.consume_player_change() {
        Ok(action) => PlayerChange::from_action(&action),
        Err(err) => {
            tracing::error!(player = uuid, %err, "player change payload unavailable");
            return;
        }
    };
    let Some(player) = shared.players.resolve(shared, uuid) else {
        tracing::warn!("player change event without a player id");
        return;
    };

    for callback in shared.listeners.player_change_listeners() {
        let player = Arc::clone(&player);
        let action = action.clone();
        shared.pool.spawn(move || callback(&player, &action));
    }
}

fn on_intercepted_input(shared: &Arc<Shared>, token: &str) {
    let message = match consume_chat_record(shared) {
        Some(message) => message,
        None => return,
    };
    if !shared.pending_intercepts.fulfil(token, message) {
        tracing::debug!(token, "intercepted input without a waiter, dropped");
    }
}

fn on_chat(shared: &Arc<Shared>) {
    // the speaker is only known once the payload is read, so the gate can
    // only ask whether any chat consumer exists at all
    if !shared.listeners.has_any_chat() {
        shared.transport.discard_event();
        return;
    }

    let Some(message) = consume_chat_record(shared) else {
        return;
    };

    let speaker = Shared::resolve_by_name(shared, &message.speaker_name).unwrap_or_default();
    let message = Arc::new(message);
    match speaker {
        // unrecognized speaker: only name-keyed listeners fire, under the
        // display and raw names independently
        None => {
            for callback in shared.listeners.speaker_listeners(&message.speaker_name) {
                let message = Arc::clone(&message);
                shared.pool.spawn(move || callback(&message));
            }
            if message.raw_speaker_name != message.speaker_name {
                for callback in shared.listeners.speaker_listeners(&message.raw_speaker_name) {
                    let message = Arc::clone(&message);
                    shared.pool.spawn(move || callback(&message));
                }
            }
        }
        Some(player) => {
            for callback in shared.listeners.chat_listeners() {
                let message = Arc::clone(&message);
                let player = Arc::clone(&player);
                shared.pool.spawn(move || callback(&message, &player));
            }
        }
    }
}

fn on_marker_message(shared: &Arc<Shared>, marker: &str) {
    let callbacks = shared.listeners.marker_listeners(marker);
    if callbacks.is_empty() {
        shared.transport.discard_event();
        return;
    }

    let Some(message) = consume_chat_record(shared) else {
        return;
    };
    let message = Arc::new(message);
    for callback in callbacks {
        let message = Arc::clone(&message);
        shared.pool.spawn(move || callback(&message));
    }
}

fn consume_chat_record(shared: &Arc<Shared>) -> Option<ChatMessage> {
    let raw = match shared.transport.consume_chat() {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(%err, "chat payload unavailable");
            return None;
        }
    };
    match ChatMessage::from_json(&raw) {
        Ok(message) => Some(message),
        Err(err) => {
            tracing::error!(%err, "malformed chat payload");
            None
        }
    }
}
