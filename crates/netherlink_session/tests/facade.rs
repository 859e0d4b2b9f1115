//! Facade surface: availability checks, topic resolution, player handles,
//! intercepts, outbound traffic, session data.

#[allow(dead_code)]
mod common;

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{chat_json, start_session, wait_for_intercept_request, wait_until};
use netherlink_protocol::CommandBlockPlaceOption;
use netherlink_session::{Session, SessionConfig, SessionError};
use netherlink_transport::{CommandChannel, SimPlayer, SimTransport, Transport};

#[test]
fn test_start_requires_available_transport() {
    let sim = Arc::new(SimTransport::new());
    sim.set_available(false);
    let transport: Arc<dyn Transport> = Arc::clone(&sim) as Arc<dyn Transport>;
    assert!(matches!(
        Session::start(transport, SessionConfig::default()),
        Err(SessionError::Unavailable)
    ));
}

#[test]
fn test_operations_fail_fast_when_unavailable() {
    let sim = Arc::new(SimTransport::new());
    let session = start_session(&sim, SessionConfig::default());

    sim.set_available(false);

    assert!(matches!(
        session.send_command("list", Some(Duration::from_secs(1))),
        Err(SessionError::Unavailable)
    ));
    assert!(matches!(
        session.send_settings_command("gamerule dodaylightcycle false"),
        Err(SessionError::Unavailable)
    ));
    assert!(matches!(
        session.online_players(),
        Err(SessionError::Unavailable)
    ));
    assert!(matches!(
        session.extend_info(),
        Err(SessionError::Unavailable)
    ));
    // nothing was registered or sent along the way
    assert_eq!(session.in_flight_requests(), 0);
    assert!(sim.sent_commands().is_empty());
}

#[test]
fn test_startup_subscribes_the_event_feeds() {
    let sim = Arc::new(SimTransport::new());
    let _session = start_session(&sim, SessionConfig::default());
    assert_eq!(sim.subscribed_feeds(), (true, true, true));
}

#[test]
fn test_command_channels_are_recorded() {
    let sim = Arc::new(SimTransport::new());
    let session = start_session(&sim, SessionConfig::default());

    session.send_command_no_reply("say ws").unwrap();
    session.send_player_command_no_reply("say player").unwrap();
    session.send_settings_command("say settings").unwrap();

    let sent = sim.sent_commands();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].channel, Some(CommandChannel::WebSocket));
    assert_eq!(sent[0].command, "say ws");
    assert!(sent[0].token.is_none());
    assert_eq!(sent[1].channel, Some(CommandChannel::Player));
    assert_eq!(sent[2].channel, None);
}

#[test]
fn test_listen_packets_rejects_unknown_specs() {
    let sim = Arc::new(SimTransport::new());
    let session = start_session(&sim, SessionConfig::default());

    let err = session.listen_packets(&["NoSuchPacket"], |_, _| {}).unwrap_err();
    assert!(matches!(err, SessionError::InvalidTopic(spec) if spec == "NoSuchPacket"));
}

#[test]
fn test_listen_packets_all_with_exclusion() {
    let sim = Arc::new(SimTransport::new());
    let session = start_session(&sim, SessionConfig::default());

    let (tx, rx) = mpsc::channel();
    session
        .listen_packets(&["all", "!UpdateBlock"], move |name, _| {
            tx.send(name.to_string()).unwrap();
        })
        .unwrap();

    sim.inject_packet("UpdateBlock", "{}");
    sim.inject_packet("SetTime", "{}");

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "SetTime");
    // the excluded packet was discarded, not delivered
    assert_eq!(sim.discarded_events(), 1);
}

#[test]
fn test_numeric_spec_registers_by_name() {
    let sim = Arc::new(SimTransport::new());
    let session = start_session(&sim, SessionConfig::default());

    let (tx, rx) = mpsc::channel();
    session
        .listen_packets(&["10"], move |name, _| tx.send(name.to_string()).unwrap())
        .unwrap();

    sim.inject_packet("SetTime", "{}");
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "SetTime");
}

#[test]
fn test_packet_mapping_lookups() {
    let sim = Arc::new(SimTransport::new());
    let session = start_session(&sim, SessionConfig::default());

    assert_eq!(session.packet_id("SetTime").unwrap(), 10);
    assert_eq!(session.packet_name(10).unwrap(), "SetTime");
    assert!(session.packet_mapping().contains_key("UpdateBlock"));
    assert!(matches!(
        session.packet_id("Nope"),
        Err(SessionError::InvalidTopic(_))
    ));
    assert!(matches!(
        session.packet_name(9999),
        Err(SessionError::InvalidTopic(_))
    ));
}

#[test]
fn test_send_game_packet_by_name_and_id() {
    let sim = Arc::new(SimTransport::new());
    let session = start_session(&sim, SessionConfig::default());

    let payload = serde_json::json!({"Time": 69221000});
    session.send_game_packet("SetTime", &payload).unwrap();
    session.send_game_packet(21_i64, &payload).unwrap();

    let sent = sim.sent_game_packets();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, 10);
    assert!(sent[0].1.contains("69221000"));
    assert_eq!(sent[1].0, 21);

    assert!(matches!(
        session.send_game_packet("Nope", &payload),
        Err(SessionError::InvalidTopic(_))
    ));
}

#[test]
fn test_encode_game_packet_returns_id_and_bytes() {
    let sim = Arc::new(SimTransport::new());
    let session = start_session(&sim, SessionConfig::default());

    let (id, bytes) = session
        .encode_game_packet("SetTime", &serde_json::json!({"Time": 1}))
        .unwrap();
    assert_eq!(id, 10);
    assert!(!bytes.is_empty());
}

#[test]
fn test_player_resolution_and_cache_identity() {
    let sim = Arc::new(SimTransport::new());
    sim.add_player(SimPlayer::new("uuid-alice", "Alice"));
    let session = start_session(&sim, SessionConfig::default());

    let by_name = session.player_by_name("Alice").unwrap().unwrap();
    let by_uuid = session.player_by_uuid("uuid-alice").unwrap().unwrap();
    assert!(Arc::ptr_eq(&by_name, &by_uuid));
    assert_eq!(session.cached_players(), 1);

    // unknown identifiers resolve to nothing, not to a dangling handle
    assert!(session.player_by_name("Nobody").unwrap().is_none());
    assert!(session.player_by_uuid("uuid-nobody").unwrap().is_none());
    assert_eq!(session.cached_players(), 1);
}

#[test]
fn test_player_attributes_are_read_through() {
    let sim = Arc::new(SimTransport::new());
    let mut alice = SimPlayer::new("uuid-alice", "Alice");
    alice.op = true;
    alice.login_time = 1_700_000_000;
    sim.add_player(alice);
    let session = start_session(&sim, SessionConfig::default());

    let player = session.player_by_name("Alice").unwrap().unwrap();
    assert_eq!(player.name().unwrap(), "Alice");
    assert!(player.is_op().unwrap());
    assert!(player.online().unwrap());
    assert_eq!(player.login_time().unwrap(), 1_700_000_000);

    // attributes are queried live, never cached on the handle
    let mut renamed = SimPlayer::new("uuid-alice", "Alicia");
    renamed.op = false;
    sim.add_player(renamed);
    assert_eq!(player.name().unwrap(), "Alicia");
    assert!(!player.is_op().unwrap());
}

#[test]
fn test_online_players_lists_handles() {
    let sim = Arc::new(SimTransport::new());
    sim.add_player(SimPlayer::new("uuid-alice", "Alice"));
    let mut offline = SimPlayer::new("uuid-bob", "Bob");
    offline.online = false;
    sim.add_player(offline);
    let session = start_session(&sim, SessionConfig::default());

    let online = session.online_players().unwrap();
    assert_eq!(online.len(), 1);
    assert_eq!(online[0].uuid(), "uuid-alice");
}

#[test]
fn test_ask_round_trip() {
    let sim = Arc::new(SimTransport::new());
    sim.add_player(SimPlayer::new("uuid-alice", "Alice"));
    let session = start_session(&sim, SessionConfig::default());
    let player = session.player_by_name("Alice").unwrap().unwrap();

    let answer = thread::scope(|scope| {
        let asker = scope.spawn(|| {
            player
                .ask("what is the password?", Some(Duration::from_secs(5)))
                .unwrap()
        });
        let (uuid, token) = wait_for_intercept_request(&sim);
        assert_eq!(uuid, "uuid-alice");
        sim.inject_intercepted_input(&token, &chat_json("Alice", "Alice", "  hunter2  "));
        asker.join().unwrap()
    });

    assert_eq!(answer.as_deref(), Some("hunter2"));
    assert_eq!(session.in_flight_requests(), 0);
}

#[test]
fn test_intercept_timeout_returns_none() {
    let sim = Arc::new(SimTransport::new());
    sim.add_player(SimPlayer::new("uuid-alice", "Alice"));
    let session = start_session(&sim, SessionConfig::default());
    let player = session.player_by_name("Alice").unwrap().unwrap();

    let input = session
        .intercept_next_input(&player, Some(Duration::from_millis(10)))
        .unwrap();
    assert!(input.is_none());
    assert_eq!(session.in_flight_requests(), 0);
}

#[test]
fn test_bot_and_extend_info() {
    let sim = Arc::new(SimTransport::new());
    let session = start_session(&sim, SessionConfig::default());

    assert_eq!(session.bot_info().name, "Warden");
    let extend = session.extend_info().unwrap();
    assert!(extend.time.is_none());
    assert!(extend.game_rules.is_none());
}

#[test]
fn test_place_command_block_serializes_options() {
    let sim = Arc::new(SimTransport::new());
    let session = start_session(&sim, SessionConfig::default());

    let option = CommandBlockPlaceOption {
        x: 836,
        y: 84,
        z: 889,
        block_name: "command_block".to_string(),
        block_state: "1".to_string(),
        command: "say hello".to_string(),
        name: "hello".to_string(),
        tick_delay: 10,
        ..CommandBlockPlaceOption::default()
    };
    session.place_command_block(&option).unwrap();

    let placed = sim.placed_command_blocks();
    assert_eq!(placed.len(), 1);
    assert!(placed[0].contains("\"BlockName\":\"command_block\""));
    assert!(placed[0].contains("\"BockState\":\"1\""));
}

#[test]
fn test_handles_release_exactly_once_on_shutdown() {
    let sim = Arc::new(SimTransport::new());
    sim.add_player(SimPlayer::new("uuid-bob", "Bob"));
    let session = start_session(&sim, SessionConfig::default());

    let player = session.player_by_name("Bob").unwrap().unwrap();
    drop(player);

    sim.close();
    drop(session);

    wait_until("handle released", Duration::from_secs(5), || {
        !sim.released_players().is_empty()
    });
    assert_eq!(sim.released_players(), vec!["uuid-bob".to_string()]);
}
