//! Shared helpers for the session integration tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use netherlink_session::{Session, SessionConfig};
use netherlink_transport::{SimTransport, Transport};

/// Starts a session over the given simulation transport.
pub fn start_session(sim: &Arc<SimTransport>, config: SessionConfig) -> Session {
    let transport: Arc<dyn Transport> = Arc::clone(sim) as Arc<dyn Transport>;
    Session::start(transport, config).expect("session starts")
}

/// Polls a condition until it holds or the timeout expires.
pub fn wait_until(what: &str, timeout: Duration, mut check: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("timed out waiting for {what}");
}

/// Waits for the next reply-expecting command to land in the simulation
/// and returns its correlation token.
pub fn wait_for_command_token(sim: &SimTransport) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(token) = sim.last_command_token() {
            return token;
        }
        assert!(Instant::now() < deadline, "no command was issued");
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Waits for the next intercept request and returns `(uuid, token)`.
pub fn wait_for_intercept_request(sim: &SimTransport) -> (String, String) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(request) = sim.intercept_requests().into_iter().next_back() {
            return request;
        }
        assert!(Instant::now() < deadline, "no intercept was requested");
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// A minimal chat payload in wire form.
pub fn chat_json(name: &str, raw_name: &str, raw_msg: &str) -> String {
    serde_json::json!({
        "Name": name,
        "RawName": raw_name,
        "Msg": [raw_msg],
        "RawMsg": raw_msg,
        "Type": 1,
    })
    .to_string()
}
