//! # NETHERLINK Session - The Dispatch Engine
//!
//! A live, stateful game-client session over a polling event queue.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SESSION ENGINE                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
//! │  │ Dispatch Loop│  │ Pending Table│  │  Task Pool   │      │
//! │  │ (1 consumer) │──│ (correlation)│  │ (fan-out)    │      │
//! │  └──────────────┘  └──────────────┘  └──────────────┘      │
//! │         │                  ▲                │               │
//! │         │    ┌─────────────┘                ▼               │
//! │         │    │    ┌──────────────┐  ┌──────────────┐       │
//! │         └────┼───>│  Listeners   │  │ user callbacks│      │
//! │              │    └──────────────┘  └──────────────┘       │
//! │  ┌───────────┴──┐  ┌──────────────┐                        │
//! │  │Session Facade│  │ Player Cache │                        │
//! │  │ (blocking)   │  │ (per-uuid)   │                        │
//! │  └──────────────┘  └──────────────┘                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exactly one thread runs the dispatch loop for the lifetime of the
//! session. It never blocks on listener execution — every invocation is
//! handed to the task pool — and it is the only path that resolves pending
//! request waits. Facade calls block only their own thread.
//!
//! ## Example
//!
//! ```rust,ignore
//! use netherlink_session::{Session, SessionConfig};
//!
//! let session = Session::start(transport, SessionConfig::default())?;
//! session.listen_packets(&["SetTime"], |name, data| {
//!     println!("{name}: {data}");
//! })?;
//! let reply = session.send_command("tp @s ~~~", Some(Duration::from_secs(5)))?;
//! ```

mod dispatch;

pub mod error;
pub mod listeners;
pub mod pending;
pub mod players;
pub mod session;
pub mod signal;
pub mod spawner;
pub mod token;
pub mod topics;

pub use error::SessionError;
pub use listeners::{
    ChatCallback, ListenerRegistry, MessageCallback, PacketCallback, PlayerChangeCallback,
};
pub use pending::{Awaiter, PendingTable};
pub use players::PlayerHandle;
pub use session::{DisconnectPolicy, PacketSelector, Session, SessionConfig};
pub use signal::DisconnectSignal;
pub use spawner::TaskPool;
pub use token::TokenCounter;
