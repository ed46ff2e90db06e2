//! Egyptian Rat Screw State Library
//!
//! This crate provides the authoritative rules engine for Egyptian Rat Screw
//! sessions.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Deck Manager** - Builds, shuffles and deals the 52-card deck with a
//!   seedable RNG so games can be replayed.
//!
//! - **Rule Table** - Decides whether the center pile is slappable under the
//!   configured slap rules.
//!
//! - **Challenge State Machine** - Tracks face-card challenges and who
//!   collects the pile when one fails.
//!
//! - **Session Coordinator** - Applies player intents one at a time, checks
//!   invariants and publishes versioned snapshots.
//!
//! # Design Principles
//!
//! 1. **Single writer** - Only the session mutates hands and piles; everything
//!    else is a pure evaluator it consults.
//!
//! 2. **Atomic intents** - An intent either applies whole or leaves state
//!    untouched.
//!
//! 3. **No networking** - This crate is pure state, no WebSocket or HTTP.
//!
//! 4. **Serialization-ready** - Snapshots can be converted to JSON for clients.
//!
//! # Example
//!
//! ```rust
//! use ers_state::{Coordinator, Session, SessionConfig, SessionStatus};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let (handle, _task) = Coordinator::spawn(Session::new(SessionConfig::default()));
//! let mut updates = handle.subscribe();
//!
//! let alice = handle.join("Alice").await.unwrap();
//! handle.join("Bob").await.unwrap();
//! handle.start_game().await.unwrap();
//! handle.play_card(alice, None).await.unwrap();
//!
//! let snapshot = handle.snapshot().await.unwrap();
//! assert_eq!(snapshot.status, SessionStatus::InProgress);
//! assert_eq!(updates.recv().await.unwrap().version, 1);
//! # });
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
