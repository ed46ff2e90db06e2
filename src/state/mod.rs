//! Game state for Egyptian Rat Screw.
//!
//! This module provides the core state types and the session that owns them:
//!
//! - `cards` - Card values, deck building, shuffling and dealing
//! - `rules` - Slap rule table and adjudication
//! - `challenge` - Face-card challenge state machine
//! - `turn` - Seating order and whose turn it is
//! - `winner` - Win detection
//! - `session` - The authoritative session (`Session::apply`)
//! - `coordinator` - Async single-writer actor around a session
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          SessionHandle (Clone)                        │
//! │        submit(Intent) ──▶ mpsc ──▶ Coordinator task ──▶ broadcast      │
//! │                                        │            Arc<GameSnapshot> │
//! │                                        ▼                              │
//! │  ┌─────────────────────────── Session ───────────────────────────┐    │
//! │  │  apply(intent):  clone table ─▶ validate ─▶ mutate ─▶ detect  │    │
//! │  │                  winner ─▶ check invariants ─▶ commit          │    │
//! │  │                                                                │    │
//! │  │   TurnOrder    RuleSet    ChallengeState    winner::detect     │    │
//! │  │   (pure helpers consulted by the session, never mutators)     │    │
//! │  └────────────────────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use ers_state::state::{Intent, Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::default().with_seed(7));
//! let alice = session.join("Alice").unwrap();
//! let _bob = session.join("Bob").unwrap();
//! session.start_game().unwrap();
//!
//! let outcome = session.apply(Intent::play(alice)).unwrap();
//! assert_eq!(outcome.version, 4);
//! assert_eq!(session.snapshot().center_pile.len(), 1);
//! ```

pub mod cards;
pub mod challenge;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod intent;
pub mod player;
pub mod rng;
pub mod rules;
pub mod session;
pub mod snapshot;
pub mod turn;
pub mod winner;

// Re-export commonly used types
pub use cards::{build_deck, deal, shuffle, Card, ParseCardError, Rank, Suit, DECK_SIZE};
pub use challenge::{Challenge, ChallengeState, ChallengeStep};
pub use config::{
    PenaltyPolicy, SessionConfig, DEFAULT_MAX_PLAYERS, DEFAULT_SNAPSHOT_BUFFER, MIN_PLAYERS,
};
pub use coordinator::{Coordinator, SessionHandle};
pub use error::{ConfigRejection, Rejection, SessionError};
pub use intent::{Effect, Intent, IntentOutcome, Penalty};
pub use player::{Connectivity, Player, PlayerId};
pub use rng::GameRng;
pub use rules::{is_valid_slap, matching_rules, RuleSet, SlapRule};
pub use session::Session;
pub use snapshot::{GameSnapshot, PlayerView, SessionStatus, SlapRecord};
pub use turn::TurnOrder;
pub use winner::Outcome;
