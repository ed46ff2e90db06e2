//! Session configuration.

use serde::{Deserialize, Serialize};

use super::rules::RuleSet;

/// Players needed to start a game.
pub const MIN_PLAYERS: usize = 2;

/// Default seat limit.
pub const DEFAULT_MAX_PLAYERS: usize = 8;

/// Default snapshot broadcast capacity.
pub const DEFAULT_SNAPSHOT_BUFFER: usize = 64;

/// What happens to a player who slaps when no rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyPolicy {
    /// The offender must burn their top card before anyone plays again
    #[default]
    Burn,
    /// The offender's top card goes straight to a random other player
    RandomTransfer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Rule table in force until changed before a start
    pub rules: RuleSet,

    pub penalty: PenaltyPolicy,

    /// RNG seed; a random one is drawn when absent
    pub seed: Option<u64>,

    pub max_players: usize,

    /// Start as soon as the second player joins
    pub auto_start: bool,

    /// Shuffle seating before each deal
    pub randomize_seating: bool,

    pub snapshot_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rules: RuleSet::default(),
            penalty: PenaltyPolicy::default(),
            seed: None,
            max_players: DEFAULT_MAX_PLAYERS,
            auto_start: false,
            randomize_seating: false,
            snapshot_buffer: DEFAULT_SNAPSHOT_BUFFER,
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_penalty(mut self, penalty: PenaltyPolicy) -> Self {
        self.penalty = penalty;
        self
    }
}
