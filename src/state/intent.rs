//! Intents submitted to a session and what applying them did.

use super::cards::Card;
use super::challenge::ChallengeStep;
use super::player::PlayerId;
use super::rules::{RuleSet, SlapRule};
use super::winner::Outcome;

/// A player or transport command. Every mutation goes through one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Join {
        name: String,
    },
    SetRules {
        rules: RuleSet,
    },
    StartGame,
    PlayCard {
        player_id: PlayerId,
        /// Snapshot version the caller acted on, if known
        observed_version: Option<u64>,
    },
    Slap {
        player_id: PlayerId,
        observed_version: Option<u64>,
    },
    Burn {
        player_id: PlayerId,
    },
    PlayAgain,
    /// Transport lost the player's connection
    Disconnect {
        player_id: PlayerId,
    },
    Reconnect {
        player_id: PlayerId,
    },
    /// Irrecoverable disconnect; the seat is removed and the hand forfeited
    Leave {
        player_id: PlayerId,
    },
}

impl Intent {
    pub fn play(player_id: PlayerId) -> Self {
        Self::PlayCard {
            player_id,
            observed_version: None,
        }
    }

    pub fn slap(player_id: PlayerId) -> Self {
        Self::Slap {
            player_id,
            observed_version: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::SetRules { .. } => "set_rules",
            Self::StartGame => "start_game",
            Self::PlayCard { .. } => "play_card",
            Self::Slap { .. } => "slap",
            Self::Burn { .. } => "burn",
            Self::PlayAgain => "play_again",
            Self::Disconnect { .. } => "disconnect",
            Self::Reconnect { .. } => "reconnect",
            Self::Leave { .. } => "leave",
        }
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            Self::PlayCard { player_id, .. }
            | Self::Slap { player_id, .. }
            | Self::Burn { player_id }
            | Self::Disconnect { player_id }
            | Self::Reconnect { player_id }
            | Self::Leave { player_id } => Some(*player_id),
            _ => None,
        }
    }
}

/// Penalty applied for a slap that matched no rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Penalty {
    /// Offender must burn before play resumes
    BurnOwed,
    /// Offender's top card moved to another player
    Transferred { card: Card, to: PlayerId },
    /// Offender had nothing to give up
    Waived,
}

/// What an applied intent changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Joined {
        player_id: PlayerId,
        /// The join filled the table and the game auto-started
        started: bool,
    },
    RulesSet,
    Started,
    CardPlayed {
        card: Card,
        challenge: ChallengeStep,
        /// Set when a failed challenge forfeited the pile
        pile_to: Option<PlayerId>,
    },
    Slapped {
        valid: bool,
        matched: Vec<SlapRule>,
        penalty: Option<Penalty>,
    },
    Burned {
        card: Card,
    },
    Reset {
        dealt: bool,
    },
    ConnectivityChanged,
    Left,
}

/// Result of a successfully applied intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentOutcome {
    /// Version of the snapshot this intent produced
    pub version: u64,
    pub effect: Effect,
    /// Set only by the intent that ended the game
    pub game_over: Option<Outcome>,
}

impl IntentOutcome {
    /// Slap verdict, if this was a slap.
    pub fn slap_valid(&self) -> Option<bool> {
        match &self.effect {
            Effect::Slapped { valid, .. } => Some(*valid),
            _ => None,
        }
    }

    pub fn joined_player(&self) -> Option<PlayerId> {
        match &self.effect {
            Effect::Joined { player_id, .. } => Some(*player_id),
            _ => None,
        }
    }
}
