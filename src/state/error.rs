//! Session errors.
//!
//! Everything except [`SessionError::InvariantViolation`] and
//! [`SessionError::Halted`] is an expected rejection reported to the one
//! caller that issued the intent.

use super::player::PlayerId;

/// Why an intent was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("player name is empty")]
    EmptyName,
    #[error("session is full")]
    SessionFull,
    #[error("game has not started")]
    GameNotStarted,
    #[error("game has already started")]
    AlreadyStarted,
    #[error("not enough players to start")]
    NotEnoughPlayers,
    #[error("game is over")]
    GameOver,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("no cards in hand")]
    EmptyHand,
    #[error("waiting for player {0} to burn a card")]
    BurnPending(PlayerId),
    #[error("no burn is owed")]
    NoBurnPending,
    #[error("only player {0} owes a burn")]
    NotBurnOffender(PlayerId),
    #[error("cannot slap on your own turn")]
    SlapOnTurn,
    #[error("cannot slap during a face-card challenge")]
    ChallengeActive,
    #[error("the pile is empty")]
    EmptyPile,
}

impl Rejection {
    /// Stable reason code for the transport layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownPlayer(_) => "unknown_player",
            Self::EmptyName => "empty_name",
            Self::SessionFull => "session_full",
            Self::GameNotStarted => "game_not_started",
            Self::AlreadyStarted => "already_started",
            Self::NotEnoughPlayers => "not_enough_players",
            Self::GameOver => "game_over",
            Self::NotYourTurn => "not_your_turn",
            Self::EmptyHand => "empty_hand",
            Self::BurnPending(_) => "burn_pending",
            Self::NoBurnPending => "no_burn_pending",
            Self::NotBurnOffender(_) => "not_burn_offender",
            Self::SlapOnTurn => "slap_on_turn",
            Self::ChallengeActive => "challenge_active",
            Self::EmptyPile => "empty_pile",
        }
    }
}

/// Why a configuration change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigRejection {
    #[error("game has already started")]
    GameStarted,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("invalid intent: {0}")]
    InvalidIntent(Rejection),

    #[error("illegal configuration change: {0}")]
    IllegalConfig(ConfigRejection),

    #[error("stale intent: observed version {observed}, pile changed at version {changed_at}")]
    StaleIntent { observed: u64, changed_at: u64 },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("session halted after an invariant violation")]
    Halted,

    #[error("session coordinator has shut down")]
    Closed,
}

impl SessionError {
    /// Whether the session can keep going after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidIntent(_) | Self::IllegalConfig(_) | Self::StaleIntent { .. }
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidIntent(r) => r.code(),
            Self::IllegalConfig(_) => "illegal_config",
            Self::StaleIntent { .. } => "stale_intent",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::Halted => "halted",
            Self::Closed => "closed",
        }
    }
}

impl From<Rejection> for SessionError {
    fn from(rejection: Rejection) -> Self {
        Self::InvalidIntent(rejection)
    }
}

impl From<ConfigRejection> for SessionError {
    fn from(rejection: ConfigRejection) -> Self {
        Self::IllegalConfig(rejection)
    }
}
