//! Face-card challenge state machine.
//!
//! # State Diagram
//!
//! ```text
//!            face card played
//! ┌──────┐ ─────────────────────▶ ┌────────────────────────┐
//! │ Idle │                         │ Active(attempts_left)  │──┐ number card,
//! └──────┘ ◀───────────────────── └────────────────────────┘  │ attempts left > 0
//!     ▲      face card played            ▲                     │
//!     │      (challenge met)             └─────────────────────┘
//!     │
//!     └──── number card, attempts exhausted (challenge failed, pile forfeited)
//! ```
//!
//! The machine is pure: it decides the next state and reports what happened.
//! Moving cards and turns is left to the session.

use super::cards::Card;
use super::player::PlayerId;

/// An in-progress challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    /// The face card that started it
    pub triggering_card: Card,
    /// Number cards the responders may still play
    pub attempts_left: u8,
    /// Player who played the triggering card
    pub initiator: PlayerId,
}

/// Challenge state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChallengeState {
    #[default]
    Idle,
    Active(Challenge),
}

/// What a played card did to the challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStep {
    /// No challenge involved (idle and a number card, or challenges disabled)
    None,
    /// A face card opened a new challenge
    Started { attempts: u8 },
    /// A number card used up an attempt; the challenge continues
    Continued { attempts_left: u8 },
    /// A face card answered the challenge
    Met,
    /// Attempts ran out; the pile goes to the player after `initiator`
    Failed { initiator: PlayerId },
}

impl ChallengeStep {
    /// Whether the normal one-step turn advance applies after this card.
    pub fn advances_turn(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// The machine reached an impossible state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("active challenge from player {initiator} has no attempts left")]
pub struct ExhaustedChallenge {
    pub initiator: PlayerId,
}

impl ChallengeState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn active(&self) -> Option<&Challenge> {
        match self {
            Self::Active(c) => Some(c),
            Self::Idle => None,
        }
    }

    /// Compute the state after `player` plays `card`.
    ///
    /// Only called when face-card challenges are enabled.
    pub fn on_card_played(
        &self,
        card: Card,
        player: PlayerId,
    ) -> Result<(ChallengeState, ChallengeStep), ExhaustedChallenge> {
        match self {
            Self::Idle => match card.rank.challenge_attempts() {
                Some(attempts) => Ok((
                    Self::Active(Challenge {
                        triggering_card: card,
                        attempts_left: attempts,
                        initiator: player,
                    }),
                    ChallengeStep::Started { attempts },
                )),
                None => Ok((Self::Idle, ChallengeStep::None)),
            },

            // A face card satisfies the current challenge without opening a new one.
            Self::Active(_) if card.is_face() => Ok((Self::Idle, ChallengeStep::Met)),

            Self::Active(challenge) => {
                let attempts_left =
                    challenge
                        .attempts_left
                        .checked_sub(1)
                        .ok_or(ExhaustedChallenge {
                            initiator: challenge.initiator,
                        })?;

                if attempts_left == 0 {
                    Ok((
                        Self::Idle,
                        ChallengeStep::Failed {
                            initiator: challenge.initiator,
                        },
                    ))
                } else {
                    Ok((
                        Self::Active(Challenge {
                            attempts_left,
                            ..*challenge
                        }),
                        ChallengeStep::Continued { attempts_left },
                    ))
                }
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Idle => serde_json::json!({
                "active": false,
                "faceCard": null,
                "attemptsLeft": 0,
                "originalPlayer": null
            }),
            Self::Active(c) => serde_json::json!({
                "active": true,
                "faceCard": c.triggering_card.name(),
                "attemptsLeft": c.attempts_left,
                "originalPlayer": c.initiator
            }),
        }
    }
}
