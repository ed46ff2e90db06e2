//! Immutable snapshots broadcast to observers after every applied intent.

use super::cards::Card;
use super::challenge::ChallengeState;
use super::player::{Connectivity, PlayerId};
use super::rules::RuleSet;
use super::winner::Outcome;

/// Coarse session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// Accepting joins and rule changes
    #[default]
    Waiting,
    InProgress,
    /// Still accepts joins and rule changes, applied at the next PlayAgain
    Finished(Outcome),
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InProgress => "in_progress",
            Self::Finished(_) => "finished",
        }
    }

    /// A game has been dealt (in progress or finished).
    pub fn is_started(&self) -> bool {
        !matches!(self, Self::Waiting)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Finished(outcome) => Some(*outcome),
            _ => None,
        }
    }
}

/// The most recent slap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlapRecord {
    pub player_id: PlayerId,
    pub valid: bool,
}

/// A player as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub card_count: usize,
    /// Hand contents top-first; `None` when redacted
    pub hand: Option<Vec<Card>>,
    pub connectivity: Connectivity,
}

impl PlayerView {
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::json!({
            "id": self.id,
            "name": self.name,
            "card_count": self.card_count,
            "state": self.connectivity.as_str()
        });
        if let Some(hand) = &self.hand {
            obj["cards"] = serde_json::json!(hand.iter().map(Card::name).collect::<Vec<_>>());
        }
        obj
    }
}

/// Canonical game state at one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub version: u64,
    pub status: SessionStatus,
    pub rules: RuleSet,
    /// Players in seating order
    pub players: Vec<PlayerView>,
    pub current_player: Option<PlayerId>,
    pub current_player_index: usize,
    /// Oldest first; the last card is on top
    pub center_pile: Vec<Card>,
    pub burn_pile: Vec<Card>,
    pub last_played: Option<Card>,
    pub challenge: ChallengeState,
    pub burn_owed_by: Option<PlayerId>,
    pub last_slap: Option<SlapRecord>,
    /// Version of the last pile transfer
    pub pile_changed_at: u64,
    pub seed: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl GameSnapshot {
    pub fn player(&self, player_id: PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn is_started(&self) -> bool {
        self.status.is_started()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.status.outcome()
    }

    /// Cards accounted for across hands and both piles.
    pub fn total_cards(&self) -> usize {
        self.players.iter().map(|p| p.card_count).sum::<usize>()
            + self.center_pile.len()
            + self.burn_pile.len()
    }

    /// Copy with every hand except `viewer`'s hidden.
    pub fn redacted_for(&self, viewer: PlayerId) -> Self {
        let mut snapshot = self.clone();
        for player in &mut snapshot.players {
            if player.id != viewer {
                player.hand = None;
            }
        }
        snapshot
    }

    pub fn to_json(&self) -> serde_json::Value {
        let players: Vec<serde_json::Value> = self.players.iter().map(|p| p.to_json()).collect();
        let player_order: Vec<PlayerId> = self.players.iter().map(|p| p.id).collect();

        serde_json::json!({
            "version": self.version,
            "status": self.status.as_str(),
            "gameStarted": self.status.is_started(),
            "rules": self.rules.to_json(),
            "players": players,
            "playerOrder": player_order,
            "currentPlayer": self.current_player,
            "currentPlayerIndex": self.current_player_index,
            "centerPile": self.center_pile.iter().map(Card::name).collect::<Vec<_>>(),
            "burnPile": self.burn_pile.iter().map(Card::name).collect::<Vec<_>>(),
            "lastPlayed": self.last_played.map(|c| c.name()),
            "faceCardChallenge": self.challenge.to_json(),
            "burnInProgress": self.burn_owed_by.is_some(),
            "burnOwedBy": self.burn_owed_by,
            "lastSlap": self.last_slap.map(|s| s.player_id),
            "lastSlapValid": self.last_slap.map(|s| s.valid).unwrap_or(false),
            "outcome": self.outcome().map(|o| o.to_json()),
            "seed": self.seed,
            "createdAt": self.created_at.to_rfc3339(),
            "startedAt": self.started_at.map(|t| t.to_rfc3339()),
            "finishedAt": self.finished_at.map(|t| t.to_rfc3339())
        })
    }
}
