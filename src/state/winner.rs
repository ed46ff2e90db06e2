//! Win detection.

use super::player::{Player, PlayerId};

/// Terminal result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner(PlayerId),
    /// Nobody holds a card. Unreachable while cards are conserved.
    Draw,
}

impl Outcome {
    pub fn winner(&self) -> Option<PlayerId> {
        match self {
            Self::Winner(id) => Some(*id),
            Self::Draw => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Winner(id) => serde_json::json!({"result": "winner", "player_id": id}),
            Self::Draw => serde_json::json!({"result": "draw"}),
        }
    }
}

/// Check whether the seated players have reached a terminal state.
pub fn detect<'a>(seated: impl IntoIterator<Item = &'a Player>) -> Option<Outcome> {
    let mut holders = seated.into_iter().filter(|p| !p.hand.is_empty());

    match (holders.next(), holders.next()) {
        (Some(only), None) => Some(Outcome::Winner(only.id)),
        (None, _) => Some(Outcome::Draw),
        _ => None,
    }
}
