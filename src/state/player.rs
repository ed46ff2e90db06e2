//! Seated players.
//!
//! A player is created by a join and keeps their id and name across
//! rematches. Their hand is ordered top-first: index 0 is the next card
//! they play or burn, and won cards go to the back.

use std::collections::VecDeque;
use std::fmt;

use super::cards::Card;

/// Player id, assigned by the session at join time.
pub type PlayerId = u64;

/// Presence as reported by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    #[default]
    Connected,
    /// Connection dropped; seat and cards are held until a leave arrives
    Disconnected {
        since: chrono::DateTime<chrono::Utc>,
    },
}

impl Connectivity {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "online",
            Self::Disconnected { .. } => "offline",
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,

    /// Display name
    pub name: String,

    /// Cards held, top first
    pub hand: VecDeque<Card>,

    pub connectivity: Connectivity,

    /// When the player joined the session
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            hand: VecDeque::new(),
            connectivity: Connectivity::Connected,
            joined_at: chrono::Utc::now(),
        }
    }

    pub fn card_count(&self) -> usize {
        self.hand.len()
    }

    pub fn has_cards(&self) -> bool {
        !self.hand.is_empty()
    }

    /// Take the top card.
    pub fn take_top(&mut self) -> Option<Card> {
        self.hand.pop_front()
    }

    /// Put cards under the hand, preserving their order.
    pub fn receive(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.hand.extend(cards);
    }

    /// Mark disconnected. Returns false if already disconnected.
    pub fn disconnect(&mut self) -> bool {
        if !self.connectivity.is_connected() {
            return false;
        }
        self.connectivity = Connectivity::Disconnected {
            since: chrono::Utc::now(),
        };
        true
    }

    /// Mark connected again. Returns false if already connected.
    pub fn reconnect(&mut self) -> bool {
        if self.connectivity.is_connected() {
            return false;
        }
        self.connectivity = Connectivity::Connected;
        true
    }
}
