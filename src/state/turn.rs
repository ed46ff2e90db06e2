//! Turn scheduler.
//!
//! Holds the seating order and whose turn it is. Players with empty hands
//! keep their seat; only the win detector or a leave removes them.

use super::player::PlayerId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOrder {
    order: Vec<PlayerId>,
    current: usize,
}

impl TurnOrder {
    pub fn new(order: Vec<PlayerId>) -> Self {
        Self { order, current: 0 }
    }

    pub fn seats(&self) -> &[PlayerId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<PlayerId> {
        self.order.get(self.current).copied()
    }

    pub fn is_turn(&self, player_id: PlayerId) -> bool {
        self.current() == Some(player_id)
    }

    pub fn position(&self, player_id: PlayerId) -> Option<usize> {
        self.order.iter().position(|id| *id == player_id)
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.position(player_id).is_some()
    }

    /// Seat a player at the end of the order.
    pub fn push(&mut self, player_id: PlayerId) {
        self.order.push(player_id);
    }

    /// Move to the next seat, wrapping. Returns the new current player.
    pub fn advance(&mut self) -> Option<PlayerId> {
        if self.order.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.order.len();
        self.current()
    }

    /// Make `player_id` current. Returns false if they are not seated.
    pub fn set_current(&mut self, player_id: PlayerId) -> bool {
        match self.position(player_id) {
            Some(index) => {
                self.current = index;
                true
            }
            None => false,
        }
    }

    /// The player seated after `player_id`, wrapping.
    pub fn next_after(&self, player_id: PlayerId) -> Option<PlayerId> {
        let index = self.position(player_id)?;
        self.order.get((index + 1) % self.order.len()).copied()
    }

    /// The player seated before `player_id`, wrapping.
    pub fn previous_of(&self, player_id: PlayerId) -> Option<PlayerId> {
        let index = self.position(player_id)?;
        let len = self.order.len();
        self.order.get((index + len - 1) % len).copied()
    }

    /// Remove a seat, keeping the turn on the same player where possible.
    ///
    /// If the removed player held the turn, it passes to whoever now sits
    /// in that seat.
    pub fn remove(&mut self, player_id: PlayerId) -> bool {
        let Some(index) = self.position(player_id) else {
            return false;
        };

        self.order.remove(index);

        if self.order.is_empty() {
            self.current = 0;
        } else if index < self.current {
            self.current -= 1;
        } else if self.current >= self.order.len() {
            self.current = 0;
        }

        true
    }

    /// Whether the current index points at a seat (trivially true when empty).
    pub fn is_consistent(&self) -> bool {
        self.order.is_empty() || self.current < self.order.len()
    }
}
