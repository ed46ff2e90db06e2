//! Cards and the deck manager.
//!
//! Builds the standard 52-card deck, shuffles it with an injected RNG and
//! deals it round-robin across the seated players.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of cards in a full deck.
pub const DECK_SIZE: usize = 52;

/// Card suits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hearts => "hearts",
            Self::Diamonds => "diamonds",
            Self::Clubs => "clubs",
            Self::Spades => "spades",
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Self::Hearts => '♥',
            Self::Diamonds => '♦',
            Self::Clubs => '♣',
            Self::Spades => '♠',
        }
    }
}

/// Card ranks, ordered by slap value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Integer value used by the arithmetic slap rules.
    ///
    /// 2-10 are face value, Jack=11, Queen=12, King=13, Ace=14.
    pub fn value(&self) -> u8 {
        match self {
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Ten => 10,
            Self::Jack => 11,
            Self::Queen => 12,
            Self::King => 13,
            Self::Ace => 14,
        }
    }

    pub fn is_face(&self) -> bool {
        matches!(self, Self::Jack | Self::Queen | Self::King | Self::Ace)
    }

    /// Attempts a responder gets against this card, if it starts a challenge.
    pub fn challenge_attempts(&self) -> Option<u8> {
        match self {
            Self::Jack => Some(1),
            Self::Queen => Some(2),
            Self::King => Some(3),
            Self::Ace => Some(4),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
            Self::Nine => "9",
            Self::Ten => "10",
            Self::Jack => "jack",
            Self::Queen => "queen",
            Self::King => "king",
            Self::Ace => "ace",
        }
    }

    fn short(&self) -> &'static str {
        match self {
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
            Self::Ace => "A",
            other => other.as_str(),
        }
    }
}

/// An immutable playing card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// Canonical name, e.g. `queen_of_spades`.
    pub fn name(&self) -> String {
        format!("{}_of_{}", self.rank.as_str(), self.suit.as_str())
    }

    pub fn value(&self) -> u8 {
        self.rank.value()
    }

    pub fn is_face(&self) -> bool {
        self.rank.is_face()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.short(), self.suit.symbol())
    }
}

/// Error parsing a card name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised card name: {0:?}")]
pub struct ParseCardError(pub String);

impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseCardError(s.to_string());
        let (rank, suit) = s.split_once("_of_").ok_or_else(invalid)?;

        let rank = Rank::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(rank))
            .ok_or_else(invalid)?;
        let suit = Suit::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(suit))
            .ok_or_else(invalid)?;

        Ok(Card::new(rank, suit))
    }
}

impl From<Card> for String {
    fn from(card: Card) -> Self {
        card.name()
    }
}

impl TryFrom<String> for Card {
    type Error = ParseCardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Build an unshuffled 52-card deck containing every rank x suit pair once.
pub fn build_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            deck.push(Card::new(rank, suit));
        }
    }
    deck
}

/// Fisher-Yates shuffle driven by the given RNG.
pub fn shuffle<R: Rng + ?Sized>(mut deck: Vec<Card>, rng: &mut R) -> Vec<Card> {
    deck.shuffle(rng);
    deck
}

/// Deal every card round-robin starting with the first seat.
///
/// Returned hands are indexed like `seats`; each dealt card goes to the
/// bottom of its hand, so hand order follows deal order.
pub fn deal(deck: Vec<Card>, seats: usize) -> Vec<VecDeque<Card>> {
    let mut hands: Vec<VecDeque<Card>> = (0..seats)
        .map(|_| VecDeque::with_capacity(deck.len() / seats.max(1) + 1))
        .collect();

    if seats == 0 {
        return hands;
    }

    for (i, card) in deck.into_iter().enumerate() {
        hands[i % seats].push_back(card);
    }

    hands
}
