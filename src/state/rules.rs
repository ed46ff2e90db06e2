//! Slap rule table.
//!
//! Each rule is a pure predicate over the top of the center pile. The pile
//! slice is ordered oldest-first, so the last element is the card most
//! recently played.

use serde::{Deserialize, Serialize};

use super::cards::{Card, Rank};

/// Which rules are in force for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleSet {
    pub doubles: bool,
    pub sandwich: bool,
    pub marriage: bool,
    pub top_bottom: bool,
    pub adds_to_10: bool,
    pub runs: bool,
    /// Enables the face-card challenge. Not a slap rule.
    pub face_cards: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            doubles: true,
            sandwich: true,
            marriage: true,
            top_bottom: true,
            adds_to_10: true,
            runs: true,
            face_cards: true,
        }
    }
}

impl RuleSet {
    /// Every rule switched off.
    pub fn none() -> Self {
        Self {
            doubles: false,
            sandwich: false,
            marriage: false,
            top_bottom: false,
            adds_to_10: false,
            runs: false,
            face_cards: false,
        }
    }

    /// Only the given slap rule enabled.
    pub fn only(rule: SlapRule) -> Self {
        Self::none().with(rule, true)
    }

    pub fn with(mut self, rule: SlapRule, enabled: bool) -> Self {
        *self.flag_mut(rule) = enabled;
        self
    }

    pub fn is_enabled(&self, rule: SlapRule) -> bool {
        match rule {
            SlapRule::Doubles => self.doubles,
            SlapRule::Sandwich => self.sandwich,
            SlapRule::Marriage => self.marriage,
            SlapRule::TopBottom => self.top_bottom,
            SlapRule::AddsTo10 => self.adds_to_10,
            SlapRule::Runs => self.runs,
        }
    }

    fn flag_mut(&mut self, rule: SlapRule) -> &mut bool {
        match rule {
            SlapRule::Doubles => &mut self.doubles,
            SlapRule::Sandwich => &mut self.sandwich,
            SlapRule::Marriage => &mut self.marriage,
            SlapRule::TopBottom => &mut self.top_bottom,
            SlapRule::AddsTo10 => &mut self.adds_to_10,
            SlapRule::Runs => &mut self.runs,
        }
    }

    /// Enabled slap rules, in table order.
    pub fn enabled(&self) -> impl Iterator<Item = SlapRule> + '_ {
        SlapRule::ALL.into_iter().filter(|r| self.is_enabled(*r))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "doubles": self.doubles,
            "sandwich": self.sandwich,
            "marriage": self.marriage,
            "topBottom": self.top_bottom,
            "addsTo10": self.adds_to_10,
            "runs": self.runs,
            "faceCards": self.face_cards
        })
    }
}

/// A named slap pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlapRule {
    Doubles,
    Sandwich,
    Marriage,
    TopBottom,
    AddsTo10,
    Runs,
}

impl SlapRule {
    pub const ALL: [SlapRule; 6] = [
        SlapRule::Doubles,
        SlapRule::Sandwich,
        SlapRule::Marriage,
        SlapRule::TopBottom,
        SlapRule::AddsTo10,
        SlapRule::Runs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Doubles => "doubles",
            Self::Sandwich => "sandwich",
            Self::Marriage => "marriage",
            Self::TopBottom => "topBottom",
            Self::AddsTo10 => "addsTo10",
            Self::Runs => "runs",
        }
    }

    /// Minimum pile length before the rule can fire.
    pub fn min_pile(&self) -> usize {
        match self {
            Self::Sandwich => 3,
            Self::Runs => 4,
            _ => 2,
        }
    }

    /// Evaluate this rule against the pile.
    pub fn matches(&self, pile: &[Card]) -> bool {
        if pile.len() < self.min_pile() {
            return false;
        }

        let n = pile.len();
        let top = pile[n - 1];

        match self {
            Self::Doubles => top.rank == pile[n - 2].rank,
            Self::Sandwich => top.rank == pile[n - 3].rank,
            Self::Marriage => matches!(
                (top.rank, pile[n - 2].rank),
                (Rank::Queen, Rank::King) | (Rank::King, Rank::Queen)
            ),
            Self::TopBottom => pile[0].rank == top.rank,
            Self::AddsTo10 => {
                let tail = &pile[n.saturating_sub(3)..];
                tail.iter().enumerate().any(|(i, a)| {
                    tail[i + 1..]
                        .iter()
                        .any(|b| a.value() + b.value() == 10)
                })
            }
            Self::Runs => {
                let values: Vec<i16> = pile[n - 4..].iter().map(|c| c.value() as i16).collect();
                let steps: Vec<i16> = values.windows(2).map(|w| w[1] - w[0]).collect();
                steps.iter().all(|d| *d == 1) || steps.iter().all(|d| *d == -1)
            }
        }
    }
}

/// True when any enabled rule matches the pile.
pub fn is_valid_slap(pile: &[Card], rules: &RuleSet) -> bool {
    rules.enabled().any(|rule| rule.matches(pile))
}

/// Every enabled rule that matches the pile.
pub fn matching_rules(pile: &[Card], rules: &RuleSet) -> Vec<SlapRule> {
    rules.enabled().filter(|rule| rule.matches(pile)).collect()
}
