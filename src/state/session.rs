//! Session coordinator.
//!
//! Owns the authoritative table: hands, center pile, burn pile, challenge and
//! turn order. Every mutation arrives as an [`Intent`] and is applied whole or
//! not at all. The intent runs against a working copy of the table; the copy
//! replaces the authoritative state only after validation and the invariant
//! check both pass.

use std::collections::{HashMap, HashSet};

use tracing::{debug, error, info};

use super::cards::{self, Card, DECK_SIZE};
use super::challenge::{ChallengeState, ChallengeStep};
use super::config::{PenaltyPolicy, SessionConfig, MIN_PLAYERS};
use super::error::{ConfigRejection, Rejection, SessionError};
use super::intent::{Effect, Intent, IntentOutcome, Penalty};
use super::player::{Player, PlayerId};
use super::rng::GameRng;
use super::rules::{self, RuleSet};
use super::snapshot::{GameSnapshot, PlayerView, SessionStatus, SlapRecord};
use super::turn::TurnOrder;
use super::winner::{self, Outcome};

/// Mutable game state. Cloned per intent so a rejected intent leaves no trace.
#[derive(Debug, Clone)]
struct Table {
    version: u64,
    status: SessionStatus,
    rules: RuleSet,

    /// Players indexed by id
    players: HashMap<PlayerId, Player>,

    /// Seating; join order until the first deal
    turns: TurnOrder,

    center_pile: Vec<Card>,
    burn_pile: Vec<Card>,
    last_played: Option<Card>,
    challenge: ChallengeState,
    burn_owed_by: Option<PlayerId>,
    last_slap: Option<SlapRecord>,

    /// Version of the last deal or pile transfer
    pile_changed_at: u64,

    next_player_id: PlayerId,
    rng: GameRng,

    started_at: Option<chrono::DateTime<chrono::Utc>>,
    finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Table {
    fn new(rules: RuleSet, rng: GameRng) -> Self {
        Self {
            version: 0,
            status: SessionStatus::Waiting,
            rules,
            players: HashMap::new(),
            turns: TurnOrder::default(),
            center_pile: Vec::new(),
            burn_pile: Vec::new(),
            last_played: None,
            challenge: ChallengeState::Idle,
            burn_owed_by: None,
            last_slap: None,
            pile_changed_at: 0,
            next_player_id: 1,
            rng,
            started_at: None,
            finished_at: None,
        }
    }

    fn apply(&mut self, intent: &Intent, config: &SessionConfig) -> Result<Effect, SessionError> {
        match intent {
            Intent::Join { name } => self.join(name, config),
            Intent::SetRules { rules } => self.set_rules(*rules),
            Intent::StartGame => self.start_game(config),
            Intent::PlayCard {
                player_id,
                observed_version,
            } => self.play_card(*player_id, *observed_version),
            Intent::Slap {
                player_id,
                observed_version,
            } => self.slap(*player_id, *observed_version, config.penalty),
            Intent::Burn { player_id } => self.burn(*player_id),
            Intent::PlayAgain => Ok(self.play_again(config)),
            Intent::Disconnect { player_id } => {
                if self.player_mut(*player_id)?.disconnect() {
                    info!(player_id, "player disconnected");
                }
                Ok(Effect::ConnectivityChanged)
            }
            Intent::Reconnect { player_id } => {
                if self.player_mut(*player_id)?.reconnect() {
                    info!(player_id, "player reconnected");
                }
                Ok(Effect::ConnectivityChanged)
            }
            Intent::Leave { player_id } => self.leave(*player_id),
        }
    }

    // Intent handlers

    fn join(&mut self, name: &str, config: &SessionConfig) -> Result<Effect, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Rejection::EmptyName.into());
        }
        if self.status.is_active() {
            return Err(ConfigRejection::GameStarted.into());
        }
        if self.players.len() >= config.max_players {
            return Err(Rejection::SessionFull.into());
        }

        let player_id = self.next_player_id;
        self.next_player_id += 1;
        self.players
            .insert(player_id, Player::new(player_id, name.to_string()));
        self.turns.push(player_id);

        // A finished table waits for PlayAgain rather than auto-starting.
        let started = config.auto_start
            && self.status == SessionStatus::Waiting
            && self.players.len() >= MIN_PLAYERS;
        if started {
            self.deal_new_game(config);
        }

        Ok(Effect::Joined { player_id, started })
    }

    fn set_rules(&mut self, rules: RuleSet) -> Result<Effect, SessionError> {
        if self.status.is_active() {
            return Err(ConfigRejection::GameStarted.into());
        }
        self.rules = rules;
        Ok(Effect::RulesSet)
    }

    fn start_game(&mut self, config: &SessionConfig) -> Result<Effect, SessionError> {
        if self.status.is_started() {
            return Err(Rejection::AlreadyStarted.into());
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(Rejection::NotEnoughPlayers.into());
        }
        self.deal_new_game(config);
        Ok(Effect::Started)
    }

    fn play_card(
        &mut self,
        player_id: PlayerId,
        observed: Option<u64>,
    ) -> Result<Effect, SessionError> {
        self.player(player_id)?;
        self.require_in_progress()?;
        self.check_stale(observed)?;

        if let Some(offender) = self.burn_owed_by {
            return Err(Rejection::BurnPending(offender).into());
        }
        if !self.turns.is_turn(player_id) {
            return Err(Rejection::NotYourTurn.into());
        }

        let card = self
            .player_mut(player_id)?
            .take_top()
            .ok_or(Rejection::EmptyHand)?;
        self.center_pile.push(card);
        self.last_played = Some(card);

        let step = if self.rules.face_cards {
            let (next, step) = self
                .challenge
                .on_card_played(card, player_id)
                .map_err(|err| SessionError::InvariantViolation(err.to_string()))?;
            self.challenge = next;
            step
        } else {
            ChallengeStep::None
        };

        let mut pile_to = None;
        if let ChallengeStep::Failed { initiator } = step {
            let recipient = self.turns.next_after(initiator).ok_or_else(|| {
                SessionError::InvariantViolation(format!(
                    "challenge initiator {initiator} is not seated"
                ))
            })?;
            info!(
                initiator,
                recipient,
                cards = self.center_pile.len(),
                "challenge failed, pile forfeited"
            );
            self.transfer_pile(recipient)?;
            self.turns.set_current(recipient);
            pile_to = Some(recipient);
        } else {
            self.turns.advance();
        }

        Ok(Effect::CardPlayed {
            card,
            challenge: step,
            pile_to,
        })
    }

    fn slap(
        &mut self,
        player_id: PlayerId,
        observed: Option<u64>,
        policy: PenaltyPolicy,
    ) -> Result<Effect, SessionError> {
        self.player(player_id)?;
        self.require_in_progress()?;
        self.check_stale(observed)?;

        if let Some(offender) = self.burn_owed_by {
            return Err(Rejection::BurnPending(offender).into());
        }
        if self.turns.is_turn(player_id) {
            return Err(Rejection::SlapOnTurn.into());
        }
        if self.challenge.is_active() {
            return Err(Rejection::ChallengeActive.into());
        }
        if self.center_pile.is_empty() {
            return Err(Rejection::EmptyPile.into());
        }

        let matched = rules::matching_rules(&self.center_pile, &self.rules);
        let valid = !matched.is_empty();
        self.last_slap = Some(SlapRecord { player_id, valid });

        let penalty = if valid {
            info!(
                player_id,
                cards = self.center_pile.len(),
                rules = ?matched,
                "valid slap"
            );
            self.transfer_pile(player_id)?;
            self.turns.set_current(player_id);
            None
        } else {
            Some(self.penalize(player_id, policy)?)
        };

        Ok(Effect::Slapped {
            valid,
            matched,
            penalty,
        })
    }

    fn burn(&mut self, player_id: PlayerId) -> Result<Effect, SessionError> {
        self.player(player_id)?;
        self.require_in_progress()?;

        match self.burn_owed_by {
            None => return Err(Rejection::NoBurnPending.into()),
            Some(offender) if offender != player_id => {
                return Err(Rejection::NotBurnOffender(offender).into())
            }
            Some(_) => {}
        }

        let card = self.player_mut(player_id)?.take_top().ok_or_else(|| {
            SessionError::InvariantViolation(format!(
                "player {player_id} owes a burn with an empty hand"
            ))
        })?;
        self.burn_pile.push(card);
        self.burn_owed_by = None;

        Ok(Effect::Burned { card })
    }

    fn play_again(&mut self, config: &SessionConfig) -> Effect {
        for player in self.players.values_mut() {
            player.hand.clear();
        }
        self.center_pile.clear();
        self.burn_pile.clear();
        self.last_played = None;
        self.challenge = ChallengeState::Idle;
        self.burn_owed_by = None;
        self.last_slap = None;
        self.status = SessionStatus::Waiting;
        self.started_at = None;
        self.finished_at = None;

        let dealt = self.players.len() >= MIN_PLAYERS;
        if dealt {
            self.deal_new_game(config);
        }

        Effect::Reset { dealt }
    }

    fn leave(&mut self, player_id: PlayerId) -> Result<Effect, SessionError> {
        self.player(player_id)?;

        // Keep the forfeit recipient the same seat when the initiator leaves.
        if let ChallengeState::Active(mut challenge) = self.challenge {
            if challenge.initiator == player_id {
                self.challenge = match self.turns.previous_of(player_id) {
                    Some(previous) if previous != player_id => {
                        challenge.initiator = previous;
                        ChallengeState::Active(challenge)
                    }
                    _ => ChallengeState::Idle,
                };
            }
        }

        if self.burn_owed_by == Some(player_id) {
            self.burn_owed_by = None;
        }

        if let Some(player) = self.players.remove(&player_id) {
            info!(
                player_id,
                forfeited = player.card_count(),
                "player left the session"
            );
            self.burn_pile.extend(player.hand);
        }
        self.turns.remove(player_id);

        Ok(Effect::Left)
    }

    // Helpers

    fn player(&self, player_id: PlayerId) -> Result<&Player, SessionError> {
        self.players
            .get(&player_id)
            .ok_or(SessionError::InvalidIntent(Rejection::UnknownPlayer(player_id)))
    }

    fn player_mut(&mut self, player_id: PlayerId) -> Result<&mut Player, SessionError> {
        self.players
            .get_mut(&player_id)
            .ok_or(SessionError::InvalidIntent(Rejection::UnknownPlayer(player_id)))
    }

    fn require_in_progress(&self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Waiting => Err(Rejection::GameNotStarted.into()),
            SessionStatus::Finished(_) => Err(Rejection::GameOver.into()),
            SessionStatus::InProgress => Ok(()),
        }
    }

    fn check_stale(&self, observed: Option<u64>) -> Result<(), SessionError> {
        match observed {
            Some(observed) if observed < self.pile_changed_at => Err(SessionError::StaleIntent {
                observed,
                changed_at: self.pile_changed_at,
            }),
            _ => Ok(()),
        }
    }

    /// Shuffle the whole center pile under `recipient`'s hand.
    fn transfer_pile(&mut self, recipient: PlayerId) -> Result<(), SessionError> {
        let won = cards::shuffle(std::mem::take(&mut self.center_pile), &mut self.rng);
        self.player_mut(recipient)?.receive(won);
        self.pile_changed_at = self.version;
        Ok(())
    }

    fn penalize(
        &mut self,
        offender: PlayerId,
        policy: PenaltyPolicy,
    ) -> Result<Penalty, SessionError> {
        if !self.player(offender)?.has_cards() {
            debug!(player_id = offender, "invalid slap with empty hand, no penalty");
            return Ok(Penalty::Waived);
        }

        match policy {
            PenaltyPolicy::Burn => {
                self.burn_owed_by = Some(offender);
                Ok(Penalty::BurnOwed)
            }
            PenaltyPolicy::RandomTransfer => {
                let others: Vec<PlayerId> = self
                    .turns
                    .seats()
                    .iter()
                    .copied()
                    .filter(|id| *id != offender)
                    .collect();
                let Some(index) = self.rng.index(others.len()) else {
                    return Ok(Penalty::Waived);
                };
                let to = others[index];

                let card = self
                    .player_mut(offender)?
                    .take_top()
                    .ok_or(Rejection::EmptyHand)?;
                self.player_mut(to)?.receive([card]);

                Ok(Penalty::Transferred { card, to })
            }
        }
    }

    fn deal_new_game(&mut self, config: &SessionConfig) {
        let mut seats = self.turns.seats().to_vec();
        if config.randomize_seating {
            rand::seq::SliceRandom::shuffle(seats.as_mut_slice(), &mut self.rng);
        }

        let deck = cards::shuffle(cards::build_deck(), &mut self.rng);
        let hands = cards::deal(deck, seats.len());
        for (id, hand) in seats.iter().zip(hands) {
            if let Some(player) = self.players.get_mut(id) {
                player.hand = hand;
            }
        }

        self.turns = TurnOrder::new(seats);
        self.center_pile.clear();
        self.burn_pile.clear();
        self.last_played = None;
        self.challenge = ChallengeState::Idle;
        self.burn_owed_by = None;
        self.last_slap = None;
        self.pile_changed_at = self.version;
        self.status = SessionStatus::InProgress;
        self.started_at = Some(chrono::Utc::now());
        self.finished_at = None;

        info!(
            players = self.turns.len(),
            seed = self.rng.seed(),
            version = self.version,
            "game dealt"
        );
    }

    fn seated(&self) -> impl Iterator<Item = &Player> {
        self.turns
            .seats()
            .iter()
            .filter_map(|id| self.players.get(id))
    }

    /// Finish the game if it has reached a terminal state.
    fn detect_outcome(&mut self) -> Option<Outcome> {
        if !self.status.is_active() {
            return None;
        }

        let outcome = winner::detect(self.seated())?;
        self.status = SessionStatus::Finished(outcome);
        self.finished_at = Some(chrono::Utc::now());
        info!(outcome = ?outcome, version = self.version, "game over");
        Some(outcome)
    }

    fn card_count(&self) -> usize {
        self.players.values().map(Player::card_count).sum::<usize>()
            + self.center_pile.len()
            + self.burn_pile.len()
    }

    fn check_invariants(&self) -> Result<(), String> {
        if self.status.is_started() {
            let count = self.card_count();
            if count != DECK_SIZE {
                return Err(format!("card count is {count}, expected {DECK_SIZE}"));
            }

            let unique: HashSet<Card> = self
                .players
                .values()
                .flat_map(|p| p.hand.iter())
                .chain(self.center_pile.iter())
                .chain(self.burn_pile.iter())
                .copied()
                .collect();
            if unique.len() != DECK_SIZE {
                return Err(format!(
                    "{} duplicate cards in play",
                    DECK_SIZE - unique.len()
                ));
            }
        } else if self.card_count() != 0 {
            return Err("cards in play before the deal".to_string());
        }

        if !self.turns.is_consistent() {
            return Err(format!(
                "current index {} outside {} seats",
                self.turns.current_index(),
                self.turns.len()
            ));
        }

        if self.turns.len() != self.players.len()
            || !self.turns.seats().iter().all(|id| self.players.contains_key(id))
        {
            return Err("seating does not match players".to_string());
        }

        if let Some(challenge) = self.challenge.active() {
            if challenge.attempts_left == 0 {
                return Err("active challenge with no attempts left".to_string());
            }
            if !self.turns.contains(challenge.initiator) {
                return Err(format!(
                    "challenge initiator {} is not seated",
                    challenge.initiator
                ));
            }
        }

        if let Some(offender) = self.burn_owed_by {
            match self.players.get(&offender) {
                Some(p) if p.has_cards() => {}
                _ => return Err(format!("burn owed by {offender} cannot be paid")),
            }
        }

        Ok(())
    }
}

/// Single authoritative game session.
///
/// `Session` is a plain state machine: it applies one intent at a time
/// through `&mut self`. Share it across callers with
/// [`Coordinator`](super::coordinator::Coordinator), which serializes
/// submissions.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    table: Table,
    created_at: chrono::DateTime<chrono::Utc>,
    /// Set by the first invariant violation; no further mutation is accepted
    halted: Option<String>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => GameRng::new(seed),
            None => GameRng::from_entropy(),
        };
        Self {
            table: Table::new(config.rules, rng),
            config,
            created_at: chrono::Utc::now(),
            halted: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn version(&self) -> u64 {
        self.table.version
    }

    pub fn status(&self) -> SessionStatus {
        self.table.status
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Apply one intent atomically.
    pub fn apply(&mut self, intent: Intent) -> Result<IntentOutcome, SessionError> {
        if let Some(reason) = &self.halted {
            debug!(intent = intent.kind(), reason = %reason, "session halted, intent refused");
            return Err(SessionError::Halted);
        }

        let mut next = self.table.clone();
        next.version = self.table.version + 1;

        let effect = match next.apply(&intent, &self.config) {
            Ok(effect) => effect,
            Err(SessionError::InvariantViolation(reason)) => {
                return Err(self.halt(reason));
            }
            Err(err) => {
                debug!(
                    intent = intent.kind(),
                    player_id = ?intent.player_id(),
                    version = self.table.version,
                    reason = %err,
                    "intent rejected"
                );
                return Err(err);
            }
        };

        let game_over = next.detect_outcome();

        if let Err(reason) = next.check_invariants() {
            return Err(self.halt(reason));
        }

        self.table = next;
        debug!(
            intent = intent.kind(),
            player_id = ?intent.player_id(),
            version = self.table.version,
            "intent applied"
        );

        Ok(IntentOutcome {
            version: self.table.version,
            effect,
            game_over,
        })
    }

    fn halt(&mut self, reason: String) -> SessionError {
        error!(version = self.table.version, reason = %reason, "invariant violation, halting session");
        self.halted = Some(reason.clone());
        SessionError::InvariantViolation(reason)
    }

    // Named operations

    pub fn join(&mut self, name: &str) -> Result<PlayerId, SessionError> {
        let outcome = self.apply(Intent::Join {
            name: name.to_string(),
        })?;
        outcome
            .joined_player()
            .ok_or_else(|| SessionError::InvariantViolation("join produced no player".to_string()))
    }

    pub fn set_rules(&mut self, rules: RuleSet) -> Result<(), SessionError> {
        self.apply(Intent::SetRules { rules }).map(|_| ())
    }

    pub fn start_game(&mut self) -> Result<(), SessionError> {
        self.apply(Intent::StartGame).map(|_| ())
    }

    pub fn play_card(&mut self, player_id: PlayerId) -> Result<IntentOutcome, SessionError> {
        self.apply(Intent::play(player_id))
    }

    /// Slap the pile; `Ok(true)` when a rule matched.
    pub fn slap(&mut self, player_id: PlayerId) -> Result<bool, SessionError> {
        let outcome = self.apply(Intent::slap(player_id))?;
        Ok(outcome.slap_valid().unwrap_or(false))
    }

    pub fn burn(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        self.apply(Intent::Burn { player_id }).map(|_| ())
    }

    pub fn play_again(&mut self) -> Result<(), SessionError> {
        self.apply(Intent::PlayAgain).map(|_| ())
    }

    pub fn leave(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        self.apply(Intent::Leave { player_id }).map(|_| ())
    }

    /// Canonical snapshot of the current version, with full hands.
    pub fn snapshot(&self) -> GameSnapshot {
        let t = &self.table;
        let players = t
            .seated()
            .map(|p| PlayerView {
                id: p.id,
                name: p.name.clone(),
                card_count: p.card_count(),
                hand: Some(p.hand.iter().copied().collect()),
                connectivity: p.connectivity,
            })
            .collect();

        GameSnapshot {
            version: t.version,
            status: t.status,
            rules: t.rules,
            players,
            current_player: t.turns.current(),
            current_player_index: t.turns.current_index(),
            center_pile: t.center_pile.clone(),
            burn_pile: t.burn_pile.clone(),
            last_played: t.last_played,
            challenge: t.challenge,
            burn_owed_by: t.burn_owed_by,
            last_slap: t.last_slap,
            pile_changed_at: t.pile_changed_at,
            seed: t.rng.seed(),
            created_at: self.created_at,
            started_at: t.started_at,
            finished_at: t.finished_at,
        }
    }
}

#[cfg(test)]
impl Session {
    /// Put `tops` on top of each seat's hand and deal the rest round-robin.
    pub(crate) fn rig(&mut self, tops: Vec<Vec<Card>>) {
        let fixed: HashSet<Card> = tops.iter().flatten().copied().collect();
        let seats = self.table.turns.seats().to_vec();
        let mut hands = tops;
        hands.resize(seats.len(), Vec::new());
        for (i, c) in cards::build_deck()
            .into_iter()
            .filter(|c| !fixed.contains(c))
            .enumerate()
        {
            hands[i % seats.len()].push(c);
        }
        self.rig_exact(hands);
    }

    /// Replace every seat's hand exactly; piles are emptied.
    pub(crate) fn rig_exact(&mut self, hands: Vec<Vec<Card>>) {
        let seats = self.table.turns.seats().to_vec();
        for (id, hand) in seats.iter().zip(hands) {
            self.table.players.get_mut(id).unwrap().hand = hand.into();
        }
        self.table.center_pile.clear();
        self.table.burn_pile.clear();
        self.table.challenge = ChallengeState::Idle;
        self.table.turns = TurnOrder::new(seats);
    }

    pub(crate) fn hand_size(&self, id: PlayerId) -> usize {
        self.table.players[&id].card_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::cards::{build_deck, Rank, Suit};
    use pretty_assertions::assert_eq;

    fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    fn session_with(config: SessionConfig, names: &[&str]) -> (Session, Vec<PlayerId>) {
        let mut session = Session::new(config);
        let ids = names.iter().map(|n| session.join(n).unwrap()).collect();
        (session, ids)
    }

    fn started(names: &[&str]) -> (Session, Vec<PlayerId>) {
        started_with(SessionConfig::default().with_seed(42), names)
    }

    fn started_with(config: SessionConfig, names: &[&str]) -> (Session, Vec<PlayerId>) {
        let (mut session, ids) = session_with(config, names);
        session.start_game().unwrap();
        (session, ids)
    }

    #[test]
    fn test_join_and_start() {
        let (session, ids) = started(&["Alice", "Bob", "Carol"]);
        assert_eq!(ids, vec![1, 2, 3]);

        let snap = session.snapshot();
        assert_eq!(snap.version, 4);
        assert_eq!(snap.status, SessionStatus::InProgress);
        assert_eq!(snap.current_player, Some(1));
        assert_eq!(snap.total_cards(), DECK_SIZE);

        let counts: Vec<usize> = snap.players.iter().map(|p| p.card_count).collect();
        assert_eq!(counts, vec![18, 17, 17]);
    }

    #[test]
    fn test_join_rejects_blank_name() {
        let mut session = Session::new(SessionConfig::default());
        assert_eq!(
            session.join("   "),
            Err(SessionError::InvalidIntent(Rejection::EmptyName))
        );
        assert_eq!(session.version(), 0);
    }

    #[test]
    fn test_session_full() {
        let config = SessionConfig {
            max_players: 2,
            ..SessionConfig::default()
        };
        let (mut session, _) = session_with(config, &["A", "B"]);
        assert_eq!(
            session.join("C"),
            Err(SessionError::InvalidIntent(Rejection::SessionFull))
        );
    }

    #[test]
    fn test_start_needs_two_players() {
        let (mut session, _) = session_with(SessionConfig::default(), &["Alice"]);
        assert_eq!(
            session.start_game(),
            Err(SessionError::InvalidIntent(Rejection::NotEnoughPlayers))
        );
        assert_eq!(session.status(), SessionStatus::Waiting);
    }

    #[test]
    fn test_config_locked_after_start() {
        let (mut session, _) = started(&["Alice", "Bob"]);
        let version = session.version();

        assert_eq!(
            session.join("Carol"),
            Err(SessionError::IllegalConfig(ConfigRejection::GameStarted))
        );
        assert_eq!(
            session.set_rules(RuleSet::none()),
            Err(SessionError::IllegalConfig(ConfigRejection::GameStarted))
        );
        assert_eq!(
            session.start_game(),
            Err(SessionError::InvalidIntent(Rejection::AlreadyStarted))
        );
        assert_eq!(session.version(), version);
    }

    #[test]
    fn test_auto_start() {
        let config = SessionConfig {
            auto_start: true,
            ..SessionConfig::default()
        };
        let mut session = Session::new(config);
        session.join("Alice").unwrap();
        assert_eq!(session.status(), SessionStatus::Waiting);

        let outcome = session
            .apply(Intent::Join {
                name: "Bob".to_string(),
            })
            .unwrap();
        assert_eq!(
            outcome.effect,
            Effect::Joined {
                player_id: 2,
                started: true
            }
        );
        assert_eq!(session.status(), SessionStatus::InProgress);
    }

    #[test]
    fn test_play_card_turn_checks() {
        let (mut session, ids) = started(&["Alice", "Bob"]);
        let version = session.version();

        assert_eq!(
            session.play_card(ids[1]),
            Err(SessionError::InvalidIntent(Rejection::NotYourTurn))
        );
        assert_eq!(
            session.play_card(99),
            Err(SessionError::InvalidIntent(Rejection::UnknownPlayer(99)))
        );
        assert_eq!(session.version(), version);

        let outcome = session.play_card(ids[0]).unwrap();
        assert_eq!(outcome.version, version + 1);
        let snap = session.snapshot();
        assert_eq!(snap.center_pile.len(), 1);
        assert_eq!(snap.current_player, Some(ids[1]));
    }

    #[test]
    fn test_play_before_start() {
        let (mut session, ids) = session_with(SessionConfig::default(), &["Alice", "Bob"]);
        assert_eq!(
            session.play_card(ids[0]),
            Err(SessionError::InvalidIntent(Rejection::GameNotStarted))
        );
    }

    #[test]
    fn test_valid_slap_takes_pile() {
        let (mut session, ids) = started(&["Alice", "Bob", "Carol"]);
        session.rig(vec![
            vec![card(Rank::Five, Suit::Hearts)],
            vec![card(Rank::Five, Suit::Diamonds)],
            vec![],
        ]);

        session.play_card(ids[0]).unwrap();
        session.play_card(ids[1]).unwrap();
        assert_eq!(session.snapshot().current_player, Some(ids[2]));
        let before = session.hand_size(ids[0]);

        assert_eq!(session.slap(ids[0]), Ok(true));

        let snap = session.snapshot();
        assert!(snap.center_pile.is_empty());
        assert_eq!(session.hand_size(ids[0]), before + 2);
        assert_eq!(snap.current_player, Some(ids[0]));
        assert_eq!(
            snap.last_slap,
            Some(SlapRecord {
                player_id: ids[0],
                valid: true
            })
        );
        assert_eq!(snap.pile_changed_at, snap.version);
        assert_eq!(snap.total_cards(), DECK_SIZE);
    }

    #[test]
    fn test_slap_on_own_turn() {
        let (mut session, ids) = started(&["Alice", "Bob", "Carol"]);
        session.rig(vec![
            vec![card(Rank::Five, Suit::Hearts)],
            vec![card(Rank::Five, Suit::Diamonds)],
            vec![],
        ]);
        session.play_card(ids[0]).unwrap();
        session.play_card(ids[1]).unwrap();
        let before = session.snapshot();

        assert_eq!(
            session.slap(ids[2]),
            Err(SessionError::InvalidIntent(Rejection::SlapOnTurn))
        );
        assert_eq!(session.snapshot(), before);

        // Anyone else may still take the pile.
        assert_eq!(session.slap(ids[1]), Ok(true));
    }

    #[test]
    fn test_slap_empty_pile() {
        let (mut session, ids) = started(&["Alice", "Bob"]);
        assert_eq!(
            session.slap(ids[1]),
            Err(SessionError::InvalidIntent(Rejection::EmptyPile))
        );
    }

    #[test]
    fn test_invalid_slap_burn_flow() {
        let (mut session, ids) = started(&["Alice", "Bob", "Carol"]);
        session.rig(vec![
            vec![card(Rank::Two, Suit::Hearts), card(Rank::Four, Suit::Spades)],
            vec![card(Rank::Nine, Suit::Clubs)],
            vec![],
        ]);

        session.play_card(ids[0]).unwrap();
        session.play_card(ids[1]).unwrap();

        let outcome = session.apply(Intent::slap(ids[0])).unwrap();
        assert_eq!(
            outcome.effect,
            Effect::Slapped {
                valid: false,
                matched: vec![],
                penalty: Some(Penalty::BurnOwed)
            }
        );
        assert_eq!(session.snapshot().burn_owed_by, Some(ids[0]));

        // Nobody plays until the burn is paid.
        assert_eq!(
            session.play_card(ids[2]),
            Err(SessionError::InvalidIntent(Rejection::BurnPending(ids[0])))
        );
        assert_eq!(
            session.slap(ids[1]),
            Err(SessionError::InvalidIntent(Rejection::BurnPending(ids[0])))
        );
        assert_eq!(
            session.burn(ids[2]),
            Err(SessionError::InvalidIntent(Rejection::NotBurnOffender(ids[0])))
        );

        let before = session.hand_size(ids[0]);
        session.burn(ids[0]).unwrap();
        let snap = session.snapshot();
        assert_eq!(snap.burn_pile, vec![card(Rank::Four, Suit::Spades)]);
        assert_eq!(snap.burn_owed_by, None);
        assert_eq!(session.hand_size(ids[0]), before - 1);
        assert_eq!(snap.total_cards(), DECK_SIZE);

        assert_eq!(
            session.burn(ids[0]),
            Err(SessionError::InvalidIntent(Rejection::NoBurnPending))
        );
        session.play_card(ids[2]).unwrap();
    }

    #[test]
    fn test_invalid_slap_random_transfer() {
        let config = SessionConfig::default()
            .with_seed(3)
            .with_penalty(PenaltyPolicy::RandomTransfer);
        let (mut session, ids) = started_with(config, &["Alice", "Bob", "Carol"]);
        session.rig(vec![
            vec![card(Rank::Two, Suit::Hearts), card(Rank::Four, Suit::Spades)],
            vec![card(Rank::Nine, Suit::Clubs)],
            vec![],
        ]);
        session.play_card(ids[0]).unwrap();
        session.play_card(ids[1]).unwrap();

        let sizes: Vec<usize> = ids.iter().map(|id| session.hand_size(*id)).collect();
        let outcome = session.apply(Intent::slap(ids[0])).unwrap();

        let Effect::Slapped {
            valid: false,
            penalty: Some(Penalty::Transferred { card: moved, to }),
            ..
        } = outcome.effect
        else {
            panic!("expected a transfer, got {:?}", outcome.effect);
        };

        assert_eq!(moved, card(Rank::Four, Suit::Spades));
        assert_ne!(to, ids[0]);
        assert_eq!(session.hand_size(ids[0]), sizes[0] - 1);
        let to_index = ids.iter().position(|id| *id == to).unwrap();
        assert_eq!(session.hand_size(to), sizes[to_index] + 1);
        assert_eq!(session.snapshot().burn_owed_by, None);
    }

    #[test]
    fn test_king_challenge_fails_on_third_card() {
        let (mut session, ids) = started(&["Alice", "Bob", "Carol"]);
        session.rig(vec![
            vec![card(Rank::King, Suit::Spades), card(Rank::Five, Suit::Clubs)],
            vec![card(Rank::Two, Suit::Clubs)],
            vec![card(Rank::Four, Suit::Clubs)],
        ]);
        let bob_before = session.hand_size(ids[1]);

        let outcome = session.play_card(ids[0]).unwrap();
        assert!(matches!(
            outcome.effect,
            Effect::CardPlayed {
                challenge: ChallengeStep::Started { attempts: 3 },
                ..
            }
        ));
        assert_eq!(
            session.slap(ids[2]),
            Err(SessionError::InvalidIntent(Rejection::ChallengeActive))
        );

        session.play_card(ids[1]).unwrap();
        session.play_card(ids[2]).unwrap();
        assert_eq!(
            session.snapshot().challenge.active().unwrap().attempts_left,
            1
        );

        let outcome = session.play_card(ids[0]).unwrap();
        assert_eq!(
            outcome.effect,
            Effect::CardPlayed {
                card: card(Rank::Five, Suit::Clubs),
                challenge: ChallengeStep::Failed { initiator: ids[0] },
                pile_to: Some(ids[1]),
            }
        );

        let snap = session.snapshot();
        assert!(snap.center_pile.is_empty());
        assert_eq!(snap.challenge, ChallengeState::Idle);
        assert_eq!(snap.current_player, Some(ids[1]));
        assert_eq!(session.hand_size(ids[1]), bob_before - 1 + 4);
        assert_eq!(snap.total_cards(), DECK_SIZE);
    }

    #[test]
    fn test_face_card_meets_challenge() {
        let (mut session, ids) = started(&["Alice", "Bob", "Carol"]);
        session.rig(vec![
            vec![card(Rank::Queen, Suit::Spades)],
            vec![card(Rank::Jack, Suit::Clubs)],
            vec![],
        ]);

        session.play_card(ids[0]).unwrap();
        let outcome = session.play_card(ids[1]).unwrap();
        assert!(matches!(
            outcome.effect,
            Effect::CardPlayed {
                challenge: ChallengeStep::Met,
                pile_to: None,
                ..
            }
        ));

        let snap = session.snapshot();
        assert_eq!(snap.challenge, ChallengeState::Idle);
        assert_eq!(snap.current_player, Some(ids[2]));
        assert_eq!(snap.center_pile.len(), 2);
    }

    #[test]
    fn test_face_cards_disabled() {
        let config = SessionConfig::default().with_seed(1);
        let (mut session, ids) = session_with(config, &["Alice", "Bob"]);
        session
            .set_rules(RuleSet {
                face_cards: false,
                ..RuleSet::default()
            })
            .unwrap();
        session.start_game().unwrap();
        session.rig(vec![vec![card(Rank::Ace, Suit::Spades)], vec![]]);

        session.play_card(ids[0]).unwrap();
        assert_eq!(session.snapshot().challenge, ChallengeState::Idle);
        assert_eq!(session.snapshot().current_player, Some(ids[1]));
    }

    #[test]
    fn test_stale_slap_after_pile_taken() {
        let (mut session, ids) = started(&["Alice", "Bob", "Carol"]);
        session.rig(vec![
            vec![card(Rank::Five, Suit::Hearts)],
            vec![card(Rank::Five, Suit::Diamonds)],
            vec![],
        ]);
        session.play_card(ids[0]).unwrap();
        session.play_card(ids[1]).unwrap();
        let observed = session.version();

        let first = session.apply(Intent::Slap {
            player_id: ids[0],
            observed_version: Some(observed),
        });
        assert_eq!(first.unwrap().slap_valid(), Some(true));

        let second = session.apply(Intent::Slap {
            player_id: ids[1],
            observed_version: Some(observed),
        });
        assert_eq!(
            second,
            Err(SessionError::StaleIntent {
                observed,
                changed_at: observed + 1
            })
        );
    }

    #[test]
    fn test_winner_detected_once() {
        let (mut session, ids) = started(&["Alice", "Bob"]);
        let last = card(Rank::Two, Suit::Clubs);
        let mut rest: Vec<Card> = build_deck().into_iter().filter(|c| *c != last).collect();
        rest.retain(|c| *c != card(Rank::Three, Suit::Clubs));
        rest.insert(0, card(Rank::Three, Suit::Clubs));
        session.rig_exact(vec![rest, vec![last]]);

        session.play_card(ids[0]).unwrap();
        let outcome = session.play_card(ids[1]).unwrap();
        assert_eq!(outcome.game_over, Some(Outcome::Winner(ids[0])));
        assert_eq!(
            session.status(),
            SessionStatus::Finished(Outcome::Winner(ids[0]))
        );

        assert_eq!(
            session.play_card(ids[0]),
            Err(SessionError::InvalidIntent(Rejection::GameOver))
        );
        assert_eq!(
            session.slap(ids[1]),
            Err(SessionError::InvalidIntent(Rejection::GameOver))
        );
        assert_eq!(
            session.burn(ids[1]),
            Err(SessionError::InvalidIntent(Rejection::GameOver))
        );

        // Later intents do not report the win again.
        let outcome = session
            .apply(Intent::Disconnect { player_id: ids[1] })
            .unwrap();
        assert_eq!(outcome.game_over, None);
    }

    #[test]
    fn test_full_deck_holder_wins() {
        let (mut session, ids) = started(&["A", "B", "C"]);
        session.rig_exact(vec![build_deck(), vec![], vec![]]);

        let outcome = session
            .apply(Intent::Reconnect { player_id: ids[0] })
            .unwrap();
        assert_eq!(outcome.game_over, Some(Outcome::Winner(ids[0])));
    }

    #[test]
    fn test_play_again_twice_same_shape() {
        let (mut session, ids) = started(&["Alice", "Bob", "Carol"]);
        session.play_card(ids[0]).unwrap();

        session.play_again().unwrap();
        let first = session.snapshot();
        session.play_again().unwrap();
        let second = session.snapshot();

        for snap in [&first, &second] {
            assert_eq!(snap.status, SessionStatus::InProgress);
            assert!(snap.center_pile.is_empty());
            assert!(snap.burn_pile.is_empty());
            assert_eq!(snap.current_player_index, 0);
            assert_eq!(snap.challenge, ChallengeState::Idle);
            assert_eq!(snap.last_slap, None);
            assert_eq!(
                snap.players.iter().map(|p| p.card_count).collect::<Vec<_>>(),
                vec![18, 17, 17]
            );
            assert_eq!(
                snap.players.iter().map(|p| p.id).collect::<Vec<_>>(),
                ids
            );
        }
        assert_eq!(second.version, first.version + 1);
    }

    #[test]
    fn test_join_and_rules_after_finish() {
        let (mut session, ids) = started(&["Alice", "Bob"]);
        let last = card(Rank::Two, Suit::Clubs);
        let mut rest: Vec<Card> = build_deck().into_iter().filter(|c| *c != last).collect();
        rest.retain(|c| *c != card(Rank::Three, Suit::Clubs));
        rest.insert(0, card(Rank::Three, Suit::Clubs));
        session.rig_exact(vec![rest, vec![last]]);
        session.play_card(ids[0]).unwrap();
        session.play_card(ids[1]).unwrap();
        assert_eq!(
            session.status(),
            SessionStatus::Finished(Outcome::Winner(ids[0]))
        );

        let carol = session.join("Carol").unwrap();
        session.set_rules(RuleSet::none()).unwrap();

        // Joining a finished table does not start a new game by itself.
        assert_eq!(
            session.status(),
            SessionStatus::Finished(Outcome::Winner(ids[0]))
        );

        session.play_again().unwrap();
        let snap = session.snapshot();
        assert_eq!(snap.status, SessionStatus::InProgress);
        assert_eq!(snap.rules, RuleSet::none());
        assert_eq!(
            snap.players.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![ids[0], ids[1], carol]
        );
        assert_eq!(
            snap.players.iter().map(|p| p.card_count).collect::<Vec<_>>(),
            vec![18, 17, 17]
        );

        assert_eq!(
            session.join("Dave"),
            Err(SessionError::IllegalConfig(ConfigRejection::GameStarted))
        );
    }

    #[test]
    fn test_play_again_without_enough_players() {
        let (mut session, ids) = started(&["Alice", "Bob"]);
        session.leave(ids[1]).unwrap();
        assert!(session.status().outcome().is_some());

        session.play_again().unwrap();
        let snap = session.snapshot();
        assert_eq!(snap.status, SessionStatus::Waiting);
        assert_eq!(snap.total_cards(), 0);

        // Back in the lobby, joins are accepted again.
        session.join("Carol").unwrap();
        session.start_game().unwrap();
    }

    #[test]
    fn test_leave_forfeits_hand() {
        let (mut session, ids) = started(&["Alice", "Bob", "Carol"]);
        let bob_cards = session.hand_size(ids[1]);

        session.leave(ids[1]).unwrap();

        let snap = session.snapshot();
        assert_eq!(snap.players.len(), 2);
        assert_eq!(snap.burn_pile.len(), bob_cards);
        assert_eq!(snap.total_cards(), DECK_SIZE);
        assert_eq!(snap.current_player, Some(ids[0]));
        assert_eq!(
            session.play_card(ids[1]),
            Err(SessionError::InvalidIntent(Rejection::UnknownPlayer(ids[1])))
        );
    }

    #[test]
    fn test_leave_reanchors_challenge() {
        let (mut session, ids) = started(&["Alice", "Bob", "Carol"]);
        session.rig(vec![
            vec![card(Rank::Jack, Suit::Spades)],
            vec![card(Rank::Two, Suit::Clubs)],
            vec![],
        ]);
        session.play_card(ids[0]).unwrap();
        session.leave(ids[0]).unwrap();

        let snap = session.snapshot();
        assert_eq!(snap.challenge.active().unwrap().initiator, ids[2]);
        assert_eq!(snap.current_player, Some(ids[1]));

        // The challenge now belongs to Carol, so Bob's number card forfeits the pile to Bob.
        let outcome = session.play_card(ids[1]).unwrap();
        assert!(matches!(
            outcome.effect,
            Effect::CardPlayed {
                pile_to: Some(p),
                ..
            } if p == ids[1]
        ));
    }

    #[test]
    fn test_empty_handed_player_stalls_challenge() {
        let (mut session, ids) = started(&["Alice", "Bob", "Carol"]);
        let king = card(Rank::King, Suit::Spades);
        let mut deck: Vec<Card> = build_deck().into_iter().filter(|c| *c != king).collect();
        let carol = deck.split_off(25);
        deck.insert(0, king);
        session.rig_exact(vec![deck, vec![], carol]);

        session.play_card(ids[0]).unwrap();
        assert_eq!(session.snapshot().current_player, Some(ids[1]));
        let version = session.version();

        // Bob holds the turn with nothing to play and nobody may slap.
        assert_eq!(
            session.play_card(ids[1]),
            Err(SessionError::InvalidIntent(Rejection::EmptyHand))
        );
        for slapper in [ids[0], ids[2]] {
            assert_eq!(
                session.slap(slapper),
                Err(SessionError::InvalidIntent(Rejection::ChallengeActive))
            );
        }
        assert_eq!(session.version(), version);

        // Leaving clears the stall and the challenge carries on.
        session.leave(ids[1]).unwrap();
        let snap = session.snapshot();
        assert_eq!(snap.current_player, Some(ids[2]));
        assert_eq!(snap.challenge.active().unwrap().initiator, ids[0]);
        session.play_card(ids[2]).unwrap();
    }

    #[test]
    fn test_invariant_violation_halts() {
        let (mut session, ids) = started(&["Alice", "Bob"]);
        let dup = session.table.players[&ids[0]].hand[0];
        session
            .table
            .players
            .get_mut(&ids[1])
            .unwrap()
            .hand
            .push_back(dup);

        let result = session.apply(Intent::Disconnect { player_id: ids[0] });
        assert!(matches!(result, Err(SessionError::InvariantViolation(_))));
        assert!(session.is_halted());
        assert_eq!(session.play_card(ids[0]), Err(SessionError::Halted));
    }

    #[test]
    fn test_snapshot_redaction() {
        let (session, ids) = started(&["Alice", "Bob"]);
        let snap = session.snapshot().redacted_for(ids[0]);

        assert!(snap.player(ids[0]).unwrap().hand.is_some());
        assert!(snap.player(ids[1]).unwrap().hand.is_none());
        assert_eq!(snap.player(ids[1]).unwrap().card_count, 26);

        let json = snap.to_json();
        assert_eq!(json["gameStarted"], serde_json::json!(true));
        assert_eq!(json["players"][1]["card_count"], serde_json::json!(26));
        assert!(json["players"][1].get("cards").is_none());
    }

    #[test]
    fn test_seeded_sessions_deal_identically() {
        let (a, _) = started(&["Alice", "Bob"]);
        let (b, _) = started(&["Alice", "Bob"]);
        assert_eq!(a.snapshot().players, b.snapshot().players);
    }

    #[test]
    fn test_randomized_seating_is_permutation() {
        let config = SessionConfig {
            randomize_seating: true,
            ..SessionConfig::default().with_seed(11)
        };
        let (session, mut ids) = started_with(config, &["A", "B", "C", "D"]);
        let mut seats: Vec<PlayerId> = session.snapshot().players.iter().map(|p| p.id).collect();
        seats.sort();
        ids.sort();
        assert_eq!(seats, ids);
    }
}
