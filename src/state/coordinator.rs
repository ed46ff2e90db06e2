//! Single-writer session actor.
//!
//! A [`Session`] is moved into one tokio task that owns it exclusively.
//! Callers hold cloneable [`SessionHandle`]s and submit intents over an mpsc
//! queue; the task applies them one at a time in admission order and
//! publishes every new snapshot on a broadcast channel. Two slaps racing for
//! the same pile are resolved by whichever the task dequeues first; the
//! second sees the cleared pile.
//!
//! Published snapshots carry every hand. Redact with
//! [`GameSnapshot::redacted_for`] before handing one to a player.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error::SessionError;
use super::intent::{Intent, IntentOutcome};
use super::player::PlayerId;
use super::rules::RuleSet;
use super::session::Session;
use super::snapshot::GameSnapshot;

/// Pending intents a session queue holds before `submit` waits.
pub const COMMAND_BUFFER: usize = 256;

const LOG_TARGET: &str = "ers_state::coordinator";

enum Command {
    Apply {
        intent: Intent,
        reply: oneshot::Sender<Result<IntentOutcome, SessionError>>,
    },
    Snapshot {
        reply: oneshot::Sender<Arc<GameSnapshot>>,
    },
}

pub struct Coordinator;

impl Coordinator {
    /// Move `session` into its own task.
    ///
    /// The task ends once every handle is dropped and returns the session.
    /// Must be called from within a tokio runtime.
    pub fn spawn(session: Session) -> (SessionHandle, JoinHandle<Session>) {
        let capacity = session.config().snapshot_buffer.max(1);
        let (commands, inbox) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots, _) = broadcast::channel(capacity);

        let task = tokio::spawn(Self::run(session, inbox, snapshots.clone()));

        (
            SessionHandle {
                commands,
                snapshots,
            },
            task,
        )
    }

    async fn run(
        mut session: Session,
        mut inbox: mpsc::Receiver<Command>,
        snapshots: broadcast::Sender<Arc<GameSnapshot>>,
    ) -> Session {
        debug!(target: LOG_TARGET, "session coordinator started");

        while let Some(command) = inbox.recv().await {
            match command {
                Command::Apply { intent, reply } => {
                    let result = session.apply(intent);
                    if result.is_ok() {
                        // No subscribers is not an error.
                        let _ = snapshots.send(Arc::new(session.snapshot()));
                    }
                    if reply.send(result).is_err() {
                        debug!(target: LOG_TARGET, "submitter went away before the reply");
                    }
                }
                Command::Snapshot { reply } => {
                    if reply.send(Arc::new(session.snapshot())).is_err() {
                        debug!(target: LOG_TARGET, "snapshot requester went away before the reply");
                    }
                }
            }
        }

        if session.is_halted() {
            warn!(target: LOG_TARGET, version = session.version(), "coordinator stopped with a halted session");
        } else {
            debug!(target: LOG_TARGET, version = session.version(), "session coordinator stopped");
        }
        session
    }
}

/// Cloneable front door to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: broadcast::Sender<Arc<GameSnapshot>>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apply { intent, .. } => f.debug_struct("Apply").field("intent", intent).finish(),
            Self::Snapshot { .. } => f.write_str("Snapshot"),
        }
    }
}

impl SessionHandle {
    /// Queue an intent and wait for its result.
    pub async fn submit(&self, intent: Intent) -> Result<IntentOutcome, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Apply { intent, reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)?
    }

    /// Latest snapshot, ordered after every intent queued before this call.
    pub async fn snapshot(&self) -> Result<Arc<GameSnapshot>, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)
    }

    /// Receive every snapshot published from now on, in version order.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<GameSnapshot>> {
        self.snapshots.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub async fn join(&self, name: impl Into<String>) -> Result<PlayerId, SessionError> {
        let outcome = self.submit(Intent::Join { name: name.into() }).await?;
        outcome
            .joined_player()
            .ok_or_else(|| SessionError::InvariantViolation("join produced no player".to_string()))
    }

    pub async fn set_rules(&self, rules: RuleSet) -> Result<IntentOutcome, SessionError> {
        self.submit(Intent::SetRules { rules }).await
    }

    pub async fn start_game(&self) -> Result<IntentOutcome, SessionError> {
        self.submit(Intent::StartGame).await
    }

    pub async fn play_card(
        &self,
        player_id: PlayerId,
        observed_version: Option<u64>,
    ) -> Result<IntentOutcome, SessionError> {
        self.submit(Intent::PlayCard {
            player_id,
            observed_version,
        })
        .await
    }

    pub async fn slap(
        &self,
        player_id: PlayerId,
        observed_version: Option<u64>,
    ) -> Result<IntentOutcome, SessionError> {
        self.submit(Intent::Slap {
            player_id,
            observed_version,
        })
        .await
    }

    pub async fn burn(&self, player_id: PlayerId) -> Result<IntentOutcome, SessionError> {
        self.submit(Intent::Burn { player_id }).await
    }

    pub async fn play_again(&self) -> Result<IntentOutcome, SessionError> {
        self.submit(Intent::PlayAgain).await
    }

    pub async fn disconnect(&self, player_id: PlayerId) -> Result<IntentOutcome, SessionError> {
        self.submit(Intent::Disconnect { player_id }).await
    }

    pub async fn reconnect(&self, player_id: PlayerId) -> Result<IntentOutcome, SessionError> {
        self.submit(Intent::Reconnect { player_id }).await
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<IntentOutcome, SessionError> {
        self.submit(Intent::Leave { player_id }).await
    }
}
