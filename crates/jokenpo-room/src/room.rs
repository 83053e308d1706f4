//! The room: the authoritative state machine of one match.
//!
//! A [`Room`] is a cheap, clonable handle around shared state. The
//! immutable parameters live outside the lock; everything that changes
//! (state, current round, the results ledger, subscribers) sits behind a
//! single `Mutex` that every operation holds for its whole duration. That
//! makes round resolution atomic: two players submitting at the same time
//! always serialize into one of the two valid orders.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::event::Subscribers;
use crate::{Event, Move, PlayerSlot, RoomConfig, RoomState, RoundResult};

/// A serializable summary of a room. Join codes are never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: String,
    pub name: String,
    pub player1: String,
    pub player2: String,
    pub state: RoomState,
    pub rounds: usize,
    pub current_round: usize,
    pub player1_wins: usize,
    pub player2_wins: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// Handle to a match. Clones share the same underlying room.
#[derive(Debug, Clone)]
pub struct Room {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    config: RoomConfig,
    inner: Mutex<RoomInner>,
}

/// Mutable room state, only reachable through the room lock.
#[derive(Debug)]
struct RoomInner {
    state: RoomState,
    current_round: usize,
    /// Always `rounds` long. Entries before `current_round` are frozen.
    results: Vec<RoundResult>,
    subscribers: Subscribers,
}

impl Room {
    /// Creates a room in `WaitingForPlayers` with an empty results ledger.
    pub fn new(config: RoomConfig) -> Self {
        let inner = RoomInner {
            state: RoomState::WaitingForPlayers,
            current_round: 0,
            results: vec![RoundResult::default(); config.rounds.get()],
            subscribers: Subscribers::default(),
        };
        Self {
            shared: Arc::new(Shared {
                config,
                inner: Mutex::new(inner),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.shared.config.id
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn external_id(&self) -> Option<&str> {
        self.shared.config.external_id.as_deref()
    }

    /// Returns `true` if both handles point at the same room, as opposed to
    /// two rooms that happen to share an id.
    pub fn same_room(&self, other: &Room) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn player1(&self) -> &str {
        &self.shared.config.player1
    }

    pub fn player2(&self) -> &str {
        &self.shared.config.player2
    }

    /// Returns the identity seated in `slot`.
    pub fn player(&self, slot: PlayerSlot) -> &str {
        match slot {
            PlayerSlot::Player1 => self.player1(),
            PlayerSlot::Player2 => self.player2(),
        }
    }

    pub fn player1_join_code(&self) -> &str {
        &self.shared.config.player1_join_code
    }

    pub fn player2_join_code(&self) -> &str {
        &self.shared.config.player2_join_code
    }

    /// Returns the join code of `slot`.
    pub fn join_code(&self, slot: PlayerSlot) -> &str {
        match slot {
            PlayerSlot::Player1 => self.player1_join_code(),
            PlayerSlot::Player2 => self.player2_join_code(),
        }
    }

    /// Total number of decisive rounds in the match.
    pub fn rounds(&self) -> usize {
        self.shared.config.rounds.get()
    }

    pub fn state(&self) -> RoomState {
        self.lock().state
    }

    /// Index of the round being played, equal to the number of decided
    /// rounds.
    pub fn current_round(&self) -> usize {
        self.lock().current_round
    }

    /// Returns the hands of round `index`.
    ///
    /// Only decided rounds and the round in progress are visible; later
    /// indices return `None`.
    pub fn round(&self, index: usize) -> Option<RoundResult> {
        let inner = self.lock();
        if index > inner.current_round {
            return None;
        }
        inner.results.get(index).copied()
    }

    /// Returns `(player1_wins, player2_wins)` over the decided rounds.
    pub fn results(&self) -> (usize, usize) {
        self.lock().tally()
    }

    /// Returns a consistent snapshot of the whole room.
    pub fn info(&self) -> RoomInfo {
        let inner = self.lock();
        let (player1_wins, player2_wins) = inner.tally();
        RoomInfo {
            id: self.id().to_string(),
            name: self.name().to_string(),
            player1: self.player1().to_string(),
            player2: self.player2().to_string(),
            state: inner.state,
            rounds: self.rounds(),
            current_round: inner.current_round,
            player1_wins,
            player2_wins,
            external_id: self.shared.config.external_id.clone(),
        }
    }

    /// Returns the slot whose identity and join code both match exactly.
    ///
    /// Player 1 is checked first, so a room seating the same identity twice
    /// still resolves by join code.
    pub fn authorize(&self, player_id: &str, join_code: &str) -> Option<PlayerSlot> {
        PlayerSlot::ALL
            .into_iter()
            .find(|slot| self.player(*slot) == player_id && self.join_code(*slot) == join_code)
    }

    /// Moves the room from `WaitingForPlayers` to `Running`.
    ///
    /// Does nothing in any other state. Returns `true` only for the call
    /// that performed the transition.
    pub fn start(&self) -> bool {
        let mut inner = self.lock();
        if !inner.state.can_transition_to(RoomState::Running) {
            tracing::debug!(room_id = %self.id(), state = %inner.state, "start ignored");
            return false;
        }
        inner.state = RoomState::Running;
        tracing::info!(room_id = %self.id(), rounds = self.rounds(), "match started");
        true
    }

    /// Records `mv` for `which` in the current round and resolves the
    /// round if both hands are in.
    ///
    /// Ignored unless the room is running, and ignored when the player
    /// already has a hand in this round: the first submission wins and
    /// cannot be changed. Returns `true` if the hand was recorded.
    pub fn add_move_for_player(&self, which: PlayerSlot, mv: Move) -> bool {
        let mut inner = self.lock();
        if !inner.state.is_running() {
            tracing::debug!(
                room_id = %self.id(),
                slot = %which,
                state = %inner.state,
                "move ignored, room not running"
            );
            return false;
        }

        let index = inner.current_round;
        let slot = &mut inner.results[index];
        if slot.get(which).is_played() {
            tracing::debug!(
                room_id = %self.id(),
                slot = %which,
                round = index,
                "move ignored, already submitted"
            );
            return false;
        }
        slot.set(which, mv);

        if let Some(event) = inner.resolve_round(self.id()) {
            inner.subscribers.publish(&event);
        }
        true
    }

    /// Registers a new subscriber and returns its handle.
    ///
    /// The subscription receives one [`Event`] per decided round, starting
    /// with the next one. Dropping the handle (or calling
    /// [`Subscription::unsubscribe`]) removes it.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.lock().subscribers.insert(tx);
        tracing::debug!(room_id = %self.id(), subscription = id, "subscribed");
        Subscription {
            id,
            receiver: rx,
            room: Arc::downgrade(&self.shared),
        }
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, RoomInner> {
        self.shared.lock()
    }
}

impl Shared {
    // Every mutation leaves `RoomInner` consistent before the next
    // statement, so a guard poisoned by a panicking holder is still valid.
    fn lock(&self) -> MutexGuard<'_, RoomInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RoomInner {
    /// Applies the resolution rules to the current round.
    ///
    /// Returns the event to publish when the round was decided.
    fn resolve_round(&mut self, room_id: &str) -> Option<Event> {
        let index = self.current_round;
        let round = self.results[index];

        if !round.is_complete() {
            return None;
        }

        if round.player1_move == round.player2_move {
            self.results[index] = RoundResult::default();
            tracing::debug!(%room_id, round = index, hand = %round.player1_move, "tie, replaying round");
            return None;
        }

        self.current_round += 1;
        debug_assert!(self.current_round <= self.results.len());
        if self.current_round == self.results.len() {
            self.state = RoomState::Finished;
        }

        let (player1_wins, player2_wins) = self.tally();
        tracing::info!(
            %room_id,
            round = index,
            player1_move = %round.player1_move,
            player2_move = %round.player2_move,
            player1_wins,
            player2_wins,
            "round decided"
        );
        if self.state.is_finished() {
            tracing::info!(%room_id, player1_wins, player2_wins, "match finished");
        }

        Some(Event {
            room_id: room_id.to_string(),
            state: self.state,
            current_round: self.current_round,
            round,
            player1_wins,
            player2_wins,
        })
    }

    fn tally(&self) -> (usize, usize) {
        self.results[..self.current_round]
            .iter()
            .filter_map(RoundResult::winner)
            .fold((0, 0), |(p1, p2), winner| match winner {
                PlayerSlot::Player1 => (p1 + 1, p2),
                PlayerSlot::Player2 => (p1, p2 + 1),
            })
    }
}

/// A live registration on a room's event stream.
///
/// Holds only a weak reference to the room, so a subscription never keeps
/// an unregistered room alive. Once every room handle is gone,
/// [`recv`](Self::recv) returns `None`.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: mpsc::UnboundedReceiver<Event>,
    room: Weak<Shared>,
}

impl Subscription {
    /// The subscription id, unique and increasing within its room.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next event. Returns `None` once the room is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Returns `true` if this subscription was taken on `room`.
    pub fn belongs_to(&self, room: &Room) -> bool {
        std::ptr::eq(self.room.as_ptr(), Arc::as_ptr(&room.shared))
    }

    /// Returns the next already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Removes this subscription from its room.
    pub fn unsubscribe(self) {
        // Removal happens in `Drop`.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.room.upgrade() {
            shared.lock().subscribers.remove(self.id);
        }
    }
}
