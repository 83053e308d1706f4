//! Event snapshots and the per-room subscriber registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{RoomState, RoundResult};

/// A point-in-time snapshot published every time a round is decided.
///
/// Built while the room lock is held, right after the mutation that
/// produced it, so every field reflects the same consistent room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Room the event belongs to.
    pub room_id: String,
    /// State after the round was decided (`Finished` on the last round).
    pub state: RoomState,
    /// Index of the next round to play; equals the number of decided rounds.
    pub current_round: usize,
    /// The hands of the round that was just decided.
    pub round: RoundResult,
    /// Rounds won so far by player 1.
    pub player1_wins: usize,
    /// Rounds won so far by player 2.
    pub player2_wins: usize,
}

/// Channel sender a subscriber receives its events through.
pub(crate) type EventSender = mpsc::UnboundedSender<Event>;

/// Subscriber channels keyed by subscription id.
///
/// Ids are allocated from a counter that only grows, so iteration order of
/// the `BTreeMap` is registration order.
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    next_id: u64,
    senders: BTreeMap<u64, EventSender>,
}

impl Subscribers {
    pub(crate) fn insert(&mut self, sender: EventSender) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.senders.insert(id, sender);
        id
    }

    pub(crate) fn remove(&mut self, id: u64) -> bool {
        self.senders.remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }

    /// Hands a copy of `event` to every subscriber, in id order.
    ///
    /// Sending on an unbounded channel never blocks and never runs
    /// subscriber code. Subscribers whose receiving half is gone are
    /// dropped from the registry.
    pub(crate) fn publish(&mut self, event: &Event) {
        self.senders.retain(|id, sender| match sender.send(event.clone()) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(
                    room_id = %event.room_id,
                    subscription = id,
                    "subscriber gone, removing"
                );
                false
            }
        });
    }
}
