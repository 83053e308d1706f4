//! Lobby: which seats of which rooms have a live connection.
//!
//! A room is started the moment both of its seats are connected. Each
//! seat is held by a [`Seat`] guard; dropping it frees the seat again so
//! the player can reconnect.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jokenpo_protocol::ServerMessage;
use jokenpo_room::{PlayerSlot, Room};
use tokio::sync::mpsc;

/// Channel into a connection's outbound queue.
pub(crate) type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// Connected seats of one room.
#[derive(Debug)]
struct Table {
    room: Room,
    seats: HashMap<PlayerSlot, Outbound>,
}

/// Tables grouped by room id. A deleted room and its replacement share an
/// id, so each group is told apart by room identity.
type Tables = HashMap<String, Vec<Table>>;

/// The seat is already held by another connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} is already connected")]
pub(crate) struct SeatTaken(pub(crate) PlayerSlot);

#[derive(Debug, Default)]
pub(crate) struct Lobby {
    tables: Mutex<Tables>,
}

impl Lobby {
    /// Claims `slot` of `room` for the connection behind `outbound`.
    ///
    /// When this fills the second seat of a room that has not started yet,
    /// the room is started and both seats are sent
    /// [`ServerMessage::MatchStarted`].
    pub(crate) fn take_seat(
        self: &Arc<Self>,
        room: &Room,
        slot: PlayerSlot,
        outbound: Outbound,
    ) -> Result<Seat, SeatTaken> {
        let full = {
            let mut tables = self.lock();
            let table = table_mut(&mut tables, room);
            if table.seats.contains_key(&slot) {
                return Err(SeatTaken(slot));
            }
            table.seats.insert(slot, outbound);
            table.seats.len() == PlayerSlot::ALL.len()
        };
        tracing::debug!(room_id = %room.id(), %slot, "seat taken");

        let seat = Seat {
            lobby: Arc::clone(self),
            room: room.clone(),
            slot,
        };

        // Room lock taken only after the lobby lock is released.
        if full && room.start() {
            self.broadcast(
                room,
                &ServerMessage::MatchStarted {
                    room_id: room.id().to_string(),
                },
            );
        }
        Ok(seat)
    }

    /// Queues `msg` on every connected seat of `room`.
    pub(crate) fn broadcast(&self, room: &Room, msg: &ServerMessage) {
        let tables = self.lock();
        if let Some(table) = table(&tables, room) {
            for outbound in table.seats.values() {
                // A closed queue means that connection is on its way out.
                let _ = outbound.send(msg.clone());
            }
        }
    }

    /// Number of connected seats in `room`.
    pub(crate) fn connected(&self, room: &Room) -> usize {
        table(&self.lock(), room).map_or(0, |table| table.seats.len())
    }

    fn release(&self, room: &Room, slot: PlayerSlot) {
        let mut tables = self.lock();
        if let Some(same_id) = tables.get_mut(room.id()) {
            if let Some(index) = same_id.iter().position(|t| t.room.same_room(room)) {
                same_id[index].seats.remove(&slot);
                if same_id[index].seats.is_empty() {
                    same_id.swap_remove(index);
                }
            }
            if same_id.is_empty() {
                tables.remove(room.id());
            }
        }
        tracing::debug!(room_id = %room.id(), %slot, "seat released");
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn table<'a>(tables: &'a Tables, room: &Room) -> Option<&'a Table> {
    tables
        .get(room.id())?
        .iter()
        .find(|table| table.room.same_room(room))
}

fn table_mut<'a>(tables: &'a mut Tables, room: &Room) -> &'a mut Table {
    let same_id = tables.entry(room.id().to_string()).or_default();
    let index = match same_id.iter().position(|t| t.room.same_room(room)) {
        Some(index) => index,
        None => {
            same_id.push(Table {
                room: room.clone(),
                seats: HashMap::new(),
            });
            same_id.len() - 1
        }
    };
    &mut same_id[index]
}

/// Drop guard for a claimed seat.
#[derive(Debug)]
pub(crate) struct Seat {
    lobby: Arc<Lobby>,
    room: Room,
    slot: PlayerSlot,
}

impl Seat {
    pub(crate) fn slot(&self) -> PlayerSlot {
        self.slot
    }
}

impl Drop for Seat {
    fn drop(&mut self) {
        self.lobby.release(&self.room, self.slot);
    }
}
