//! Hub: the registry of live rooms and the join check.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{HubError, PlayerSlot, Room};

/// Maps room ids to rooms and authorizes players into their seats.
///
/// The map sits behind one reader/writer lock: registration and removal
/// take it exclusively, lookups and joins share it. The hub lock is never
/// held while a room lock is taken; lookups clone the room handle out and
/// release the hub before touching the room.
#[derive(Debug, Default)]
pub struct Hub {
    rooms: RwLock<HashMap<String, Room>>,
}

impl Hub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `room` under its id, replacing any room already there.
    pub fn register_room(&self, room: Room) {
        let id = room.id().to_string();
        if self.write().insert(id.clone(), room).is_some() {
            tracing::warn!(room_id = %id, "room replaced");
        } else {
            tracing::info!(room_id = %id, "room registered");
        }
    }

    /// Publishes `room` only if its id is free.
    ///
    /// The check and the insert happen under one write lock, so of several
    /// concurrent registrations for the same id exactly one succeeds.
    ///
    /// # Errors
    /// Hands `room` back when the id is already taken.
    pub fn try_register_room(&self, room: Room) -> Result<(), Room> {
        let mut rooms = self.write();
        match rooms.entry(room.id().to_string()) {
            Entry::Occupied(_) => {
                tracing::debug!(room_id = %room.id(), "registration refused, id taken");
                Err(room)
            }
            Entry::Vacant(slot) => {
                tracing::info!(room_id = %room.id(), "room registered");
                slot.insert(room);
                Ok(())
            }
        }
    }

    /// Returns the room registered under `id`.
    pub fn get_room(&self, id: &str) -> Option<Room> {
        self.read().get(id).cloned()
    }

    /// Removes the room registered under `id`. Missing ids are fine.
    pub fn unregister_room(&self, id: &str) {
        if self.write().remove(id).is_some() {
            tracing::info!(room_id = %id, "room unregistered");
        }
    }

    /// Checks a player's credentials against a room's seats.
    ///
    /// # Errors
    /// - [`HubError::NoRoom`] if nothing is registered under `room_id`
    /// - [`HubError::InvalidJoinCode`] if `(player_id, join_code)` matches
    ///   neither seat
    pub fn join_room(
        &self,
        room_id: &str,
        player_id: &str,
        join_code: &str,
    ) -> Result<(Room, PlayerSlot), HubError> {
        // The hub guard is a temporary here, so it is released before
        // `authorize` runs.
        let room = self
            .get_room(room_id)
            .ok_or_else(|| HubError::NoRoom(room_id.to_string()))?;

        match room.authorize(player_id, join_code) {
            Some(slot) => {
                tracing::info!(%room_id, %player_id, %slot, "join authorized");
                Ok((room, slot))
            }
            None => {
                tracing::warn!(%room_id, %player_id, "join rejected: invalid join code");
                Err(HubError::InvalidJoinCode)
            }
        }
    }

    /// Number of registered rooms.
    pub fn room_count(&self) -> usize {
        self.read().len()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Room>> {
        self.rooms.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Room>> {
        self.rooms.write().unwrap_or_else(PoisonError::into_inner)
    }
}
