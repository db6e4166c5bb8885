//! Room directory: owns every active room and the player-to-room index.

use std::collections::HashMap;

use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use crate::state::game::{Player, Room, RoomPhase};

/// Alphabet used for room codes: uppercase alphanumerics minus the
/// ambiguous `0`, `O`, `1`, and `I`.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Error returned when a directory operation cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// No active room carries the given code.
    #[error("room `{0}` not found")]
    NotFound(String),
    /// The room is at capacity.
    #[error("room `{0}` is full")]
    Full(String),
    /// The player is already a member of the room.
    #[error("player already joined room `{0}`")]
    AlreadyJoined(String),
    /// The room's game has already started.
    #[error("room `{0}` is already in progress")]
    InProgress(String),
    /// The player is not a member of the room.
    #[error("player is not in room `{0}`")]
    NotInRoom(String),
}

/// What happened to a room when a player left it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// True when the departing player was the last member and the room was deleted.
    pub room_deleted: bool,
    /// Identity of the newly promoted host, when the departing player was host.
    pub new_host: Option<Uuid>,
}

/// Directory of active rooms plus the player-to-room index.
///
/// The two maps are always mutated together; an index entry without a
/// matching room membership is a correctness bug.
#[derive(Debug)]
pub struct RoomDirectory {
    rooms: HashMap<String, Room>,
    player_rooms: HashMap<Uuid, String>,
    code_length: usize,
    max_players: usize,
}

impl RoomDirectory {
    /// Create an empty directory with the configured code length and room capacity.
    pub fn new(code_length: usize, max_players: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            code_length,
            max_players,
        }
    }

    /// Create a room with the caller as sole player and host.
    pub fn create_room(&mut self, player_id: Uuid, name: String) -> &Room {
        let code = self.generate_code();
        let room = Room::new(code.clone(), self.max_players, player_id, name);
        self.rooms.insert(code.clone(), room);
        self.player_rooms.insert(player_id, code.clone());
        tracing::info!(%code, %player_id, "room created");
        self.rooms.get(&code).expect("room inserted above")
    }

    /// Add a player to a waiting room.
    pub fn join_room(
        &mut self,
        code: &str,
        player_id: Uuid,
        name: String,
    ) -> Result<&Room, RoomError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.to_string()))?;

        if room.players.contains_key(&player_id) {
            return Err(RoomError::AlreadyJoined(code.to_string()));
        }
        if room.players.len() >= room.max_players {
            return Err(RoomError::Full(code.to_string()));
        }
        if room.phase != RoomPhase::Waiting {
            return Err(RoomError::InProgress(code.to_string()));
        }

        room.players
            .insert(player_id, Player::new(player_id, name, false));
        self.player_rooms.insert(player_id, code.to_string());
        tracing::info!(%code, %player_id, players = room.players.len(), "player joined room");
        Ok(&self.rooms[code])
    }

    /// Remove a player, promoting the earliest-joined remaining player to
    /// host if needed and deleting the room when it empties.
    pub fn leave_room(&mut self, code: &str, player_id: Uuid) -> Result<LeaveOutcome, RoomError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.to_string()))?;

        let departed = room
            .players
            .shift_remove(&player_id)
            .ok_or_else(|| RoomError::NotInRoom(code.to_string()))?;
        self.player_rooms.remove(&player_id);

        if room.players.is_empty() {
            self.rooms.remove(code);
            tracing::info!(%code, %player_id, "last player left; room deleted");
            return Ok(LeaveOutcome {
                room_deleted: true,
                new_host: None,
            });
        }

        let mut new_host = None;
        if departed.is_host {
            // Insertion order is join order, so the first entry is the
            // earliest-joined remaining player.
            if let Some(successor) = room.players.values_mut().next() {
                successor.is_host = true;
                new_host = Some(successor.id);
                tracing::info!(%code, host = %successor.id, "host left; promoted successor");
            }
        }

        Ok(LeaveOutcome {
            room_deleted: false,
            new_host,
        })
    }

    /// Look up a room by code.
    pub fn room(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    /// Look up a room by code, mutably.
    pub fn room_mut(&mut self, code: &str) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    /// Code of the room the player is currently in, if any.
    pub fn room_code_of(&self, player_id: Uuid) -> Option<&str> {
        self.player_rooms.get(&player_id).map(String::as_str)
    }

    /// Iterate over every active room.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Defensive sweep removing any room whose player list is empty.
    ///
    /// Leave already deletes synchronously; this is periodic housekeeping.
    /// Returns the number of rooms removed.
    pub fn cleanup_empty_rooms(&mut self) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|_, room| !room.players.is_empty());
        let removed = before - self.rooms.len();
        if removed > 0 {
            let live: std::collections::HashSet<&String> = self.rooms.keys().collect();
            self.player_rooms.retain(|_, code| live.contains(code));
        }
        removed
    }

    fn generate_code(&self) -> String {
        let mut rng = rand::rng();
        loop {
            let code: String = (0..self.code_length)
                .map(|_| {
                    let index = rng.random_range(0..ROOM_CODE_ALPHABET.len());
                    char::from(ROOM_CODE_ALPHABET[index])
                })
                .collect();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> RoomDirectory {
        RoomDirectory::new(6, 3)
    }

    #[test]
    fn created_room_has_creator_as_host() {
        let mut dir = directory();
        let creator = Uuid::new_v4();
        let room = dir.create_room(creator, "alice".into());
        assert_eq!(room.players.len(), 1);
        assert_eq!(room.host_id(), Some(creator));
        assert_eq!(room.phase, RoomPhase::Waiting);

        let code = room.code.clone();
        assert!(code.len() == 6);
        assert!(code.bytes().all(|byte| ROOM_CODE_ALPHABET.contains(&byte)));
        assert_eq!(dir.room_code_of(creator), Some(code.as_str()));
    }

    #[test]
    fn generated_codes_are_unique_and_well_formed() {
        let mut dir = RoomDirectory::new(6, 8);
        let mut codes = std::collections::HashSet::new();
        for _ in 0..200 {
            let code = dir.create_room(Uuid::new_v4(), "p".into()).code.clone();
            assert!(codes.insert(code.clone()), "duplicate code {code}");
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|byte| ROOM_CODE_ALPHABET.contains(&byte)));
        }
    }

    #[test]
    fn join_rejects_unknown_full_and_started_rooms() {
        let mut dir = directory();
        let code = dir.create_room(Uuid::new_v4(), "host".into()).code.clone();

        assert_eq!(
            dir.join_room("NOSUCH", Uuid::new_v4(), "x".into())
                .unwrap_err(),
            RoomError::NotFound("NOSUCH".into())
        );

        dir.join_room(&code, Uuid::new_v4(), "b".into()).unwrap();
        dir.join_room(&code, Uuid::new_v4(), "c".into()).unwrap();
        let full = dir
            .join_room(&code, Uuid::new_v4(), "d".into())
            .unwrap_err();
        assert_eq!(full, RoomError::Full(code.clone()));
        assert_eq!(dir.room(&code).unwrap().players.len(), 3);

        let mut dir = directory();
        let member = Uuid::new_v4();
        let code = dir.create_room(member, "host".into()).code.clone();
        assert_eq!(
            dir.join_room(&code, member, "host".into()).unwrap_err(),
            RoomError::AlreadyJoined(code.clone())
        );

        dir.room_mut(&code).unwrap().phase = RoomPhase::Playing;
        let late = dir
            .join_room(&code, Uuid::new_v4(), "late".into())
            .unwrap_err();
        assert_eq!(late, RoomError::InProgress(code.clone()));
        assert_eq!(dir.room(&code).unwrap().players.len(), 1);
    }

    #[test]
    fn host_departure_promotes_earliest_joined_member() {
        let mut dir = directory();
        let host = Uuid::new_v4();
        let second = Uuid::new_v4();
        let third = Uuid::new_v4();
        let code = dir.create_room(host, "host".into()).code.clone();
        dir.join_room(&code, second, "second".into()).unwrap();
        dir.join_room(&code, third, "third".into()).unwrap();

        let outcome = dir.leave_room(&code, host).unwrap();
        assert!(!outcome.room_deleted);
        assert_eq!(outcome.new_host, Some(second));
        assert_eq!(dir.room(&code).unwrap().host_id(), Some(second));

        // Exactly one host at any time.
        let hosts = dir
            .room(&code)
            .unwrap()
            .players
            .values()
            .filter(|player| player.is_host)
            .count();
        assert_eq!(hosts, 1);
    }

    #[test]
    fn non_host_departure_keeps_the_host() {
        let mut dir = directory();
        let host = Uuid::new_v4();
        let second = Uuid::new_v4();
        let code = dir.create_room(host, "host".into()).code.clone();
        dir.join_room(&code, second, "second".into()).unwrap();

        let outcome = dir.leave_room(&code, second).unwrap();
        assert_eq!(outcome.new_host, None);
        assert_eq!(dir.room(&code).unwrap().host_id(), Some(host));
        assert_eq!(dir.room_code_of(second), None);
    }

    #[test]
    fn last_departure_deletes_the_room() {
        let mut dir = directory();
        let host = Uuid::new_v4();
        let code = dir.create_room(host, "host".into()).code.clone();

        let outcome = dir.leave_room(&code, host).unwrap();
        assert!(outcome.room_deleted);
        assert!(dir.room(&code).is_none());
        assert_eq!(dir.room_code_of(host), None);
        assert_eq!(dir.room_count(), 0);
    }

    #[test]
    fn leave_rejects_unknown_room_and_non_member() {
        let mut dir = directory();
        assert_eq!(
            dir.leave_room("NOSUCH", Uuid::new_v4()).unwrap_err(),
            RoomError::NotFound("NOSUCH".into())
        );

        let code = dir.create_room(Uuid::new_v4(), "host".into()).code.clone();
        assert_eq!(
            dir.leave_room(&code, Uuid::new_v4()).unwrap_err(),
            RoomError::NotInRoom(code.clone())
        );
    }

    #[test]
    fn cleanup_sweep_is_idempotent() {
        let mut dir = directory();
        let host = Uuid::new_v4();
        let code = dir.create_room(host, "host".into()).code.clone();

        assert_eq!(dir.cleanup_empty_rooms(), 0);

        // Simulate a race where the membership emptied without deletion.
        dir.room_mut(&code).unwrap().players.clear();
        assert_eq!(dir.cleanup_empty_rooms(), 1);
        assert_eq!(dir.cleanup_empty_rooms(), 0);
        assert_eq!(dir.room_code_of(host), None);
    }
}
