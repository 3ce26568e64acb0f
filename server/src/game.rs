use log::{info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use shared::{ClientId, Player, Players, MAX_IMAGE_URL_LEN, MAX_ROOM_PLAYERS};
use std::collections::{BTreeSet, HashMap};

pub const GAME_ID_LEN: usize = 6;

/// Alternating spawn points, both clear of every wall.
pub const SPAWN_POINTS: [(f32, f32); 2] = [(150.0, 110.0), (320.0, 110.0)];

#[derive(Debug, Clone, Default)]
pub struct Room {
    pub players: Players,
}

/// Every running game and which client plays in which one.
///
/// The server does not simulate anything: moves are stored exactly as the
/// client reported them and relayed to the rest of the room.
#[derive(Debug, Default)]
pub struct GameRooms {
    rooms: HashMap<String, Room>,
    membership: HashMap<ClientId, String>,
    dirty: BTreeSet<String>,
    next_spawn: usize,
}

impl GameRooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a room under a fresh id and puts the creator in it.
    pub fn create_game<R: Rng + ?Sized>(&mut self, rng: &mut R, client_id: ClientId) -> String {
        let game_id = loop {
            let candidate = random_game_id(rng);
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        self.rooms.insert(game_id.clone(), Room::default());
        self.spawn(client_id, &game_id);
        info!("Client {} created game {}", client_id, game_id);
        game_id
    }

    /// Returns false when no room has that id or the room is full.
    pub fn join_game(&mut self, client_id: ClientId, game_id: &str) -> bool {
        let Some(room) = self.rooms.get(game_id) else {
            warn!("Client {} tried to join unknown game {}", client_id, game_id);
            return false;
        };
        if self.game_of(client_id) == Some(game_id) {
            return true;
        }
        if room.players.len() >= MAX_ROOM_PLAYERS {
            warn!("Client {} tried to join full game {}", client_id, game_id);
            return false;
        }

        self.spawn(client_id, game_id);
        info!("Client {} joined game {}", client_id, game_id);
        true
    }

    /// Stores the reported player as-is. Only the avatar URL length is
    /// checked, so that the room snapshot still fits in one datagram.
    pub fn apply_move(&mut self, client_id: ClientId, player: Player) -> bool {
        if player.image_url.len() > MAX_IMAGE_URL_LEN {
            warn!(
                "Dropping move from client {}: image URL is {} bytes",
                client_id,
                player.image_url.len()
            );
            return false;
        }

        let Some(game_id) = self.membership.get(&client_id) else {
            warn!("Move from client {} outside any game", client_id);
            return false;
        };

        match self.rooms.get_mut(game_id) {
            Some(room) => {
                room.players.insert(client_id, player);
                self.dirty.insert(game_id.clone());
                true
            }
            None => false,
        }
    }

    /// Drops the client's player. Rooms left empty are closed.
    pub fn remove_client(&mut self, client_id: ClientId) {
        let Some(game_id) = self.membership.remove(&client_id) else {
            return;
        };

        let now_empty = match self.rooms.get_mut(&game_id) {
            Some(room) => {
                room.players.remove(&client_id);
                room.players.is_empty()
            }
            None => false,
        };

        if now_empty {
            info!("Game {} is empty, closing it", game_id);
            self.rooms.remove(&game_id);
            self.dirty.remove(&game_id);
        } else {
            self.dirty.insert(game_id);
        }
    }

    pub fn game_of(&self, client_id: ClientId) -> Option<&str> {
        self.membership.get(&client_id).map(String::as_str)
    }

    pub fn room(&self, game_id: &str) -> Option<&Room> {
        self.rooms.get(game_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Snapshots of every room changed since the last call.
    pub fn take_dirty(&mut self) -> Vec<(String, Players)> {
        std::mem::take(&mut self.dirty)
            .into_iter()
            .filter_map(|game_id| {
                let players = self.rooms.get(&game_id)?.players.clone();
                Some((game_id, players))
            })
            .collect()
    }

    fn spawn(&mut self, client_id: ClientId, game_id: &str) {
        if self.game_of(client_id).is_some() {
            self.remove_client(client_id);
        }

        let (x, y) = SPAWN_POINTS[self.next_spawn % SPAWN_POINTS.len()];
        self.next_spawn += 1;

        if let Some(room) = self.rooms.get_mut(game_id) {
            room.players.insert(client_id, Player::new(x, y));
            self.membership.insert(client_id, game_id.to_string());
            self.dirty.insert(game_id.to_string());
        }
    }
}

fn random_game_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..GAME_ID_LEN)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect()
}
