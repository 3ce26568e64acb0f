use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Radius of a player avatar, also the half-size of its collision box.
pub const PACMAN_SIZE: f32 = 30.0;
/// Drawn radius of a dot. Placement uses half of it as margin.
pub const DOT_SIZE: f32 = 5.0;
/// Distance covered by a single key press.
pub const SPEED: f32 = 10.0;
pub const DOT_COUNT: usize = 47;
pub const CANVAS_WIDTH: f32 = 800.0;
pub const CANVAS_HEIGHT: f32 = 600.0;
pub const PROTOCOL_VERSION: u32 = 1;

/// Size of every UDP receive buffer. One packet per datagram.
pub const RECV_BUFFER_SIZE: usize = 2048;
/// Longest avatar URL, in bytes, a player may publish.
pub const MAX_IMAGE_URL_LEN: usize = 160;
/// Players per room. With `MAX_IMAGE_URL_LEN` this keeps a full
/// `UpdateGame` inside `RECV_BUFFER_SIZE`.
pub const MAX_ROOM_PLAYERS: usize = 8;

/// Connection identifier assigned by the server.
pub type ClientId = u32;

/// Player registry as carried by snapshots, ordered by connection id.
pub type Players = BTreeMap<ClientId, Player>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    CreateGame,
    JoinGame {
        game_id: String,
    },
    PlayerMove {
        pacman: Player,
    },
    Heartbeat,
    Disconnect,

    Connected {
        client_id: ClientId,
    },
    GameCreated {
        game_id: String,
    },
    UpdateGame {
        players: Players,
    },
    Disconnected {
        reason: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub prev_x: f32,
    pub prev_y: f32,
    pub image_url: String,
}

impl Player {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            prev_x: x,
            prev_y: y,
            image_url: String::new(),
        }
    }

    /// Collision box as (left, top, right, bottom).
    pub fn get_bounds(&self) -> (f32, f32, f32, f32) {
        (
            self.x - PACMAN_SIZE,
            self.y - PACMAN_SIZE,
            self.x + PACMAN_SIZE,
            self.y + PACMAN_SIZE,
        )
    }

    /// Records the current position as the rollback point.
    pub fn remember_position(&mut self) {
        self.prev_x = self.x;
        self.prev_y = self.y;
    }

    pub fn revert_position(&mut self) {
        self.x = self.prev_x;
        self.y = self.prev_y;
    }

    pub fn step(&mut self, direction: Direction) {
        match direction {
            Direction::Up => self.y -= SPEED,
            Direction::Down => self.y += SPEED,
            Direction::Left => self.x -= SPEED,
            Direction::Right => self.x += SPEED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: String,
}

impl Obstacle {
    pub fn new(x: f32, y: f32, width: f32, height: f32, color: &str) -> Self {
        Self {
            x,
            y,
            width,
            height,
            color: color.to_string(),
        }
    }

    /// Strict overlap test against the box (left, top, right, bottom).
    /// Touching edges do not count.
    pub fn overlaps(&self, left: f32, top: f32, right: f32, bottom: f32) -> bool {
        left < self.x + self.width && right > self.x && top < self.y + self.height && bottom > self.y
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Dot {
    pub x: f32,
    pub y: f32,
}

impl Dot {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The wall layout. Fixed for the lifetime of the process.
pub fn obstacles() -> Vec<Obstacle> {
    vec![
        // Outer walls
        Obstacle::new(50.0, 50.0, 20.0, 400.0, "red"),
        Obstacle::new(50.0, 50.0, 400.0, 20.0, "red"),
        Obstacle::new(50.0, 450.0, 400.0, 20.0, "red"),
        Obstacle::new(730.0, 100.0, 20.0, 300.0, "red"),
        Obstacle::new(230.0, 150.0, 20.0, 500.0, "red"),
        Obstacle::new(50.0, 100.0, 20.0, 320.0, "red"),
        Obstacle::new(230.0, 350.0, 20.0, 500.0, "red"),
        Obstacle::new(400.0, 200.0, 20.0, 250.0, "red"),
        Obstacle::new(800.0, 600.0, 20.0, 600.0, "red"),
    ]
}

pub fn check_collision(player: &Player, obstacle: &Obstacle) -> bool {
    let (left, top, right, bottom) = player.get_bounds();
    obstacle.overlaps(left, top, right, bottom)
}

/// Rolls the player back to its previous position when it overlaps an
/// obstacle. Every obstacle is tested, the later ones against the reverted
/// position. Returns true if any revert happened.
pub fn resolve_collision(player: &mut Player, obstacles: &[Obstacle]) -> bool {
    let mut reverted = false;
    for obstacle in obstacles {
        if check_collision(player, obstacle) {
            player.revert_position();
            reverted = true;
        }
    }
    reverted
}

pub fn is_player_close_to_dot(player: &Player, dot: &Dot) -> bool {
    let distance = ((player.x - dot.x).powi(2) + (player.y - dot.y).powi(2)).sqrt();
    distance < PACMAN_SIZE + DOT_SIZE
}

/// A dot is valid when its radius-expanded box lies inside the canvas and
/// clear of every obstacle.
pub fn is_valid_dot(x: f32, y: f32, width: f32, height: f32, obstacles: &[Obstacle]) -> bool {
    let radius = DOT_SIZE / 2.0;
    if x < radius || x > width - radius || y < radius || y > height - radius {
        return false;
    }

    !obstacles
        .iter()
        .any(|obstacle| obstacle.overlaps(x - radius, y - radius, x + radius, y + radius))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_player_creation() {
        let player = Player::new(100.0, 200.0);
        assert_eq!(player.x, 100.0);
        assert_eq!(player.y, 200.0);
        assert_eq!(player.prev_x, 100.0);
        assert_eq!(player.prev_y, 200.0);
        assert!(player.image_url.is_empty());
    }

    #[test]
    fn test_player_bounds() {
        let player = Player::new(50.0, 75.0);
        let (x1, y1, x2, y2) = player.get_bounds();
        assert_eq!(x1, 50.0 - PACMAN_SIZE);
        assert_eq!(y1, 75.0 - PACMAN_SIZE);
        assert_eq!(x2, 50.0 + PACMAN_SIZE);
        assert_eq!(y2, 75.0 + PACMAN_SIZE);
    }

    #[test]
    fn test_player_step_directions() {
        let mut player = Player::new(100.0, 100.0);
        player.step(Direction::Right);
        assert_approx_eq!(player.x, 110.0);
        player.step(Direction::Down);
        assert_approx_eq!(player.y, 110.0);
        player.step(Direction::Left);
        player.step(Direction::Left);
        assert_approx_eq!(player.x, 90.0);
        player.step(Direction::Up);
        assert_approx_eq!(player.y, 100.0);
    }

    #[test]
    fn test_remember_and_revert() {
        let mut player = Player::new(10.0, 20.0);
        player.x = 40.0;
        player.remember_position();
        player.x = 50.0;
        player.revert_position();
        assert_eq!(player.x, 40.0);
        assert_eq!(player.y, 20.0);
    }

    #[test]
    fn test_collision_detection_no_collision() {
        let player = Player::new(150.0, 110.0);
        assert!(obstacles().iter().all(|o| !check_collision(&player, o)));
    }

    #[test]
    fn test_collision_detection_overlap() {
        let player = Player::new(60.0, 60.0);
        let wall = Obstacle::new(50.0, 50.0, 20.0, 400.0, "red");
        assert!(check_collision(&player, &wall));
    }

    #[test]
    fn test_collision_detection_exact_touch() {
        let wall = Obstacle::new(50.0, 50.0, 20.0, 400.0, "red");
        let player = Player::new(70.0 + PACMAN_SIZE, 200.0);
        assert!(!check_collision(&player, &wall));
    }

    #[test]
    fn test_collision_resolution_reverts_to_previous() {
        let wall = Obstacle::new(50.0, 50.0, 20.0, 400.0, "red");
        let mut player = Player::new(70.0, 60.0);
        player.remember_position();
        player.x = 60.0;
        player.prev_x = 110.0;
        player.prev_y = 200.0;

        assert!(resolve_collision(&mut player, &[wall]));
        assert_eq!(player.x, 110.0);
        assert_eq!(player.y, 200.0);
    }

    #[test]
    fn test_collision_resolution_keeps_checking_after_revert() {
        // The rollback point itself sits in the second wall, so both walls fire
        // and the player ends on the rollback point.
        let walls = vec![
            Obstacle::new(0.0, 0.0, 10.0, 10.0, "red"),
            Obstacle::new(200.0, 200.0, 10.0, 10.0, "red"),
        ];
        let mut player = Player::new(5.0, 5.0);
        player.prev_x = 205.0;
        player.prev_y = 205.0;

        assert!(resolve_collision(&mut player, &walls));
        assert_eq!(player.x, 205.0);
        assert_eq!(player.y, 205.0);
    }

    #[test]
    fn test_collision_resolution_free_space() {
        let mut player = Player::new(150.0, 110.0);
        player.prev_x = 0.0;
        assert!(!resolve_collision(&mut player, &obstacles()));
        assert_eq!(player.x, 150.0);
    }

    #[test]
    fn test_dot_proximity() {
        let player = Player::new(100.0, 100.0);
        assert!(is_player_close_to_dot(&player, &Dot::new(120.0, 100.0)));
        assert!(!is_player_close_to_dot(&player, &Dot::new(150.0, 100.0)));
        assert!(!is_player_close_to_dot(&player, &Dot::new(135.0, 100.0)));
        assert!(is_player_close_to_dot(&player, &Dot::new(134.9, 100.0)));
    }

    #[test]
    fn test_dot_validity() {
        let walls = obstacles();
        assert!(is_valid_dot(500.0, 500.0, CANVAS_WIDTH, CANVAS_HEIGHT, &walls));
        assert!(!is_valid_dot(1.0, 300.0, CANVAS_WIDTH, CANVAS_HEIGHT, &walls));
        assert!(!is_valid_dot(500.0, 599.0, CANVAS_WIDTH, CANVAS_HEIGHT, &walls));
        assert!(!is_valid_dot(60.0, 200.0, CANVAS_WIDTH, CANVAS_HEIGHT, &walls));
        // Margin: 2.5 to the left of the wall still touches it.
        assert!(!is_valid_dot(48.0, 200.0, CANVAS_WIDTH, CANVAS_HEIGHT, &walls));
        assert!(is_valid_dot(47.5, 200.0, CANVAS_WIDTH, CANVAS_HEIGHT, &walls));
    }

    #[test]
    fn test_obstacle_table() {
        let walls = obstacles();
        assert_eq!(walls.len(), 9);
        assert!(walls.iter().all(|o| o.color == "red"));
        assert_eq!(walls[0], Obstacle::new(50.0, 50.0, 20.0, 400.0, "red"));
    }

    #[test]
    fn test_packet_serialization_player_move() {
        let mut pacman = Player::new(100.0, 200.0);
        pacman.image_url = "file:///tmp/face.png".to_string();
        let packet = Packet::PlayerMove { pacman };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::PlayerMove { pacman } => {
                assert_eq!(pacman.x, 100.0);
                assert_eq!(pacman.image_url, "file:///tmp/face.png");
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_update_game() {
        let mut players = Players::new();
        players.insert(1, Player::new(100.0, 200.0));
        players.insert(2, Player::new(300.0, 400.0));

        let packet = Packet::UpdateGame { players };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::UpdateGame { players } => {
                assert_eq!(players.len(), 2);
                assert_eq!(players[&1].x, 100.0);
                assert_eq!(players[&2].y, 400.0);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_full_room_update_fits_receive_buffer() {
        let mut players = Players::new();
        for id in 0..MAX_ROOM_PLAYERS as ClientId {
            let mut player = Player::new(f32::MAX, f32::MIN);
            player.image_url = "x".repeat(MAX_IMAGE_URL_LEN);
            players.insert(u32::MAX - id, player);
        }

        let serialized = bincode::serialize(&Packet::UpdateGame { players }).unwrap();
        assert!(
            serialized.len() <= RECV_BUFFER_SIZE,
            "{} bytes",
            serialized.len()
        );
    }
}
