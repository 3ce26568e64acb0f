use crate::images::ImageCache;
use crate::rendering::{DrawCommand, Frame};
use log::{debug, info};
use shared::{
    is_player_close_to_dot, resolve_collision, ClientId, Direction, Dot, Obstacle, Packet, Player,
    Players, CANVAS_HEIGHT, CANVAS_WIDTH, DOT_COUNT, DOT_SIZE, PACMAN_SIZE,
};
use std::time::{Duration, Instant};

/// Interval between redraws: 500 / 60 ms, about 8.33 ms.
pub const REDRAW_INTERVAL_MS: f64 = 500.0 / 60.0;

/// Client-side game context: player registry, remaining dots and avatar
/// images. Everything the frame loop and the event handlers share.
pub struct GameClient {
    pub local_id: Option<ClientId>,
    pub players: Players,
    pub dots: Vec<Dot>,
    pub obstacles: Vec<Obstacle>,
    pub images: ImageCache,
    pub image_url: String,
    width: f32,
    height: f32,
    game_over_logged: bool,
}

impl GameClient {
    pub fn new(dots: Vec<Dot>, obstacles: Vec<Obstacle>, images: ImageCache) -> Self {
        Self {
            local_id: None,
            players: Players::new(),
            dots,
            obstacles,
            images,
            image_url: String::new(),
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            game_over_logged: false,
        }
    }

    /// Sets the avatar URL published with every move.
    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    pub fn set_local_id(&mut self, client_id: ClientId) {
        self.local_id = Some(client_id);
    }

    /// Replaces the registry with a server snapshot. Nothing from the
    /// previous registry survives.
    pub fn apply_snapshot(&mut self, players: Players) {
        debug!("Snapshot with {} players", players.len());
        self.players = players;
    }

    /// Reacts to a key press: remembers the rollback point, steps one unit
    /// for arrow keys, collects nearby dots and returns the move to publish.
    ///
    /// The registry entry is moved in place. Without one the move is made on
    /// a detached default player, which never collects dots.
    pub fn handle_key_down(&mut self, direction: Option<Direction>) -> Packet {
        let mut detached = Player::default();
        let entry = match self.local_id {
            Some(id) => self.players.get_mut(&id),
            None => None,
        };
        let (player, in_registry) = match entry {
            Some(player) => (player, true),
            None => (&mut detached, false),
        };

        player.remember_position();
        if let Some(direction) = direction {
            player.step(direction);
        }

        let before = self.dots.len();
        if in_registry {
            self.dots.retain(|dot| !is_player_close_to_dot(player, dot));
        }
        let collected = before - self.dots.len();
        if collected > 0 {
            debug!(
                "Collected {} dots at ({:.1}, {:.1}), {} left",
                collected,
                player.x,
                player.y,
                self.dots.len()
            );
        }

        let mut pacman = player.clone();
        pacman.image_url = self.image_url.clone();
        Packet::PlayerMove { pacman }
    }

    /// One redraw: composes the frame and applies collision correction to
    /// each player right after its avatar is drawn.
    pub fn tick(&mut self) -> Frame {
        let mut frame = Frame::new(self.width, self.height);

        for dot in &self.dots {
            frame.push(DrawCommand::Dot {
                x: dot.x,
                y: dot.y,
                radius: DOT_SIZE,
            });
        }

        for (id, player) in self.players.iter_mut() {
            if player.image_url.is_empty() {
                frame.push(DrawCommand::Pacman {
                    x: player.x,
                    y: player.y,
                    radius: PACMAN_SIZE,
                });
            } else if self.images.request(&player.image_url).is_some() {
                frame.push(DrawCommand::Image {
                    url: player.image_url.clone(),
                    x: player.x - PACMAN_SIZE,
                    y: player.y - PACMAN_SIZE,
                    size: PACMAN_SIZE * 2.0,
                });
            }

            if resolve_collision(player, &self.obstacles) {
                debug!("Player {} hit a wall, back to ({}, {})", id, player.x, player.y);
            }
        }

        for obstacle in &self.obstacles {
            frame.push(DrawCommand::Rect {
                x: obstacle.x,
                y: obstacle.y,
                width: obstacle.width,
                height: obstacle.height,
                color: obstacle.color.clone(),
            });
        }

        if self.is_game_over() {
            if !self.game_over_logged {
                info!("All dots collected, game over");
                self.game_over_logged = true;
            }
            frame.push_game_over(self.dots_collected());
        }

        frame
    }

    pub fn is_game_over(&self) -> bool {
        self.dots.is_empty()
    }

    pub fn dots_collected(&self) -> usize {
        DOT_COUNT.saturating_sub(self.dots.len())
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.local_id.and_then(|id| self.players.get(&id))
    }
}

/// Fixed-interval redraw timer. Missed ticks are skipped, not replayed.
pub struct RedrawTimer {
    interval: Duration,
    next_tick: Instant,
}

impl RedrawTimer {
    pub fn new(start: Instant) -> Self {
        Self::with_interval(start, Duration::from_secs_f64(REDRAW_INTERVAL_MS / 1000.0))
    }

    pub fn with_interval(start: Instant, interval: Duration) -> Self {
        Self {
            interval,
            next_tick: start + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true when a tick is due at `now` and schedules the next one.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_tick {
            return false;
        }

        let behind = now.duration_since(self.next_tick);
        let skipped = (behind.as_nanos() / self.interval.as_nanos()) as u32;
        self.next_tick += self.interval * (skipped + 1);
        true
    }
}
