//! Lobby screen and the "game created" acknowledgement

use crate::rendering::Frame;
use log::info;
use shared::Packet;

const LOBBY_FONT_SIZE: f32 = 24.0;
const MAX_GAME_ID_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    /// Modal notice shown after creating a game. Swallows input until
    /// acknowledged.
    Announcing { game_id: String },
    Playing,
}

#[derive(Debug, Clone)]
pub struct Lobby {
    pub phase: Phase,
    pub game_id_input: String,
    pending_request: bool,
}

impl Lobby {
    pub fn new(game_id_input: impl Into<String>) -> Self {
        Self {
            phase: Phase::Lobby,
            game_id_input: game_id_input.into(),
            pending_request: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.phase == Phase::Playing
    }

    pub fn type_char(&mut self, c: char) {
        if self.phase == Phase::Lobby && self.game_id_input.len() < MAX_GAME_ID_LEN {
            self.game_id_input.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.phase == Phase::Lobby {
            self.game_id_input.pop();
        }
    }

    /// Handles Enter. In the lobby this returns the request to send: an
    /// empty input creates a game, anything else joins that game id. In the
    /// announcement it dismisses the notice.
    pub fn submit(&mut self) -> Option<Packet> {
        match &self.phase {
            Phase::Lobby => {
                self.pending_request = true;
                let game_id = self.game_id_input.trim().to_string();
                if game_id.is_empty() {
                    info!("Requesting a new game");
                    Some(Packet::CreateGame)
                } else {
                    info!("Joining game {}", game_id);
                    Some(Packet::JoinGame { game_id })
                }
            }
            Phase::Announcing { .. } => {
                self.phase = Phase::Playing;
                None
            }
            Phase::Playing => None,
        }
    }

    pub fn on_game_created(&mut self, game_id: String) {
        info!("Game created! Share this ID with your friend: {}", game_id);
        self.phase = Phase::Announcing { game_id };
    }

    /// A snapshot means the server placed us in a game. Joiners never get a
    /// creation notice, so this is where they leave the lobby.
    pub fn on_snapshot(&mut self) {
        if self.phase == Phase::Lobby && self.pending_request {
            self.phase = Phase::Playing;
        }
    }

    pub fn frame(&self, width: f32, height: f32) -> Frame {
        let mut frame = Frame::new(width, height);
        let middle = height / 2.0;

        frame.push_text("MultiPac", middle - 80.0, LOBBY_FONT_SIZE * 1.5);
        frame.push_text(
            format!("Game ID: {}_", self.game_id_input),
            middle - 20.0,
            LOBBY_FONT_SIZE,
        );
        let hint = if self.pending_request {
            "Waiting for the server..."
        } else {
            "Enter with an empty ID creates a game, otherwise joins it"
        };
        frame.push_text(hint, middle + 20.0, LOBBY_FONT_SIZE * 0.75);
        frame
    }

    /// Overlay for the announcement phase, drawn over the game frame.
    pub fn announcement(&self, frame: &mut Frame) {
        if let Phase::Announcing { game_id } = &self.phase {
            let middle = frame.height / 2.0;
            frame.push_text(
                format!("Game created! Share this ID with your friend: {}", game_id),
                middle - 100.0,
                LOBBY_FONT_SIZE,
            );
            frame.push_text("Press Enter to continue", middle - 70.0, LOBBY_FONT_SIZE * 0.75);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::DrawCommand;

    #[test]
    fn test_empty_input_creates_game() {
        let mut lobby = Lobby::new("");
        assert_eq!(lobby.submit(), Some(Packet::CreateGame));
        assert_eq!(lobby.phase, Phase::Lobby);
    }

    #[test]
    fn test_typed_id_joins_game() {
        let mut lobby = Lobby::new("");
        for c in "ab12".chars() {
            lobby.type_char(c);
        }
        lobby.type_char('x');
        lobby.backspace();

        assert_eq!(
            lobby.submit(),
            Some(Packet::JoinGame {
                game_id: "ab12".to_string()
            })
        );
    }

    #[test]
    fn test_prefilled_id_is_trimmed() {
        let mut lobby = Lobby::new("  Q7X2 ");
        assert_eq!(
            lobby.submit(),
            Some(Packet::JoinGame {
                game_id: "Q7X2".to_string()
            })
        );
    }

    #[test]
    fn test_game_created_blocks_until_enter() {
        let mut lobby = Lobby::new("");
        lobby.submit();
        lobby.on_game_created("K3J9QZ".to_string());

        assert_eq!(
            lobby.phase,
            Phase::Announcing {
                game_id: "K3J9QZ".to_string()
            }
        );
        assert!(!lobby.is_playing());

        // Typing is ignored while the notice is up.
        lobby.type_char('z');
        assert!(lobby.game_id_input.is_empty());

        assert_eq!(lobby.submit(), None);
        assert!(lobby.is_playing());
    }

    #[test]
    fn test_snapshot_moves_joiner_to_playing() {
        let mut lobby = Lobby::new("K3J9QZ");
        lobby.on_snapshot();
        assert_eq!(lobby.phase, Phase::Lobby);

        lobby.submit();
        lobby.on_snapshot();
        assert!(lobby.is_playing());
    }

    #[test]
    fn test_snapshot_does_not_skip_announcement() {
        let mut lobby = Lobby::new("");
        lobby.submit();
        lobby.on_game_created("K3J9QZ".to_string());
        lobby.on_snapshot();
        assert!(!lobby.is_playing());
    }

    #[test]
    fn test_announcement_overlay() {
        let mut lobby = Lobby::new("");
        let mut frame = Frame::new(800.0, 600.0);
        lobby.announcement(&mut frame);
        assert!(frame.commands.is_empty());

        lobby.on_game_created("K3J9QZ".to_string());
        lobby.announcement(&mut frame);
        assert!(frame.commands.iter().any(|c| matches!(
            c,
            DrawCommand::Text { text, .. } if text.ends_with("K3J9QZ")
        )));
    }
}
