use crate::game::{GameClient, RedrawTimer};
use crate::input::{InputEvent, InputManager};
use crate::lobby::{Lobby, Phase};
use crate::network::TransportBridge;
use crate::rendering::{Frame, Renderer};
use log::{debug, info, warn};
use macroquad::prelude::{next_frame, prevent_quit};
use shared::Packet;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Wires the game context, lobby, input and transport into one frame loop.
pub struct App {
    pub game: GameClient,
    pub lobby: Lobby,
    bridge: TransportBridge,
    timer: RedrawTimer,
    last_frame: Frame,
    quitting: bool,
}

impl App {
    pub fn new(game: GameClient, lobby: Lobby, bridge: TransportBridge) -> Self {
        let last_frame = Frame::new(0.0, 0.0);
        Self {
            game,
            lobby,
            bridge,
            timer: RedrawTimer::new(Instant::now()),
            last_frame,
            quitting: false,
        }
    }

    pub fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.game.set_local_id(client_id);
            }
            Packet::GameCreated { game_id } => {
                self.lobby.on_game_created(game_id);
            }
            Packet::UpdateGame { players } => {
                self.game.apply_snapshot(players);
                self.lobby.on_snapshot();
            }
            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.game.local_id = None;
            }
            other => {
                warn!("Unexpected packet from server: {:?}", other);
            }
        }
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        if self.quitting {
            return;
        }
        if event == InputEvent::Quit {
            info!("Leaving, notifying server");
            self.bridge.send(Packet::Disconnect);
            self.quitting = true;
            return;
        }

        if self.lobby.is_playing() {
            let direction = match event {
                InputEvent::KeyDown(direction) => direction,
                InputEvent::Enter | InputEvent::Backspace => None,
                InputEvent::Char(_) | InputEvent::Quit => return,
            };
            let packet = self.game.handle_key_down(direction);
            self.bridge.send(packet);
            return;
        }

        match event {
            InputEvent::Char(c) => self.lobby.type_char(c),
            InputEvent::Backspace => self.lobby.backspace(),
            InputEvent::Enter => {
                if let Some(request) = self.lobby.submit() {
                    self.bridge.send(request);
                }
            }
            InputEvent::KeyDown(_) | InputEvent::Quit => {}
        }
    }

    /// Processes pending events and returns the frame to show.
    pub fn update(&mut self, events: Vec<InputEvent>, now: Instant) -> &Frame {
        for packet in self.bridge.poll() {
            debug!("Received {:?}", packet);
            self.handle_packet(packet);
        }

        for event in events {
            self.handle_input(event);
        }

        if self.lobby.is_playing() {
            if self.timer.poll(now) {
                self.last_frame = self.game.tick();
            }
        } else if matches!(self.lobby.phase, Phase::Announcing { .. }) {
            if self.timer.poll(now) {
                let mut frame = self.game.tick();
                self.lobby.announcement(&mut frame);
                self.last_frame = frame;
            }
        } else {
            self.last_frame = self
                .lobby
                .frame(shared::CANVAS_WIDTH, shared::CANVAS_HEIGHT);
        }

        &self.last_frame
    }

    /// Runs the frame loop until the player quits. Returns the transport
    /// task so the caller can wait for `Disconnect` to go out.
    pub async fn run(mut self) -> Option<JoinHandle<()>> {
        let mut input = InputManager::new();
        let mut renderer = Renderer::new();
        prevent_quit();

        while !self.quitting {
            let events = input.update();
            let frame = self.update(events, Instant::now()).clone();
            renderer.render(&frame, &self.game.images);
            next_frame().await;
        }

        self.bridge.take_task()
    }
}
