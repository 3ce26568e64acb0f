//! Keyboard input: key-down events with key repeat and text entry

use macroquad::prelude::*;
use shared::Direction;
use std::time::{Duration, Instant};

/// Hold time before a held arrow key starts repeating.
pub const REPEAT_DELAY: Duration = Duration::from_millis(500);
/// Interval between repeated key-down events.
pub const REPEAT_RATE: Duration = Duration::from_millis(33);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Any key-down. Arrow keys carry their direction.
    KeyDown(Option<Direction>),
    Enter,
    Backspace,
    Char(char),
    /// Escape, or the window's close button.
    Quit,
}

pub fn direction_for_key(key: KeyCode) -> Option<Direction> {
    match key {
        KeyCode::Up => Some(Direction::Up),
        KeyCode::Down => Some(Direction::Down),
        KeyCode::Left => Some(Direction::Left),
        KeyCode::Right => Some(Direction::Right),
        _ => None,
    }
}

fn key_for_direction(direction: Direction) -> KeyCode {
    match direction {
        Direction::Up => KeyCode::Up,
        Direction::Down => KeyCode::Down,
        Direction::Left => KeyCode::Left,
        Direction::Right => KeyCode::Right,
    }
}

/// Auto-repeat for the most recently pressed arrow key
#[derive(Debug, Clone)]
pub struct KeyRepeat {
    delay: Duration,
    rate: Duration,
    held: Option<Direction>,
    next_repeat: Option<Instant>,
}

impl KeyRepeat {
    pub fn new(delay: Duration, rate: Duration) -> Self {
        Self {
            delay,
            rate,
            held: None,
            next_repeat: None,
        }
    }

    pub fn press(&mut self, direction: Direction, now: Instant) {
        self.held = Some(direction);
        self.next_repeat = Some(now + self.delay);
    }

    pub fn held(&self) -> Option<Direction> {
        self.held
    }

    /// Returns the direction to repeat, if one is due. Releasing the key
    /// cancels repetition.
    pub fn poll(&mut self, still_down: bool, now: Instant) -> Option<Direction> {
        let held = self.held?;
        if !still_down {
            self.held = None;
            self.next_repeat = None;
            return None;
        }

        let due = self.next_repeat?;
        if now < due {
            return None;
        }

        self.next_repeat = Some(now + self.rate);
        Some(held)
    }
}

/// Collects keyboard events from macroquad once per frame
pub struct InputManager {
    repeat: KeyRepeat,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            repeat: KeyRepeat::new(REPEAT_DELAY, REPEAT_RATE),
        }
    }

    /// Returns this frame's events. Keys pressed within the same frame come
    /// in no particular order. A due key repeat follows them, then typed
    /// characters, then a quit request.
    pub fn update(&mut self) -> Vec<InputEvent> {
        let now = Instant::now();
        let mut events = Vec::new();

        for key in get_keys_pressed() {
            let event = match key {
                KeyCode::Enter | KeyCode::KpEnter => InputEvent::Enter,
                KeyCode::Backspace => InputEvent::Backspace,
                KeyCode::Escape => InputEvent::Quit,
                _ => {
                    let direction = direction_for_key(key);
                    if let Some(direction) = direction {
                        self.repeat.press(direction, now);
                    }
                    InputEvent::KeyDown(direction)
                }
            };
            events.push(event);
        }

        let still_down = self
            .repeat
            .held()
            .map(|direction| is_key_down(key_for_direction(direction)))
            .unwrap_or(false);
        if let Some(direction) = self.repeat.poll(still_down, now) {
            events.push(InputEvent::KeyDown(Some(direction)));
        }

        while let Some(c) = get_char_pressed() {
            if !c.is_control() {
                events.push(InputEvent::Char(c));
            }
        }

        if is_quit_requested() {
            events.push(InputEvent::Quit);
        }

        events
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
