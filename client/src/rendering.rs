use crate::images::ImageCache;
use macroquad::prelude::*;
use std::collections::HashMap;
use std::f32::consts::PI;

pub const GAME_OVER_FONT_SIZE: f32 = 30.0;
const PACMAN_SEGMENTS: usize = 32;

/// A single drawing operation in canvas coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Dot {
        x: f32,
        y: f32,
        radius: f32,
    },
    /// Default avatar: a wedge with the mouth facing right.
    Pacman {
        x: f32,
        y: f32,
        radius: f32,
    },
    /// Cached avatar image with its top-left corner at (x, y).
    Image {
        url: String,
        x: f32,
        y: f32,
        size: f32,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: String,
    },
    /// White text centered on x, with y as the baseline.
    Text {
        text: String,
        x: f32,
        y: f32,
        font_size: f32,
    },
}

/// Everything drawn by one redraw, in order. The canvas is cleared first.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: f32,
    pub height: f32,
    pub commands: Vec<DrawCommand>,
}

impl Frame {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn push_text(&mut self, text: impl Into<String>, y: f32, font_size: f32) {
        self.push(DrawCommand::Text {
            text: text.into(),
            x: self.width / 2.0,
            y,
            font_size,
        });
    }

    pub fn push_game_over(&mut self, collected: usize) {
        let middle = self.height / 2.0;
        self.push_text("Game Over", middle - 30.0, GAME_OVER_FONT_SIZE);
        self.push_text(
            format!("Total Dots Collected: {}", collected),
            middle + 10.0,
            GAME_OVER_FONT_SIZE,
        );
    }
}

/// Maps an obstacle colour name to a macroquad colour. Unknown names are red.
pub fn color_from_name(name: &str) -> Color {
    match name.to_ascii_lowercase().as_str() {
        "red" => RED,
        "yellow" => YELLOW,
        "white" => WHITE,
        "black" => BLACK,
        "blue" => BLUE,
        "green" => GREEN,
        "orange" => ORANGE,
        "purple" => PURPLE,
        "pink" => PINK,
        "magenta" => MAGENTA,
        "gray" | "grey" => GRAY,
        _ => RED,
    }
}

/// Outline of the default avatar, from 0.2 pi to 1.8 pi around (x, y).
pub fn pacman_outline(x: f32, y: f32, radius: f32) -> Vec<Vec2> {
    let start = 0.2 * PI;
    let end = 1.8 * PI;
    (0..=PACMAN_SEGMENTS)
        .map(|i| {
            let angle = start + (end - start) * i as f32 / PACMAN_SEGMENTS as f32;
            vec2(x + radius * angle.cos(), y + radius * angle.sin())
        })
        .collect()
}

pub struct Renderer {
    textures: HashMap<String, Texture2D>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            textures: HashMap::new(),
        }
    }

    pub fn render(&mut self, frame: &Frame, images: &ImageCache) {
        clear_background(BLACK);

        for command in &frame.commands {
            match command {
                DrawCommand::Dot { x, y, radius } => draw_circle(*x, *y, *radius, WHITE),
                DrawCommand::Pacman { x, y, radius } => self.draw_pacman(*x, *y, *radius),
                DrawCommand::Image { url, x, y, size } => {
                    self.draw_image(url, *x, *y, *size, images)
                }
                DrawCommand::Rect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => draw_rectangle(*x, *y, *width, *height, color_from_name(color)),
                DrawCommand::Text {
                    text,
                    x,
                    y,
                    font_size,
                } => self.draw_centered_text(text, *x, *y, *font_size),
            }
        }
    }

    fn draw_pacman(&mut self, x: f32, y: f32, radius: f32) {
        let center = vec2(x, y);
        let outline = pacman_outline(x, y, radius);
        for edge in outline.windows(2) {
            draw_triangle(center, edge[0], edge[1], YELLOW);
        }
    }

    fn draw_image(&mut self, url: &str, x: f32, y: f32, size: f32, images: &ImageCache) {
        if !self.textures.contains_key(url) {
            let Some(image) = images.get(url) else {
                return;
            };
            self.textures
                .insert(url.to_string(), Texture2D::from_image(image));
        }

        if let Some(texture) = self.textures.get(url) {
            draw_texture_ex(
                texture,
                x,
                y,
                WHITE,
                DrawTextureParams {
                    dest_size: Some(vec2(size, size)),
                    ..Default::default()
                },
            );
        }
    }

    fn draw_centered_text(&mut self, text: &str, x: f32, y: f32, font_size: f32) {
        let dimensions = measure_text(text, None, font_size as u16, 1.0);
        draw_text(text, x - dimensions.width / 2.0, y, font_size, WHITE);
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
