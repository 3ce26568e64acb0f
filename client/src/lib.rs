//! # MultiPac Client Library
//!
//! Client side of a small multiplayer Pac-Man game. Players steer their
//! avatar with the arrow keys, eat dots scattered between fixed walls and see
//! the other players as the server broadcasts them.
//!
//! ## Architecture Overview
//!
//! ### Optimistic Local State
//! Moves and dot pickups are applied to the local registry immediately and
//! published to the server. Nothing is reconciled afterwards: the next
//! snapshot from the server simply replaces the registry.
//!
//! ### Fixed-Interval Redraw
//! A redraw timer fires every 500 / 60 ms. Each tick composes a [`rendering::Frame`]
//! from the game state and applies obstacle collision correction to every
//! player. The window shows the latest frame until the next tick.
//!
//! ### Non-Blocking I/O
//! The UDP transport and avatar image loads run on a tokio runtime. The frame
//! loop only polls channels, so it never waits on the network or the disk.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The [`game::GameClient`] context owning the player registry, remaining
//! dots and image cache, plus the redraw timer.
//!
//! ### Dots Module (`dots`)
//! Rejection-sampled dot placement with a bounded number of attempts.
//!
//! ### Input Module (`input`)
//! Key-down events, arrow key repeat and typed characters.
//!
//! ### Lobby Module (`lobby`)
//! Game id entry, create / join requests and the "game created" notice.
//!
//! ### Network Module (`network`)
//! The transport bridge between the frame loop and the UDP socket task.
//!
//! ### Images Module (`images`)
//! Lazily loaded avatar images keyed by URL.
//!
//! ### Rendering Module (`rendering`)
//! Draw commands and the macroquad renderer that executes them.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::GameClient;
//! use client::images::{FileImageLoader, ImageCache};
//! use rand::thread_rng;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = tokio::runtime::Runtime::new()?;
//! let config = client::dots::DotFieldConfig::new(
//!     shared::DOT_COUNT,
//!     shared::CANVAS_WIDTH,
//!     shared::CANVAS_HEIGHT,
//! );
//! let dots = client::dots::generate_dots(&mut thread_rng(), &config, &shared::obstacles())?;
//! let images = ImageCache::new(Box::new(FileImageLoader::new(runtime.handle().clone())));
//! let mut game = GameClient::new(dots, shared::obstacles(), images);
//!
//! // One redraw worth of state, ready for the renderer.
//! let frame = game.tick();
//! assert!(!frame.commands.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod dots;
pub mod game;
pub mod images;
pub mod input;
pub mod lobby;
pub mod network;
pub mod rendering;
