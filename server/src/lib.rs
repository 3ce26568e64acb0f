//! # MultiPac Relay Server
//!
//! Hosts the rooms MultiPac clients play in. The server does not simulate the
//! game: each client reports its own avatar and the server relays the room's
//! player set to everyone in it.
//!
//! ## Responsibilities
//!
//! ### Connections
//! Clients say `Connect` and get an id back, or `Disconnected` when the server
//! is full. Any packet counts as a sign of life; clients send heartbeats so
//! that idle players are not timed out.
//!
//! ### Rooms
//! `CreateGame` opens a room under a random six character id that the creator
//! shares with friends, who then send `JoinGame`. Each member is spawned at one
//! of two fixed points. An empty room is closed.
//!
//! ### Relaying
//! `PlayerMove` replaces the sender's entry in its room as-is. Once per tick
//! every room that changed is sent to its members as `UpdateGame`.
//!
//! ## Module Organization
//!
//! - `client_manager`: ids, addresses, capacity and timeouts
//! - `game`: rooms, membership and spawn points
//! - `network`: UDP tasks and the main loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1:8080", Duration::from_millis(16), 32).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod network;
