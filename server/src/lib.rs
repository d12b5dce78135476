//! # Game Server Library
//!
//! The authoritative side of the arcade game. It owns the canonical world,
//! ingests client input at whatever rate it arrives, advances the simulation
//! on a fixed tick and tells every joined client what the world looks like.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server runs the same [`shared::World`] rules the clients use for
//! prediction. Whatever it decides is final; clients conform to it through
//! reconciliation.
//!
//! ### Input Ingestion
//! Client messages are queued as they arrive and drained at the start of the
//! next tick in arrival order. Draining stops once the per-tick budget is
//! spent and the rest waits for the following tick, so a burst is deferred
//! but never dropped or applied twice.
//!
//! ### State Broadcasting
//! Every tick ends with a `WorldState` snapshot sent to all joined
//! connections. Entities created during the tick (shots, enemy waves) are
//! also announced individually with `CreateEntity`.
//!
//! ## Architecture Design
//!
//! ### Single Simulation Task
//! Transport tasks only forward events over a channel. The game loop owns
//! the game state outright, so ticks and event handling never race.
//!
//! ### Self-Rescheduling Tick
//! Each tick measures the real time since the previous one and schedules the
//! next after `max(1, interval - processing time)`. A panic inside a tick is
//! caught and logged and the loop keeps going.
//!
//! ## Module Organization
//!
//! - `client_manager`: joined connections and the avatar each one controls
//! - `config`: runtime knobs
//! - `game`: the per-tick procedure over the authoritative world
//! - `network`: TCP transport tasks and the game loop
//! - `utils`: id and spawn helpers
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod game;
pub mod network;
pub mod utils;
