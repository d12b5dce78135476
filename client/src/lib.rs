//! # Game Client Library
//!
//! The predicting side of the arcade game. A client mirrors the server's
//! world, applies its own input the moment it is sampled and quietly corrects
//! itself when the authoritative state arrives.
//!
//! ## Architecture Overview
//!
//! ### Client-Side Prediction
//! Every game tick with a control held produces a sequenced input. The input
//! is applied to the local avatar right away, kept in a pending list and sent
//! to the server.
//!
//! ### Server Reconciliation
//! Each `WorldState` carries the last input sequence the server processed
//! for every player. The avatar is set to the authoritative position, inputs
//! up to that sequence are discarded and the rest are replayed. As long as
//! both ends ran the same inputs, the avatar does not move visibly.
//!
//! ### Entity Interpolation
//! Everything except the avatar is drawn one server tick in the past,
//! linearly interpolated between the two snapshots around that time.
//!
//! ## Module Organization
//!
//! - `game`: the client world and the message handling state machine
//! - `input`: held controls and input sequencing
//! - `prediction`: unacknowledged inputs
//! - `interpolation`: per-entity position buffers
//! - `network`: TCP session, render and game timers
//!
//! ## Usage Example
//!
//! ```rust
//! use client::game::ClientGame;
//! use shared::ServerMessage;
//!
//! let mut game = ClientGame::new();
//! game.on_open();
//! assert_eq!(game.take_outbox().len(), 1);
//!
//! game.process_messages(
//!     vec![ServerMessage::Joined {
//!         client_id: "c1".into(),
//!         entity_id: "me".into(),
//!         x: 400.0,
//!         y: 300.0,
//!     }],
//!     0,
//! );
//!
//! game.input_mut().press_right();
//! game.game_tick(100.0);
//! assert_eq!(game.local_entity().unwrap().x, 420.0);
//! ```

pub mod game;
pub mod input;
pub mod interpolation;
pub mod network;
pub mod prediction;
