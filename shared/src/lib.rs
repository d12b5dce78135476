//! # Shared Game Model
//!
//! Everything the server and the client must agree on bit for bit: the entity
//! model, the collision system, the simulation rules, the wire protocol and
//! the tick timing helpers. Both ends run the same [`world::World`] code so a
//! prediction made on the client matches the authoritative result as long as
//! the same inputs are applied.
//!
//! ## Modules
//!
//! - `geometry`: vectors, convex polygons and the SAT narrow phase
//! - `spatial`: uniform-grid broad phase keyed by entity id
//! - `entity`: entity kinds, per-kind state and behavior
//! - `world`: the entity arena and the per-tick step
//! - `protocol`: client/server messages and snapshots
//! - `codec`: length-prefixed bincode framing for async streams
//! - `clock` / `schedule`: injectable time and the fixed-rate tick scheduler

pub mod clock;
pub mod codec;
pub mod entity;
pub mod geometry;
pub mod protocol;
pub mod schedule;
pub mod spatial;
pub mod world;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::{CollisionRule, Entity, EntityKind, EntityState};
pub use geometry::{Aabb, CollisionResult, Polygon, Vector2};
pub use protocol::{ClientMessage, Controls, EntitySnapshot, KindState, PendingInput, ServerMessage};
pub use schedule::{TickScheduler, TickStart};
pub use world::World;

/// Server-assigned entity identifier
pub type EntityId = String;
/// Server-assigned connection identifier
pub type ConnectionId = String;

pub const PLAYER_SPEED: f64 = 200.0;
pub const ENTITY_SIZE: f64 = 30.0;
pub const SHOT_SPEED: f64 = 300.0;
pub const SHOT_ALIVE_MS: f64 = 3000.0;
pub const SHOT_COOLDOWN_TICKS: u32 = 5;
pub const WORLD_WIDTH: f64 = 1000.0;
pub const WORLD_HEIGHT: f64 = 1000.0;

pub const ENEMY_TICKS_PER_SEGMENT: u32 = 10;
pub const ENEMY_START_HEALTH: i32 = 10;

pub const SERVER_TICK_MS: u64 = 100;
pub const DRAIN_BUDGET_MS: u64 = 500;
pub const WAVE_INTERVAL_TICKS: u64 = 50;
pub const WAVE_SIZE: usize = 3;
pub const WAVE_SPAWN_Y: f64 = -100.0;

pub const WALL_X: f64 = 50.0;
pub const WALL_Y: f64 = 50.0;
pub const WALL_WIDTH: f64 = 100.0;
pub const WALL_HEIGHT: f64 = 1000.0;

/// Player spawn area, `(min, max)` per axis
pub const SPAWN_X_RANGE: (f64, f64) = (200.0, 900.0);
pub const SPAWN_Y_RANGE: (f64, f64) = (100.0, 900.0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_area_is_clear_of_initial_wall() {
        let wall = Polygon::rectangle(WALL_X, WALL_Y, WALL_WIDTH, WALL_HEIGHT).aabb();
        let leftmost_player = Polygon::rectangle(SPAWN_X_RANGE.0, SPAWN_Y_RANGE.0, ENTITY_SIZE, ENTITY_SIZE).aabb();
        assert!(!wall.intersects(&leftmost_player));
    }

    #[test]
    fn test_spawn_area_inside_world() {
        assert!(SPAWN_X_RANGE.0 >= 0.0 && SPAWN_X_RANGE.1 <= WORLD_WIDTH);
        assert!(SPAWN_Y_RANGE.0 >= 0.0 && SPAWN_Y_RANGE.1 <= WORLD_HEIGHT);
    }

    #[test]
    fn test_shot_outlives_its_cooldown() {
        let cooldown_ms = SHOT_COOLDOWN_TICKS as f64 * SERVER_TICK_MS as f64;
        assert!(SHOT_ALIVE_MS > cooldown_ms);
    }
}
