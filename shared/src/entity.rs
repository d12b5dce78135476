//! Game objects and their per-kind behavior
//!
//! Every entity is a single struct whose `state` carries the data of its kind.
//! Behavior (`apply_input`, `tick`, collision rules) is dispatched with a
//! `match` on that state instead of trait objects.

use crate::geometry::{Polygon, Vector2};
use crate::protocol::PendingInput;
use crate::{
    EntityId, ENEMY_TICKS_PER_SEGMENT, ENTITY_SIZE, PLAYER_SPEED, SHOT_ALIVE_MS,
    SHOT_COOLDOWN_TICKS, SHOT_SPEED, WORLD_HEIGHT, WORLD_WIDTH,
};
use serde::{Deserialize, Serialize};

/// Waypoints of the opening swoop, relative to the spawn point
pub const SWOOP_PATH: [Vector2; 7] = [
    Vector2::new(0.0, 0.0),
    Vector2::new(0.0, 250.0),
    Vector2::new(150.0, 450.0),
    Vector2::new(300.0, 250.0),
    Vector2::new(150.0, 100.0),
    Vector2::new(0.0, 250.0),
    Vector2::new(150.0, 400.0),
];

/// Closed loop flown forever once the swoop ends, relative to its last waypoint
pub const SWADDLE_PATH: [Vector2; 4] = [
    Vector2::new(0.0, 0.0),
    Vector2::new(-75.0, 30.0),
    Vector2::new(0.0, 60.0),
    Vector2::new(75.0, 30.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Wall,
    Shot,
    SwoopingEnemy,
}

/// Reaction of an entity to one overlapping neighbour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionRule {
    Ignore,
    /// Move out of the other shape along the separation axis
    PushOut,
    DestroySelf,
    DamageOtherAndDestroySelf,
}

impl EntityKind {
    /// Rule applied when an entity of this kind overlaps one of `other`
    pub fn collision_rule(self, other: EntityKind) -> CollisionRule {
        match (self, other) {
            (EntityKind::Player, EntityKind::Wall) => CollisionRule::PushOut,
            (EntityKind::Shot, EntityKind::Wall) => CollisionRule::DestroySelf,
            (EntityKind::Shot, EntityKind::SwoopingEnemy) => {
                CollisionRule::DamageOtherAndDestroySelf
            }
            (EntityKind::Player, EntityKind::Player | EntityKind::Shot | EntityKind::SwoopingEnemy)
            | (EntityKind::Shot, EntityKind::Player | EntityKind::Shot)
            | (EntityKind::Wall | EntityKind::SwoopingEnemy, _) => CollisionRule::Ignore,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    /// Highest input sequence applied to this player; 0 means none yet
    pub last_processed_input: u32,
    /// Ticks left before the next shot is allowed
    pub shot_cooldown: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WallState {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShotState {
    pub alive_remaining_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwoopPhase {
    Path,
    Swaddle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyState {
    pub health: i32,
    pub phase: SwoopPhase,
    /// Index of the waypoint the current segment starts from
    pub segment: usize,
    /// Ticks spent on the current segment
    pub segment_tick: u32,
    pub start: Vector2,
    /// Origin of the swaddle loop, set when the swoop path ends
    pub anchor: Vector2,
}

impl EnemyState {
    fn segment_endpoints(&self) -> (Vector2, Vector2) {
        match self.phase {
            SwoopPhase::Path => (
                self.start.add(&SWOOP_PATH[self.segment]),
                self.start.add(&SWOOP_PATH[self.segment + 1]),
            ),
            SwoopPhase::Swaddle => (
                self.anchor.add(&SWADDLE_PATH[self.segment]),
                self.anchor
                    .add(&SWADDLE_PATH[(self.segment + 1) % SWADDLE_PATH.len()]),
            ),
        }
    }

    fn advance(&mut self) {
        self.segment_tick += 1;
        if self.segment_tick < ENEMY_TICKS_PER_SEGMENT {
            return;
        }
        self.segment_tick = 0;
        self.segment += 1;

        match self.phase {
            SwoopPhase::Path if self.segment >= SWOOP_PATH.len() - 1 => {
                self.phase = SwoopPhase::Swaddle;
                self.segment = 0;
                self.anchor = self.start.add(&SWOOP_PATH[SWOOP_PATH.len() - 1]);
            }
            SwoopPhase::Path => {}
            SwoopPhase::Swaddle => self.segment %= SWADDLE_PATH.len(),
        }
    }

    /// Position along the current segment for the current sub-tick progress
    pub fn position(&self) -> Vector2 {
        let (from, to) = self.segment_endpoints();
        let t = self.segment_tick as f64 / ENEMY_TICKS_PER_SEGMENT as f64;
        from.add(&to.sub(&from).scale(t))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityState {
    Player(PlayerState),
    Wall(WallState),
    Shot(ShotState),
    SwoopingEnemy(EnemyState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    pub shape: Polygon,
    pub marked_for_destruction: bool,
    pub state: EntityState,
}

impl Entity {
    fn with_state(id: EntityId, x: f64, y: f64, width: f64, height: f64, state: EntityState) -> Self {
        Self {
            id,
            x,
            y,
            shape: Polygon::rectangle(x, y, width, height),
            marked_for_destruction: false,
            state,
        }
    }

    pub fn player(id: EntityId, x: f64, y: f64) -> Self {
        Self::with_state(
            id,
            x,
            y,
            ENTITY_SIZE,
            ENTITY_SIZE,
            EntityState::Player(PlayerState {
                last_processed_input: 0,
                shot_cooldown: 0,
            }),
        )
    }

    pub fn wall(id: EntityId, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::with_state(id, x, y, width, height, EntityState::Wall(WallState { width, height }))
    }

    pub fn shot(id: EntityId, x: f64, y: f64) -> Self {
        Self::with_state(
            id,
            x,
            y,
            ENTITY_SIZE,
            ENTITY_SIZE,
            EntityState::Shot(ShotState {
                alive_remaining_ms: SHOT_ALIVE_MS,
            }),
        )
    }

    pub fn swooping_enemy(id: EntityId, x: f64, y: f64, health: i32) -> Self {
        let start = Vector2::new(x, y);
        Self::with_state(
            id,
            x,
            y,
            ENTITY_SIZE,
            ENTITY_SIZE,
            EntityState::SwoopingEnemy(EnemyState {
                health,
                phase: SwoopPhase::Path,
                segment: 0,
                segment_tick: 0,
                start,
                anchor: start,
            }),
        )
    }

    pub fn kind(&self) -> EntityKind {
        match self.state {
            EntityState::Player(_) => EntityKind::Player,
            EntityState::Wall(_) => EntityKind::Wall,
            EntityState::Shot(_) => EntityKind::Shot,
            EntityState::SwoopingEnemy(_) => EntityKind::SwoopingEnemy,
        }
    }

    /// Moves the entity and its collision shape together
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.update_position();
    }

    /// Re-syncs the shape after `x`/`y` were written directly
    pub fn update_position(&mut self) {
        self.shape.set_position(self.x, self.y);
    }

    pub fn mark_destroyed(&mut self) {
        self.marked_for_destruction = true;
    }

    /// Applies one input; returns where a shot should spawn if one was fired
    ///
    /// Only players react to input. Movement is per axis and unnormalized.
    pub fn apply_input(&mut self, input: &PendingInput) -> Option<Vector2> {
        let EntityState::Player(player) = &mut self.state else {
            return None;
        };

        let step = input.elapsed_seconds * PLAYER_SPEED;
        let axis = |negative: bool, positive: bool| {
            let mut delta = 0.0;
            if negative {
                delta -= step;
            }
            if positive {
                delta += step;
            }
            delta
        };
        let controls = &input.controls;
        let dx = axis(controls.left, controls.right);
        let dy = axis(controls.up, controls.down);

        player.last_processed_input = player.last_processed_input.max(input.sequence_number);

        let fired = if controls.fire && player.shot_cooldown == 0 {
            player.shot_cooldown = SHOT_COOLDOWN_TICKS;
            true
        } else {
            false
        };

        if dx != 0.0 || dy != 0.0 {
            self.set_position(self.x + dx, self.y + dy);
        }

        fired.then(|| Vector2::new(self.x, self.y))
    }

    /// Autonomous per-tick behavior
    pub fn tick(&mut self, duration_ms: f64) {
        match &mut self.state {
            EntityState::Player(player) => {
                player.shot_cooldown = player.shot_cooldown.saturating_sub(1);
            }
            EntityState::Wall(_) => {}
            EntityState::Shot(shot) => {
                shot.alive_remaining_ms -= duration_ms;
                let expired = shot.alive_remaining_ms <= 0.0;
                let y = self.y - SHOT_SPEED * duration_ms / 1000.0;
                self.set_position(self.x, y);
                if expired || self.out_of_bounds() {
                    self.marked_for_destruction = true;
                }
            }
            EntityState::SwoopingEnemy(enemy) => {
                if enemy.health <= 0 {
                    self.marked_for_destruction = true;
                    return;
                }
                enemy.advance();
                let position = enemy.position();
                self.set_position(position.x, position.y);
            }
        }
    }

    fn out_of_bounds(&self) -> bool {
        self.x < -ENTITY_SIZE
            || self.x > WORLD_WIDTH + ENTITY_SIZE
            || self.y < -ENTITY_SIZE
            || self.y > WORLD_HEIGHT + ENTITY_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Controls;
    use assert_approx_eq::assert_approx_eq;

    fn input(sequence_number: u32, controls: Controls, elapsed_seconds: f64) -> PendingInput {
        PendingInput {
            sequence_number,
            controls,
            elapsed_seconds,
        }
    }

    #[test]
    fn test_player_moves_per_axis() {
        let mut player = Entity::player("p".into(), 100.0, 100.0);
        let controls = Controls {
            right: true,
            up: true,
            ..Controls::default()
        };

        let fired = player.apply_input(&input(1, controls, 0.1));

        assert!(fired.is_none());
        assert_approx_eq!(player.x, 120.0, 1e-9);
        assert_approx_eq!(player.y, 80.0, 1e-9);
        assert_approx_eq!(player.shape.x, 120.0, 1e-9);
        assert_approx_eq!(player.shape.y, 80.0, 1e-9);
    }

    #[test]
    fn test_opposite_directions_cancel() {
        let mut player = Entity::player("p".into(), 0.0, 0.0);
        let controls = Controls {
            left: true,
            right: true,
            ..Controls::default()
        };
        player.apply_input(&input(1, controls, 0.5));
        assert_eq!(player.x, 0.0);
    }

    #[test]
    fn test_input_records_sequence() {
        let mut player = Entity::player("p".into(), 0.0, 0.0);
        player.apply_input(&input(7, Controls::default(), 0.1));
        player.apply_input(&input(3, Controls::default(), 0.1));

        match &player.state {
            EntityState::Player(state) => assert_eq!(state.last_processed_input, 7),
            _ => panic!("Expected player state"),
        }
    }

    #[test]
    fn test_fire_respects_tick_cooldown() {
        let mut player = Entity::player("p".into(), 10.0, 20.0);
        let fire = Controls {
            fire: true,
            ..Controls::default()
        };

        let first = player.apply_input(&input(1, fire, 0.016));
        assert_eq!(first, Some(Vector2::new(10.0, 20.0)));
        assert!(player.apply_input(&input(2, fire, 0.016)).is_none());

        // Cooldown is counted in ticks, whatever their duration
        for _ in 0..SHOT_COOLDOWN_TICKS {
            player.tick(1.0);
        }
        assert!(player.apply_input(&input(3, fire, 0.016)).is_some());
    }

    #[test]
    fn test_non_players_ignore_input() {
        let mut wall = Entity::wall("w".into(), 0.0, 0.0, 100.0, 100.0);
        let controls = Controls {
            left: true,
            fire: true,
            ..Controls::default()
        };
        assert!(wall.apply_input(&input(1, controls, 1.0)).is_none());
        assert_eq!(wall.x, 0.0);
    }

    #[test]
    fn test_shot_moves_up_and_expires() {
        let mut shot = Entity::shot("s".into(), 500.0, 990.0);
        for i in 1..=5 {
            shot.tick(500.0);
            assert!(!shot.marked_for_destruction, "destroyed early on tick {}", i);
        }
        shot.tick(500.0);
        assert!(shot.marked_for_destruction);
        assert_approx_eq!(shot.y, 990.0 - SHOT_SPEED * 3.0, 1e-9);
    }

    #[test]
    fn test_shot_destroyed_when_leaving_bounds() {
        let mut shot = Entity::shot("s".into(), 500.0, 0.0);
        shot.tick(200.0);
        assert!(shot.marked_for_destruction);
    }

    #[test]
    fn test_enemy_follows_path_segments() {
        let mut enemy = Entity::swooping_enemy("e".into(), 100.0, -100.0, 10);

        for _ in 0..ENEMY_TICKS_PER_SEGMENT / 2 {
            enemy.tick(100.0);
        }
        // Half way between the first two waypoints
        assert_approx_eq!(enemy.x, 100.0, 1e-9);
        assert_approx_eq!(enemy.y, -100.0 + 125.0, 1e-9);

        for _ in 0..ENEMY_TICKS_PER_SEGMENT / 2 {
            enemy.tick(100.0);
        }
        assert_approx_eq!(enemy.y, 150.0, 1e-9);
    }

    #[test]
    fn test_enemy_switches_to_swaddle_loop() {
        let mut enemy = Entity::swooping_enemy("e".into(), 0.0, 0.0, 10);
        let path_ticks = (SWOOP_PATH.len() as u32 - 1) * ENEMY_TICKS_PER_SEGMENT;
        for _ in 0..path_ticks {
            enemy.tick(100.0);
        }

        let anchor = SWOOP_PATH[SWOOP_PATH.len() - 1];
        match &enemy.state {
            EntityState::SwoopingEnemy(state) => {
                assert_eq!(state.phase, SwoopPhase::Swaddle);
                assert_eq!(state.anchor, anchor);
            }
            _ => panic!("Expected enemy state"),
        }
        assert_approx_eq!(enemy.x, anchor.x, 1e-9);
        assert_approx_eq!(enemy.y, anchor.y, 1e-9);

        // A full loop comes back to the anchor
        for _ in 0..SWADDLE_PATH.len() as u32 * ENEMY_TICKS_PER_SEGMENT {
            enemy.tick(100.0);
        }
        assert_approx_eq!(enemy.x, anchor.x, 1e-9);
        assert_approx_eq!(enemy.y, anchor.y, 1e-9);
    }

    #[test]
    fn test_enemy_destroyed_without_health() {
        let mut enemy = Entity::swooping_enemy("e".into(), 0.0, 0.0, 0);
        enemy.tick(100.0);
        assert!(enemy.marked_for_destruction);
    }

    #[test]
    fn test_collision_rules() {
        use EntityKind::*;
        assert_eq!(Player.collision_rule(Wall), CollisionRule::PushOut);
        assert_eq!(Shot.collision_rule(Wall), CollisionRule::DestroySelf);
        assert_eq!(
            Shot.collision_rule(SwoopingEnemy),
            CollisionRule::DamageOtherAndDestroySelf
        );
        assert_eq!(Player.collision_rule(Player), CollisionRule::Ignore);
        assert_eq!(Player.collision_rule(Shot), CollisionRule::Ignore);
        assert_eq!(Wall.collision_rule(Player), CollisionRule::Ignore);
        assert_eq!(SwoopingEnemy.collision_rule(Shot), CollisionRule::Ignore);
    }
}
