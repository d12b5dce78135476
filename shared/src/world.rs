//! Simulation core shared by the authoritative server and client prediction
//!
//! Entities live in an arena keyed by id; the spatial index only stores ids.
//! Iteration is in id order, which makes collision resolution deterministic.

use crate::entity::{CollisionRule, Entity, EntityState};
use crate::geometry::{CollisionResult, Vector2};
use crate::protocol::PendingInput;
use crate::spatial::SpatialIndex;
use crate::EntityId;
use log::debug;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    index: SpatialIndex,
    result: CollisionResult,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity and registers its shape, replacing any entity with the same id
    ///
    /// Entities that arrive already marked for destruction are stored but never indexed.
    pub fn spawn(&mut self, entity: Entity) {
        if entity.marked_for_destruction {
            self.index.remove(&entity.id);
        } else {
            self.index.insert(&entity.id, &entity.shape);
        }
        self.entities.insert(entity.id.clone(), entity);
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Mutable access for state that does not affect the shape
    ///
    /// Position changes must go through [`World::set_position`] so the index
    /// stays in sync.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.index.clear();
    }

    /// Moves an entity and refreshes its broad-phase bounds
    pub fn set_position(&mut self, id: &str, x: f64, y: f64) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        entity.set_position(x, y);
        if !entity.marked_for_destruction {
            self.index.refresh(&entity.id, &entity.shape);
        }
        true
    }

    /// Removes an entity immediately, shape included
    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        let entity = self.entities.remove(id)?;
        self.index.remove(id);
        Some(entity)
    }

    /// Flags an entity for removal at the end of the tick and drops its shape now
    pub fn destroy(&mut self, id: &str) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        entity.mark_destroyed();
        self.index.remove(id);
        true
    }

    /// Applies one input to an entity; returns the spawn point of a fired shot
    ///
    /// Unknown ids are ignored: an input can legitimately race a disconnect.
    pub fn apply_input(&mut self, id: &str, input: &PendingInput) -> Option<Vector2> {
        let entity = self.entities.get_mut(id)?;
        let fired = entity.apply_input(input);
        if !entity.marked_for_destruction {
            self.index.refresh(&entity.id, &entity.shape);
        }
        fired
    }

    pub fn tick_entity(&mut self, id: &str, duration_ms: f64) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.tick(duration_ms);
            if entity.marked_for_destruction {
                self.index.remove(id);
            } else {
                self.index.refresh(&entity.id, &entity.shape);
            }
        }
    }

    /// Runs the autonomous behavior of every entity
    pub fn tick_all(&mut self, duration_ms: f64) {
        for entity in self.entities.values_mut() {
            entity.tick(duration_ms);
            if entity.marked_for_destruction {
                self.index.remove(&entity.id);
            } else {
                self.index.refresh(&entity.id, &entity.shape);
            }
        }
    }

    /// Broad and narrow phase for every entity, in id order
    pub fn check_collisions(&mut self) {
        self.index.update();
        for id in self.ids() {
            self.resolve_entity(&id);
        }
    }

    /// Collision pass for a single entity, used by client prediction
    pub fn resolve_collisions_for(&mut self, id: &str) -> bool {
        self.index.update();
        self.resolve_entity(id)
    }

    /// Ids the broad phase currently reports near `id`
    pub fn potentials(&self, id: &str) -> Vec<EntityId> {
        self.index.potentials(id)
    }

    /// Resolves the first overlapping neighbour with a non-trivial rule
    ///
    /// An entity reacts to at most one collision per pass. With several
    /// simultaneous overlaps the lowest neighbour id wins.
    fn resolve_entity(&mut self, id: &str) -> bool {
        let kind = match self.entities.get(id) {
            Some(entity) if !entity.marked_for_destruction => entity.kind(),
            _ => return false,
        };

        for other_id in self.index.potentials(id) {
            let rule = match self.entities.get(&other_id) {
                Some(other) if !other.marked_for_destruction => {
                    kind.collision_rule(other.kind())
                }
                _ => continue,
            };
            if rule == CollisionRule::Ignore {
                continue;
            }

            let collided = match (self.entities.get(id), self.entities.get(&other_id)) {
                (Some(entity), Some(other)) => entity.shape.collides(&other.shape, &mut self.result),
                _ => false,
            };
            if !collided {
                continue;
            }

            match rule {
                CollisionRule::Ignore => continue,
                CollisionRule::PushOut => {
                    let shift = self.result.separation();
                    if let Some(entity) = self.entities.get(id) {
                        let (x, y) = (entity.x + shift.x, entity.y + shift.y);
                        self.set_position(id, x, y);
                    }
                }
                CollisionRule::DestroySelf => {
                    self.destroy(id);
                }
                CollisionRule::DamageOtherAndDestroySelf => {
                    if let Some(EntityState::SwoopingEnemy(enemy)) =
                        self.entities.get_mut(&other_id).map(|e| &mut e.state)
                    {
                        enemy.health -= 1;
                    }
                    self.destroy(id);
                }
            }
            return true;
        }
        false
    }

    /// Drops every entity flagged for destruction; returns their ids
    pub fn purge_destroyed(&mut self) -> Vec<EntityId> {
        let doomed: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| e.marked_for_destruction)
            .map(|e| e.id.clone())
            .collect();

        for id in &doomed {
            self.entities.remove(id);
            self.index.remove(id);
        }
        if !doomed.is_empty() {
            debug!("Purged {} destroyed entities", doomed.len());
        }
        doomed
    }

    /// One full simulation step: inputs, autonomous ticks, collisions, purge
    ///
    /// Returns the spawn points of shots fired by the inputs; creating those
    /// shots needs fresh ids and is left to the caller.
    pub fn step(&mut self, inputs: &[(EntityId, PendingInput)], duration_ms: f64) -> Vec<Vector2> {
        let fired = inputs
            .iter()
            .filter_map(|(id, input)| self.apply_input(id, input))
            .collect();
        self.tick_all(duration_ms);
        self.check_collisions();
        self.purge_destroyed();
        fired
    }

    /// True when every live entity is indexed exactly once and nothing else is
    pub fn is_consistent(&self) -> bool {
        let live = self
            .entities
            .values()
            .filter(|e| !e.marked_for_destruction)
            .count();
        live == self.index.len()
            && self
                .entities
                .values()
                .all(|e| e.marked_for_destruction != self.index.contains(&e.id))
    }
}
