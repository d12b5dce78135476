//! Uniform-grid broad phase keyed by entity id
//!
//! The index never owns shapes. It keeps the last known bounds of every
//! registered body and a grid of cells that is rebuilt by [`SpatialIndex::update`].
//! Candidate lists are returned in id order so collision resolution is
//! deterministic regardless of insertion order.

use crate::geometry::{Aabb, Polygon};
use crate::EntityId;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const DEFAULT_CELL_SIZE: f64 = 100.0;

type Cell = (i64, i64);

pub struct SpatialIndex {
    cell_size: f64,
    bodies: BTreeMap<EntityId, Aabb>,
    cells: HashMap<Cell, Vec<EntityId>>,
}

impl SpatialIndex {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            bodies: BTreeMap::new(),
            cells: HashMap::new(),
        }
    }

    /// Registers a body, replacing any previous registration under the same id
    pub fn insert(&mut self, id: &str, shape: &Polygon) {
        if self.bodies.contains_key(id) {
            self.remove(id);
        }
        let bounds = shape.aabb();
        for cell in self.covered_cells(&bounds) {
            self.cells.entry(cell).or_default().push(id.to_string());
        }
        self.bodies.insert(id.to_string(), bounds);
    }

    /// Unregisters a body. Returns false if it was not present.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.bodies.remove(id).is_none() {
            return false;
        }
        self.cells.retain(|_, ids| {
            ids.retain(|other| other.as_str() != id);
            !ids.is_empty()
        });
        true
    }

    /// Records the new bounds of a moved body; the grid catches up on `update`
    pub fn refresh(&mut self, id: &str, shape: &Polygon) {
        if let Some(bounds) = self.bodies.get_mut(id) {
            *bounds = shape.aabb();
        }
    }

    /// Rebuilds the grid from the current bounds of every body
    pub fn update(&mut self) {
        self.cells.clear();
        let cell_size = self.cell_size;
        for (id, bounds) in &self.bodies {
            for cell in Self::cells_for(cell_size, bounds) {
                self.cells.entry(cell).or_default().push(id.clone());
            }
        }
    }

    /// Ids whose bounds overlap the given body's bounds, sorted, excluding itself
    pub fn potentials(&self, id: &str) -> Vec<EntityId> {
        let Some(bounds) = self.bodies.get(id) else {
            return Vec::new();
        };

        let mut found = BTreeSet::new();
        for cell in self.covered_cells(bounds) {
            if let Some(ids) = self.cells.get(&cell) {
                for other in ids {
                    if other.as_str() == id {
                        continue;
                    }
                    let overlaps = self
                        .bodies
                        .get(other)
                        .is_some_and(|other_bounds| bounds.intersects(other_bounds));
                    if overlaps {
                        found.insert(other.clone());
                    }
                }
            }
        }
        found.into_iter().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.bodies.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.cells.clear();
    }

    fn covered_cells(&self, bounds: &Aabb) -> Vec<Cell> {
        Self::cells_for(self.cell_size, bounds)
    }

    fn cells_for(cell_size: f64, bounds: &Aabb) -> Vec<Cell> {
        let min_cx = (bounds.min_x / cell_size).floor() as i64;
        let max_cx = (bounds.max_x / cell_size).floor() as i64;
        let min_cy = (bounds.min_y / cell_size).floor() as i64;
        let max_cy = (bounds.max_y / cell_size).floor() as i64;

        let mut cells = Vec::new();
        for cx in min_cx..=max_cx {
            for cy in min_cy..=max_cy {
                cells.push((cx, cy));
            }
        }
        cells
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EntityId {
        s.to_string()
    }

    #[test]
    fn test_insert_and_potentials() {
        let mut index = SpatialIndex::default();
        index.insert(&id("a"), &Polygon::rectangle(0.0, 0.0, 30.0, 30.0));
        index.insert(&id("b"), &Polygon::rectangle(20.0, 0.0, 30.0, 30.0));
        index.insert(&id("c"), &Polygon::rectangle(500.0, 500.0, 30.0, 30.0));

        assert_eq!(index.len(), 3);
        assert_eq!(index.potentials(&id("a")), vec![id("b")]);
        assert_eq!(index.potentials(&id("b")), vec![id("a")]);
        assert!(index.potentials(&id("c")).is_empty());
    }

    #[test]
    fn test_potentials_are_sorted_by_id() {
        let mut index = SpatialIndex::default();
        index.insert(&id("m"), &Polygon::rectangle(0.0, 0.0, 30.0, 30.0));
        index.insert(&id("z"), &Polygon::rectangle(5.0, 0.0, 30.0, 30.0));
        index.insert(&id("b"), &Polygon::rectangle(-5.0, 0.0, 30.0, 30.0));

        assert_eq!(index.potentials(&id("m")), vec![id("b"), id("z")]);
    }

    #[test]
    fn test_remove_excludes_body_from_queries() {
        let mut index = SpatialIndex::default();
        index.insert(&id("a"), &Polygon::rectangle(0.0, 0.0, 30.0, 30.0));
        index.insert(&id("b"), &Polygon::rectangle(10.0, 0.0, 30.0, 30.0));

        assert!(index.remove(&id("b")));
        assert!(!index.remove(&id("b")));
        assert!(index.potentials(&id("a")).is_empty());
        assert!(!index.contains(&id("b")));
    }

    #[test]
    fn test_reinsert_keeps_single_entry() {
        let mut index = SpatialIndex::default();
        let shape = Polygon::rectangle(0.0, 0.0, 30.0, 30.0);
        index.insert(&id("a"), &shape);
        index.insert(&id("a"), &shape);
        index.insert(&id("b"), &Polygon::rectangle(10.0, 0.0, 30.0, 30.0));

        assert_eq!(index.len(), 2);
        assert_eq!(index.potentials(&id("b")), vec![id("a")]);
    }

    #[test]
    fn test_refresh_then_update_moves_body() {
        let mut index = SpatialIndex::default();
        let mut moving = Polygon::rectangle(0.0, 0.0, 30.0, 30.0);
        index.insert(&id("mover"), &moving);
        index.insert(&id("target"), &Polygon::rectangle(400.0, 400.0, 30.0, 30.0));
        assert!(index.potentials(&id("target")).is_empty());

        moving.set_position(410.0, 400.0);
        index.refresh(&id("mover"), &moving);
        index.update();

        assert_eq!(index.potentials(&id("target")), vec![id("mover")]);
        assert_eq!(index.potentials(&id("mover")), vec![id("target")]);
    }

    #[test]
    fn test_large_body_spans_many_cells() {
        let mut index = SpatialIndex::new(50.0);
        index.insert(&id("wall"), &Polygon::rectangle(50.0, 50.0, 100.0, 1000.0));
        index.insert(&id("p"), &Polygon::rectangle(90.0, 400.0, 30.0, 30.0));

        assert_eq!(index.potentials(&id("p")), vec![id("wall")]);
    }

    #[test]
    fn test_unknown_id_has_no_potentials() {
        let index = SpatialIndex::default();
        assert!(index.potentials(&id("ghost")).is_empty());
        assert!(index.is_empty());
    }
}
