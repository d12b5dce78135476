//! Convex polygon shapes and separating-axis overlap tests

use serde::{Deserialize, Serialize};

///Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vector2 {
    ///Value along the x-axis.
    /// Positive direction is to the right.
    pub x: f64,
    ///Value along the y-axis.
    /// Positive direction is down, matching screen space.
    pub y: f64,
}

impl Vector2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    ///Returns the normalized vector.
    pub fn normalize(&self) -> Vector2 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vector2::default()
        } else {
            Vector2 {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f64) -> Vector2 {
        Vector2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    pub fn sub(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    pub fn dot(&self, other: &Vector2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    ///Returns the vector rotated a quarter turn, used for edge normals.
    pub fn perpendicular(&self) -> Vector2 {
        Vector2 {
            x: self.y,
            y: -self.x,
        }
    }
}

/// Axis-aligned bounds used by the broad phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Aabb {
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

/// Outcome of a narrow-phase test, reused between tests to avoid reallocation
///
/// `overlap` is the penetration depth along the unit `axis`, which points from
/// the tested shape towards the other one. Moving the tested shape by
/// `-overlap * axis` separates the pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionResult {
    pub collision: bool,
    pub overlap: f64,
    pub axis: Vector2,
}

impl CollisionResult {
    pub fn clear(&mut self) {
        *self = CollisionResult::default();
    }

    /// Translation that moves the tested shape out of the other one
    pub fn separation(&self) -> Vector2 {
        self.axis.scale(-self.overlap)
    }
}

/// Convex polygon positioned in world space
///
/// Vertices are stored relative to the polygon position and the world-space
/// copy is rebuilt whenever the position changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub x: f64,
    pub y: f64,
    points: Vec<Vector2>,
    calc_points: Vec<Vector2>,
    normals: Vec<Vector2>,
}

impl Polygon {
    pub fn new(x: f64, y: f64, points: Vec<Vector2>) -> Self {
        let normals = Self::edge_normals(&points);
        let mut polygon = Self {
            x,
            y,
            calc_points: points.clone(),
            points,
            normals,
        };
        polygon.set_position(x, y);
        polygon
    }

    /// Box of the given size centred on `(x, y)`
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Self::new(
            x,
            y,
            vec![
                Vector2::new(-half_w, -half_h),
                Vector2::new(half_w, -half_h),
                Vector2::new(half_w, half_h),
                Vector2::new(-half_w, half_h),
            ],
        )
    }

    fn edge_normals(points: &[Vector2]) -> Vec<Vector2> {
        let count = points.len();
        (0..count)
            .map(|i| {
                let edge = points[(i + 1) % count].sub(&points[i]);
                edge.perpendicular().normalize()
            })
            .collect()
    }

    /// Moves the polygon and recomputes its world-space vertices
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        let offset = Vector2::new(x, y);
        for (calc, local) in self.calc_points.iter_mut().zip(&self.points) {
            *calc = local.add(&offset);
        }
    }

    pub fn world_points(&self) -> &[Vector2] {
        &self.calc_points
    }

    pub fn aabb(&self) -> Aabb {
        let mut bounds = Aabb {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for p in &self.calc_points {
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.max_y = bounds.max_y.max(p.y);
        }
        bounds
    }

    fn project(&self, axis: &Vector2) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for p in &self.calc_points {
            let d = p.dot(axis);
            min = min.min(d);
            max = max.max(d);
        }
        (min, max)
    }

    /// Separating-axis test against another convex polygon
    ///
    /// Fills `result` with the minimum translation and returns whether the
    /// shapes overlap. Shapes that merely touch are not colliding.
    pub fn collides(&self, other: &Polygon, result: &mut CollisionResult) -> bool {
        result.clear();
        let mut best_overlap = f64::INFINITY;
        let mut best_axis = Vector2::default();

        for axis in self.normals.iter().chain(other.normals.iter()) {
            let (min_a, max_a) = self.project(axis);
            let (min_b, max_b) = other.project(axis);

            // Distance `self` has to travel along -axis or +axis to clear `other`
            let push_back = max_a - min_b;
            let push_forward = max_b - min_a;
            if push_back <= 0.0 || push_forward <= 0.0 {
                return false;
            }

            let (overlap, oriented) = if push_back <= push_forward {
                (push_back, *axis)
            } else {
                (push_forward, axis.scale(-1.0))
            };

            if overlap < best_overlap {
                best_overlap = overlap;
                best_axis = oriented;
            }
        }

        result.collision = true;
        result.overlap = best_overlap;
        result.axis = best_axis;
        true
    }
}
