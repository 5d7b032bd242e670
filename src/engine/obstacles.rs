// Polygonal obstacles.
//
// Obstacles contribute their corners to the point table before every
// rebuild, and block every triangle whose centroid falls inside them.
// Blocking is recomputed from scratch after each rebuild.

use super::error::SceneError;
use super::geometry::{Point, point_in_polygon, vertex_centroid};
use super::triangulation::TriangleSet;

/// Display colour carried with every obstacle (RGBA).
pub const DEFAULT_OBSTACLE_COLOR: [f32; 4] = [0.4, 0.4, 0.4, 0.8];

// ============================================================================
// OBSTACLE
// ============================================================================

/// A simple polygon that excludes part of the plane.
///
/// Transforms are affine and applied to every vertex in order, so winding is
/// preserved and the even-odd containment test stays valid.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    vertices: Vec<Point>,
    pub color: [f32; 4],
}

impl Obstacle {
    pub fn new(vertices: Vec<Point>) -> Self {
        debug_assert!(vertices.len() >= 3, "obstacle needs at least 3 vertices");
        Self { vertices, color: DEFAULT_OBSTACLE_COLOR }
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    /// A `size` rectangle whose unrotated top-left corner is `origin`,
    /// rotated by `rotation` radians about its own centre.
    pub fn rotated_rect(origin: Point, size: Point, rotation: f64) -> Self {
        let half = size * 0.5;
        let center = origin + half;
        let turn = Point::from_angle(rotation);
        let vertices = [
            Point::new(-half.x, -half.y),
            Point::new(half.x, -half.y),
            Point::new(half.x, half.y),
            Point::new(-half.x, half.y),
        ]
        .into_iter()
        .map(|corner| center + turn.rotate(corner))
        .collect();
        Self::new(vertices)
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Vertex average; the default pivot for rotate and scale.
    pub fn centroid(&self) -> Point {
        vertex_centroid(&self.vertices).unwrap_or(Point::ZERO)
    }

    pub fn contains(&self, p: Point) -> bool {
        point_in_polygon(p, &self.vertices)
    }

    pub fn translate(&mut self, delta: Point) {
        for v in &mut self.vertices {
            *v += delta;
        }
    }

    /// Rotate counter-clockwise by `angle` radians about `pivot`
    /// (the centroid when `None`).
    pub fn rotate(&mut self, angle: f64, pivot: Option<Point>) {
        let pivot = pivot.unwrap_or_else(|| self.centroid());
        let turn = Point::from_angle(angle);
        for v in &mut self.vertices {
            *v = pivot + turn.rotate(*v - pivot);
        }
    }

    /// Scale by `factor` about `pivot` (the centroid when `None`).
    /// A negative factor is a half turn plus a scale; winding is unchanged.
    pub fn scale(&mut self, factor: f64, pivot: Option<Point>) {
        let pivot = pivot.unwrap_or_else(|| self.centroid());
        for v in &mut self.vertices {
            *v = pivot + (*v - pivot) * factor;
        }
    }
}

// ============================================================================
// OBSTACLE SET
// ============================================================================

/// All obstacles of a scene, addressed by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObstacleSet {
    obstacles: Vec<Obstacle>,
}

impl ObstacleSet {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Obstacle> {
        self.obstacles.get(index)
    }

    pub fn push(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut Obstacle, SceneError> {
        self.obstacles.get_mut(index).ok_or(SceneError::UnknownObstacle(index))
    }

    pub fn translate(&mut self, index: usize, delta: Point) -> Result<(), SceneError> {
        self.get_mut(index)?.translate(delta);
        Ok(())
    }

    pub fn rotate(
        &mut self,
        index: usize,
        angle: f64,
        pivot: Option<Point>,
    ) -> Result<(), SceneError> {
        self.get_mut(index)?.rotate(angle, pivot);
        Ok(())
    }

    pub fn scale(
        &mut self,
        index: usize,
        factor: f64,
        pivot: Option<Point>,
    ) -> Result<(), SceneError> {
        self.get_mut(index)?.scale(factor, pivot);
        Ok(())
    }

    /// Every obstacle's vertices, obstacle by obstacle, in vertex order.
    pub fn corner_points(&self) -> Vec<Point> {
        self.obstacles.iter().flat_map(|o| o.vertices.iter().copied()).collect()
    }

    /// Index of the first obstacle containing `p`.
    pub fn containing(&self, p: Point) -> Option<usize> {
        self.obstacles.iter().position(|o| o.contains(p))
    }
}

/// Flag every triangle whose centroid lies inside any obstacle.
/// Previous flags are discarded. Returns the number of blocked triangles.
pub fn mark_blocked(triangles: &mut TriangleSet, obstacles: &ObstacleSet) -> usize {
    let mut blocked = 0;
    for t in triangles.iter_mut() {
        t.is_obstacle = obstacles.containing(t.centroid()).is_some();
        if t.is_obstacle {
            blocked += 1;
        }
    }
    blocked
}
