// Scene configuration.
// Defaults: a 640x480 world with 40 random interior points and one rotated
// rectangular obstacle.

use super::geometry::Point;
use super::obstacles::Obstacle;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const WORLD_WIDTH: f64 = 640.0;
pub const WORLD_HEIGHT: f64 = 480.0;
pub const INTERIOR_POINTS: usize = 40;
pub const MAX_AGENTS_PER_TRIANGLE: usize = 5;
/// Points closer than this on both axes are merged before triangulation.
pub const DEDUP_TOLERANCE: f64 = 1e-3;
pub const PICK_RADIUS: f64 = 10.0;
pub const MOVE_STEP: f64 = 5.0;
pub const ROTATE_STEP_DEG: f64 = 2.0;
pub const SCALE_FACTOR: f64 = 1.05;

// ============================================================================
// TYPES
// ============================================================================

/// Which strategy turns the point table into triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriangulationMode {
    /// Bowyer-Watson over every point; the edge set is ignored.
    #[default]
    Delaunay,
    /// 3-cliques of the user-edited edge set.
    EdgeGraph,
}

/// A rectangle obstacle: unrotated top-left corner, size, rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleSpec {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub rotation_deg: f64,
}

impl ObstacleSpec {
    pub fn build(&self) -> Obstacle {
        Obstacle::rotated_rect(
            Point::new(self.x, self.y),
            Point::new(self.w, self.h),
            self.rotation_deg.to_radians(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub width: f64,
    pub height: f64,
    pub interior_points: usize,
    pub obstacles: Vec<ObstacleSpec>,
    pub max_agents_per_triangle: usize,
    pub mode: TriangulationMode,
    pub dedup_tolerance: f64,
    pub point_pick_radius: f64,
    pub edge_pick_radius: f64,
    /// World units per translate key press.
    pub move_step: f64,
    /// Radians per rotate key press.
    pub rotate_step: f64,
    /// Growth factor per scale key press; shrinking uses the reciprocal.
    pub scale_factor: f64,
    /// RNG seed for point generation and agent sampling. `None` = entropy.
    pub seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
            interior_points: INTERIOR_POINTS,
            obstacles: vec![ObstacleSpec {
                x: 200.0,
                y: 150.0,
                w: 250.0,
                h: 100.0,
                rotation_deg: 30.0,
            }],
            max_agents_per_triangle: MAX_AGENTS_PER_TRIANGLE,
            mode: TriangulationMode::default(),
            dedup_tolerance: DEDUP_TOLERANCE,
            point_pick_radius: PICK_RADIUS,
            edge_pick_radius: PICK_RADIUS,
            move_step: MOVE_STEP,
            rotate_step: ROTATE_STEP_DEG.to_radians(),
            scale_factor: SCALE_FACTOR,
            seed: None,
        }
    }
}

impl SceneConfig {
    /// The four corners of the world rectangle, counter-clockwise from the origin.
    pub fn boundary_corners(&self) -> [Point; 4] {
        [
            Point::new(0.0, 0.0),
            Point::new(self.width, 0.0),
            Point::new(self.width, self.height),
            Point::new(0.0, self.height),
        ]
    }
}
