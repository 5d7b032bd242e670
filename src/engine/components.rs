// ECS components carried by crowd agents.
// An agent is an entity with both a Position and an Occupancy.

use bevy_ecs::prelude::*;

use super::geometry::Point;
use super::triangulation::TriangleId;

/// Where the agent stands, in world units.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub point: Point,
}

impl Position {
    pub fn new(point: Point) -> Self {
        Self { point }
    }
}

/// The triangle the agent is bound to.
///
/// Eventually consistent: after a rebuild the id is stale until the repair
/// passes re-resolve it against the new triangle set.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub triangle: TriangleId,
}
