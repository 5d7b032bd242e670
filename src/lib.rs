// Crowd occupancy over a Delaunay-triangulated plane with movable obstacles.
// See engine/ for the triangulation, query and crowd layers.

pub mod engine;

pub use engine::*;
