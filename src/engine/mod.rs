// Engine module - triangulation, obstacles and crowd occupancy
// Rendering and window plumbing live outside this crate

pub mod components;
pub mod config;
pub mod crowd;
pub mod error;
pub mod geometry;
pub mod input;
pub mod obstacles;
pub mod query;
pub mod scene;
pub mod systems;
pub mod triangulation;

// Re-export commonly used items
pub use config::{ObstacleSpec, SceneConfig, TriangulationMode};
pub use crowd::{AgentId, AgentState, Crowd};
pub use error::{SceneError, TriangulationError};
pub use geometry::Point;
pub use obstacles::{Obstacle, ObstacleSet};
pub use scene::{Command, RebuildSummary, Scene, SceneStats, triangulate};
pub use systems::RepairReport;
pub use triangulation::{EdgeKey, EdgeSet, Triangle, TriangleId, TriangleSet};
