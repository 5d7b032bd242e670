// Error taxonomy for the engine.
//
// Only caller contract violations surface here. Degenerate geometry,
// stale indices and exhausted relocation are handled in place (false /
// None / dropped agent) and never become errors.

use thiserror::Error;

use super::crowd::AgentId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriangulationError {
    #[error("not enough distinct points to triangulate: need at least 3, got {0}")]
    NotEnoughPoints(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("no obstacle at index {0}")]
    UnknownObstacle(usize),

    #[error("no point at index {0}")]
    UnknownPoint(usize),

    #[error("invalid scene config: {0}")]
    InvalidConfig(String),

    #[error("agent {0:?} does not exist")]
    UnknownAgent(AgentId),

    #[error(transparent)]
    Triangulation(#[from] TriangulationError),
}
