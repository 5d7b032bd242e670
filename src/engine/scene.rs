// Scene session: the one place that owns the point table, edge set,
// obstacles, triangle set and crowd.
//
// Mutation order is fixed: edits land in the tables first, then the triangle
// set is rebuilt and swapped in whole, then the crowd is repaired, and only
// then are density queries answered. Input goes through a command queue so a
// burst of edits costs one rebuild.

use std::collections::VecDeque;
use std::time::Instant;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::{SceneConfig, TriangulationMode};
use super::crowd::{AgentId, Crowd};
use super::error::{SceneError, TriangulationError};
use super::geometry::Point;
use super::obstacles::{ObstacleSet, mark_blocked};
use super::query::{find_closest_edge, find_closest_point, locate_triangle};
use super::systems::RepairReport;
use super::triangulation::{EdgeKey, EdgeSet, TriangleId, TriangleSet, build_triangle_set};

// ============================================================================
// COMMANDS
// ============================================================================

/// One discrete edit produced by the input layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    TranslateObstacle { index: usize, delta: Point },
    /// Counter-clockwise radians about the obstacle's centroid.
    RotateObstacle { index: usize, angle: f64 },
    /// About the obstacle's centroid.
    ScaleObstacle { index: usize, factor: f64 },
    AddEdge(usize, usize),
    RemoveEdge(usize, usize),
    /// A free point dragged and released at `to`.
    MovePoint { index: usize, to: Point },
    MoveAgent { agent: AgentId, triangle: TriangleId, position: Point },
}

// ============================================================================
// REPORTS
// ============================================================================

/// Result of one full rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct RebuildSummary {
    pub generation: u32,
    pub triangle_count: usize,
    pub blocked_count: usize,
    /// Agents per triangle after repair, indexed like the triangle set.
    pub density: Vec<usize>,
    pub repair: RepairReport,
}

/// Counters for logging and overlays.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SceneStats {
    pub points: usize,
    pub edges: usize,
    pub triangles: usize,
    pub blocked_triangles: usize,
    pub agents: usize,
    pub dropped_agents: usize,
    pub rebuilds: u32,
    /// Wall time of the last rebuild including repair (ms).
    pub last_rebuild_ms: f32,
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Triangulate a point table and mark obstacle triangles.
///
/// `edges == None` selects Bowyer-Watson; otherwise triangles are the
/// 3-cliques of `edges`.
pub fn triangulate(
    points: &[Point],
    edges: Option<&EdgeSet>,
    obstacles: &ObstacleSet,
    tolerance: f64,
    generation: u32,
) -> Result<TriangleSet, TriangulationError> {
    let mut triangles = build_triangle_set(points, edges, tolerance, generation)?;
    mark_blocked(&mut triangles, obstacles);
    Ok(triangles)
}

// ============================================================================
// SCENE
// ============================================================================

#[derive(Debug)]
pub struct Scene {
    config: SceneConfig,
    /// Boundary and interior points. Obstacle corners are appended on demand.
    points: Vec<Point>,
    edges: EdgeSet,
    obstacles: ObstacleSet,
    triangles: TriangleSet,
    crowd: Crowd,
    commands: VecDeque<Command>,
    rebuilds: u32,
    last_rebuild_ms: f32,
}

impl Scene {
    /// A scene with no triangles and no agents yet. Call `rebuild` next.
    pub fn new(config: SceneConfig, points: Vec<Point>, obstacles: ObstacleSet) -> Self {
        let crowd = Crowd::new(config.seed);
        Self {
            config,
            points,
            edges: EdgeSet::new(),
            obstacles,
            triangles: TriangleSet::default(),
            crowd,
            commands: VecDeque::new(),
            rebuilds: 0,
            last_rebuild_ms: 0.0,
        }
    }

    /// The demo scene: world corners, random interior points, configured
    /// obstacles, a first rebuild and a freshly populated crowd.
    ///
    /// In edge-graph mode the starting edge set is read off a Delaunay
    /// triangulation of the same points.
    pub fn generate(config: SceneConfig) -> Result<Self, SceneError> {
        // Written so NaN fails too.
        if !(config.width > 0.0 && config.height > 0.0) {
            return Err(SceneError::InvalidConfig(format!(
                "world size must be positive, got {}x{}",
                config.width, config.height
            )));
        }
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        let mut points = config.boundary_corners().to_vec();
        for _ in 0..config.interior_points {
            points.push(Point::new(
                rng.gen_range(0.0..config.width),
                rng.gen_range(0.0..config.height),
            ));
        }
        let obstacles =
            ObstacleSet::new(config.obstacles.iter().map(|spec| spec.build()).collect());

        let mut scene = Scene::new(config, points, obstacles);
        if scene.config.mode == TriangulationMode::EdgeGraph {
            let tolerance = scene.config.dedup_tolerance;
            let seed = build_triangle_set(&scene.point_table(), None, tolerance, 0)?;
            scene.edges = EdgeSet::from_triangles(&seed);
        }
        scene.rebuild()?;
        let agents = scene.populate();
        info!(
            "generated scene: {} points, {} triangles, {} agents",
            scene.points.len(),
            scene.triangles.len(),
            agents
        );
        Ok(scene)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn mode(&self) -> TriangulationMode {
        self.config.mode
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn edges(&self) -> &EdgeSet {
        &self.edges
    }

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    pub fn triangles(&self) -> &TriangleSet {
        &self.triangles
    }

    pub fn crowd(&self) -> &Crowd {
        &self.crowd
    }

    /// Free points followed by every obstacle corner. Edge indices refer to
    /// this table.
    pub fn point_table(&self) -> Vec<Point> {
        let mut table = self.points.clone();
        table.extend(self.obstacles.corner_points());
        table
    }

    pub fn stats(&self) -> SceneStats {
        SceneStats {
            points: self.points.len() + self.obstacles.corner_points().len(),
            edges: self.edges.len(),
            triangles: self.triangles.len(),
            blocked_triangles: self.triangles.blocked_count(),
            agents: self.crowd.len(),
            dropped_agents: self.crowd.dropped(),
            rebuilds: self.rebuilds,
            last_rebuild_ms: self.last_rebuild_ms,
        }
    }

    // ------------------------------------------------------------------------
    // Rebuild
    // ------------------------------------------------------------------------

    /// Recompute the triangle set from the current tables, mark obstacles,
    /// repair the crowd and report per-triangle density.
    ///
    /// On error nothing is replaced: the previous triangles and agents stay.
    pub fn rebuild(&mut self) -> Result<RebuildSummary, SceneError> {
        let started = Instant::now();
        let table = self.point_table();
        let edges = match self.config.mode {
            TriangulationMode::Delaunay => None,
            TriangulationMode::EdgeGraph => Some(&self.edges),
        };
        let generation = self.triangles.generation().wrapping_add(1);

        let kept = self.triangles.generation();
        let triangles = triangulate(
            &table,
            edges,
            &self.obstacles,
            self.config.dedup_tolerance,
            generation,
        )
        .inspect_err(|e| warn!("rebuild failed, keeping generation {kept}: {e}"))?;

        self.triangles = triangles;
        let repair = self.crowd.relocate_and_validate(&self.triangles);
        let density = self.crowd.density_by_triangle(&self.triangles);

        self.rebuilds += 1;
        self.last_rebuild_ms = started.elapsed().as_secs_f32() * 1000.0;
        debug!(
            "rebuild #{} ({:?}): {} points -> {} triangles ({} blocked), {:?}, {:.3} ms",
            self.rebuilds,
            self.config.mode,
            table.len(),
            self.triangles.len(),
            self.triangles.blocked_count(),
            repair,
            self.last_rebuild_ms
        );

        Ok(RebuildSummary {
            generation,
            triangle_count: self.triangles.len(),
            blocked_count: self.triangles.blocked_count(),
            density,
            repair,
        })
    }

    /// Re-seed the crowd over the current open triangles.
    pub fn populate(&mut self) -> usize {
        self.crowd.populate(&self.triangles, self.config.max_agents_per_triangle)
    }

    /// Spawn one agent at a random interior point of `triangle`.
    pub fn spawn_agent(&mut self, triangle: TriangleId) -> Option<AgentId> {
        self.crowd.spawn_in(&self.triangles, triangle)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Triangle whose strict interior contains `point`.
    pub fn locate(&self, point: Point) -> Option<TriangleId> {
        locate_triangle(point, self.triangles.as_slice()).map(|i| self.triangles.id(i))
    }

    /// Point-table index nearest `point` within `radius`.
    pub fn nearest_point(&self, point: Point, radius: f64) -> Option<usize> {
        find_closest_point(point, &self.point_table(), radius)
    }

    /// Edge nearest `point` within `radius`.
    pub fn nearest_edge(&self, point: Point, radius: f64) -> Option<EdgeKey> {
        let edges = self.edges.as_slice();
        find_closest_edge(point, &self.point_table(), edges, radius).map(|i| edges[i])
    }

    pub fn nearest_agent(&self, point: Point, radius: f64) -> Option<AgentId> {
        self.crowd.nearest(point, radius)
    }

    pub fn density(&self, index: usize) -> usize {
        self.crowd.density(&self.triangles, index)
    }

    pub fn density_by_triangle(&self) -> Vec<usize> {
        self.crowd.density_by_triangle(&self.triangles)
    }

    // ------------------------------------------------------------------------
    // Direct mutation (caller rebuilds afterwards)
    // ------------------------------------------------------------------------

    pub fn translate_obstacle(&mut self, index: usize, delta: Point) -> Result<(), SceneError> {
        self.obstacles.translate(index, delta)
    }

    pub fn rotate_obstacle(&mut self, index: usize, angle: f64) -> Result<(), SceneError> {
        self.obstacles.rotate(index, angle, None)
    }

    pub fn scale_obstacle(&mut self, index: usize, factor: f64) -> Result<(), SceneError> {
        self.obstacles.scale(index, factor, None)
    }

    /// Add an edge between two point-table indices. Returns true if new.
    pub fn add_edge(&mut self, a: usize, b: usize) -> Result<bool, SceneError> {
        let len = self.points.len() + self.obstacles.corner_points().len();
        if let Some(bad) = [a, b].into_iter().find(|&i| i >= len) {
            return Err(SceneError::UnknownPoint(bad));
        }
        Ok(self.edges.insert(a, b))
    }

    /// Remove an edge. Returns true if it was present.
    pub fn remove_edge(&mut self, a: usize, b: usize) -> bool {
        self.edges.remove(a, b)
    }

    /// Move a free point (boundary or interior). Obstacle corners move only
    /// with their obstacle.
    pub fn move_point(&mut self, index: usize, to: Point) -> Result<(), SceneError> {
        let point = self.points.get_mut(index).ok_or(SceneError::UnknownPoint(index))?;
        *point = to;
        Ok(())
    }

    pub fn move_agent(
        &mut self,
        agent: AgentId,
        triangle: TriangleId,
        position: Point,
    ) -> Result<(), SceneError> {
        self.crowd.move_agent(agent, triangle, position)
    }

    pub fn relocate_and_validate(&mut self) -> RepairReport {
        self.crowd.relocate_and_validate(&self.triangles)
    }

    /// Remove agents standing on obstacle triangles instead of relocating them.
    pub fn clear_blocked_agents(&mut self) -> usize {
        self.crowd.clear_obstacles(&self.triangles)
    }

    // ------------------------------------------------------------------------
    // Command queue
    // ------------------------------------------------------------------------

    pub fn push(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    pub fn pending(&self) -> usize {
        self.commands.len()
    }

    /// Apply every queued command in order, then rebuild once if any of them
    /// changed geometry.
    ///
    /// A command that fails is skipped; the rest still apply and the first
    /// failure is returned after the rebuild. `MoveAgent` ids issued before a
    /// geometry edit in the same batch are re-resolved by the rebuild's repair.
    pub fn process_commands(&mut self) -> Result<Option<RebuildSummary>, SceneError> {
        let mut dirty = false;
        let mut first_error = None;

        while let Some(command) = self.commands.pop_front() {
            debug!("command {command:?}");
            match self.apply(command) {
                Ok(changed) => dirty |= changed,
                Err(e) => {
                    warn!("skipping {command:?}: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        let summary = if dirty { Some(self.rebuild()?) } else { None };
        match first_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    /// Apply one command. Returns true if the triangle set is now out of date.
    fn apply(&mut self, command: Command) -> Result<bool, SceneError> {
        match command {
            Command::TranslateObstacle { index, delta } => {
                self.translate_obstacle(index, delta).map(|_| true)
            }
            Command::RotateObstacle { index, angle } => {
                self.rotate_obstacle(index, angle).map(|_| true)
            }
            Command::ScaleObstacle { index, factor } => {
                self.scale_obstacle(index, factor).map(|_| true)
            }
            Command::AddEdge(a, b) => self.add_edge(a, b),
            Command::RemoveEdge(a, b) => Ok(self.remove_edge(a, b)),
            Command::MovePoint { index, to } => self.move_point(index, to).map(|_| true),
            Command::MoveAgent { agent, triangle, position } => {
                self.move_agent(agent, triangle, position).map(|_| false)
            }
        }
    }
}
