// Crowd / occupancy model.
//
// Agents live in a bevy_ecs World. Their handles (AgentId) are generation
// tagged entities, so a despawned agent can never be confused with a new one.
// Triangle references are TriangleIds and go stale on every rebuild until
// relocate_and_validate() re-resolves them.

use bevy_ecs::prelude::*;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::components::*;
use super::error::SceneError;
use super::geometry::{Point, SAMPLE_MARGIN, sample_in_triangle};
use super::query::find_closest_point;
use super::systems::{self, RepairReport};
use super::triangulation::{TriangleId, TriangleSet};

/// Stable handle to one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub Entity);

/// Read-only copy of one agent's state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentState {
    pub id: AgentId,
    pub position: Point,
    pub triangle: TriangleId,
}

pub struct Crowd {
    world: World,
    rng: StdRng,
    spawned: usize,
    dropped: usize,
}

impl Crowd {
    /// An empty crowd. `seed = None` draws the RNG seed from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { world: World::new(), rng, spawned: 0, dropped: 0 }
    }

    // ------------------------------------------------------------------------
    // Population
    // ------------------------------------------------------------------------

    /// Replace the crowd with 0..=`max_per_triangle` agents in every open
    /// triangle, each at a margin-safe random interior point.
    /// Resets the spawned/dropped counters. Returns the number of agents.
    pub fn populate(&mut self, triangles: &TriangleSet, max_per_triangle: usize) -> usize {
        // Despawn individually: old AgentIds must not alias fresh entities.
        let existing: Vec<Entity> = self.world.iter_entities().map(|e| e.id()).collect();
        for entity in existing {
            self.world.despawn(entity);
        }
        self.spawned = 0;
        self.dropped = 0;

        for id in triangles.open_ids() {
            let count = self.rng.gen_range(0..=max_per_triangle);
            for _ in 0..count {
                self.spawn_in(triangles, id);
            }
        }
        debug!(
            "populated {} agents over {} open triangles",
            self.spawned,
            triangles.len() - triangles.blocked_count()
        );
        self.spawned
    }

    /// Spawn one agent at an explicit position. No containment check.
    pub fn spawn(&mut self, triangle: TriangleId, position: Point) -> AgentId {
        self.spawned += 1;
        let entity = self.world.spawn((Position::new(position), Occupancy { triangle })).id();
        AgentId(entity)
    }

    /// Spawn one agent at a random interior point of `triangle`.
    /// `None` if the id does not resolve in `triangles`.
    pub fn spawn_in(&mut self, triangles: &TriangleSet, triangle: TriangleId) -> Option<AgentId> {
        let corners = triangles.resolve(triangle)?.corners;
        let position = sample_in_triangle(&mut self.rng, corners, SAMPLE_MARGIN);
        Some(self.spawn(triangle, position))
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.agents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Agents ever created since the last `populate`.
    pub fn spawned(&self) -> usize {
        self.spawned
    }

    /// Agents removed since the last `populate`.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn get(&self, id: AgentId) -> Option<AgentState> {
        let position = self.world.get::<Position>(id.0)?;
        let occupancy = self.world.get::<Occupancy>(id.0)?;
        Some(AgentState { id, position: position.point, triangle: occupancy.triangle })
    }

    /// Every agent, sorted by id.
    pub fn agents(&self) -> Vec<AgentState> {
        let mut agents: Vec<AgentState> = self
            .world
            .iter_entities()
            .filter_map(|entity| {
                let position = entity.get::<Position>()?;
                let occupancy = entity.get::<Occupancy>()?;
                Some(AgentState {
                    id: AgentId(entity.id()),
                    position: position.point,
                    triangle: occupancy.triangle,
                })
            })
            .collect();
        agents.sort_by_key(|a| a.id);
        agents
    }

    /// Agent nearest `point` strictly within `radius`.
    pub fn nearest(&self, point: Point, radius: f64) -> Option<AgentId> {
        let agents = self.agents();
        let positions: Vec<Point> = agents.iter().map(|a| a.position).collect();
        find_closest_point(point, &positions, radius).map(|i| agents[i].id)
    }

    // ------------------------------------------------------------------------
    // Density
    // ------------------------------------------------------------------------

    /// Agents bound to triangle `index` of the current generation.
    /// Zero for obstacle triangles and out-of-range indices.
    pub fn density(&self, triangles: &TriangleSet, index: usize) -> usize {
        match triangles.get(index) {
            Some(t) if !t.is_obstacle => {
                let id = triangles.id(index);
                self.agents().iter().filter(|a| a.triangle == id).count()
            }
            _ => 0,
        }
    }

    /// `density` for every triangle in one pass over the agents.
    pub fn density_by_triangle(&self, triangles: &TriangleSet) -> Vec<usize> {
        let mut counts = vec![0; triangles.len()];
        for agent in self.agents() {
            if triangles.is_current(agent.triangle) {
                counts[agent.triangle.index] += 1;
            }
        }
        for (count, t) in counts.iter_mut().zip(triangles.iter()) {
            if t.is_obstacle {
                *count = 0;
            }
        }
        counts
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Overwrite an agent's triangle and position unconditionally.
    /// The caller has already checked containment (e.g. via `locate`).
    pub fn move_agent(
        &mut self,
        id: AgentId,
        triangle: TriangleId,
        position: Point,
    ) -> Result<(), SceneError> {
        let Some(mut occupancy) = self.world.get_mut::<Occupancy>(id.0) else {
            return Err(SceneError::UnknownAgent(id));
        };
        occupancy.triangle = triangle;
        if let Some(mut current) = self.world.get_mut::<Position>(id.0) {
            current.point = position;
        }
        Ok(())
    }

    /// Relocation then validation against `triangles`.
    pub fn relocate_and_validate(&mut self, triangles: &TriangleSet) -> RepairReport {
        let relocated = systems::relocation_system(&mut self.world, triangles, &mut self.rng);
        let validated = systems::validation_system(&mut self.world, triangles, &mut self.rng);
        let report = relocated.merge(validated);
        self.note_dropped(report.dropped);
        report
    }

    /// Remove agents standing on obstacle triangles without relocating them.
    pub fn clear_obstacles(&mut self, triangles: &TriangleSet) -> usize {
        let removed = systems::clear_blocked_system(&mut self.world, triangles);
        self.note_dropped(removed);
        removed
    }

    fn note_dropped(&mut self, count: usize) {
        if count > 0 {
            warn!("dropped {count} agents: no open triangle left for them");
            self.dropped += count;
        }
    }
}

impl std::fmt::Debug for Crowd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crowd")
            .field("agents", &self.len())
            .field("spawned", &self.spawned)
            .field("dropped", &self.dropped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_set(generation: u32) -> TriangleSet {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        TriangleSet::build(generation, &[[0, 1, 2], [0, 2, 3]], &pts)
    }

    #[test]
    fn populate_respects_range_and_obstacles() {
        let mut set = square_set(0);
        set.iter_mut().next().unwrap().is_obstacle = true;
        let mut crowd = Crowd::new(Some(11));
        let n = crowd.populate(&set, 5);
        assert!(n <= 5);
        assert_eq!(crowd.len(), n);
        for agent in crowd.agents() {
            assert_eq!(agent.triangle, set.id(1));
            assert!(set.get(1).unwrap().contains(agent.position));
        }
    }

    #[test]
    fn density_ignores_obstacles_and_stale_ids() {
        let mut set = square_set(2);
        let mut crowd = Crowd::new(Some(5));
        crowd.spawn(set.id(0), Point::new(7.0, 2.0));
        crowd.spawn(set.id(1), Point::new(2.0, 7.0));
        crowd.spawn(TriangleId { generation: 1, index: 1 }, Point::new(3.0, 8.0));
        assert_eq!(crowd.density(&set, 0), 1);
        assert_eq!(crowd.density(&set, 1), 1);
        assert_eq!(crowd.density(&set, 9), 0);

        set.iter_mut().next().unwrap().is_obstacle = true;
        assert_eq!(crowd.density(&set, 0), 0);
        assert_eq!(crowd.density_by_triangle(&set), vec![0, 1]);
    }

    #[test]
    fn move_agent_overwrites_both_fields() {
        let set = square_set(0);
        let mut crowd = Crowd::new(Some(9));
        let id = crowd.spawn(set.id(0), Point::new(7.0, 2.0));
        crowd.move_agent(id, set.id(1), Point::new(1.0, 9.0)).unwrap();
        let state = crowd.get(id).unwrap();
        assert_eq!(state.triangle, set.id(1));
        assert_eq!(state.position, Point::new(1.0, 9.0));
    }

    #[test]
    fn moving_a_dropped_agent_fails() {
        let mut set = square_set(0);
        for t in set.iter_mut() {
            t.is_obstacle = true;
        }
        let mut crowd = Crowd::new(Some(3));
        let id = crowd.spawn(set.id(0), Point::new(7.0, 2.0));
        let report = crowd.relocate_and_validate(&set);
        assert_eq!(report.dropped, 1);
        assert_eq!(crowd.dropped(), 1);
        assert_eq!(
            crowd.move_agent(id, set.id(1), Point::new(1.0, 9.0)),
            Err(SceneError::UnknownAgent(id))
        );
    }

    #[test]
    fn nearest_agent_within_radius() {
        let set = square_set(0);
        let mut crowd = Crowd::new(Some(1));
        let a = crowd.spawn(set.id(0), Point::new(7.0, 2.0));
        let _b = crowd.spawn(set.id(1), Point::new(2.0, 7.0));
        assert_eq!(crowd.nearest(Point::new(6.5, 2.5), 1.0), Some(a));
        assert_eq!(crowd.nearest(Point::new(5.0, 5.0), 1.0), None);
    }
}
