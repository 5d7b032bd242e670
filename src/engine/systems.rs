// Crowd repair systems.
// Run after every rebuild, relocation first and validation second, and before
// any density query. Both are idempotent.
//
// Each system snapshots the agents it needs with a query, decides against the
// triangle set, then applies edits through the World. Despawns happen after the
// scan so the query never observes a half-edited table.

use bevy_ecs::prelude::*;
use rand::Rng;

use super::components::*;
use super::geometry::{Point, SAMPLE_MARGIN, sample_in_triangle};
use super::triangulation::{TriangleId, TriangleSet};

/// What a repair pass did. Counters add up across passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Moved out of an obstacle triangle to a fresh position.
    pub relocated: usize,
    /// Kept their position, bound to a different (or re-stamped) triangle.
    pub rebound: usize,
    /// Given a fresh position in a random open triangle.
    pub resampled: usize,
    /// Removed because no open triangle exists.
    pub dropped: usize,
}

impl RepairReport {
    pub fn merge(self, other: RepairReport) -> RepairReport {
        RepairReport {
            relocated: self.relocated + other.relocated,
            rebound: self.rebound + other.rebound,
            resampled: self.resampled + other.resampled,
            dropped: self.dropped + other.dropped,
        }
    }
}

fn snapshot(world: &mut World) -> Vec<(Entity, TriangleId, Point)> {
    let mut query = world.query::<(Entity, &Occupancy, &Position)>();
    query
        .iter(world)
        .map(|(entity, occupancy, position)| (entity, occupancy.triangle, position.point))
        .collect()
}

fn place(world: &mut World, entity: Entity, triangle: TriangleId, point: Option<Point>) {
    if let Some(mut occupancy) = world.get_mut::<Occupancy>(entity) {
        occupancy.triangle = triangle;
    }
    if let Some(point) = point {
        if let Some(mut position) = world.get_mut::<Position>(entity) {
            position.point = point;
        }
    }
}

fn sample<R: Rng>(rng: &mut R, triangles: &TriangleSet, id: TriangleId) -> Option<Point> {
    triangles
        .resolve(id)
        .map(|t| sample_in_triangle(rng, t.corners, SAMPLE_MARGIN))
}

/// Move every agent bound to an obstacle triangle into the first open
/// triangle (stored order) at a freshly sampled position.
///
/// Stale ids are resolved by index into the new set. Agents whose index no
/// longer exists are left for `validation_system`.
pub fn relocation_system<R: Rng>(
    world: &mut World,
    triangles: &TriangleSet,
    rng: &mut R,
) -> RepairReport {
    let mut report = RepairReport::default();
    let target = triangles.first_open();
    let mut doomed = Vec::new();

    for (entity, id, _) in snapshot(world) {
        let blocked = triangles.get(id.index).is_some_and(|t| t.is_obstacle);
        if !blocked {
            continue;
        }
        match target.and_then(|t| sample(rng, triangles, t).map(|p| (t, p))) {
            Some((t, p)) => {
                place(world, entity, t, Some(p));
                report.relocated += 1;
            }
            None => doomed.push(entity),
        }
    }

    for entity in doomed {
        if world.despawn(entity) {
            report.dropped += 1;
        }
    }
    report
}

/// Re-resolve every agent against the current triangle set.
///
/// An agent still strictly inside the triangle at its index keeps it (the id
/// is re-stamped with the current generation). Otherwise it is rebound to the
/// first open triangle containing its position, or resampled into a uniformly
/// chosen open triangle, or dropped when no open triangle exists.
pub fn validation_system<R: Rng>(
    world: &mut World,
    triangles: &TriangleSet,
    rng: &mut R,
) -> RepairReport {
    let mut report = RepairReport::default();
    let open = triangles.open_ids();
    let mut doomed = Vec::new();

    for (entity, id, point) in snapshot(world) {
        let inside = triangles
            .get(id.index)
            .is_some_and(|t| !t.is_obstacle && t.contains(point));
        if inside {
            let current = triangles.id(id.index);
            if current != id {
                place(world, entity, current, None);
                report.rebound += 1;
            }
            continue;
        }

        let containing = open
            .iter()
            .copied()
            .find(|&t| triangles.resolve(t).is_some_and(|t| t.contains(point)));
        if let Some(t) = containing {
            place(world, entity, t, None);
            report.rebound += 1;
            continue;
        }

        if open.is_empty() {
            doomed.push(entity);
            continue;
        }
        let t = open[rng.gen_range(0..open.len())];
        let p = sample(rng, triangles, t);
        place(world, entity, t, p);
        report.resampled += 1;
    }

    for entity in doomed {
        if world.despawn(entity) {
            report.dropped += 1;
        }
    }
    report
}

/// Remove every agent bound to an obstacle triangle, without relocating it.
pub fn clear_blocked_system(world: &mut World, triangles: &TriangleSet) -> usize {
    let doomed: Vec<Entity> = snapshot(world)
        .into_iter()
        .filter(|(_, id, _)| triangles.get(id.index).is_some_and(|t| t.is_obstacle))
        .map(|(entity, _, _)| entity)
        .collect();
    doomed.into_iter().filter(|&e| world.despawn(e)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn square_set(generation: u32) -> TriangleSet {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        TriangleSet::build(generation, &[[0, 1, 2], [0, 2, 3]], &pts)
    }

    fn spawn(world: &mut World, triangle: TriangleId, point: Point) -> Entity {
        world.spawn((Position::new(point), Occupancy { triangle })).id()
    }

    #[test]
    fn relocation_moves_agents_off_obstacles() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut set = square_set(0);
        set.iter_mut().next().unwrap().is_obstacle = true;

        let e = spawn(&mut world, set.id(0), Point::new(7.0, 2.0));
        let report = relocation_system(&mut world, &set, &mut rng);
        assert_eq!(report.relocated, 1);

        let occ = world.get::<Occupancy>(e).unwrap();
        assert_eq!(occ.triangle, set.id(1));
        let pos = world.get::<Position>(e).unwrap();
        assert!(set.get(1).unwrap().contains(pos.point));
    }

    #[test]
    fn validation_drops_when_everything_is_blocked() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(2);
        let mut set = square_set(1);
        for t in set.iter_mut() {
            t.is_obstacle = true;
        }
        spawn(&mut world, TriangleId { generation: 0, index: 5 }, Point::new(3.0, 3.0));

        let report = validation_system(&mut world, &set, &mut rng);
        assert_eq!(report.dropped, 1);
        assert_eq!(world.query::<&Occupancy>().iter(&world).count(), 0);
    }

    #[test]
    fn validation_restamps_and_rebinds() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(3);
        let set = square_set(4);

        // Right index, stale generation.
        let a = spawn(&mut world, TriangleId { generation: 3, index: 1 }, Point::new(2.0, 7.0));
        // Wrong index, position inside triangle 0.
        let b = spawn(&mut world, TriangleId { generation: 3, index: 1 }, Point::new(7.0, 2.0));

        let report = validation_system(&mut world, &set, &mut rng);
        assert_eq!(report.rebound, 2);
        assert_eq!(world.get::<Occupancy>(a).unwrap().triangle, set.id(1));
        assert_eq!(world.get::<Occupancy>(b).unwrap().triangle, set.id(0));
        assert_eq!(world.get::<Position>(b).unwrap().point, Point::new(7.0, 2.0));

        let again = validation_system(&mut world, &set, &mut rng);
        assert_eq!(again, RepairReport::default());
    }

    #[test]
    fn validation_resamples_agents_outside_every_open_triangle() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(4);
        let mut set = square_set(2);
        set.iter_mut().next().unwrap().is_obstacle = true;

        // Stale id, index out of range, position outside the square.
        let stale = TriangleId { generation: 1, index: 9 };
        let e = spawn(&mut world, stale, Point::new(25.0, -4.0));

        let report = validation_system(&mut world, &set, &mut rng);
        assert_eq!(report, RepairReport { resampled: 1, ..RepairReport::default() });

        let id = world.get::<Occupancy>(e).unwrap().triangle;
        assert!(set.is_current(id));
        let triangle = set.resolve(id).unwrap();
        assert!(!triangle.is_obstacle);
        assert!(triangle.contains(world.get::<Position>(e).unwrap().point));

        let again = validation_system(&mut world, &set, &mut rng);
        assert_eq!(again, RepairReport::default());
    }

    #[test]
    fn clear_blocked_removes_without_relocating() {
        let mut world = World::new();
        let mut set = square_set(0);
        set.iter_mut().next().unwrap().is_obstacle = true;
        spawn(&mut world, set.id(0), Point::new(7.0, 2.0));
        spawn(&mut world, set.id(1), Point::new(2.0, 7.0));
        assert_eq!(clear_blocked_system(&mut world, &set), 1);
        assert_eq!(world.query::<&Occupancy>().iter(&world).count(), 1);
    }
}
