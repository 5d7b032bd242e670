// Spatial queries driving pointer interaction and agent placement.
//
// All linear scans: the point, edge and triangle counts here are small and
// the tables are rebuilt wholesale, so an index structure would be rebuilt
// as often as it was queried.

use super::geometry::{Point, distance_point_to_segment};
use super::triangulation::{EdgeKey, Triangle};

/// Index of the point nearest `query` strictly within `radius`.
/// Compares squared distances; ties keep the lowest index.
pub fn find_closest_point(query: Point, points: &[Point], radius: f64) -> Option<usize> {
    let mut best = radius * radius;
    let mut found = None;
    for (i, p) in points.iter().enumerate() {
        let d = p.distance_squared(query);
        if d < best {
            best = d;
            found = Some(i);
        }
    }
    found
}

/// Index (into `edges`) of the edge nearest `query` strictly within `radius`.
/// Edges referencing a point outside `points` are skipped.
pub fn find_closest_edge(
    query: Point,
    points: &[Point],
    edges: &[EdgeKey],
    radius: f64,
) -> Option<usize> {
    let mut best = radius;
    let mut found = None;
    for (i, &EdgeKey(a, b)) in edges.iter().enumerate() {
        let (Some(&pa), Some(&pb)) = (points.get(a), points.get(b)) else {
            continue;
        };
        let d = distance_point_to_segment(query, pa, pb);
        if d < best {
            best = d;
            found = Some(i);
        }
    }
    found
}

/// First triangle, in stored order, whose strict interior contains `point`.
/// Points on shared edges or outside every triangle locate to `None`.
pub fn locate_triangle(point: Point, triangles: &[Triangle]) -> Option<usize> {
    triangles.iter().position(|t| t.contains(point))
}
