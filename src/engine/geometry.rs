// Planar geometric predicates.
// Pure functions over `Point` values; nothing here holds state.
//
// Degenerate input (zero-area triangles, zero-length segments) never
// produces an error: predicates return a definite `false`, and distances
// fall back to point-to-point.

use glam::DVec2;
use rand::Rng;
use robust::Coord;

// ============================================================================
// CONSTANTS
// ============================================================================

/// A 2D point in world units. Used for every coordinate in the crate.
pub type Point = DVec2;

/// Triangles whose doubled signed area falls below this are degenerate.
pub const DEGENERATE_EPSILON: f64 = 1e-10;

/// Minimum barycentric weight for the strict-interior containment test.
pub const INTERIOR_MARGIN: f64 = 0.01;

/// Minimum barycentric weight of a sampled agent position.
/// Must stay above `INTERIOR_MARGIN` so samples always pass the strict test.
pub const SAMPLE_MARGIN: f64 = 0.05;

// ============================================================================
// TRIANGLE MEASURES
// ============================================================================

#[inline]
fn coord(p: Point) -> Coord<f64> {
    Coord { x: p.x, y: p.y }
}

/// Twice the signed area of (a, b, c). Positive when counter-clockwise.
/// The sign is exact, so collinear input gives exactly zero.
#[inline]
pub fn orient2d(a: Point, b: Point, c: Point) -> f64 {
    robust::orient2d(coord(a), coord(b), coord(c))
}

/// Unsigned area of a triangle.
pub fn triangle_area(corners: [Point; 3]) -> f64 {
    orient2d(corners[0], corners[1], corners[2]).abs() * 0.5
}

/// True if the triangle is too thin to be used for containment or occupancy.
#[inline]
pub fn is_degenerate(corners: [Point; 3]) -> bool {
    orient2d(corners[0], corners[1], corners[2]).abs() < DEGENERATE_EPSILON
}

pub fn triangle_centroid(corners: [Point; 3]) -> Point {
    (corners[0] + corners[1] + corners[2]) / 3.0
}

/// Vertex average of a polygon. `None` for an empty vertex list.
pub fn vertex_centroid(vertices: &[Point]) -> Option<Point> {
    if vertices.is_empty() {
        return None;
    }
    let sum = vertices.iter().copied().fold(Point::ZERO, |acc, v| acc + v);
    Some(sum / vertices.len() as f64)
}

/// Axis-aligned bounds `(min, max)` of a point list.
pub fn bounding_box(points: &[Point]) -> Option<(Point, Point)> {
    points.iter().copied().fold(None, |acc, p| match acc {
        Some((min, max)) => Some((p.min(min), p.max(max))),
        None => Some((p, p)),
    })
}

// ============================================================================
// CONTAINMENT
// ============================================================================

/// How the sign-based triangle test treats points lying exactly on an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeRule {
    Inclusive,
    Exclusive,
}

/// Barycentric weights of `p` relative to `corners`, in corner order.
/// Returns `None` for a degenerate triangle.
pub fn barycentric(p: Point, corners: [Point; 3]) -> Option<[f64; 3]> {
    let [a, b, c] = corners;
    let denom = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
    if denom.abs() < DEGENERATE_EPSILON {
        return None;
    }
    let wa = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / denom;
    let wb = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / denom;
    Some([wa, wb, 1.0 - wa - wb])
}

/// Strict-interior containment used wherever agents are placed or located.
///
/// Every barycentric weight must exceed `INTERIOR_MARGIN`, so points on or
/// very near an edge are rejected. Degenerate triangles contain nothing.
pub fn point_in_triangle(p: Point, corners: [Point; 3]) -> bool {
    barycentric(p, corners).is_some_and(|w| w.iter().all(|&x| x > INTERIOR_MARGIN))
}

/// Sign/area containment test, independent of the triangle's winding.
/// `rule` decides whether points exactly on an edge count as inside.
pub fn point_in_triangle_signed(p: Point, corners: [Point; 3], rule: EdgeRule) -> bool {
    let [a, b, c] = corners;
    let area = orient2d(a, b, c);
    if area.abs() < DEGENERATE_EPSILON {
        return false;
    }
    let s = area.signum();
    let d = [orient2d(a, b, p) * s, orient2d(b, c, p) * s, orient2d(c, a, p) * s];
    match rule {
        EdgeRule::Inclusive => d.iter().all(|&x| x >= 0.0),
        EdgeRule::Exclusive => d.iter().all(|&x| x > 0.0),
    }
}

/// Even-odd ray casting over an ordered vertex list.
/// Correct for convex and simple non-convex polygons.
pub fn point_in_polygon(p: Point, vertices: &[Point]) -> bool {
    let mut inside = false;
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (vi, vj) = (vertices[i], vertices[j]);
        if (vi.y > p.y) != (vj.y > p.y)
            && p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

// ============================================================================
// DISTANCES AND CIRCLES
// ============================================================================

/// Euclidean distance from `p` to the closed segment [a, b].
pub fn distance_point_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// True if `p` lies strictly inside the circumcircle of `corners`.
///
/// Both determinants are evaluated with exact-sign predicates, so co-circular
/// points are never inside and every caller sees the same answer for the same
/// input. The sign is normalised by the triangle's orientation; callers may
/// pass either order. Collinear corners have no circumcircle.
pub fn in_circumcircle(p: Point, corners: [Point; 3]) -> bool {
    let [a, b, c] = corners.map(coord);
    let orientation = robust::orient2d(a, b, c);
    if orientation == 0.0 {
        return false;
    }
    robust::incircle(a, b, c, coord(p)) * orientation.signum() > 0.0
}

// ============================================================================
// SAMPLING
// ============================================================================

/// Uniformly sample a point inside a triangle, kept `margin` away from every
/// edge in barycentric terms.
///
/// Each weight `w` is remapped to `margin + w * (1 - 3 * margin)`, so all
/// three weights are at least `margin` and still sum to one.
pub fn sample_in_triangle<R: Rng + ?Sized>(rng: &mut R, corners: [Point; 3], margin: f64) -> Point {
    let mut r1: f64 = rng.gen_range(0.0..1.0);
    let mut r2: f64 = rng.gen_range(0.0..1.0);
    if r1 + r2 > 1.0 {
        r1 = 1.0 - r1;
        r2 = 1.0 - r2;
    }
    let span = 1.0 - 3.0 * margin;
    let w = [1.0 - r1 - r2, r1, r2].map(|x| margin + x * span);
    corners[0] * w[0] + corners[1] * w[1] + corners[2] * w[2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn tri() -> [Point; 3] {
        [Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(0.0, 4.0)]
    }

    #[test]
    fn strict_test_rejects_edges_and_accepts_interior() {
        assert!(point_in_triangle(Point::new(1.0, 1.0), tri()));
        assert!(!point_in_triangle(Point::new(2.0, 0.0), tri()));
        assert!(!point_in_triangle(Point::new(2.0, 0.02), tri()));
        assert!(!point_in_triangle(Point::new(5.0, 5.0), tri()));
    }

    #[test]
    fn strict_test_ignores_winding() {
        let [a, b, c] = tri();
        assert!(point_in_triangle(Point::new(1.0, 1.0), [a, c, b]));
    }

    #[test]
    fn degenerate_triangle_contains_nothing() {
        let flat = [Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 2.0)];
        assert!(!point_in_triangle(Point::new(1.0, 1.0), flat));
        assert!(!point_in_triangle_signed(Point::new(1.0, 1.0), flat, EdgeRule::Inclusive));
        assert!(!in_circumcircle(Point::new(1.0, 1.0), flat));
    }

    #[test]
    fn signed_test_edge_rules() {
        let on_edge = Point::new(2.0, 0.0);
        assert!(point_in_triangle_signed(on_edge, tri(), EdgeRule::Inclusive));
        assert!(!point_in_triangle_signed(on_edge, tri(), EdgeRule::Exclusive));
        assert!(point_in_triangle_signed(Point::new(1.0, 1.0), tri(), EdgeRule::Exclusive));
    }

    #[test]
    fn polygon_even_odd_handles_concave_shapes() {
        // An L shape: the notch at (3, 3) is outside.
        let l_shape = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 2.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        assert!(point_in_polygon(Point::new(1.0, 3.0), &l_shape));
        assert!(point_in_polygon(Point::new(3.0, 1.0), &l_shape));
        assert!(!point_in_polygon(Point::new(3.0, 3.0), &l_shape));
        assert!(!point_in_polygon(Point::new(1.0, 1.0), &l_shape[..2]));
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(distance_point_to_segment(Point::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_point_to_segment(Point::new(-3.0, 4.0), a, b), 5.0);
        assert_eq!(distance_point_to_segment(Point::new(3.0, 4.0), a, a), 5.0);
    }

    #[test]
    fn circumcircle_sign_is_winding_independent() {
        let [a, b, c] = tri();
        let inside = Point::new(3.0, 3.0);
        let outside = Point::new(5.0, 5.0);
        assert!(in_circumcircle(inside, [a, b, c]));
        assert!(in_circumcircle(inside, [a, c, b]));
        assert!(!in_circumcircle(outside, [a, b, c]));
        assert!(!in_circumcircle(outside, [a, c, b]));
        // Vertices sit on the circle, not inside it.
        assert!(!in_circumcircle(a, [a, b, c]));
    }

    #[test]
    fn cocircular_points_are_never_inside() {
        // Unit square: the fourth corner lies exactly on the circle.
        let square = [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)];
        assert!(!in_circumcircle(Point::new(0.0, 1.0), square));

        // Rounded points on a circle: the answer may go either way, but it
        // must agree with itself for every winding of the same triangle.
        let on_circle = |k: f64| Point::from_angle(k * std::f64::consts::FRAC_PI_4) * 3.0;
        let [a, b, c] = [on_circle(0.0), on_circle(2.0), on_circle(5.0)];
        for k in [1.0, 3.0, 4.0, 6.0, 7.0] {
            let p = on_circle(k);
            let ccw = in_circumcircle(p, [a, b, c]);
            assert_eq!(ccw, in_circumcircle(p, [b, c, a]));
            assert_eq!(ccw, in_circumcircle(p, [a, c, b]));
        }
    }

    #[test]
    fn samples_pass_the_strict_test() {
        let mut rng = StdRng::seed_from_u64(7);
        let thin = [Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(50.0, 0.5)];
        for corners in [tri(), thin] {
            for _ in 0..500 {
                let p = sample_in_triangle(&mut rng, corners, SAMPLE_MARGIN);
                assert!(point_in_triangle(p, corners), "{p:?} escaped {corners:?}");
                let w = barycentric(p, corners).unwrap();
                assert!(w.iter().all(|&x| x >= SAMPLE_MARGIN - 1e-9));
            }
        }
    }

    #[test]
    fn bounding_box_and_centroids() {
        assert_eq!(bounding_box(&[]), None);
        let (min, max) = bounding_box(&tri()).unwrap();
        assert_eq!(min, Point::new(0.0, 0.0));
        assert_eq!(max, Point::new(4.0, 4.0));
        assert_eq!(vertex_centroid(&[]), None);
        assert_eq!(triangle_centroid(tri()), Point::new(4.0 / 3.0, 4.0 / 3.0));
        assert_eq!(triangle_area(tri()), 8.0);
    }
}
