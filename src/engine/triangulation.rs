// Triangle-set construction.
//
// Two strategies produce the same output type:
//   bowyer_watson()        - incremental Delaunay from a point cloud
//   triangles_from_edges() - 3-cliques read off an explicit, user-edited edge graph
//
// Both are quadratic in this direct form (no acceleration structure). That is
// the scaling boundary for this engine: tens to low hundreds of points.
//
// A TriangleSet is never edited vertex-by-vertex. Every rebuild produces a new
// set with a new generation, and the old one is replaced wholesale.

use std::collections::{HashMap, HashSet};

use super::error::TriangulationError;
use super::geometry::{
    self, EdgeRule, Point, bounding_box, in_circumcircle, is_degenerate, orient2d,
};

// ============================================================================
// TRIANGLES
// ============================================================================

/// Reference to one triangle of one specific `TriangleSet`.
///
/// `index` is a position in the set; `generation` identifies the set. A rebuild
/// bumps the generation, so every id handed out before it becomes stale and
/// must be re-resolved by the crowd repair passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleId {
    pub generation: u32,
    pub index: usize,
}

/// A non-degenerate triangle over a shared point table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Indices into the point table the set was built from.
    pub vertices: [usize; 3],
    /// Vertex coordinates, copied at build time.
    pub corners: [Point; 3],
    /// Set by obstacle marking after every rebuild. Never carried over.
    pub is_obstacle: bool,
}

impl Triangle {
    /// Build a triangle from point-table indices.
    /// Returns `None` if an index is out of range or the corners are collinear.
    pub fn new(vertices: [usize; 3], points: &[Point]) -> Option<Self> {
        let corners = [
            *points.get(vertices[0])?,
            *points.get(vertices[1])?,
            *points.get(vertices[2])?,
        ];
        if is_degenerate(corners) {
            return None;
        }
        Some(Self { vertices, corners, is_obstacle: false })
    }

    pub fn centroid(&self) -> Point {
        geometry::triangle_centroid(self.corners)
    }

    pub fn area(&self) -> f64 {
        geometry::triangle_area(self.corners)
    }

    /// Strict-interior containment (agent placement and location).
    pub fn contains(&self, p: Point) -> bool {
        geometry::point_in_triangle(p, self.corners)
    }

    /// Sign-based containment with an explicit edge rule.
    pub fn contains_with(&self, p: Point, rule: EdgeRule) -> bool {
        geometry::point_in_triangle_signed(p, self.corners, rule)
    }

    pub fn has_vertex(&self, v: usize) -> bool {
        self.vertices.contains(&v)
    }
}

/// The current triangle set, tagged with the generation that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleSet {
    generation: u32,
    triangles: Vec<Triangle>,
}

impl TriangleSet {
    /// Build a set from index triples. Degenerate or out-of-range triples are
    /// excluded, so every stored triangle has non-collinear corners.
    pub fn build(generation: u32, triples: &[[usize; 3]], points: &[Point]) -> Self {
        let triangles = triples
            .iter()
            .filter_map(|&t| Triangle::new(t, points))
            .collect();
        Self { generation, triangles }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn as_slice(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triangle> {
        self.triangles.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Triangle> {
        self.triangles.iter_mut()
    }

    /// Look up by position, ignoring generation. Used when re-resolving stale ids.
    pub fn get(&self, index: usize) -> Option<&Triangle> {
        self.triangles.get(index)
    }

    /// Look up by id. Stale ids (older generation) resolve to `None`.
    pub fn resolve(&self, id: TriangleId) -> Option<&Triangle> {
        if self.is_current(id) {
            self.triangles.get(id.index)
        } else {
            None
        }
    }

    pub fn is_current(&self, id: TriangleId) -> bool {
        id.generation == self.generation && id.index < self.triangles.len()
    }

    /// Id of the triangle at `index` in this generation.
    pub fn id(&self, index: usize) -> TriangleId {
        TriangleId { generation: self.generation, index }
    }

    /// Ids of every non-obstacle triangle, in stored order.
    pub fn open_ids(&self) -> Vec<TriangleId> {
        self.triangles
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_obstacle)
            .map(|(i, _)| self.id(i))
            .collect()
    }

    /// First non-obstacle triangle in stored order.
    pub fn first_open(&self) -> Option<TriangleId> {
        self.triangles.iter().position(|t| !t.is_obstacle).map(|i| self.id(i))
    }

    pub fn blocked_count(&self) -> usize {
        self.triangles.iter().filter(|t| t.is_obstacle).count()
    }

    pub fn total_area(&self) -> f64 {
        self.triangles.iter().map(Triangle::area).sum()
    }
}

// ============================================================================
// EDGES
// ============================================================================

/// Canonical key for an undirected edge: always (min, max).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey(pub usize, pub usize);

impl EdgeKey {
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b { EdgeKey(a, b) } else { EdgeKey(b, a) }
    }
}

/// De-duplicated, sorted set of undirected edges over a point table.
///
/// Kept as a sorted `Vec` so edges have stable positions for nearest-edge
/// queries while still behaving as a set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeSet {
    edges: Vec<EdgeKey>,
}

impl EdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every edge of every triangle in `triangles`.
    pub fn from_triangles(triangles: &TriangleSet) -> Self {
        let mut set = Self::new();
        for t in triangles.iter() {
            let [a, b, c] = t.vertices;
            set.insert(a, b);
            set.insert(b, c);
            set.insert(c, a);
        }
        set
    }

    /// Insert an edge. Self-loops are ignored. Returns true if it was new.
    pub fn insert(&mut self, a: usize, b: usize) -> bool {
        if a == b {
            return false;
        }
        let key = EdgeKey::new(a, b);
        match self.edges.binary_search(&key) {
            Ok(_) => false,
            Err(pos) => {
                self.edges.insert(pos, key);
                true
            }
        }
    }

    /// Remove an edge. Returns true if it was present.
    pub fn remove(&mut self, a: usize, b: usize) -> bool {
        match self.edges.binary_search(&EdgeKey::new(a, b)) {
            Ok(pos) => {
                self.edges.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, a: usize, b: usize) -> bool {
        self.edges.binary_search(&EdgeKey::new(a, b)).is_ok()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn as_slice(&self) -> &[EdgeKey] {
        &self.edges
    }

    pub fn iter(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edges.iter().copied()
    }
}

// ============================================================================
// DUPLICATE MERGING
// ============================================================================

/// Merge points whose coordinates match within `tolerance` on both axes.
///
/// Returns the unique points (first occurrence wins) and, for each unique
/// point, the index of that first occurrence in the input.
pub fn dedup_points(points: &[Point], tolerance: f64) -> (Vec<Point>, Vec<usize>) {
    let mut unique: Vec<Point> = Vec::with_capacity(points.len());
    let mut origin: Vec<usize> = Vec::with_capacity(points.len());
    for (i, &p) in points.iter().enumerate() {
        let duplicate = unique
            .iter()
            .any(|u| (u.x - p.x).abs() < tolerance && (u.y - p.y).abs() < tolerance);
        if !duplicate {
            unique.push(p);
            origin.push(i);
        }
    }
    (unique, origin)
}

// ============================================================================
// BOWYER-WATSON
// ============================================================================

/// Incremental Delaunay triangulation.
///
/// Points are de-duplicated first, then inserted in input order into a
/// super-triangle. Each insertion removes every triangle whose circumcircle
/// strictly contains the point, and fans new triangles from the point to the
/// boundary of the resulting cavity. Triangles still touching a super-triangle
/// vertex are discarded at the end.
///
/// Output triples index into `points` (the caller's table, not the merged one)
/// and are counter-clockwise.
pub fn bowyer_watson(
    points: &[Point],
    tolerance: f64,
) -> Result<Vec<[usize; 3]>, TriangulationError> {
    let (unique, origin) = dedup_points(points, tolerance);
    let n = unique.len();
    if n < 3 {
        return Err(TriangulationError::NotEnoughPoints(n));
    }

    let mut vertices = unique;
    vertices.extend(super_triangle(&vertices));

    let mut triangles: Vec<[usize; 3]> = vec![[n, n + 1, n + 2]];
    let mut edge_use: HashMap<EdgeKey, u32> = HashMap::new();

    for i in 0..n {
        let p = vertices[i];

        let (bad, good): (Vec<[usize; 3]>, Vec<[usize; 3]>) = triangles
            .into_iter()
            .partition(|t| in_circumcircle(p, corners_of(t, &vertices)));

        // Cavity boundary: edges used by exactly one bad triangle.
        edge_use.clear();
        for t in &bad {
            for (a, b) in directed_edges(t) {
                *edge_use.entry(EdgeKey::new(a, b)).or_insert(0) += 1;
            }
        }

        triangles = good;
        for t in &bad {
            for (a, b) in directed_edges(t) {
                if edge_use[&EdgeKey::new(a, b)] != 1 {
                    continue;
                }
                // Exactly collinear fans only; thin ones are still needed to
                // close the cavity and are filtered when the set is built.
                let fan = [a, b, i];
                let [pa, pb, pc] = corners_of(&fan, &vertices);
                if orient2d(pa, pb, pc) != 0.0 {
                    triangles.push(counter_clockwise(fan, &vertices));
                }
            }
        }
    }

    Ok(triangles
        .into_iter()
        .filter(|t| t.iter().all(|&v| v < n))
        .map(|t| t.map(|v| origin[v]))
        .collect())
}

/// Distance of the super-triangle vertices from the bounding-box centre, in
/// bounding-box extents. Large enough that the fake vertices only steal hull
/// edges from points lying almost on the hull.
const SUPER_TRIANGLE_SCALE: f64 = 100.0;

/// A triangle comfortably enclosing every point.
fn super_triangle(points: &[Point]) -> [Point; 3] {
    let (min, max) = bounding_box(points).unwrap_or((Point::ZERO, Point::ONE));
    let mid = (min + max) * 0.5;
    let reach = SUPER_TRIANGLE_SCALE * (max - min).max_element().max(1.0);
    [
        Point::new(mid.x - reach, mid.y - reach),
        Point::new(mid.x + reach, mid.y - reach),
        Point::new(mid.x, mid.y + reach),
    ]
}

fn corners_of(t: &[usize; 3], vertices: &[Point]) -> [Point; 3] {
    [vertices[t[0]], vertices[t[1]], vertices[t[2]]]
}

fn directed_edges(t: &[usize; 3]) -> [(usize, usize); 3] {
    [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])]
}

fn counter_clockwise(mut t: [usize; 3], vertices: &[Point]) -> [usize; 3] {
    if orient2d(vertices[t[0]], vertices[t[1]], vertices[t[2]]) < 0.0 {
        t.swap(1, 2);
    }
    t
}

// ============================================================================
// EDGE-GRAPH DERIVATION
// ============================================================================

/// Every 3-clique of the edge graph, as sorted index triples in discovery order.
///
/// Not Delaunay: manual edge edits map directly to triangles. Edges that
/// reference a vertex outside `0..point_count` are skipped.
pub fn triangles_from_edges(point_count: usize, edges: &EdgeSet) -> Vec<[usize; 3]> {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); point_count];
    for EdgeKey(u, v) in edges.iter() {
        if u < point_count && v < point_count {
            adjacency[u].push(v);
            adjacency[v].push(u);
        }
    }

    let mut seen: HashSet<[usize; 3]> = HashSet::new();
    let mut triples = Vec::new();
    for (u, neighbors) in adjacency.iter().enumerate() {
        for (i, &v) in neighbors.iter().enumerate() {
            for &w in &neighbors[i + 1..] {
                if !adjacency[v].contains(&w) {
                    continue;
                }
                let mut t = [u, v, w];
                t.sort_unstable();
                if seen.insert(t) {
                    triples.push(t);
                }
            }
        }
    }
    triples
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Build the triangle set for a point table.
///
/// With `edges == None` the table is Delaunay-triangulated; otherwise the
/// triangles are the 3-cliques of `edges`. Obstacle flags are all false on
/// return; marking is a separate step.
pub fn build_triangle_set(
    points: &[Point],
    edges: Option<&EdgeSet>,
    tolerance: f64,
    generation: u32,
) -> Result<TriangleSet, TriangulationError> {
    let triples = match edges {
        None => bowyer_watson(points, tolerance)?,
        Some(edges) => {
            if points.len() < 3 {
                return Err(TriangulationError::NotEnoughPoints(points.len()));
            }
            triangles_from_edges(points.len(), edges)
        }
    };
    Ok(TriangleSet::build(generation, &triples, points))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    #[test]
    fn edge_keys_are_canonical() {
        assert_eq!(EdgeKey::new(5, 2), EdgeKey(2, 5));
        let mut edges = EdgeSet::new();
        assert!(edges.insert(3, 1));
        assert!(!edges.insert(1, 3));
        assert!(!edges.insert(4, 4));
        assert!(edges.contains(3, 1));
        assert_eq!(edges.len(), 1);
        assert!(edges.remove(1, 3));
        assert!(!edges.remove(1, 3));
        assert!(edges.is_empty());
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0005, -0.0002),
            Point::new(2.0, 2.0),
        ];
        let (unique, origin) = dedup_points(&pts, 1e-3);
        assert_eq!(unique.len(), 3);
        assert_eq!(origin, vec![0, 1, 3]);
    }

    #[test]
    fn square_splits_into_two_triangles() {
        let triples = bowyer_watson(&square(), 1e-3).unwrap();
        assert_eq!(triples.len(), 2);
        let set = TriangleSet::build(0, &triples, &square());
        assert!((set.total_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn output_is_counter_clockwise_and_indexes_caller_table() {
        let mut pts = square();
        pts.push(Point::new(0.0, 0.0)); // duplicate of index 0
        pts.push(Point::new(5.0, 5.0));
        let triples = bowyer_watson(&pts, 1e-3).unwrap();
        assert_eq!(triples.len(), 4);
        for t in &triples {
            assert!(!t.contains(&4), "merged duplicate leaked into {t:?}");
            assert!(orient2d(pts[t[0]], pts[t[1]], pts[t[2]]) > 0.0);
        }
    }

    #[test]
    fn too_few_points_is_an_error() {
        let pts = [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 0.0)];
        assert_eq!(bowyer_watson(&pts, 1e-3), Err(TriangulationError::NotEnoughPoints(2)));
    }

    #[test]
    fn collinear_points_give_no_triangles() {
        let pts: Vec<Point> = (0..5).map(|i| Point::new(i as f64, 0.0)).collect();
        let set = build_triangle_set(&pts, None, 1e-3, 0).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn cliques_of_edge_graph() {
        // Square with one diagonal: two triangles sharing edge 0-2.
        let mut edges = EdgeSet::new();
        for (a, b) in [(0, 1), (1, 2), (2, 3), (3, 0), (0, 2)] {
            edges.insert(a, b);
        }
        let triples = triangles_from_edges(4, &edges);
        assert_eq!(triples, vec![[0, 1, 2], [0, 2, 3]]);

        // Both diagonals make K4: four triangles, none repeated.
        edges.insert(1, 3);
        assert_eq!(triangles_from_edges(4, &edges).len(), 4);
    }

    #[test]
    fn stale_edges_are_skipped() {
        let mut edges = EdgeSet::new();
        for (a, b) in [(0, 1), (1, 2), (2, 0), (2, 9), (9, 0)] {
            edges.insert(a, b);
        }
        assert_eq!(triangles_from_edges(3, &edges), vec![[0, 1, 2]]);
    }

    #[test]
    fn edge_graph_drops_collinear_cliques() {
        let pts = [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(2.0, 0.0)];
        let mut edges = EdgeSet::new();
        for (a, b) in [(0, 1), (1, 2), (2, 0)] {
            edges.insert(a, b);
        }
        let set = build_triangle_set(&pts, Some(&edges), 1e-3, 0).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn ids_go_stale_across_generations() {
        let old = build_triangle_set(&square(), None, 1e-3, 3).unwrap();
        let id = old.id(0);
        let new = build_triangle_set(&square(), None, 1e-3, 4).unwrap();
        assert!(old.resolve(id).is_some());
        assert!(new.resolve(id).is_none());
        assert!(new.get(id.index).is_some());
    }

    #[test]
    fn edge_rule_decides_shared_diagonal() {
        let set = build_triangle_set(&square(), None, 1e-3, 0).unwrap();
        let on_diagonal = Point::new(5.0, 5.0);
        assert!(set.iter().all(|t| !t.contains(on_diagonal)));
        assert!(set.iter().all(|t| !t.contains_with(on_diagonal, EdgeRule::Exclusive)));
        let inclusive = set.iter().filter(|t| t.contains_with(on_diagonal, EdgeRule::Inclusive));
        assert_eq!(inclusive.count(), 2);
    }

    #[test]
    fn edges_from_triangles() {
        let set = build_triangle_set(&square(), None, 1e-3, 0).unwrap();
        let edges = EdgeSet::from_triangles(&set);
        assert_eq!(edges.len(), 5);
    }
}
