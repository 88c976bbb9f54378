//! Polygon triangulation.
//!
//! Turns a simple polygon boundary (optionally with holes) into a vertex
//! list and a list of counter-clockwise triangle index triples via ear
//! clipping. Holes are joined to the outer ring with bridge edges first,
//! so the clipping loop only ever sees one ring.
//!
//! Triangulation is pure: no shared state, deterministic for identical
//! input. All work happens in the XY plane; the z coordinate is carried
//! through untouched.

use glam::{Vec2, Vec3};

use crate::error::GeometryError;

/// Boundaries whose absolute signed area falls below this are rejected
/// as [`GeometryError::ZeroArea`].
pub const AREA_EPSILON: f32 = 1e-6;

/// A simple polygon: one exterior ring and zero or more hole rings.
///
/// Rings may be given in either winding and may repeat their first point
/// as an explicit closing point; both are normalized before
/// triangulation. Points are 3D, with 2D input mapping to z = 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    exterior: Vec<Vec3>,
    holes: Vec<Vec<Vec3>>,
}

impl Polygon {
    /// Create a polygon from its exterior ring.
    pub fn new(exterior: Vec<Vec3>) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    /// Create a polygon from 2D points at z = 0.
    pub fn from_xy(points: &[[f32; 2]]) -> Self {
        Self::new(points.iter().map(|p| Vec3::new(p[0], p[1], 0.0)).collect())
    }

    /// Create a polygon from 3D points.
    pub fn from_xyz(points: &[[f32; 3]]) -> Self {
        Self::new(points.iter().map(|p| Vec3::from_array(*p)).collect())
    }

    /// Add a hole ring nested inside the exterior.
    pub fn with_hole(mut self, hole: Vec<Vec3>) -> Self {
        self.holes.push(hole);
        self
    }

    /// Add a hole ring from 2D points at z = 0.
    pub fn with_hole_xy(self, points: &[[f32; 2]]) -> Self {
        self.with_hole(points.iter().map(|p| Vec3::new(p[0], p[1], 0.0)).collect())
    }

    /// Get the exterior ring.
    pub fn exterior(&self) -> &[Vec3] {
        &self.exterior
    }

    /// Get the hole rings.
    pub fn holes(&self) -> &[Vec<Vec3>] {
        &self.holes
    }
}

/// Output of [`triangulate`]: a vertex list and CCW triangle triples
/// indexing into it.
///
/// The vertices are the normalized ring points in spliced order. Joining
/// a hole to the exterior duplicates the two bridge endpoints; those
/// duplicates are the only points this implementation inserts beyond the
/// input boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangulatedPolygon {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

impl TriangulatedPolygon {
    /// Get the vertex positions.
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Get the triangle index triples. Every index is within
    /// `0..vertex_count()` and every triple is counter-clockwise.
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Number of vertices. This is the itemsize the polygon contributes
    /// when appended to a collection.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

/// Triangulate a simple polygon, possibly with holes.
///
/// The exterior is normalized to counter-clockwise winding and holes to
/// clockwise before clipping, so output orientation does not depend on
/// input winding. A hole-free polygon that is already a triangle
/// short-circuits to its own points and a single triple.
///
/// # Errors
///
/// [`GeometryError::TooFewPoints`] or [`GeometryError::ZeroArea`] for
/// degenerate rings, and [`GeometryError::Degenerate`] when no ear can be
/// clipped or a hole cannot reach the outer boundary, which is how a
/// detected self-intersection surfaces.
pub fn triangulate(polygon: &Polygon) -> Result<TriangulatedPolygon, GeometryError> {
    let mut ring = sanitize_ring(polygon.exterior())?;
    if signed_area(&ring) < 0.0 {
        ring.reverse();
    }

    if ring.len() == 3 && polygon.holes().is_empty() {
        return Ok(TriangulatedPolygon {
            vertices: ring,
            triangles: vec![[0, 1, 2]],
        });
    }

    // Holes wind clockwise so the spliced ring stays CCW-traversable.
    let mut holes = Vec::with_capacity(polygon.holes().len());
    for hole in polygon.holes() {
        let mut hole = sanitize_ring(hole)?;
        if signed_area(&hole) > 0.0 {
            hole.reverse();
        }
        holes.push(hole);
    }
    holes.sort_by(|a, b| rightmost_x(b).total_cmp(&rightmost_x(a)));

    for k in 0..holes.len() {
        let (merged, pending) = holes.split_at(k + 1);
        bridge_hole(&mut ring, &merged[k], pending)?;
    }

    let triangles = earclip(&ring)?;
    Ok(TriangulatedPolygon {
        vertices: ring,
        triangles,
    })
}

/// Drop consecutive duplicates and an explicit closing point, then check
/// the ring is big enough and encloses area.
fn sanitize_ring(points: &[Vec3]) -> Result<Vec<Vec3>, GeometryError> {
    let mut ring: Vec<Vec3> = Vec::with_capacity(points.len());
    for &p in points {
        if ring.last().map_or(true, |q| q.truncate() != p.truncate()) {
            ring.push(p);
        }
    }
    while ring.len() > 1 && ring[0].truncate() == ring[ring.len() - 1].truncate() {
        ring.pop();
    }
    if ring.len() < 3 {
        return Err(GeometryError::TooFewPoints { count: ring.len() });
    }
    if signed_area(&ring).abs() <= AREA_EPSILON {
        return Err(GeometryError::ZeroArea);
    }
    Ok(ring)
}

/// Shoelace area in the XY plane. Positive for counter-clockwise rings.
fn signed_area(ring: &[Vec3]) -> f32 {
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    0.5 * sum
}

fn rightmost_x(ring: &[Vec3]) -> f32 {
    ring.iter().fold(f32::NEG_INFINITY, |acc, p| acc.max(p.x))
}

/// Join a hole to the ring by splicing it in at a mutually visible
/// vertex pair, duplicating both bridge endpoints.
///
/// The bridge starts at the hole's rightmost vertex and lands on the
/// nearest ring vertex whose connecting segment crosses no edge of the
/// ring, the hole itself, or any hole not yet merged.
fn bridge_hole(
    ring: &mut Vec<Vec3>,
    hole: &[Vec3],
    pending: &[Vec<Vec3>],
) -> Result<(), GeometryError> {
    let mut h = 0;
    for (i, p) in hole.iter().enumerate() {
        if p.x > hole[h].x {
            h = i;
        }
    }
    let hp = hole[h].truncate();

    let mut candidates: Vec<usize> = (0..ring.len()).collect();
    candidates.sort_by(|&a, &b| {
        ring[a]
            .truncate()
            .distance_squared(hp)
            .total_cmp(&ring[b].truncate().distance_squared(hp))
    });

    let mut chosen = None;
    {
        let mut obstacles: Vec<&[Vec3]> = vec![ring.as_slice(), hole];
        obstacles.extend(pending.iter().map(|p| p.as_slice()));
        for b in candidates {
            if bridge_is_clear(hp, ring[b].truncate(), &obstacles) {
                chosen = Some(b);
                break;
            }
        }
    }
    let b = chosen
        .ok_or_else(|| GeometryError::Degenerate("hole cannot see the outer boundary".into()))?;

    // ..., ring[b], hole[h], ..around the hole.., hole[h], ring[b], ...
    let m = hole.len();
    let mut insert: Vec<Vec3> = Vec::with_capacity(m + 2);
    for k in 0..=m {
        insert.push(hole[(h + k) % m]);
    }
    insert.push(ring[b]);
    ring.splice(b + 1..b + 1, insert);
    Ok(())
}

/// Check that segment `p`-`q` properly crosses no edge of any obstacle
/// ring. Contact at shared endpoints does not count as a crossing.
fn bridge_is_clear(p: Vec2, q: Vec2, obstacles: &[&[Vec3]]) -> bool {
    for ring in obstacles {
        let m = ring.len();
        for i in 0..m {
            let a = ring[i].truncate();
            let b = ring[(i + 1) % m].truncate();
            if segments_cross(p, q, a, b) {
                return false;
            }
        }
    }
    true
}

fn segments_cross(p1: Vec2, p2: Vec2, q1: Vec2, q2: Vec2) -> bool {
    let d1 = (p2 - p1).perp_dot(q1 - p1);
    let d2 = (p2 - p1).perp_dot(q2 - p1);
    let d3 = (q2 - q1).perp_dot(p1 - q1);
    let d4 = (q2 - q1).perp_dot(p2 - q1);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// Ear-clip a CCW ring into triangles.
///
/// A full pass over the remaining ring without clipping a single ear
/// means the boundary self-intersects or has collapsed numerically, and
/// fails rather than emitting a partial cover.
fn earclip(ring: &[Vec3]) -> Result<Vec<[u32; 3]>, GeometryError> {
    let pts: Vec<Vec2> = ring.iter().map(|p| p.truncate()).collect();
    let mut idx: Vec<u32> = (0..ring.len() as u32).collect();
    let mut triangles = Vec::with_capacity(ring.len() - 2);

    let mut i = 0;
    let mut stalled = 0;
    while idx.len() > 3 {
        let m = idx.len();
        let a = idx[(i + m - 1) % m];
        let b = idx[i];
        let c = idx[(i + 1) % m];
        if is_ear(&pts, &idx, a, b, c) {
            triangles.push([a, b, c]);
            idx.remove(i);
            if i >= idx.len() {
                i = 0;
            }
            stalled = 0;
        } else {
            i += 1;
            if i >= m {
                i = 0;
            }
            stalled += 1;
            if stalled > m {
                return Err(GeometryError::Degenerate(
                    "no ear found; the boundary likely self-intersects".into(),
                ));
            }
        }
    }

    let (a, b, c) = (idx[0], idx[1], idx[2]);
    if corner_cross(&pts, a, b, c) <= 0.0 {
        return Err(GeometryError::Degenerate(
            "final triangle has no area".into(),
        ));
    }
    triangles.push([a, b, c]);
    Ok(triangles)
}

fn corner_cross(pts: &[Vec2], a: u32, b: u32, c: u32) -> f32 {
    let (pa, pb, pc) = (pts[a as usize], pts[b as usize], pts[c as usize]);
    (pb - pa).perp_dot(pc - pb)
}

/// A corner is an ear when it is strictly convex and no other remaining
/// ring vertex lies inside its triangle. Vertices whose position equals
/// one of the corners (bridge duplicates) never block an ear.
fn is_ear(pts: &[Vec2], idx: &[u32], a: u32, b: u32, c: u32) -> bool {
    if corner_cross(pts, a, b, c) <= 0.0 {
        return false;
    }
    let (pa, pb, pc) = (pts[a as usize], pts[b as usize], pts[c as usize]);
    for &j in idx {
        if j == a || j == b || j == c {
            continue;
        }
        let p = pts[j as usize];
        if p == pa || p == pb || p == pc {
            continue;
        }
        if point_in_triangle(p, pa, pb, pc) {
            return false;
        }
    }
    true
}

/// Inclusive point-in-triangle test for a CCW triangle; points on an
/// edge count as inside so they keep blocking the ear.
fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    (b - a).perp_dot(p - a) >= 0.0
        && (c - b).perp_dot(p - b) >= 0.0
        && (a - c).perp_dot(p - c) >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_area_sum(mesh: &TriangulatedPolygon) -> f32 {
        mesh.triangles()
            .iter()
            .map(|&[a, b, c]| {
                let pa = mesh.vertices()[a as usize].truncate();
                let pb = mesh.vertices()[b as usize].truncate();
                let pc = mesh.vertices()[c as usize].truncate();
                0.5 * (pb - pa).perp_dot(pc - pa)
            })
            .sum()
    }

    fn assert_all_ccw(mesh: &TriangulatedPolygon) {
        for &[a, b, c] in mesh.triangles() {
            let pa = mesh.vertices()[a as usize].truncate();
            let pb = mesh.vertices()[b as usize].truncate();
            let pc = mesh.vertices()[c as usize].truncate();
            assert!(
                (pb - pa).perp_dot(pc - pa) > 0.0,
                "triangle [{a}, {b}, {c}] is not counter-clockwise"
            );
        }
    }

    #[test]
    fn test_triangle_short_circuit() {
        let polygon = Polygon::from_xy(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        let mesh = triangulate(&polygon).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangles(), &[[0, 1, 2]]);
        // No inserted points: the vertices are exactly the input.
        assert_eq!(mesh.vertices(), polygon.exterior());
    }

    #[test]
    fn test_unit_square() {
        let polygon = Polygon::from_xy(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        let mesh = triangulate(&polygon).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        for &[a, b, c] in mesh.triangles() {
            assert!(a < 4 && b < 4 && c < 4);
        }
        assert_all_ccw(&mesh);
        assert!((triangle_area_sum(&mesh) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_convex_polygon_triangle_count() {
        // Regular octagon: m - 2 triangles, area sum matches the shoelace.
        let m = 8;
        let points: Vec<[f32; 2]> = (0..m)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / m as f32;
                [angle.cos(), angle.sin()]
            })
            .collect();
        let polygon = Polygon::from_xy(&points);
        let expected_area = signed_area(polygon.exterior());

        let mesh = triangulate(&polygon).unwrap();
        assert_eq!(mesh.triangle_count(), m - 2);
        assert_all_ccw(&mesh);
        assert!((triangle_area_sum(&mesh) - expected_area).abs() < 1e-4);
    }

    #[test]
    fn test_concave_polygon() {
        // L-shape, area 3.
        let polygon = Polygon::from_xy(&[
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 2.0],
            [0.0, 2.0],
        ]);
        let mesh = triangulate(&polygon).unwrap();
        assert_eq!(mesh.triangle_count(), 4);
        assert_all_ccw(&mesh);
        assert!((triangle_area_sum(&mesh) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_clockwise_input_normalized() {
        let ccw = Polygon::from_xy(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        let cw = Polygon::from_xy(&[[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]);
        let mesh = triangulate(&cw).unwrap();
        assert_eq!(mesh.triangle_count(), triangulate(&ccw).unwrap().triangle_count());
        assert_all_ccw(&mesh);
    }

    #[test]
    fn test_closing_point_dropped() {
        let polygon = Polygon::from_xy(&[
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [0.0, 0.0],
        ]);
        let mesh = triangulate(&polygon).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_polygon_with_hole() {
        let polygon = Polygon::from_xy(&[[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]])
            .with_hole_xy(&[[1.0, 1.0], [3.0, 1.0], [3.0, 3.0], [1.0, 3.0]]);
        let mesh = triangulate(&polygon).unwrap();
        // Bridging duplicates two vertices: 4 + 4 + 2 = 10 ring points.
        assert_eq!(mesh.vertex_count(), 10);
        assert_eq!(mesh.triangle_count(), 8);
        assert_all_ccw(&mesh);
        assert!((triangle_area_sum(&mesh) - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_too_few_points() {
        let polygon = Polygon::from_xy(&[[0.0, 0.0], [1.0, 0.0]]);
        assert_eq!(
            triangulate(&polygon),
            Err(GeometryError::TooFewPoints { count: 2 })
        );
    }

    #[test]
    fn test_duplicate_points_rejected() {
        let polygon = Polygon::from_xy(&[[0.0, 0.0], [0.0, 0.0], [1.0, 0.0], [1.0, 0.0]]);
        assert_eq!(
            triangulate(&polygon),
            Err(GeometryError::TooFewPoints { count: 2 })
        );
    }

    #[test]
    fn test_self_intersecting_boundary_rejected() {
        // Bowtie-like boundary that crosses itself; triangulation must
        // fail hard instead of emitting a partial cover.
        let polygon = Polygon::from_xy(&[
            [0.0, 0.0],
            [4.0, 0.0],
            [4.0, 4.0],
            [2.0, -1.0],
            [0.0, 4.0],
        ]);
        assert!(matches!(
            triangulate(&polygon),
            Err(GeometryError::Degenerate(_))
        ));
    }

    #[test]
    fn test_zero_area_rejected() {
        let polygon = Polygon::from_xy(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]);
        assert_eq!(triangulate(&polygon), Err(GeometryError::ZeroArea));
    }

    #[test]
    fn test_z_carried_through() {
        let polygon = Polygon::from_xyz(&[
            [0.0, 0.0, 0.5],
            [1.0, 0.0, 0.5],
            [1.0, 1.0, 0.5],
            [0.0, 1.0, 0.5],
        ]);
        let mesh = triangulate(&polygon).unwrap();
        assert!(mesh.vertices().iter().all(|v| v.z == 0.5));
    }

    #[test]
    fn test_deterministic() {
        let polygon = Polygon::from_xy(&[
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 1.0],
            [1.0, 1.0],
            [1.0, 2.0],
            [0.0, 2.0],
        ]);
        assert_eq!(triangulate(&polygon).unwrap(), triangulate(&polygon).unwrap());
    }
}
