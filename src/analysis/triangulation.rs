/// Delaunay triangulation of scattered sample points.
///
/// Implements the incremental Bowyer-Watson algorithm: start from a super
/// triangle enclosing every sample, insert points one at a time by removing
/// all triangles whose circumcircle contains the new point and re-filling
/// the resulting cavity, then drop every triangle touching the super
/// triangle. The surviving triangles cover exactly the convex hull of the
/// input.
///
/// The triangulation is built once per interpolation request and queried
/// once per grid cell - the build is O(n²) worst case over tens of stations,
/// which is negligible next to the per-cell queries.

// ---------------------------------------------------------------------------
// Geometry primitives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }
}

/// Twice the signed area of triangle abc; positive when counter-clockwise.
fn orient(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// True when `p` lies strictly inside the circumcircle of the
/// counter-clockwise triangle abc. Degenerate (collinear) triangles report
/// no containment and therefore never get split.
fn in_circumcircle(a: Point, b: Point, c: Point, p: Point) -> bool {
    let ax = a.x - p.x;
    let ay = a.y - p.y;
    let bx = b.x - p.x;
    let by = b.y - p.y;
    let cx = c.x - p.x;
    let cy = c.y - p.y;

    let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
        - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);

    det > 1e-12
}

// ---------------------------------------------------------------------------
// Triangulation
// ---------------------------------------------------------------------------

/// A triangulated point set. Triangles are stored as counter-clockwise
/// vertex-index triples into `points`.
#[derive(Debug, Clone)]
pub struct Triangulation {
    points: Vec<Point>,
    triangles: Vec<[usize; 3]>,
}

impl Triangulation {
    /// Triangulates `points` with Bowyer-Watson. A fully collinear input
    /// yields an empty triangle set; callers treat that as "no coverage".
    pub fn build(points: &[Point]) -> Triangulation {
        let n = points.len();
        if n < 3 {
            return Triangulation { points: points.to_vec(), triangles: Vec::new() };
        }

        // Super triangle: scale well past the sample bounding box so no
        // sample circumcircle can reach its vertices.
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let cx = (min_x + max_x) / 2.0;
        let cy = (min_y + max_y) / 2.0;
        let span = (max_x - min_x).max(max_y - min_y).max(1.0);

        let mut verts = points.to_vec();
        verts.push(Point::new(cx - 30.0 * span, cy - 20.0 * span));
        verts.push(Point::new(cx + 30.0 * span, cy - 20.0 * span));
        verts.push(Point::new(cx, cy + 30.0 * span));

        let mut triangles: Vec<[usize; 3]> = vec![ccw(&verts, [n, n + 1, n + 2])];

        for i in 0..n {
            let p = verts[i];

            // Triangles whose circumcircle swallows the new point.
            let mut bad = Vec::new();
            for (t_idx, t) in triangles.iter().enumerate() {
                if in_circumcircle(verts[t[0]], verts[t[1]], verts[t[2]], p) {
                    bad.push(t_idx);
                }
            }

            // The cavity boundary: edges of bad triangles that are not
            // shared between two bad triangles.
            let mut edges: Vec<(usize, usize)> = Vec::new();
            for &t_idx in &bad {
                let t = triangles[t_idx];
                for e in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                    let key = (e.0.min(e.1), e.0.max(e.1));
                    if let Some(pos) = edges.iter().position(|&x| x == key) {
                        edges.swap_remove(pos);
                    } else {
                        edges.push(key);
                    }
                }
            }

            // Remove the cavity and re-triangulate it around the new point.
            let mut keep = Vec::with_capacity(triangles.len());
            for (t_idx, t) in triangles.iter().enumerate() {
                if !bad.contains(&t_idx) {
                    keep.push(*t);
                }
            }
            for (a, b) in edges {
                keep.push(ccw(&verts, [a, b, i]));
            }
            triangles = keep;
        }

        // Strip every triangle that still touches the super triangle.
        triangles.retain(|t| t.iter().all(|&v| v < n));

        Triangulation { points: points.to_vec(), triangles }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Linearly interpolates the value surface at (x, y).
    ///
    /// `values` must be parallel to the point set handed to `build`. Returns
    /// `None` when the query point lies outside the convex hull of the
    /// samples - the caller leaves those cells absent rather than
    /// extrapolating.
    pub fn interpolate(&self, values: &[f64], x: f64, y: f64) -> Option<f64> {
        for t in &self.triangles {
            let a = self.points[t[0]];
            let b = self.points[t[1]];
            let c = self.points[t[2]];

            let denom = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
            if denom.abs() < 1e-12 {
                continue;
            }

            let wa = ((b.y - c.y) * (x - c.x) + (c.x - b.x) * (y - c.y)) / denom;
            let wb = ((c.y - a.y) * (x - c.x) + (a.x - c.x) * (y - c.y)) / denom;
            let wc = 1.0 - wa - wb;

            // Small negative tolerance keeps hull-edge cells inside.
            const TOL: f64 = -1e-9;
            if wa >= TOL && wb >= TOL && wc >= TOL {
                return Some(wa * values[t[0]] + wb * values[t[1]] + wc * values[t[2]]);
            }
        }
        None
    }
}

/// Reorders a vertex triple to counter-clockwise orientation.
fn ccw(verts: &[Point], t: [usize; 3]) -> [usize; 3] {
    if orient(verts[t[0]], verts[t[1]], verts[t[2]]) < 0.0 {
        [t[0], t[2], t[1]]
    } else {
        t
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
