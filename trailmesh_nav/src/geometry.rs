// Triangle geometry helpers.
//
// Horizontal tests (containment, orientation, height lookup) work on the XZ
// projection; `closest_point_on_triangle` is fully 3D. These are the
// primitives the zone queries, the funnel and the step clamper share.

use crate::types::Vec3;

/// Twice the signed area of `(a, b, c)` projected onto XZ.
///
/// Positive when `a -> b -> c` turns counter-clockwise in a chart with X to
/// the right and Z up.
pub fn cross_xz(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (b.x - a.x) * (c.z - a.z) - (b.z - a.z) * (c.x - a.x)
}

/// Horizontal distance between two points.
pub fn distance_xz(a: Vec3, b: Vec3) -> f32 {
    let dx = b.x - a.x;
    let dz = b.z - a.z;
    (dx * dx + dz * dz).sqrt()
}

/// Is `p` inside triangle `tri` when both are projected onto XZ?
///
/// `epsilon` is a distance: points up to that far outside an edge still
/// count, so a point on a shared edge belongs to both triangles. Triangles
/// with no horizontal extent contain nothing.
pub fn contains_xz(tri: [Vec3; 3], p: Vec3, epsilon: f32) -> bool {
    let area = cross_xz(tri[0], tri[1], tri[2]);
    if area.abs() <= f32::EPSILON {
        return false;
    }
    let sign = area.signum();
    for i in 0..3 {
        let a = tri[i];
        let b = tri[(i + 1) % 3];
        let len = distance_xz(a, b);
        if len > 0.0 && sign * cross_xz(a, b, p) < -epsilon * len {
            return false;
        }
    }
    true
}

/// Height of the triangle's plane directly above or below `p`.
///
/// Falls back to the mean corner height for triangles with no horizontal
/// extent.
pub fn height_at_xz(tri: [Vec3; 3], p: Vec3) -> f32 {
    let [a, b, c] = tri;
    let area = cross_xz(a, b, c);
    if area.abs() <= f32::EPSILON {
        return (a.y + b.y + c.y) / 3.0;
    }
    let wa = cross_xz(b, c, p) / area;
    let wb = cross_xz(c, a, p) / area;
    let wc = 1.0 - wa - wb;
    wa * a.y + wb * b.y + wc * c.y
}

/// Point of triangle `tri` nearest to `p` (Ericson, Real-Time Collision
/// Detection §5.1.5: Voronoi-region walk).
pub fn closest_point_on_triangle(tri: [Vec3; 3], p: Vec3) -> Vec3 {
    let [a, b, c] = tri;
    let ab = b - a;
    let ac = c - a;

    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Area of a 3D triangle.
pub fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (b - a).cross(c - a).length() * 0.5
}
