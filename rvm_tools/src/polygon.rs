//! Planar polygon triangulation with holes.
//!
//! Facet-group polygons arrive as contours of 3D vertices: one boundary
//! and optionally holes, all roughly coplanar. The polygon is projected to
//! its best-fit plane, the holes are bridged into the boundary, and the
//! resulting simple polygon is ear-clipped. Triangles index into the
//! concatenation of the input contours, so per-vertex data such as
//! normals carries over without a remap table.

use glam::{Vec2, Vec3};

/// Triangulates a polygon given as contours of 3D vertices.
///
/// The contour with the largest area is the boundary, the rest are holes.
/// Returns index triples into the concatenated contour vertices. Severely
/// degenerate input yields fewer triangles, possibly none.
pub fn triangulate(contours: &[&[Vec3]]) -> Vec<[u32; 3]> {
    let mut base = Vec::with_capacity(contours.len());
    let mut total = 0u32;
    for contour in contours {
        base.push(total);
        total += contour.len() as u32;
    }

    // Best-fit plane from the contour with the strongest Newell normal.
    let mut normal = Vec3::ZERO;
    for contour in contours {
        let n = newell_normal(contour);
        if n.length_squared() > normal.length_squared() {
            normal = n;
        }
    }
    if normal.length_squared() < 1e-20 {
        return Vec::new();
    }
    let normal = normal.normalize();
    let u = pick_orthogonal(normal);
    let v = normal.cross(u);

    // Projected positions, addressed by global index.
    let mut points = Vec::with_capacity(total as usize);
    for contour in contours {
        for p in *contour {
            points.push(Vec2::new(p.dot(u), p.dot(v)));
        }
    }

    let ring_of = |ci: usize| -> Vec<u32> {
        (0..contours[ci].len() as u32).map(|i| base[ci] + i).collect()
    };

    let mut outer_ci = 0;
    let mut outer_area = 0.0f32;
    for (ci, contour) in contours.iter().enumerate() {
        if contour.len() < 3 {
            continue;
        }
        let area = signed_area(&ring_of(ci), &points).abs();
        if area > outer_area {
            outer_area = area;
            outer_ci = ci;
        }
    }
    if outer_area <= 0.0 {
        return Vec::new();
    }

    let mut ring = ring_of(outer_ci);
    if signed_area(&ring, &points) < 0.0 {
        ring.reverse();
    }

    let mut holes: Vec<Vec<u32>> = Vec::new();
    for (ci, contour) in contours.iter().enumerate() {
        if ci == outer_ci || contour.len() < 3 {
            continue;
        }
        let mut hole = ring_of(ci);
        if signed_area(&hole, &points) > 0.0 {
            hole.reverse();
        }
        holes.push(hole);
    }
    // Bridging from the rightmost vertex first keeps bridges from crossing
    // holes that are still pending.
    holes.sort_by(|a, b| {
        let ax = a.iter().map(|&i| points[i as usize].x).fold(f32::MIN, f32::max);
        let bx = b.iter().map(|&i| points[i as usize].x).fold(f32::MIN, f32::max);
        bx.partial_cmp(&ax).unwrap_or(std::cmp::Ordering::Equal)
    });

    for hole in &holes {
        bridge_hole(&mut ring, hole, &holes, &points);
    }

    ear_clip(ring, &points)
}

fn newell_normal(contour: &[Vec3]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for (i, a) in contour.iter().enumerate() {
        let b = contour[(i + 1) % contour.len()];
        n += Vec3::new(
            (a.y - b.y) * (a.z + b.z),
            (a.z - b.z) * (a.x + b.x),
            (a.x - b.x) * (a.y + b.y),
        );
    }
    n
}

fn pick_orthogonal(n: Vec3) -> Vec3 {
    let axis = if n.x.abs() < n.y.abs() && n.x.abs() < n.z.abs() {
        Vec3::X
    } else if n.y.abs() < n.z.abs() {
        Vec3::Y
    } else {
        Vec3::Z
    };
    n.cross(axis).normalize()
}

fn signed_area(ring: &[u32], points: &[Vec2]) -> f32 {
    let mut area = 0.0;
    for (i, &a) in ring.iter().enumerate() {
        let b = ring[(i + 1) % ring.len()];
        let pa = points[a as usize];
        let pb = points[b as usize];
        area += pa.x * pb.y - pb.x * pa.y;
    }
    0.5 * area
}

fn cross2(o: Vec2, a: Vec2, b: Vec2) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Proper intersection of open segments; shared endpoints do not count.
fn segments_cross(a0: Vec2, a1: Vec2, b0: Vec2, b1: Vec2) -> bool {
    let d1 = cross2(b0, b1, a0);
    let d2 = cross2(b0, b1, a1);
    let d3 = cross2(a0, a1, b0);
    let d4 = cross2(a0, a1, b1);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

fn bridge_is_clear(a: Vec2, b: Vec2, rings: &[&[u32]], points: &[Vec2]) -> bool {
    for ring in rings {
        for (i, &e0) in ring.iter().enumerate() {
            let e1 = ring[(i + 1) % ring.len()];
            let p0 = points[e0 as usize];
            let p1 = points[e1 as usize];
            if (p0 == a && p1 == b) || (p0 == b && p1 == a) {
                continue;
            }
            if segments_cross(a, b, p0, p1) {
                return false;
            }
        }
    }
    true
}

/// Splices a hole into the boundary through a mutually visible vertex
/// pair, doubling both bridge endpoints.
fn bridge_hole(ring: &mut Vec<u32>, hole: &[u32], holes: &[Vec<u32>], points: &[Vec2]) {
    // Rightmost hole vertex, a conventional bridge start.
    let h_pos = (0..hole.len())
        .max_by(|&a, &b| {
            let ax = points[hole[a] as usize].x;
            let bx = points[hole[b] as usize].x;
            ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap();
    let h = points[hole[h_pos] as usize];

    let mut candidates: Vec<usize> = (0..ring.len()).collect();
    candidates.sort_by(|&a, &b| {
        let da = points[ring[a] as usize].distance_squared(h);
        let db = points[ring[b] as usize].distance_squared(h);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut obstacles: Vec<&[u32]> = vec![ring.as_slice(), hole];
    for other in holes {
        if other.as_slice() != hole {
            obstacles.push(other);
        }
    }

    let w_pos = candidates
        .iter()
        .copied()
        .find(|&w| bridge_is_clear(h, points[ring[w] as usize], &obstacles, points))
        // Nothing is visible only for self-intersecting input; take the
        // nearest vertex and accept the overlap.
        .unwrap_or(candidates[0]);

    let mut spliced = Vec::with_capacity(ring.len() + hole.len() + 2);
    spliced.extend_from_slice(&ring[..=w_pos]);
    for k in 0..=hole.len() {
        spliced.push(hole[(h_pos + k) % hole.len()]);
    }
    spliced.push(ring[w_pos]);
    spliced.extend_from_slice(&ring[w_pos + 1..]);
    *ring = spliced;
}

fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let d1 = cross2(a, b, p);
    let d2 = cross2(b, c, p);
    let d3 = cross2(c, a, p);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

fn ear_clip(mut ring: Vec<u32>, points: &[Vec2]) -> Vec<[u32; 3]> {
    let mut triangles = Vec::new();

    while ring.len() >= 3 {
        let n = ring.len();
        let mut clipped = false;
        let mut best = 0usize;
        let mut best_cross = f32::MIN;

        for i in 0..n {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let (a, b, c) = (
                points[prev as usize],
                points[cur as usize],
                points[next as usize],
            );
            let cross = cross2(a, b, c);
            if cross > best_cross {
                best_cross = cross;
                best = i;
            }
            if cross <= 1e-12 {
                continue;
            }
            let blocked = ring.iter().any(|&other| {
                if other == prev || other == cur || other == next {
                    return false;
                }
                let p = points[other as usize];
                // Bridge duplicates share coordinates with ring vertices.
                if p == a || p == b || p == c {
                    return false;
                }
                point_in_triangle(p, a, b, c)
            });
            if blocked {
                continue;
            }
            triangles.push([prev, cur, next]);
            ring.remove(i);
            clipped = true;
            break;
        }

        if !clipped {
            // No clean ear: force progress on the most convex corner, or
            // drop a collinear vertex without emitting anything.
            let prev = ring[(best + n - 1) % n];
            let cur = ring[best];
            let next = ring[(best + 1) % n];
            if best_cross > 1e-12 {
                triangles.push([prev, cur, next]);
            }
            ring.remove(best);
        }
    }

    triangles
}
