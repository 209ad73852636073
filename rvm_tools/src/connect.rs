//! Geometric connection discovery.
//!
//! Every primitive kind contributes a fixed set of face anchors (origin,
//! outward normal, face slot) in its local frame. Anchors are transformed
//! to world space and matched greedily: an ordered pair with antiparallel
//! normals within the distance tolerance becomes a connection, and the
//! matched anchor is withdrawn. The acceptance criterion mixes distance
//! and normal alignment, so the matching is a straightforward quadratic
//! scan rather than a spatial index.

use glam::Vec3;
use log::info;

use crate::bounds::Aabb;
use crate::store::{ConnectionFlags, Geometry, GeometryId, Primitive, Store};

/// Anchors closer than this (in metres) can connect.
const EPSILON: f32 = 1e-3;

#[derive(Clone, Copy)]
struct Anchor {
    geo: GeometryId,
    slot: u32,
    p: Vec3,
    n: Vec3,
    flags: ConnectionFlags,
}

/// A connected set of geometries with their combined world bounds.
#[derive(Debug)]
pub struct Component {
    pub geometries: Vec<GeometryId>,
    pub bbox: Aabb,
}

fn add_anchor(
    anchors: &mut Vec<Anchor>,
    geo: &Geometry,
    id: GeometryId,
    n: Vec3,
    p: Vec3,
    slot: u32,
    flags: ConnectionFlags,
) {
    let world_p = geo.transform.transform_point3(p);
    let world_n = geo.transform.transform_vector3(n).normalize();
    anchors.push(Anchor {
        geo: id,
        slot,
        p: world_p,
        n: world_n,
        flags,
    });
}

fn gather_anchors(store: &Store) -> Vec<Anchor> {
    let mut anchors = Vec::new();
    let circular = ConnectionFlags::HAS_CIRCULAR_SIDE;
    let rectangular = ConnectionFlags::HAS_RECTANGULAR_SIDE;

    for id in store.geometry_ids() {
        let geo = store.geometry(id);
        match geo.primitive {
            Primitive::Pyramid {
                bottom,
                top,
                offset,
                height,
            } => {
                let bx = 0.5 * bottom[0];
                let by = 0.5 * bottom[1];
                let tx = 0.5 * top[0];
                let ty = 0.5 * top[1];
                let ox = 0.5 * offset[0];
                let oy = 0.5 * offset[1];
                let h2 = 0.5 * height;
                let n = [
                    Vec3::new(0.0, -h2, (-ty + oy) - (-by - oy)),
                    Vec3::new(h2, 0.0, -((tx + ox) - (bx - ox))),
                    Vec3::new(0.0, h2, -((ty + oy) - (by - oy))),
                    Vec3::new(-h2, 0.0, (-tx + ox) - (-bx - ox)),
                    Vec3::new(0.0, 0.0, -1.0),
                    Vec3::new(0.0, 0.0, 1.0),
                ];
                let p = [
                    Vec3::new(0.0, -0.5 * (by + ty), 0.0),
                    Vec3::new(0.5 * (bx + tx), 0.0, 0.0),
                    Vec3::new(0.0, 0.5 * (by + ty), 0.0),
                    Vec3::new(-0.5 * (bx + tx), 0.0, 0.0),
                    Vec3::new(-ox, -oy, -h2),
                    Vec3::new(ox, oy, h2),
                ];
                for i in 0..6 {
                    add_anchor(&mut anchors, geo, id, n[i], p[i], i as u32, rectangular);
                }
            }

            Primitive::Box { lengths } => {
                let xp = 0.5 * lengths[0];
                let yp = 0.5 * lengths[1];
                let zp = 0.5 * lengths[2];
                let n = [
                    Vec3::NEG_X,
                    Vec3::X,
                    Vec3::NEG_Y,
                    Vec3::Y,
                    Vec3::NEG_Z,
                    Vec3::Z,
                ];
                let p = [
                    Vec3::new(-xp, 0.0, 0.0),
                    Vec3::new(xp, 0.0, 0.0),
                    Vec3::new(0.0, -yp, 0.0),
                    Vec3::new(0.0, yp, 0.0),
                    Vec3::new(0.0, 0.0, -zp),
                    Vec3::new(0.0, 0.0, zp),
                ];
                for i in 0..6 {
                    add_anchor(&mut anchors, geo, id, n[i], p[i], i as u32, rectangular);
                }
            }

            Primitive::RectangularTorus {
                inner_radius,
                outer_radius,
                angle,
                ..
            } => {
                let c = angle.cos();
                let s = angle.sin();
                let m = 0.5 * (inner_radius + outer_radius);
                let n = [Vec3::new(0.0, -1.0, 0.0), Vec3::new(-s, c, 0.0)];
                let p = [Vec3::new(m, 0.0, 0.0), Vec3::new(m * c, m * s, 0.0)];
                for i in 0..2 {
                    add_anchor(&mut anchors, geo, id, n[i], p[i], i as u32, rectangular);
                }
            }

            Primitive::CircularTorus { offset, angle, .. } => {
                let c = angle.cos();
                let s = angle.sin();
                let n = [Vec3::new(0.0, -1.0, 0.0), Vec3::new(-s, c, 0.0)];
                let p = [
                    Vec3::new(offset, 0.0, 0.0),
                    Vec3::new(offset * c, offset * s, 0.0),
                ];
                for i in 0..2 {
                    add_anchor(&mut anchors, geo, id, n[i], p[i], i as u32, circular);
                }
            }

            Primitive::EllipticalDish { .. } | Primitive::SphericalDish { .. } => {
                add_anchor(&mut anchors, geo, id, Vec3::NEG_Z, Vec3::ZERO, 0, circular);
            }

            Primitive::Snout {
                height,
                offset,
                bshear,
                tshear,
                ..
            } => {
                let n = [
                    Vec3::new(
                        bshear[0].sin() * bshear[1].cos(),
                        bshear[1].sin(),
                        -bshear[0].cos() * bshear[1].cos(),
                    ),
                    Vec3::new(
                        -tshear[0].sin() * tshear[1].cos(),
                        -tshear[1].sin(),
                        tshear[0].cos() * tshear[1].cos(),
                    ),
                ];
                let p = [
                    Vec3::new(-0.5 * offset[0], -0.5 * offset[1], -0.5 * height),
                    Vec3::new(0.5 * offset[0], 0.5 * offset[1], 0.5 * height),
                ];
                for i in 0..2 {
                    add_anchor(&mut anchors, geo, id, n[i], p[i], i as u32, circular);
                }
            }

            Primitive::Cylinder { height, .. } => {
                let n = [Vec3::NEG_Z, Vec3::Z];
                let p = [
                    Vec3::new(0.0, 0.0, -0.5 * height),
                    Vec3::new(0.0, 0.0, 0.5 * height),
                ];
                for i in 0..2 {
                    add_anchor(&mut anchors, geo, id, n[i], p[i], i as u32, circular);
                }
            }

            Primitive::Sphere { .. } | Primitive::Line { .. } | Primitive::FacetGroup { .. } => {}
        }
    }
    anchors
}

/// Matches face anchors into connections and records them on the store,
/// then groups the geometries into connected components.
pub fn connect(store: &mut Store) -> Vec<Component> {
    let mut anchors = gather_anchors(store);
    let total = anchors.len();
    let mut matched = 0usize;

    let mut active = anchors.len();
    let mut j = 0;
    while j < active {
        let mut best: Option<usize> = None;
        let mut best_dist = f32::MAX;
        for i in (j + 1)..active {
            // A primitive never connects to itself; a torus bent through a
            // full revolution would otherwise match its own ends.
            if anchors[i].geo == anchors[j].geo {
                continue;
            }
            if anchors[j].n.dot(anchors[i].n) < -0.9 {
                let dist = anchors[j].p.distance_squared(anchors[i].p);
                if dist < best_dist {
                    best_dist = dist;
                    best = Some(i);
                }
            }
        }
        if let Some(i) = best {
            if best_dist < EPSILON * EPSILON {
                let a = anchors[j];
                let b = anchors[i];
                store.new_connection(
                    [a.geo, b.geo],
                    [a.slot, b.slot],
                    0.5 * (a.p + b.p),
                    (a.n - b.n).normalize(),
                    a.flags.union(b.flags),
                );
                matched += 1;
                anchors.swap(i, active - 1);
                active -= 1;
            }
        }
        j += 1;
    }

    let components = connected_components(store);
    info!(
        "{matched} connections from {total} anchors, {} connected components",
        components.len()
    );
    components
}

fn connected_components(store: &Store) -> Vec<Component> {
    let count = store.geometry_count() as usize;
    let mut visited = vec![false; count];
    let mut components = Vec::new();

    for seed in store.geometry_ids() {
        if visited[seed.0 as usize] {
            continue;
        }
        let mut geometries = Vec::new();
        let mut bbox = Aabb::EMPTY;
        let mut stack = vec![seed];
        visited[seed.0 as usize] = true;
        while let Some(id) = stack.pop() {
            let geo = store.geometry(id);
            bbox.engulf(&geo.bbox_world);
            geometries.push(id);
            for connection in geo.connections.iter().flatten() {
                let (other, _) = store.connection(*connection).other_side(id);
                if !visited[other.0 as usize] {
                    visited[other.0 as usize] = true;
                    stack.push(other);
                }
            }
        }
        components.push(Component { geometries, bbox });
    }
    components
}
