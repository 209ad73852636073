//! Seam alignment for circular primitives.
//!
//! Circular cross-sections are sampled starting at a per-geometry phase
//! angle. This pass walks the circular connection graph breadth-first,
//! transporting an "up" direction across each connection and deriving each
//! geometry's start angle from it, so that joined primitives tessellate to
//! matching seam vertices. Rectangular connections terminate propagation.

use std::collections::VecDeque;

use glam::{Mat3, Vec3};
use log::info;

use crate::store::{ConnectionId, GeometryId, Primitive, Store};

struct QueueItem {
    from: Option<GeometryId>,
    connection: ConnectionId,
    up_world: Vec3,
}

/// Assigns `sample_start_angle` to every circular primitive reachable
/// through circular connections. Linear in the number of connections.
pub fn align_seams(store: &mut Store) {
    let total = store.connection_ids().count();
    let circular = store
        .connection_ids()
        .filter(|&id| {
            let c = store.connection(id);
            c.flags.has_circular_side() && !c.flags.has_rectangular_side()
        })
        .count();

    let mut visited = vec![false; total];
    let mut queue = VecDeque::new();
    let mut components = 0u32;

    for seed in store.connection_ids() {
        if visited[seed.0 as usize] {
            continue;
        }
        let connection = *store.connection(seed);
        if connection.flags.has_rectangular_side() {
            continue;
        }

        // Any unit vector in the plane of intersection works as the seed
        // up; derive it from the dominant axis of the contact direction.
        let d = connection.d;
        let b = if d.x.abs() > d.y.abs() && d.x.abs() > d.z.abs() {
            Vec3::Y
        } else {
            Vec3::X
        };
        let up_world = d.cross(b).normalize();

        visited[seed.0 as usize] = true;
        queue.push_back(QueueItem {
            from: None,
            connection: seed,
            up_world,
        });
        while let Some(item) = queue.pop_front() {
            process(store, &mut queue, &mut visited, item);
        }
        components += 1;
    }

    info!("{components} seam components over {circular} circular connections");
}

fn process(store: &mut Store, queue: &mut VecDeque<QueueItem>, visited: &mut [bool], item: QueueItem) {
    let connection = *store.connection(item.connection);
    for side in 0..2 {
        let geo = connection.geos[side];
        if item.from == Some(geo) {
            continue;
        }
        match store.geometry(geo).primitive {
            Primitive::Snout { .. }
            | Primitive::EllipticalDish { .. }
            | Primitive::SphericalDish { .. }
            | Primitive::Cylinder { .. } => {
                handle_round(store, queue, visited, geo, item.up_world);
            }
            Primitive::CircularTorus { .. } => {
                handle_torus(store, queue, visited, geo, connection.offsets[side], item.up_world);
            }
            _ => unreachable!("non-circular geometry reached through a circular connection"),
        }
    }
}

/// Cylinders, snouts and dishes sample in their local xy-plane.
fn handle_round(
    store: &mut Store,
    queue: &mut VecDeque<QueueItem>,
    visited: &mut [bool],
    id: GeometryId,
    up_world: Vec3,
) {
    let m = Mat3::from(store.geometry(id).transform.matrix3);
    let mut up_local = m.inverse() * up_world.normalize();
    up_local.z = 0.0;

    let mut angle = up_local.y.atan2(up_local.x);
    if !angle.is_finite() {
        angle = 0.0;
    }
    store.geometry_mut(id).sample_start_angle = angle;

    let up_new = m * Vec3::new(angle.cos(), angle.sin(), 0.0);
    propagate(store, queue, visited, id, [up_new, up_new]);
}

/// The torus samples its tube in the local xz-plane, and its second end is
/// rotated by the sweep angle, so the transported up differs per end.
fn handle_torus(
    store: &mut Store,
    queue: &mut VecDeque<QueueItem>,
    visited: &mut [bool],
    id: GeometryId,
    slot: u32,
    up_world: Vec3,
) {
    let Primitive::CircularTorus { angle: sweep, .. } = store.geometry(id).primitive else {
        unreachable!("handle_torus on a non-torus");
    };
    let m = Mat3::from(store.geometry(id).transform.matrix3);
    let c = sweep.cos();
    let s = sweep.sin();

    let mut up_local = (m.inverse() * up_world).normalize();
    if slot == 1 {
        // Arriving through the far end: rotate back to the slot-0 frame.
        up_local = Vec3::new(
            c * up_local.x + s * up_local.y,
            -s * up_local.x + c * up_local.y,
            up_local.z,
        );
    }

    let mut angle = up_local.z.atan2(up_local.x);
    if !angle.is_finite() {
        angle = 0.0;
    }
    store.geometry_mut(id).sample_start_angle = angle;

    let up_new = Vec3::new(angle.cos(), 0.0, angle.sin());
    let ups = [
        m * up_new,
        m * Vec3::new(c * up_new.x - s * up_new.y, s * up_new.x + c * up_new.y, up_new.z),
    ];
    propagate(store, queue, visited, id, ups);
}

fn propagate(
    store: &Store,
    queue: &mut VecDeque<QueueItem>,
    visited: &mut [bool],
    id: GeometryId,
    ups: [Vec3; 2],
) {
    for (slot, up) in ups.into_iter().enumerate() {
        let Some(connection) = store.geometry(id).connections[slot] else {
            continue;
        };
        if store.connection(connection).flags.has_rectangular_side() {
            continue;
        }
        if visited[connection.0 as usize] {
            continue;
        }
        visited[connection.0 as usize] = true;
        queue.push_back(QueueItem {
            from: Some(id),
            connection,
            up_world: up,
        });
    }
}
