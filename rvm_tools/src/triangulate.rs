//! Primitive-to-mesh constructions.
//!
//! Each construction samples curves adaptively so that the sagitta (the
//! deviation of a chord from its arc) stays within the tolerance, and
//! omits caps that abut a matching interface on a connected neighbor.
//! All meshes are emitted in the primitive's local frame; consumers apply
//! the geometry transform.

use std::collections::HashSet;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec3;
use log::warn;

use crate::bounds::{matrix_scale, Aabb};
use crate::polygon;
use crate::store::{Connection, Geometry, Primitive, Store, Triangulation};

/// The surface two connected faces share: the cap is dropped only when
/// both sides agree on it.
enum Interface {
    Square([Vec3; 4]),
    Circular(f32),
    Undefined,
}

pub(crate) struct TriangulationFactory {
    tolerance: f32,
    min_samples: u32,
    max_samples: u32,
    pub(crate) discarded_caps: u32,
    nagged_contours: HashSet<u32>,
}

fn quad_indices(indices: &mut Vec<u32>, o: u32, v0: u32, v1: u32, v2: u32, v3: u32) {
    indices.extend_from_slice(&[o + v0, o + v1, o + v2, o + v2, o + v3, o + v0]);
}

/// Fans a closed vertex ring into triangles, halving the ring until it is
/// consumed.
fn tessellate_circle(indices: &mut Vec<u32>, ring: &mut Vec<u32>) {
    let mut scratch = Vec::with_capacity(ring.len());
    while ring.len() >= 3 {
        scratch.clear();
        let n = ring.len();
        let mut i = 0;
        while i + 2 < n {
            indices.extend_from_slice(&[ring[i], ring[i + 1], ring[i + 2]]);
            scratch.push(ring[i]);
            i += 2;
        }
        while i < n {
            scratch.push(ring[i]);
            i += 1;
        }
        std::mem::swap(ring, &mut scratch);
    }
}

impl TriangulationFactory {
    pub(crate) fn new(tolerance: f32, min_samples: u32, max_samples: u32) -> Self {
        Self {
            tolerance,
            min_samples,
            max_samples: max_samples.max(min_samples),
            discarded_caps: 0,
            nagged_contours: HashSet::new(),
        }
    }

    /// Segments needed so the sagitta of `arc` at `radius` stays within
    /// tolerance, clamped to the configured sample range.
    fn segment_count(&self, arc: f32, radius: f32, scale: f32) -> u32 {
        let samples = arc / (1.0 - self.tolerance / (scale * radius)).max(-1.0).acos();
        (samples.ceil() as u32)
            .max(self.min_samples)
            .min(self.max_samples)
    }

    fn sagitta_error(&self, arc: f32, radius: f32, scale: f32, segments: u32) -> f32 {
        scale * radius * (1.0 - (arc / segments as f32).cos())
    }

    fn interface(&self, geo: &Geometry, slot: u32) -> Interface {
        let scale = matrix_scale(&geo.transform);
        match geo.primitive {
            Primitive::Pyramid {
                bottom,
                top,
                offset,
                height,
            } => {
                let (quad, _) = pyramid_quads(bottom, top, offset, height);
                let o = slot as usize;
                let corners = if o < 4 {
                    let oo = (o + 1) & 3;
                    [quad[0][o], quad[0][oo], quad[1][oo], quad[1][o]]
                } else {
                    quad[o - 4]
                };
                Interface::Square(corners.map(|p| geo.transform.transform_point3(p)))
            }
            Primitive::Box { lengths } => {
                let corners = box_faces(lengths).0[slot as usize];
                Interface::Square(corners.map(|p| geo.transform.transform_point3(p)))
            }
            Primitive::RectangularTorus {
                inner_radius,
                outer_radius,
                height,
                angle,
            } => {
                let h2 = 0.5 * height;
                let square = [
                    [outer_radius, -h2],
                    [inner_radius, -h2],
                    [inner_radius, h2],
                    [outer_radius, h2],
                ];
                let corners = if slot == 0 {
                    square.map(|[r, z]| Vec3::new(r, 0.0, z))
                } else {
                    square.map(|[r, z]| Vec3::new(r * angle.cos(), r * angle.sin(), z))
                };
                Interface::Square(corners.map(|p| geo.transform.transform_point3(p)))
            }
            Primitive::CircularTorus { radius, .. } => Interface::Circular(scale * radius),
            Primitive::EllipticalDish { base_radius, .. } => {
                Interface::Circular(scale * base_radius)
            }
            Primitive::SphericalDish {
                base_radius,
                height,
            } => {
                let r_sphere = (base_radius * base_radius + height * height) / (2.0 * height);
                Interface::Circular(scale * r_sphere)
            }
            Primitive::Snout {
                radius_b, radius_t, ..
            } => Interface::Circular(scale * if slot == 0 { radius_b } else { radius_t }),
            Primitive::Cylinder { radius, .. } => Interface::Circular(scale * radius),
            Primitive::Sphere { .. } | Primitive::Line { .. } | Primitive::FacetGroup { .. } => {
                Interface::Undefined
            }
        }
    }

    /// Both faces of a connection describe the same surface: circular
    /// interfaces must agree on radius within 5%, square interfaces must
    /// have all corners within a millimetre. The test is symmetric so cap
    /// elision is too.
    fn interfaces_match(&self, store: &Store, connection: &Connection) -> bool {
        let a = store.geometry(connection.geos[0]);
        let b = store.geometry(connection.geos[1]);
        let ia = self.interface(a, connection.offsets[0]);
        let ib = self.interface(b, connection.offsets[1]);
        match (ia, ib) {
            (Interface::Circular(ra), Interface::Circular(rb)) => {
                ra <= 1.05 * rb && rb <= 1.05 * ra
            }
            (Interface::Square(pa), Interface::Square(pb)) => {
                let close = |ps: &[Vec3; 4], qs: &[Vec3; 4]| {
                    ps.iter().all(|p| {
                        qs.iter()
                            .any(|q| p.distance_squared(*q) < 0.001 * 0.001)
                    })
                };
                close(&pa, &pb) && close(&pb, &pa)
            }
            _ => false,
        }
    }

    /// A cap is dropped when its connection is purely of the given side
    /// kind and the two interfaces coincide.
    fn elide_cap(&mut self, store: &Store, geo: &Geometry, slot: usize, circular: bool) -> bool {
        let Some(connection) = geo.connections[slot] else {
            return false;
        };
        let connection = store.connection(connection);
        let pure = if circular {
            connection.flags.has_circular_side() && !connection.flags.has_rectangular_side()
        } else {
            connection.flags.has_rectangular_side() && !connection.flags.has_circular_side()
        };
        if pure && self.interfaces_match(store, connection) {
            self.discarded_caps += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn pyramid(&mut self, store: &Store, geo: &Geometry) -> Triangulation {
        let Primitive::Pyramid {
            bottom,
            top,
            offset,
            height,
        } = geo.primitive
        else {
            unreachable!()
        };
        let (quad, h2) = pyramid_quads(bottom, top, offset, height);

        let n = [
            Vec3::new(0.0, -h2, quad[1][0].y - quad[0][0].y),
            Vec3::new(h2, 0.0, -(quad[1][1].x - quad[0][1].x)),
            Vec3::new(0.0, h2, -(quad[1][2].y - quad[0][2].y)),
            Vec3::new(-h2, 0.0, quad[1][3].x - quad[0][3].x),
            Vec3::NEG_Z,
            Vec3::Z,
        ];

        let mut cap = [
            true,
            true,
            true,
            true,
            1e-7 <= bottom[0].abs().min(bottom[1].abs()),
            1e-7 <= top[0].abs().min(top[1].abs()),
        ];
        for (i, keep) in cap.iter_mut().enumerate() {
            if *keep && self.elide_cap(store, geo, i, false) {
                *keep = false;
            }
        }

        let mut tri = Triangulation::default();
        for i in 0..4 {
            if !cap[i] {
                continue;
            }
            let ii = (i + 1) & 3;
            let o = tri.vertices.len() as u32;
            tri.vertices.extend_from_slice(&[
                quad[0][i],
                quad[0][ii],
                quad[1][ii],
                quad[1][i],
            ]);
            tri.normals.extend_from_slice(&[n[i]; 4]);
            quad_indices(&mut tri.indices, o, 0, 1, 2, 3);
        }
        if cap[4] {
            let o = tri.vertices.len() as u32;
            tri.vertices.extend_from_slice(&quad[0]);
            tri.normals.extend_from_slice(&[n[4]; 4]);
            quad_indices(&mut tri.indices, o, 3, 2, 1, 0);
        }
        if cap[5] {
            let o = tri.vertices.len() as u32;
            tri.vertices.extend_from_slice(&quad[1]);
            tri.normals.extend_from_slice(&[n[5]; 4]);
            quad_indices(&mut tri.indices, o, 0, 1, 2, 3);
        }
        tri
    }

    pub(crate) fn cuboid(&mut self, store: &Store, geo: &Geometry) -> Triangulation {
        let Primitive::Box { lengths } = geo.primitive else {
            unreachable!()
        };
        let (faces, normals) = box_faces(lengths);

        // A face has zero extent when either dimension it spans collapses.
        let x = 1e-5 <= lengths[0];
        let y = 1e-5 <= lengths[1];
        let z = 1e-5 <= lengths[2];
        let mut keep = [y && z, y && z, x && z, x && z, x && y, x && y];
        for (i, keep) in keep.iter_mut().enumerate() {
            if *keep && self.elide_cap(store, geo, i, false) {
                *keep = false;
            }
        }

        let mut tri = Triangulation::default();
        for f in 0..6 {
            if !keep[f] {
                continue;
            }
            let o = tri.vertices.len() as u32;
            tri.vertices.extend_from_slice(&faces[f]);
            tri.normals.extend_from_slice(&[normals[f]; 4]);
            quad_indices(&mut tri.indices, o, 0, 1, 2, 3);
        }
        tri
    }

    pub(crate) fn rectangular_torus(
        &mut self,
        store: &Store,
        geo: &Geometry,
        scale: f32,
    ) -> Triangulation {
        let Primitive::RectangularTorus {
            inner_radius,
            outer_radius,
            height,
            angle,
        } = geo.primitive
        else {
            unreachable!()
        };
        let segments = self.segment_count(angle, outer_radius, scale);
        // The sweep is open, so the last segment needs its own sample.
        let samples = (segments + 1) as usize;

        let mut tri = Triangulation {
            error: self.sagitta_error(angle, outer_radius, scale, segments),
            ..Default::default()
        };

        let mut cap = [true, true];
        for (i, keep) in cap.iter_mut().enumerate() {
            if self.elide_cap(store, geo, i, false) {
                *keep = false;
            }
        }

        let h2 = 0.5 * height;
        let square = [
            [outer_radius, -h2],
            [inner_radius, -h2],
            [inner_radius, h2],
            [outer_radius, h2],
        ];

        let arc: Vec<(f32, f32)> = (0..samples)
            .map(|i| {
                let t = (angle / segments as f32) * i as f32;
                (t.cos(), t.sin())
            })
            .collect();

        for &(c, s) in &arc {
            let n = [
                Vec3::NEG_Z,
                Vec3::new(-c, -s, 0.0),
                Vec3::Z,
                Vec3::new(c, s, 0.0),
            ];
            for k in 0..4 {
                let kk = (k + 1) & 3;
                tri.vertices
                    .push(Vec3::new(square[k][0] * c, square[k][0] * s, square[k][1]));
                tri.vertices
                    .push(Vec3::new(square[kk][0] * c, square[kk][0] * s, square[kk][1]));
                tri.normals.extend_from_slice(&[n[k]; 2]);
            }
        }
        for i in 0..samples - 1 {
            for k in 0..4u32 {
                let a = 8 * i as u32 + 2 * k;
                let b = 8 * (i as u32 + 1) + 2 * k;
                tri.indices.extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]);
            }
        }
        let mut o = 8 * samples as u32;

        if cap[0] {
            for corner in square {
                tri.vertices.push(Vec3::new(corner[0], 0.0, corner[1]));
                tri.normals.push(Vec3::NEG_Y);
            }
            tri.indices
                .extend_from_slice(&[o, o + 2, o + 1, o + 2, o, o + 3]);
            o += 4;
        }
        if cap[1] {
            let (c, s) = arc[samples - 1];
            for corner in square {
                tri.vertices
                    .push(Vec3::new(corner[0] * c, corner[0] * s, corner[1]));
                tri.normals.push(Vec3::new(-s, c, 0.0));
            }
            quad_indices(&mut tri.indices, o, 0, 1, 2, 3);
        }
        tri
    }

    pub(crate) fn circular_torus(
        &mut self,
        store: &Store,
        geo: &Geometry,
        scale: f32,
    ) -> Triangulation {
        let Primitive::CircularTorus {
            offset,
            radius,
            angle,
        } = geo.primitive
        else {
            unreachable!()
        };
        // Two independent sample counts: along the sweep at the outer
        // radius, and around the tube.
        let segments_l = self.segment_count(angle, offset + radius, scale);
        let segments_s = self.segment_count(TAU, radius, scale);
        let samples_l = (segments_l + 1) as usize; // open sweep
        let samples_s = segments_s as usize; // closed ring

        let mut tri = Triangulation {
            error: self
                .sagitta_error(angle, offset + radius, scale, segments_l)
                .max(self.sagitta_error(TAU, radius, scale, segments_s)),
            ..Default::default()
        };

        let mut cap = [true, true];
        for (i, keep) in cap.iter_mut().enumerate() {
            if self.elide_cap(store, geo, i, true) {
                *keep = false;
            }
        }

        let sweep: Vec<(f32, f32)> = (0..samples_l)
            .map(|i| {
                let t = (angle / (samples_l as f32 - 1.0)) * i as f32;
                (t.cos(), t.sin())
            })
            .collect();
        let ring: Vec<(f32, f32)> = (0..samples_s)
            .map(|i| {
                let t = (TAU / samples_s as f32) * i as f32 + geo.sample_start_angle;
                (t.cos(), t.sin())
            })
            .collect();

        for &(tc, ts) in &sweep {
            for &(pc, ps) in &ring {
                tri.normals.push(Vec3::new(pc * tc, pc * ts, ps));
                tri.vertices.push(Vec3::new(
                    (radius * pc + offset) * tc,
                    (radius * pc + offset) * ts,
                    radius * ps,
                ));
            }
        }
        if cap[0] {
            for &(pc, ps) in &ring {
                tri.normals.push(Vec3::NEG_Y);
                tri.vertices
                    .push(Vec3::new(radius * pc + offset, 0.0, radius * ps));
            }
        }
        if cap[1] {
            let (tc, ts) = sweep[samples_l - 1];
            for &(pc, ps) in &ring {
                tri.normals.push(Vec3::new(-ts, tc, 0.0));
                tri.vertices.push(Vec3::new(
                    (radius * pc + offset) * tc,
                    (radius * pc + offset) * ts,
                    radius * ps,
                ));
            }
        }

        let s = samples_s as u32;
        for u in 0..samples_l as u32 - 1 {
            for v in 0..s - 1 {
                tri.indices.extend_from_slice(&[
                    s * u + v,
                    s * (u + 1) + v,
                    s * (u + 1) + v + 1,
                    s * (u + 1) + v + 1,
                    s * u + v + 1,
                    s * u + v,
                ]);
            }
            tri.indices.extend_from_slice(&[
                s * u + (s - 1),
                s * (u + 1) + (s - 1),
                s * (u + 1),
                s * (u + 1),
                s * u,
                s * u + (s - 1),
            ]);
        }
        let mut o = samples_l as u32 * s;
        if cap[0] {
            let mut fan: Vec<u32> = (0..s).map(|i| o + i).collect();
            tessellate_circle(&mut tri.indices, &mut fan);
            o += s;
        }
        if cap[1] {
            let mut fan: Vec<u32> = (0..s).map(|i| o + (s - 1) - i).collect();
            tessellate_circle(&mut tri.indices, &mut fan);
        }
        tri
    }

    pub(crate) fn snout(&mut self, store: &Store, geo: &Geometry, scale: f32) -> Triangulation {
        let Primitive::Snout {
            radius_b,
            radius_t,
            height,
            offset,
            bshear,
            tshear,
        } = geo.primitive
        else {
            unreachable!()
        };
        let radius_max = radius_b.max(radius_t);
        let segments = self.segment_count(TAU, radius_max, scale);
        let samples = segments as usize; // closed ring

        let mut tri = Triangulation {
            error: self.sagitta_error(TAU, radius_max, scale, segments),
            ..Default::default()
        };

        let mut cap = [true, true];
        for (i, keep) in cap.iter_mut().enumerate() {
            if self.elide_cap(store, geo, i, true) {
                *keep = false;
            }
        }

        let ring: Vec<(f32, f32)> = (0..samples)
            .map(|i| {
                let t = (TAU / samples as f32) * i as f32 + geo.sample_start_angle;
                (t.cos(), t.sin())
            })
            .collect();

        let h2 = 0.5 * height;
        let ox = 0.5 * offset[0];
        let oy = 0.5 * offset[1];
        let mb = [bshear[0].tan(), bshear[1].tan()];
        let mt = [tshear[0].tan(), tshear[1].tan()];

        for &(c, s) in &ring {
            let xb = radius_b * c - ox;
            let yb = radius_b * s - oy;
            let zb = -h2 + mb[0] * radius_b * c + mb[1] * radius_b * s;

            let xt = radius_t * c + ox;
            let yt = radius_t * s + oy;
            let zt = h2 + mt[0] * radius_t * c + mt[1] * radius_t * s;

            let shift = offset[0] * c + offset[1] * s;
            let n = Vec3::new(c, s, -(radius_t - radius_b + shift) / height);

            tri.vertices.push(Vec3::new(xb, yb, zb));
            tri.vertices.push(Vec3::new(xt, yt, zt));
            tri.normals.extend_from_slice(&[n; 2]);
        }
        if cap[0] {
            let n = Vec3::new(
                bshear[0].sin() * bshear[1].cos(),
                bshear[1].sin(),
                -bshear[0].cos() * bshear[1].cos(),
            );
            for &(c, s) in &ring {
                tri.vertices.push(Vec3::new(
                    radius_b * c - ox,
                    radius_b * s - oy,
                    -h2 + mb[0] * radius_b * c + mb[1] * radius_b * s,
                ));
                tri.normals.push(n);
            }
        }
        if cap[1] {
            let n = Vec3::new(
                -tshear[0].sin() * tshear[1].cos(),
                -tshear[1].sin(),
                tshear[0].cos() * tshear[1].cos(),
            );
            for &(c, s) in &ring {
                tri.vertices.push(Vec3::new(
                    radius_t * c + ox,
                    radius_t * s + oy,
                    h2 + mt[0] * radius_t * c + mt[1] * radius_t * s,
                ));
                tri.normals.push(n);
            }
        }

        let n = samples as u32;
        for i in 0..n {
            let ii = (i + 1) % n;
            quad_indices(&mut tri.indices, 0, 2 * i, 2 * ii, 2 * ii + 1, 2 * i + 1);
        }
        let mut o = 2 * n;
        if cap[0] {
            let mut fan: Vec<u32> = (0..n).map(|i| o + (n - 1) - i).collect();
            tessellate_circle(&mut tri.indices, &mut fan);
            o += n;
        }
        if cap[1] {
            let mut fan: Vec<u32> = (0..n).map(|i| o + i).collect();
            tessellate_circle(&mut tri.indices, &mut fan);
        }
        tri
    }

    pub(crate) fn cylinder(&mut self, store: &Store, geo: &Geometry, scale: f32) -> Triangulation {
        let Primitive::Cylinder { radius, height } = geo.primitive else {
            unreachable!()
        };
        let segments = self.segment_count(TAU, radius, scale);
        let samples = segments as usize; // closed ring

        let mut tri = Triangulation {
            error: self.sagitta_error(TAU, radius, scale, segments),
            ..Default::default()
        };

        let mut cap = [true, true];
        for (i, keep) in cap.iter_mut().enumerate() {
            if self.elide_cap(store, geo, i, true) {
                *keep = false;
            }
        }

        let ring: Vec<(f32, f32)> = (0..samples)
            .map(|i| {
                let t = (TAU / samples as f32) * i as f32 + geo.sample_start_angle;
                (t.cos(), t.sin())
            })
            .collect();

        let h2 = 0.5 * height;
        for &(c, s) in &ring {
            tri.vertices.push(Vec3::new(radius * c, radius * s, -h2));
            tri.vertices.push(Vec3::new(radius * c, radius * s, h2));
            tri.normals.extend_from_slice(&[Vec3::new(c, s, 0.0); 2]);
        }
        if cap[0] {
            for &(c, s) in &ring {
                tri.vertices.push(Vec3::new(radius * c, radius * s, -h2));
                tri.normals.push(Vec3::NEG_Z);
            }
        }
        if cap[1] {
            for &(c, s) in &ring {
                tri.vertices.push(Vec3::new(radius * c, radius * s, h2));
                tri.normals.push(Vec3::Z);
            }
        }

        let n = samples as u32;
        for i in 0..n {
            let ii = (i + 1) % n;
            quad_indices(&mut tri.indices, 0, 2 * i, 2 * ii, 2 * ii + 1, 2 * i + 1);
        }
        let mut o = 2 * n;
        if cap[0] {
            let mut fan: Vec<u32> = (0..n).map(|i| o + (n - 1) - i).collect();
            tessellate_circle(&mut tri.indices, &mut fan);
            o += n;
        }
        if cap[1] {
            let mut fan: Vec<u32> = (0..n).map(|i| o + i).collect();
            tessellate_circle(&mut tri.indices, &mut fan);
        }
        tri
    }

    /// Ring-stack sphere approximation shared by the sphere and both dish
    /// kinds: sampled to `arc` from the pole, compressed by `scale_z` and
    /// shifted along z. Rings get adaptive sample counts, and transitions
    /// between rings of different counts are stitched with bridging fans.
    pub(crate) fn sphere_based(
        &mut self,
        geo: &Geometry,
        radius: f32,
        arc: f32,
        shift_z: f32,
        scale_z: f32,
        scale: f32,
    ) -> Triangulation {
        let segments = self.segment_count(TAU, radius, scale);
        let samples = segments; // closed ring

        let mut tri = Triangulation {
            error: self.sagitta_error(TAU, radius, scale, samples),
            ..Default::default()
        };

        let mut arc = arc;
        let is_sphere = PI - 1e-3 <= arc;
        if is_sphere {
            arc = PI;
        }

        let min_rings = 3;
        let rings = ((scale_z * samples as f32 * arc * (1.0 / TAU)) as u32).max(min_rings) as usize;

        let theta_scale = arc / (rings as f32 - 1.0);
        let mut ring_samples = Vec::with_capacity(rings);
        let mut ring_trig = Vec::with_capacity(rings);
        for r in 0..rings {
            let theta = theta_scale * r as f32;
            ring_trig.push((theta.cos(), theta.sin()));
            ring_samples.push((theta.sin() * samples as f32).max(3.0) as u32);
        }
        ring_samples[0] = 1;
        if is_sphere {
            ring_samples[rings - 1] = 1;
        }

        for r in 0..rings {
            let (nz, w) = ring_trig[r];
            let z = radius * scale_z * nz + shift_z;
            let n = ring_samples[r];
            let phi_scale = TAU / n as f32;
            for i in 0..n {
                let phi = phi_scale * i as f32 + geo.sample_start_angle;
                let nx = w * phi.cos();
                let ny = w * phi.sin();
                tri.normals.push(Vec3::new(nx, ny, nz / scale_z));
                tri.vertices.push(Vec3::new(radius * nx, radius * ny, z));
            }
        }

        let mut o_c = 0u32;
        for r in 0..rings - 1 {
            let n_c = ring_samples[r];
            let n_n = ring_samples[r + 1];
            let o_n = o_c + n_c;

            if n_c < n_n {
                for i_n in 0..n_n {
                    let ii_n = i_n + 1;
                    let mut i_c = (n_c * (i_n + 1)) / n_n;
                    let mut ii_c = (n_c * (ii_n + 1)) / n_n;
                    i_c %= n_c;
                    ii_c %= n_c;
                    let ii_n = ii_n % n_n;

                    if i_c != ii_c {
                        tri.indices
                            .extend_from_slice(&[o_c + i_c, o_n + ii_n, o_c + ii_c]);
                    }
                    tri.indices
                        .extend_from_slice(&[o_c + i_c, o_n + i_n, o_n + ii_n]);
                }
            } else {
                for i_c in 0..n_c {
                    let ii_c = i_c + 1;
                    let mut i_n = (n_n * i_c) / n_c;
                    let mut ii_n = (n_n * ii_c) / n_c;
                    i_n %= n_n;
                    ii_n %= n_n;
                    let ii_c = ii_c % n_c;

                    tri.indices
                        .extend_from_slice(&[o_c + i_c, o_n + ii_n, o_c + ii_c]);
                    if i_n != ii_n {
                        tri.indices
                            .extend_from_slice(&[o_c + i_c, o_n + i_n, o_n + ii_n]);
                    }
                }
            }
            o_c = o_n;
        }
        tri
    }

    pub(crate) fn facet_group(&mut self, geo: &Geometry) -> Triangulation {
        let Primitive::FacetGroup { polygons } = &geo.primitive else {
            unreachable!()
        };

        let mut tri = Triangulation::default();
        for polygon in polygons {
            if polygon.contours.len() == 1 && polygon.contours[0].positions.len() == 3 {
                let contour = &polygon.contours[0];
                let o = tri.vertices.len() as u32;
                tri.vertices.extend_from_slice(&contour.positions);
                tri.normals.extend_from_slice(&contour.normals);
                tri.indices.extend_from_slice(&[o, o + 1, o + 2]);
            } else if polygon.contours.len() == 1 && polygon.contours[0].positions.len() == 4 {
                let contour = &polygon.contours[0];
                let o = tri.vertices.len() as u32;
                tri.vertices.extend_from_slice(&contour.positions);
                tri.normals.extend_from_slice(&contour.normals);

                // Split along the diagonal whose pair of corner normals
                // folds the least.
                let v = &contour.positions;
                let e01 = v[1] - v[0];
                let e12 = v[2] - v[1];
                let e23 = v[3] - v[2];
                let e30 = v[0] - v[3];
                let n0 = e01.cross(e30);
                let n1 = e12.cross(e01);
                let n2 = e23.cross(e12);
                let n3 = e30.cross(e23);
                if n0.dot(n2) < n1.dot(n3) {
                    tri.indices
                        .extend_from_slice(&[o, o + 1, o + 2, o + 2, o + 3, o]);
                } else {
                    tri.indices
                        .extend_from_slice(&[o + 3, o, o + 1, o + 1, o + 2, o + 3]);
                }
            } else {
                // The general case: recenter for conditioning, triangulate
                // with holes, then emit with the original coordinates.
                let mut bbox = Aabb::EMPTY;
                for contour in &polygon.contours {
                    for &p in &contour.positions {
                        bbox.engulf_point(p);
                    }
                }
                let mid = bbox.midpoint();

                let mut shifted: Vec<Vec<Vec3>> = Vec::new();
                let mut kept = Vec::new();
                for contour in &polygon.contours {
                    if contour.positions.len() < 3 {
                        let n = contour.positions.len() as u32;
                        if self.nagged_contours.insert(n) {
                            warn!("Ignoring degenerate contour with {n} vertices.");
                        }
                        continue;
                    }
                    shifted.push(contour.positions.iter().map(|&p| p - mid).collect());
                    kept.push(contour);
                }
                if kept.is_empty() {
                    warn!("Ignoring polygon with no valid contours.");
                    continue;
                }

                let refs: Vec<&[Vec3]> = shifted.iter().map(|c| c.as_slice()).collect();
                let triangles = polygon::triangulate(&refs);
                if triangles.is_empty() {
                    continue;
                }

                let o = tri.vertices.len() as u32;
                for contour in kept {
                    tri.vertices.extend_from_slice(&contour.positions);
                    tri.normals.extend_from_slice(&contour.normals);
                }
                for t in triangles {
                    tri.indices
                        .extend_from_slice(&[o + t[0], o + t[1], o + t[2]]);
                }
            }
        }
        tri
    }
}

fn pyramid_quads(
    bottom: [f32; 2],
    top: [f32; 2],
    offset: [f32; 2],
    height: f32,
) -> ([[Vec3; 4]; 2], f32) {
    let bx = 0.5 * bottom[0];
    let by = 0.5 * bottom[1];
    let tx = 0.5 * top[0];
    let ty = 0.5 * top[1];
    let ox = 0.5 * offset[0];
    let oy = 0.5 * offset[1];
    let h2 = 0.5 * height;
    let quad = [
        [
            Vec3::new(-bx - ox, -by - oy, -h2),
            Vec3::new(bx - ox, -by - oy, -h2),
            Vec3::new(bx - ox, by - oy, -h2),
            Vec3::new(-bx - ox, by - oy, -h2),
        ],
        [
            Vec3::new(-tx + ox, -ty + oy, h2),
            Vec3::new(tx + ox, -ty + oy, h2),
            Vec3::new(tx + ox, ty + oy, h2),
            Vec3::new(-tx + ox, ty + oy, h2),
        ],
    ];
    (quad, h2)
}

fn box_faces(lengths: [f32; 3]) -> ([[Vec3; 4]; 6], [Vec3; 6]) {
    let xp = 0.5 * lengths[0];
    let xm = -xp;
    let yp = 0.5 * lengths[1];
    let ym = -yp;
    let zp = 0.5 * lengths[2];
    let zm = -zp;
    let faces = [
        [
            Vec3::new(xm, ym, zp),
            Vec3::new(xm, yp, zp),
            Vec3::new(xm, yp, zm),
            Vec3::new(xm, ym, zm),
        ],
        [
            Vec3::new(xp, ym, zm),
            Vec3::new(xp, yp, zm),
            Vec3::new(xp, yp, zp),
            Vec3::new(xp, ym, zp),
        ],
        [
            Vec3::new(xp, ym, zm),
            Vec3::new(xp, ym, zp),
            Vec3::new(xm, ym, zp),
            Vec3::new(xm, ym, zm),
        ],
        [
            Vec3::new(xm, yp, zm),
            Vec3::new(xm, yp, zp),
            Vec3::new(xp, yp, zp),
            Vec3::new(xp, yp, zm),
        ],
        [
            Vec3::new(xm, yp, zm),
            Vec3::new(xp, yp, zm),
            Vec3::new(xp, ym, zm),
            Vec3::new(xm, ym, zm),
        ],
        [
            Vec3::new(xm, ym, zp),
            Vec3::new(xp, ym, zp),
            Vec3::new(xp, yp, zp),
            Vec3::new(xm, yp, zp),
        ],
    ];
    let normals = [
        Vec3::NEG_X,
        Vec3::X,
        Vec3::NEG_Y,
        Vec3::Y,
        Vec3::NEG_Z,
        Vec3::Z,
    ];
    (faces, normals)
}

/// Dispatches a primitive to its construction. `scale` is the largest
/// column length of the geometry transform.
pub(crate) fn build(
    factory: &mut TriangulationFactory,
    store: &Store,
    geo: &Geometry,
    scale: f32,
) -> Option<Triangulation> {
    let tri = match geo.primitive {
        Primitive::Pyramid { .. } => factory.pyramid(store, geo),
        Primitive::Box { .. } => factory.cuboid(store, geo),
        Primitive::RectangularTorus { .. } => factory.rectangular_torus(store, geo, scale),
        Primitive::CircularTorus { .. } => factory.circular_torus(store, geo, scale),
        Primitive::EllipticalDish {
            base_radius,
            height,
        } => factory.sphere_based(geo, base_radius, FRAC_PI_2, 0.0, height / base_radius, scale),
        Primitive::SphericalDish {
            base_radius,
            height,
        } => {
            let r_sphere = (base_radius * base_radius + height * height) / (2.0 * height);
            let mut arc = (base_radius / r_sphere).asin();
            if base_radius < height {
                arc = PI - arc;
            }
            factory.sphere_based(geo, r_sphere, arc, height - r_sphere, 1.0, scale)
        }
        Primitive::Snout { .. } => factory.snout(store, geo, scale),
        Primitive::Cylinder { .. } => factory.cylinder(store, geo, scale),
        Primitive::Sphere { diameter } => {
            factory.sphere_based(geo, 0.5 * diameter, PI, 0.0, 1.0, scale)
        }
        Primitive::FacetGroup { .. } => factory.facet_group(geo),
        // Lines stay lines; consumers draw the two endpoints.
        Primitive::Line { .. } => return None,
    };
    Some(tri)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use glam::Affine3A;

    use crate::store::testutil::scene_with_group;
    use crate::store::{Contour, GeometryId, NodeId, Polygon};

    fn factory() -> TriangulationFactory {
        TriangulationFactory::new(0.1, 3, 100)
    }

    fn geometry(store: &mut Store, group: NodeId, primitive: Primitive) -> GeometryId {
        store.new_geometry(group, primitive)
    }

    #[test]
    fn box_is_exact() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        let id = geometry(&mut store, group, Primitive::Box { lengths: [1.0; 3] });

        let mut f = factory();
        let tri = f.cuboid(&store, store.geometry(id));
        assert_eq!(tri.vertices.len(), 24);
        assert_eq!(tri.triangle_count(), 12);
        assert_eq!(tri.error, 0.0);
    }

    #[test]
    fn flat_box_drops_degenerate_faces() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        let id = geometry(
            &mut store,
            group,
            Primitive::Box {
                lengths: [1.0, 1.0, 0.0],
            },
        );

        let mut f = factory();
        let tri = f.cuboid(&store, store.geometry(id));
        // The two z faces survive; the four side walls have zero extent.
        assert_eq!(tri.triangle_count(), 4);
    }

    #[test]
    fn cylinder_counts_follow_samples() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        let id = geometry(
            &mut store,
            group,
            Primitive::Cylinder {
                radius: 1.0,
                height: 2.0,
            },
        );

        let mut f = factory();
        let geo = store.geometry(id);
        let samples = f.segment_count(TAU, 1.0, 1.0);
        let tri = f.cylinder(&store, geo, 1.0);
        let n = samples as usize;
        assert_eq!(tri.vertices.len(), 2 * n + 2 * n);
        assert_eq!(tri.triangle_count(), 2 * n + 2 * (n - 2));
        assert!(tri.error <= 0.1 + 1e-6);
    }

    #[test]
    fn segment_count_respects_bounds() {
        let f = factory();
        assert_eq!(f.segment_count(TAU, 1e-6, 1.0), 3);
        assert_eq!(f.segment_count(TAU, 1e6, 1.0), 100);
        // Tight tolerance needs more segments for the same radius.
        let coarse = f.segment_count(TAU, 1.0, 1.0);
        let fine = TriangulationFactory::new(0.001, 3, 1000).segment_count(TAU, 1.0, 1.0);
        assert!(coarse < fine);
    }

    #[test]
    fn sagitta_error_is_bounded_by_tolerance() {
        let f = factory();
        for radius in [0.05f32, 0.3, 2.0, 40.0] {
            let segments = f.segment_count(TAU, radius, 1.0);
            let error = f.sagitta_error(TAU, radius, 1.0, segments);
            if segments < 100 {
                assert!(
                    error <= 0.1 + 1e-5,
                    "radius {radius}: error {error} over tolerance"
                );
            }
        }
    }

    #[test]
    fn connected_cylinders_elide_facing_caps() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        let make = |store: &mut Store, z: f32| {
            let id = store.new_geometry(
                group,
                Primitive::Cylinder {
                    radius: 0.1,
                    height: 1.0,
                },
            );
            store.geometry_mut(id).transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, z));
            id
        };
        let a = make(&mut store, 0.0);
        let b = make(&mut store, 1.0);
        crate::connect::connect(&mut store);

        let mut f = factory();
        let tri_a = f.cylinder(&store, store.geometry(a), 1.0);
        let tri_b = f.cylinder(&store, store.geometry(b), 1.0);
        assert_eq!(f.discarded_caps, 2);

        let n = f.segment_count(TAU, 0.1, 1.0) as usize;
        // One cap each: shell plus a single fan.
        assert_eq!(tri_a.vertices.len(), 2 * n + n);
        assert_eq!(tri_b.vertices.len(), 2 * n + n);
        assert_eq!(tri_a.triangle_count(), 2 * n + (n - 2));
        assert_eq!(tri_b.triangle_count(), 2 * n + (n - 2));
    }

    #[test]
    fn mismatched_radii_keep_their_caps() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        let a = store.new_geometry(
            group,
            Primitive::Cylinder {
                radius: 0.1,
                height: 1.0,
            },
        );
        let b = store.new_geometry(
            group,
            Primitive::Cylinder {
                radius: 0.2,
                height: 1.0,
            },
        );
        store.geometry_mut(b).transform = Affine3A::from_translation(Vec3::new(0.0, 0.0, 1.0));
        crate::connect::connect(&mut store);
        assert_eq!(store.connection_ids().count(), 1);

        let mut f = factory();
        f.cylinder(&store, store.geometry(a), 1.0);
        f.cylinder(&store, store.geometry(b), 1.0);
        assert_eq!(f.discarded_caps, 0);
    }

    #[test]
    fn sphere_is_closed() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        let id = geometry(&mut store, group, Primitive::Sphere { diameter: 2.0 });

        let mut f = factory();
        let tri = f.sphere_based(store.geometry(id), 1.0, PI, 0.0, 1.0, 1.0);
        assert!(!tri.vertices.is_empty());
        // Closed surface: every directed edge is matched by its reverse.
        let mut edges = std::collections::HashMap::new();
        for t in tri.indices.chunks(3) {
            for k in 0..3 {
                *edges.entry((t[k], t[(k + 1) % 3])).or_insert(0) += 1;
            }
        }
        for (&(a, b), &count) in &edges {
            assert_eq!(count, 1, "duplicate edge {a}->{b}");
            assert_eq!(edges.get(&(b, a)), Some(&1), "unmatched edge {a}->{b}");
        }
    }

    #[test]
    fn facet_quad_picks_the_flatter_diagonal() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        let id = geometry(
            &mut store,
            group,
            Primitive::FacetGroup {
                polygons: vec![Polygon {
                    contours: vec![Contour {
                        positions: vec![
                            Vec3::new(0.0, 0.0, 0.0),
                            Vec3::new(1.0, 0.0, 0.0),
                            Vec3::new(1.0, 1.0, 0.0),
                            Vec3::new(0.0, 1.0, 0.0),
                        ],
                        normals: vec![Vec3::Z; 4],
                    }],
                }],
            },
        );

        let mut f = factory();
        let tri = f.facet_group(store.geometry(id));
        assert_eq!(tri.vertices.len(), 4);
        assert_eq!(tri.triangle_count(), 2);
        // Coplanar: both diagonals are equally flat, the 0-2 split wins
        // the tie by the strict comparison.
        assert_eq!(tri.indices, vec![3, 0, 1, 1, 2, 3]);
    }

    #[test]
    fn facet_group_with_hole_skips_nothing_valid() {
        let outer = Contour {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(4.0, 0.0, 0.0),
                Vec3::new(4.0, 4.0, 0.0),
                Vec3::new(0.0, 4.0, 0.0),
            ],
            normals: vec![Vec3::Z; 4],
        };
        let hole = Contour {
            positions: vec![
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(3.0, 1.0, 0.0),
                Vec3::new(3.0, 3.0, 0.0),
                Vec3::new(1.0, 3.0, 0.0),
            ],
            normals: vec![Vec3::Z; 4],
        };
        let degenerate = Contour {
            positions: vec![Vec3::ZERO, Vec3::X],
            normals: vec![Vec3::Z; 2],
        };

        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        let id = geometry(
            &mut store,
            group,
            Primitive::FacetGroup {
                polygons: vec![Polygon {
                    contours: vec![outer, hole, degenerate],
                }],
            },
        );

        let mut f = factory();
        let tri = f.facet_group(store.geometry(id));
        assert_eq!(tri.vertices.len(), 8);
        let area: f32 = tri
            .indices
            .chunks(3)
            .map(|t| {
                let a = tri.vertices[t[0] as usize];
                let b = tri.vertices[t[1] as usize];
                let c = tri.vertices[t[2] as usize];
                0.5 * (b - a).cross(c - a).length()
            })
            .sum();
        assert_relative_eq!(area, 12.0, epsilon = 1e-4);
    }
}
