//! Tessellation driver: walks the scene, culls what is too small to see
//! at the requested tolerance, deduplicates identical payloads and writes
//! a triangulation onto every geometry.

use std::collections::HashMap;

use log::info;

use crate::bounds::matrix_scale;
use crate::interner::fnv_1a;
use crate::store::{GeometryId, NodeId, Primitive, Store, Triangulation};
use crate::triangulate::{build, TriangulationFactory};
use crate::visitor::Visitor;

#[derive(Debug, Clone, Copy)]
pub struct TessellationSettings {
    /// World-space sagitta bound in metres.
    pub tolerance: f32,
    pub max_samples: u32,
    /// Groups whose bbox diagonal is below `cull_leaf_threshold *
    /// tolerance` are emitted as empty triangulations. Negative disables.
    pub cull_leaf_threshold: f32,
    /// Same, per geometry.
    pub cull_geometry_threshold: f32,
}

impl Default for TessellationSettings {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            max_samples: 100,
            cull_leaf_threshold: -1.0,
            cull_geometry_threshold: -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TessellationSummary {
    pub processed: u32,
    pub tessellated: u32,
    pub culled: u32,
    pub discarded_caps: u32,
    pub vertices: u64,
    pub triangles: u64,
}

struct Tessellator {
    factory: TriangulationFactory,
    cull_leaf_scaled: f32,
    cull_geometry_scaled: f32,
    group_error: Vec<f32>,
    /// Payload hash to the geometry whose mesh can be shared.
    cache: HashMap<u64, GeometryId>,
    summary: TessellationSummary,
}

impl Visitor for Tessellator {
    fn init(&mut self, store: &mut Store) {
        // Rebuilding starts from a clean slate, the parsed structure stays.
        store.clear_triangulations();
    }

    fn begin_group(&mut self, store: &mut Store, node: NodeId) {
        let bbox = store.group(node).bbox_world;
        let error = if bbox.is_empty() { 0.0 } else { bbox.diagonal() };
        self.group_error.push(error);
    }

    fn end_group(&mut self, _store: &mut Store) {
        self.group_error.pop().expect("group stack underflow");
    }

    fn geometry(&mut self, store: &mut Store, id: GeometryId) {
        if matches!(store.geometry(id).primitive, Primitive::Line { .. }) {
            store.geometry_mut(id).triangulation = None;
            return;
        }
        self.summary.processed += 1;

        let group_error = *self.group_error.last().expect("geometry outside group");
        if group_error < self.cull_leaf_scaled {
            store.geometry_mut(id).triangulation = Some(Triangulation {
                error: group_error,
                ..Default::default()
            });
            return;
        }
        let diagonal = store.geometry(id).bbox_world.diagonal();
        if diagonal < self.cull_geometry_scaled {
            store.geometry_mut(id).triangulation = Some(Triangulation {
                error: diagonal,
                ..Default::default()
            });
            self.summary.culled += 1;
            return;
        }

        // Identical payloads share one mesh, but only free-standing
        // primitives: connected ones elide caps per neighbor.
        let (shareable, hash, scale) = {
            let geo = store.geometry(id);
            (
                geo.connections.iter().all(Option::is_none),
                payload_hash(geo.sample_start_angle, &geo.primitive),
                matrix_scale(&geo.transform),
            )
        };
        if shareable {
            if let Some(&source) = self.cache.get(&hash) {
                if let Some(tri) = store.geometry(source).triangulation.clone() {
                    self.account(&tri);
                    store.geometry_mut(id).triangulation = Some(tri);
                    return;
                }
            }
        }

        let tri = build(&mut self.factory, store, store.geometry(id), scale);
        match tri {
            Some(tri) => {
                self.account(&tri);
                store.geometry_mut(id).triangulation = Some(tri);
                if shareable {
                    self.cache.insert(hash, id);
                }
            }
            None => store.geometry_mut(id).triangulation = None,
        }
    }

    fn end_model(&mut self, _store: &mut Store) {
        let caps = self.factory.discarded_caps;
        info!("Discarded {caps} caps.");
    }
}

impl Tessellator {
    fn account(&mut self, tri: &Triangulation) {
        self.summary.tessellated += 1;
        self.summary.vertices += tri.vertices.len() as u64;
        self.summary.triangles += tri.triangle_count() as u64;
    }
}

/// Tessellates every geometry in the store. Connections and seam
/// alignment must already be in place for cap elision and shared seams.
pub fn tessellate(store: &mut Store, settings: &TessellationSettings) -> TessellationSummary {
    let mut pass = Tessellator {
        factory: TriangulationFactory::new(settings.tolerance, 3, settings.max_samples),
        cull_leaf_scaled: settings.cull_leaf_threshold * settings.tolerance,
        cull_geometry_scaled: settings.cull_geometry_threshold * settings.tolerance,
        group_error: Vec::new(),
        cache: HashMap::new(),
        summary: TessellationSummary::default(),
    };
    store.apply(&mut pass);
    let mut summary = pass.summary;
    summary.discarded_caps = pass.factory.discarded_caps;
    summary
}

/// Content hash over the shape payload and start angle; the transform and
/// bounds are applied by consumers and deliberately left out.
fn payload_hash(start_angle: f32, primitive: &Primitive) -> u64 {
    fn f(bytes: &mut Vec<u8>, values: &[f32]) {
        for v in values {
            bytes.extend_from_slice(&v.to_bits().to_le_bytes());
        }
    }
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&start_angle.to_bits().to_le_bytes());
    match primitive {
        Primitive::Pyramid {
            bottom,
            top,
            offset,
            height,
        } => {
            bytes.push(1);
            f(&mut bytes, bottom);
            f(&mut bytes, top);
            f(&mut bytes, offset);
            f(&mut bytes, &[*height]);
        }
        Primitive::Box { lengths } => {
            bytes.push(2);
            f(&mut bytes, lengths);
        }
        Primitive::RectangularTorus {
            inner_radius,
            outer_radius,
            height,
            angle,
        } => {
            bytes.push(3);
            f(&mut bytes, &[*inner_radius, *outer_radius, *height, *angle]);
        }
        Primitive::CircularTorus {
            offset,
            radius,
            angle,
        } => {
            bytes.push(4);
            f(&mut bytes, &[*offset, *radius, *angle]);
        }
        Primitive::EllipticalDish {
            base_radius,
            height,
        } => {
            bytes.push(5);
            f(&mut bytes, &[*base_radius, *height]);
        }
        Primitive::SphericalDish {
            base_radius,
            height,
        } => {
            bytes.push(6);
            f(&mut bytes, &[*base_radius, *height]);
        }
        Primitive::Snout {
            radius_b,
            radius_t,
            height,
            offset,
            bshear,
            tshear,
        } => {
            bytes.push(7);
            f(&mut bytes, &[*radius_b, *radius_t, *height]);
            f(&mut bytes, offset);
            f(&mut bytes, bshear);
            f(&mut bytes, tshear);
        }
        Primitive::Cylinder { radius, height } => {
            bytes.push(8);
            f(&mut bytes, &[*radius, *height]);
        }
        Primitive::Sphere { diameter } => {
            bytes.push(9);
            f(&mut bytes, &[*diameter]);
        }
        Primitive::Line { a, b } => {
            bytes.push(10);
            f(&mut bytes, &[*a, *b]);
        }
        Primitive::FacetGroup { polygons } => {
            bytes.push(11);
            bytes.extend_from_slice(&(polygons.len() as u32).to_le_bytes());
            for polygon in polygons {
                bytes.extend_from_slice(&(polygon.contours.len() as u32).to_le_bytes());
                for contour in &polygon.contours {
                    bytes.extend_from_slice(&(contour.positions.len() as u32).to_le_bytes());
                    for (p, n) in contour.positions.iter().zip(&contour.normals) {
                        f(&mut bytes, &[p.x, p.y, p.z, n.x, n.y, n.z]);
                    }
                }
            }
        }
    }
    let hash = fnv_1a(&bytes);
    if hash == 0 {
        1
    } else {
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use glam::{vec3, Affine3A, Vec3};

    use crate::bbox::compute_group_bounds;
    use crate::store::testutil::scene_with_group;

    #[test]
    fn box_tessellates_to_twelve_triangles() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        let id = store.new_geometry(group, Primitive::Box { lengths: [1.0; 3] });
        {
            let geo = store.geometry_mut(id);
            geo.bbox_local = crate::Aabb::new(vec3(-0.5, -0.5, -0.5), vec3(0.5, 0.5, 0.5));
            geo.bbox_world = geo.bbox_local;
        }
        compute_group_bounds(&mut store);

        let summary = tessellate(&mut store, &TessellationSettings::default());

        let tri = store.geometry(id).triangulation.as_ref().unwrap();
        assert_eq!(tri.vertices.len(), 24);
        assert_eq!(tri.triangle_count(), 12);
        assert_eq!(summary.tessellated, 1);
        assert_eq!(summary.culled, 0);
    }

    #[test]
    fn lines_are_never_tessellated() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        let id = store.new_geometry(group, Primitive::Line { a: 0.0, b: 1.0 });
        compute_group_bounds(&mut store);

        let summary = tessellate(&mut store, &TessellationSettings::default());
        assert!(store.geometry(id).triangulation.is_none());
        assert_eq!(summary.processed, 0);
    }

    #[test]
    fn tiny_geometry_is_culled_with_recorded_error() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        let id = store.new_geometry(
            group,
            Primitive::Sphere { diameter: 1e-4 },
        );
        let tiny = crate::Aabb::new(Vec3::ZERO, Vec3::splat(1e-4));
        store.geometry_mut(id).bbox_world = tiny;
        let big = store.new_geometry(group, Primitive::Box { lengths: [10.0; 3] });
        store.geometry_mut(big).bbox_world = crate::Aabb::new(Vec3::splat(-5.0), Vec3::splat(5.0));
        compute_group_bounds(&mut store);

        let settings = TessellationSettings {
            cull_geometry_threshold: 0.1,
            ..Default::default()
        };
        let summary = tessellate(&mut store, &settings);

        let tri = store.geometry(id).triangulation.as_ref().unwrap();
        assert!(tri.vertices.is_empty());
        assert_eq!(tri.error, tiny.diagonal());
        assert_eq!(summary.culled, 1);
    }

    #[test]
    fn identical_free_standing_payloads_share_meshes() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        let a = store.new_geometry(group, Primitive::Sphere { diameter: 1.0 });
        let b = store.new_geometry(group, Primitive::Sphere { diameter: 1.0 });
        store.geometry_mut(b).transform = Affine3A::from_translation(vec3(5.0, 0.0, 0.0));
        compute_group_bounds(&mut store);

        tessellate(&mut store, &TessellationSettings::default());

        let ta = store.geometry(a).triangulation.as_ref().unwrap();
        let tb = store.geometry(b).triangulation.as_ref().unwrap();
        assert_eq!(ta, tb);
        assert!(!ta.vertices.is_empty());
    }

    #[test]
    fn repeated_tessellation_is_deterministic() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        let id = store.new_geometry(
            group,
            Primitive::Cylinder {
                radius: 0.25,
                height: 2.0,
            },
        );
        compute_group_bounds(&mut store);

        let settings = TessellationSettings::default();
        tessellate(&mut store, &settings);
        let first = store.geometry(id).triangulation.clone().unwrap();
        tessellate(&mut store, &settings);
        let second = store.geometry(id).triangulation.clone().unwrap();

        // Bit-identical buffers, not merely approximately equal.
        assert_eq!(first, second);
    }
}
