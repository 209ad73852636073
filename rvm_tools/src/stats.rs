//! Per-kind geometry counts, cached on the store.
//!
//! The connection finder sizes its anchor scratch from these totals, so
//! [`collect_stats`] must run after parsing and before connecting.

use log::info;

use crate::store::{GeometryId, NodeId, Primitive, Store};
use crate::visitor::Visitor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub groups: u32,
    pub geometries: u32,
    pub pyramids: u32,
    pub boxes: u32,
    pub rectangular_tori: u32,
    pub circular_tori: u32,
    pub elliptical_dishes: u32,
    pub spherical_dishes: u32,
    pub snouts: u32,
    pub cylinders: u32,
    pub spheres: u32,
    pub facet_groups: u32,
    pub facet_group_polygons: u32,
    pub facet_group_contours: u32,
    pub facet_group_vertices: u32,
    pub lines: u32,
}

#[derive(Default)]
struct CollectStats {
    stats: Stats,
}

impl Visitor for CollectStats {
    fn begin_group(&mut self, _store: &mut Store, _node: NodeId) {
        self.stats.groups += 1;
    }

    fn geometry(&mut self, store: &mut Store, geometry: GeometryId) {
        let stats = &mut self.stats;
        stats.geometries += 1;
        match &store.geometry(geometry).primitive {
            Primitive::Pyramid { .. } => stats.pyramids += 1,
            Primitive::Box { .. } => stats.boxes += 1,
            Primitive::RectangularTorus { .. } => stats.rectangular_tori += 1,
            Primitive::CircularTorus { .. } => stats.circular_tori += 1,
            Primitive::EllipticalDish { .. } => stats.elliptical_dishes += 1,
            Primitive::SphericalDish { .. } => stats.spherical_dishes += 1,
            Primitive::Snout { .. } => stats.snouts += 1,
            Primitive::Cylinder { .. } => stats.cylinders += 1,
            Primitive::Sphere { .. } => stats.spheres += 1,
            Primitive::Line { .. } => stats.lines += 1,
            Primitive::FacetGroup { polygons } => {
                stats.facet_groups += 1;
                stats.facet_group_polygons += polygons.len() as u32;
                for polygon in polygons {
                    stats.facet_group_contours += polygon.contours.len() as u32;
                    for contour in &polygon.contours {
                        stats.facet_group_vertices += contour.positions.len() as u32;
                    }
                }
            }
        }
    }
}

/// Recounts groups and geometries per kind and caches the result on the
/// store.
pub fn collect_stats(store: &mut Store) -> Stats {
    let mut pass = CollectStats::default();
    store.apply(&mut pass);
    let stats = pass.stats;
    info!(
        "{} groups, {} geometries ({} cylinders, {} snouts, {} tori, {} facet groups)",
        stats.groups,
        stats.geometries,
        stats.cylinders,
        stats.snouts,
        stats.rectangular_tori + stats.circular_tori,
        stats.facet_groups,
    );
    store.stats = Some(stats);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::store::testutil::scene_with_group;
    use crate::store::{Contour, Polygon};

    use glam::Vec3;

    #[test]
    fn counts_by_kind() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        store.new_geometry(
            group,
            Primitive::Cylinder {
                radius: 0.1,
                height: 1.0,
            },
        );
        store.new_geometry(
            group,
            Primitive::Cylinder {
                radius: 0.2,
                height: 1.0,
            },
        );
        store.new_geometry(group, Primitive::Sphere { diameter: 1.0 });
        store.new_geometry(
            group,
            Primitive::FacetGroup {
                polygons: vec![Polygon {
                    contours: vec![Contour {
                        positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                        normals: vec![Vec3::Z; 3],
                    }],
                }],
            },
        );

        let stats = collect_stats(&mut store);
        assert_eq!(stats.groups, 1);
        assert_eq!(stats.geometries, 4);
        assert_eq!(stats.cylinders, 2);
        assert_eq!(stats.spheres, 1);
        assert_eq!(stats.facet_groups, 1);
        assert_eq!(stats.facet_group_vertices, 3);
        assert_eq!(store.stats, Some(stats));
    }
}
