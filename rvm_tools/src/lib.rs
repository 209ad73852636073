//! Toolkit for plant-design exchange files.
//!
//! Parses the chunked binary scene format and its paired attribute files
//! into a [`Store`], then runs a fixed pipeline of passes over the scene:
//! color resolution, per-kind statistics, geometric connection discovery,
//! seam alignment of circular primitives, group bounding boxes and
//! finally curvature-adaptive tessellation. The result is a tessellated,
//! color-annotated, connectivity-aware scene graph ready for export.
//!
//! The crate does no file I/O of its own: callers hand in byte slices and
//! walk the store through the [`Visitor`] protocol. Everything is
//! single-threaded and deterministic; two runs over the same input
//! produce bit-identical buffers.

pub use glam;

mod align;
mod atts;
mod bbox;
mod bounds;
mod colorize;
mod connect;
mod interner;
mod polygon;
pub mod rvm;
mod stats;
mod store;
mod tessellate;
mod triangulate;
mod visitor;

pub use align::align_seams;
pub use atts::{parse_attributes, AttError};
pub use bbox::compute_group_bounds;
pub use bounds::Aabb;
pub use colorize::colorize;
pub use connect::{connect, Component};
pub use interner::{Interner, Name};
pub use stats::{collect_stats, Stats};
pub use store::{
    Attribute, Color, Connection, ConnectionFlags, ConnectionId, Contour, Counts, DebugLine,
    FileInfo, Geometry, GeometryId, GroupInfo, ModelInfo, Node, NodeId, NodeKind, Polygon,
    Primitive, Store, Triangulation,
};
pub use tessellate::{tessellate, TessellationSettings, TessellationSummary};
pub use visitor::Visitor;

/// Runs the standard pass pipeline over a parsed store.
///
/// The order is fixed by data dependencies: colors and stats first, then
/// connections, then seam alignment (which needs the connections), then
/// group bounds and tessellation (which needs connections for cap elision
/// and the aligned start angles for shared seams).
pub fn process(
    store: &mut Store,
    color_attribute: Option<&str>,
    settings: &TessellationSettings,
) -> TessellationSummary {
    colorize(store, color_attribute);
    collect_stats(store);
    connect(store);
    align_seams(store);
    compute_group_bounds(store);
    tessellate(store, settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    use glam::Affine3A;

    use crate::rvm::testutil::ChunkWriter;

    /// Two coaxial cylinders parsed from a binary stream and pushed
    /// through the whole pipeline.
    #[test]
    fn pipeline_end_to_end() {
        let mut w = ChunkWriter::new();
        w.head();
        w.modl("plant", "m1");
        w.cntb_open("/PIPE", [0.0; 3], 2);
        for z in [0.0f32, 2.0] {
            w.prim_at(
                8,
                Affine3A::from_translation(glam::Vec3::new(0.0, 0.0, z)),
                [-0.5, -0.5, -1.0, 0.5, 0.5, 1.0],
                &[0.5, 2.0],
            );
        }
        w.cntb_close(0);
        let data = w.finish();

        let mut store = Store::new();
        rvm::parse(&mut store, &data).unwrap();

        let summary = process(&mut store, None, &TessellationSettings::default());

        // One circular connection, one facing cap elided on each side.
        assert_eq!(store.connection_ids().count(), 1);
        assert_eq!(summary.discarded_caps, 2);
        assert_eq!(summary.tessellated, 2);

        // Colors resolved from the group material.
        let name = store.strings.intern("/PIPE");
        let group = store.find_root_group(name).unwrap();
        for &id in &store.group(group).geometries {
            assert_eq!(store.geometry(id).color, 0xcc0000);
        }

        // Group bounds cover both cylinders.
        let bbox = store.group(group).bbox_world;
        assert_eq!(bbox.min.z, -1.0);
        assert_eq!(bbox.max.z, 3.0);

        // Start angles agree for the straight chain, and both seams meet.
        let a = store.geometry(store.group(group).geometries[0]);
        let b = store.geometry(store.group(group).geometries[1]);
        assert_eq!(a.sample_start_angle, b.sample_start_angle);

        let stats = store.stats.unwrap();
        assert_eq!(stats.cylinders, 2);
    }
}
