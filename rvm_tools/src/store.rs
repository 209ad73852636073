//! The scene store: a table-backed graph of files, models, groups,
//! geometries, attributes, connections and debug lines.
//!
//! All graph objects live in append-only tables owned by the store and are
//! addressed by copyable ids, so cross-references (a connection pointing at
//! two geometries, a geometry pointing back at its connections) never form
//! ownership cycles. Everything is dropped en masse with the store;
//! triangulations can be cleared and rebuilt separately without discarding
//! the parsed structure.

use glam::{Affine3A, Vec2, Vec3};

use crate::bounds::Aabb;
use crate::interner::{Interner, Name};
use crate::stats::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub(crate) u32);

/// A file, model or group in the scene hierarchy.
///
/// Only groups carry geometries; attributes can be attached to any node but
/// in practice come from the attribute file keyed by group name.
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug)]
pub enum NodeKind {
    File(FileInfo),
    Model(ModelInfo),
    Group(GroupInfo),
}

#[derive(Debug)]
pub struct FileInfo {
    pub info: Name,
    pub note: Name,
    pub date: Name,
    pub user: Name,
    pub encoding: Name,
}

#[derive(Debug)]
pub struct ModelInfo {
    pub project: Name,
    pub name: Name,
    pub colors: Vec<Color>,
}

#[derive(Debug)]
pub struct GroupInfo {
    pub name: Name,
    /// Reference point for objects in the group, in metres. Geometry
    /// transforms are absolute, not relative to this point.
    pub translation: Vec3,
    pub material: u32,
    /// Dense per-store group index, assigned at creation.
    pub id: u32,
    /// Opaque value trailing the group's closing chunk, preserved verbatim
    /// so a round-trip can write it back.
    pub end_tag: u32,
    pub bbox_world: Aabb,
    pub geometries: Vec<GeometryId>,
}

/// Palette entry attached to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub kind: u32,
    pub index: u32,
    pub rgb: [u8; 3],
}

/// Interned key/value pair attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub key: Name,
    pub value: Name,
}

/// World-space line segment kept for diagnostic export.
#[derive(Debug, Clone, Copy)]
pub struct DebugLine {
    pub a: Vec3,
    pub b: Vec3,
    pub color: u32,
}

/// One contour of a facet-group polygon: parallel position and normal
/// arrays of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

/// A polygon of a facet group. The first contour is the boundary; further
/// contours are holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub contours: Vec<Contour>,
}

/// Shape-specific payload of a geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Pyramid {
        bottom: [f32; 2],
        top: [f32; 2],
        offset: [f32; 2],
        height: f32,
    },
    Box {
        lengths: [f32; 3],
    },
    RectangularTorus {
        inner_radius: f32,
        outer_radius: f32,
        height: f32,
        angle: f32,
    },
    CircularTorus {
        offset: f32,
        radius: f32,
        angle: f32,
    },
    EllipticalDish {
        base_radius: f32,
        height: f32,
    },
    SphericalDish {
        base_radius: f32,
        height: f32,
    },
    Snout {
        radius_b: f32,
        radius_t: f32,
        height: f32,
        offset: [f32; 2],
        bshear: [f32; 2],
        tshear: [f32; 2],
    },
    Cylinder {
        radius: f32,
        height: f32,
    },
    Sphere {
        diameter: f32,
    },
    Line {
        a: f32,
        b: f32,
    },
    FacetGroup {
        polygons: Vec<Polygon>,
    },
}

/// A parameterized primitive placed in the world by a 3x4 affine transform.
#[derive(Debug)]
pub struct Geometry {
    /// Dense index in creation order; [`Store::forward_group_id_to_geometries`]
    /// may later overwrite it with the owning group's id.
    pub id: u32,
    /// Column-major 3x4 transform; the last column is the translation.
    pub transform: Affine3A,
    pub bbox_local: Aabb,
    pub bbox_world: Aabb,
    /// Phase offset for sampling circular cross-sections, set by the seam
    /// alignment pass so joined primitives share seam vertices.
    pub sample_start_angle: f32,
    pub color_name: Option<Name>,
    pub color: u32,
    /// Back-references to the connection touching each canonical face slot.
    pub connections: [Option<ConnectionId>; 6],
    pub triangulation: Option<Triangulation>,
    pub primitive: Primitive,
}

/// Indexed triangle mesh for one geometry, in the geometry's local frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Triangulation {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    /// Three indices per triangle.
    pub indices: Vec<u32>,
    /// Sagitta-equivalent error introduced by sampling, 0 for exact shapes.
    pub error: f32,
}

impl Triangulation {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Which interface kinds meet in a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionFlags(u8);

impl ConnectionFlags {
    pub const HAS_CIRCULAR_SIDE: Self = Self(1);
    pub const HAS_RECTANGULAR_SIDE: Self = Self(2);

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn has_circular_side(self) -> bool {
        self.0 & Self::HAS_CIRCULAR_SIDE.0 != 0
    }

    pub fn has_rectangular_side(self) -> bool {
        self.0 & Self::HAS_RECTANGULAR_SIDE.0 != 0
    }
}

/// Inferred face-to-face adjacency between two geometries.
#[derive(Debug, Clone, Copy)]
pub struct Connection {
    pub geos: [GeometryId; 2],
    pub offsets: [u32; 2],
    /// Contact point, midway between the two face anchors.
    pub p: Vec3,
    /// Contact direction, from the first side towards the second.
    pub d: Vec3,
    pub flags: ConnectionFlags,
}

impl Connection {
    /// The geometry and face slot on the side opposite `geo`.
    pub fn other_side(&self, geo: GeometryId) -> (GeometryId, u32) {
        if self.geos[0] == geo {
            (self.geos[1], self.offsets[1])
        } else {
            (self.geos[0], self.offsets[0])
        }
    }

    /// The face slot on `geo`'s own side.
    pub fn own_offset(&self, geo: GeometryId) -> u32 {
        if self.geos[0] == geo {
            self.offsets[0]
        } else {
            self.offsets[1]
        }
    }
}

/// Summary totals over the node hierarchy, recomputed by
/// [`Store::update_counts`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub nodes: u32,
    pub leaves: u32,
    pub empty_leaves: u32,
    pub non_empty_non_leaves: u32,
    pub geometries: u32,
}

#[derive(Debug, Default)]
pub struct Store {
    pub strings: Interner,
    pub stats: Option<Stats>,
    nodes: Vec<Node>,
    geometries: Vec<Geometry>,
    connections: Vec<Connection>,
    debug_lines: Vec<DebugLine>,
    roots: Vec<NodeId>,
    counts: Counts,
    groups_created: u32,
    error_str: String,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn geometry(&self, id: GeometryId) -> &Geometry {
        &self.geometries[id.0 as usize]
    }

    pub fn geometry_mut(&mut self, id: GeometryId) -> &mut Geometry {
        &mut self.geometries[id.0 as usize]
    }

    pub fn geometry_count(&self) -> u32 {
        self.geometries.len() as u32
    }

    pub fn geometry_ids(&self) -> impl Iterator<Item = GeometryId> {
        (0..self.geometries.len() as u32).map(GeometryId)
    }

    pub fn connection(&self, id: ConnectionId) -> &Connection {
        &self.connections[id.0 as usize]
    }

    pub fn connection_ids(&self) -> impl Iterator<Item = ConnectionId> {
        (0..self.connections.len() as u32).map(ConnectionId)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn debug_lines(&self) -> &[DebugLine] {
        &self.debug_lines
    }

    pub fn counts(&self) -> Counts {
        self.counts
    }

    pub fn error_string(&self) -> &str {
        &self.error_str
    }

    pub fn set_error_string(&mut self, s: &str) {
        self.error_str = s.to_string();
    }

    /// Appends a node to `parent`'s child list, or to the roots when
    /// `parent` is `None`. Group ids are assigned densely in creation order.
    pub fn new_node(&mut self, parent: Option<NodeId>, mut kind: NodeKind) -> NodeId {
        if let NodeKind::Group(ref mut group) = kind {
            group.id = self.groups_created;
            self.groups_created += 1;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
            attributes: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent.0 as usize].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Appends a geometry to a group. The transform, bounding boxes and
    /// color are left at their defaults for the caller to fill in.
    ///
    /// Panics if `parent` is not a group.
    pub fn new_geometry(&mut self, parent: NodeId, primitive: Primitive) -> GeometryId {
        let id = GeometryId(self.geometries.len() as u32);
        self.geometries.push(Geometry {
            id: id.0,
            transform: Affine3A::IDENTITY,
            bbox_local: Aabb::EMPTY,
            bbox_world: Aabb::EMPTY,
            sample_start_angle: 0.0,
            color_name: None,
            color: 0x50_50_50,
            connections: [None; 6],
            triangulation: None,
            primitive,
        });
        let group = self.group_mut(parent);
        group.geometries.push(id);
        id
    }

    /// Deep-copies a geometry from `src` into this store under `parent`.
    ///
    /// The source id is kept so exports stay stable across stores; the
    /// connection slots are not carried over.
    pub fn clone_geometry(&mut self, parent: NodeId, src: &Store, geo: GeometryId) -> GeometryId {
        let from = src.geometry(geo);
        let id = self.new_geometry(parent, from.primitive.clone());
        let color_name = from
            .color_name
            .map(|name| self.strings.intern(src.strings.resolve(name)));
        let dst = self.geometry_mut(id);
        dst.id = from.id;
        dst.transform = from.transform;
        dst.bbox_local = from.bbox_local;
        dst.bbox_world = from.bbox_world;
        dst.sample_start_angle = from.sample_start_angle;
        dst.color_name = color_name;
        dst.color = from.color;
        dst.triangulation = from.triangulation.clone();
        id
    }

    /// Copies a node (with its attributes, but not its children or
    /// geometries) from `src` into this store, re-interning all strings.
    pub fn clone_group(&mut self, parent: Option<NodeId>, src: &Store, node: NodeId) -> NodeId {
        let from = src.node(node);
        let kind = match &from.kind {
            NodeKind::File(f) => NodeKind::File(FileInfo {
                info: self.strings.intern(src.strings.resolve(f.info)),
                note: self.strings.intern(src.strings.resolve(f.note)),
                date: self.strings.intern(src.strings.resolve(f.date)),
                user: self.strings.intern(src.strings.resolve(f.user)),
                encoding: self.strings.intern(src.strings.resolve(f.encoding)),
            }),
            NodeKind::Model(m) => NodeKind::Model(ModelInfo {
                project: self.strings.intern(src.strings.resolve(m.project)),
                name: self.strings.intern(src.strings.resolve(m.name)),
                colors: m.colors.clone(),
            }),
            NodeKind::Group(g) => NodeKind::Group(GroupInfo {
                name: self.strings.intern(src.strings.resolve(g.name)),
                translation: g.translation,
                material: g.material,
                id: g.id,
                end_tag: g.end_tag,
                bbox_world: g.bbox_world,
                geometries: Vec::new(),
            }),
        };
        let id = self.new_node(parent, kind);
        for attribute in &from.attributes {
            let key = self.strings.intern(src.strings.resolve(attribute.key));
            let value = self.strings.intern(src.strings.resolve(attribute.value));
            self.new_attribute(id, key, value);
        }
        id
    }

    /// Same-store counterpart of [`Store::clone_geometry`]: strings are
    /// already interned here, so the payload is copied directly.
    pub fn duplicate_geometry(&mut self, parent: NodeId, geo: GeometryId) -> GeometryId {
        let from = self.geometry(geo);
        let copy = Geometry {
            id: from.id,
            transform: from.transform,
            bbox_local: from.bbox_local,
            bbox_world: from.bbox_world,
            sample_start_angle: from.sample_start_angle,
            color_name: from.color_name,
            color: from.color,
            connections: [None; 6],
            triangulation: from.triangulation.clone(),
            primitive: from.primitive.clone(),
        };
        let id = GeometryId(self.geometries.len() as u32);
        self.geometries.push(copy);
        self.group_mut(parent).geometries.push(id);
        id
    }

    /// Same-store counterpart of [`Store::clone_group`].
    pub fn duplicate_group(&mut self, parent: Option<NodeId>, node: NodeId) -> NodeId {
        let from = self.node(node);
        let kind = match &from.kind {
            NodeKind::File(f) => NodeKind::File(FileInfo {
                info: f.info,
                note: f.note,
                date: f.date,
                user: f.user,
                encoding: f.encoding,
            }),
            NodeKind::Model(m) => NodeKind::Model(ModelInfo {
                project: m.project,
                name: m.name,
                colors: m.colors.clone(),
            }),
            NodeKind::Group(g) => NodeKind::Group(GroupInfo {
                name: g.name,
                translation: g.translation,
                material: g.material,
                id: g.id,
                end_tag: g.end_tag,
                bbox_world: g.bbox_world,
                geometries: Vec::new(),
            }),
        };
        let attributes = from.attributes.clone();
        let id = self.new_node(parent, kind);
        self.node_mut(id).attributes = attributes;
        id
    }

    /// Appends a palette entry to a model.
    ///
    /// Panics if `parent` is not a model.
    pub fn new_color(&mut self, parent: NodeId, color: Color) {
        match &mut self.node_mut(parent).kind {
            NodeKind::Model(model) => model.colors.push(color),
            _ => panic!("new_color: parent is not a model"),
        }
    }

    pub fn get_attribute(&self, node: NodeId, key: Name) -> Option<Name> {
        self.node(node)
            .attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value)
    }

    pub fn new_attribute(&mut self, node: NodeId, key: Name, value: Name) {
        self.node_mut(node).attributes.push(Attribute { key, value });
    }

    /// Overwrites an existing attribute with the same key, or appends.
    pub fn set_attribute(&mut self, node: NodeId, key: Name, value: Name) {
        let attributes = &mut self.node_mut(node).attributes;
        match attributes.iter_mut().find(|a| a.key == key) {
            Some(attribute) => attribute.value = value,
            None => attributes.push(Attribute { key, value }),
        }
    }

    pub fn add_debug_line(&mut self, a: Vec3, b: Vec3, color: u32) {
        self.debug_lines.push(DebugLine { a, b, color });
    }

    pub fn new_connection(
        &mut self,
        geos: [GeometryId; 2],
        offsets: [u32; 2],
        p: Vec3,
        d: Vec3,
        flags: ConnectionFlags,
    ) -> ConnectionId {
        let id = ConnectionId(self.connections.len() as u32);
        self.connections.push(Connection {
            geos,
            offsets,
            p,
            d,
            flags,
        });
        self.geometries[geos[0].0 as usize].connections[offsets[0] as usize] = Some(id);
        self.geometries[geos[1].0 as usize].connections[offsets[1] as usize] = Some(id);
        id
    }

    /// Linear search for a group by name at depth 3, file -> model -> group.
    pub fn find_root_group(&self, name: Name) -> Option<NodeId> {
        for &file in &self.roots {
            for &model in &self.node(file).children {
                for &group in &self.node(model).children {
                    if let NodeKind::Group(g) = &self.node(group).kind {
                        if g.name == name {
                            return Some(group);
                        }
                    }
                }
            }
        }
        None
    }

    /// The first model of the first file, creating both with empty strings
    /// when absent.
    pub fn default_model(&mut self) -> NodeId {
        let file = match self.roots.first() {
            Some(&file) => file,
            None => {
                let empty = self.strings.intern("");
                self.new_node(
                    None,
                    NodeKind::File(FileInfo {
                        info: empty,
                        note: empty,
                        date: empty,
                        user: empty,
                        encoding: empty,
                    }),
                )
            }
        };
        match self.node(file).children.first() {
            Some(&model) => model,
            None => {
                let empty = self.strings.intern("");
                self.new_node(
                    Some(file),
                    NodeKind::Model(ModelInfo {
                        project: empty,
                        name: empty,
                        colors: Vec::new(),
                    }),
                )
            }
        }
    }

    /// Drops every triangulation so the scene can be re-tessellated without
    /// re-parsing.
    pub fn clear_triangulations(&mut self) {
        for geometry in &mut self.geometries {
            geometry.triangulation = None;
        }
    }

    /// Recomputes the summary totals over the hierarchy.
    pub fn update_counts(&mut self) {
        let mut counts = Counts::default();
        fn recurse(store: &Store, node: NodeId, counts: &mut Counts) {
            for &child in &store.node(node).children {
                recurse(store, child, counts);
            }
            let n = store.node(node);
            counts.nodes += 1;
            if n.children.is_empty() {
                counts.leaves += 1;
            }
            if let NodeKind::Group(g) = &n.kind {
                if n.children.is_empty() && g.geometries.is_empty() {
                    counts.empty_leaves += 1;
                }
                if !n.children.is_empty() && !g.geometries.is_empty() {
                    counts.non_empty_non_leaves += 1;
                }
                counts.geometries += g.geometries.len() as u32;
            }
        }
        for &root in &self.roots {
            recurse(self, root, &mut counts);
        }
        self.counts = counts;
    }

    /// Overwrites geometry ids with their owning group's id so exports can
    /// key meshes by group.
    pub fn forward_group_id_to_geometries(&mut self) {
        for node in 0..self.nodes.len() {
            if let NodeKind::Group(g) = &self.nodes[node].kind {
                let group_id = g.id;
                let geometries = g.geometries.clone();
                for geo in geometries {
                    self.geometries[geo.0 as usize].id = group_id;
                }
            }
        }
    }

    pub(crate) fn group(&self, id: NodeId) -> &GroupInfo {
        match &self.node(id).kind {
            NodeKind::Group(g) => g,
            _ => panic!("node is not a group"),
        }
    }

    pub(crate) fn group_mut(&mut self, id: NodeId) -> &mut GroupInfo {
        match &mut self.node_mut(id).kind {
            NodeKind::Group(g) => g,
            _ => panic!("node is not a group"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::{group_node, scene_with_group};
    use super::*;

    use glam::vec3;

    fn small_scene(store: &mut Store) -> (NodeId, NodeId) {
        scene_with_group(store, "/PIPE-1")
    }

    #[test]
    fn geometry_ids_are_dense() {
        let mut store = Store::new();
        let (_, group) = small_scene(&mut store);
        for i in 0..4 {
            let id = store.new_geometry(group, Primitive::Sphere { diameter: 1.0 });
            assert_eq!(id.0, i);
            assert_eq!(store.geometry(id).id, i);
        }
        assert_eq!(store.geometry_count(), 4);
    }

    #[test]
    fn find_root_group_by_handle() {
        let mut store = Store::new();
        let (model, group) = small_scene(&mut store);
        group_node(&mut store, Some(group), "/NESTED");
        group_node(&mut store, Some(model), "/PIPE-2");

        let name = store.strings.intern("/PIPE-2");
        let found = store.find_root_group(name).unwrap();
        assert_eq!(store.group(found).name, name);

        // Only depth-3 groups are considered roots.
        let nested_name = store.strings.intern("/NESTED");
        assert!(store.find_root_group(nested_name).is_none());
    }

    #[test]
    fn connection_back_references() {
        let mut store = Store::new();
        let (_, group) = small_scene(&mut store);
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
                radius: 0.1,
                height: 1.0,
            },
        );
        let c = store.new_connection(
            [a, b],
            [1, 0],
            Vec3::ZERO,
            vec3(0.0, 0.0, 1.0),
            ConnectionFlags::HAS_CIRCULAR_SIDE,
        );
        assert_eq!(store.geometry(a).connections[1], Some(c));
        assert_eq!(store.geometry(b).connections[0], Some(c));
        assert_eq!(store.connection(c).other_side(a), (b, 0));
        assert_eq!(store.connection(c).own_offset(b), 0);
    }

    #[test]
    fn attributes_overwrite_in_place() {
        let mut store = Store::new();
        let (_, group) = small_scene(&mut store);
        let key = store.strings.intern("Material");
        let v1 = store.strings.intern("CS");
        let v2 = store.strings.intern("SS316");
        store.set_attribute(group, key, v1);
        store.set_attribute(group, key, v2);
        assert_eq!(store.get_attribute(group, key), Some(v2));
        assert_eq!(store.node(group).attributes.len(), 1);
    }

    #[test]
    fn clone_group_reinterns_strings() {
        let mut src = Store::new();
        let (_, group) = small_scene(&mut src);
        let key = src.strings.intern("Tag");
        let value = src.strings.intern("T-100");
        src.new_attribute(group, key, value);

        let mut dst = Store::new();
        let model = dst.default_model();
        let cloned = dst.clone_group(Some(model), &src, group);

        let name = dst.strings.intern("/PIPE-1");
        assert_eq!(dst.group(cloned).name, name);
        let dst_key = dst.strings.intern("Tag");
        let got = dst.get_attribute(cloned, dst_key).unwrap();
        assert_eq!(dst.strings.resolve(got), "T-100");
    }

    #[test]
    fn duplicate_geometry_within_store() {
        let mut store = Store::new();
        let (_, group) = small_scene(&mut store);
        let a = store.new_geometry(
            group,
            Primitive::Cylinder {
                radius: 0.1,
                height: 1.0,
            },
        );
        let name = store.strings.intern("Red");
        store.geometry_mut(a).color_name = Some(name);

        let d = store.duplicate_geometry(group, a);
        assert_ne!(a, d);
        // The duplicate keeps the source id for export stability and
        // shares the interned color name; connections are not copied.
        assert_eq!(store.geometry(d).id, store.geometry(a).id);
        assert_eq!(store.geometry(d).color_name, Some(name));
        assert_eq!(store.geometry(d).connections, [None; 6]);
        assert_eq!(store.group(group).geometries.len(), 2);
    }

    #[test]
    fn update_counts_totals() {
        let mut store = Store::new();
        let (model, group) = small_scene(&mut store);
        store.new_geometry(group, Primitive::Sphere { diameter: 1.0 });
        group_node(&mut store, Some(model), "/EMPTY");
        store.update_counts();

        let counts = store.counts();
        // file + model + two groups
        assert_eq!(counts.nodes, 4);
        assert_eq!(counts.geometries, 1);
        assert_eq!(counts.empty_leaves, 1);
    }

    #[test]
    fn forward_group_ids() {
        let mut store = Store::new();
        let (model, group_a) = small_scene(&mut store);
        let group_b = group_node(&mut store, Some(model), "/B");
        let a = store.new_geometry(group_a, Primitive::Sphere { diameter: 1.0 });
        let b = store.new_geometry(group_b, Primitive::Sphere { diameter: 2.0 });

        store.forward_group_id_to_geometries();
        assert_eq!(store.geometry(a).id, store.group(group_a).id);
        assert_eq!(store.geometry(b).id, store.group(group_b).id);
        assert_ne!(store.geometry(a).id, store.geometry(b).id);
    }
}
