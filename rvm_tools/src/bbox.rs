//! Rolls world-space geometry bounds up onto groups.

use crate::bounds::Aabb;
use crate::store::{GeometryId, NodeId, Store};
use crate::visitor::Visitor;

#[derive(Default)]
struct GroupBounds {
    stack: Vec<NodeId>,
}

impl Visitor for GroupBounds {
    fn begin_group(&mut self, store: &mut Store, node: NodeId) {
        store.group_mut(node).bbox_world = Aabb::EMPTY;
        self.stack.push(node);
    }

    fn geometry(&mut self, store: &mut Store, geometry: GeometryId) {
        let bbox = store.geometry(geometry).bbox_world;
        let &top = self.stack.last().expect("geometry outside group");
        store.group_mut(top).bbox_world.engulf(&bbox);
    }

    fn end_group(&mut self, store: &mut Store) {
        let node = self.stack.pop().expect("group stack underflow");
        let bbox = store.group(node).bbox_world;
        if bbox.is_empty() {
            return;
        }
        if let Some(&parent) = self.stack.last() {
            store.group_mut(parent).bbox_world.engulf(&bbox);
        }
    }
}

/// Sets every group's world box to the union of all descendant geometry
/// boxes. Groups without descendant geometry keep an empty box.
pub fn compute_group_bounds(store: &mut Store) {
    let mut pass = GroupBounds::default();
    store.apply(&mut pass);
}

#[cfg(test)]
mod tests {
    use super::*;

    use glam::{vec3, Affine3A};

    use crate::store::testutil::{group_node, scene_with_group};
    use crate::store::Primitive;

    #[test]
    fn bounds_union_over_descendants() {
        let mut store = Store::new();
        let (_, outer) = scene_with_group(&mut store, "outer");
        let inner = group_node(&mut store, Some(outer), "inner");

        let a = store.new_geometry(outer, Primitive::Box { lengths: [1.0; 3] });
        store.geometry_mut(a).bbox_world =
            Aabb::new(vec3(-0.5, -0.5, -0.5), vec3(0.5, 0.5, 0.5));
        let b = store.new_geometry(inner, Primitive::Box { lengths: [1.0; 3] });
        store.geometry_mut(b).bbox_world = Aabb::new(vec3(2.0, 2.0, 2.0), vec3(3.0, 3.0, 3.0));

        compute_group_bounds(&mut store);

        let inner_box = store.group(inner).bbox_world;
        assert_eq!(inner_box.min, vec3(2.0, 2.0, 2.0));
        assert_eq!(inner_box.max, vec3(3.0, 3.0, 3.0));

        // The outer group unions its own geometry with the child's.
        let outer_box = store.group(outer).bbox_world;
        assert_eq!(outer_box.min, vec3(-0.5, -0.5, -0.5));
        assert_eq!(outer_box.max, vec3(3.0, 3.0, 3.0));
    }

    #[test]
    fn empty_groups_stay_empty() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        compute_group_bounds(&mut store);
        assert!(store.group(group).bbox_world.is_empty());
    }

    #[test]
    fn parsed_box_has_expected_world_bounds() {
        // The world box comes from transforming the local corners.
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "G");
        let a = store.new_geometry(group, Primitive::Box { lengths: [1.0; 3] });
        let local = Aabb::new(vec3(-0.5, -0.5, -0.5), vec3(0.5, 0.5, 0.5));
        let transform = Affine3A::from_translation(vec3(1.0, 2.0, 3.0));
        {
            let geo = store.geometry_mut(a);
            geo.bbox_local = local;
            geo.transform = transform;
            geo.bbox_world = local.transformed(&transform);
        }

        compute_group_bounds(&mut store);

        let bbox = store.group(group).bbox_world;
        assert_eq!(bbox.min, vec3(0.5, 1.5, 2.5));
        assert_eq!(bbox.max, vec3(1.5, 2.5, 3.5));
    }
}
