//! Depth-first traversal of the scene with begin/end hooks.
//!
//! Passes implement [`Visitor`] and receive the store mutably at every
//! hook, so a pass can write its results (bounding boxes, colors,
//! triangulations) directly onto the graph while the traversal itself runs
//! over a pre-collected event list. Traversal order is the deterministic
//! insertion order of the graph.

use crate::interner::Name;
use crate::store::{GeometryId, NodeId, NodeKind, Store};

/// Hooks for a single traversal. All methods default to no-ops.
///
/// Returning `false` from [`Visitor::done`] requests another traversal;
/// multi-pass visitors use this to prune and then recompute. The number of
/// repeats is bounded to keep a buggy visitor from looping forever.
#[allow(unused_variables)]
pub trait Visitor {
    fn init(&mut self, store: &mut Store) {}

    fn done(&mut self, store: &mut Store) -> bool {
        true
    }

    fn begin_file(&mut self, store: &mut Store, node: NodeId) {}

    fn end_file(&mut self, store: &mut Store) {}

    fn begin_model(&mut self, store: &mut Store, node: NodeId) {}

    fn end_model(&mut self, store: &mut Store) {}

    fn begin_group(&mut self, store: &mut Store, node: NodeId) {}

    fn done_group_contents(&mut self, store: &mut Store, node: NodeId) {}

    fn end_group(&mut self, store: &mut Store) {}

    fn begin_children(&mut self, store: &mut Store, node: NodeId) {}

    fn end_children(&mut self, store: &mut Store) {}

    fn begin_attributes(&mut self, store: &mut Store, node: NodeId) {}

    fn attribute(&mut self, store: &mut Store, node: NodeId, key: Name, value: Name) {}

    fn end_attributes(&mut self, store: &mut Store, node: NodeId) {}

    fn begin_geometries(&mut self, store: &mut Store, node: NodeId) {}

    fn geometry(&mut self, store: &mut Store, geometry: GeometryId) {}

    fn end_geometries(&mut self, store: &mut Store) {}
}

const MAX_PASSES: u32 = 16;

#[derive(Debug, Clone, Copy)]
enum Event {
    BeginFile(NodeId),
    EndFile,
    BeginModel(NodeId),
    EndModel,
    BeginGroup(NodeId),
    DoneGroupContents(NodeId),
    EndGroup,
    BeginChildren(NodeId),
    EndChildren,
    BeginAttributes(NodeId),
    Attribute(NodeId, Name, Name),
    EndAttributes(NodeId),
    BeginGeometries(NodeId),
    Geometry(GeometryId),
    EndGeometries,
}

impl Store {
    /// Runs the visitor over the whole scene, repeating the traversal until
    /// [`Visitor::done`] returns `true`.
    pub fn apply<V: Visitor>(&mut self, visitor: &mut V) {
        visitor.init(self);
        for _ in 0..MAX_PASSES {
            // Events are collected up front so hooks are free to mutate
            // node and geometry payloads mid-traversal.
            let events = self.traversal_events();
            for event in events {
                match event {
                    Event::BeginFile(n) => visitor.begin_file(self, n),
                    Event::EndFile => visitor.end_file(self),
                    Event::BeginModel(n) => visitor.begin_model(self, n),
                    Event::EndModel => visitor.end_model(self),
                    Event::BeginGroup(n) => visitor.begin_group(self, n),
                    Event::DoneGroupContents(n) => visitor.done_group_contents(self, n),
                    Event::EndGroup => visitor.end_group(self),
                    Event::BeginChildren(n) => visitor.begin_children(self, n),
                    Event::EndChildren => visitor.end_children(self),
                    Event::BeginAttributes(n) => visitor.begin_attributes(self, n),
                    Event::Attribute(n, key, value) => visitor.attribute(self, n, key, value),
                    Event::EndAttributes(n) => visitor.end_attributes(self, n),
                    Event::BeginGeometries(n) => visitor.begin_geometries(self, n),
                    Event::Geometry(g) => visitor.geometry(self, g),
                    Event::EndGeometries => visitor.end_geometries(self),
                }
            }
            if visitor.done(self) {
                return;
            }
        }
    }

    fn traversal_events(&self) -> Vec<Event> {
        let mut events = Vec::new();
        for &file in self.roots() {
            debug_assert!(matches!(self.node(file).kind, NodeKind::File(_)));
            events.push(Event::BeginFile(file));
            for &model in &self.node(file).children {
                debug_assert!(matches!(self.node(model).kind, NodeKind::Model(_)));
                events.push(Event::BeginModel(model));
                for &group in &self.node(model).children {
                    self.group_events(group, &mut events);
                }
                events.push(Event::EndModel);
            }
            events.push(Event::EndFile);
        }
        events
    }

    fn group_events(&self, group: NodeId, events: &mut Vec<Event>) {
        let node = self.node(group);
        events.push(Event::BeginGroup(group));

        if !node.attributes.is_empty() {
            events.push(Event::BeginAttributes(group));
            for attribute in &node.attributes {
                events.push(Event::Attribute(group, attribute.key, attribute.value));
            }
            events.push(Event::EndAttributes(group));
        }

        if let NodeKind::Group(g) = &node.kind {
            if !g.geometries.is_empty() {
                events.push(Event::BeginGeometries(group));
                for &geometry in &g.geometries {
                    events.push(Event::Geometry(geometry));
                }
                events.push(Event::EndGeometries);
            }
        }

        events.push(Event::DoneGroupContents(group));

        if !node.children.is_empty() {
            events.push(Event::BeginChildren(group));
            for &child in &node.children {
                self.group_events(child, events);
            }
            events.push(Event::EndChildren);
        }

        events.push(Event::EndGroup);
    }
}
