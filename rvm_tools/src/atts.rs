//! Attribute file reader.
//!
//! Attribute files are line-oriented and pair with a parsed scene: `NEW
//! <id>` opens a scope named after a group, `END` closes it, and every
//! other line holds one or more `key := value` assignments separated by
//! `&end&`. Values wrapped in single quotes are unquoted. The first line
//! of the file is a free-form header and is skipped.
//!
//! Top-level scopes are resolved against the root groups of the scene
//! (the "Header Information" pseudo-scope is ignored), deeper scopes
//! against the children of the enclosing group. Assignments inside scopes
//! that did not resolve are dropped. With `create` set, unresolved scopes
//! materialize new groups instead.

use std::fmt;

use crate::interner::Name;
use crate::store::{GroupInfo, NodeId, NodeKind, Store};
use crate::Aabb;

use glam::Vec3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttError {
    /// An `END` line with no matching `NEW`.
    UnbalancedEnd { line: u32 },
    /// Scopes still open at the end of the file.
    UnclosedScopes { line: u32 },
    /// An assignment line without the `:=` token.
    MissingAssign { line: u32 },
}

impl fmt::Display for AttError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttError::UnbalancedEnd { line } => {
                write!(f, "@{line}: More END-tags than NEW-tags.")
            }
            AttError::UnclosedScopes { line } => {
                write!(f, "@{line}: More NEW-tags than END-tags.")
            }
            AttError::MissingAssign { line } => {
                write!(f, "@{line}: Failed to find ':=' token.")
            }
        }
    }
}

impl std::error::Error for AttError {}

struct Scope {
    group: Option<NodeId>,
}

/// Parses an attribute file and attaches the attributes to the groups of
/// an already parsed scene.
///
/// Attributes assigned twice in the same scope overwrite in place. The
/// hierarchy counts are refreshed before returning, also on failure, so
/// whatever was attached up to an error stays consistent.
pub fn parse_attributes(store: &mut Store, text: &str, create: bool) -> Result<(), AttError> {
    let result = parse_lines(store, text, create);
    store.update_counts();
    result
}

fn parse_lines(store: &mut Store, text: &str, create: bool) -> Result<(), AttError> {
    let header_info = store.strings.intern("Header Information");
    let mut stack: Vec<Scope> = Vec::new();
    let mut line_no = 0u32;

    // The first line is the file header.
    for line in text.lines().skip(1) {
        line_no += 1;
        let line = line.trim_start_matches([' ', '\t']);
        if line.is_empty() {
            continue;
        }

        if let Some(id) = line.strip_prefix("NEW ").or_else(|| line.strip_prefix("NEW\t")) {
            let id = store.strings.intern(id.trim());
            let group = resolve_scope(store, &stack, id, header_info, create);
            stack.push(Scope { group });
        } else if line.starts_with("END") {
            if stack.pop().is_none() {
                return Err(AttError::UnbalancedEnd { line: line_no });
            }
        } else {
            let group = stack.last().and_then(|scope| scope.group);
            for assignment in line.split("&end&") {
                let Some((key, value)) = assignment.split_once(":=") else {
                    return Err(AttError::MissingAssign { line: line_no });
                };
                let key = key.trim();
                let mut value = value.trim();
                if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
                    value = &value[1..value.len() - 1];
                }
                // Scopes that resolved to nothing are silently skipped, the
                // header pseudo-scope among them.
                if let Some(group) = group {
                    let key = store.strings.intern(key);
                    let value = store.strings.intern(value);
                    store.set_attribute(group, key, value);
                }
            }
        }
    }

    if !stack.is_empty() {
        return Err(AttError::UnclosedScopes { line: line_no });
    }
    Ok(())
}

fn resolve_scope(
    store: &mut Store,
    stack: &[Scope],
    id: Name,
    header_info: Name,
    create: bool,
) -> Option<NodeId> {
    if stack.is_empty() {
        if id == header_info {
            return None;
        }
        let found = store.find_root_group(id);
        if found.is_none() && create {
            let model = store.default_model();
            return Some(new_group(store, model, id));
        }
        return found;
    }

    let parent = stack.last().and_then(|scope| scope.group)?;
    let found = store
        .node(parent)
        .children
        .iter()
        .copied()
        .find(|&child| matches!(&store.node(child).kind, NodeKind::Group(g) if g.name == id));
    if found.is_none() && create {
        return Some(new_group(store, parent, id));
    }
    found
}

fn new_group(store: &mut Store, parent: NodeId, name: Name) -> NodeId {
    store.new_node(
        Some(parent),
        NodeKind::Group(GroupInfo {
            name,
            translation: Vec3::ZERO,
            material: 0,
            id: 0,
            end_tag: 0,
            bbox_world: Aabb::EMPTY,
            geometries: Vec::new(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use indoc::indoc;

    use crate::store::testutil::{group_node, scene_with_group};

    fn attribute<'a>(store: &'a Store, group: NodeId, key: &str) -> Option<&'a str> {
        let attributes = &store.node(group).attributes;
        attributes
            .iter()
            .find(|a| store.strings.resolve(a.key) == key)
            .map(|a| store.strings.resolve(a.value))
    }

    #[test]
    fn attaches_to_existing_groups() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "/B-101");
        let child = group_node(&mut store, Some(group), "/B-101-A");

        let text = indoc! {"
            Header line, skipped
            NEW /B-101
                Material := 'Carbon steel'
                NEW /B-101-A
                    Spec := A53 &end& Size := 6
                END
            END
        "};
        parse_attributes(&mut store, text, false).unwrap();

        assert_eq!(attribute(&store, group, "Material"), Some("Carbon steel"));
        assert_eq!(attribute(&store, child, "Spec"), Some("A53"));
        assert_eq!(attribute(&store, child, "Size"), Some("6"));
    }

    #[test]
    fn header_information_scope_is_skipped() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "/B-101");

        let text = indoc! {"
            header
            NEW Header Information
                Project := Plant
            END
            NEW /B-101
                Tag := T1
            END
        "};
        parse_attributes(&mut store, text, false).unwrap();

        assert_eq!(attribute(&store, group, "Tag"), Some("T1"));
        assert!(attribute(&store, group, "Project").is_none());
    }

    #[test]
    fn create_mode_materializes_missing_groups() {
        let mut store = Store::new();
        store.default_model();

        let text = indoc! {"
            header
            NEW /NEW-GROUP
                Tag := T9
            END
        "};
        parse_attributes(&mut store, text, true).unwrap();

        let name = store.strings.intern("/NEW-GROUP");
        let group = store.find_root_group(name).unwrap();
        assert_eq!(attribute(&store, group, "Tag"), Some("T9"));
    }

    #[test]
    fn reassignment_overwrites() {
        let mut store = Store::new();
        let (_, group) = scene_with_group(&mut store, "/B-101");

        let text = indoc! {"
            header
            NEW /B-101
                Tag := old
                Tag := new
            END
        "};
        parse_attributes(&mut store, text, false).unwrap();

        assert_eq!(attribute(&store, group, "Tag"), Some("new"));
        assert_eq!(store.node(group).attributes.len(), 1);
    }

    #[test]
    fn unbalanced_tags_error() {
        let mut store = Store::new();
        scene_with_group(&mut store, "/B-101");

        let err = parse_attributes(&mut store, "header\nEND\n", false).unwrap_err();
        assert!(matches!(err, AttError::UnbalancedEnd { .. }));

        let err = parse_attributes(&mut store, "header\nNEW /B-101\n", false).unwrap_err();
        assert!(matches!(err, AttError::UnclosedScopes { .. }));
    }

    #[test]
    fn missing_assign_token_errors() {
        let mut store = Store::new();
        scene_with_group(&mut store, "/B-101");

        let text = indoc! {"
            header
            NEW /B-101
                this line has no assignment
            END
        "};
        let err = parse_attributes(&mut store, text, false).unwrap_err();
        assert_eq!(err, AttError::MissingAssign { line: 2 });
        assert_eq!(err.to_string(), "@2: Failed to find ':=' token.");
    }
}
