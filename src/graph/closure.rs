//! Dependency Closure Filter
//!
//! Keeps only the declarations needed by a set of root names:
//!
//! 1. Decompose the files into a [`Forest`].
//! 2. Keep each root's node. Keeping a node keeps its containment chain and
//!    every declaration it references.
//! 3. Reassemble the kept nodes into new files, in input order.
//!
//! Pruning is declaration-granular: a kept message keeps all of its fields,
//! but only the nested types that were themselves kept.

use tracing::{debug, info};

use super::{Forest, NodeId, NodeKind};
use crate::error::{Result, SchemaError};
use crate::schema::{is_scalar_type, ProtoFile, Service, TypeElement};

const MAX_SUGGESTIONS: usize = 3;

/// Membership of forest nodes in the closure
#[derive(Debug, Clone)]
pub struct KeepSet {
    kept: Vec<bool>,
    count: usize,
}

impl KeepSet {
    fn with_capacity(len: usize) -> Self {
        Self {
            kept: vec![false; len],
            count: 0,
        }
    }

    /// Returns false if the node was already kept
    fn insert(&mut self, id: NodeId) -> bool {
        let slot = &mut self.kept[id.index()];
        if *slot {
            return false;
        }
        *slot = true;
        self.count += 1;
        true
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.kept.get(id.index()).copied().unwrap_or(false)
    }

    /// Number of kept nodes, including the root and file nodes
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Kept declaration names in model order
    pub fn names<'a>(&self, forest: &Forest<'a>) -> Vec<&'a str> {
        forest
            .nodes()
            .filter(|(id, _)| self.contains(*id))
            .filter_map(|(_, node)| node.name())
            .collect()
    }
}

impl<'a> Forest<'a> {
    /// Compute the closure of `roots`
    pub fn closure<S: AsRef<str>>(&self, roots: &[S]) -> Result<KeepSet> {
        let mut keep = KeepSet::with_capacity(self.len());
        for root in roots {
            let root = root.as_ref();
            let id = self.lookup(root).ok_or_else(|| SchemaError::UnknownRoot {
                name: root.to_string(),
                suggestions: self.suggest(root, MAX_SUGGESTIONS),
            })?;
            keep_node(self, id, &mut keep)?;
        }
        Ok(keep)
    }
}

/// Outgoing references of a declaration. Only messages and services have any.
pub(crate) fn dependency_targets(kind: NodeKind<'_>) -> Vec<&str> {
    match kind {
        NodeKind::Message(message) => message
            .fields
            .iter()
            .filter(|f| f.is_reference())
            .map(|f| f.type_name.as_str())
            .collect(),
        NodeKind::Service(service) => service
            .rpcs
            .iter()
            .flat_map(|rpc| [rpc.request_type.as_str(), rpc.response_type.as_str()])
            .filter(|t| !is_scalar_type(t))
            .collect(),
        NodeKind::Enum(_) | NodeKind::Extend(_) | NodeKind::File(_) | NodeKind::Root => Vec::new(),
    }
}

/// Mark `start`, its containment chain and its dependencies as kept.
///
/// Already-kept nodes are skipped, so mutually referencing types terminate.
fn keep_node(forest: &Forest<'_>, start: NodeId, keep: &mut KeepSet) -> Result<()> {
    let mut stack = vec![start];
    while let Some(id) = stack.pop() {
        if !keep.insert(id) {
            continue;
        }
        let node = forest.node(id);
        if let Some(parent) = node.parent {
            stack.push(parent);
        }
        for target in dependency_targets(node.kind) {
            let target_id = forest.lookup(target).ok_or_else(|| SchemaError::Integrity {
                source_name: node.name().unwrap_or_default().to_string(),
                target: target.to_string(),
            })?;
            stack.push(target_id);
        }
    }
    Ok(())
}

/// Rebuild files from the kept nodes of `forest`
pub fn reassemble(forest: &Forest<'_>, keep: &KeepSet) -> Vec<ProtoFile> {
    forest
        .node(Forest::ROOT)
        .children
        .iter()
        .filter(|id| keep.contains(**id))
        .filter_map(|&id| match forest.node(id).kind {
            NodeKind::File(file) => {
                let (types, services) = kept_children(forest, id, keep);
                // Extend blocks are not selectable on their own; they travel with their file.
                Some(file.rebuild(types, services, file.extends.clone()))
            }
            _ => None,
        })
        .collect()
}

fn kept_children(
    forest: &Forest<'_>,
    parent: NodeId,
    keep: &KeepSet,
) -> (Vec<TypeElement>, Vec<Service>) {
    let mut types = Vec::new();
    let mut services = Vec::new();
    for &child in &forest.node(parent).children {
        if !keep.contains(child) {
            continue;
        }
        match forest.node(child).kind {
            NodeKind::Message(message) => {
                let (nested, _) = kept_children(forest, child, keep);
                let mut message = message.clone();
                message.nested = nested;
                types.push(TypeElement::Message(message));
            }
            NodeKind::Enum(element) => types.push(TypeElement::Enum(element.clone())),
            NodeKind::Service(service) => services.push(service.clone()),
            NodeKind::Extend(_) | NodeKind::File(_) | NodeKind::Root => {}
        }
    }
    (types, services)
}

/// Filter qualified files down to `roots` and their transitive dependencies
pub fn filter<S: AsRef<str>>(files: &[ProtoFile], roots: &[S]) -> Result<Vec<ProtoFile>> {
    let forest = Forest::build(files);
    debug!(
        nodes = forest.len(),
        declarations = forest.named_count(),
        "built dependency forest"
    );

    let keep = forest.closure(roots)?;
    let filtered = reassemble(&forest, &keep);
    info!(
        roots = roots.len(),
        kept = keep.names(&forest).len(),
        declarations = forest.named_count(),
        files = filtered.len(),
        "filtered model to roots"
    );
    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumElement, ExtendBlock, Field, Label, Message, Rpc};

    fn end_to_end() -> Vec<ProtoFile> {
        vec![ProtoFile::new("pkg.proto", "pkg")
            .with_type(Message::new("A").with_field(Field::new(Label::Optional, "pkg.B", "b", 1)))
            .with_type(Message::new("B"))
            .with_type(Message::new("C"))
            .with_service(Service::new("S").with_rpc(Rpc::new("M", "pkg.A", "pkg.B")))
            .with_qualified_names()]
    }

    fn kept_names(files: &[ProtoFile], roots: &[&str]) -> Vec<String> {
        let forest = Forest::build(files);
        let keep = forest.closure(roots).unwrap();
        keep.names(&forest).into_iter().map(String::from).collect()
    }

    #[test]
    fn test_service_root_keeps_rpc_types() {
        assert_eq!(kept_names(&end_to_end(), &["pkg.S"]), vec!["pkg.A", "pkg.B", "pkg.S"]);
    }

    #[test]
    fn test_unreferenced_root_keeps_only_itself() {
        let filtered = filter(&end_to_end(), &["pkg.C"]).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].types.len(), 1);
        assert_eq!(filtered[0].types[0].qualified_name(), "pkg.C");
        assert!(filtered[0].services.is_empty());
    }

    #[test]
    fn test_nested_root_keeps_enclosing_message() {
        let files = vec![ProtoFile::new("n.proto", "n")
            .with_type(
                Message::new("Outer")
                    .with_field(Field::new(Label::Optional, "string", "s", 1))
                    .with_nested(Message::new("Inner"))
                    .with_nested(EnumElement::new("Unused")),
            )
            .with_type(Message::new("Other"))
            .with_qualified_names()];

        let filtered = filter(&files, &["n.Outer.Inner"]).unwrap();
        assert_eq!(filtered[0].types.len(), 1);
        let TypeElement::Message(outer) = &filtered[0].types[0] else {
            panic!("expected message");
        };
        // Fields are never pruned, unkept nested types are.
        assert_eq!(outer.fields.len(), 1);
        assert_eq!(outer.nested.len(), 1);
        assert_eq!(outer.nested[0].qualified_name(), "n.Outer.Inner");
    }

    #[test]
    fn test_mutual_references_terminate() {
        let files = vec![ProtoFile::new("c.proto", "c")
            .with_type(Message::new("A").with_field(Field::new(Label::Optional, "c.B", "b", 1)))
            .with_type(Message::new("B").with_field(Field::new(Label::Optional, "c.A", "a", 1)))
            .with_type(Message::new("Self").with_field(Field::new(Label::Repeated, "c.Self", "s", 1)))
            .with_qualified_names()];

        assert_eq!(kept_names(&files, &["c.B"]), vec!["c.A", "c.B"]);
        assert_eq!(kept_names(&files, &["c.Self"]), vec!["c.Self"]);
    }

    #[test]
    fn test_files_without_kept_children_are_dropped() {
        let mut files = end_to_end();
        files.push(
            ProtoFile::new("other.proto", "other")
                .with_type(Message::new("X"))
                .with_extend(
                    ExtendBlock::new("other.X")
                        .with_field(Field::new(Label::Optional, "int32", "ext", 100)),
                )
                .with_qualified_names(),
        );

        let filtered = filter(&files, &["pkg.A"]).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].path, "pkg.proto");

        let filtered = filter(&files, &["other.X"]).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].extends.len(), 1);
    }

    #[test]
    fn test_unknown_root() {
        match filter(&end_to_end(), &["pkg.D"]) {
            Err(SchemaError::UnknownRoot { name, .. }) => assert_eq!(name, "pkg.D"),
            other => panic!("Expected UnknownRoot, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_edge_is_integrity_error() {
        // Unqualified reference: the filter must not try to resolve it.
        let files = vec![ProtoFile::new("d.proto", "d")
            .with_type(Message::new("A").with_field(Field::new(Label::Optional, "B", "b", 1)))
            .with_type(Message::new("B"))
            .with_qualified_names()];

        match filter(&files, &["d.A"]) {
            Err(SchemaError::Integrity { source_name, target }) => {
                assert_eq!(source_name, "d.A");
                assert_eq!(target, "B");
            }
            other => panic!("Expected Integrity, got {:?}", other),
        }
    }

    #[test]
    fn test_scalar_rpc_types_are_skipped() {
        let files = vec![ProtoFile::new("s.proto", "s")
            .with_type(Message::new("Req"))
            .with_service(Service::new("Svc").with_rpc(Rpc::new("Ping", "s.Req", "bool")))
            .with_qualified_names()];
        assert_eq!(kept_names(&files, &["s.Svc"]), vec!["s.Req", "s.Svc"]);
    }

    #[test]
    fn test_empty_roots_keep_nothing() {
        let roots: [&str; 0] = [];
        assert!(filter(&end_to_end(), &roots).unwrap().is_empty());
    }
}
