//! Declaration Dependency Forest
//!
//! Arena-allocated tree of the qualified model: one root pseudo-node owns a
//! node per file, each file node owns its top-level declarations, and message
//! nodes own their nested types. Dependency edges are not stored; they are
//! read off each node's declaration and resolved through the name index.
//!
//! The forest borrows the model it was built from and is rebuilt for every
//! filter call. Shared by:
//! - the closure filter (root-driven pruning)
//! - graph analysis (cycle groups, DOT export)

pub mod analysis;
pub mod closure;

pub use analysis::{DeclNode, DependencyGraph, EdgeKind};
pub use closure::{filter, reassemble, KeepSet};

use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::warn;

use crate::schema::{EnumElement, ExtendBlock, Message, ProtoFile, Service, TypeElement};

/// Index of a node in the forest arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a forest node wraps
#[derive(Debug, Clone, Copy)]
pub enum NodeKind<'a> {
    Root,
    File(&'a ProtoFile),
    Message(&'a Message),
    Enum(&'a EnumElement),
    Service(&'a Service),
    Extend(&'a ExtendBlock),
}

impl<'a> NodeKind<'a> {
    /// Fully-qualified name; `None` for the root, files and extend blocks
    pub fn name(&self) -> Option<&'a str> {
        match *self {
            Self::Message(m) => Some(&m.qualified_name),
            Self::Enum(e) => Some(&e.qualified_name),
            Self::Service(s) => Some(&s.qualified_name),
            Self::Root | Self::File(_) | Self::Extend(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::File(_) => "file",
            Self::Message(_) => "message",
            Self::Enum(_) => "enum",
            Self::Service(_) => "service",
            Self::Extend(_) => "extend",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForestNode<'a> {
    pub kind: NodeKind<'a>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl<'a> ForestNode<'a> {
    pub fn name(&self) -> Option<&'a str> {
        self.kind.name()
    }
}

/// Containment forest plus the name → node index
pub struct Forest<'a> {
    nodes: Vec<ForestNode<'a>>,
    index: IndexMap<&'a str, NodeId>,
}

impl<'a> Forest<'a> {
    /// The root pseudo-node owning every file
    pub const ROOT: NodeId = NodeId(0);

    /// Decompose a set of files into a forest of nodes
    pub fn build(files: &'a [ProtoFile]) -> Self {
        let mut forest = Forest {
            nodes: vec![ForestNode {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
            index: IndexMap::new(),
        };

        for file in files {
            let file_id = forest.push(NodeKind::File(file), Self::ROOT);
            for element in &file.types {
                forest.push_type(element, file_id);
            }
            for service in &file.services {
                forest.push(NodeKind::Service(service), file_id);
            }
            for extend in &file.extends {
                forest.push(NodeKind::Extend(extend), file_id);
            }
        }

        forest
    }

    fn push_type(&mut self, element: &'a TypeElement, parent: NodeId) {
        match element {
            TypeElement::Message(message) => {
                let id = self.push(NodeKind::Message(message), parent);
                for nested in &message.nested {
                    self.push_type(nested, id);
                }
            }
            TypeElement::Enum(element) => {
                self.push(NodeKind::Enum(element), parent);
            }
        }
    }

    fn push(&mut self, kind: NodeKind<'a>, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ForestNode {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);

        if let Some(name) = kind.name() {
            match self.index.entry(name) {
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
                Entry::Occupied(_) => {
                    warn!(name, kind = kind.label(), "duplicate declaration name, keeping the first");
                }
            }
        }
        id
    }

    // ========== Public API ==========

    /// Total node count, including the root and file nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Number of named declarations
    pub fn named_count(&self) -> usize {
        self.index.len()
    }

    pub fn node(&self, id: NodeId) -> &ForestNode<'a> {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ForestNode<'a>)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Look up a declaration by fully-qualified name
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    /// All declaration names in model order
    pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.index.keys().copied()
    }

    /// Raw outgoing references of a node, as written in the qualified model
    pub fn dependencies(&self, id: NodeId) -> Vec<&'a str> {
        closure::dependency_targets(self.nodes[id.0].kind)
    }

    /// Containment chain from `id` up to (excluding) the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[id.0].parent, move |p| self.nodes[p.0].parent)
            .filter(|p| *p != Self::ROOT)
    }

    /// Closest known names for an unknown one, best first
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<String> {
        use fuzzy_matcher::skim::SkimMatcherV2;
        use fuzzy_matcher::FuzzyMatcher;

        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<(i64, &str)> = self
            .index
            .keys()
            .filter_map(|name| matcher.fuzzy_match(name, query).map(|score| (score, *name)))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, name)| name.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Label, Rpc};

    fn sample() -> Vec<ProtoFile> {
        vec![
            ProtoFile::new("a.proto", "pkg")
                .with_type(
                    Message::new("A")
                        .with_field(Field::new(Label::Optional, "pkg.B", "b", 1))
                        .with_field(Field::new(Label::Optional, "int32", "n", 2))
                        .with_nested(EnumElement::new("Kind")),
                )
                .with_type(Message::new("B"))
                .with_service(Service::new("S").with_rpc(Rpc::new("M", "pkg.A", "pkg.B")))
                .with_extend(ExtendBlock::new("pkg.A"))
                .with_qualified_names(),
            ProtoFile::new("b.proto", "other")
                .with_type(Message::new("C"))
                .with_qualified_names(),
        ]
    }

    #[test]
    fn test_forest_shape() {
        let files = sample();
        let forest = Forest::build(&files);

        // root + 2 files + A, Kind, B, S, extend + C
        assert_eq!(forest.len(), 9);
        assert_eq!(forest.named_count(), 5);
        assert_eq!(forest.node(Forest::ROOT).children.len(), 2);

        let names: Vec<&str> = forest.names().collect();
        assert_eq!(names, vec!["pkg.A", "pkg.A.Kind", "pkg.B", "pkg.S", "other.C"]);

        let kind = forest.lookup("pkg.A.Kind").unwrap();
        let parent = forest.node(kind).parent.unwrap();
        assert_eq!(forest.node(parent).name(), Some("pkg.A"));
        assert_eq!(forest.ancestors(kind).count(), 2);
    }

    #[test]
    fn test_dependencies_skip_scalars() {
        let files = sample();
        let forest = Forest::build(&files);

        let a = forest.lookup("pkg.A").unwrap();
        assert_eq!(forest.dependencies(a), vec!["pkg.B"]);

        let s = forest.lookup("pkg.S").unwrap();
        assert_eq!(forest.dependencies(s), vec!["pkg.A", "pkg.B"]);

        let kind = forest.lookup("pkg.A.Kind").unwrap();
        assert!(forest.dependencies(kind).is_empty());
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let files = vec![
            ProtoFile::new("a.proto", "pkg").with_type(Message::new("A")).with_qualified_names(),
            ProtoFile::new("b.proto", "pkg").with_type(Message::new("A")).with_qualified_names(),
        ];
        let forest = Forest::build(&files);
        assert_eq!(forest.named_count(), 1);

        let a = forest.lookup("pkg.A").unwrap();
        let file = forest.node(a).parent.unwrap();
        match forest.node(file).kind {
            NodeKind::File(f) => assert_eq!(f.path, "a.proto"),
            other => panic!("Expected file, got {:?}", other),
        }
    }

    #[test]
    fn test_suggestions() {
        let files = sample();
        let forest = Forest::build(&files);
        let suggestions = forest.suggest("pkg.Knd", 3);
        assert_eq!(suggestions.first().map(String::as_str), Some("pkg.A.Kind"));
        assert!(forest.suggest("zzzz", 3).is_empty());
    }
}
