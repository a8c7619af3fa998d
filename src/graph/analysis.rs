//! Declaration Graph Analysis
//!
//! A petgraph view of the qualified model, one node per named declaration.
//! Used for cycle reporting (mutually recursive messages) and DOT export.
//! The closure filter does not depend on it.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{closure, Forest, NodeId, NodeKind};
use crate::error::{Result, SchemaError};

/// Why one declaration depends on another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Message field type
    Field,
    /// Rpc request or response type
    Rpc,
    /// Enclosing message owns a nested type
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclNode {
    pub name: String,
    pub kind: String,
}

/// Directed graph of declaration dependencies
pub struct DependencyGraph {
    graph: DiGraph<DeclNode, EdgeKind>,
    by_name: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build from a forest over a qualified model
    pub fn from_forest(forest: &Forest<'_>) -> Result<Self> {
        let mut graph = DiGraph::with_capacity(forest.named_count(), forest.named_count() * 2);
        let mut by_name = HashMap::with_capacity(forest.named_count());
        let mut indices: HashMap<NodeId, NodeIndex> = HashMap::with_capacity(forest.named_count());

        for (id, node) in forest.nodes() {
            let Some(name) = node.name() else {
                continue;
            };
            // Duplicates were already dropped from the forest index.
            if forest.lookup(name) != Some(id) {
                continue;
            }
            let idx = graph.add_node(DeclNode {
                name: name.to_string(),
                kind: node.kind.label().to_string(),
            });
            by_name.insert(name.to_string(), idx);
            indices.insert(id, idx);
        }

        for (id, node) in forest.nodes() {
            let Some(&from) = indices.get(&id) else {
                continue;
            };
            if let Some(parent) = node.parent.and_then(|p| indices.get(&p)) {
                graph.add_edge(*parent, from, EdgeKind::Contains);
            }

            let edge_kind = match node.kind {
                NodeKind::Service(_) => EdgeKind::Rpc,
                _ => EdgeKind::Field,
            };
            for target in closure::dependency_targets(node.kind) {
                let to = by_name.get(target).ok_or_else(|| SchemaError::Integrity {
                    source_name: node.name().unwrap_or_default().to_string(),
                    target: target.to_string(),
                })?;
                graph.add_edge(from, *to, edge_kind);
            }
        }

        Ok(Self { graph, by_name })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Direct dependencies of a declaration (field and rpc edges only)
    pub fn refs_out(&self, name: &str) -> Vec<&str> {
        let Some(&idx) = self.by_name.get(name) else {
            return Vec::new();
        };
        let mut targets: Vec<(NodeIndex, &str)> = self
            .graph
            .edges(idx)
            .filter(|e| *e.weight() != EdgeKind::Contains)
            .map(|e| (e.target(), self.graph[e.target()].name.as_str()))
            .collect();
        targets.sort_by_key(|(i, _)| *i);
        targets.dedup_by_key(|(i, _)| *i);
        targets.into_iter().map(|(_, name)| name).collect()
    }

    /// Groups of declarations that reference each other through fields.
    ///
    /// Includes multi-member strongly connected components and single
    /// declarations with a field of their own type. Members and groups are
    /// in model order.
    pub fn cycle_groups(&self) -> Vec<Vec<&str>> {
        let fields_only = self.graph.filter_map(
            |_, node| Some(node),
            |_, edge| (*edge == EdgeKind::Field).then_some(()),
        );

        let mut groups: Vec<Vec<NodeIndex>> = kosaraju_scc(&fields_only)
            .into_iter()
            .filter(|scc| scc.len() > 1 || fields_only.contains_edge(scc[0], scc[0]))
            .map(|mut scc| {
                scc.sort();
                scc
            })
            .collect();
        groups.sort_by_key(|scc| scc[0]);

        groups
            .into_iter()
            .map(|scc| scc.into_iter().map(|i| self.graph[i].name.as_str()).collect())
            .collect()
    }

    /// Export to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph Declarations {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8];\n");
        output.push('\n');

        let color_map = [
            ("message", "#00BCD4"),
            ("enum", "#FF5722"),
            ("service", "#4CAF50"),
        ];

        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            let color = color_map
                .iter()
                .find(|(kind, _)| *kind == node.kind)
                .map(|(_, color)| *color)
                .unwrap_or("#9E9E9E");
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\", fillcolor=\"{}\"];\n",
                node.name, node.name, color
            ));
        }

        output.push('\n');

        for edge in self.graph.edge_references() {
            let source = &self.graph[edge.source()].name;
            let target = &self.graph[edge.target()].name;
            let style = match edge.weight() {
                EdgeKind::Field => "",
                EdgeKind::Rpc => " [color=\"#4CAF50\"]",
                EdgeKind::Contains => " [style=dashed, arrowhead=odiamond]",
            };
            output.push_str(&format!("  \"{}\" -> \"{}\"{};\n", source, target, style));
        }

        output.push_str("}\n");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Label, Message, ProtoFile, Rpc, Service};

    fn cyclic() -> Vec<ProtoFile> {
        vec![ProtoFile::new("c.proto", "c")
            .with_type(Message::new("A").with_field(Field::new(Label::Optional, "c.B", "b", 1)))
            .with_type(Message::new("B").with_field(Field::new(Label::Optional, "c.A", "a", 1)))
            .with_type(
                Message::new("Tree")
                    .with_field(Field::new(Label::Repeated, "c.Tree", "children", 1))
                    .with_nested(
                        Message::new("Leaf").with_field(Field::new(Label::Optional, "c.Tree", "up", 1)),
                    ),
            )
            .with_service(Service::new("S").with_rpc(Rpc::new("Get", "c.A", "c.Tree")))
            .with_qualified_names()]
    }

    #[test]
    fn test_graph_edges() {
        let files = cyclic();
        let forest = Forest::build(&files);
        let graph = DependencyGraph::from_forest(&forest).unwrap();

        assert_eq!(graph.node_count(), 5);
        // A→B, B→A, Tree→Tree, Tree⊃Leaf, Leaf→Tree, S→A, S→Tree
        assert_eq!(graph.edge_count(), 7);
        assert_eq!(graph.refs_out("c.S"), vec!["c.A", "c.Tree"]);
        assert!(graph.refs_out("missing").is_empty());
    }

    #[test]
    fn test_cycle_groups() {
        let files = cyclic();
        let forest = Forest::build(&files);
        let graph = DependencyGraph::from_forest(&forest).unwrap();

        // Leaf→Tree is not a cycle: containment edges are ignored.
        assert_eq!(graph.cycle_groups(), vec![vec!["c.A", "c.B"], vec!["c.Tree"]]);
    }

    #[test]
    fn test_dot_export() {
        let files = cyclic();
        let forest = Forest::build(&files);
        let dot = DependencyGraph::from_forest(&forest).unwrap().to_dot();

        assert!(dot.starts_with("digraph Declarations {"));
        assert!(dot.contains("\"c.A\" -> \"c.B\";"));
        assert!(dot.contains("\"c.Tree\" -> \"c.Tree.Leaf\" [style=dashed"));
        assert!(dot.contains("\"c.S\" [label=\"c.S\", fillcolor=\"#4CAF50\"]"));
    }
}
