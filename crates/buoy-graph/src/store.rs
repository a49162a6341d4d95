use std::collections::HashMap;

use buoy_core::now_millis;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use tracing::debug;

use crate::GraphError;
use crate::edge::{Edge, EdgeAttrs, Relation};
use crate::node::{GraphEntity, Node, NodeAttrs, NodeType, split_reference};

pub type NodeHandle = NodeIndex;
pub type EdgeHandle = EdgeIndex;

/// Append-only multigraph of typed nodes and directed, typed edges.
///
/// Nodes live in an arena addressed by [`NodeHandle`]; `(type, key)` pairs map to
/// handles so bare and prefixed references resolve the same way. Edges are indexed
/// per relation in both directions.
#[derive(Debug, Clone)]
pub struct Graph {
    inner: DiGraph<Node, Edge>,
    handles: HashMap<(NodeType, String), NodeHandle>,
    outgoing: HashMap<(NodeHandle, Relation), Vec<EdgeHandle>>,
    incoming: HashMap<(NodeHandle, Relation), Vec<EdgeHandle>>,
    session_at: i64,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_graph() -> Graph {
    Graph::new()
}

impl Graph {
    pub fn new() -> Self {
        Self::at(now_millis())
    }

    /// Graph whose nodes and edges are stamped with `session_at`.
    pub fn at(session_at: i64) -> Self {
        Self {
            inner: DiGraph::new(),
            handles: HashMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            session_at,
        }
    }

    pub fn session_at(&self) -> i64 {
        self.session_at
    }

    /// Inserts the node at `type:key`, or overwrites its attributes if present.
    /// Existing edges keep pointing at the node.
    pub fn add_node(&mut self, key: impl Into<String>, attrs: NodeAttrs) -> NodeHandle {
        let key = key.into();
        let node_type = attrs.node_type();
        if let Some(&handle) = self.handles.get(&(node_type, key.clone())) {
            if let Some(node) = self.inner.node_weight_mut(handle) {
                node.attrs = attrs;
            }
            return handle;
        }

        let handle = self.inner.add_node(Node {
            key: key.clone(),
            attrs,
            created_at: self.session_at,
        });
        self.handles.insert((node_type, key), handle);
        handle
    }

    /// Appends a directed edge. Endpoints may be bare keys or `type:key` ids;
    /// bare keys are tried against the relation's expected endpoint types.
    pub fn add_edge(
        &mut self,
        relation: Relation,
        from: &str,
        to: &str,
        attrs: EdgeAttrs,
    ) -> Result<EdgeHandle, GraphError> {
        let from_handle = self
            .resolve_any(from, relation.source_types())
            .ok_or_else(|| GraphError::UnknownNode {
                reference: from.to_owned(),
                relation: relation.as_str(),
            })?;
        let to_handle = self
            .resolve_any(to, relation.target_types())
            .ok_or_else(|| GraphError::UnknownNode {
                reference: to.to_owned(),
                relation: relation.as_str(),
            })?;
        Ok(self.add_edge_between(relation, from_handle, to_handle, attrs))
    }

    pub fn add_edge_between(
        &mut self,
        relation: Relation,
        from: NodeHandle,
        to: NodeHandle,
        attrs: EdgeAttrs,
    ) -> EdgeHandle {
        let edge = Edge {
            relation,
            from_id: self.inner[from].id(),
            to_id: self.inner[to].id(),
            attrs,
            created_at: self.session_at,
        };
        debug!(
            relation = relation.as_str(),
            from = %edge.from_id,
            to = %edge.to_id,
            "graph edge added"
        );
        let handle = self.inner.add_edge(from, to, edge);
        self.outgoing.entry((from, relation)).or_default().push(handle);
        self.incoming.entry((to, relation)).or_default().push(handle);
        handle
    }

    /// Resolves `key` or `type:key` to a node of `node_type`.
    pub fn resolve(&self, reference: &str, node_type: NodeType) -> Option<NodeHandle> {
        self.resolve_any(reference, &[node_type])
    }

    /// Resolves a reference against the first matching type in `candidates`.
    /// A prefixed reference must name one of the candidates.
    pub fn resolve_any(&self, reference: &str, candidates: &[NodeType]) -> Option<NodeHandle> {
        let reference = reference.trim();
        if let (Some(node_type), key) = split_reference(reference) {
            if candidates.contains(&node_type) {
                if let Some(handle) = self.lookup(node_type, key) {
                    return Some(handle);
                }
            }
        }
        candidates
            .iter()
            .find_map(|node_type| self.lookup(*node_type, reference))
    }

    /// Resolves a prefixed id of any type, falling back to `candidates` for bare keys.
    pub fn resolve_prefixed_or(
        &self,
        reference: &str,
        candidates: &[NodeType],
    ) -> Option<NodeHandle> {
        match split_reference(reference) {
            (Some(node_type), key) => self
                .lookup(node_type, key)
                .or_else(|| self.resolve_any(reference, candidates)),
            (None, _) => self.resolve_any(reference, candidates),
        }
    }

    fn lookup(&self, node_type: NodeType, key: &str) -> Option<NodeHandle> {
        self.handles.get(&(node_type, key.to_owned())).copied()
    }

    pub fn node(&self, handle: NodeHandle) -> &Node {
        &self.inner[handle]
    }

    pub fn node_id(&self, handle: NodeHandle) -> String {
        self.inner[handle].id()
    }

    pub fn edge(&self, handle: EdgeHandle) -> &Edge {
        &self.inner[handle]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeHandle, &Node)> + '_ {
        self.inner
            .node_indices()
            .map(move |handle| (handle, &self.inner[handle]))
    }

    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = (NodeHandle, &Node)> + '_ {
        self.nodes()
            .filter(move |(_, node)| node.node_type() == node_type)
    }

    /// Outgoing edges of `relation`, paired with their target node.
    pub fn outgoing(
        &self,
        handle: NodeHandle,
        relation: Relation,
    ) -> impl Iterator<Item = (&Edge, NodeHandle)> + '_ {
        self.outgoing
            .get(&(handle, relation))
            .into_iter()
            .flatten()
            .filter_map(move |edge| {
                let (_, target) = self.inner.edge_endpoints(*edge)?;
                Some((&self.inner[*edge], target))
            })
    }

    /// Incoming edges of `relation`, paired with their source node.
    pub fn incoming(
        &self,
        handle: NodeHandle,
        relation: Relation,
    ) -> impl Iterator<Item = (&Edge, NodeHandle)> + '_ {
        self.incoming
            .get(&(handle, relation))
            .into_iter()
            .flatten()
            .filter_map(move |edge| {
                let (source, _) = self.inner.edge_endpoints(*edge)?;
                Some((&self.inner[*edge], source))
            })
    }

    pub fn has_outgoing(&self, handle: NodeHandle, relation: Relation) -> bool {
        self.outgoing
            .get(&(handle, relation))
            .is_some_and(|edges| !edges.is_empty())
    }

    pub fn has_incoming(&self, handle: NodeHandle, relation: Relation) -> bool {
        self.incoming
            .get(&(handle, relation))
            .is_some_and(|edges| !edges.is_empty())
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_node_overwrites_attributes_in_place() {
        let mut graph = Graph::at(1);
        let first = graph.add_node("primary", NodeAttrs::token("primary"));
        let second = graph.add_node(
            "primary",
            NodeAttrs::Token {
                name: "primary".to_owned(),
                value: Some("#3b82f6".to_owned()),
                category: Some("color".to_owned()),
                deprecated: false,
            },
        );
        assert_eq!(first, second);
        assert_eq!(graph.node_count(), 1);
        assert!(matches!(
            &graph.node(first).attrs,
            NodeAttrs::Token { value: Some(value), .. } if value == "#3b82f6"
        ));
    }

    #[test]
    fn same_key_with_different_types_are_distinct_nodes() {
        let mut graph = Graph::at(1);
        let token = graph.add_node("button", NodeAttrs::token("button"));
        let component = graph.add_node("button", NodeAttrs::component("button"));
        assert_ne!(token, component);
        assert_eq!(graph.resolve("button", NodeType::Token), Some(token));
        assert_eq!(graph.resolve("component:button", NodeType::Component), Some(component));
        assert_eq!(graph.resolve("component:button", NodeType::Token), None);
    }

    #[test]
    fn add_edge_accepts_bare_and_prefixed_endpoints() {
        let mut graph = Graph::at(1);
        let file = graph.add_node("src/Button.tsx", NodeAttrs::file("src/Button.tsx"));
        let token = graph.add_node("primary", NodeAttrs::token("primary"));

        graph
            .add_edge(Relation::Uses, "src/Button.tsx", "primary", EdgeAttrs::None)
            .expect("bare endpoints");
        graph
            .add_edge(
                Relation::Uses,
                "file:src/Button.tsx",
                "token:primary",
                EdgeAttrs::None,
            )
            .expect("prefixed endpoints");

        assert_eq!(graph.outgoing(file, Relation::Uses).count(), 2);
        assert_eq!(graph.incoming(token, Relation::Uses).count(), 2);
        assert!(!graph.has_incoming(token, Relation::Renders));
        let (edge, source) = graph
            .incoming(token, Relation::Uses)
            .next()
            .expect("incoming edge");
        assert_eq!(source, file);
        assert_eq!(edge.from_id, "file:src/Button.tsx");
        assert_eq!(edge.created_at, 1);
    }

    #[test]
    fn add_edge_rejects_unknown_endpoints() {
        let mut graph = Graph::at(1);
        graph.add_node("primary", NodeAttrs::token("primary"));
        let err = graph
            .add_edge(Relation::Uses, "src/Missing.tsx", "primary", EdgeAttrs::None)
            .expect_err("missing source");
        assert!(matches!(err, GraphError::UnknownNode { .. }));
        assert_eq!(graph.edge_count(), 0);
    }
}
