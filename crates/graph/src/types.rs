use crate::error::{GraphError, Result};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Interned node handle
pub(crate) type NodeId = u32;

/// Directed "depends-on" graph over chunk ids.
///
/// An edge `a -> b` means chunk `a` depends on chunk `b`. Ids are interned so
/// cycles are plain data. A node is released once its last edge is removed.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Adjacency map over interned ids
    pub(crate) graph: DiGraphMap<NodeId, ()>,

    /// NodeId -> chunk id
    pub(crate) names: HashMap<NodeId, String>,

    /// Chunk id -> NodeId
    pub(crate) index: HashMap<String, NodeId>,

    next_node: NodeId,
}

/// One edge, resolved back to chunk ids
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn intern(&mut self, id: &str) -> NodeId {
        if let Some(&node) = self.index.get(id) {
            return node;
        }
        let node = self.next_node;
        self.next_node = self.next_node.wrapping_add(1);
        self.names.insert(node, id.to_string());
        self.index.insert(id.to_string(), node);
        self.graph.add_node(node);
        node
    }

    pub(crate) fn lookup(&self, id: &str) -> Option<NodeId> {
        self.index.get(id).copied()
    }

    pub(crate) fn name(&self, node: NodeId) -> &str {
        self.names.get(&node).map_or("", String::as_str)
    }

    /// Forget a node that no longer has any edge
    fn release_if_isolated(&mut self, node: NodeId) {
        if self.graph.neighbors_directed(node, Direction::Outgoing).next().is_some()
            || self.graph.neighbors_directed(node, Direction::Incoming).next().is_some()
        {
            return;
        }
        self.graph.remove_node(node);
        if let Some(name) = self.names.remove(&node) {
            self.index.remove(&name);
        }
    }

    /// Record that `from` depends on `to`. Returns false if the edge existed.
    pub fn add_dependency(&mut self, from: &str, to: &str) -> Result<bool> {
        for id in [from, to] {
            if id.trim().is_empty() {
                return Err(GraphError::InvalidId(id.to_string()));
            }
        }

        let a = self.intern(from);
        let b = self.intern(to);
        Ok(self.graph.add_edge(a, b, ()).is_none())
    }

    /// Remove one edge, leaving both nodes and their other edges intact
    pub fn remove_dependency(&mut self, from: &str, to: &str) -> bool {
        match (self.lookup(from), self.lookup(to)) {
            (Some(a), Some(b)) => {
                let removed = self.graph.remove_edge(a, b).is_some();
                self.release_if_isolated(a);
                self.release_if_isolated(b);
                removed
            }
            _ => false,
        }
    }

    /// Drop every edge touching `id`, in both directions.
    ///
    /// Returns the number of edges removed.
    pub fn remove_all_dependencies_for(&mut self, id: &str) -> usize {
        let Some(node) = self.lookup(id) else {
            return 0;
        };

        let targets: Vec<NodeId> = self.graph.neighbors_directed(node, Direction::Outgoing).collect();
        let sources: Vec<NodeId> = self.graph.neighbors_directed(node, Direction::Incoming).collect();
        let mut removed = 0;
        for target in &targets {
            removed += usize::from(self.graph.remove_edge(node, *target).is_some());
        }
        for source in &sources {
            removed += usize::from(self.graph.remove_edge(*source, node).is_some());
        }

        for other in targets.into_iter().chain(sources) {
            self.release_if_isolated(other);
        }
        self.release_if_isolated(node);
        removed
    }

    /// Drop the outgoing edges of `id` only. Chunks depending on `id` keep
    /// their edges.
    ///
    /// Returns the number of edges removed.
    pub fn clear_dependencies_of(&mut self, id: &str) -> usize {
        let Some(node) = self.lookup(id) else {
            return 0;
        };

        let targets: Vec<NodeId> = self.graph.neighbors_directed(node, Direction::Outgoing).collect();
        for target in &targets {
            self.graph.remove_edge(node, *target);
        }

        for target in &targets {
            self.release_if_isolated(*target);
        }
        self.release_if_isolated(node);
        targets.len()
    }

    /// Forget every node and edge
    pub fn reset(&mut self) {
        self.graph.clear();
        self.names.clear();
        self.index.clear();
        self.next_node = 0;
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All edges, sorted
    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges: Vec<DependencyEdge> = self
            .graph
            .all_edges()
            .map(|(a, b, _)| DependencyEdge {
                from: self.name(a).to_string(),
                to: self.name(b).to_string(),
            })
            .collect();
        edges.sort();
        edges
    }
}
