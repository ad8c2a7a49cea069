use crate::types::{DependencyGraph, NodeId};
use petgraph::Direction;
use std::collections::{BTreeSet, HashSet, VecDeque};

impl DependencyGraph {
    /// Direct dependencies of `id` (outgoing edges)
    pub fn dependencies_of(&self, id: &str) -> BTreeSet<String> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Direct dependents of `id` (incoming edges)
    pub fn dependents_of(&self, id: &str) -> BTreeSet<String> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Everything the seeds depend on, directly or not. Seeds are excluded.
    pub fn transitive_dependencies<S: AsRef<str>>(&self, ids: &[S]) -> BTreeSet<String> {
        self.reachable(ids, Direction::Outgoing)
    }

    /// Everything that depends on the seeds, directly or not. Seeds are excluded.
    pub fn transitive_dependents<S: AsRef<str>>(&self, ids: &[S]) -> BTreeSet<String> {
        self.reachable(ids, Direction::Incoming)
    }

    /// Union of transitive dependencies and dependents
    pub fn all_related<S: AsRef<str>>(&self, ids: &[S]) -> BTreeSet<String> {
        let mut related = self.transitive_dependencies(ids);
        related.extend(self.transitive_dependents(ids));
        related
    }

    fn neighbors(&self, id: &str, direction: Direction) -> BTreeSet<String> {
        let Some(node) = self.lookup(id) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors_directed(node, direction)
            .map(|n| self.name(n).to_string())
            .collect()
    }

    /// Breadth-first walk with a visited set; cycles terminate.
    fn reachable<S: AsRef<str>>(&self, ids: &[S], direction: Direction) -> BTreeSet<String> {
        let seeds: HashSet<NodeId> = ids.iter().filter_map(|id| self.lookup(id.as_ref())).collect();
        let mut visited = seeds.clone();
        let mut queue: VecDeque<NodeId> = seeds.iter().copied().collect();
        let mut result = BTreeSet::new();

        while let Some(current) = queue.pop_front() {
            for next in self.graph.neighbors_directed(current, direction) {
                if visited.insert(next) {
                    result.insert(self.name(next).to_string());
                    queue.push_back(next);
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    fn chain() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A", "B").unwrap();
        graph.add_dependency("B", "C").unwrap();
        graph.add_dependency("C", "D").unwrap();
        graph.add_dependency("X", "Y").unwrap();
        graph
    }

    #[test]
    fn test_direct_neighbors() {
        let graph = chain();
        assert_eq!(graph.dependencies_of("B"), set(&["C"]));
        assert_eq!(graph.dependents_of("B"), set(&["A"]));
        assert!(graph.dependencies_of("missing").is_empty());
    }

    #[test]
    fn test_chain_closure() {
        let graph = chain();
        assert_eq!(graph.transitive_dependencies(&["A"]), set(&["B", "C", "D"]));
        assert_eq!(graph.transitive_dependents(&["D"]), set(&["A", "B", "C"]));
        assert_eq!(graph.all_related(&["B"]), set(&["A", "C", "D"]));
    }

    #[test]
    fn test_cycles_terminate() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A", "B").unwrap();
        graph.add_dependency("B", "C").unwrap();
        graph.add_dependency("C", "A").unwrap();
        graph.add_dependency("C", "C").unwrap();

        assert_eq!(graph.transitive_dependencies(&["A"]), set(&["B", "C"]));
        assert_eq!(graph.transitive_dependents(&["A"]), set(&["B", "C"]));
    }

    #[test]
    fn test_multiple_seeds_excluded() {
        let graph = chain();
        assert_eq!(graph.transitive_dependencies(&["A", "C"]), set(&["B", "D"]));
        assert!(graph.transitive_dependencies(&["unknown"]).is_empty());
    }
}
