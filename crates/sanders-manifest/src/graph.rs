//! Dependency graph management using `petgraph`.
//!
//! Builds a directed acyclic graph from the references between declarations
//! and resolves the order a provisioning engine would create them in.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use sanders_common::error::{InfraError, Result};

use crate::set::ResourceSet;

/// A dependency graph of logical ids.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: petgraph::Graph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
            nodes: HashMap::new(),
        }
    }

    /// Builds the graph of every declaration in `resources` and the
    /// references between them. References to undeclared ids are skipped;
    /// [`crate::validate`] reports those.
    #[must_use]
    pub fn from_resources(resources: &ResourceSet) -> Self {
        let mut graph = Self::new();
        for declaration in resources.iter() {
            let _ = graph.add_resource(declaration.logical_id());
        }
        for declaration in resources.iter() {
            let Some(&dependent) = graph.nodes.get(declaration.logical_id()) else {
                continue;
            };
            for target in declaration.references() {
                if let Some(&dependency) = graph.nodes.get(&target) {
                    graph.add_dependency(dependent, dependency);
                }
            }
        }
        graph
    }

    /// Adds a node, returning the existing index if the id is known.
    pub fn add_resource(&mut self, logical_id: impl Into<String>) -> NodeIndex {
        let logical_id = logical_id.into();
        if let Some(&idx) = self.nodes.get(&logical_id) {
            return idx;
        }
        let idx = self.graph.add_node(logical_id.clone());
        let _ = self.nodes.insert(logical_id, idx);
        idx
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent`
    /// so that topological sort yields dependencies first.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.update_edge(dependency, dependent, ());
    }

    /// Logical ids `logical_id` directly depends on, sorted.
    #[must_use]
    pub fn dependencies_of(&self, logical_id: &str) -> Vec<String> {
        let Some(&idx) = self.nodes.get(logical_id) else {
            return Vec::new();
        };
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect();
        deps.sort();
        deps
    }

    /// Returns a topological ordering: dependencies appear before the
    /// declarations that reference them.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph contains cycles.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => Err(InfraError::Cycle {
                logical_id: self
                    .graph
                    .node_weight(cycle.node_id())
                    .cloned()
                    .unwrap_or_default(),
            }),
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
