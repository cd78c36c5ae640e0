//! Cycle detection over the internal edges of a [`DependencyGraph`].
//!
//! References to files outside the input set are dropped before Tarjan's
//! algorithm runs, so they can never close a loop. A document that names
//! itself (`@self.md`, or any spelling that normalises to the same path)
//! shows up as a single-member cycle.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use super::build::DependencyGraph;

/// Find every group of documents that transclude each other.
///
/// Each entry lists the member paths in sorted order and the entries are
/// sorted too, so repeated runs print identically.
#[must_use]
pub fn detect_cycles(graph: &DependencyGraph) -> Vec<Vec<PathBuf>> {
    let projection = internal_projection(graph);

    let mut cycles = Vec::new();
    for component in tarjan_scc(&projection) {
        if !closes_loop(&projection, &component) {
            continue;
        }
        let mut members: Vec<PathBuf> = component
            .iter()
            .map(|&idx| projection[idx].to_path_buf())
            .collect();
        members.sort_unstable();
        cycles.push(members);
    }

    cycles.sort_unstable();
    cycles
}

/// A component of two or more documents always loops; a lone document only
/// when it references itself.
fn closes_loop(projection: &DiGraph<&Path, ()>, component: &[NodeIndex]) -> bool {
    match component {
        [] => false,
        [single] => projection.find_edge(*single, *single).is_some(),
        _ => true,
    }
}

/// Load the internal-edge projection into a petgraph `DiGraph`, adding nodes
/// in graph order.
fn internal_projection(graph: &DependencyGraph) -> DiGraph<&Path, ()> {
    let mut projection = DiGraph::with_capacity(graph.len(), graph.internal_edge_count());
    let index: HashMap<&Path, NodeIndex> = graph
        .nodes()
        .keys()
        .map(|path| (path.as_path(), projection.add_node(path.as_path())))
        .collect();

    for node in graph.nodes().values() {
        let from = index[node.path.as_path()];
        for dep in graph.internal_dependencies(node) {
            if let Some(&to) = index.get(dep.as_path()) {
                projection.add_edge(from, to, ());
            }
        }
    }

    projection
}
