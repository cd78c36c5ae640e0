//! Dependency-first ordering (Kahn's algorithm).
//!
//! A file is emitted only after every file it references inside the graph.
//! Nodes stuck on a cycle are appended at the end in graph order, so the
//! result always covers every node exactly once.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::build::DependencyGraph;
use super::cycles::detect_cycles;

/// Result of [`topological_sort`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopologicalOrder {
    /// Every node, dependencies before dependents where possible.
    pub sorted: Vec<PathBuf>,
    /// Cycles that prevented a complete ordering. Empty for acyclic graphs.
    pub cycles: Vec<Vec<PathBuf>>,
}

impl TopologicalOrder {
    /// Return `true` if the graph had no cycles.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        self.cycles.is_empty()
    }
}

/// Order the graph's nodes so that dependencies come first.
#[must_use]
pub fn topological_sort(graph: &DependencyGraph) -> TopologicalOrder {
    let mut in_degree: BTreeMap<&Path, usize> = graph
        .nodes()
        .values()
        .map(|node| (node.path.as_path(), graph.internal_dependencies(node).count()))
        .collect();

    let mut queue: VecDeque<&Path> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(path, _)| *path)
        .collect();

    let mut sorted: Vec<PathBuf> = Vec::with_capacity(graph.len());
    let mut emitted: HashSet<&Path> = HashSet::with_capacity(graph.len());

    while let Some(current) = queue.pop_front() {
        sorted.push(current.to_path_buf());
        emitted.insert(current);

        let Some(node) = graph.node(current) else {
            continue;
        };
        for dependent in &node.dependents {
            if let Some(degree) = in_degree.get_mut(dependent.as_path()) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    queue.push_back(dependent.as_path());
                }
            }
        }
    }

    if sorted.len() == graph.len() {
        return TopologicalOrder {
            sorted,
            cycles: Vec::new(),
        };
    }

    let cycles = detect_cycles(graph);
    let remaining: Vec<PathBuf> = graph
        .nodes()
        .keys()
        .filter(|path| !emitted.contains(path.as_path()))
        .cloned()
        .collect();
    debug!(
        remaining = remaining.len(),
        cycles = cycles.len(),
        "topological sort incomplete"
    );
    sorted.extend(remaining);

    TopologicalOrder { sorted, cycles }
}
