//! Property tests for graph build, ordering and cycle detection.
//!
//! Each case writes a small random reference graph to a temp directory,
//! builds it through the filesystem and checks the structural invariants
//! against a brute-force reachability closure.

use std::collections::BTreeSet;
use std::path::PathBuf;

use atref_core::graph::{build_dependency_graph, detect_cycles, topological_sort};
use atref_core::reference::{ResolveOptions, normalize_path};
use proptest::prelude::*;
use tempfile::TempDir;

const MAX_FILES: usize = 7;

fn arb_edges() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1..=MAX_FILES).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec((0..n, 0..n), 0..=n * 2),
        )
    })
}

/// Edges always point from a lower to a higher index, so the graph is a DAG.
fn arb_dag_edges() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    arb_edges().prop_map(|(n, edges)| {
        let forward: Vec<(usize, usize)> = edges
            .into_iter()
            .filter(|(a, b)| a != b)
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect();
        (n, forward)
    })
}

struct Fixture {
    _dir: TempDir,
    files: Vec<PathBuf>,
    edges: BTreeSet<(usize, usize)>,
}

fn materialize(n: usize, edges: &[(usize, usize)]) -> Fixture {
    let dir = TempDir::new().expect("tempdir");
    let edges: BTreeSet<(usize, usize)> = edges.iter().copied().collect();
    let files: Vec<PathBuf> = (0..n)
        .map(|i| {
            let body: String = edges
                .iter()
                .filter(|(from, _)| *from == i)
                .map(|(_, to)| format!("see @f{to}.md\n"))
                .collect();
            let path = dir.path().join(format!("f{i}.md"));
            std::fs::write(&path, format!("# f{i}\n{body}")).expect("write");
            normalize_path(&path)
        })
        .collect();
    Fixture {
        _dir: dir,
        files,
        edges,
    }
}

/// `reach[a][b]`: b is reachable from a through one or more edges.
fn closure(n: usize, edges: &BTreeSet<(usize, usize)>) -> Vec<Vec<bool>> {
    let mut reach = vec![vec![false; n]; n];
    for &(a, b) in edges {
        reach[a][b] = true;
    }
    for k in 0..n {
        for i in 0..n {
            for j in 0..n {
                if reach[i][k] && reach[k][j] {
                    reach[i][j] = true;
                }
            }
        }
    }
    reach
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(64))]

    #[test]
    fn sorted_is_a_permutation_of_nodes((n, raw_edges) in arb_edges()) {
        let fx = materialize(n, &raw_edges);
        let graph = build_dependency_graph(&fx.files, &ResolveOptions::default());
        let order = topological_sort(&graph);

        prop_assert_eq!(order.sorted.len(), graph.len());
        let sorted: BTreeSet<_> = order.sorted.iter().cloned().collect();
        let nodes: BTreeSet<_> = graph.nodes().keys().cloned().collect();
        prop_assert_eq!(sorted, nodes);
    }

    #[test]
    fn acyclic_order_puts_dependencies_first((n, raw_edges) in arb_dag_edges()) {
        let fx = materialize(n, &raw_edges);
        let graph = build_dependency_graph(&fx.files, &ResolveOptions::default());
        let order = topological_sort(&graph);

        prop_assert!(order.cycles.is_empty());
        let position = |i: usize| {
            order.sorted.iter().position(|p| *p == fx.files[i]).expect("node in order")
        };
        for &(from, to) in &fx.edges {
            prop_assert!(position(to) < position(from), "f{} must precede f{}", to, from);
        }
    }

    #[test]
    fn cycle_members_are_exactly_nodes_on_cycles((n, raw_edges) in arb_edges()) {
        let fx = materialize(n, &raw_edges);
        let reach = closure(n, &fx.edges);
        let graph = build_dependency_graph(&fx.files, &ResolveOptions::default());

        let cycles = detect_cycles(&graph);
        for cycle in &cycles {
            let is_self_loop = cycle.len() == 1
                && graph.node(&cycle[0]).is_some_and(|node| node.dependencies.contains(&cycle[0]));
            prop_assert!(cycle.len() >= 2 || is_self_loop);
        }

        let reported: BTreeSet<PathBuf> = cycles.into_iter().flatten().collect();
        let expected: BTreeSet<PathBuf> = (0..n)
            .filter(|&i| reach[i][i])
            .map(|i| fx.files[i].clone())
            .collect();
        prop_assert_eq!(reported, expected);
    }

    #[test]
    fn edges_are_symmetric_and_roots_have_no_internal_deps((n, raw_edges) in arb_edges()) {
        let fx = materialize(n, &raw_edges);
        let graph = build_dependency_graph(&fx.files, &ResolveOptions::default());

        prop_assert!(graph.errors().is_empty());
        prop_assert_eq!(graph.internal_edge_count(), fx.edges.len());
        for node in graph.nodes().values() {
            for dep in &node.dependencies {
                let target = graph.node(dep).expect("all targets are inputs");
                prop_assert!(target.dependents.contains(&node.path));
            }
            let is_root = graph.root_files().contains(&node.path);
            prop_assert_eq!(is_root, node.dependencies.is_empty());
        }
    }
}
