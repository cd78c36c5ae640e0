//! File dependency graph built from `@path` directives.
//!
//! # Overview
//!
//! Every input file becomes a [`DependencyNode`] keyed by its absolute path.
//! An edge `A → B` means "A references B" (B is a dependency of A). Only
//! edges whose target is itself an input file are *internal*; references to
//! files outside the set are kept in `dependencies` but never create a node.
//!
//! ## Pipeline
//!
//! ```text
//! input files
//!        ↓  build::GraphBuilder::build()
//! DependencyGraph (nodes, root_files, errors)
//!        ├─ order::topological_sort()  → dependencies first, cycles appended
//!        └─ cycles::detect_cycles()    → Tarjan SCCs incl. self-loops
//! ```
//!
//! ## Typical Usage
//!
//! ```rust,no_run
//! use atref_core::graph::{build_dependency_graph, detect_cycles, topological_sort};
//! use atref_core::reference::ResolveOptions;
//!
//! let graph = build_dependency_graph(&["docs/a.md", "docs/b.md"], &ResolveOptions::default());
//! let order = topological_sort(&graph);
//! assert_eq!(order.sorted.len(), graph.len());
//! for cycle in detect_cycles(&graph) {
//!     eprintln!("cycle: {cycle:?}");
//! }
//! ```

pub mod build;
pub mod cycles;
pub mod order;

pub use build::{
    DependencyGraph, DependencyNode, GraphBuilder, GraphError, GraphErrorKind,
    build_dependency_graph,
};
pub use cycles::detect_cycles;
pub use order::{TopologicalOrder, topological_sort};
