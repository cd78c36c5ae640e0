#![forbid(unsafe_code)]
//! atref-core library.
//!
//! Resolves `@path` inclusion directives, builds a dependency graph over the
//! referenced files, and compiles fully expanded documents.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums for library failures, `anyhow::Result` for
//!   configuration loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).
//!
//! # Modules
//!
//! - [`reference`]: directive extraction and path resolution.
//! - [`graph`]: dependency graph build, topological order, cycle detection.
//! - [`compile`]: recursive transclusion compiler and reference tree.
//! - [`config`]: project and user configuration.
//! - [`error`]: error types and stable error codes.

pub mod compile;
pub mod config;
pub mod error;
pub mod graph;
pub mod reference;

pub use compile::{
    CompileOptions, CompileResult, CompiledContent, CompiledReference, Compiler, WrapperKind,
};
pub use error::{CompileError, ErrorCode};
pub use graph::{
    DependencyGraph, DependencyNode, GraphBuilder, GraphError, GraphErrorKind, TopologicalOrder,
    build_dependency_graph, detect_cycles, topological_sort,
};
pub use reference::{
    AtExtractor, DirectiveOccurrence, Extractor, FsResolver, ResolveOptions, ResolvedPath,
    Resolver,
};
