//! Graph construction from a set of input files.
//!
//! # Edge Direction
//!
//! `A → B` means A's text contains a directive resolving to B. `B` is
//! recorded in A's `dependencies`; if B is part of the input set, A is also
//! recorded in B's `dependents`.
//!
//! ## Node Set
//!
//! The node set is exactly the (deduplicated, absolutised) input set and is
//! fixed before any edge is added. A dependency discovered outside that set
//! stays an external dependency: it is listed on the referencing node but
//! gets no node of its own and no reverse edge.
//!
//! ## Errors
//!
//! Problems never abort the build. A missing input file or an unresolvable
//! directive is recorded as [`GraphErrorKind::Missing`]; a file that cannot
//! be read as UTF-8 text is recorded as [`GraphErrorKind::Parse`]. Errors
//! are ordered by input file, then by occurrence.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::ErrorCode;
use crate::reference::{
    AtExtractor, Extractor, FsResolver, ResolveOptions, Resolver, normalize_path,
};

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// One input file and its edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyNode {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Files this file references, internal or external.
    pub dependencies: BTreeSet<PathBuf>,
    /// Input files that reference this file.
    pub dependents: BTreeSet<PathBuf>,
}

impl DependencyNode {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
        }
    }
}

/// Category of a [`GraphError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphErrorKind {
    /// An input file or a referenced target does not exist (or is a directory).
    Missing,
    /// An input file could not be read or processed.
    Parse,
}

/// A structural problem found while building the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphError {
    pub kind: GraphErrorKind,
    /// The input file the problem belongs to.
    pub file_path: PathBuf,
    /// For unresolvable directives, the path as written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_dep: Option<String>,
    pub message: String,
}

impl GraphError {
    fn missing_file(path: &Path) -> Self {
        Self {
            kind: GraphErrorKind::Missing,
            file_path: path.to_path_buf(),
            missing_dep: None,
            message: format!("File not found: {}", path.display()),
        }
    }

    fn missing_dependency(path: &Path, dependency: &str, reason: &str) -> Self {
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
        Self {
            kind: GraphErrorKind::Missing,
            file_path: path.to_path_buf(),
            missing_dep: Some(dependency.to_string()),
            message: format!("Missing dependency in {file_name}: {dependency} ({reason})"),
        }
    }

    fn parse(path: &Path, err: &std::io::Error) -> Self {
        Self {
            kind: GraphErrorKind::Parse,
            file_path: path.to_path_buf(),
            missing_dep: None,
            message: format!("Parse error: {err}"),
        }
    }

    /// The stable error code for this problem.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self.kind {
            GraphErrorKind::Missing => ErrorCode::MissingReference,
            GraphErrorKind::Parse => ErrorCode::FileUnreadable,
        }
    }
}

/// Dependency graph over a fixed set of files.
///
/// Read-only once built: the only constructor is [`GraphBuilder::build`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    nodes: BTreeMap<PathBuf, DependencyNode>,
    root_files: BTreeSet<PathBuf>,
    errors: Vec<GraphError>,
}

impl DependencyGraph {
    /// All nodes, ordered by path.
    #[must_use]
    pub const fn nodes(&self) -> &BTreeMap<PathBuf, DependencyNode> {
        &self.nodes
    }

    /// Look up the node for an absolute path.
    #[must_use]
    pub fn node(&self, path: &Path) -> Option<&DependencyNode> {
        self.nodes.get(path)
    }

    /// Return `true` if `path` is one of the graph's files.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    /// Nodes with no internal dependencies.
    #[must_use]
    pub const fn root_files(&self) -> &BTreeSet<PathBuf> {
        &self.root_files
    }

    /// Problems recorded during the build, in discovery order.
    #[must_use]
    pub fn errors(&self) -> &[GraphError] {
        &self.errors
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Return `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Dependencies of `node` that are themselves nodes of this graph.
    pub fn internal_dependencies<'a>(
        &'a self,
        node: &'a DependencyNode,
    ) -> impl Iterator<Item = &'a PathBuf> + 'a {
        node.dependencies
            .iter()
            .filter(|dep| self.nodes.contains_key(dep.as_path()))
    }

    /// Number of internal edges.
    #[must_use]
    pub fn internal_edge_count(&self) -> usize {
        self.nodes
            .values()
            .map(|node| self.internal_dependencies(node).count())
            .sum()
    }

    fn compute_roots(&mut self) {
        self.root_files = self
            .nodes
            .values()
            .filter(|node| self.internal_dependencies(node).next().is_none())
            .map(|node| node.path.clone())
            .collect();
    }

    /// Build a graph directly from edges, bypassing the filesystem.
    #[cfg(test)]
    pub(crate) fn from_edges(nodes: &[&str], edges: &[(&str, &str)]) -> Self {
        let mut graph = Self {
            nodes: nodes
                .iter()
                .map(|name| (PathBuf::from(name), DependencyNode::new(PathBuf::from(name))))
                .collect(),
            ..Self::default()
        };
        for &(from, to) in edges {
            graph.add_edge(Path::new(from), PathBuf::from(to));
        }
        graph.compute_roots();
        graph
    }

    fn add_edge(&mut self, from: &Path, to: PathBuf) {
        if let Some(target) = self.nodes.get_mut(to.as_path()) {
            target.dependents.insert(from.to_path_buf());
        }
        if let Some(source) = self.nodes.get_mut(from) {
            source.dependencies.insert(to);
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds a [`DependencyGraph`] using pluggable extraction and resolution.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder<E = AtExtractor, R = FsResolver> {
    extractor: E,
    resolver: R,
    try_extensions: Vec<String>,
}

impl GraphBuilder {
    /// Builder using the default `@path` extractor and filesystem resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: Extractor, R: Resolver> GraphBuilder<E, R> {
    /// Builder using custom collaborators.
    pub const fn with_collaborators(extractor: E, resolver: R) -> Self {
        Self {
            extractor,
            resolver,
            try_extensions: Vec::new(),
        }
    }

    /// Extensions to try when a directive target does not exist as written.
    #[must_use]
    pub fn try_extensions(mut self, extensions: Vec<String>) -> Self {
        self.try_extensions = extensions;
        self
    }

    /// Build the graph for `files`.
    ///
    /// Never fails: unreadable files and unresolvable directives are
    /// recorded in [`DependencyGraph::errors`].
    #[instrument(skip_all, fields(files = files.len()))]
    pub fn build<P: AsRef<Path>>(&self, files: &[P]) -> DependencyGraph {
        let inputs: Vec<PathBuf> = files.iter().map(|f| normalize_path(f.as_ref())).collect();

        let mut graph = DependencyGraph {
            nodes: inputs
                .iter()
                .map(|path| (path.clone(), DependencyNode::new(path.clone())))
                .collect(),
            ..DependencyGraph::default()
        };

        let mut processed: HashSet<&Path> = HashSet::with_capacity(inputs.len());
        for path in &inputs {
            if !processed.insert(path.as_path()) {
                continue;
            }
            let Some(dependencies) = self.scan_file(path, &mut graph.errors) else {
                continue;
            };
            for dependency in dependencies {
                graph.add_edge(path, dependency);
            }
        }

        graph.compute_roots();

        info!(
            nodes = graph.len(),
            edges = graph.internal_edge_count(),
            roots = graph.root_files.len(),
            errors = graph.errors.len(),
            "built dependency graph"
        );

        graph
    }

    /// Read one file and resolve its directives. Returns `None` when the
    /// file itself could not be processed.
    fn scan_file(&self, path: &Path, errors: &mut Vec<GraphError>) -> Option<Vec<PathBuf>> {
        if !path.exists() {
            warn!(path = %path.display(), "input file not found");
            errors.push(GraphError::missing_file(path));
            return None;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read input file");
                errors.push(GraphError::parse(path, &err));
                return None;
            }
        };

        let options = ResolveOptions {
            base_path: path.parent().map(Path::to_path_buf),
            try_extensions: self.try_extensions.clone(),
        };

        let mut dependencies = Vec::new();
        for occurrence in self.extractor.extract(&content) {
            let resolved = self.resolver.resolve(&occurrence.path, &options);
            if !resolved.exists || resolved.is_directory {
                let reason = if resolved.is_directory {
                    "path is a directory"
                } else {
                    "not found"
                };
                debug!(
                    file = %path.display(),
                    reference = %occurrence.path,
                    reason,
                    "unresolved reference"
                );
                errors.push(GraphError::missing_dependency(path, &occurrence.path, reason));
                continue;
            }
            debug!(file = %path.display(), dependency = %resolved.path.display(), "edge");
            dependencies.push(resolved.path);
        }

        Some(dependencies)
    }
}

/// Build a graph with the default collaborators.
pub fn build_dependency_graph<P: AsRef<Path>>(
    files: &[P],
    options: &ResolveOptions,
) -> DependencyGraph {
    GraphBuilder::new()
        .try_extensions(options.try_extensions.clone())
        .build(files)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(&path, content).expect("write");
        normalize_path(&path)
    }

    fn build(files: &[&PathBuf]) -> DependencyGraph {
        build_dependency_graph(files, &ResolveOptions::default())
    }

    #[test]
    fn single_file_without_references() {
        let dir = TempDir::new().expect("tempdir");
        let a = write(&dir, "a.md", "# File A\nNo references here");

        let graph = build(&[&a]);

        assert_eq!(graph.len(), 1);
        let node = graph.node(&a).expect("node a");
        assert!(node.dependencies.is_empty());
        assert!(node.dependents.is_empty());
        assert!(graph.root_files().contains(&a));
        assert!(graph.errors().is_empty());
    }

    #[test]
    fn linear_dependency_has_symmetric_edges() {
        let dir = TempDir::new().expect("tempdir");
        let b = write(&dir, "b.md", "# File B\nLeaf node");
        let a = write(&dir, "a.md", "# File A\n@./b.md");

        let graph = build(&[&a, &b]);

        let node_a = graph.node(&a).expect("node a");
        assert!(node_a.dependencies.contains(&b));
        assert!(node_a.dependents.is_empty());

        let node_b = graph.node(&b).expect("node b");
        assert!(node_b.dependencies.is_empty());
        assert!(node_b.dependents.contains(&a));

        assert!(graph.root_files().contains(&b));
        assert!(!graph.root_files().contains(&a));
    }

    #[test]
    fn diamond_has_single_root() {
        let dir = TempDir::new().expect("tempdir");
        let d = write(&dir, "d.md", "# File D");
        let b = write(&dir, "b.md", "# File B\n@d.md");
        let c = write(&dir, "c.md", "# File C\n@d.md");
        let a = write(&dir, "a.md", "# File A\n@b.md\n@c.md");

        let graph = build(&[&a, &b, &c, &d]);

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.root_files().iter().collect::<Vec<_>>(), vec![&d]);
        let node_d = graph.node(&d).expect("node d");
        assert_eq!(node_d.dependents.len(), 2);
        assert!(node_d.dependents.contains(&b) && node_d.dependents.contains(&c));
        assert_eq!(graph.node(&a).expect("node a").dependencies.len(), 2);
        assert_eq!(graph.internal_edge_count(), 4);
    }

    #[test]
    fn external_dependency_keeps_file_a_root() {
        let dir = TempDir::new().expect("tempdir");
        let external = write(&dir, "external.md", "# External");
        let a = write(&dir, "a.md", "# File A\n@external.md");

        let graph = build(&[&a]);

        assert_eq!(graph.len(), 1);
        assert!(graph.node(&a).expect("node a").dependencies.contains(&external));
        assert!(!graph.contains(&external));
        assert!(graph.root_files().contains(&a));
    }

    #[test]
    fn serialized_graph_keeps_field_names() {
        let dir = TempDir::new().expect("tempdir");
        let a = write(&dir, "a.md", "@gone.md");
        let missing = dir.path().join("ghost.md");

        let graph = build(&[&a, &missing]);
        let json = serde_json::to_value(&graph).expect("serialize");

        assert_eq!(json["nodes"].as_object().expect("nodes").len(), 2);
        assert_eq!(json["root_files"].as_array().expect("roots").len(), 2);
        let errors = json["errors"].as_array().expect("errors");
        assert_eq!(errors[0]["kind"], "missing");
        assert_eq!(errors[0]["missing_dep"], "gone.md");
        assert!(errors[1].get("missing_dep").is_none());
    }

    #[test]
    fn missing_dependency_is_recorded_and_skipped() {
        let dir = TempDir::new().expect("tempdir");
        let a = write(&dir, "a.md", "# File A\n@/nonexistent/file.md\n@b.md");
        let b = write(&dir, "b.md", "# B");

        let graph = build(&[&a, &b]);

        assert_eq!(graph.errors().len(), 1);
        let error = &graph.errors()[0];
        assert_eq!(error.kind, GraphErrorKind::Missing);
        assert_eq!(error.missing_dep.as_deref(), Some("/nonexistent/file.md"));
        assert_eq!(error.file_path, a);
        assert_eq!(error.code(), ErrorCode::MissingReference);
        assert!(graph.node(&a).expect("node a").dependencies.contains(&b));
    }

    #[test]
    fn missing_input_file_keeps_node_without_edges() {
        let dir = TempDir::new().expect("tempdir");
        let ghost = normalize_path(&dir.path().join("ghost.md"));

        let graph = build(&[&ghost]);

        assert_eq!(graph.len(), 1);
        assert!(graph.root_files().contains(&ghost));
        assert_eq!(graph.errors().len(), 1);
        assert_eq!(graph.errors()[0].kind, GraphErrorKind::Missing);
        assert!(graph.errors()[0].missing_dep.is_none());
    }

    #[test]
    fn unreadable_file_is_a_parse_error() {
        let dir = TempDir::new().expect("tempdir");
        let folder = normalize_path(&dir.path().join("folder.md"));
        std::fs::create_dir(&folder).expect("mkdir");
        let binary = dir.path().join("bin.md");
        std::fs::write(&binary, [0xff, 0xfe, 0x00]).expect("write");
        let binary = normalize_path(&binary);
        let ok = write(&dir, "ok.md", "@bin.md");

        let graph = build(&[&folder, &binary, &ok]);

        let kinds: Vec<_> = graph.errors().iter().map(|e| (e.kind, e.file_path.clone())).collect();
        assert_eq!(
            kinds,
            vec![
                (GraphErrorKind::Parse, folder.clone()),
                (GraphErrorKind::Parse, binary.clone())
            ]
        );
        // Processing continued: ok.md still got its edge.
        assert!(graph.node(&binary).expect("node").dependents.contains(&ok));
    }

    #[test]
    fn directory_reference_is_missing() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir(dir.path().join("sub.d")).expect("mkdir");
        let a = write(&dir, "a.md", "@sub.d");

        let graph = build(&[&a]);

        assert_eq!(graph.errors().len(), 1);
        assert_eq!(graph.errors()[0].missing_dep.as_deref(), Some("sub.d"));
        assert!(graph.node(&a).expect("node").dependencies.is_empty());
    }

    #[test]
    fn files_without_references_are_all_roots() {
        let dir = TempDir::new().expect("tempdir");
        let a = write(&dir, "a.md", "# File A\nJust some text\nemail@example.com");
        let b = write(&dir, "b.md", "# File B\nMore text");

        let graph = build(&[&a, &b]);

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.root_files().len(), 2);
        assert!(graph.node(&a).expect("node a").dependencies.is_empty());
    }

    #[test]
    fn duplicate_inputs_collapse_to_one_node() {
        let dir = TempDir::new().expect("tempdir");
        let b = write(&dir, "b.md", "# B");
        let a = write(&dir, "a.md", "@b.md @missing.md");
        let a_again = dir.path().join("./sub/../a.md");

        let graph = build_dependency_graph(&[a.clone(), a_again, b], &ResolveOptions::default());

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.errors().len(), 1, "a.md is scanned once");
    }

    #[test]
    fn extension_trials_resolve_bare_references() {
        let dir = TempDir::new().expect("tempdir");
        let b = write(&dir, "notes/b.md", "# B");
        let a = write(&dir, "a.md", "@notes/b");

        let options = ResolveOptions {
            base_path: None,
            try_extensions: vec![".md".to_string()],
        };
        let graph = build_dependency_graph(&[&a, &b], &options);

        assert!(graph.errors().is_empty());
        assert!(graph.node(&a).expect("node a").dependencies.contains(&b));
    }

    #[test]
    fn self_reference_is_its_own_dependent() {
        let dir = TempDir::new().expect("tempdir");
        let a = write(&dir, "a.md", "# A\n@a.md");

        let graph = build(&[&a]);

        let node = graph.node(&a).expect("node a");
        assert!(node.dependencies.contains(&a));
        assert!(node.dependents.contains(&a));
        assert!(graph.root_files().is_empty());
    }

    #[test]
    fn from_edges_matches_builder_semantics() {
        let graph = DependencyGraph::from_edges(&["/a", "/b"], &[("/a", "/b"), ("/a", "/ext")]);
        assert_eq!(graph.root_files().len(), 1);
        assert!(graph.root_files().contains(Path::new("/b")));
        assert_eq!(graph.internal_edge_count(), 1);
    }
}
