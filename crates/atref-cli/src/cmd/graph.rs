//! `atref graph`: show the dependency graph of a set of files.

use std::io::Write;
use std::path::{Path, PathBuf};

use atref_core::config::ProjectConfig;
use atref_core::graph::{DependencyGraph, build_dependency_graph};
use clap::Args;

use super::{display_path, graph_resolve_options};
use crate::output::{OutputMode, pretty_section, render_mode};

/// Arguments for `atref graph`.
#[derive(Args, Debug, Default)]
pub struct GraphArgs {
    /// Files forming the graph.
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Extension to try when a target does not exist as written (repeatable).
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,
}

/// Execute `atref graph`.
pub fn run_graph(
    args: &GraphArgs,
    output: OutputMode,
    project: &ProjectConfig,
    project_root: &Path,
) -> anyhow::Result<()> {
    let options = graph_resolve_options(project, &args.extensions);
    let graph = build_dependency_graph(&args.files, &options);

    render_mode(output, &graph, render_graph_text, |g, w| {
        render_graph_human(g, project_root, w)
    })
}

fn render_graph_text(graph: &DependencyGraph, w: &mut dyn Write) -> std::io::Result<()> {
    for node in graph.nodes().values() {
        writeln!(
            w,
            "node {} deps={} dependents={}",
            node.path.display(),
            node.dependencies.len(),
            node.dependents.len()
        )?;
        for dep in &node.dependencies {
            let scope = if graph.contains(dep) { "internal" } else { "external" };
            writeln!(w, "edge {} -> {} {scope}", node.path.display(), dep.display())?;
        }
    }
    for root in graph.root_files() {
        writeln!(w, "root {}", root.display())?;
    }
    for error in graph.errors() {
        writeln!(w, "error {} {}", error.code(), error.message)?;
    }
    Ok(())
}

fn render_graph_human(
    graph: &DependencyGraph,
    base: &Path,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    pretty_section(
        w,
        &format!(
            "Dependency graph ({} files, {} internal edges)",
            graph.len(),
            graph.internal_edge_count()
        ),
    )?;

    for node in graph.nodes().values() {
        writeln!(w, "{}", display_path(&node.path, base))?;
        write_path_list(w, "depends on", node.dependencies.iter(), base)?;
        write_path_list(w, "used by", node.dependents.iter(), base)?;
    }

    writeln!(w, "\nRoots ({})", graph.root_files().len())?;
    for root in graph.root_files() {
        writeln!(w, "  {}", display_path(root, base))?;
    }

    if !graph.errors().is_empty() {
        writeln!(w, "\nErrors ({})", graph.errors().len())?;
        for error in graph.errors() {
            writeln!(w, "  [{}] {}", error.code(), error.message)?;
        }
    }
    Ok(())
}

fn write_path_list<'a>(
    w: &mut dyn Write,
    label: &str,
    paths: impl Iterator<Item = &'a PathBuf>,
    base: &Path,
) -> std::io::Result<()> {
    let shown: Vec<_> = paths.map(|p| display_path(p, base)).collect();
    if shown.is_empty() {
        writeln!(w, "  {label:<11} (none)")
    } else {
        writeln!(w, "  {label:<11} {}", shown.join(", "))
    }
}
