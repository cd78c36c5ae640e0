//! `atref order`: dependency-first processing order.

use std::io::Write;
use std::path::{Path, PathBuf};

use atref_core::config::ProjectConfig;
use atref_core::graph::{TopologicalOrder, build_dependency_graph, topological_sort};
use clap::Args;

use super::{display_path, graph_resolve_options};
use crate::output::{OutputMode, pretty_section, render_mode};

/// Arguments for `atref order`.
#[derive(Args, Debug, Default)]
pub struct OrderArgs {
    /// Files to order.
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Extension to try when a target does not exist as written (repeatable).
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,
}

/// Execute `atref order`.
pub fn run_order(
    args: &OrderArgs,
    output: OutputMode,
    project: &ProjectConfig,
    project_root: &Path,
) -> anyhow::Result<()> {
    let graph = build_dependency_graph(
        &args.files,
        &graph_resolve_options(project, &args.extensions),
    );
    let order = topological_sort(&graph);

    render_mode(output, &order, render_order_text, |o, w| {
        render_order_human(o, project_root, w)
    })
}

fn render_order_text(order: &TopologicalOrder, w: &mut dyn Write) -> std::io::Result<()> {
    for path in &order.sorted {
        writeln!(w, "{}", path.display())?;
    }
    for cycle in &order.cycles {
        let members: Vec<_> = cycle.iter().map(|p| p.display().to_string()).collect();
        writeln!(w, "cycle {}", members.join(" "))?;
    }
    Ok(())
}

fn render_order_human(
    order: &TopologicalOrder,
    base: &Path,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    pretty_section(w, &format!("Processing order ({} files)", order.sorted.len()))?;
    let width = order.sorted.len().to_string().len();
    for (idx, path) in order.sorted.iter().enumerate() {
        writeln!(w, "{:>width$}. {}", idx + 1, display_path(path, base))?;
    }

    if !order.cycles.is_empty() {
        writeln!(
            w,
            "\n{} cycle(s) prevent a complete order; their files are listed last.",
            order.cycles.len()
        )?;
        for cycle in &order.cycles {
            let members: Vec<_> = cycle.iter().map(|p| display_path(p, base)).collect();
            writeln!(w, "  - {}", members.join(" <-> "))?;
        }
    }
    Ok(())
}
