//! `atref cycles`: list reference cycles (strongly connected components).

use std::io::Write;
use std::path::{Path, PathBuf};

use atref_core::config::ProjectConfig;
use atref_core::error::ErrorCode;
use atref_core::graph::{build_dependency_graph, detect_cycles};
use clap::Args;
use serde::Serialize;

use super::{display_path, graph_resolve_options};
use crate::output::{CliError, OutputMode, render_error, render_mode};

/// Arguments for `atref cycles`.
#[derive(Args, Debug, Default)]
pub struct CyclesArgs {
    /// Files to check.
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Extension to try when a target does not exist as written (repeatable).
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Exit non-zero when any cycle exists.
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Serialize)]
struct CyclesOutput {
    cycles: Vec<Vec<PathBuf>>,
}

/// Execute `atref cycles`.
pub fn run_cycles(
    args: &CyclesArgs,
    output: OutputMode,
    project: &ProjectConfig,
    project_root: &Path,
) -> anyhow::Result<()> {
    let graph = build_dependency_graph(
        &args.files,
        &graph_resolve_options(project, &args.extensions),
    );
    let payload = CyclesOutput {
        cycles: detect_cycles(&graph),
    };

    render_mode(output, &payload, render_cycles_text, |p, w| {
        render_cycles_human(p, project_root, w)
    })?;

    if args.check && !payload.cycles.is_empty() {
        let message = format!("{} reference cycle(s) found", payload.cycles.len());
        render_error(
            output,
            &CliError::from_code(ErrorCode::CycleDetected, message.clone()),
        )?;
        anyhow::bail!(message);
    }

    Ok(())
}

fn render_cycles_text(payload: &CyclesOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for cycle in &payload.cycles {
        let members: Vec<_> = cycle.iter().map(|p| p.display().to_string()).collect();
        writeln!(w, "{}", members.join(" "))?;
    }
    Ok(())
}

fn render_cycles_human(
    payload: &CyclesOutput,
    base: &Path,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    if payload.cycles.is_empty() {
        writeln!(w, "No reference cycles found.")?;
        return Ok(());
    }

    writeln!(w, "Reference cycles ({})", payload.cycles.len())?;

    for (idx, cycle) in payload.cycles.iter().enumerate() {
        writeln!(w, "\nCycle {}:", idx + 1)?;
        for path in cycle {
            writeln!(w, "  - {}", display_path(path, base))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_args_parse_check_flag() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: CyclesArgs,
        }

        let parsed = Wrapper::parse_from(["test", "a.md", "--check"]);
        assert!(parsed.args.check);
        assert_eq!(parsed.args.files, vec![PathBuf::from("a.md")]);
    }

    #[test]
    fn render_cycles_human_no_cycles() {
        let payload = CyclesOutput { cycles: Vec::new() };
        let mut out = Vec::new();

        render_cycles_human(&payload, Path::new("/"), &mut out).expect("render");

        let rendered = String::from_utf8(out).expect("utf8");
        assert!(rendered.contains("No reference cycles found."));
    }

    #[test]
    fn render_cycles_human_lists_groups() {
        let payload = CyclesOutput {
            cycles: vec![vec![PathBuf::from("/w/a.md"), PathBuf::from("/w/b.md")]],
        };

        let mut out = Vec::new();
        render_cycles_human(&payload, Path::new("/w"), &mut out).expect("render");

        let rendered = String::from_utf8(out).expect("utf8");
        assert!(rendered.contains("Cycle 1"));
        assert!(rendered.contains("  - a.md\n  - b.md\n"));
    }

    #[test]
    fn render_cycles_text_one_line_per_cycle() {
        let payload = CyclesOutput {
            cycles: vec![
                vec![PathBuf::from("/a.md")],
                vec![PathBuf::from("/b.md"), PathBuf::from("/c.md")],
            ],
        };
        let mut out = Vec::new();
        render_cycles_text(&payload, &mut out).expect("render");
        assert_eq!(String::from_utf8(out).expect("utf8"), "/a.md\n/b.md /c.md\n");
    }
}
