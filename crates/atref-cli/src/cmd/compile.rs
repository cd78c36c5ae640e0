//! `atref compile`: expand every `@path` directive in one document.

use std::io::Write;
use std::path::{Path, PathBuf};

use atref_core::compile::{
    CompileOptions, CompileResult, Compiler, TreeStyle, WrapperKind, build_reference_tree,
    format_tree,
};
use atref_core::config::ProjectConfig;
use atref_core::error::ErrorCode;
use clap::Args;
use tracing::debug;

use super::{display_path, normalize_extensions};
use crate::output::{
    CliError, OutputMode, color_enabled, pretty_kv, pretty_section, render_error, render_mode,
};

/// Arguments for `atref compile`.
#[derive(Args, Debug, Default)]
pub struct CompileArgs {
    /// Document to compile.
    pub file: PathBuf,

    /// Write the compiled document here instead of `<stem>.built<.ext>`.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Compile without writing the output file.
    #[arg(long)]
    pub no_write: bool,

    /// Print the compiled document to stdout instead of a summary.
    #[arg(long)]
    pub print: bool,

    /// How spliced content is wrapped: file-tag, fenced or raw.
    #[arg(long, value_name = "KIND")]
    pub wrapper: Option<WrapperKind>,

    /// Extension to try when a target does not exist as written (repeatable).
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Stop expanding below this nesting depth.
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Show the reference tree.
    #[arg(long)]
    pub tree: bool,

    /// Show resolved absolute paths in the tree.
    #[arg(long)]
    pub full_paths: bool,

    /// Exit non-zero when any reference could not be expanded.
    #[arg(long)]
    pub strict: bool,
}

impl CompileArgs {
    /// Layer the command-line flags over the project configuration.
    fn compile_options(&self, project: &ProjectConfig) -> CompileOptions {
        let mut options = CompileOptions::from(project);
        if self.no_write {
            options.write_output = false;
        }
        if self.output.is_some() {
            options.output_path.clone_from(&self.output);
        }
        if let Some(wrapper) = self.wrapper {
            options.wrapper = wrapper;
        }
        if !self.extensions.is_empty() {
            options.try_extensions = normalize_extensions(&self.extensions);
        }
        if self.max_depth.is_some() {
            options.max_depth = self.max_depth;
        }
        options
    }
}

/// Execute `atref compile`.
pub fn run_compile(
    args: &CompileArgs,
    output: OutputMode,
    project: &ProjectConfig,
    project_root: &Path,
) -> anyhow::Result<()> {
    let options = args.compile_options(project);
    debug!(?options, "compile options");

    let result = match Compiler::new(options).compile_file(&args.file) {
        Ok(result) => result,
        Err(err) => {
            render_error(output, &CliError::from(&err))?;
            anyhow::bail!("{err}");
        }
    };

    let style = TreeStyle {
        full_paths: args.full_paths,
        color: color_enabled(output),
    };
    let show_tree = args.tree;

    if args.print && !output.is_json() {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        write!(out, "{}", result.compiled_content)?;
        if !result.compiled_content.ends_with('\n') {
            writeln!(out)?;
        }
    } else {
        render_mode(
            output,
            &result,
            |r, w| render_compile_text(r, show_tree, &style, w),
            |r, w| render_compile_human(r, show_tree, &style, project_root, w),
        )?;
    }

    if args.strict && result.failed_count > 0 {
        let message = format!(
            "{} of {} references could not be expanded",
            result.failed_count,
            result.references.len()
        );
        render_error(
            output,
            &CliError::from_code(ErrorCode::UnresolvedReferences, message.clone()),
        )?;
        anyhow::bail!(message);
    }

    Ok(())
}

fn render_compile_text(
    result: &CompileResult,
    show_tree: bool,
    style: &TreeStyle,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    writeln!(
        w,
        "compiled {} -> {} written={} resolved={} failed={}",
        result.input_path.display(),
        result.output_path.display(),
        result.written,
        result.success_count,
        result.failed_count
    )?;
    if show_tree {
        write_tree(result, style, w)?;
    }
    Ok(())
}

fn render_compile_human(
    result: &CompileResult,
    show_tree: bool,
    style: &TreeStyle,
    base: &Path,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    pretty_section(w, &format!("Compiled {}", display_path(&result.input_path, base)))?;

    let destination = display_path(&result.output_path, base);
    let destination = if result.written {
        destination.into_owned()
    } else {
        format!("{destination} (not written)")
    };
    pretty_kv(w, "Output", destination)?;
    pretty_kv(
        w,
        "References",
        format!(
            "{} resolved, {} failed",
            result.success_count, result.failed_count
        ),
    )?;

    if show_tree {
        writeln!(w)?;
        write_tree(result, style, w)?;
    } else if result.failed_count > 0 {
        writeln!(w)?;
        for reference in result.references.iter().filter(|r| !r.found) {
            let reason = reference.error.as_deref().unwrap_or("not expanded");
            writeln!(w, "  ✗ {} ({reason})", reference.occurrence.raw)?;
        }
    }
    Ok(())
}

fn write_tree(result: &CompileResult, style: &TreeStyle, w: &mut dyn Write) -> std::io::Result<()> {
    if result.references.is_empty() {
        return writeln!(w, "(no references)");
    }
    let tree = build_reference_tree(&result.references);
    writeln!(w, "{}", format_tree(&tree, style))
}
