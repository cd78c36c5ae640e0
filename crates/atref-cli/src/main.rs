#![forbid(unsafe_code)]

mod cmd;
mod output;

use atref_core::config::{self, ProjectConfig};
use atref_core::error::ErrorCode;
use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode};
use std::env;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "atref: compile @path references into one document",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (overrides --json, FORMAT and the user config).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Build",
        about = "Compile a document",
        long_about = "Expand every @path reference in a document recursively and write the result next to it.",
        after_help = "EXAMPLES:\n    # Compile to prompt.built.md\n    atref compile prompt.md\n\n    # Inspect without writing, showing the reference tree\n    atref compile prompt.md --no-write --tree\n\n    # Fail CI when any reference is broken\n    atref compile prompt.md --strict --json"
    )]
    Compile(cmd::compile::CompileArgs),

    #[command(
        next_help_heading = "Analyze",
        about = "Show the dependency graph",
        long_about = "Build the reference graph over a set of files and list edges, roots and errors.",
        after_help = "EXAMPLES:\n    # Graph all markdown files in docs/\n    atref graph docs/*.md\n\n    # Emit machine-readable output\n    atref graph docs/*.md --json"
    )]
    Graph(cmd::graph::GraphArgs),

    #[command(
        next_help_heading = "Analyze",
        about = "Print files in dependency order",
        long_about = "Topologically sort a set of files so every file comes after the files it references.",
        after_help = "EXAMPLES:\n    # Order files for a build script\n    atref order docs/*.md --format text"
    )]
    Order(cmd::order::OrderArgs),

    #[command(
        next_help_heading = "Analyze",
        about = "List reference cycles",
        long_about = "Report every set of files that reference each other in a loop, including self-references.",
        after_help = "EXAMPLES:\n    # List cycles\n    atref cycles docs/*.md\n\n    # Exit non-zero when a cycle exists\n    atref cycles docs/*.md --check"
    )]
    Cycles(cmd::cycles::CyclesArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Install bash completions\n    atref completions bash > ~/.local/share/bash-completion/completions/atref"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("ATREF_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "atref=debug,info"
        } else {
            "atref=info,warn"
        })
    });

    let format = env::var("ATREF_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Load project configuration, reporting parse failures in the CLI's error
/// format.
fn load_config(cli: &Cli, cwd: &Path) -> anyhow::Result<(ProjectConfig, OutputMode)> {
    let project_root = config::find_project_root(cwd).unwrap_or_else(|| cwd.to_path_buf());
    match config::resolve_config(&project_root, cli.json) {
        Ok(effective) => {
            let mode = output::resolve_output_mode(cli.format, &effective.resolved_output);
            Ok((effective.project, mode))
        }
        Err(err) => {
            let mode = output::fallback_output_mode(cli.format, cli.json);
            output::render_error(
                mode,
                &CliError::from_code(ErrorCode::ConfigParseError, format!("{err:#}")),
            )?;
            Err(err)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let cwd = env::current_dir()?;
    let (project, output) = load_config(&cli, &cwd)?;

    match &cli.command {
        Commands::Compile(args) => cmd::compile::run_compile(args, output, &project, &cwd),
        Commands::Graph(args) => cmd::graph::run_graph(args, output, &project, &cwd),
        Commands::Order(args) => cmd::order::run_order(args, output, &project, &cwd),
        Commands::Cycles(args) => cmd::cycles::run_cycles(args, output, &project, &cwd),
        Commands::Completions(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_before_subcommand() {
        let cli = Cli::parse_from(["atref", "--json", "graph", "a.md"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Graph(_)));
    }

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["atref", "cycles", "a.md", "--json"]);
        assert!(cli.json);
    }

    #[test]
    fn format_flag_parses_value_enum() {
        let cli = Cli::parse_from(["atref", "order", "a.md", "--format", "pretty"]);
        assert_eq!(cli.format, Some(OutputMode::Pretty));
        assert!(Cli::try_parse_from(["atref", "order", "a.md", "--format", "yaml"]).is_err());
    }

    #[test]
    fn verbose_flag_is_global() {
        let cli = Cli::parse_from(["atref", "compile", "a.md", "-v"]);
        assert!(cli.verbose);
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["atref", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Commands::Completions(cmd::completions::CompletionsArgs {
                shell: clap_complete::Shell::Bash,
            })
        ));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["atref", "compile", "a.md"],
            vec!["atref", "graph", "a.md", "b.md"],
            vec!["atref", "order", "a.md"],
            vec!["atref", "cycles", "a.md", "--check"],
            vec!["atref", "completions", "zsh"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(
                result.is_ok(),
                "Failed to parse: {:?}, error: {:?}",
                args,
                result.err()
            );
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
