use std::fmt;
use std::path::PathBuf;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    RootUnreadable,
    OutputWriteFailed,
    FileUnreadable,
    MissingReference,
    CycleDetected,
    UnresolvedReferences,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::RootUnreadable => "E2001",
            Self::OutputWriteFailed => "E2002",
            Self::FileUnreadable => "E2003",
            Self::MissingReference => "E3001",
            Self::CycleDetected => "E3003",
            Self::UnresolvedReferences => "E3004",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::RootUnreadable => "Input file could not be read",
            Self::OutputWriteFailed => "Compiled output could not be written",
            Self::FileUnreadable => "File could not be read",
            Self::MissingReference => "Referenced file not found",
            Self::CycleDetected => "Dependency cycle detected",
            Self::UnresolvedReferences => "Some references could not be resolved",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .atref/config.toml and retry."),
            Self::RootUnreadable => Some("Check that the input path exists and is a readable file."),
            Self::OutputWriteFailed => {
                Some("Check write permissions, or pass --no-write to print only.")
            }
            Self::FileUnreadable => Some("Make sure the file is UTF-8 text and readable."),
            Self::MissingReference => {
                Some("Fix the @path, or add an extension trial with --ext.")
            }
            Self::CycleDetected => {
                Some("Remove one @reference in the loop to make the graph acyclic.")
            }
            Self::UnresolvedReferences => Some("Inspect the reference tree with --tree."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Fatal compilation failures.
///
/// Per-reference problems (missing, circular, unreadable targets) are never
/// raised; they are recorded on the compiled references instead.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The root document itself could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    ReadRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the compiled output was requested and failed.
    #[error("failed to write {}: {source}", .path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// The stable error code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ReadRoot { .. } => ErrorCode::RootUnreadable,
            Self::WriteOutput { .. } => ErrorCode::OutputWriteFailed,
        }
    }
}
