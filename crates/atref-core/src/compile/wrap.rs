//! Formatting of spliced file content.
//!
//! When a directive is expanded, the referenced file's (already compiled)
//! text is passed through a [`ContentWrapper`] before it replaces the
//! directive. [`WrapperKind`] names the built-in wrappers so they can be
//! selected from configuration or the command line.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::reference::DirectiveOccurrence;

/// Formats expanded content before it is spliced into the including document.
pub trait ContentWrapper {
    /// Wrap `content`, read from `path`, which replaces `occurrence`.
    fn wrap(&self, content: &str, path: &Path, occurrence: &DirectiveOccurrence) -> String;
}

/// `<file path="…">` tags around the content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTagWrapper;

impl ContentWrapper for FileTagWrapper {
    fn wrap(&self, content: &str, path: &Path, _occurrence: &DirectiveOccurrence) -> String {
        format!("<file path=\"{}\">\n{content}\n</file>", path.display())
    }
}

/// Markdown code fence with a language hint taken from the file extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FencedWrapper;

impl ContentWrapper for FencedWrapper {
    fn wrap(&self, content: &str, path: &Path, _occurrence: &DirectiveOccurrence) -> String {
        // The fence must be longer than any backtick run inside the content.
        let fence = "`".repeat(longest_backtick_run(content).max(2) + 1);
        let language = language_for(path).unwrap_or("");
        format!("{fence}{language}\n{content}\n{fence}")
    }
}

/// Content spliced verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawWrapper;

impl ContentWrapper for RawWrapper {
    fn wrap(&self, content: &str, _path: &Path, _occurrence: &DirectiveOccurrence) -> String {
        content.to_string()
    }
}

/// Built-in wrapper selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WrapperKind {
    #[default]
    FileTag,
    Fenced,
    Raw,
}

impl WrapperKind {
    pub const ALL: [Self; 3] = [Self::FileTag, Self::Fenced, Self::Raw];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FileTag => "file-tag",
            Self::Fenced => "fenced",
            Self::Raw => "raw",
        }
    }
}

impl ContentWrapper for WrapperKind {
    fn wrap(&self, content: &str, path: &Path, occurrence: &DirectiveOccurrence) -> String {
        match self {
            Self::FileTag => FileTagWrapper.wrap(content, path, occurrence),
            Self::Fenced => FencedWrapper.wrap(content, path, occurrence),
            Self::Raw => RawWrapper.wrap(content, path, occurrence),
        }
    }
}

impl fmt::Display for WrapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WrapperKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file-tag" | "filetag" | "xml" => Ok(Self::FileTag),
            "fenced" | "fence" => Ok(Self::Fenced),
            "raw" => Ok(Self::Raw),
            other => Err(format!(
                "unknown wrapper '{other}' (expected one of: file-tag, fenced, raw)"
            )),
        }
    }
}

/// Fence language hint for a path, by lowercase extension.
#[must_use]
pub fn language_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let language = match ext.as_str() {
        "ts" => "typescript",
        "tsx" => "tsx",
        "js" => "javascript",
        "jsx" => "jsx",
        "json" => "json",
        "md" => "markdown",
        "py" => "python",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "hpp" => "cpp",
        "css" => "css",
        "scss" => "scss",
        "html" => "html",
        "xml" => "xml",
        "yaml" | "yml" => "yaml",
        "sh" | "bash" => "bash",
        "zsh" => "zsh",
        "sql" => "sql",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "r" => "r",
        "lua" => "lua",
        "vim" => "vim",
        "dockerfile" => "dockerfile",
        "toml" => "toml",
        "ini" => "ini",
        "conf" => "conf",
        _ => return None,
    };
    Some(language)
}

fn longest_backtick_run(content: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in content.chars() {
        if ch == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}
