//! Path resolution for directive targets.
//!
//! Resolution never touches the filesystem beyond existence checks and never
//! follows symlinks: paths are made absolute and normalised lexically so the
//! same file always maps to the same key, whether it was named on the
//! command line or reached through a directive.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Options controlling how a directive path is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Directory that relative targets are resolved against. Defaults to the
    /// current working directory.
    #[serde(default)]
    pub base_path: Option<PathBuf>,
    /// Extensions appended in order when the target does not exist as
    /// written (e.g. `".md"`).
    #[serde(default)]
    pub try_extensions: Vec<String>,
}

impl ResolveOptions {
    /// Options resolving relative to `base_path` with no extension trials.
    #[must_use]
    pub fn with_base(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: Some(base_path.into()),
            try_extensions: Vec::new(),
        }
    }
}

/// The outcome of resolving one directive path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPath {
    /// Absolute, lexically normalised path.
    pub path: PathBuf,
    pub exists: bool,
    pub is_directory: bool,
    /// Explanation when the path does not resolve to anything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Maps a directive's raw path to an absolute filesystem path.
pub trait Resolver {
    /// Resolve `target` according to `options`.
    ///
    /// Must be deterministic for the same `target` and options, and must
    /// treat `target` as relative to `options.base_path` unless it is
    /// already absolute.
    fn resolve(&self, target: &str, options: &ResolveOptions) -> ResolvedPath;
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn resolve(&self, target: &str, options: &ResolveOptions) -> ResolvedPath {
        (**self).resolve(target, options)
    }
}

/// Resolver backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsResolver;

impl Resolver for FsResolver {
    fn resolve(&self, target: &str, options: &ResolveOptions) -> ResolvedPath {
        let base = options
            .base_path
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default();

        let candidate = normalize_path(&expand_target(target, &base));

        if let Some(found) = probe(&candidate) {
            return found;
        }

        for ext in &options.try_extensions {
            let mut with_ext = candidate.clone().into_os_string();
            with_ext.push(ext);
            if let Some(found) = probe(Path::new(&with_ext)) {
                return found;
            }
        }

        ResolvedPath {
            error: Some(format!("File not found: {}", candidate.display())),
            path: candidate,
            exists: false,
            is_directory: false,
        }
    }
}

fn probe(path: &Path) -> Option<ResolvedPath> {
    let meta = std::fs::metadata(path).ok()?;
    Some(ResolvedPath {
        path: path.to_path_buf(),
        exists: true,
        is_directory: meta.is_dir(),
        error: None,
    })
}

fn expand_target(target: &str, base: &Path) -> PathBuf {
    let home_relative = if target == "~" { Some("") } else { target.strip_prefix("~/") };
    if let Some(home) = home_relative.and_then(|rest| dirs::home_dir().map(|h| h.join(rest))) {
        return home;
    }

    let path = Path::new(target);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Make `path` absolute (against the current directory) and remove `.` and
/// `..` components without consulting the filesystem.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
