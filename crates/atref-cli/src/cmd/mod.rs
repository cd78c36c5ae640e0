pub mod compile;
pub mod completions;
pub mod cycles;
pub mod graph;
pub mod order;

use std::borrow::Cow;
use std::path::Path;

use atref_core::config::ProjectConfig;
use atref_core::reference::ResolveOptions;

/// Normalise `--ext` values so `md` and `.md` mean the same thing.
pub fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|ext| ext.trim())
        .filter(|ext| !ext.is_empty())
        .map(|ext| {
            if ext.starts_with('.') {
                ext.to_string()
            } else {
                format!(".{ext}")
            }
        })
        .collect()
}

/// Resolve options for graph commands: `--ext` replaces the configured list.
pub fn graph_resolve_options(project: &ProjectConfig, extensions: &[String]) -> ResolveOptions {
    let try_extensions = if extensions.is_empty() {
        project.resolve.try_extensions.clone()
    } else {
        normalize_extensions(extensions)
    };
    ResolveOptions {
        base_path: None,
        try_extensions,
    }
}

/// Show `path` relative to `base` when it lives underneath it.
pub fn display_path<'a>(path: &'a Path, base: &Path) -> Cow<'a, str> {
    path.strip_prefix(base)
        .map_or_else(|_| path.to_string_lossy(), Path::to_string_lossy)
}
