//! Recursive transclusion.
//!
//! # Algorithm
//!
//! Each document is scanned for directives, which are processed from last
//! to first so that splicing one never shifts the byte offsets of those
//! still pending. For every directive:
//!
//! 1. Resolve the target relative to the including document's directory.
//! 2. Refuse targets already on the active expansion chain (circular).
//! 3. Refuse missing targets, directories, and targets beyond `max_depth`.
//! 4. Otherwise read the target, compile it recursively, wrap the result
//!    and splice it over the directive.
//!
//! ## Visited set
//!
//! The visited set holds exactly the files currently being expanded: a path
//! is inserted before its recursion and removed when the recursion returns.
//! Every cycle is therefore cut at the first repeat, while a file reachable
//! along two independent branches (a diamond) is expanded in both.
//!
//! ## Reference order
//!
//! [`CompiledContent::references`] is pre-order: each directive is followed
//! by the directives found inside its expansion, and siblings appear in
//! source order.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::wrap::{ContentWrapper, WrapperKind};
use crate::config::ProjectConfig;
use crate::error::CompileError;
use crate::reference::{
    AtExtractor, DirectiveOccurrence, Extractor, FsResolver, ResolveOptions, Resolver,
    normalize_path,
};

/// Output suffix used when none is configured.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "built";

/// File name used for in-memory documents, relative to their base directory.
pub const VIRTUAL_FILE_NAME: &str = "__virtual__.md";

/// Options for a [`Compiler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Resolve the root document's directives against this directory
    /// instead of the root file's own directory.
    pub base_path: Option<PathBuf>,
    /// Extensions tried when a target does not exist as written.
    pub try_extensions: Vec<String>,
    /// Write the compiled output to disk.
    pub write_output: bool,
    /// Explicit output location. Defaults to [`built_output_path`].
    pub output_path: Option<PathBuf>,
    pub output_suffix: String,
    pub wrapper: WrapperKind,
    /// Deepest nesting level that is still expanded. `None` is unbounded.
    pub max_depth: Option<usize>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            base_path: None,
            try_extensions: Vec::new(),
            write_output: true,
            output_path: None,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            wrapper: WrapperKind::default(),
            max_depth: None,
        }
    }
}

impl From<&ProjectConfig> for CompileOptions {
    fn from(config: &ProjectConfig) -> Self {
        Self {
            try_extensions: config.resolve.try_extensions.clone(),
            write_output: config.compile.write_output,
            output_suffix: config.compile.output_suffix.clone(),
            wrapper: config.compile.wrapper,
            max_depth: config.compile.max_depth,
            ..Self::default()
        }
    }
}

/// Outcome of one directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledReference {
    pub occurrence: DirectiveOccurrence,
    /// Absolute path the directive resolved to (even when not found).
    pub resolved_path: PathBuf,
    /// The document containing the directive.
    pub imported_from: PathBuf,
    /// Nesting level; 0 for directives in the root document.
    pub depth: usize,
    pub found: bool,
    /// Compiled content of the target, before wrapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub circular: bool,
}

/// Compiled text plus every directive outcome, in pre-order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompiledContent {
    pub compiled_content: String,
    pub references: Vec<CompiledReference>,
}

impl CompiledContent {
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.references.iter().filter(|r| r.found).count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.references.len() - self.success_count()
    }
}

/// Result of [`Compiler::compile_file`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub compiled_content: String,
    pub references: Vec<CompiledReference>,
    pub success_count: usize,
    pub failed_count: usize,
    /// Whether `compiled_content` was written to `output_path`.
    pub written: bool,
}

/// `<dir>/<stem>.<suffix><.ext>`, e.g. `docs/prompt.built.md`.
#[must_use]
pub fn built_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{stem}.{suffix}");
    if let Some(ext) = input.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    input.with_file_name(name)
}

/// Expands `@path` directives recursively.
pub struct Compiler<E = AtExtractor, R = FsResolver> {
    extractor: E,
    resolver: R,
    options: CompileOptions,
    wrapper: Box<dyn ContentWrapper>,
}

impl Compiler {
    /// Compiler with the default `@path` extractor and filesystem resolver.
    #[must_use]
    pub fn new(options: CompileOptions) -> Self {
        Self::with_collaborators(AtExtractor, FsResolver, options)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

impl<E, R> fmt::Debug for Compiler<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E: Extractor, R: Resolver> Compiler<E, R> {
    /// Compiler with custom collaborators. The wrapper is taken from
    /// `options.wrapper`.
    pub fn with_collaborators(extractor: E, resolver: R, options: CompileOptions) -> Self {
        let wrapper = Box::new(options.wrapper);
        Self {
            extractor,
            resolver,
            options,
            wrapper,
        }
    }

    /// Replace the wrapper selected by the options.
    #[must_use]
    pub fn with_wrapper(mut self, wrapper: impl ContentWrapper + 'static) -> Self {
        self.wrapper = Box::new(wrapper);
        self
    }

    #[must_use]
    pub const fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile the file at `path`, writing the output if configured.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::ReadRoot`] if `path` cannot be read, and
    /// [`CompileError::WriteOutput`] if writing was requested and failed.
    /// Problems with individual directives are recorded in the result.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn compile_file(&self, path: &Path) -> Result<CompileResult, CompileError> {
        let input_path = normalize_path(path);
        let source =
            std::fs::read_to_string(&input_path).map_err(|source| CompileError::ReadRoot {
                path: input_path.clone(),
                source,
            })?;

        let base = self.options.base_path.as_deref().map_or_else(
            || parent_dir(&input_path),
            normalize_path,
        );

        let mut visited = HashSet::from([input_path.clone()]);
        let compiled = self.expand(&source, &input_path, &base, 0, &mut visited);

        let output_path = self.options.output_path.as_deref().map_or_else(
            || built_output_path(&input_path, &self.options.output_suffix),
            normalize_path,
        );

        let written = if self.options.write_output {
            std::fs::write(&output_path, &compiled.compiled_content).map_err(|source| {
                warn!(path = %output_path.display(), error = %source, "failed to write output");
                CompileError::WriteOutput {
                    path: output_path.clone(),
                    source,
                }
            })?;
            true
        } else {
            false
        };

        let success_count = compiled.success_count();
        let failed_count = compiled.failed_count();
        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            references = compiled.references.len(),
            success_count,
            failed_count,
            written,
            "compiled"
        );

        Ok(CompileResult {
            input_path,
            output_path,
            compiled_content: compiled.compiled_content,
            references: compiled.references,
            success_count,
            failed_count,
            written,
        })
    }

    /// Compile in-memory `text` whose directives resolve against `base_dir`.
    ///
    /// The text has no file identity, so nothing is pre-seeded in the
    /// visited set. Nothing is written.
    #[instrument(skip(self, text), fields(bytes = text.len()))]
    pub fn compile_content(&self, text: &str, base_dir: &Path) -> CompiledContent {
        let base = normalize_path(base_dir);
        let virtual_path = base.join(VIRTUAL_FILE_NAME);
        let mut visited = HashSet::new();
        self.expand(text, &virtual_path, &base, 0, &mut visited)
    }

    fn expand(
        &self,
        text: &str,
        current: &Path,
        base: &Path,
        depth: usize,
        visited: &mut HashSet<PathBuf>,
    ) -> CompiledContent {
        let occurrences = self.extractor.extract(text);
        if occurrences.is_empty() {
            return CompiledContent {
                compiled_content: text.to_string(),
                references: Vec::new(),
            };
        }

        let resolve_options = ResolveOptions {
            base_path: Some(base.to_path_buf()),
            try_extensions: self.options.try_extensions.clone(),
        };

        let mut output = text.to_string();
        // One group per directive: the directive followed by its nested
        // references. Built back to front, reversed at the end.
        let mut groups: Vec<Vec<CompiledReference>> = Vec::with_capacity(occurrences.len());

        for occurrence in occurrences.into_iter().rev() {
            let resolved = self.resolver.resolve(&occurrence.path, &resolve_options);
            let mut reference = CompiledReference {
                occurrence,
                resolved_path: resolved.path,
                imported_from: current.to_path_buf(),
                depth,
                found: false,
                content: None,
                error: None,
                circular: false,
            };
            let mut nested = Vec::new();

            if visited.contains(&reference.resolved_path) {
                reference.circular = true;
                reference.error = Some(format!(
                    "Circular dependency detected: {}",
                    reference.resolved_path.display()
                ));
            } else if !resolved.exists {
                reference.error = Some(resolved.error.unwrap_or_else(|| "File not found".to_string()));
            } else if resolved.is_directory {
                reference.error = Some("Path is a directory, not a file".to_string());
            } else if let Some(max) = self.options.max_depth.filter(|max| depth >= *max) {
                reference.error = Some(format!("Maximum include depth {max} exceeded"));
            } else if !span_is_valid(&output, &reference.occurrence) {
                warn!(raw = %reference.occurrence.raw, "directive span does not match text");
                reference.error = Some("Invalid directive span".to_string());
            } else {
                match std::fs::read_to_string(&reference.resolved_path) {
                    Ok(source) => {
                        let target = reference.resolved_path.clone();
                        visited.insert(target.clone());
                        let expanded =
                            self.expand(&source, &target, &parent_dir(&target), depth + 1, visited);
                        visited.remove(&target);

                        let wrapped = self.wrapper.wrap(
                            &expanded.compiled_content,
                            &target,
                            &reference.occurrence,
                        );
                        output.replace_range(
                            reference.occurrence.start..reference.occurrence.end,
                            &wrapped,
                        );
                        reference.found = true;
                        reference.content = Some(expanded.compiled_content);
                        nested = expanded.references;
                    }
                    Err(err) => reference.error = Some(err.to_string()),
                }
            }

            if reference.found {
                debug!(
                    from = %current.display(),
                    target = %reference.resolved_path.display(),
                    depth,
                    "expanded reference"
                );
            } else {
                debug!(
                    from = %current.display(),
                    raw = %reference.occurrence.raw,
                    circular = reference.circular,
                    error = reference.error.as_deref().unwrap_or_default(),
                    "reference not expanded"
                );
            }

            let mut group = Vec::with_capacity(1 + nested.len());
            group.push(reference);
            group.extend(nested);
            groups.push(group);
        }

        CompiledContent {
            compiled_content: output,
            references: groups.into_iter().rev().flatten().collect(),
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map_or_else(|| PathBuf::from("/"), Path::to_path_buf)
}

// Directives are spliced back to front, so the prefix up to `end` is still
// the original text.
fn span_is_valid(text: &str, occurrence: &DirectiveOccurrence) -> bool {
    text.get(occurrence.start..occurrence.end) == Some(occurrence.raw.as_str())
}
