//! Directive extraction and path resolution.
//!
//! These are the two collaborators shared by the graph builder and the
//! compiler. Both sit behind traits so callers can substitute their own
//! lexer or resolution rules:
//!
//! - [`Extractor`] turns document text into [`DirectiveOccurrence`]s.
//! - [`Resolver`] maps an occurrence's raw path to a [`ResolvedPath`].

pub mod extract;
pub mod resolve;

pub use extract::{AtExtractor, DirectiveOccurrence, Extractor};
pub use resolve::{FsResolver, ResolveOptions, ResolvedPath, Resolver, normalize_path};
