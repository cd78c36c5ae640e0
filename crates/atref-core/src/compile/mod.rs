//! Recursive transclusion compiler.
//!
//! - [`compiler`] expands directives into a single document.
//! - [`wrap`] formats each spliced file.
//! - [`tree`] turns the flat reference list back into a printable tree.

pub mod compiler;
pub mod tree;
pub mod wrap;

pub use compiler::{
    CompileOptions, CompileResult, CompiledContent, CompiledReference, Compiler,
    DEFAULT_OUTPUT_SUFFIX, built_output_path,
};
pub use tree::{TreeNode, TreeStyle, build_reference_tree, format_tree};
pub use wrap::{ContentWrapper, FencedWrapper, FileTagWrapper, RawWrapper, WrapperKind};
