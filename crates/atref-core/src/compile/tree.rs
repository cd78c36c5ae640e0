//! Reference tree rendering.
//!
//! Rebuilds nesting from the pre-order reference list and draws it:
//!
//! ```text
//! ├─ @intro.md
//! │  └─ @shared/rules.md
//! ├─ @shared/rules.md (duplicate)
//! └─ @missing.md ✗
//!       File not found: /docs/missing.md
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

use super::compiler::CompiledReference;

/// One directive and the directives found inside its expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub reference: CompiledReference,
    /// How many successful imports of the same file exist across the tree.
    pub import_count: usize,
    /// The file was already imported earlier in the tree.
    pub duplicate: bool,
    pub children: Vec<Self>,
}

/// Options for [`format_tree`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStyle {
    /// Show resolved absolute paths instead of the directive text.
    pub full_paths: bool,
    /// Colour labels with ANSI escapes: green expanded, red failed or
    /// circular, yellow duplicate.
    pub color: bool,
}

const RESET: &str = "\x1b[0m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";

impl TreeStyle {
    const fn paint<'a>(self, code: &'a str) -> (&'a str, &'static str) {
        if self.color { (code, RESET) } else { ("", "") }
    }
}

/// Rebuild the tree from a pre-order list using each reference's `depth`.
#[must_use]
pub fn build_reference_tree(references: &[CompiledReference]) -> Vec<TreeNode> {
    let mut import_counts: HashMap<&PathBuf, usize> = HashMap::new();
    for reference in references.iter().filter(|r| r.found) {
        *import_counts.entry(&reference.resolved_path).or_default() += 1;
    }

    let mut seen: HashSet<&PathBuf> = HashSet::new();
    let mut roots: Vec<TreeNode> = Vec::new();
    let mut open: Vec<TreeNode> = Vec::new();

    for reference in references {
        while open.len() > reference.depth {
            close_top(&mut open, &mut roots);
        }
        let duplicate = reference.found && !seen.insert(&reference.resolved_path);
        open.push(TreeNode {
            import_count: import_counts
                .get(&reference.resolved_path)
                .copied()
                .unwrap_or_default(),
            duplicate,
            reference: reference.clone(),
            children: Vec::new(),
        });
    }
    while !open.is_empty() {
        close_top(&mut open, &mut roots);
    }

    roots
}

fn close_top(open: &mut Vec<TreeNode>, roots: &mut Vec<TreeNode>) {
    if let Some(node) = open.pop() {
        match open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}

/// Render the tree with box-drawing glyphs. Returns an empty string for an
/// empty tree.
#[must_use]
pub fn format_tree(nodes: &[TreeNode], style: &TreeStyle) -> String {
    let mut out = String::new();
    for (index, node) in nodes.iter().enumerate() {
        format_node(&mut out, node, "", index + 1 == nodes.len(), style);
    }
    // Drop the trailing newline.
    out.pop();
    out
}

fn format_node(out: &mut String, node: &TreeNode, prefix: &str, is_last: bool, style: &TreeStyle) {
    let branch = if is_last { "└─ " } else { "├─ " };
    let continuation = if is_last { "   " } else { "│  " };
    let reference = &node.reference;

    let label = if style.full_paths {
        reference.resolved_path.display().to_string()
    } else {
        reference.occurrence.raw.clone()
    };
    let (status, color) = if reference.circular {
        (" (circular)", RED)
    } else if !reference.found {
        (" ✗", RED)
    } else if node.duplicate {
        (" (duplicate)", YELLOW)
    } else {
        ("", GREEN)
    };
    let (on, off) = style.paint(color);

    let _ = writeln!(out, "{prefix}{branch}{on}{label}{status}{off}");

    let child_prefix = format!("{prefix}{continuation}");
    if let (Some(error), false) = (&reference.error, reference.circular) {
        let (on, off) = style.paint(RED);
        let _ = writeln!(out, "{child_prefix}   {on}{error}{off}");
    }

    for (index, child) in node.children.iter().enumerate() {
        format_node(out, child, &child_prefix, index + 1 == node.children.len(), style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::DirectiveOccurrence;

    fn reference(path: &str, depth: usize, found: bool) -> CompiledReference {
        CompiledReference {
            occurrence: DirectiveOccurrence {
                raw: format!("@{path}"),
                path: path.to_string(),
                start: 0,
                end: path.len() + 1,
            },
            resolved_path: PathBuf::from("/docs").join(path),
            imported_from: PathBuf::from("/docs/root.md"),
            depth,
            found,
            content: found.then(String::new),
            error: (!found).then(|| format!("File not found: /docs/{path}")),
            circular: false,
        }
    }

    #[test]
    fn empty_list_builds_empty_tree() {
        assert!(build_reference_tree(&[]).is_empty());
        assert_eq!(format_tree(&[], &TreeStyle::default()), "");
    }

    #[test]
    fn nesting_follows_depth() {
        let refs = vec![
            reference("a.md", 0, true),
            reference("b.md", 1, true),
            reference("c.md", 2, true),
            reference("d.md", 1, true),
            reference("e.md", 0, true),
        ];

        let tree = build_reference_tree(&refs);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].children.len(), 2);
        assert_eq!(tree[0].children[0].children.len(), 1);
        assert_eq!(tree[0].children[0].children[0].reference.occurrence.path, "c.md");
        assert_eq!(tree[0].children[1].reference.occurrence.path, "d.md");
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn repeated_imports_are_counted_and_marked() {
        let refs = vec![
            reference("b.md", 0, true),
            reference("d.md", 1, true),
            reference("c.md", 0, true),
            reference("d.md", 1, true),
        ];

        let tree = build_reference_tree(&refs);

        let first = &tree[0].children[0];
        let second = &tree[1].children[0];
        assert_eq!(first.import_count, 2);
        assert!(!first.duplicate);
        assert!(second.duplicate);
    }

    #[test]
    fn formats_glyphs_and_statuses() {
        let mut circular = reference("a.md", 1, false);
        circular.circular = true;
        circular.error = Some("Circular dependency detected: /docs/a.md".to_string());
        let refs = vec![
            reference("a.md", 0, true),
            circular,
            reference("x.md", 0, false),
        ];

        let rendered = format_tree(&build_reference_tree(&refs), &TreeStyle::default());

        assert_eq!(
            rendered,
            "├─ @a.md\n│  └─ @a.md (circular)\n└─ @x.md ✗\n      File not found: /docs/x.md"
        );
    }

    #[test]
    fn full_paths_show_resolved_locations() {
        let refs = vec![reference("sub/a.md", 0, true)];
        let rendered = format_tree(
            &build_reference_tree(&refs),
            &TreeStyle {
                full_paths: true,
                ..TreeStyle::default()
            },
        );
        assert_eq!(rendered, "└─ /docs/sub/a.md");
    }

    #[test]
    fn color_marks_each_status() {
        let mut circular = reference("a.md", 1, false);
        circular.circular = true;
        let refs = vec![
            reference("a.md", 0, true),
            circular,
            reference("a.md", 0, true),
            reference("x.md", 0, false),
        ];
        let style = TreeStyle {
            color: true,
            ..TreeStyle::default()
        };

        let rendered = format_tree(&build_reference_tree(&refs), &style);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "├─ \x1b[32m@a.md\x1b[0m");
        assert_eq!(lines[1], "│  └─ \x1b[31m@a.md (circular)\x1b[0m");
        assert_eq!(lines[2], "├─ \x1b[33m@a.md (duplicate)\x1b[0m");
        assert_eq!(lines[3], "└─ \x1b[31m@x.md ✗\x1b[0m");
        assert_eq!(lines[4], "      \x1b[31mFile not found: /docs/x.md\x1b[0m");
    }

    #[test]
    fn plain_style_has_no_escapes() {
        let refs = vec![reference("a.md", 0, true), reference("x.md", 0, false)];
        let rendered = format_tree(&build_reference_tree(&refs), &TreeStyle::default());
        assert!(!rendered.contains('\x1b'));
    }
}
