//! `@path` directive extraction.
//!
//! # Syntax
//!
//! A directive is an `@` immediately followed by a path:
//!
//! ```text
//! See @./notes/intro.md for context.
//! Shared rules: @~/prompts/rules.md
//! ```
//!
//! - The `@` must start the text or follow whitespace or an opening
//!   delimiter (`( [ { > " '`). `email@example.com` is not a directive.
//! - The path runs until whitespace or a delimiter
//!   (`` ` < > " ' ( ) [ ] { } ``). Trailing sentence punctuation
//!   (`. , ; : ! ?`) is not part of the path.
//! - The path must contain a `/` or a `.`, so `@mention` is not a directive.
//! - Directives inside fenced code blocks and inline code spans are ignored.
//!
//! Offsets are byte offsets into the scanned text: `start` points at the `@`
//! and `end` is exclusive, so `&text[start..end] == raw`.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// One textual inclusion directive found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectiveOccurrence {
    /// The matched text, including the leading `@`.
    pub raw: String,
    /// The target path exactly as written.
    pub path: String,
    /// Byte offset of the `@`.
    pub start: usize,
    /// Byte offset one past the last path byte.
    pub end: usize,
}

/// Turns document text into directive occurrences.
///
/// Implementations must return occurrences in ascending `start` order with
/// non-overlapping spans that lie on `char` boundaries.
pub trait Extractor {
    /// Extract every directive occurrence from `text`.
    fn extract(&self, text: &str) -> Vec<DirectiveOccurrence>;
}

impl<E: Extractor + ?Sized> Extractor for &E {
    fn extract(&self, text: &str) -> Vec<DirectiveOccurrence> {
        (**self).extract(text)
    }
}

/// The default `@path` lexer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtExtractor;

const OPENING_DELIMITERS: &[char] = &['(', '[', '{', '>', '"', '\''];
const PATH_TERMINATORS: &[char] = &['`', '<', '>', '"', '\'', '(', ')', '[', ']', '{', '}'];
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

impl Extractor for AtExtractor {
    fn extract(&self, text: &str) -> Vec<DirectiveOccurrence> {
        let excluded = excluded_ranges(text);
        let mut occurrences = Vec::new();
        let mut consumed = 0;

        for (at, _) in text.match_indices('@') {
            if at < consumed || excluded.iter().any(|range| range.contains(&at)) {
                continue;
            }

            let boundary = text[..at]
                .chars()
                .next_back()
                .is_none_or(|c| c.is_whitespace() || OPENING_DELIMITERS.contains(&c));
            if !boundary {
                continue;
            }

            let rest = &text[at + 1..];
            let run_len = rest
                .find(|c: char| c.is_whitespace() || PATH_TERMINATORS.contains(&c))
                .unwrap_or(rest.len());
            let path = rest[..run_len].trim_end_matches(TRAILING_PUNCTUATION);

            if path.is_empty() || !(path.contains('/') || path.contains('.')) {
                continue;
            }

            let end = at + 1 + path.len();
            occurrences.push(DirectiveOccurrence {
                raw: text[at..end].to_string(),
                path: path.to_string(),
                start: at,
                end,
            });
            consumed = end;
        }

        occurrences
    }
}

// ---------------------------------------------------------------------------
// Excluded ranges
// ---------------------------------------------------------------------------

/// Byte ranges where directives are not recognised: fenced code blocks and
/// inline code spans.
fn excluded_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = fenced_block_ranges(text);
    let inline = inline_code_ranges(text, &ranges);
    ranges.extend(inline);
    ranges
}

fn fenced_block_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    // (block start, fence char, fence length)
    let mut open: Option<(usize, char, usize)> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let trimmed = line.trim_start();

        match open {
            None => {
                if let Some((ch, len)) = fence_marker(trimmed) {
                    open = Some((line_start, ch, len));
                }
            }
            Some((start, ch, len)) => {
                let closes = fence_marker(trimmed).is_some_and(|(close_ch, close_len)| {
                    close_ch == ch && close_len >= len && trimmed[close_len..].trim().is_empty()
                });
                if closes {
                    ranges.push(start..offset);
                    open = None;
                }
            }
        }
    }

    // An unterminated fence runs to the end of the text.
    if let Some((start, _, _)) = open {
        ranges.push(start..text.len());
    }

    ranges
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let ch = line.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = line.chars().take_while(|c| *c == ch).count();
    (len >= 3).then_some((ch, len))
}

fn inline_code_ranges(text: &str, fenced: &[Range<usize>]) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut ranges = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if let Some(block) = fenced.iter().find(|range| range.contains(&i)) {
            i = block.end;
            continue;
        }
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }

        let open_len = backtick_run(bytes, i);
        let after_open = i + open_len;
        match closing_backticks(bytes, after_open, open_len, fenced) {
            Some(close_end) => {
                ranges.push(i..close_end);
                i = close_end;
            }
            None => i = after_open,
        }
    }

    ranges
}

fn backtick_run(bytes: &[u8], from: usize) -> usize {
    bytes[from..].iter().take_while(|b| **b == b'`').count()
}

/// Find the end of a backtick run of exactly `len` starting at or after
/// `from`. A code span never reaches into a fenced block.
fn closing_backticks(
    bytes: &[u8],
    from: usize,
    len: usize,
    fenced: &[Range<usize>],
) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        if fenced.iter().any(|range| range.contains(&j)) {
            return None;
        }
        if bytes[j] == b'`' {
            let run = backtick_run(bytes, j);
            if run == len {
                return Some(j + run);
            }
            j += run;
        } else {
            j += 1;
        }
    }
    None
}
