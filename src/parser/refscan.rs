//! Static collection of file references from a document that the oracle
//! refused to parse.
//!
//! This scan is deliberately best-effort: it only decides whether forcing
//! the parse is worth attempting at all. The authoritative reference list
//! comes from the oracle itself once placeholders let it run.

use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::oracle::{MacroContext, OracleError};
use crate::tags::Tags;

static INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*%include\s+(.*)$").unwrap());

/// Source references in shell expansions: `%SOURCEn`, `%{SOURCEn}`,
/// `%{S:n}`, with optional conditionality markers.
static SOURCE_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%(?:\{[?!]*SOURCE\d+\}|[?!]*SOURCE\d+|\{S:\d+\})").unwrap()
});

/// Basenames of files pulled in via `%include` directives, restricted to
/// files that resolve into `sourcedir`.
///
/// Expansion relies on the macro context populated by the failed strict
/// parse.
pub(crate) fn collect_included_sources<C: MacroContext + ?Sized>(
    content: &str,
    sourcedir: &Path,
    context: &mut C,
) -> Result<BTreeSet<String>, OracleError> {
    let mut sources = BTreeSet::new();
    let mut lines: VecDeque<&str> = content.lines().collect();
    while let Some(line) = lines.pop_front() {
        let Some(caps) = INCLUDE_RE.captures(line) else {
            continue;
        };
        let mut arg = caps[1].to_string();
        let mut current = line;
        while current.ends_with('\\') {
            let Some(next) = lines.pop_front() else {
                break;
            };
            current = next;
            arg.pop();
            arg.push_str(next);
        }
        let expanded = context.expand(&arg)?;
        let path = Path::new(expanded.trim());
        if resolves_into(path, sourcedir) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                sources.insert(name.to_string());
            }
        }
    }
    Ok(sources)
}

/// Basenames of sources referenced from shell expansions in tag values,
/// restricted to files that resolve into `sourcedir`.
///
/// Only tags whose whole value expands to the empty string are considered:
/// a value that expands non-empty cannot break the parse, whatever files it
/// mentions.
pub(crate) fn collect_tag_value_sources<C: MacroContext + ?Sized>(
    content: &str,
    sourcedir: &Path,
    context: &mut C,
) -> Result<BTreeSet<String>, OracleError> {
    let lines: Vec<String> = content.lines().map(str::to_string).collect();
    let tags = Tags::parse(&lines, None);
    let mut sources = BTreeSet::new();
    for tag in &tags {
        if !context.expand(&tag.value)?.is_empty() {
            continue;
        }
        for fragment in shell_expansion_fragments(&tag.value) {
            for reference in SOURCE_REF_RE.find_iter(&fragment) {
                let expanded = context.expand(reference.as_str())?;
                let path = Path::new(&expanded);
                if resolves_into(path, sourcedir) {
                    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                        sources.insert(name.to_string());
                    }
                }
            }
        }
    }
    Ok(sources)
}

/// Whether `path`'s parent directory is `sourcedir`. References resolving
/// elsewhere are not ours to synthesize.
fn resolves_into(path: &Path, sourcedir: &Path) -> bool {
    let Some(parent) = path.parent() else {
        return false;
    };
    match (fs::canonicalize(parent), fs::canonicalize(sourcedir)) {
        (Ok(a), Ok(b)) => a == b,
        _ => parent == sourcedir,
    }
}

/// Bodies of `%(...)` shell expansion fragments in a tag value, including
/// fragments nested inside conditional macro expansions.
fn shell_expansion_fragments(value: &str) -> Vec<String> {
    let bytes = value.as_bytes();
    let mut fragments = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] != b'%' || bytes[i + 1] != b'(' {
            i += 1;
            continue;
        }
        let start = i + 2;
        let mut depth = 1;
        let mut j = start;
        while j < bytes.len() && depth > 0 {
            match bytes[j] {
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ => {}
            }
            j += 1;
        }
        let end = if depth == 0 { j - 1 } else { bytes.len() };
        fragments.push(value[start..end].to_string());
        i = j;
    }
    fragments
}
