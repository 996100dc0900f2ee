use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\s*#+\s*)(.*)$").unwrap());

/// A single comment line.
///
/// The `prefix` holds the literal comment marker together with any
/// surrounding whitespace, so a rendered comment is byte-identical to the
/// line it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Text of the comment, without the marker.
    pub text: String,
    /// Comment marker and surrounding whitespace, e.g. `"# "` or `"  ## "`.
    pub prefix: String,
}

impl Comment {
    /// Create a comment with the default `"# "` prefix.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_prefix(text, "# ")
    }

    /// Create a comment with an explicit prefix.
    pub fn with_prefix(text: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prefix: prefix.into(),
        }
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.text)
    }
}

/// A run of consecutive comment lines located directly above an entity
/// (a tag, a sourcelist entry, ...), plus the raw lines that sit above the
/// run without belonging to it.
///
/// Rendering a run emits `preceding_lines` verbatim followed by each
/// comment, which reproduces exactly the original lines that preceded the
/// owning entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    comments: Vec<Comment>,
    preceding_lines: Vec<String>,
}

impl Comments {
    /// Create an empty run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a run from explicit parts.
    pub fn from_parts(comments: Vec<Comment>, preceding_lines: Vec<String>) -> Self {
        Self {
            comments,
            preceding_lines,
        }
    }

    /// Parse the lines that precede an entity into a comment run.
    ///
    /// Lines are scanned from the end backward; a line joins the run only if
    /// it matches the comment grammar *and* no non-comment line has been seen
    /// yet. Everything above the first non-comment line becomes
    /// `preceding_lines`, even lines that look like comments — a block of
    /// commented-out content separated from the entity stays where it is.
    pub fn parse(lines: &[String]) -> Self {
        let mut comments = Vec::new();
        let mut preceding_lines = Vec::new();
        for line in lines.iter().rev() {
            match COMMENT_RE.captures(line) {
                Some(caps) if preceding_lines.is_empty() => {
                    comments.insert(0, Comment::with_prefix(&caps[2], &caps[1]));
                }
                _ => preceding_lines.insert(0, line.clone()),
            }
        }
        Self {
            comments,
            preceding_lines,
        }
    }

    /// Reconstruct the original lines: preceding lines first, then each
    /// comment rendered as `prefix + text`.
    pub fn get_raw_data(&self) -> Vec<String> {
        let mut result = self.preceding_lines.clone();
        result.extend(self.comments.iter().map(Comment::to_string));
        result
    }

    /// Comment texts without prefixes.
    pub fn raw(&self) -> Vec<&str> {
        self.comments.iter().map(|c| c.text.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Comment> {
        self.comments.iter()
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Comment> {
        self.comments.get(index)
    }

    /// Append a comment with the default prefix.
    pub fn push(&mut self, text: impl Into<String>) {
        self.comments.push(Comment::new(text));
    }

    /// Append an already constructed comment.
    pub fn push_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    pub fn insert(&mut self, index: usize, comment: Comment) {
        self.comments.insert(index, comment);
    }

    pub fn remove(&mut self, index: usize) -> Comment {
        self.comments.remove(index)
    }

    pub fn preceding_lines(&self) -> &[String] {
        &self.preceding_lines
    }

    pub(crate) fn preceding_lines_mut(&mut self) -> &mut Vec<String> {
        &mut self.preceding_lines
    }
}

impl std::ops::Index<usize> for Comments {
    type Output = Comment;

    fn index(&self, index: usize) -> &Comment {
        &self.comments[index]
    }
}

impl<'a> IntoIterator for &'a Comments {
    type Item = &'a Comment;
    type IntoIter = std::slice::Iter<'a, Comment>;

    fn into_iter(self) -> Self::IntoIter {
        self.comments.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_plain_run() {
        let comments = Comments::parse(&lines(&["# first", "#second", "  #  third"]));
        assert_eq!(comments.len(), 3);
        assert_eq!(comments[0].text, "first");
        assert_eq!(comments[0].prefix, "# ");
        assert_eq!(comments[1].text, "second");
        assert_eq!(comments[1].prefix, "#");
        assert_eq!(comments[2].text, "third");
        assert_eq!(comments[2].prefix, "  #  ");
        assert!(comments.preceding_lines().is_empty());
    }

    #[test]
    fn test_parse_splits_at_last_non_comment_line() {
        // the commented-out block above the %global line is unrelated to the
        // entity and must stay in preceding lines
        let input = lines(&[
            "# commented-out content",
            "#Source9: old.tar.gz",
            "%global ver 1",
            "",
            "# belongs to the tag",
        ]);
        let comments = Comments::parse(&input);
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text, "belongs to the tag");
        assert_eq!(
            comments.preceding_lines(),
            &input[..4],
            "everything above the first non-comment line (scanning backward) is preceding"
        );
    }

    #[test]
    fn test_parse_empty() {
        let comments = Comments::parse(&[]);
        assert!(comments.is_empty());
        assert!(comments.preceding_lines().is_empty());
    }

    #[test]
    fn test_raw_data_round_trip() {
        let input = lines(&["%global ver 1", "", "# one", "## two", "# three"]);
        let comments = Comments::parse(&input);
        assert_eq!(comments.get_raw_data(), input);
    }

    #[test]
    fn test_multi_hash_prefix() {
        let comments = Comments::parse(&lines(&["### banner"]));
        assert_eq!(comments[0].prefix, "### ");
        assert_eq!(comments[0].text, "banner");
        assert_eq!(comments[0].to_string(), "### banner");
    }
}
