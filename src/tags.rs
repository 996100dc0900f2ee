//! Tag blocks: the declarative `name: value` preamble entities of a spec
//! file, addressable and editable without disturbing any byte the caller
//! did not change.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::comment::Comments;

/// Tag names recognized by the RPM preamble parser.
pub const TAG_NAMES: &[&str] = &[
    "name",
    "version",
    "release",
    "epoch",
    "summary",
    "license",
    "distribution",
    "disturl",
    "vendor",
    "group",
    "packager",
    "url",
    "vcs",
    "source",
    "patch",
    "nosource",
    "nopatch",
    "excludearch",
    "exclusivearch",
    "excludeos",
    "exclusiveos",
    "icon",
    "provides",
    "requires",
    "recommends",
    "suggests",
    "supplements",
    "enhances",
    "prereq",
    "conflicts",
    "obsoletes",
    "prefixes",
    "prefix",
    "buildroot",
    "buildarchitectures",
    "buildarch",
    "buildconflicts",
    "buildprereq",
    "buildrequires",
    "autoreqprov",
    "autoreq",
    "autoprov",
    "docdir",
    "disttag",
    "bugurl",
    "translationurl",
    "upstreamreleases",
    "orderwithrequires",
    "removepathpostfixes",
    "modularitylabel",
];

/// Tags that can optionally carry a parenthesized argument (language or
/// qualifier), e.g. `Requires(post)`.
const TAGS_WITH_ARG: &[&str] = &[
    "summary",
    "group",
    "requires",
    "prereq",
    "orderwithrequires",
];

/// Regex fragment matching the given tag name, including an optional
/// qualifier or numeric suffix where the name allows one.
fn tag_name_pattern(name: &str) -> String {
    let mut pattern = regex::escape(name);
    let lower = name.to_ascii_lowercase();
    if TAGS_WITH_ARG.contains(&lower.as_str()) {
        pattern.push_str(r"(?:\s*\(\s*[^\s)]*\s*\))?");
    } else if lower == "source" || lower == "patch" {
        pattern.push_str(r"\d*");
    }
    pattern
}

fn tag_line_pattern(name: &str) -> String {
    format!(r"^(?i)(?P<n>{})(?P<s>\s*:\s*)(?P<v>.+)$", tag_name_pattern(name))
}

static TAG_LINE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    TAG_NAMES
        .iter()
        .map(|name| Regex::new(&tag_line_pattern(name)).unwrap())
        .collect()
});

static TAG_NAME_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    TAG_NAMES
        .iter()
        .map(|name| Regex::new(&format!("^(?i){}$", tag_name_pattern(name))).unwrap())
        .collect()
});

/// Line regex anchored to one concrete (already matched) tag name, used to
/// locate the corresponding line in the expanded view.
fn line_regex_for(name: &str) -> Regex {
    // the pattern is built from an escaped name, it always compiles
    Regex::new(&tag_line_pattern(name)).expect("escaped tag name pattern")
}

fn is_recognized_name(name: &str) -> bool {
    !name.is_empty() && TAG_NAME_RES.iter().any(|r| r.is_match(name))
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TagError {
    /// The name is not in the recognized tag name set.
    #[error("invalid tag name: '{name}'")]
    InvalidName { name: String },

    /// Name-based access to a tag that is not present in the collection.
    #[error("no such tag: {name}")]
    NoSuchTag { name: String },
}

/// A single spec file tag.
///
/// `value` is the literal value as stored in the spec file; the expanded
/// value is populated from the oracle-expanded view of the same block and
/// is absent when the tag did not survive conditional evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    /// Literal value of the tag as stored in the spec file.
    pub value: String,
    expanded_value: Option<String>,
    separator: String,
    /// Comments located directly above the tag.
    pub comments: Comments,
}

impl Tag {
    /// Construct a tag, validating the name against the recognized set.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        expanded_value: Option<&str>,
        separator: impl Into<String>,
        comments: Comments,
    ) -> Result<Self, TagError> {
        let name = name.into();
        if !is_recognized_name(&name) {
            return Err(TagError::InvalidName { name });
        }
        Ok(Self {
            name,
            value: value.into(),
            expanded_value: expanded_value.map(str::to_string),
            separator: separator.into(),
            comments,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Literal separator between name and value (colon plus surrounding
    /// whitespace), preserved verbatim.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Value of the tag after macro expansion and conditional evaluation,
    /// absent if the tag was conditionally excluded.
    pub fn expanded_value(&self) -> Option<&str> {
        self.expanded_value.as_deref()
    }

    /// A tag is valid iff it survived the expansion of the spec file.
    pub fn is_valid(&self) -> bool {
        self.expanded_value.is_some()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, self.separator, self.value)
    }
}

/// All tags in one preamble block, in document order, plus the unparsed
/// trailing lines of the block.
///
/// The collection mirrors the text: duplicate names are kept (later ones
/// override earlier ones in RPM semantics) and lookup by name is
/// case-insensitive, returning the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    tags: Vec<Tag>,
    remainder: Vec<String>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(tags: Vec<Tag>, remainder: Vec<String>) -> Self {
        Self { tags, remainder }
    }

    /// Parse the raw lines of a preamble block into tags.
    ///
    /// When the oracle-expanded view of the same block is available, each
    /// tag's expanded value is extracted from it by re-anchoring the matched
    /// name; repeated occurrences of the same name pair positionally (the
    /// Nth raw occurrence with the Nth expanded occurrence). Lines matching
    /// no tag pattern accumulate as comments/preceding lines of the next tag
    /// or as the trailing remainder.
    pub fn parse(raw_section: &[String], parsed_section: Option<&[String]>) -> Self {
        let mut tags = Vec::new();
        let mut buffer: Vec<String> = Vec::new();
        let mut occurrences: HashMap<String, usize> = HashMap::new();
        for line in raw_section {
            let caps = TAG_LINE_RES.iter().find_map(|r| r.captures(line));
            let Some(caps) = caps else {
                buffer.push(line.clone());
                continue;
            };
            let name = &caps["n"];
            let occurrence = occurrences.entry(name.to_ascii_lowercase()).or_insert(0);
            let expanded_value = parsed_section
                .and_then(|parsed| nth_expanded_value(parsed, name, *occurrence));
            *occurrence += 1;
            tags.push(Tag {
                name: name.to_string(),
                value: caps["v"].to_string(),
                expanded_value,
                separator: caps["s"].to_string(),
                comments: Comments::parse(&buffer),
            });
            buffer.clear();
        }
        Self {
            tags,
            remainder: buffer,
        }
    }

    /// Reconstruct the raw lines of the block. Exact inverse of [`parse`].
    ///
    /// [`parse`]: Tags::parse
    pub fn get_raw_section_data(&self) -> Vec<String> {
        let mut result = Vec::new();
        for tag in &self.tags {
            result.extend(tag.comments.get_raw_data());
            result.push(tag.to_string());
        }
        result.extend(self.remainder.iter().cloned());
        result
    }

    /// Index of the first tag with the given name, case-insensitively.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.tags.iter().position(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// First tag with the given name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.find(name).map(|i| &self.tags[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Tag> {
        self.find(name).map(|i| &mut self.tags[i])
    }

    /// Replace the literal value of the named tag.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), TagError> {
        match self.get_mut(name) {
            Some(tag) => {
                tag.value = value.into();
                Ok(())
            }
            None => Err(TagError::NoSuchTag {
                name: name.to_string(),
            }),
        }
    }

    /// Remove the named tag, preserving surrounding spacing (see
    /// [`remove_at`]).
    ///
    /// [`remove_at`]: Tags::remove_at
    pub fn remove(&mut self, name: &str) -> Result<Tag, TagError> {
        match self.find(name) {
            Some(index) => Ok(self.remove_at(index)),
            None => Err(TagError::NoSuchTag {
                name: name.to_string(),
            }),
        }
    }

    /// Remove the tag at `index`.
    ///
    /// The deleted tag's comment block (preceding lines plus the now
    /// orphaned comments) moves to the next entity (or to the remainder if
    /// it was last); blank-line runs meeting at the seam collapse into a
    /// single blank line, so human-intended separation survives the
    /// deletion.
    pub fn remove_at(&mut self, index: usize) -> Tag {
        let tag = self.tags.remove(index);
        let mut preceding = tag.comments.get_raw_data();
        let target: &mut Vec<String> = if index < self.tags.len() {
            self.tags[index].comments.preceding_lines_mut()
        } else {
            &mut self.remainder
        };
        let boundary_blank = preceding.last().is_some_and(String::is_empty)
            || target.first().is_some_and(String::is_empty);
        while preceding.last().is_some_and(String::is_empty) {
            preceding.pop();
        }
        let mut merged = preceding;
        if boundary_blank {
            merged.push(String::new());
        }
        merged.extend(
            target
                .iter()
                .skip_while(|line| line.is_empty())
                .cloned(),
        );
        *target = merged;
        tag
    }

    /// Insert a tag at `index` (clamped to the collection length).
    ///
    /// If the lines directly above the insertion point close a conditional
    /// block (`%endif`), they are reattached above the new tag so that it
    /// does not become part of a condition it did not originate from.
    pub fn insert(&mut self, index: usize, mut tag: Tag) {
        let index = index.min(self.tags.len());
        let lines: &mut Vec<String> = if index < self.tags.len() {
            self.tags[index].comments.preceding_lines_mut()
        } else {
            &mut self.remainder
        };
        if let Some(pos) = lines.iter().position(|line| line.starts_with("%endif")) {
            let moved: Vec<String> = lines.drain(..=pos).collect();
            tag.comments.preceding_lines_mut().splice(0..0, moved);
        }
        self.tags.insert(index, tag);
    }

    pub fn push(&mut self, tag: Tag) {
        self.tags.push(tag);
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.tags.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Tag> {
        self.tags.iter_mut()
    }

    /// Unparsed trailing lines of the block.
    pub fn remainder(&self) -> &[String] {
        &self.remainder
    }
}

/// Value of the `occurrence`-th line in the expanded view matching the given
/// (already matched) tag name.
fn nth_expanded_value(parsed: &[String], name: &str, occurrence: usize) -> Option<String> {
    let regex = line_regex_for(name);
    parsed
        .iter()
        .filter_map(|line| regex.captures(line))
        .nth(occurrence)
        .map(|caps| caps["v"].to_string())
}

impl std::ops::Index<usize> for Tags {
    type Output = Tag;

    fn index(&self, index: usize) -> &Tag {
        &self.tags[index]
    }
}

impl std::ops::IndexMut<usize> for Tags {
    fn index_mut(&mut self, index: usize) -> &mut Tag {
        &mut self.tags[index]
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::Comment;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn tag(name: &str, value: &str, expanded: Option<&str>, sep: &str, comments: Comments) -> Tag {
        Tag::new(name, value, expanded, sep, comments).unwrap()
    }

    #[test]
    fn test_invalid_name_rejected() {
        assert_eq!(
            Tag::new("Sauce", "x", None, ": ", Comments::new()),
            Err(TagError::InvalidName {
                name: "Sauce".to_string()
            })
        );
        assert!(Tag::new("", "x", None, ": ", Comments::new()).is_err());
        // a recognized name is accepted regardless of case, qualifier or index
        assert!(Tag::new("SOURCE10", "x", None, ": ", Comments::new()).is_ok());
        assert!(Tag::new("Requires(post)", "x", None, ": ", Comments::new()).is_ok());
        // a recognized prefix with trailing garbage is not a recognized name
        assert!(Tag::new("Sourcery", "x", None, ": ", Comments::new()).is_err());
    }

    #[test]
    fn test_find() {
        let tags = Tags::from_parts(
            vec![
                tag("Name", "test", Some("test"), ": ", Comments::new()),
                tag("Version", "0.1", Some("0.1"), ": ", Comments::new()),
                tag("Release", "1%{?dist}", Some("1.fc35"), ": ", Comments::new()),
            ],
            vec![],
        );
        assert_eq!(tags.find("version"), Some(1));
        assert_eq!(tags.find("Epoch"), None);
    }

    #[test]
    fn test_parse() {
        let tags = Tags::parse(
            &lines(&[
                "%global ver_major 1",
                "%global ver_minor 0",
                "",
                "# this is a test package",
                "# not to be used in production",
                "Name:    test",
                "Version: %{ver_major}.%{ver_minor}",
                "  # this is a valid comment",
                "Release: 1%{?dist}",
                "",
                "%if 0",
                "Epoch:   1",
                "%endif",
                "",
                "Requires:          make",
                "Requires(post):    bash",
            ]),
            Some(&lines(&[
                "",
                "",
                "",
                "# this is a test package",
                "# not to be used in production",
                "Name:    test",
                "Version: 1.0",
                "  # this is a valid comment",
                "Release: 1.fc35",
                "",
                "",
                "",
                "",
                "",
                "Requires:          make",
                "Requires(post):    bash",
            ])),
        );
        assert_eq!(tags[0].name(), "Name");
        assert_eq!(tags[0].comments[0].text, "this is a test package");
        assert_eq!(tags[0].comments[1].text, "not to be used in production");
        assert_eq!(tags[1].name(), "Version");
        assert_eq!(tags[1].value, "%{ver_major}.%{ver_minor}");
        assert!(tags[1].is_valid());
        assert_eq!(tags[1].expanded_value(), Some("1.0"));
        assert!(tags[1].comments.is_empty());
        assert_eq!(tags.get("release").unwrap().comments[0].prefix, "  # ");
        assert_eq!(tags.get("epoch").unwrap().name(), "Epoch");
        assert!(!tags.get("epoch").unwrap().is_valid());
        assert_eq!(tags.get("requires").unwrap().value, "make");
        assert!(tags.contains("requires(post)"));
        assert_eq!(tags[tags.len() - 1].name(), "Requires(post)");
    }

    #[test]
    fn test_parse_pairs_duplicate_names_positionally() {
        let tags = Tags::parse(
            &lines(&["Summary: first", "Summary: second"]),
            Some(&lines(&["Summary: FIRST", "Summary: SECOND"])),
        );
        assert_eq!(tags[0].expanded_value(), Some("FIRST"));
        assert_eq!(tags[1].expanded_value(), Some("SECOND"));
    }

    #[test]
    fn test_get_raw_section_data() {
        let tags = Tags::from_parts(
            vec![
                tag(
                    "Name",
                    "test",
                    Some("test"),
                    ":    ",
                    Comments::from_parts(
                        vec![
                            Comment::new("this is a test package"),
                            Comment::new("not to be used in production"),
                        ],
                        lines(&["%global ver_major 1", "%global ver_minor 0", ""]),
                    ),
                ),
                tag(
                    "Version",
                    "%{ver_major}.%{ver_minor}",
                    Some("1.0"),
                    ": ",
                    Comments::new(),
                ),
                tag(
                    "Release",
                    "1%{?dist}",
                    Some("1.fc35"),
                    ": ",
                    Comments::from_parts(
                        vec![Comment::with_prefix("this is a valid comment", "  # ")],
                        vec![],
                    ),
                ),
                tag(
                    "Epoch",
                    "1",
                    None,
                    ":   ",
                    Comments::from_parts(vec![], lines(&["", "%if 0"])),
                ),
                tag(
                    "Requires",
                    "make",
                    Some("make"),
                    ":          ",
                    Comments::from_parts(vec![], lines(&["%endif", ""])),
                ),
                tag("Requires(post)", "bash", Some("bash"), ":    ", Comments::new()),
            ],
            vec![],
        );
        assert_eq!(
            tags.get_raw_section_data(),
            lines(&[
                "%global ver_major 1",
                "%global ver_minor 0",
                "",
                "# this is a test package",
                "# not to be used in production",
                "Name:    test",
                "Version: %{ver_major}.%{ver_minor}",
                "  # this is a valid comment",
                "Release: 1%{?dist}",
                "",
                "%if 0",
                "Epoch:   1",
                "%endif",
                "",
                "Requires:          make",
                "Requires(post):    bash",
            ])
        );
    }

    #[test]
    fn test_round_trip() {
        let raw = lines(&[
            "# leading comment",
            "Name: test",
            "",
            "Source0: foo.tar.gz",
            "# trailing junk follows",
            "not a tag line",
        ]);
        let tags = Tags::parse(&raw, None);
        assert_eq!(tags.get_raw_section_data(), raw);
    }

    #[test]
    fn test_remove_collapses_boundary_blank_lines() {
        // deleting Source0 leaves exactly one blank line between the
        // orphaned comments and Source1
        let mut tags = Tags::parse(
            &lines(&[
                "# pristine upstream archive",
                "# see https://example.com",
                "Source0: foo.tar.gz",
                "",
                "Source1: bar.tar.gz",
            ]),
            None,
        );
        tags.remove("Source0").unwrap();
        assert_eq!(
            tags.get_raw_section_data(),
            lines(&[
                "# pristine upstream archive",
                "# see https://example.com",
                "",
                "Source1: bar.tar.gz",
            ])
        );
    }

    #[test]
    fn test_remove_last_redistributes_into_remainder() {
        let mut tags = Tags::parse(
            &lines(&["Name: test", "", "# stray", "Version: 0.1", "", "leftover"]),
            None,
        );
        tags.remove("Version").unwrap();
        assert_eq!(
            tags.get_raw_section_data(),
            lines(&["Name: test", "", "# stray", "", "leftover"])
        );
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_remove_missing_tag() {
        let mut tags = Tags::new();
        assert_eq!(
            tags.remove("Url"),
            Err(TagError::NoSuchTag {
                name: "Url".to_string()
            })
        );
    }

    #[test]
    fn test_set_value() {
        let mut tags = Tags::from_parts(
            vec![tag("Url", "https://old.example.com", None, ": ", Comments::new())],
            vec![],
        );
        tags.set("URL", "https://example.com").unwrap();
        assert_eq!(tags[0].value, "https://example.com");
        assert!(tags.set("Vcs", "x").is_err());
    }

    #[test]
    fn test_insert_moves_conditional_closer_above_new_tag() {
        let mut tags = Tags::parse(
            &lines(&[
                "%if 0%{?fedora}",
                "Recommends: foo",
                "%endif",
                "Requires: bar",
            ]),
            None,
        );
        let index = tags.find("Requires").unwrap();
        tags.insert(
            index,
            tag("Suggests", "baz", None, ": ", Comments::new()),
        );
        assert_eq!(
            tags.get_raw_section_data(),
            lines(&[
                "%if 0%{?fedora}",
                "Recommends: foo",
                "%endif",
                "Suggests: baz",
                "Requires: bar",
            ])
        );
    }

    #[test]
    fn test_insert_at_end_clamps_index() {
        let mut tags = Tags::new();
        tags.insert(5, tag("Name", "test", None, ": ", Comments::new()));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_clone_is_deep() {
        let original = Tags::from_parts(
            vec![tag(
                "Name",
                "test",
                Some("test"),
                ": ",
                Comments::from_parts(vec![Comment::new("a comment")], vec![]),
            )],
            vec![],
        );
        let mut copied = original.clone();
        copied[0].comments.push("another");
        assert_eq!(original[0].comments.len(), 1);
        assert_ne!(original, copied);
    }
}
