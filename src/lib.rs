//! rpm-specedit: structural, comment-preserving editing of RPM spec file
//! preambles.
//!
//! # Architecture
//!
//! Text blocks parse into addressable entities — [`Tags`], [`Sourcelist`],
//! [`MacroDefinitions`] — that can be mutated and rendered back
//! byte-identically modulo the requested change: separators, comment
//! prefixes and blank-line structure are captured verbatim, never
//! normalized.
//!
//! Semantic information (macro-expanded values, whether a tag survived
//! conditional evaluation) comes from an external macro-expansion oracle
//! reached through the [`oracle`] traits. [`SpecParser`] drives that oracle
//! resiliently: when a parse fails only because referenced source files are
//! missing, it synthesizes signature-typed placeholders, retries, removes
//! every placeholder before returning, and marks the result
//! [`tainted`](SpecParser::tainted).
//!
//! # Example
//!
//! ```
//! use rpm_specedit::Tags;
//!
//! let lines: Vec<String> = [
//!     "# the upstream archive",
//!     "Source0: foo.tar.gz",
//!     "",
//!     "Source1: bar.tar.gz",
//! ]
//! .iter()
//! .map(|s| s.to_string())
//! .collect();
//!
//! let mut tags = Tags::parse(&lines, None);
//! assert_eq!(tags.get_raw_section_data(), lines);
//!
//! tags.set("source1", "baz.tar.gz").unwrap();
//! tags.remove("Source0").unwrap();
//! assert_eq!(
//!     tags.get_raw_section_data(),
//!     ["# the upstream archive", "", "Source1: baz.tar.gz"]
//! );
//! ```

pub mod comment;
pub mod location;
pub mod macros;
pub mod oracle;
pub mod parser;
pub mod sourcelist;
pub mod tags;

// Re-exports
pub use comment::{Comment, Comments};
pub use location::filename_from_location;
pub use macros::{MacroDefinition, MacroDefinitions};
pub use oracle::{
    HandleSlot, MacroContext, OracleError, OracleHandle, ParseError, ParseFlags, SpecOracle,
};
pub use parser::{SpecParser, SpecParserError};
pub use sourcelist::{Sourcelist, SourcelistEntry};
pub use tags::{Tag, TagError, Tags, TAG_NAMES};
