//! Resilient acquisition of oracle-backed semantics for a whole document.
//!
//! The oracle refuses to parse a spec file whose referenced sources are
//! missing from the source directory. [`SpecParser`] drives it through up
//! to three attempts:
//!
//! 1. a strict parse — if it succeeds, nothing else happens;
//! 2. after a failure (and only with forcing enabled), a forced non-build
//!    parse with placeholders for every reference a static scan of the
//!    document could find, to obtain the oracle's own source list;
//! 3. a forced full parse with placeholders for that authoritative list.
//!
//! Results produced with placeholders in play are marked `tainted`; the
//! placeholders themselves never outlive the call.

mod env;
mod placeholder;
mod refscan;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::location::filename_from_location;
use crate::oracle::{
    HandleSlot, OracleError, OracleHandle, ParseError, ParseFlags, SpecOracle,
};
use env::SanitizedEnvironment;
use placeholder::PlaceholderSet;

#[derive(Error, Debug)]
pub enum SpecParserError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("failed to synthesize placeholder sources: {0}")]
    Io(#[from] std::io::Error),
}

/// Drives the external oracle across a document, tolerating missing
/// referenced files by synthesizing placeholders.
///
/// A parser is synchronous and single-threaded; placeholder synthesis and
/// locale sanitization are process-wide side effects, so concurrent parses
/// sharing a source directory must be serialized by the caller.
pub struct SpecParser<O: SpecOracle> {
    sourcedir: PathBuf,
    macros: Vec<(String, String)>,
    force_parse: bool,
    oracle: O,
    spec: HandleSlot<O::Handle>,
    tainted: bool,
}

impl<O: SpecOracle> SpecParser<O> {
    /// Create a parser.
    ///
    /// `macros` are extra definitions installed before every oracle
    /// invocation; `force_parse` enables the placeholder fallback when the
    /// strict parse fails.
    pub fn new(
        sourcedir: impl Into<PathBuf>,
        macros: Vec<(String, String)>,
        force_parse: bool,
        oracle: O,
    ) -> Self {
        Self {
            sourcedir: sourcedir.into(),
            macros,
            force_parse,
            oracle,
            spec: HandleSlot::empty(),
            tainted: false,
        }
    }

    pub fn sourcedir(&self) -> &Path {
        &self.sourcedir
    }

    pub fn force_parse(&self) -> bool {
        self.force_parse
    }

    /// Handle of the last successful parse.
    pub fn spec(&self) -> Option<&O::Handle> {
        self.spec.get()
    }

    /// Whether the last successful parse needed placeholder files. Expanded
    /// values derived from a tainted parse are best-effort, not
    /// authoritative.
    pub fn tainted(&self) -> bool {
        self.tainted
    }

    /// Access to the oracle, e.g. for expanding individual values against
    /// the macro context left by the last parse.
    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    /// Parse `content` and update the held handle and the taint flag.
    ///
    /// Calling this on a parser that already holds a handle releases that
    /// handle before the oracle runs again; the oracle ties process-wide
    /// state to handle lifetimes and a stale handle must never outlive the
    /// creation of its replacement. A failed parse leaves the parser
    /// without a handle.
    pub fn parse(
        &mut self,
        content: &str,
        extra_macros: &[(String, String)],
    ) -> Result<(), SpecParserError> {
        self.spec.clear();
        self.tainted = false;
        let (handle, tainted) = self.do_parse(content, extra_macros)?;
        self.spec.replace(handle);
        self.tainted = tainted;
        Ok(())
    }

    fn do_parse(
        &mut self,
        content: &str,
        extra_macros: &[(String, String)],
    ) -> Result<(O::Handle, bool), SpecParserError> {
        let strict_error = match self.attempt(content, extra_macros, ParseFlags::STRICT) {
            Ok(handle) => return Ok((handle, false)),
            Err(error) => error,
        };
        if !self.force_parse {
            return Err(strict_error);
        }

        // the failed strict attempt populated the macro context, so the
        // static scans can expand references now
        let included =
            refscan::collect_included_sources(content, &self.sourcedir, &mut self.oracle)?;
        let tag_refs =
            refscan::collect_tag_value_sources(content, &self.sourcedir, &mut self.oracle)?;
        if included.is_empty() && tag_refs.is_empty() {
            // nothing to synthesize, forcing cannot help
            return Err(strict_error);
        }

        let listed_sources: BTreeSet<String> = {
            let placeholders = PlaceholderSet::synthesize(&self.sourcedir, &included, &tag_refs)?;
            if placeholders.is_empty() {
                // every referenced file already exists, retrying with an
                // unchanged directory cannot change the outcome
                return Err(strict_error);
            }
            warn!(
                files = ?placeholders.paths(),
                "created placeholder sources for nonexistent files"
            );
            let listing = self.attempt(content, extra_macros, ParseFlags::NON_BUILD)?;
            let sources = listing
                .sources()
                .iter()
                .map(|location| filename_from_location(location))
                .filter(|name| !name.is_empty() && !tag_refs.contains(name))
                .collect();
            // release before the full-parse handle is created
            listing.release();
            sources
        };

        let _placeholders =
            PlaceholderSet::synthesize(&self.sourcedir, &listed_sources, &tag_refs)?;
        let handle = self.attempt(content, extra_macros, ParseFlags::FULL)?;
        Ok((handle, true))
    }

    /// One oracle invocation: reinitialize and repopulate the macro table,
    /// sanitize the locale for the duration of the call, parse.
    fn attempt(
        &mut self,
        content: &str,
        extra_macros: &[(String, String)],
        flags: ParseFlags,
    ) -> Result<O::Handle, SpecParserError> {
        self.oracle.reinit()?;
        for (name, body) in self.macros.iter().chain(extra_macros) {
            self.oracle.define(name, body)?;
        }
        let sourcedir = self.sourcedir.display().to_string();
        self.oracle.define("_sourcedir", &sourcedir)?;
        let _locale = SanitizedEnvironment::enter();
        debug!(?flags, "invoking oracle");
        Ok(self.oracle.parse(content, flags)?)
    }
}
