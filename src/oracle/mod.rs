//! Interface to the external macro-expansion/build oracle.
//!
//! The crate delegates all RPM-specific evaluation — macro expansion,
//! conditional evaluation, source enumeration — to an external engine
//! reached through the traits below. The oracle's macro table is
//! process-wide state; it is modeled here as an injected capability
//! ([`MacroContext`]) rather than mutated ambiently, and parse results are
//! wrapped in a handle type with an explicit release discipline.

pub mod errors;

pub use errors::{OracleError, ParseError};

/// Flags selecting the oracle parse mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseFlags {
    /// Stop after preamble evaluation and source enumeration instead of
    /// processing build scriptlets.
    pub non_build: bool,
    /// Ignore architecture exclusions.
    pub any_arch: bool,
    /// Tolerate recoverable errors instead of aborting the parse.
    pub force: bool,
}

impl ParseFlags {
    /// Full parse with no tolerance for errors or missing inputs.
    pub const STRICT: Self = Self {
        non_build: false,
        any_arch: false,
        force: false,
    };

    /// Forced, architecture-agnostic, non-build parse. Used to obtain the
    /// oracle's own source list.
    pub const NON_BUILD: Self = Self {
        non_build: true,
        any_arch: true,
        force: true,
    };

    /// Forced, architecture-agnostic, full parse.
    pub const FULL: Self = Self {
        non_build: false,
        any_arch: true,
        force: true,
    };
}

/// The oracle's macro table.
///
/// The table is global to the oracle process; passing it explicitly keeps
/// every mutation visible at the call site. Callers that need a clean slate
/// must call [`reinit`] and re-define everything they rely on — definitions
/// survive across parses otherwise.
///
/// [`reinit`]: MacroContext::reinit
pub trait MacroContext {
    /// Reinitialize the macro table, dropping definitions accumulated by
    /// previous invocations.
    fn reinit(&mut self) -> Result<(), OracleError>;

    /// Define a macro.
    fn define(&mut self, name: &str, body: &str) -> Result<(), OracleError>;

    /// Expand all macro references in `text` using the current table.
    fn expand(&mut self, text: &str) -> Result<String, OracleError>;
}

/// The external macro-expansion/build-semantics engine.
pub trait SpecOracle: MacroContext {
    type Handle: OracleHandle;

    /// Parse a whole spec document.
    ///
    /// Any handle obtained from a previous call must be released before
    /// this is called again; see [`OracleHandle::release`].
    fn parse(&mut self, content: &str, flags: ParseFlags) -> Result<Self::Handle, ParseError>;
}

/// Result of a successful oracle parse.
///
/// The oracle ties process-wide interpreter state to the lifetime of each
/// handle. That state is initialized when a handle is created and torn down
/// when one is destroyed, so destruction order matters: a stale handle
/// destroyed *after* its replacement was created tears down tables the
/// replacement has just set up. [`release`] makes the teardown explicit;
/// never leave a held handle to incidental destruction ordering.
///
/// [`release`]: OracleHandle::release
pub trait OracleHandle {
    /// Source and patch locations as resolved by the oracle.
    fn sources(&self) -> &[String];

    /// The macro-expanded view of the document.
    fn parsed_text(&self) -> &str;

    /// Release the handle and the oracle state tied to it.
    fn release(self);
}

/// Holder for at most one oracle handle, enforcing the single-owner,
/// release-before-replace lifecycle.
#[derive(Debug)]
pub struct HandleSlot<H: OracleHandle> {
    inner: Option<H>,
}

impl<H: OracleHandle> Default for HandleSlot<H> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<H: OracleHandle> HandleSlot<H> {
    pub fn empty() -> Self {
        Self { inner: None }
    }

    pub fn get(&self) -> Option<&H> {
        self.inner.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Store `handle`, explicitly releasing the previously held handle
    /// first.
    pub fn replace(&mut self, handle: H) {
        self.clear();
        self.inner = Some(handle);
    }

    /// Release the held handle, if any.
    pub fn clear(&mut self) {
        if let Some(old) = self.inner.take() {
            old.release();
        }
    }
}
