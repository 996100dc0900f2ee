use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::location::filename_from_location;

/// File signatures keyed by extension, mirroring the compressed-format
/// probe table of the oracle's file classifier. A placeholder carrying the
/// right signature keeps downstream format sniffing from misclassifying it.
const SIGNATURES: &[(&str, &[u8])] = &[
    (".bz2", b"BZh"),
    (".zip", b"PK00"),
    (".xz", b"\xfd7zXZ\x00"),
    (".zst", b"\x28\xb5\x2f"),
    (".lz", b"LZIP"),
    (".lrz", b"LRZI"),
    (".gz", b"\x1f\x8b"),
    (".7z", b"7z\xbc\xaf\x27\x1c"),
];

/// Number of bytes the oracle reads to determine a file's type.
const MAGIC_LENGTH: usize = 13;

/// Content of placeholders for sources referenced from shell expansions in
/// tag values; only non-emptiness matters for those.
const PLACEHOLDER_TEXT: &str = "DUMMY";

/// Placeholder files synthesized under the source directory so a parse can
/// proceed without the real referenced files.
///
/// The set is a scoped resource: every file it created is deleted when it
/// is dropped, on success and failure paths alike. Files that already
/// existed are never touched and never deleted.
#[derive(Debug, Default)]
pub(crate) struct PlaceholderSet {
    created: Vec<PathBuf>,
}

impl PlaceholderSet {
    /// Create placeholders for every referenced file missing from
    /// `sourcedir`.
    ///
    /// `binary` locations get a signature matching their extension, padded
    /// to the probe length; `text` locations get non-empty text content.
    pub(crate) fn synthesize(
        sourcedir: &Path,
        binary: &BTreeSet<String>,
        text: &BTreeSet<String>,
    ) -> io::Result<Self> {
        let mut set = Self::default();
        for location in binary {
            set.write_placeholder(sourcedir, location, |filename| signature_for(filename))?;
        }
        for location in text {
            set.write_placeholder(sourcedir, location, |_| PLACEHOLDER_TEXT.as_bytes().to_vec())?;
        }
        Ok(set)
    }

    fn write_placeholder(
        &mut self,
        sourcedir: &Path,
        location: &str,
        content: impl Fn(&str) -> Vec<u8>,
    ) -> io::Result<()> {
        let filename = filename_from_location(location);
        if filename.is_empty() {
            return Ok(());
        }
        let path = sourcedir.join(&filename);
        if path.is_file() {
            return Ok(());
        }
        fs::write(&path, content(&filename))?;
        self.created.push(path);
        Ok(())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    pub(crate) fn paths(&self) -> &[PathBuf] {
        &self.created
    }
}

impl Drop for PlaceholderSet {
    fn drop(&mut self) {
        for path in self.created.drain(..) {
            if let Err(error) = fs::remove_file(&path) {
                warn!(path = %path.display(), %error, "failed to remove placeholder source");
            }
        }
    }
}

fn signature_for(filename: &str) -> Vec<u8> {
    let mut content = vec![0u8; MAGIC_LENGTH];
    for (extension, magic) in SIGNATURES {
        if filename.ends_with(extension) {
            content[..magic.len()].copy_from_slice(magic);
            break;
        }
    }
    content
}
