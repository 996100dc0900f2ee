use crate::comment::Comments;
use crate::oracle::{MacroContext, OracleError};

/// One source/patch location in a `%sourcelist`/`%patchlist` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcelistEntry {
    /// Literal location as stored in the spec file.
    pub location: String,
    /// Comments located directly above the entry.
    pub comments: Comments,
}

impl SourcelistEntry {
    pub fn new(location: impl Into<String>, comments: Comments) -> Self {
        Self {
            location: location.into(),
            comments,
        }
    }

    /// Location with macro references resolved by the given macro context.
    pub fn expanded_location(&self, context: &mut dyn MacroContext) -> Result<String, OracleError> {
        context.expand(&self.location)
    }
}

/// Entries of a `%sourcelist`/`%patchlist` block: one location per
/// non-blank, non-comment line, with the same comment-preservation
/// discipline as a tag block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sourcelist {
    entries: Vec<SourcelistEntry>,
    remainder: Vec<String>,
}

impl Sourcelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(entries: Vec<SourcelistEntry>, remainder: Vec<String>) -> Self {
        Self { entries, remainder }
    }

    /// Parse the raw lines of a list block into entries.
    pub fn parse(section: &[String]) -> Self {
        let mut entries = Vec::new();
        let mut buffer: Vec<String> = Vec::new();
        for line in section {
            if !line.is_empty() && !line.trim_start().starts_with('#') {
                entries.push(SourcelistEntry::new(line.clone(), Comments::parse(&buffer)));
                buffer.clear();
            } else {
                buffer.push(line.clone());
            }
        }
        Self {
            entries,
            remainder: buffer,
        }
    }

    /// Reconstruct the raw lines of the block. Exact inverse of [`parse`].
    ///
    /// [`parse`]: Sourcelist::parse
    pub fn get_raw_section_data(&self) -> Vec<String> {
        let mut result = Vec::new();
        for entry in &self.entries {
            result.extend(entry.comments.get_raw_data());
            result.push(entry.location.clone());
        }
        result.extend(self.remainder.iter().cloned());
        result
    }

    /// Remove the entry at `index`, redistributing its comment block to the
    /// next entry (or the remainder) with the same blank-line seam collapse
    /// as tag deletion.
    pub fn remove_at(&mut self, index: usize) -> SourcelistEntry {
        let entry = self.entries.remove(index);
        let mut preceding = entry.comments.get_raw_data();
        let target: &mut Vec<String> = if index < self.entries.len() {
            self.entries[index].comments.preceding_lines_mut()
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
        entry
    }

    pub fn insert(&mut self, index: usize, entry: SourcelistEntry) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
    }

    pub fn push(&mut self, entry: SourcelistEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourcelistEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SourcelistEntry> {
        self.entries.iter_mut()
    }

    /// Unparsed trailing lines of the block.
    pub fn remainder(&self) -> &[String] {
        &self.remainder
    }
}

impl std::ops::Index<usize> for Sourcelist {
    type Output = SourcelistEntry;

    fn index(&self, index: usize) -> &SourcelistEntry {
        &self.entries[index]
    }
}

impl std::ops::IndexMut<usize> for Sourcelist {
    fn index_mut(&mut self, index: usize) -> &mut SourcelistEntry {
        &mut self.entries[index]
    }
}

impl<'a> IntoIterator for &'a Sourcelist {
    type Item = &'a SourcelistEntry;
    type IntoIter = std::slice::Iter<'a, SourcelistEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
