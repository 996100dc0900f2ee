//! `%global`/`%define` macro definition blocks, preserved byte-for-byte
//! including multi-line bodies continued with trailing backslashes.

use std::sync::LazyLock;

use regex::Regex;

static MACRO_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(%(?:global|define))(\s+)(\w+(?:\(.*?\))?)(\s+)(.*?)(\s*|\\)$").unwrap()
});

/// One `%global` or `%define` line (or continued line group).
///
/// The four whitespace runs around the keyword, name and body are captured
/// verbatim so the definition renders back byte-identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    /// Macro name, including any parenthesized argument spec.
    pub name: String,
    /// Macro body; continuation lines are joined with `\n`.
    pub body: String,
    /// Whether the definition uses `%global` rather than `%define`.
    pub is_global: bool,
    whitespace: (String, String, String, String),
    preceding_lines: Vec<String>,
}

impl MacroDefinition {
    pub fn new(
        name: impl Into<String>,
        body: impl Into<String>,
        is_global: bool,
        whitespace: (String, String, String, String),
        preceding_lines: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            is_global,
            whitespace,
            preceding_lines,
        }
    }

    /// Reconstruct the original lines of this definition, restoring
    /// trailing backslashes for continued bodies.
    pub fn get_raw_data(&self) -> Vec<String> {
        let mut result = self.preceding_lines.clone();
        let (ws0, ws1, ws2, ws3) = (
            &self.whitespace.0,
            &self.whitespace.1,
            &self.whitespace.2,
            &self.whitespace.3,
        );
        let keyword = if self.is_global { "%global" } else { "%define" };
        let mut body: Vec<String> = self
            .body
            .replace('\n', "\\\n")
            .split('\n')
            .map(str::to_string)
            .collect();
        if self.body.is_empty() {
            body = vec![ws3.clone()];
        } else if let Some(last) = body.last_mut() {
            last.push_str(ws3);
        }
        result.push(format!("{ws0}{keyword}{ws1}{}{ws2}{}", self.name, body[0]));
        result.extend(body[1..].iter().cloned());
        result
    }

    pub fn preceding_lines(&self) -> &[String] {
        &self.preceding_lines
    }

    pub(crate) fn preceding_lines_mut(&mut self) -> &mut Vec<String> {
        &mut self.preceding_lines
    }
}

/// All macro definitions in a block of lines, plus the leftover lines that
/// are not definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroDefinitions {
    definitions: Vec<MacroDefinition>,
    remainder: Vec<String>,
}

impl MacroDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(definitions: Vec<MacroDefinition>, remainder: Vec<String>) -> Self {
        Self {
            definitions,
            remainder,
        }
    }

    /// Parse lines into macro definitions.
    ///
    /// A body ending in a backslash continues on the following lines; the
    /// continuation is folded into the body with `\n` separators and any
    /// trailing whitespace of the folded body moves into the preserved
    /// whitespace slot.
    pub fn parse(lines: &[String]) -> Self {
        let mut definitions = Vec::new();
        let mut buffer: Vec<String> = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let line = &lines[i];
            i += 1;
            let Some(caps) = MACRO_DEF_RE.captures(line) else {
                buffer.push(line.clone());
                continue;
            };
            let mut body = caps[6].to_string();
            let mut ws3 = caps[7].to_string();
            if ws3 == "\\" {
                let mut current = line.as_str();
                while current.ends_with('\\') && i < lines.len() {
                    current = &lines[i];
                    i += 1;
                    body.push('\n');
                    body.push_str(current.trim_end_matches('\\'));
                }
                let kept = body.trim_end().len();
                ws3 = body.split_off(kept);
            }
            definitions.push(MacroDefinition {
                name: caps[4].to_string(),
                body,
                is_global: &caps[2] == "%global",
                whitespace: (
                    caps[1].to_string(),
                    caps[3].to_string(),
                    caps[5].to_string(),
                    ws3,
                ),
                preceding_lines: std::mem::take(&mut buffer),
            });
        }
        Self {
            definitions,
            remainder: buffer,
        }
    }

    /// Reconstruct the original lines. Exact inverse of [`parse`].
    ///
    /// [`parse`]: MacroDefinitions::parse
    pub fn get_raw_data(&self) -> Vec<String> {
        let mut result = Vec::new();
        for definition in &self.definitions {
            result.extend(definition.get_raw_data());
        }
        result.extend(self.remainder.iter().cloned());
        result
    }

    /// Index of the first definition with the given name (exact match).
    pub fn find(&self, name: &str) -> Option<usize> {
        self.definitions.iter().position(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.find(name).map(|i| &self.definitions[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut MacroDefinition> {
        self.find(name).map(|i| &mut self.definitions[i])
    }

    /// Remove the first definition with the given name; its preceding lines
    /// move to the next definition (or the remainder).
    pub fn remove(&mut self, name: &str) -> Option<MacroDefinition> {
        self.find(name).map(|i| self.remove_at(i))
    }

    pub fn remove_at(&mut self, index: usize) -> MacroDefinition {
        let definition = self.definitions.remove(index);
        let preceding = definition.preceding_lines.clone();
        if index < self.definitions.len() {
            self.definitions[index]
                .preceding_lines_mut()
                .splice(0..0, preceding);
        } else {
            self.remainder.splice(0..0, preceding);
        }
        definition
    }

    pub fn insert(&mut self, index: usize, definition: MacroDefinition) {
        let index = index.min(self.definitions.len());
        self.definitions.insert(index, definition);
    }

    pub fn push(&mut self, definition: MacroDefinition) {
        self.definitions.push(definition);
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MacroDefinition> {
        self.definitions.iter()
    }

    pub fn remainder(&self) -> &[String] {
        &self.remainder
    }
}

impl std::ops::Index<usize> for MacroDefinitions {
    type Output = MacroDefinition;

    fn index(&self, index: usize) -> &MacroDefinition {
        &self.definitions[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn ws(a: &str, b: &str, c: &str, d: &str) -> (String, String, String, String) {
        (a.to_string(), b.to_string(), c.to_string(), d.to_string())
    }

    #[test]
    fn test_find() {
        let definitions = MacroDefinitions::from_parts(
            vec![
                MacroDefinition::new("gitdate", "20160901", true, ws("", " ", "     ", ""), vec![]),
                MacroDefinition::new(
                    "commit",
                    "9ab9717cf7d1be1a85b165a8eacb71b9e5831113",
                    true,
                    ws("", " ", "      ", ""),
                    vec![],
                ),
                MacroDefinition::new(
                    "shortcommit",
                    "%(c=%{commit}; echo ${c:0:7})",
                    true,
                    ws("", " ", " ", ""),
                    vec![],
                ),
            ],
            vec![],
        );
        assert_eq!(definitions.find("gitdate"), Some(0));
        assert_eq!(definitions.find("shortcommit"), Some(2));
        assert_eq!(definitions.find("gittag"), None);
        assert_eq!(
            definitions.get("commit").unwrap().body,
            "9ab9717cf7d1be1a85b165a8eacb71b9e5831113"
        );
    }

    #[test]
    fn test_parse() {
        let definitions = MacroDefinitions::parse(&lines(&[
            "%global gitdate     20160901",
            "%global commit      9ab9717cf7d1be1a85b165a8eacb71b9e5831113",
            "%global shortcommit %(c=%{commit}; echo ${c:0:7})",
            "",
            "Name:           test",
            "Version:        0.1.0",
            "",
            "%define desc(x) Test spec file containing several \\",
            "macro definitions in various formats (%?1)",
        ]));
        assert_eq!(definitions[0].name, "gitdate");
        assert_eq!(definitions[1].name, "commit");
        assert_eq!(
            definitions.get("commit").unwrap().body,
            "9ab9717cf7d1be1a85b165a8eacb71b9e5831113"
        );
        assert_eq!(definitions[2].name, "shortcommit");
        let last = &definitions[definitions.len() - 1];
        assert_eq!(last.name, "desc(x)");
        assert!(!last.is_global);
        assert_eq!(
            last.body,
            "Test spec file containing several \nmacro definitions in various formats (%?1)"
        );
    }

    #[test]
    fn test_get_raw_data() {
        let input = lines(&[
            "%global gitdate     20160901",
            "%global commit      9ab9717cf7d1be1a85b165a8eacb71b9e5831113",
            "%global shortcommit %(c=%{commit}; echo ${c:0:7})",
            "",
            "Name:           test",
            "Version:        0.1.0",
            "",
            "%define desc(x) Test spec file containing several \\",
            "macro definitions in various formats (%?1)",
        ]);
        assert_eq!(MacroDefinitions::parse(&input).get_raw_data(), input);
    }

    #[test]
    fn test_remove_moves_preceding_lines() {
        let mut definitions = MacroDefinitions::parse(&lines(&[
            "# tracked commit",
            "%global commit 9ab9717",
            "%global shortcommit %(c=%{commit}; echo ${c:0:7})",
        ]));
        definitions.remove("commit").unwrap();
        assert_eq!(
            definitions.get_raw_data(),
            lines(&[
                "# tracked commit",
                "%global shortcommit %(c=%{commit}; echo ${c:0:7})",
            ])
        );
    }
}
