use std::{borrow::Cow, io::Write};

/// Replaces the template identifier with the project name in file contents.
///
/// Matching is a plain byte scan. The search term is never interpreted as a
/// pattern, so names such as `my.app+v2` match only themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteSpec {
    search_term: String,
    replacement: String,
}

impl RewriteSpec {
    #[must_use]
    pub fn new(search_term: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            search_term: search_term.into(),
            replacement: replacement.into(),
        }
    }

    #[must_use]
    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    #[must_use]
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Returns `true` if `contents` holds at least one occurrence of the search term.
    #[must_use]
    pub fn matches(&self, contents: &[u8]) -> bool {
        find(contents, self.search_term.as_bytes(), 0).is_some()
    }

    /// Splits `contents` into untouched slices and replacements.
    ///
    /// Occurrences are consumed left to right and never overlap. An empty
    /// search term matches nothing.
    #[must_use]
    pub fn apply<'a>(&'a self, contents: &'a [u8]) -> Replaced<'a> {
        let needle = self.search_term.as_bytes();
        let mut chunks = Vec::new();
        let mut occurrences = 0;
        let mut last = 0;

        while let Some(start) = find(contents, needle, last) {
            chunks.push(Cow::Borrowed(&contents[last..start]));
            chunks.push(Cow::Borrowed(self.replacement.as_bytes()));
            occurrences += 1;
            last = start + needle.len();
        }

        chunks.push(Cow::Borrowed(&contents[last..]));

        Replaced {
            chunks,
            occurrences,
        }
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < from + needle.len() {
        return None;
    }

    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// The output of [`RewriteSpec::apply`].
pub struct Replaced<'a> {
    chunks: Vec<Cow<'a, [u8]>>,
    occurrences: usize,
}

impl Replaced<'_> {
    #[must_use]
    pub fn occurrences(&self) -> usize {
        self.occurrences
    }

    /// Length in bytes of the rewritten contents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.iter().map(|c| c.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_to(&self, mut target: impl Write) -> std::io::Result<()> {
        for chunk in &self.chunks {
            target.write_all(chunk)?;
        }

        target.flush()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.chunks.concat()
    }
}
