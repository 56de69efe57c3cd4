use std::{io, path::PathBuf};

/// Why a single archive entry could not be extracted. None of these stop the run.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("malformed archive path '{0}'")]
    MalformedPath(String),

    #[error("failed to create directory {path}: {source}")]
    DirectoryCreateFailed { path: PathBuf, source: io::Error },

    #[error("failed to create file {path}: {source}")]
    FileCreateFailed { path: PathBuf, source: io::Error },

    #[error("failed to write file {path}: {source}")]
    FileWriteFailed { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Skipped,
    Failed,
}

#[derive(Debug)]
pub struct EntryOutcome {
    /// Path as stored in the archive, wrapper segment included.
    pub path: String,
    pub outcome: Outcome,
    pub error: Option<EntryError>,
    /// Occurrences of the search term replaced in this entry.
    pub replacements: usize,
}

impl EntryOutcome {
    pub(crate) fn created(path: &str, replacements: usize) -> Self {
        Self {
            path: path.to_owned(),
            outcome: Outcome::Created,
            error: None,
            replacements,
        }
    }

    pub(crate) fn skipped(path: &str) -> Self {
        Self {
            path: path.to_owned(),
            outcome: Outcome::Skipped,
            error: None,
            replacements: 0,
        }
    }

    pub(crate) fn failed(path: &str, error: EntryError) -> Self {
        Self {
            path: path.to_owned(),
            outcome: Outcome::Failed,
            error: Some(error),
            replacements: 0,
        }
    }
}

/// Per-entry outcomes in archive order.
#[derive(Debug, Default)]
pub struct ExtractionResult {
    pub entries: Vec<EntryOutcome>,
}

impl ExtractionResult {
    pub(crate) fn push(&mut self, entry: EntryOutcome) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn count(&self, outcome: Outcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.entries.iter().filter(|e| e.outcome == Outcome::Failed)
    }

    /// Files that had at least one occurrence rewritten.
    #[must_use]
    pub fn rewritten(&self) -> usize {
        self.entries.iter().filter(|e| e.replacements > 0).count()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&EntryOutcome> {
        self.entries.iter().find(|e| e.path == path)
    }
}
