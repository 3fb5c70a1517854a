//! Gap analysis: verifying checklist coverage in a document corpus.
//!
//! The corpus is treated as opaque searchable text, not parsed as markdown.
//! A checklist item is "present" when its identifier occurs as a literal,
//! case-sensitive substring in any corpus document.

use std::{
    io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use thiserror::Error;
use walkdir::WalkDir;

use super::checklist::{ChecklistItem, CompiledChecklist};

/// An in-memory set of documents supplied to gap analysis.
#[derive(Debug, Default)]
pub struct DocumentCorpus {
    documents: Vec<(PathBuf, String)>,
}

/// Errors that can occur while loading a document corpus.
#[derive(Debug, Error)]
#[error("failed to read document '{}'", path.display())]
pub struct CorpusError {
    /// The path that could not be read.
    pub path: PathBuf,
    /// The underlying I/O error.
    #[source]
    source: io::Error,
}

impl DocumentCorpus {
    /// Loads a corpus from the given paths.
    ///
    /// Files are read verbatim; directories are walked for `*.md` files. The
    /// corpus order follows the input path order, with files within a
    /// directory sorted by path for determinism.
    ///
    /// # Errors
    ///
    /// Returns a [`CorpusError`] if any file cannot be read.
    pub fn load(paths: &[PathBuf]) -> Result<Self, CorpusError> {
        let mut corpus = Self::default();

        for path in paths {
            if path.is_dir() {
                for file in collect_markdown_paths(path) {
                    corpus.read_document(&file)?;
                }
            } else {
                corpus.read_document(path)?;
            }
        }

        Ok(corpus)
    }

    /// Adds a document to the corpus.
    pub fn push(&mut self, path: PathBuf, text: String) {
        self.documents.push((path, text));
    }

    /// The number of documents in the corpus.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus contains no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn read_document(&mut self, path: &Path) -> Result<(), CorpusError> {
        let text = std::fs::read_to_string(path).map_err(|source| CorpusError {
            path: path.to_path_buf(),
            source,
        })?;
        self.push(path.to_path_buf(), text);
        Ok(())
    }

    fn contains(&self, needle: &str) -> bool {
        self.documents.iter().any(|(_, text)| text.contains(needle))
    }
}

fn collect_markdown_paths(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "md")
        })
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();
    paths
}

/// The outcome of checking a compiled checklist against a corpus.
///
/// Every compiled item is classified exactly once; both sequences preserve
/// the compiled checklist's ordering.
#[derive(Debug, Serialize)]
pub struct GapReport {
    /// Items whose identifiers do not occur anywhere in the corpus.
    pub missing: Vec<ChecklistItem>,
    /// Items whose identifiers occur in at least one corpus document.
    pub present: Vec<ChecklistItem>,
}

impl GapReport {
    /// Whether every checklist item was found in the corpus.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Checks each compiled checklist item for presence in the corpus.
///
/// Presence is independent per item. The match is a literal substring
/// search with no word-boundary requirement, mirroring the literal
/// identifier format of the checklist files.
#[must_use]
pub fn analyze(checklist: &CompiledChecklist, corpus: &DocumentCorpus) -> GapReport {
    let mut missing = Vec::new();
    let mut present = Vec::new();

    for item in checklist.items() {
        if corpus.contains(&item.identifier) {
            present.push(item.clone());
        } else {
            missing.push(item.clone());
        }
    }

    GapReport { missing, present }
}
