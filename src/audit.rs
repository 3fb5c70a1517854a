//! Checklist compilation and gap analysis.
//!
//! A checklist is a line-oriented list of audit requirement identifiers
//! which may `include` other checklists. Compilation flattens the include
//! graph into a single deduplicated, ordered requirement set; gap analysis
//! verifies those identifiers appear in a rendered document corpus.

/// Checklist definitions, the built-in registry, and compilation.
pub mod checklist;
pub use checklist::{builtin_names, compile, ChecklistItem, CompileError, CompiledChecklist};

/// Gap analysis of a compiled checklist against a document corpus.
pub mod gap;
pub use gap::{analyze, CorpusError, DocumentCorpus, GapReport};
