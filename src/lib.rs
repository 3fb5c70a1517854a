//! Plain-text Regulatory Documentation
//!
//! Documents are markdown templates rendered against structured YAML data,
//! then audited for coverage against includable requirement checklists.

/// Checklist compilation and gap analysis.
pub mod audit;
pub use audit::{ChecklistItem, CompiledChecklist, DocumentCorpus, GapReport};

mod config;
pub use config::Config;

/// Two-pass template rendering and post-render text transforms.
pub mod render;
pub use render::{RenderError, Renderer};
