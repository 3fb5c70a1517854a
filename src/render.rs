//! Two-pass template rendering.
//!
//! Templates can reference facts about their own rendered output (section
//! structure, vocabulary usage) that are only known after a first render,
//! so every document is rendered twice: pass 1 builds derived metadata,
//! pass 2 produces the deliverable text with that metadata injected as
//! ordinary context data. Post-render extensions then transform the pass-2
//! text in a configured order.

/// Per-document render context assembly.
pub mod context;
pub use context::DataError;

/// Post-render text transforms.
pub mod extensions;
pub use extensions::{Extension, Transformed};

/// Derived metadata from the first render pass.
pub mod first_pass;
pub use first_pass::{FirstPassOutput, Vocabulary};

/// YAML front matter shared by every document template.
pub mod front_matter;
pub use front_matter::FrontMatter;

mod pipeline;
pub use pipeline::{RenderError, RenderedDocument, Renderer, SetupError};
