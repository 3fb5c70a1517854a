//! The two-pass document renderer.
//!
//! Pass 1 renders the template against a context with empty first-pass
//! metadata. The pass-1 text is then decomposed into lines and indexed for
//! vocabulary, and pass 2 re-renders the same template with that metadata
//! injected. Finally the configured extension pipeline transforms the
//! pass-2 text into the release artifact.

use std::{
    io,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use minijinja::{Environment, UndefinedBehavior};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument};

use super::{
    context::{self, DataError, DataFiles},
    extensions::{self, Extension, UnknownExtension, VocabularyIndexer},
    first_pass::FirstPassOutput,
    front_matter::{FrontMatter, FrontMatterError},
};
use crate::Config;

/// Errors constructing a [`Renderer`].
#[derive(Debug, Error)]
pub enum SetupError {
    /// A data file could not be loaded.
    #[error(transparent)]
    Data(#[from] DataError),

    /// The configuration names an extension that does not exist.
    #[error(transparent)]
    UnknownExtension(#[from] UnknownExtension),
}

/// Errors that abort rendering of a single document.
///
/// A failure carries the offending document path and does not abort the
/// rest of a multi-document batch.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The document could not be read.
    #[error("failed to read document '{}'", path.display())]
    Io {
        /// The document path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The document's front matter is absent or invalid.
    #[error("invalid front matter in '{}'", path.display())]
    FrontMatter {
        /// The document path.
        path: PathBuf,
        /// The underlying front matter error.
        #[source]
        source: FrontMatterError,
    },

    /// The template engine reported a syntax error or an undefined variable.
    #[error("failed to render '{}'", path.display())]
    Template {
        /// The document path.
        path: PathBuf,
        /// The underlying template error.
        #[source]
        source: Box<minijinja::Error>,
    },
}

/// A fully rendered document.
#[derive(Debug)]
pub struct RenderedDocument {
    /// The path of the source template.
    pub path: PathBuf,
    /// The document's front matter.
    pub front_matter: FrontMatter,
    /// The final text after both passes and all extensions.
    pub text: String,
    /// Image references violating the converter contract (non-relative or
    /// containing spaces).
    pub image_warnings: Vec<String>,
}

/// The two-pass template renderer.
///
/// Holds the per-invocation read-only inputs (configuration, data files,
/// extension pipeline). Rendering borrows them immutably, so documents can
/// be processed in parallel.
pub struct Renderer {
    config: Config,
    data: DataFiles,
    pipeline: Vec<Box<dyn Extension>>,
}

impl Renderer {
    /// Creates a renderer from the project configuration.
    ///
    /// Loads the data directory once and builds the extension pipeline from
    /// the configured names.
    ///
    /// # Errors
    ///
    /// Returns an error if a data file cannot be loaded or an extension
    /// name is unknown.
    pub fn new(config: Config) -> Result<Self, SetupError> {
        let data = DataFiles::load(&config.data_dir)?;
        let pipeline = extensions::pipeline(&config.extensions, &config)?;
        Ok(Self {
            config,
            data,
            pipeline,
        })
    }

    /// Creates a renderer with pre-loaded data, for rendering in isolation.
    ///
    /// # Errors
    ///
    /// Returns an error if an extension name in the configuration is
    /// unknown.
    pub fn with_data(config: Config, data: DataFiles) -> Result<Self, SetupError> {
        let pipeline = extensions::pipeline(&config.extensions, &config)?;
        Ok(Self {
            config,
            data,
            pipeline,
        })
    }

    /// The renderer's configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Renders a document template file to its final text.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] carrying the document path.
    #[instrument(skip(self))]
    pub fn render_file(&self, path: &Path) -> Result<RenderedDocument, RenderError> {
        let text = std::fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.render_text(path, &text)
    }

    /// Renders a document template supplied as text.
    ///
    /// `path` is used for error attribution only.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] carrying the document path.
    pub fn render_text(&self, path: &Path, text: &str) -> Result<RenderedDocument, RenderError> {
        let (front_matter, body) =
            FrontMatter::extract(text).map_err(|source| RenderError::FrontMatter {
                path: path.to_path_buf(),
                source,
            })?;

        // Pass 1: render with empty first-pass metadata so vocabulary
        // queries resolve without contributing content.
        let pass1 = self.render_pass(path, body, &front_matter, FirstPassOutput::empty())?;

        // Derive the metadata: line decomposition plus the vocabulary of
        // the pass-1 text.
        let indexed = VocabularyIndexer.transform(&pass1);
        let vocabulary = indexed.vocabulary.unwrap_or_default();
        let first_pass_output = FirstPassOutput::new(indexed.text, vocabulary);
        debug!(
            document = %path.display(),
            words = first_pass_output.vocabulary().len(),
            "first pass complete"
        );

        // Pass 2: the only pass visible in the deliverable output.
        let pass2 = self.render_pass(path, body, &front_matter, first_pass_output)?;

        // The post-render pipeline runs in its configured order; the
        // vocabulary indexer already ran over pass 1 and is not re-applied.
        let mut text = pass2;
        for extension in &self.pipeline {
            text = extension.transform(&text).text;
        }

        let image_warnings = check_image_references(&text);

        Ok(RenderedDocument {
            path: path.to_path_buf(),
            front_matter,
            text,
            image_warnings,
        })
    }

    fn render_pass(
        &self,
        path: &Path,
        body: &str,
        front_matter: &FrontMatter,
        first_pass_output: FirstPassOutput,
    ) -> Result<String, RenderError> {
        let ctx = context::build(&self.data, front_matter, &self.config, first_pass_output);

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        // The body's final newline is part of the document, not template
        // syntax trivia.
        env.set_keep_trailing_newline(true);
        env.render_str(body, ctx).map_err(|source| RenderError::Template {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }
}

static IMAGE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\(([^)]+)\)").expect("a valid pattern"));

/// Finds image references the document converter cannot consume.
///
/// The converter requires image paths to be relative and free of spaces.
fn check_image_references(text: &str) -> Vec<String> {
    IMAGE_REF
        .captures_iter(text)
        .map(|captures| captures[1].to_string())
        .filter(|target| {
            target.contains(' ')
                || target.starts_with('/')
                || target.contains("://")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(config: Config) -> Renderer {
        Renderer::with_data(config, DataFiles::default()).unwrap()
    }

    fn render(body: &str) -> RenderedDocument {
        let text = format!("---\nid: T-1\ntitle: Test\n---\n{body}");
        renderer(Config::default())
            .render_text(Path::new("test.md"), &text)
            .unwrap()
    }

    #[test]
    fn renders_plain_document() {
        let document = render("Nothing dynamic here.\n");
        assert_eq!(document.text, "Nothing dynamic here.\n");
        assert_eq!(document.front_matter.id, "T-1");
    }

    #[test]
    fn trailing_newline_survives_both_passes() {
        let document = render("{% if true %}kept{% endif %}\n");
        assert_eq!(document.text, "kept\n");
    }

    #[test]
    fn second_pass_sees_first_pass_vocabulary() {
        let body = "{% if first_pass_output.has('foobot') %}Glossary: foobot defined.{% endif %}\nThe foobot protocol.\n";
        let document = render(body);
        assert!(document.text.contains("Glossary: foobot defined."));
    }

    #[test]
    fn conditional_branch_excluded_without_the_word() {
        let body = "{% if first_pass_output.has('foobot') %}Glossary: foobot defined.{% endif %}\nNo such word here.\n";
        let document = render(body);
        assert!(!document.text.contains("Glossary"));
    }

    #[test]
    fn words_inside_conditionals_do_not_self_trigger() {
        // The word only occurs inside the conditional, so pass 1 renders
        // without it and the branch stays excluded.
        let body = "{% if first_pass_output.has('selfref') %}selfref{% endif %}\nbody text\n";
        let document = render(body);
        assert_eq!(document.text, "\nbody text\n");
    }

    #[test]
    fn undefined_variable_is_a_template_error() {
        let text = "---\nid: T-1\ntitle: Test\n---\n{{ nonsense_variable }}\n";
        let error = renderer(Config::default())
            .render_text(Path::new("doc.md"), text)
            .unwrap_err();
        assert!(matches!(error, RenderError::Template { path, .. } if path == Path::new("doc.md")));
    }

    #[test]
    fn template_syntax_error_names_the_document() {
        let text = "---\nid: T-1\ntitle: Test\n---\n{% if unclosed\n";
        let error = renderer(Config::default())
            .render_text(Path::new("broken.md"), text)
            .unwrap_err();
        assert!(
            matches!(error, RenderError::Template { path, .. } if path == Path::new("broken.md"))
        );
    }

    #[test]
    fn missing_front_matter_names_the_document() {
        let error = renderer(Config::default())
            .render_text(Path::new("bare.md"), "no front matter\n")
            .unwrap_err();
        assert!(matches!(error, RenderError::FrontMatter { path, .. } if path == Path::new("bare.md")));
    }

    #[test]
    fn extensions_apply_after_second_pass() {
        let body = "## Introduction [[62304:5.1.1]]\n\nSome spec [[62304:6.2.4]].\n";
        let document = render(body);
        assert_eq!(
            document.text,
            "## 1 Introduction\n\nSome spec.\n"
        );
    }

    #[test]
    fn auditor_config_keeps_notes() {
        let config = Config {
            auditor_notes: true,
            ..Config::default()
        };
        let text = "---\nid: T-1\ntitle: Test\n---\nSome spec [[62304:6.2.4]].\n";
        let document = renderer(config)
            .render_text(Path::new("test.md"), text)
            .unwrap();
        assert_eq!(document.text, "Some spec [[62304:6.2.4]].\n");
    }

    #[test]
    fn image_reference_contract_violations_are_reported() {
        let body = "![ok](images/arch.png)\n![bad](/abs/path.png)\n![spacey](images/my file.png)\n";
        let document = render(body);
        assert_eq!(
            document.image_warnings,
            ["/abs/path.png", "images/my file.png"]
        );
    }
}
