//! Post-render text transforms.
//!
//! Each extension implements one shared contract and is applied in an
//! explicitly configured order; text and metadata pass between stages as
//! plain values, never through shared state. The default post-render order
//! strips audit notes before numbering sections, so numbers are assigned to
//! the text the reader actually sees.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::first_pass::Vocabulary;
use crate::Config;

/// The default post-render pipeline, in application order.
pub const DEFAULT_PIPELINE: &[&str] = &["audit_notes", "section_numbers"];

/// A post-render text transform.
pub trait Extension: std::fmt::Debug + Send + Sync {
    /// The configuration name of the extension.
    fn name(&self) -> &'static str;

    /// Transforms rendered text, optionally producing side-channel metadata.
    fn transform(&self, text: &str) -> Transformed;
}

/// The output of a single extension stage.
#[derive(Debug)]
pub struct Transformed {
    /// The transformed text.
    pub text: String,
    /// Vocabulary metadata, produced by the indexing extension.
    pub vocabulary: Option<Vocabulary>,
}

impl Transformed {
    fn text_only(text: String) -> Self {
        Self {
            text,
            vocabulary: None,
        }
    }
}

/// A configured extension name that does not exist.
#[derive(Debug, Error)]
#[error("unknown extension '{0}' (expected one of: audit_notes, section_numbers)")]
pub struct UnknownExtension(pub String);

/// Builds the post-render pipeline from configured extension names.
///
/// The vocabulary indexer is not a valid pipeline member here: it runs over
/// pass-1 output inside the renderer and must not re-transform pass-2 text.
///
/// # Errors
///
/// Returns [`UnknownExtension`] for any unrecognized name.
pub fn pipeline(
    names: &[String],
    config: &Config,
) -> Result<Vec<Box<dyn Extension>>, UnknownExtension> {
    names
        .iter()
        .map(|name| -> Result<Box<dyn Extension>, UnknownExtension> {
            match name.as_str() {
                "audit_notes" => Ok(Box::new(AuditNoteStripper {
                    keep_notes: config.auditor_notes,
                })),
                "section_numbers" => Ok(Box::new(SectionNumberer)),
                other => Err(UnknownExtension(other.to_string())),
            }
        })
        .collect()
}

// Only same-line whitespace precedes a note; consuming a newline would
// merge the note's line into the one above it.
static AUDIT_NOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\[\[[^\[\]]*\]\]").expect("a valid pattern"));

/// Removes inline audit annotations (`[[62304:6.2.4]]`) from official
/// output.
///
/// The annotation and any immediately preceding whitespace are removed so
/// the surrounding sentence reads naturally. In auditor mode the transform
/// is the identity and the annotations stay verbatim.
#[derive(Debug, Clone, Copy)]
pub struct AuditNoteStripper {
    /// `true` keeps annotations in place (the auditor document variant).
    pub keep_notes: bool,
}

impl Extension for AuditNoteStripper {
    fn name(&self) -> &'static str {
        "audit_notes"
    }

    fn transform(&self, text: &str) -> Transformed {
        if self.keep_notes {
            Transformed::text_only(text.to_string())
        } else {
            Transformed::text_only(AUDIT_NOTE.replace_all(text, "").into_owned())
        }
    }
}

/// Prefixes markdown headings with hierarchical section numbers.
///
/// A single `#` heading is the document title and stays unnumbered; `##` is
/// the first numbered level. Numbers are positional and recomputed from
/// scratch each render; any manual numbering in the heading text is not
/// honored. Nesting deeper than two levels continues the same counting
/// scheme.
#[derive(Debug, Clone, Copy)]
pub struct SectionNumberer;

impl Extension for SectionNumberer {
    fn name(&self) -> &'static str {
        "section_numbers"
    }

    fn transform(&self, text: &str) -> Transformed {
        let mut counters: Vec<usize> = Vec::new();
        let mut in_fence = false;
        let mut out = Vec::with_capacity(text.lines().count());

        for line in text.lines() {
            // Heading markers inside fenced code blocks are not headings.
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                out.push(line.to_string());
                continue;
            }

            match heading_level(line) {
                Some(level) if !in_fence && level >= 2 => {
                    let depth = level - 1;
                    counters.truncate(depth);
                    while counters.len() < depth {
                        counters.push(0);
                    }
                    counters[depth - 1] += 1;

                    let number = counters
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(".");
                    let (hashes, title) = line.split_at(level);
                    out.push(format!("{hashes} {number} {}", title.trim_start()));
                }
                _ => out.push(line.to_string()),
            }
        }

        let mut numbered = out.join("\n");
        if text.ends_with('\n') {
            numbered.push('\n');
        }
        Transformed::text_only(numbered)
    }
}

fn heading_level(line: &str) -> Option<usize> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    // A heading needs at least one marker followed by whitespace.
    if level > 0 && line[level..].starts_with(' ') {
        Some(level)
    } else {
        None
    }
}

/// Indexes the distinct words of its input.
///
/// The transform is the identity; the vocabulary rides along as metadata.
/// The renderer runs this over pass-1 output so that pass 2 can query word
/// membership.
#[derive(Debug, Clone, Copy)]
pub struct VocabularyIndexer;

impl Extension for VocabularyIndexer {
    fn name(&self) -> &'static str {
        "vocabulary"
    }

    fn transform(&self, text: &str) -> Transformed {
        Transformed {
            text: text.to_string(),
            vocabulary: Some(Vocabulary::from_text(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(text: &str) -> String {
        AuditNoteStripper { keep_notes: false }.transform(text).text
    }

    #[test]
    fn strips_note_and_preceding_whitespace() {
        assert_eq!(strip("Some spec [[62304:6.2.4]]."), "Some spec.");
    }

    #[test]
    fn strips_multiple_notes_per_line() {
        assert_eq!(
            strip("One [[A:1]] and two [[B:2]] notes."),
            "One and two notes."
        );
    }

    #[test]
    fn note_at_line_start_keeps_the_line_break() {
        assert_eq!(
            strip("## Heading\n[[62304:4.1]] Body text.\n"),
            "## Heading\n Body text.\n"
        );
    }

    #[test]
    fn auditor_mode_keeps_notes_verbatim() {
        let stripper = AuditNoteStripper { keep_notes: true };
        let text = "Some spec [[62304:6.2.4]].";
        assert_eq!(stripper.transform(text).text, text);
    }

    #[test]
    fn numbers_two_levels_and_resets_per_parent() {
        let input = "## Topic A\n\n### Sub\n\n## Topic B\n";
        let output = SectionNumberer.transform(input).text;
        assert_eq!(output, "## 1 Topic A\n\n### 1.1 Sub\n\n## 2 Topic B\n");
    }

    #[test]
    fn document_title_heading_is_not_numbered() {
        let input = "# Device Description\n\n## Overview\n";
        let output = SectionNumberer.transform(input).text;
        assert_eq!(output, "# Device Description\n\n## 1 Overview\n");
    }

    #[test]
    fn deeper_nesting_continues_the_scheme() {
        let input = "## A\n### B\n#### C\n#### D\n### E\n";
        let output = SectionNumberer.transform(input).text;
        assert_eq!(output, "## 1 A\n### 1.1 B\n#### 1.1.1 C\n#### 1.1.2 D\n### 1.2 E\n");
    }

    #[test]
    fn skipped_levels_are_zero_filled() {
        let input = "## A\n#### Deep\n";
        let output = SectionNumberer.transform(input).text;
        assert_eq!(output, "## 1 A\n#### 1.0.1 Deep\n");
    }

    #[test]
    fn fenced_code_blocks_are_not_numbered() {
        let input = "## Real\n```\n## not a heading\n```\n## Also real\n";
        let output = SectionNumberer.transform(input).text;
        assert_eq!(
            output,
            "## 1 Real\n```\n## not a heading\n```\n## 2 Also real\n"
        );
    }

    #[test]
    fn numbering_is_recomputed_each_run() {
        let input = "## A\n## B\n";
        let once = SectionNumberer.transform(input).text;
        let twice = SectionNumberer.transform(input).text;
        assert_eq!(once, twice);
    }

    #[test]
    fn vocabulary_indexer_is_identity_with_metadata() {
        let transformed = VocabularyIndexer.transform("alpha beta alpha");
        assert_eq!(transformed.text, "alpha beta alpha");
        let vocabulary = transformed.vocabulary.unwrap();
        assert_eq!(vocabulary.len(), 2);
    }

    #[test]
    fn pipeline_builds_in_configured_order() {
        let config = Config::default();
        let names = vec!["section_numbers".to_string(), "audit_notes".to_string()];
        let pipeline = pipeline(&names, &config).unwrap();
        let built: Vec<&str> = pipeline.iter().map(|e| e.name()).collect();
        assert_eq!(built, ["section_numbers", "audit_notes"]);
    }

    #[test]
    fn pipeline_rejects_unknown_names() {
        let config = Config::default();
        let names = vec!["vocabulary".to_string()];
        let error = pipeline(&names, &config).unwrap_err();
        assert_eq!(error.0, "vocabulary");
    }
}
