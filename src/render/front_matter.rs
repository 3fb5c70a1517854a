//! YAML front matter parsing.
//!
//! Every document template begins with a `---`-delimited YAML block
//! carrying at minimum a document identifier and title. The block is
//! consumed by the rendering context and, downstream, by the document
//! converter for title pages and page headers.

use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// The parsed metadata block of a document template.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    /// Required document identifier, e.g. `SDP-001`.
    pub id: String,
    /// Required document title.
    pub title: String,
    /// Optional revision number, normalized to a string.
    pub revision: Option<String>,
    /// Any further keys, preserved verbatim for the rendering context.
    extra: Mapping,
}

/// Errors that can occur when extracting front matter from a template.
#[derive(Debug, Error)]
pub enum FrontMatterError {
    /// The template does not begin with a `---` delimiter.
    #[error("document does not start with a '---' front matter block")]
    Missing,

    /// The opening `---` delimiter is never closed.
    #[error("front matter block is not terminated by '---'")]
    Unterminated,

    /// The block is not valid YAML, or not a mapping.
    #[error("invalid YAML in front matter")]
    Yaml(#[from] serde_yaml::Error),

    /// A required key is absent or has the wrong type.
    #[error("front matter is missing required field '{0}'")]
    MissingField(&'static str),
}

impl FrontMatter {
    /// Splits a template into front matter and body.
    ///
    /// # Errors
    ///
    /// Returns a [`FrontMatterError`] if the block is absent, unterminated,
    /// not valid YAML, or missing `id` or `title`.
    pub fn extract(text: &str) -> Result<(Self, &str), FrontMatterError> {
        let rest = text.strip_prefix("---\n").ok_or(FrontMatterError::Missing)?;
        let (block, body) = rest
            .split_once("---\n")
            .ok_or(FrontMatterError::Unterminated)?;

        let mut mapping: Mapping = serde_yaml::from_str(block)?;

        let id = take_string(&mut mapping, "id")?.ok_or(FrontMatterError::MissingField("id"))?;
        let title =
            take_string(&mut mapping, "title")?.ok_or(FrontMatterError::MissingField("title"))?;
        let revision = take_string(&mut mapping, "revision")?;

        Ok((
            Self {
                id,
                title,
                revision,
                extra: mapping,
            },
            body,
        ))
    }

    /// The full front matter as a YAML mapping, with the required fields
    /// re-inserted, suitable for injection into a rendering context.
    #[must_use]
    pub fn as_mapping(&self) -> Mapping {
        let mut mapping = Mapping::new();
        mapping.insert(Value::from("id"), Value::from(self.id.clone()));
        mapping.insert(Value::from("title"), Value::from(self.title.clone()));
        if let Some(revision) = &self.revision {
            mapping.insert(Value::from("revision"), Value::from(revision.clone()));
        }
        for (key, value) in &self.extra {
            mapping.insert(key.clone(), value.clone());
        }
        mapping
    }
}

/// Removes a key from the mapping, rendering scalars to strings.
///
/// Revisions in particular are commonly written as bare numbers in YAML.
fn take_string(
    mapping: &mut Mapping,
    key: &'static str,
) -> Result<Option<String>, FrontMatterError> {
    match mapping.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(FrontMatterError::MissingField(key)),
    }
}
