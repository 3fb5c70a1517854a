//! Derived metadata from the first render pass.
//!
//! [`FirstPassOutput`] is built once pass 1 completes and injected into the
//! pass-2 context as an ordinary value. Templates query it as
//! `first_pass_output.has('word')`, `first_pass_output.words`, and so on.

use std::{
    collections::BTreeSet,
    sync::{Arc, LazyLock},
};

use minijinja::{
    value::{Enumerator, Object, Value},
    Error, ErrorKind, State,
};
use regex::Regex;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("a valid pattern"));

/// The distinct words of a rendered text.
///
/// Holds a case-sensitive word set and a case-folded derived view, so
/// templates can choose either membership semantics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    exact: BTreeSet<String>,
    folded: BTreeSet<String>,
}

impl Vocabulary {
    /// Tokenizes text into its vocabulary.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut exact = BTreeSet::new();
        let mut folded = BTreeSet::new();
        for word in WORD.find_iter(text) {
            folded.insert(word.as_str().to_lowercase());
            exact.insert(word.as_str().to_string());
        }
        Self { exact, folded }
    }

    /// Case-sensitive membership.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.exact.contains(word)
    }

    /// Case-insensitive membership.
    #[must_use]
    pub fn contains_fold(&self, word: &str) -> bool {
        self.folded.contains(&word.to_lowercase())
    }

    /// The case-sensitive words, in sorted order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.exact.iter().map(String::as_str)
    }

    /// The number of distinct case-sensitive words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    /// Whether the vocabulary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

/// The first-pass render result exposed to pass-2 templates.
///
/// During pass 1 the context holds an empty value of this type, so
/// vocabulary queries resolve (to `false`) without populating any content;
/// they only resolve meaningfully during pass 2.
#[derive(Debug, Default)]
pub struct FirstPassOutput {
    source: String,
    lines: Vec<String>,
    vocabulary: Vocabulary,
}

impl FirstPassOutput {
    /// Builds the metadata value from the pass-1 rendered text.
    #[must_use]
    pub fn new(source: String, vocabulary: Vocabulary) -> Self {
        let lines = source.lines().map(str::to_string).collect();
        Self {
            source,
            lines,
            vocabulary,
        }
    }

    /// The empty value injected during pass 1.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The full pass-1 rendered text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The pass-1 text split into lines.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The vocabulary of the pass-1 text.
    #[must_use]
    pub const fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

impl Object for FirstPassOutput {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        match key.as_str()? {
            "source" => Some(Value::from(self.source.clone())),
            "lines" => Some(Value::from(self.lines.clone())),
            "words" => Some(Value::from(
                self.vocabulary.words().map(str::to_string).collect::<Vec<_>>(),
            )),
            _ => None,
        }
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(&["source", "lines", "words"])
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match method {
            "has" => {
                let (word,): (&str,) = minijinja::value::from_args(args)?;
                Ok(Value::from(self.vocabulary.contains(word)))
            }
            "has_insensitive" => {
                let (word,): (&str,) = minijinja::value::from_args(args)?;
                Ok(Value::from(self.vocabulary.contains_fold(word)))
            }
            _ => Err(Error::new(
                ErrorKind::UnknownMethod,
                format!("first_pass_output has no method '{method}'"),
            )),
        }
    }
}
