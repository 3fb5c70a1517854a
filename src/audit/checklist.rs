//! Checklist definitions and compilation.
//!
//! A checklist definition is UTF-8 text, one entry per line:
//!
//! - lines starting with `#` are comments,
//! - `include <name>` splices another checklist in place,
//! - any other non-blank line is an item: an identifier token followed by a
//!   free-text description.
//!
//! Includes form a directed graph over definitions. Compilation validates
//! the graph is acyclic, then flattens it depth-first into an ordered,
//! deduplicated list of [`ChecklistItem`]s. The first occurrence of an
//! identifier wins; later duplicates are dropped, not errored.

use std::{
    collections::{HashMap, HashSet},
    fmt, fs, io,
    path::{Path, PathBuf},
};

use petgraph::{algo::tarjan_scc, graphmap::DiGraphMap};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Built-in checklists bundled with the binary, keyed by name.
const BUILTINS: &[(&str, &str)] = &[
    ("62304", include_str!("checklists/62304.txt")),
    ("62304_base", include_str!("checklists/62304_base.txt")),
    ("62366", include_str!("checklists/62366.txt")),
];

/// Returns the names of all built-in checklists, in alphabetical order.
#[must_use]
pub fn builtin_names() -> Vec<&'static str> {
    BUILTINS.iter().map(|(name, _)| *name).collect()
}

/// Where a checklist definition was loaded from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    /// A checklist bundled with the binary, referenced by name.
    Builtin(String),
    /// A checklist loaded from the filesystem.
    File(PathBuf),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(name) => write!(f, "{name}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Serialize for Source {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// A single audit requirement within a compiled checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    /// Opaque requirement identifier, e.g. `62304:5.6.5`.
    pub identifier: String,
    /// Free-text description of the requirement.
    pub description: String,
    /// The checklist the item was first seen in, for traceability.
    pub source: Source,
}

/// A flattened, deduplicated, ordered checklist.
///
/// Produced by [`compile`]; the item order is deterministic and drives
/// audit-report ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledChecklist {
    name: String,
    items: Vec<ChecklistItem>,
}

impl CompiledChecklist {
    /// The name or path the checklist was compiled from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compiled items, in expansion order.
    #[must_use]
    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    /// The number of compiled items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the compiled checklist contains no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Errors that can occur when compiling a checklist.
#[derive(Debug, Error)]
pub enum CompileError {
    /// A named built-in checklist could not be resolved.
    #[error("unknown checklist '{0}'")]
    UnknownChecklist(String),

    /// The include graph contains a cycle.
    #[error("circular include involving: {}", .cycle.join(", "))]
    CircularInclude {
        /// The definitions participating in the cycle, sorted.
        cycle: Vec<String>,
    },

    /// A non-comment, non-include line could not be split into an identifier
    /// and a description.
    #[error("malformed checklist line {line} in '{definition}': '{content}'")]
    MalformedLine {
        /// The definition containing the line.
        definition: Source,
        /// One-based line number within the definition.
        line: usize,
        /// The offending line content.
        content: String,
    },

    /// A checklist file could not be read.
    #[error("failed to read checklist '{}'", path.display())]
    Io {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// A parsed checklist line that contributes to compilation.
#[derive(Debug, Clone)]
enum Line {
    /// Splice another definition in at this position.
    Include(Source),
    /// Emit an item at this position.
    Item {
        identifier: String,
        description: String,
    },
}

#[derive(Debug, Clone)]
struct Definition {
    lines: Vec<Line>,
}

/// Compiles a checklist by name or filesystem path.
///
/// Arguments containing a path separator or a file extension are resolved
/// against the filesystem; anything else is looked up in the built-in
/// registry. Compilation is pure given the set of reachable definitions:
/// compiling the same checklist twice yields identical output.
///
/// # Errors
///
/// Returns [`CompileError::UnknownChecklist`] if a built-in name cannot be
/// resolved, [`CompileError::CircularInclude`] if the include graph is
/// cyclic, [`CompileError::MalformedLine`] for an unparsable item line, and
/// [`CompileError::Io`] if a checklist file cannot be read.
#[instrument]
pub fn compile(name_or_path: &str) -> Result<CompiledChecklist, CompileError> {
    let (root, definitions) = load_reachable(name_or_path)?;

    if let Some(cycle) = find_cycle(&definitions) {
        return Err(CompileError::CircularInclude {
            cycle: cycle.iter().map(ToString::to_string).collect(),
        });
    }

    let mut items = Vec::new();
    let mut seen = HashSet::new();
    expand(&root, &definitions, &mut seen, &mut items);

    debug!(
        checklist = name_or_path,
        items = items.len(),
        definitions = definitions.len(),
        "compiled checklist"
    );

    Ok(CompiledChecklist {
        name: name_or_path.to_string(),
        items,
    })
}

/// Resolves a checklist reference to its source and raw text.
///
/// `relative_to` is the directory of the including file, if any; file
/// references inside a checklist file resolve against it.
fn resolve(name: &str, relative_to: Option<&Path>) -> Result<(Source, String), CompileError> {
    if looks_like_path(name) {
        let path = relative_to.map_or_else(|| PathBuf::from(name), |dir| dir.join(name));
        // Aliased spellings of one file ('a/../a/x.txt' vs 'a/x.txt') must
        // compare equal, or the include graph gains phantom nodes and a
        // cycle through them is never detected.
        let path = fs::canonicalize(&path).map_err(|source| CompileError::Io {
            path: path.clone(),
            source,
        })?;
        let text = fs::read_to_string(&path).map_err(|source| CompileError::Io {
            path: path.clone(),
            source,
        })?;
        Ok((Source::File(path), text))
    } else {
        BUILTINS
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(builtin, text)| (Source::Builtin((*builtin).to_string()), (*text).to_string()))
            .ok_or_else(|| CompileError::UnknownChecklist(name.to_string()))
    }
}

fn looks_like_path(name: &str) -> bool {
    name.contains('/')
        || name.contains(std::path::MAIN_SEPARATOR)
        || Path::new(name).extension().is_some()
}

/// Parses one definition, resolving include targets as they are found so
/// that the expansion phase needs no further filesystem access.
fn parse_definition(source: &Source, text: &str) -> Result<Definition, CompileError> {
    let relative_to = match source {
        Source::File(path) => path.parent(),
        Source::Builtin(_) => None,
    };

    let mut lines = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(target) = line.strip_prefix("include ") {
            let (included, _) = resolve(target.trim(), relative_to)?;
            lines.push(Line::Include(included));
        } else if let Some((identifier, description)) = line.split_once(char::is_whitespace) {
            let description = description.trim();
            if description.is_empty() {
                return Err(CompileError::MalformedLine {
                    definition: source.clone(),
                    line: idx + 1,
                    content: line.to_string(),
                });
            }
            lines.push(Line::Item {
                identifier: identifier.to_string(),
                description: description.to_string(),
            });
        } else {
            return Err(CompileError::MalformedLine {
                definition: source.clone(),
                line: idx + 1,
                content: line.to_string(),
            });
        }
    }

    Ok(Definition { lines })
}

/// Loads the root definition and everything reachable from it through
/// includes.
fn load_reachable(
    root: &str,
) -> Result<(Source, HashMap<Source, Definition>), CompileError> {
    let (root_source, root_text) = resolve(root, None)?;

    let mut definitions: HashMap<Source, Definition> = HashMap::new();
    let mut pending = vec![(root_source.clone(), root_text)];

    while let Some((source, text)) = pending.pop() {
        if definitions.contains_key(&source) {
            continue;
        }

        let definition = parse_definition(&source, &text)?;

        for line in &definition.lines {
            if let Line::Include(target) = line {
                if !definitions.contains_key(target) {
                    let (_, text) = match target {
                        Source::Builtin(name) => resolve(name, None)?,
                        Source::File(path) => {
                            let text =
                                fs::read_to_string(path).map_err(|source| CompileError::Io {
                                    path: path.clone(),
                                    source,
                                })?;
                            (target.clone(), text)
                        }
                    };
                    pending.push((target.clone(), text));
                }
            }
        }

        definitions.insert(source, definition);
    }

    Ok((root_source, definitions))
}

/// Returns the members of one include cycle, if the graph has any.
///
/// Strongly connected components with more than one node are cycles; a
/// single-node component is a cycle only if the definition includes itself.
fn find_cycle(definitions: &HashMap<Source, Definition>) -> Option<Vec<&Source>> {
    let mut keys: Vec<&Source> = definitions.keys().collect();
    keys.sort();
    let index: HashMap<&Source, usize> = keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();

    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for i in 0..keys.len() {
        graph.add_node(i);
    }
    for (source, definition) in definitions {
        for line in &definition.lines {
            if let Line::Include(target) = line {
                graph.add_edge(index[source], index[target], ());
            }
        }
    }

    for component in tarjan_scc(&graph) {
        if component.len() > 1 {
            let mut members: Vec<&Source> = component.iter().map(|&i| keys[i]).collect();
            members.sort();
            return Some(members);
        }

        let &node = component.first()?;
        if graph.contains_edge(node, node) {
            return Some(vec![keys[node]]);
        }
    }

    None
}

/// Depth-first, pre-order expansion: includes are spliced in place before
/// any following lines of the including definition are processed.
fn expand(
    source: &Source,
    definitions: &HashMap<Source, Definition>,
    seen: &mut HashSet<String>,
    items: &mut Vec<ChecklistItem>,
) {
    for line in &definitions[source].lines {
        match line {
            Line::Include(target) => expand(target, definitions, seen, items),
            Line::Item {
                identifier,
                description,
            } => {
                // First occurrence wins; later duplicates are dropped.
                if seen.insert(identifier.clone()) {
                    items.push(ChecklistItem {
                        identifier: identifier.clone(),
                        description: description.clone(),
                        source: source.clone(),
                    });
                }
            }
        }
    }
}
