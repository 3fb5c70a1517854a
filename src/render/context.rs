//! Per-document render context assembly.
//!
//! The context is rebuilt fresh for every document and every pass. It
//! merges, in order: the project data directory (one namespace per file),
//! the document's front matter under `document`, the project configuration
//! under `config`, the render date as `today`, and the first-pass metadata
//! as `first_pass_output`.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use minijinja::value::Value;
use thiserror::Error;

use super::{first_pass::FirstPassOutput, front_matter::FrontMatter};
use crate::Config;

/// A data file that could not be read or parsed.
#[derive(Debug, Error)]
pub enum DataError {
    /// The data directory could not be enumerated.
    #[error("failed to read data directory '{}'", path.display())]
    Dir {
        /// The directory that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A data file could not be read.
    #[error("failed to read data file '{}'", path.display())]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A data file is not valid YAML.
    #[error("failed to parse data file '{}'", path.display())]
    Yaml {
        /// The file that could not be parsed.
        path: PathBuf,
        /// The underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },
}

/// The shared, read-only data loaded once per invocation.
///
/// Each `*.yml`/`*.yaml` file in the data directory becomes one namespace
/// named for its file stem; `data/system.yml` is the conventional home of
/// organization-wide values such as the manufacturer name.
#[derive(Debug, Default, Clone)]
pub struct DataFiles {
    namespaces: BTreeMap<String, serde_yaml::Value>,
}

impl DataFiles {
    /// Loads every YAML file in the given directory.
    ///
    /// A missing directory yields an empty data set; an unreadable or
    /// unparsable file fails the invocation with the offending path.
    ///
    /// # Errors
    ///
    /// Returns a [`DataError`] naming the offending file or directory.
    pub fn load(dir: &Path) -> Result<Self, DataError> {
        let mut namespaces = BTreeMap::new();

        if !dir.is_dir() {
            return Ok(Self { namespaces });
        }

        let entries = std::fs::read_dir(dir).map_err(|source| DataError::Dir {
            path: dir.to_path_buf(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| DataError::Dir {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();

            let is_yaml = path
                .extension()
                .is_some_and(|ext| ext == "yml" || ext == "yaml");
            if !path.is_file() || !is_yaml {
                continue;
            }

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let text = std::fs::read_to_string(&path).map_err(|source| DataError::Io {
                path: path.clone(),
                source,
            })?;
            let value: serde_yaml::Value =
                serde_yaml::from_str(&text).map_err(|source| DataError::Yaml {
                    path: path.clone(),
                    source,
                })?;

            namespaces.insert(stem.to_string(), value);
        }

        Ok(Self { namespaces })
    }

    /// The number of loaded namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    /// Whether any data files were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

/// Builds the context value for one render pass.
///
/// `first_pass_output` is the empty metadata value during pass 1 and the
/// populated value during pass 2; it is injected as ordinary context data,
/// never through ambient state.
#[must_use]
pub fn build(
    data: &DataFiles,
    front_matter: &FrontMatter,
    config: &Config,
    first_pass_output: FirstPassOutput,
) -> Value {
    let mut entries: BTreeMap<String, Value> = data
        .namespaces
        .iter()
        .map(|(name, value)| (name.clone(), Value::from_serialize(value)))
        .collect();

    entries.insert(
        "document".to_string(),
        Value::from_serialize(front_matter.as_mapping()),
    );
    entries.insert(
        "config".to_string(),
        Value::from_serialize(ConfigContext::from(config)),
    );
    entries.insert(
        "today".to_string(),
        Value::from(chrono::Local::now().format("%Y-%m-%d").to_string()),
    );
    entries.insert(
        "first_pass_output".to_string(),
        Value::from_object(first_pass_output),
    );

    entries.into_iter().collect()
}

/// The subset of project configuration exposed to templates.
#[derive(Debug, serde::Serialize)]
struct ConfigContext {
    auditor_notes: bool,
    safety_class: Option<String>,
}

impl From<&Config> for ConfigContext {
    fn from(config: &Config) -> Self {
        Self {
            auditor_notes: config.auditor_notes,
            safety_class: config.safety_class.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn front_matter() -> FrontMatter {
        let (front, _) =
            FrontMatter::extract("---\nid: SDP-001\ntitle: Plan\nrevision: 2\n---\nbody\n")
                .unwrap();
        front
    }

    #[test]
    fn data_files_become_namespaces() {
        let tmp = tempdir().unwrap();
        fs::write(
            tmp.path().join("system.yml"),
            "manufacturer_name: Acme Medical\n",
        )
        .unwrap();
        fs::write(tmp.path().join("devices.yaml"), "- DX-1\n- DX-2\n").unwrap();
        fs::write(tmp.path().join("notes.txt"), "not yaml").unwrap();

        let data = DataFiles::load(tmp.path()).unwrap();
        assert_eq!(data.len(), 2);

        let ctx = build(
            &data,
            &front_matter(),
            &Config::default(),
            FirstPassOutput::empty(),
        );
        let env = minijinja::Environment::new();
        let rendered = env
            .render_str("{{ system.manufacturer_name }} / {{ devices[1] }}", &ctx)
            .unwrap();
        assert_eq!(rendered, "Acme Medical / DX-2");
    }

    #[test]
    fn missing_data_directory_is_empty() {
        let tmp = tempdir().unwrap();
        let data = DataFiles::load(&tmp.path().join("nope")).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn unparsable_data_file_names_the_path() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("broken.yml");
        fs::write(&path, "key: [unclosed\n").unwrap();

        let error = DataFiles::load(tmp.path()).unwrap_err();
        assert!(matches!(error, DataError::Yaml { path: p, .. } if p == path));
    }

    #[test]
    fn front_matter_is_exposed_under_document() {
        let ctx = build(
            &DataFiles::default(),
            &front_matter(),
            &Config::default(),
            FirstPassOutput::empty(),
        );
        let env = minijinja::Environment::new();
        let rendered = env
            .render_str("{{ document.id }} rev {{ document.revision }}", &ctx)
            .unwrap();
        assert_eq!(rendered, "SDP-001 rev 2");
    }

    #[test]
    fn config_is_exposed_for_content_pruning() {
        let config = Config {
            safety_class: Some("b".to_string()),
            ..Config::default()
        };
        let ctx = build(
            &DataFiles::default(),
            &front_matter(),
            &config,
            FirstPassOutput::empty(),
        );
        let env = minijinja::Environment::new();
        let rendered = env
            .render_str(
                "{% if config.safety_class == 'b' %}class b{% endif %}",
                &ctx,
            )
            .unwrap();
        assert_eq!(rendered, "class b");
    }
}
