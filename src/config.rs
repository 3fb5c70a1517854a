use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Project-wide configuration for document generation.
///
/// This struct is threaded explicitly into the renderer and the text
/// extensions so that per-document rendering stays independent and
/// parallel-safe. Nothing in the core reads configuration from ambient
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Directory containing the markdown document templates.
    pub documents_dir: PathBuf,

    /// Directory containing the YAML data files merged into the rendering
    /// context, one namespace per file.
    pub data_dir: PathBuf,

    /// Directory final rendered documents are written to.
    pub output_dir: PathBuf,

    /// Whether to keep inline audit notes (`[[...]]`) in rendered output.
    ///
    /// When `false` (default), the official document variant is produced and
    /// audit notes are stripped.
    pub auditor_notes: bool,

    /// The device's software safety classification (e.g. "a", "b", "c").
    ///
    /// Exposed to templates so content can be pruned by risk class.
    pub safety_class: Option<String>,

    /// The ordered post-render extension pipeline, by name.
    pub extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("documents"),
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("release"),
            auditor_notes: false,
            safety_class: None,
            extensions: default_extensions(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or
    /// if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }
}

fn default_extensions() -> Vec<String> {
    crate::render::extensions::DEFAULT_PIPELINE
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the
/// domain type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_documents_dir")]
        documents_dir: PathBuf,

        #[serde(default = "default_data_dir")]
        data_dir: PathBuf,

        #[serde(default = "default_output_dir")]
        output_dir: PathBuf,

        #[serde(default)]
        auditor_notes: bool,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        safety_class: Option<String>,

        #[serde(default = "default_extensions")]
        extensions: Vec<String>,
    },
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("documents")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("release")
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                documents_dir,
                data_dir,
                output_dir,
                auditor_notes,
                safety_class,
                extensions,
            } => Self {
                documents_dir,
                data_dir,
                output_dir,
                auditor_notes,
                safety_class,
                extensions,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            documents_dir: config.documents_dir,
            data_dir: config.data_dir,
            output_dir: config.output_dir,
            auditor_notes: config.auditor_notes,
            safety_class: config.safety_class,
            extensions: config.extensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\ndocuments_dir = \"docs\"\nauditor_notes = true\nsafety_class = \"b\"\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.documents_dir, PathBuf::from("docs"));
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.auditor_notes);
        assert_eq!(config.safety_class.as_deref(), Some("b"));
        assert_eq!(config.extensions, ["audit_notes", "section_numbers"]);
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\nauditor_notes = \"maybe\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        // Tests that deserialising a bare version header returns the default
        // configuration.
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn save_and_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("regdoc.toml");

        let mut config = Config::default();
        config.auditor_notes = true;
        config.safety_class = Some("c".to_string());
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
