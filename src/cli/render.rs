use std::path::{Path, PathBuf};

use rayon::prelude::*;
use regdoc::{RenderError, Renderer};
use tracing::{info, instrument};
use walkdir::WalkDir;

use super::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct Render {
    /// The document templates to render (default: every markdown file
    /// under the configured documents directory)
    paths: Vec<PathBuf>,

    /// Produce the auditor variant, keeping inline audit notes
    #[arg(long)]
    auditor: bool,
}

impl Render {
    #[instrument(skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let mut config = super::load_config(root)?;
        if self.auditor {
            config.auditor_notes = true;
        }
        // Configured paths are project-relative.
        config.data_dir = root.join(&config.data_dir);

        let documents_root = root.join(&config.documents_dir);
        let documents = if self.paths.is_empty() {
            markdown_files(&documents_root)
        } else {
            self.paths
        };
        if documents.is_empty() {
            anyhow::bail!(
                "No documents to render in {}",
                config.documents_dir.display()
            );
        }

        let output_dir = root.join(&config.output_dir);
        std::fs::create_dir_all(&output_dir)?;

        let renderer = Renderer::new(config)?;

        // One document failing must not take the rest of the batch with it.
        let results: Vec<anyhow::Result<()>> = documents
            .par_iter()
            .map(|path| {
                Self::render_one(&renderer, path, &documents_root, &output_dir).map_err(Into::into)
            })
            .collect();

        let failures = results.iter().filter(|result| result.is_err()).count();
        for error in results.iter().filter_map(|r| r.as_ref().err()) {
            eprintln!("{}", format!("{error:#}").failure());
        }

        if failures > 0 {
            anyhow::bail!(
                "{failures} of {} documents failed to render",
                documents.len()
            );
        }

        println!(
            "{}",
            format!("Rendered {} documents to {}", documents.len(), output_dir.display()).success()
        );
        Ok(())
    }

    fn render_one(
        renderer: &Renderer,
        path: &Path,
        documents_root: &Path,
        output_dir: &Path,
    ) -> Result<(), RenderError> {
        let document = renderer.render_file(path)?;

        for target in &document.image_warnings {
            eprintln!(
                "{}",
                format!(
                    "{}: image reference '{target}' must be relative and contain no spaces",
                    path.display()
                )
                .warning()
            );
        }

        // Nested templates keep their subpath, so same-named files in
        // different subdirectories cannot collide in the output.
        let relative = path
            .strip_prefix(documents_root)
            .unwrap_or_else(|_| Path::new(path.file_name().unwrap_or_default()));
        let output_path = output_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                path: output_path.clone(),
                source,
            })?;
        }
        std::fs::write(&output_path, &document.text).map_err(|source| RenderError::Io {
            path: output_path.clone(),
            source,
        })?;

        info!(
            document = %path.display(),
            output = %output_path.display(),
            "rendered"
        );
        Ok(())
    }
}

/// Collects every markdown file under a directory, sorted for
/// deterministic batch order.
fn markdown_files(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "md")
        })
        .map(walkdir::DirEntry::into_path)
        .collect();
    paths.sort();
    paths
}
