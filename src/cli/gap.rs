use std::path::{Path, PathBuf};

use regdoc::{audit, DocumentCorpus};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, clap::Parser)]
pub struct Gap {
    /// The checklist to compile: a built-in name or a path to a
    /// checklist file
    checklist: String,

    /// The documents to audit (default: every markdown file under the
    /// configured output directory)
    docs: Vec<PathBuf>,

    /// Print the fully expanded checklist instead of analyzing
    #[arg(long, conflicts_with = "output")]
    expand: bool,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

impl Gap {
    #[instrument(skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let checklist = audit::compile(&self.checklist)?;

        if self.expand {
            for item in checklist.items() {
                println!("{}: {}", item.identifier, item.description);
            }
            return Ok(());
        }

        let docs = if self.docs.is_empty() {
            let config = super::load_config(root)?;
            vec![root.join(config.output_dir)]
        } else {
            self.docs
        };
        let corpus = DocumentCorpus::load(&docs)?;

        let report = audit::analyze(&checklist, &corpus);

        match self.output {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Table => {
                if report.is_satisfied() {
                    println!(
                        "{}",
                        format!(
                            "All {} items of '{}' are covered.",
                            checklist.len(),
                            checklist.name()
                        )
                        .success()
                    );
                } else {
                    println!(
                        "{}",
                        format!(
                            "{} of {} items of '{}' are not covered:",
                            report.missing.len(),
                            checklist.len(),
                            checklist.name()
                        )
                        .warning()
                    );
                    for item in &report.missing {
                        println!("  {}: {}", item.identifier, item.description);
                    }
                }
            }
        }

        // Exit code 2 marks gaps for CI gates, distinct from usage errors.
        if !report.is_satisfied() {
            std::process::exit(2);
        }
        Ok(())
    }
}
