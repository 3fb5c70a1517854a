use std::path::{Path, PathBuf};

mod gap;
mod render;
mod terminal;

use clap::ArgAction;
use gap::Gap;
use render::Render;
use tracing::instrument;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the root of the documentation project
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command.run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Loads the project configuration from `<root>/regdoc.toml`, falling back
/// to defaults when the file is absent.
fn load_config(root: &Path) -> anyhow::Result<regdoc::Config> {
    let config_path = root.join("regdoc.toml");
    if config_path.exists() {
        regdoc::Config::load(&config_path).map_err(|e| anyhow::anyhow!("{e}"))
    } else {
        Ok(regdoc::Config::default())
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Render document templates into release documents
    Render(Render),

    /// Check a checklist against the document corpus
    ///
    /// Exits with code 2 when any checklist item is missing from the
    /// corpus, for use as a CI gate.
    Gap(Gap),

    /// List the built-in checklists
    Checklists,
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Render(command) => command.run(&root)?,
            Self::Gap(command) => command.run(&root)?,
            Self::Checklists => Checklists::run(),
        }
        Ok(())
    }
}

struct Checklists;

impl Checklists {
    #[instrument]
    fn run() {
        for name in regdoc::audit::builtin_names() {
            println!("{name}");
        }
    }
}
