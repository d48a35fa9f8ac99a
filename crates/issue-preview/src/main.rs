//! issue-preview CLI - live HTML preview and Markdown export for GitHub issue forms.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use commands::export::ExportArgs;
use commands::preview::PreviewArgs;

#[derive(Parser)]
#[command(name = "issue-preview")]
#[command(about = "Live HTML preview and Markdown export for GitHub issue forms")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (defaults to issue-preview.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview an issue form in the browser, re-rendering on every save
    Preview(PreviewArgs),

    /// Render an issue form to HTML once
    Render {
        /// Issue form YAML file
        file: PathBuf,

        /// Output HTML file (defaults to <file>.html)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a saved preview page to Markdown
    Export(ExportArgs),

    /// Create a sample issue form and config file
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Preview(args) => {
            commands::preview::run(args, config::load_config(config_path)?).await?;
        }
        Commands::Render { file, output } => {
            commands::render::run(file, output, config::load_config(config_path)?).await?;
        }
        Commands::Export(args) => {
            commands::export::run(args, config::load_config(config_path)?).await?;
        }
        Commands::Init { yes } => {
            commands::init::run(Path::new("."), yes).await?;
        }
    }

    Ok(())
}
