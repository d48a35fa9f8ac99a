//! Live preview command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use issue_preview_server::{PreviewServer, PreviewServerConfig, WatchBackend};

use crate::config::ConfigFile;

#[derive(Args)]
pub struct PreviewArgs {
    /// Issue form YAML file
    pub file: PathBuf,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Browser to open instead of the system default
    #[arg(short, long)]
    pub browser: Option<String>,

    /// Do not open browser
    #[arg(long)]
    pub no_open: bool,

    /// Where exports are written (defaults to <file>.md)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Change detection backend: poll or notify
    #[arg(long)]
    pub watch: Option<WatchBackend>,
}

/// Run the preview server until Ctrl-C.
pub async fn run(args: PreviewArgs, config: ConfigFile) -> Result<()> {
    if !args.file.is_file() {
        anyhow::bail!("Issue form not found: {}", args.file.display());
    }

    let server_config = PreviewServerConfig {
        source: args.file,
        host: config.server.host,
        port: args.port.unwrap_or(config.server.port),
        open: config.server.open && !args.no_open,
        browser: args.browser.or(config.server.browser),
        output: args.output.or(config.export.output),
        render: config.render.to_render_config(),
        watch: args.watch.unwrap_or(config.watch.backend),
        interval: Duration::from_millis(config.watch.interval_ms.max(1)),
    };

    tracing::info!(
        "Starting preview on port {} ({:?} change detection)",
        server_config.port,
        server_config.watch
    );

    PreviewServer::new(server_config).start().await?;

    Ok(())
}
