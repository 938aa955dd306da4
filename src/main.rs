use anyhow::Result;
use clap::Parser;

use notebook_server::cli_types::{Cli, Commands};
use notebook_server::config::{LoadOptions, ServerConfig};
use notebook_server::{logging, CliApp};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ServerConfig::load(&LoadOptions {
        config_path: cli.config.clone(),
        folder: cli.folder.clone(),
        port: cli.port,
    })?;
    let _log_guard = logging::init(cli.verbose, config.log_dir.as_deref())?;

    let app = CliApp::new(config, cli.verbose);
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => app.serve().await,
        Commands::Index => app.index().await.map(|_| ()),
        Commands::Scan(args) => app.scan(args).await.map(|_| ()),
        Commands::Config => app.show_config(),
    }
}
