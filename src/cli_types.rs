use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "notebook-server",
    version,
    about = "Serves a local folder to GM's Notebook and keeps its search index in sync"
)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Folder to share; overrides LOCAL_FOLDER
    #[arg(long, global = true)]
    pub folder: Option<PathBuf>,

    /// Port to listen on; overrides PORT
    #[arg(long, global = true)]
    pub port: Option<u16>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the file server and the background indexer (default)
    Serve,
    /// Run a single indexing pass now
    Index,
    /// List what an indexing pass would send, without contacting the service
    Scan(ScanArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    /// Directory to start from, relative to the shared folder
    #[arg(default_value = "/")]
    pub start: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::parse_from(["notebook-server", "--port", "4000"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.port, Some(4000));
    }

    #[test]
    fn test_scan_start_defaults_to_root() {
        let cli = Cli::parse_from(["notebook-server", "scan"]);
        match cli.command {
            Some(Commands::Scan(args)) => assert_eq!(args.start, "/"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["notebook-server", "index", "--folder", "/srv/notes", "-v"]);
        assert!(matches!(cli.command, Some(Commands::Index)));
        assert_eq!(cli.folder, Some(PathBuf::from("/srv/notes")));
        assert!(cli.verbose);
    }
}
