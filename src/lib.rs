pub mod types;
pub mod error;
pub mod indexing;
pub mod server;
pub mod config;
pub mod logging;
pub mod cli;
pub mod cli_types;

// Re-export commonly used types
pub use types::{FileDescriptor, FileType};
pub use error::{IndexError, Result};
pub use indexing::{
    run_pass, HttpIndexingClient, IndexingService, PassReport, Reconciler, Scheduler, TreeScanner,
};
pub use config::ServerConfig;
pub use cli::CliApp;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
