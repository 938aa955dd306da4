use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::{
    cli_types::ScanArgs,
    config::ServerConfig,
    indexing::{
        run_pass, Credentials, HttpIndexingClient, PassReport, Reconciler, Scheduler, TreeScanner,
    },
    server::{self, AppState},
};

pub struct CliApp {
    config: ServerConfig,
    verbose: bool,
}

impl CliApp {
    pub fn new(config: ServerConfig, verbose: bool) -> Self {
        info!("Sharing folder {}", config.folder.display());
        Self { config, verbose }
    }

    /// Runs the HTTP server; the indexer runs alongside it when enabled.
    pub async fn serve(&self) -> Result<()> {
        if self.config.indexing_enabled() {
            let scheduler = Scheduler::new(
                Arc::new(self.build_reconciler()?),
                self.config.indexing.last_full_index,
            )
            .with_interval(self.config.indexing.interval())
            .with_retry_delay(self.config.indexing.retry_delay());
            tokio::spawn(scheduler.run());
            info!("Background indexing enabled against {}", self.config.indexing.base_url);
        } else {
            warn!("No indexing key configured, background indexing disabled");
        }

        server::serve(AppState::new(self.config.folder.clone(), self.config.port)).await
    }

    /// One pass right now. Fails when the pass did not fully succeed.
    pub async fn index(&self) -> Result<PassReport> {
        let client = self.build_client()?;
        let report = run_pass(
            &self.scanner(),
            &client,
            self.config.indexing.upload_concurrency,
        )
        .await
        .context("Indexing pass aborted")?;

        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize pass report")?
        );
        if !report.is_success() {
            bail!(
                "{} of {} uploads failed",
                report.upload_failures.len(),
                report.changed
            );
        }
        Ok(report)
    }

    pub async fn scan(&self, args: ScanArgs) -> Result<usize> {
        let report = self.scanner().scan(&args.start).await;

        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize scan results")?
        );
        if self.verbose {
            info!("{} files, {} errors", report.files.len(), report.errors.len());
        }
        Ok(report.files.len())
    }

    pub fn show_config(&self) -> Result<()> {
        let config_toml =
            toml::to_string_pretty(&self.config).context("Failed to serialize configuration")?;
        println!("{}", config_toml);
        println!(
            "Indexing: {}",
            if self.config.indexing_enabled() { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    fn scanner(&self) -> TreeScanner {
        TreeScanner::new(self.config.folder.clone())
            .with_concurrency(self.config.indexing.scan_concurrency)
    }

    fn build_client(&self) -> Result<HttpIndexingClient> {
        let indexing = &self.config.indexing;
        let credentials = Credentials {
            api_key: indexing.api_key.clone().unwrap_or_default(),
            port: self.config.port,
            provider_id: indexing.provider_id.clone().unwrap_or_default(),
        };
        HttpIndexingClient::new(indexing.base_url.clone(), credentials, indexing.request_timeout())
            .context("Failed to create indexing client")
    }

    fn build_reconciler(&self) -> Result<Reconciler> {
        Ok(Reconciler::new(self.scanner(), Arc::new(self.build_client()?))
            .with_upload_concurrency(self.config.indexing.upload_concurrency))
    }
}
