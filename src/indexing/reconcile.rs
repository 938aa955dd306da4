use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::indexing::client::{FileCheck, FileUpload, IndexingService};
use crate::indexing::extract::extract_content;
use crate::indexing::scanner::TreeScanner;
use crate::types::FileDescriptor;

pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub identity: String,
    pub message: String,
}

/// Outcome of one scan → check → push cycle.
#[derive(Debug, Default, Serialize)]
pub struct PassReport {
    pub scanned: usize,
    pub scan_errors: usize,
    pub changed: usize,
    pub uploaded: usize,
    pub extraction_failures: Vec<FileFailure>,
    pub upload_failures: Vec<FileFailure>,
}

impl PassReport {
    /// Extraction failures are not counted: the file stays changed remotely
    /// and is retried on the next pass.
    pub fn is_success(&self) -> bool {
        self.upload_failures.is_empty()
    }
}

enum PushResult {
    Uploaded,
    ExtractionFailed(FileFailure),
    UploadFailed(FileFailure),
}

/// Runs one reconciliation pass.
///
/// Only the check call can fail the whole pass with `Err`; per-file problems
/// end up in the returned report.
pub async fn run_pass(
    scanner: &TreeScanner,
    service: &dyn IndexingService,
    upload_concurrency: usize,
) -> Result<PassReport> {
    let scan = scanner.scan("/").await;
    let mut report = PassReport {
        scanned: scan.files.len(),
        scan_errors: scan.errors.len(),
        ..Default::default()
    };

    let checks: Vec<FileCheck> = scan
        .files
        .iter()
        .map(|file| FileCheck {
            id: file.identity.clone(),
            content_hash: file.content_hash.clone(),
        })
        .collect();
    let changed: HashSet<String> = service.check(&checks).await?.into_iter().collect();

    let to_push: Vec<FileDescriptor> = scan
        .files
        .into_iter()
        .filter(|file| changed.contains(&file.identity))
        .collect();
    report.changed = to_push.len();
    info!("{} of {} files changed", report.changed, report.scanned);

    let results: Vec<PushResult> = stream::iter(to_push)
        .map(|file| async move { push_file(&file, service).await })
        .buffer_unordered(upload_concurrency.max(1))
        .collect()
        .await;

    for result in results {
        match result {
            PushResult::Uploaded => report.uploaded += 1,
            PushResult::ExtractionFailed(failure) => report.extraction_failures.push(failure),
            PushResult::UploadFailed(failure) => report.upload_failures.push(failure),
        }
    }

    Ok(report)
}

async fn push_file(file: &FileDescriptor, service: &dyn IndexingService) -> PushResult {
    let content = match extract_content(file).await {
        Ok(content) => content,
        Err(e) => {
            warn!("Not indexing {}: {}", file.identity, e);
            return PushResult::ExtractionFailed(FileFailure {
                identity: file.identity.clone(),
                message: e.to_string(),
            });
        }
    };

    let upload = FileUpload {
        id: file.identity.clone(),
        content_hash: file.content_hash.clone(),
        file_type: file.file_type,
        content,
    };

    match service.index_file(&upload).await {
        Ok(()) => PushResult::Uploaded,
        Err(e) => {
            warn!("Failed to index {}: {}", file.identity, e);
            PushResult::UploadFailed(FileFailure {
                identity: file.identity.clone(),
                message: e.to_string(),
            })
        }
    }
}

/// Something the scheduler can run on each tick.
#[async_trait]
pub trait PassRunner: Send + Sync {
    async fn run_pass(&self) -> Result<PassReport>;
}

/// Binds a scanner and an indexing service into a runnable pass.
pub struct Reconciler {
    scanner: TreeScanner,
    service: Arc<dyn IndexingService>,
    upload_concurrency: usize,
}

impl Reconciler {
    pub fn new(scanner: TreeScanner, service: Arc<dyn IndexingService>) -> Self {
        Self {
            scanner,
            service,
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
        }
    }

    pub fn with_upload_concurrency(mut self, upload_concurrency: usize) -> Self {
        self.upload_concurrency = upload_concurrency.max(1);
        self
    }
}

#[async_trait]
impl PassRunner for Reconciler {
    async fn run_pass(&self) -> Result<PassReport> {
        run_pass(&self.scanner, self.service.as_ref(), self.upload_concurrency).await
    }
}
