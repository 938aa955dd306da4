use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{IndexError, Result};
use crate::indexing::checksum::checksum_file;
use crate::indexing::identity::resolve_identity;
use crate::indexing::junk::is_not_junk;
use crate::types::{FileDescriptor, FileType};

pub const DEFAULT_SCAN_CONCURRENCY: usize = 64;

/// An entry the scan could not describe. Siblings are unaffected.
#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub files: Vec<FileDescriptor>,
    pub errors: Vec<ScanFailure>,
}

/// Caps how many listing and describing tasks do work at once and remembers
/// the highest count seen.
#[derive(Debug)]
struct FanOut {
    permits: Arc<Semaphore>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

struct Slot {
    fan_out: Arc<FanOut>,
    _permit: OwnedSemaphorePermit,
}

impl FanOut {
    fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            permits: Arc::new(Semaphore::new(limit)),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    async fn enter(self: &Arc<Self>) -> std::result::Result<Slot, String> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| e.to_string())?;
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(Slot {
            fan_out: self.clone(),
            _permit: permit,
        })
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.fan_out.active.fetch_sub(1, Ordering::SeqCst);
    }
}

enum ScanStep {
    Listed(Vec<PathBuf>),
    Directory(PathBuf),
    File(FileDescriptor),
    Failed(ScanFailure),
}

/// Walks the indexed root with a work-list of listing and describing tasks.
#[derive(Debug, Clone)]
pub struct TreeScanner {
    root: PathBuf,
    concurrency: usize,
}

impl TreeScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            concurrency: DEFAULT_SCAN_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scans everything below `start`, a path relative to the root where
    /// `""` and `"/"` both mean the root itself.
    pub async fn scan(&self, start: &str) -> ScanReport {
        self.walk(start, FanOut::new(self.concurrency)).await
    }

    async fn walk(&self, start: &str, permits: Arc<FanOut>) -> ScanReport {
        let start_dir = self.root.join(start.trim_start_matches(['/', '\\']));
        let root = Arc::new(self.root.clone());

        let mut report = ScanReport::default();
        let mut tasks = JoinSet::new();
        tasks.spawn(list_directory(start_dir, permits.clone()));

        while let Some(joined) = tasks.join_next().await {
            let step = match joined {
                Ok(step) => step,
                Err(e) => {
                    warn!("Scan task failed: {}", e);
                    report.errors.push(ScanFailure {
                        path: self.root.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match step {
                ScanStep::Listed(entries) => {
                    for entry in entries {
                        tasks.spawn(describe_entry(entry, root.clone(), permits.clone()));
                    }
                }
                ScanStep::Directory(dir) => {
                    tasks.spawn(list_directory(dir, permits.clone()));
                }
                ScanStep::File(descriptor) => report.files.push(descriptor),
                ScanStep::Failed(failure) => {
                    warn!("Skipping {}: {}", failure.path.display(), failure.message);
                    report.errors.push(failure);
                }
            }
        }

        drop_identity_collisions(&mut report);
        debug!(
            "Scanned {}: {} files, {} errors, peak fan-out {}",
            self.root.display(),
            report.files.len(),
            report.errors.len(),
            permits.peak()
        );
        report
    }
}

/// Keeps one descriptor per identity, the one with the smallest path, and
/// records the others as failures.
fn drop_identity_collisions(report: &mut ScanReport) {
    report.files.sort_by(|a, b| a.path.cmp(&b.path));

    let mut kept: HashMap<String, PathBuf> = HashMap::new();
    let mut files = Vec::with_capacity(report.files.len());
    for file in report.files.drain(..) {
        match kept.get(&file.identity) {
            Some(winner) => {
                let message = format!(
                    "identity collision with {} as {}",
                    winner.display(),
                    file.identity
                );
                warn!("Skipping {}: {}", file.path.display(), message);
                report.errors.push(ScanFailure {
                    path: file.path,
                    message,
                });
            }
            None => {
                kept.insert(file.identity.clone(), file.path.clone());
                files.push(file);
            }
        }
    }
    report.files = files;
}

async fn list_directory(dir: PathBuf, permits: Arc<FanOut>) -> ScanStep {
    let _slot = match permits.enter().await {
        Ok(slot) => slot,
        Err(e) => return failed(dir, e),
    };

    match read_entries(&dir).await {
        Ok(entries) => ScanStep::Listed(entries),
        Err(e) => failed(dir, e.to_string()),
    }
}

async fn read_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut reader = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| IndexError::io(dir, e))?;

    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(|e| IndexError::io(dir, e))? {
        if is_not_junk(&entry.file_name().to_string_lossy()) {
            entries.push(entry.path());
        }
    }
    Ok(entries)
}

async fn describe_entry(path: PathBuf, root: Arc<PathBuf>, permits: Arc<FanOut>) -> ScanStep {
    let _slot = match permits.enter().await {
        Ok(slot) => slot,
        Err(e) => return failed(path, e),
    };

    match describe_file(&path, &root).await {
        Ok(Described::File(descriptor)) => ScanStep::File(descriptor),
        Ok(Described::Directory) => ScanStep::Directory(path),
        Ok(Described::Skipped) => ScanStep::Listed(Vec::new()),
        Err(e) => failed(path, e.to_string()),
    }
}

enum Described {
    File(FileDescriptor),
    Directory,
    Skipped,
}

async fn describe_file(path: &Path, root: &Path) -> Result<Described> {
    let link = tokio::fs::symlink_metadata(path)
        .await
        .map_err(|e| IndexError::io(path, e))?;
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| IndexError::io(path, e))?;

    if metadata.is_dir() {
        // Symlinked directories can form cycles; only real directories are walked.
        if link.file_type().is_symlink() {
            debug!("Not following directory symlink {}", path.display());
            return Ok(Described::Skipped);
        }
        return Ok(Described::Directory);
    }

    Ok(Described::File(FileDescriptor {
        path: path.to_path_buf(),
        identity: resolve_identity(path, root)?,
        content_hash: checksum_file(path).await?,
        file_type: FileType::from_path(path),
    }))
}

fn failed(path: PathBuf, message: String) -> ScanStep {
    ScanStep::Failed(ScanFailure { path, message })
}
