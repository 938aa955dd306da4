// Integration test for the public API
use notebook_server::{
    FileType, HttpIndexingClient, IndexError, PassReport, Reconciler, Scheduler, TreeScanner,
    VERSION,
};
use notebook_server::indexing::{Credentials, PassRunner, Wake};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_public_api_exports() {
    let _version: &str = VERSION;

    let _scanner: TreeScanner = TreeScanner::new("/tmp").with_concurrency(4);
    let _report: PassReport = PassReport::default();
    let _error: IndexError = IndexError::RemoteStatus {
        operation: "check".to_string(),
        status: 500,
    };
    assert_eq!(FileType::from_extension("md"), FileType::Markdown);
}

#[test]
fn test_version_constant() {
    assert!(!VERSION.is_empty());
}

#[tokio::test]
async fn test_scheduler_without_prior_run_is_due() {
    let dir = TempDir::new().unwrap();
    let client = HttpIndexingClient::new(
        "http://127.0.0.1:9",
        Credentials::default(),
        Duration::from_secs(1),
    )
    .unwrap();
    let reconciler: Arc<dyn PassRunner> =
        Arc::new(Reconciler::new(TreeScanner::new(dir.path()), Arc::new(client)));

    let scheduler = Scheduler::new(reconciler, None);
    assert_eq!(scheduler.next_wake(), Wake::Now);
    assert_eq!(scheduler.last_run(), None);
}

#[tokio::test]
async fn test_scan_spec_fixture() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.md"), "hello").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/b.pdf"), "%PDF-1.4").unwrap();

    let report = TreeScanner::new(dir.path()).scan("/").await;

    let mut ids: Vec<_> = report.files.iter().map(|f| f.identity.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["a.md", "sub/b.pdf"]);
}
