//! Periodic reconciliation of the local folder against the remote search index.
//!
//! A pass scans the folder, asks the service which identities changed and
//! pushes the changed files with bounded concurrency. The [`scheduler`]
//! repeats passes on a fixed cadence.

pub mod checksum;
pub mod client;
pub mod extract;
pub mod identity;
pub mod junk;
pub mod reconcile;
pub mod scanner;
pub mod scheduler;

pub use client::{Credentials, FileCheck, FileUpload, HttpIndexingClient, IndexingService};
pub use reconcile::{run_pass, PassReport, PassRunner, Reconciler};
pub use scanner::{ScanReport, TreeScanner};
pub use scheduler::{Clock, Scheduler, SystemClock, TickOutcome, Wake};
