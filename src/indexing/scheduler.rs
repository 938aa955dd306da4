use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use crate::indexing::reconcile::{PassReport, PassRunner};

pub const DEFAULT_INTERVAL_HOURS: i64 = 12;
pub const DEFAULT_RETRY_DELAY_SECS: i64 = 300;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep_until(&self, deadline: DateTime<Utc>);
}

pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        let remaining = (deadline - Utc::now()).to_std().unwrap_or_default();
        tokio::time::sleep(remaining).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Now,
    At(DateTime<Utc>),
}

/// When the next pass is due given the last successful run.
pub fn next_wake(last_run: Option<DateTime<Utc>>, interval: Duration, now: DateTime<Utc>) -> Wake {
    match last_run {
        None => Wake::Now,
        Some(last) => {
            let target = last + interval;
            if now >= target {
                Wake::Now
            } else {
                Wake::At(target)
            }
        }
    }
}

#[derive(Debug)]
pub enum TickOutcome {
    Succeeded(PassReport),
    /// The check went through but some uploads failed.
    PassFailed(PassReport),
    /// The check call failed; nothing was pushed.
    Aborted(String),
}

impl TickOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TickOutcome::Succeeded(_))
    }
}

/// Runs reconciliation passes one at a time on a fixed cadence measured from
/// the last successful pass.
///
/// A failed pass leaves `last_run` untouched, so the following tick is due
/// immediately; it only waits `retry_delay` first. There is no backoff.
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    runner: Arc<dyn PassRunner>,
    interval: Duration,
    retry_delay: Duration,
    last_run: Option<DateTime<Utc>>,
    last_failed: bool,
}

impl Scheduler {
    pub fn new(runner: Arc<dyn PassRunner>, last_run: Option<DateTime<Utc>>) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            runner,
            interval: Duration::hours(DEFAULT_INTERVAL_HOURS),
            retry_delay: Duration::seconds(DEFAULT_RETRY_DELAY_SECS),
            last_run,
            last_failed: false,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    pub fn next_wake(&self) -> Wake {
        next_wake(self.last_run, self.interval, self.clock.now())
    }

    /// Waits until the next pass is due, then runs it.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.last_failed && self.retry_delay > Duration::zero() {
            let retry_at = self.clock.now() + self.retry_delay;
            info!("Retrying failed indexing pass at {}", retry_at);
            self.clock.sleep_until(retry_at).await;
        }

        if let Wake::At(target) = self.next_wake() {
            info!("Next indexing pass at {}", target);
            self.clock.sleep_until(target).await;
        }

        info!("Starting indexing pass");
        let outcome = match self.runner.run_pass().await {
            Ok(report) if report.is_success() => TickOutcome::Succeeded(report),
            Ok(report) => TickOutcome::PassFailed(report),
            Err(e) => TickOutcome::Aborted(e.to_string()),
        };

        match &outcome {
            TickOutcome::Succeeded(report) => {
                let finished = self.clock.now();
                self.last_run = Some(finished);
                self.last_failed = false;
                info!(
                    "Indexing pass finished at {}: {} scanned, {} changed, {} uploaded",
                    finished, report.scanned, report.changed, report.uploaded
                );
            }
            TickOutcome::PassFailed(report) => {
                self.last_failed = true;
                warn!(
                    "Indexing pass failed: {} of {} uploads failed",
                    report.upload_failures.len(),
                    report.changed
                );
            }
            TickOutcome::Aborted(message) => {
                self.last_failed = true;
                error!("Indexing pass aborted: {}", message);
            }
        }

        outcome
    }

    pub async fn run(mut self) {
        loop {
            self.tick().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IndexError, Result};
    use crate::indexing::reconcile::FileFailure;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct FakeClock {
        now: Mutex<DateTime<Utc>>,
        sleeps: Mutex<Vec<DateTime<Utc>>>,
    }

    impl FakeClock {
        fn at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(now),
                sleeps: Mutex::new(Vec::new()),
            })
        }

        fn sleeps(&self) -> Vec<DateTime<Utc>> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }

        async fn sleep_until(&self, deadline: DateTime<Utc>) {
            self.sleeps.lock().unwrap().push(deadline);
            let mut now = self.now.lock().unwrap();
            if deadline > *now {
                *now = deadline;
            }
        }
    }

    struct ScriptedRunner {
        clock: Arc<FakeClock>,
        results: Mutex<VecDeque<Result<PassReport>>>,
        ran_at: Mutex<Vec<DateTime<Utc>>>,
    }

    impl ScriptedRunner {
        fn new(clock: Arc<FakeClock>, results: Vec<Result<PassReport>>) -> Arc<Self> {
            Arc::new(Self {
                clock,
                results: Mutex::new(results.into()),
                ran_at: Mutex::new(Vec::new()),
            })
        }

        fn ran_at(&self) -> Vec<DateTime<Utc>> {
            self.ran_at.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PassRunner for ScriptedRunner {
        async fn run_pass(&self) -> Result<PassReport> {
            self.ran_at.lock().unwrap().push(self.clock.now());
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(PassReport::default()))
        }
    }

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn check_failure() -> Result<PassReport> {
        Err(IndexError::RemoteStatus {
            operation: "check".to_string(),
            status: 503,
        })
    }

    fn scheduler(clock: &Arc<FakeClock>, runner: &Arc<ScriptedRunner>, last: Option<DateTime<Utc>>) -> Scheduler {
        Scheduler::new(runner.clone(), last).with_clock(clock.clone())
    }

    #[test]
    fn test_next_wake() {
        let now = start();
        let twelve = Duration::hours(12);
        assert_eq!(next_wake(None, twelve, now), Wake::Now);
        assert_eq!(next_wake(Some(now - Duration::hours(13)), twelve, now), Wake::Now);
        assert_eq!(next_wake(Some(now - Duration::hours(12)), twelve, now), Wake::Now);
        assert_eq!(
            next_wake(Some(now - Duration::hours(1)), twelve, now),
            Wake::At(now + Duration::hours(11))
        );
    }

    #[tokio::test]
    async fn test_first_tick_runs_immediately_without_prior_run() {
        let clock = FakeClock::at(start());
        let runner = ScriptedRunner::new(clock.clone(), vec![]);
        let mut scheduler = scheduler(&clock, &runner, None);

        assert!(scheduler.tick().await.is_success());

        assert!(clock.sleeps().is_empty());
        assert_eq!(runner.ran_at(), vec![start()]);
        assert_eq!(scheduler.last_run(), Some(start()));
    }

    #[tokio::test]
    async fn test_overdue_run_starts_immediately() {
        let clock = FakeClock::at(start());
        let runner = ScriptedRunner::new(clock.clone(), vec![]);
        let mut scheduler = scheduler(&clock, &runner, Some(start() - Duration::hours(13)));

        scheduler.tick().await;

        assert!(clock.sleeps().is_empty());
        assert_eq!(runner.ran_at(), vec![start()]);
    }

    #[tokio::test]
    async fn test_recent_run_waits_for_target() {
        let clock = FakeClock::at(start());
        let runner = ScriptedRunner::new(clock.clone(), vec![]);
        let mut scheduler = scheduler(&clock, &runner, Some(start() - Duration::hours(1)));

        assert_eq!(scheduler.next_wake(), Wake::At(start() + Duration::hours(11)));
        scheduler.tick().await;

        let target = start() + Duration::hours(11);
        assert_eq!(clock.sleeps(), vec![target]);
        assert_eq!(runner.ran_at(), vec![target]);
    }

    #[tokio::test]
    async fn test_success_rearms_twelve_hours_later() {
        let clock = FakeClock::at(start());
        let runner = ScriptedRunner::new(clock.clone(), vec![]);
        let mut scheduler = scheduler(&clock, &runner, None);

        scheduler.tick().await;
        scheduler.tick().await;

        assert_eq!(runner.ran_at(), vec![start(), start() + Duration::hours(12)]);
        assert_eq!(scheduler.last_run(), Some(start() + Duration::hours(12)));
    }

    #[tokio::test]
    async fn test_failed_check_keeps_last_run() {
        let last = start() - Duration::hours(13);
        let clock = FakeClock::at(start());
        let runner = ScriptedRunner::new(clock.clone(), vec![check_failure()]);
        let mut scheduler = scheduler(&clock, &runner, Some(last));

        let outcome = scheduler.tick().await;

        assert!(matches!(outcome, TickOutcome::Aborted(_)));
        assert_eq!(scheduler.last_run(), Some(last));
        assert_eq!(scheduler.next_wake(), Wake::Now);
    }

    #[tokio::test]
    async fn test_failed_pass_retries_after_delay() {
        let clock = FakeClock::at(start());
        let failed_upload = PassReport {
            changed: 1,
            upload_failures: vec![FileFailure {
                identity: "a.md".to_string(),
                message: "500".to_string(),
            }],
            ..Default::default()
        };
        let runner = ScriptedRunner::new(clock.clone(), vec![Ok(failed_upload)]);
        let mut scheduler = scheduler(&clock, &runner, None).with_retry_delay(Duration::minutes(5));

        assert!(matches!(scheduler.tick().await, TickOutcome::PassFailed(_)));
        assert_eq!(scheduler.last_run(), None);

        assert!(scheduler.tick().await.is_success());
        let retry_at = start() + Duration::minutes(5);
        assert_eq!(runner.ran_at(), vec![start(), retry_at]);
        assert_eq!(scheduler.last_run(), Some(retry_at));
    }

    #[tokio::test]
    async fn test_system_clock_past_deadline_returns() {
        let clock = SystemClock;
        clock.sleep_until(Utc::now() - Duration::seconds(5)).await;
    }
}
