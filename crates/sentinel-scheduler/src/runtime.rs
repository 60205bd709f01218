use std::time::Duration;

use sentinel_core::error::Result;
use sentinel_core::types::{now_unix, ScheduledJob};

use crate::store::JobStore;

/// Callback invoked for each job whose execution time has arrived.
///
/// The signature is infallible on purpose: whatever goes wrong while
/// handling a job must be absorbed by the runner, or a single bad job
/// could take down the timer loop.
pub trait JobRunner: Send + Sync {
    fn run(&self, job: ScheduledJob) -> impl std::future::Future<Output = ()> + Send;
}

/// Background runtime that fires due jobs from the store.
///
/// Operates independently from the command surface: reads due rows on a
/// fixed interval and hands each to the runner. Delivery is at least
/// once; the runner's re-validation read makes execution at most once.
pub struct SchedulerRuntime<R: JobRunner> {
    store: JobStore,
    runner: R,
    poll_interval: Duration,
}

impl<R: JobRunner> SchedulerRuntime<R> {
    pub fn new(store: JobStore, runner: R, poll_interval: Duration) -> Self {
        Self {
            store,
            runner,
            poll_interval,
        }
    }

    /// Main scheduler loop. Runs indefinitely, checking for due jobs.
    pub async fn run(&self) -> Result<()> {
        eprintln!(
            "sentinel: scheduler started (interval: {:?})",
            self.poll_interval
        );

        // On startup, fire anything that came due while the bot was down
        if let Err(e) = self.fire_due().await {
            eprintln!("sentinel: scheduler startup check failed: {e}");
        }

        loop {
            tokio::time::sleep(self.poll_interval).await;

            if let Err(e) = self.fire_due().await {
                eprintln!("sentinel: scheduler error: {e}");
            }
        }
    }

    async fn fire_due(&self) -> Result<()> {
        let due = self.store.due(now_unix()).await?;

        for job in due {
            self.runner.run(job).await;
        }

        Ok(())
    }
}
