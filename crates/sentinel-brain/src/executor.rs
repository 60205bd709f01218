use sentinel_core::types::ScheduledJob;
use sentinel_scheduler::runtime::JobRunner;
use sentinel_scheduler::store::JobStore;

use crate::audit::{AuditEvent, AuditSink};
use crate::moderation::{ModCommand, ModerationGateway};

/// Executes due jobs handed over by the scheduler runtime.
///
/// Every branch re-validates against the store before acting: a job that
/// is gone when re-read was deleted concurrently and is simply not
/// executed. The row is removed BEFORE dispatch so a hanging or failing
/// moderation call can never fire twice. No error leaves `run`: the
/// runtime's timer loop must never see one.
pub struct CommandExecutor<G, A> {
    store: JobStore,
    gateway: G,
    audit: A,
}

impl<G: ModerationGateway, A: AuditSink> CommandExecutor<G, A> {
    pub fn new(store: JobStore, gateway: G, audit: A) -> Self {
        Self {
            store,
            gateway,
            audit,
        }
    }

    async fn record_audit(&self, event: AuditEvent) {
        if let Err(e) = self.audit.record(&event).await {
            log!(" [exec] failed to send mod log record for job {}: {e}", event.job_id);
        }
    }
}

impl<G: ModerationGateway, A: AuditSink> JobRunner for CommandExecutor<G, A> {
    async fn run(&self, job: ScheduledJob) {
        // Re-read rather than trusting the handed-over row: a concurrent
        // delete is the authoritative signal that this job is cancelled.
        let current = match self.store.get(&job.id).await {
            Ok(row) => row,
            Err(e) => {
                log!(" [exec] store read failed for job {}: {e}", job.id);
                return;
            }
        };

        let Some(job) = current else {
            log!(" [exec] job {} already deleted, skipping execution", job.id);
            return;
        };

        // The allow-list is re-checked at execution time in case the row
        // outlived a command it was scheduled against.
        let Some(command) = ModCommand::parse(&job.command) else {
            log!(
                " [exec] job {} not executed: command '{}' is not supported",
                job.id,
                job.command
            );
            self.record_audit(AuditEvent::for_job("Execution", &job).with_note(format!(
                "Failed Execution: the provided '{}' command is not a supported command for scheduling and execution is not possible.",
                job.command
            )))
            .await;
            if let Err(e) = self.store.remove(&job.id).await {
                log!(" [exec] failed to delete job {}: {e}", job.id);
            }
            return;
        };

        // Remove before dispatch: if the moderation call hangs or fails,
        // the job must still never fire a second time.
        match self.store.remove(&job.id).await {
            Ok(true) => {}
            Ok(false) => {
                log!(" [exec] job {} deleted concurrently, skipping execution", job.id);
                return;
            }
            Err(e) => {
                log!(" [exec] failed to delete job {} before dispatch, deferring: {e}", job.id);
                return;
            }
        }

        log!(" [exec] executing job {} ({})", job.id, job.command);

        let event = match command
            .execute(&self.gateway, job.parameters.as_deref())
            .await
        {
            Ok(()) => AuditEvent::for_job("Execution", &job),
            Err(e) => {
                log!(" [exec] job {} dispatch failed: {e}", job.id);
                AuditEvent::for_job("Execution", &job)
                    .with_note(format!("Failed Execution: {e}"))
            }
        };

        self.record_audit(event).await;
    }
}
