//! Job scheduler - typed front of the durable queue.
//!
//! Enqueue is fire-and-forget for the caller: the returned job id is a
//! handle for status polling, never a channel back to the result. Delivery
//! is at-least-once; stall recovery requeues jobs stranded in processing by
//! a crashed worker, which is the queue's sole redelivery mechanism.

use anyhow::Result;
use mindloom_storage::JobQueueStorage;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::{Job, JobPayload, JobStatus};

pub struct JobScheduler {
    queue: JobQueueStorage,
    stall_timeout: Duration,
}

impl JobScheduler {
    pub fn new(queue: JobQueueStorage, stall_timeout: Duration) -> Self {
        Self {
            queue,
            stall_timeout,
        }
    }

    /// Enqueue a job and return its handle id.
    pub fn enqueue(&self, payload: JobPayload) -> Result<String> {
        let job = Job::new(payload);
        let job_id = job.id.clone();

        let serialized = serde_json::to_vec(&job)?;
        self.queue
            .insert_pending(job.priority(), &job_id, &serialized)?;

        info!(job_id = %job_id, kind = job.payload.kind(), "Job enqueued");
        Ok(job_id)
    }

    /// Pop the next job, waiting until one is available.
    pub async fn pop_job(&self) -> Result<Job> {
        loop {
            match self.try_pop_job()? {
                Some(job) => return Ok(job),
                None => {
                    self.queue.wait_for_job().await;
                }
            }
        }
    }

    /// Stamps the started transition inside the pop transaction so a crash
    /// after this point leaves an attributable processing entry.
    fn try_pop_job(&self) -> Result<Option<Job>> {
        let popped = self.queue.atomic_pop_pending(|data| {
            let mut job: Job = serde_json::from_slice(data)?;
            job.start();
            Ok(serde_json::to_vec(&job)?)
        })?;

        match popped {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Acknowledge a job as succeeded.
    pub fn complete_job(&self, job_id: &str, outcome: String) -> Result<()> {
        self.finish_job(job_id, JobStatus::Succeeded, Some(outcome), None)
    }

    /// Acknowledge a job as failed.
    pub fn fail_job(&self, job_id: &str, error: String) -> Result<()> {
        self.finish_job(job_id, JobStatus::Failed, None, Some(error))
    }

    fn finish_job(
        &self,
        job_id: &str,
        status: JobStatus,
        outcome: Option<String>,
        error: Option<String>,
    ) -> Result<()> {
        let Some(data) = self.queue.get_from_processing(job_id)? else {
            warn!(job_id = %job_id, "Acknowledged job missing from processing");
            return Ok(());
        };

        let mut job: Job = serde_json::from_slice(&data)?;
        match status {
            JobStatus::Succeeded => {
                if let Some(outcome) = outcome {
                    job.succeed(outcome);
                }
            }
            JobStatus::Failed => {
                if let Some(error) = error {
                    job.fail(error);
                }
            }
            _ => {}
        }

        let serialized = serde_json::to_vec(&job)?;
        self.queue.move_to_completed(job_id, &serialized)?;
        Ok(())
    }

    /// Look up a job in any lifecycle stage; backs handle polling.
    pub fn get_job(&self, job_id: &str) -> Result<Option<Job>> {
        match self.queue.get_from_any_table(job_id)? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Requeue processing jobs whose start is older than the stall timeout.
    ///
    /// Run at startup: anything a dead worker left behind becomes pending
    /// again and gets redelivered.
    pub fn recover_stalled_jobs(&self) -> Result<usize> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let stall_ms = self.stall_timeout.as_millis() as i64;
        let mut recovered = 0;

        for data in self.queue.get_all_processing()? {
            let mut job: Job = serde_json::from_slice(&data)?;
            let started_at = job.started_at.unwrap_or(0);
            if now_ms - started_at < stall_ms {
                continue;
            }

            job.status = JobStatus::Pending;
            job.started_at = None;

            let serialized = serde_json::to_vec(&job)?;
            self.queue
                .requeue_processing(job.priority(), &job.id, &serialized)?;
            warn!(job_id = %job.id, attempts = job.attempts, "Requeued stalled job");
            recovered += 1;
        }

        Ok(recovered)
    }
}
