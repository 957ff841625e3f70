//! Worker pool pulling jobs off the durable queue.
//!
//! Workers live outside any request's lifetime. A job failure is logged and
//! acknowledged as failed; it never affects sibling jobs or the request path
//! that enqueued it.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::AppCore;
use crate::jobs;
use crate::models::Job;

const QUEUE_POLL_INTERVAL_MS: u64 = 100;

pub struct JobExecutor {
    core: Arc<AppCore>,
    num_workers: usize,
    running: Arc<Mutex<bool>>,
}

impl JobExecutor {
    pub fn new(core: Arc<AppCore>, num_workers: usize) -> Self {
        Self {
            core,
            num_workers,
            running: Arc::new(Mutex::new(false)),
        }
    }

    pub async fn start(&self) {
        if !self.try_start().await {
            return;
        }

        self.recover_stalled_jobs();
        self.spawn_workers(self.num_workers).await;
    }

    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        *running = false;
    }

    async fn try_start(&self) -> bool {
        let mut running = self.running.lock().await;
        if *running {
            return false;
        }
        *running = true;
        true
    }

    fn recover_stalled_jobs(&self) {
        match self.core.scheduler.recover_stalled_jobs() {
            Ok(0) => {}
            Ok(recovered) => info!(recovered, "Requeued stalled jobs"),
            Err(e) => error!(error = %e, "Failed to recover stalled jobs"),
        }
    }

    async fn spawn_workers(&self, num_workers: usize) {
        info!(num_workers, "Starting job workers");

        for worker_id in 0..num_workers {
            let worker = JobWorker {
                id: worker_id,
                core: self.core.clone(),
                running: self.running.clone(),
            };

            tokio::spawn(async move {
                worker.run_worker_loop().await;
            });
        }
    }
}

struct JobWorker {
    id: usize,
    core: Arc<AppCore>,
    running: Arc<Mutex<bool>>,
}

impl JobWorker {
    async fn run_worker_loop(&self) {
        info!(worker_id = self.id, "Worker started");

        while *self.running.lock().await {
            if let Err(e) = self.process_next_job().await {
                error!(worker_id = self.id, error = %e, "Worker error");
                tokio::time::sleep(tokio::time::Duration::from_millis(QUEUE_POLL_INTERVAL_MS))
                    .await;
            }
        }

        info!(worker_id = self.id, "Worker stopped");
    }

    async fn process_next_job(&self) -> Result<()> {
        let job = self.core.scheduler.pop_job().await?;

        debug!(
            worker_id = self.id,
            job_id = %job.id,
            kind = job.payload.kind(),
            attempt = job.attempts,
            "Processing job"
        );

        self.ack(&job, jobs::run_job(&self.core, &job).await);
        Ok(())
    }

    /// One attempt per delivery: success and failure are both acknowledged;
    /// redelivery is the queue's stall recovery, never a retry loop here.
    fn ack(&self, job: &Job, result: Result<String>) {
        match result {
            Ok(outcome) => {
                if let Err(e) = self.core.scheduler.complete_job(&job.id, outcome.clone()) {
                    warn!(job_id = %job.id, error = %e, "Failed to persist job completion");
                } else {
                    info!(job_id = %job.id, outcome = %outcome, "Job completed");
                }
            }
            Err(error) => {
                if let Err(e) = self.core.scheduler.fail_job(&job.id, error.to_string()) {
                    warn!(job_id = %job.id, error = %e, "Failed to persist job failure");
                }
                error!(job_id = %job.id, error = %error, "Job execution failed");
            }
        }
    }
}
