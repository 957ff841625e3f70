//! Job queue storage - three-table durable queue.
//!
//! Uses separate tables for pending/processing/completed so popping the next
//! job is O(1). Pending uses a composite key "{priority:020}:{job_id}" for
//! uniqueness and correct FIFO ordering (priority is the enqueue timestamp).
//!
//! Delivery is at-least-once: a job sits in `processing` from pop until the
//! worker acknowledges it, and anything stranded there across a crash is
//! requeued by stall recovery. Job bodies must tolerate re-execution.

use anyhow::{Result, anyhow};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

const PENDING: TableDefinition<&str, &[u8]> = TableDefinition::new("jobs_pending");
const PROCESSING: TableDefinition<&str, &[u8]> = TableDefinition::new("jobs_processing");
const COMPLETED: TableDefinition<&str, &[u8]> = TableDefinition::new("jobs_completed");

/// Pure storage layer for the job queue - only handles data persistence
#[derive(Clone)]
pub struct JobQueueStorage {
    db: Arc<Database>,
    notify: Arc<Notify>,
    /// Counter tracking pending jobs, used for reliable wakeup
    pending_count: Arc<AtomicUsize>,
}

impl JobQueueStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(PENDING)?;
        write_txn.open_table(PROCESSING)?;
        write_txn.open_table(COMPLETED)?;
        write_txn.commit()?;

        // Count jobs left over from a previous run so waiters see them
        let pending_count = {
            let read_txn = db.begin_read()?;
            let pending = read_txn.open_table(PENDING)?;
            pending.len()? as usize
        };

        Ok(Self {
            db,
            notify: Arc::new(Notify::new()),
            pending_count: Arc::new(AtomicUsize::new(pending_count)),
        })
    }

    /// Insert a job into the pending queue.
    pub fn insert_pending(&self, priority: u64, job_id: &str, data: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PENDING)?;
            let key = format!("{:020}:{}", priority, job_id);
            table.insert(key.as_str(), data)?;
        }
        write_txn.commit()?;
        self.pending_count.fetch_add(1, Ordering::SeqCst);
        // notify_waiters() so no wakeup is lost when several workers idle
        self.notify.notify_waiters();
        Ok(())
    }

    /// Atomically pop the first pending job and move it to processing.
    ///
    /// The fallible callback updates the job bytes (e.g. stamps the started
    /// transition) inside the same transaction; if it errors the transaction
    /// aborts and the job stays pending.
    pub fn atomic_pop_pending<F>(&self, on_data: F) -> Result<Option<Vec<u8>>>
    where
        F: FnOnce(&[u8]) -> Result<Vec<u8>>,
    {
        let write_txn = self.db.begin_write()?;

        let result = {
            let mut pending = write_txn.open_table(PENDING)?;

            let first_entry = if let Some(first) = pending.first()? {
                let key_str = first.0.value().to_string();
                let data = first.1.value().to_vec();
                let job_id = key_str
                    .split(':')
                    .nth(1)
                    .ok_or_else(|| anyhow!("Invalid composite key format: {}", key_str))?
                    .to_string();
                Some((key_str, job_id, data))
            } else {
                None
            };

            if let Some((key, job_id, data)) = first_entry {
                pending.remove(key.as_str())?;

                let updated_data = match on_data(&data) {
                    Ok(data) => data,
                    Err(e) => {
                        drop(pending);
                        write_txn.abort()?;
                        return Err(e);
                    }
                };

                let mut processing = write_txn.open_table(PROCESSING)?;
                processing.insert(job_id.as_str(), updated_data.as_slice())?;

                Some(updated_data)
            } else {
                None
            }
        };

        if result.is_some() {
            write_txn.commit()?;
            self.pending_count.fetch_sub(1, Ordering::SeqCst);
        } else {
            write_txn.abort()?;
        }

        Ok(result)
    }

    /// Move an acknowledged job from processing to completed, overwriting its
    /// payload with the final state (succeeded or failed).
    pub fn move_to_completed(&self, job_id: &str, data: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut processing = write_txn.open_table(PROCESSING)?;
            processing.remove(job_id)?;
        }
        {
            let mut completed = write_txn.open_table(COMPLETED)?;
            completed.insert(job_id, data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Move a stranded job from processing back to pending in one transaction.
    ///
    /// This is the redelivery path: a worker crash between pop and
    /// acknowledgment leaves the job here, and requeueing it re-delivers.
    pub fn requeue_processing(&self, priority: u64, job_id: &str, data: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut processing = write_txn.open_table(PROCESSING)?;
            processing.remove(job_id)?;
        }
        {
            let mut pending = write_txn.open_table(PENDING)?;
            let key = format!("{:020}:{}", priority, job_id);
            pending.insert(key.as_str(), data)?;
        }
        write_txn.commit()?;
        self.pending_count.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
        Ok(())
    }

    /// Get a job's bytes from the processing table.
    pub fn get_from_processing(&self, job_id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let processing = read_txn.open_table(PROCESSING)?;

        if let Some(data) = processing.get(job_id)? {
            Ok(Some(data.value().to_vec()))
        } else {
            Ok(None)
        }
    }

    /// Look a job up in any table; this backs handle status polling.
    pub fn get_from_any_table(&self, job_id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;

        let processing = read_txn.open_table(PROCESSING)?;
        if let Some(data) = processing.get(job_id)? {
            return Ok(Some(data.value().to_vec()));
        }

        let completed = read_txn.open_table(COMPLETED)?;
        if let Some(data) = completed.get(job_id)? {
            return Ok(Some(data.value().to_vec()));
        }

        // Pending keys are composite, so this one needs a scan
        let pending = read_txn.open_table(PENDING)?;
        for entry in pending.iter()? {
            let (key, value) = entry?;
            let key_str = key.value();
            if let Some(id) = key_str.split(':').nth(1)
                && id == job_id
            {
                return Ok(Some(value.value().to_vec()));
            }
        }

        Ok(None)
    }

    /// All jobs currently marked processing.
    pub fn get_all_processing(&self) -> Result<Vec<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let processing = read_txn.open_table(PROCESSING)?;
        let mut jobs = Vec::new();

        for entry in processing.iter()? {
            let (_, value) = entry?;
            jobs.push(value.value().to_vec());
        }

        Ok(jobs)
    }

    /// All completed jobs (succeeded or failed).
    pub fn get_all_completed(&self) -> Result<Vec<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let completed = read_txn.open_table(COMPLETED)?;
        let mut jobs = Vec::new();

        for entry in completed.iter()? {
            let (_, value) = entry?;
            jobs.push(value.value().to_vec());
        }

        Ok(jobs)
    }

    /// Wait until a pending job is available.
    ///
    /// Checks the pending count before parking so a notification that fired
    /// before the wait started is not missed.
    pub async fn wait_for_job(&self) {
        if self.pending_count.load(Ordering::SeqCst) > 0 {
            return;
        }
        self.notify.notified().await;
    }

    pub fn has_pending_jobs(&self) -> bool {
        self.pending_count.load(Ordering::SeqCst) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup_test_queue() -> (JobQueueStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        let queue = JobQueueStorage::new(db).unwrap();
        (queue, temp_dir)
    }

    #[test]
    fn test_fifo_ordering_by_priority() {
        let (queue, _temp_dir) = setup_test_queue();

        queue.insert_pending(300, "job-late", b"late").unwrap();
        queue.insert_pending(100, "job-early", b"early").unwrap();
        queue.insert_pending(200, "job-mid", b"mid").unwrap();

        let popped = queue.atomic_pop_pending(|d| Ok(d.to_vec())).unwrap();
        assert_eq!(popped.unwrap(), b"early");
        let popped = queue.atomic_pop_pending(|d| Ok(d.to_vec())).unwrap();
        assert_eq!(popped.unwrap(), b"mid");
    }

    #[test]
    fn test_atomic_pop_moves_to_processing() {
        let (queue, _temp_dir) = setup_test_queue();

        queue.insert_pending(100, "job-001", b"payload").unwrap();
        let popped = queue.atomic_pop_pending(|d| Ok(d.to_vec())).unwrap();
        assert!(popped.is_some());

        assert!(!queue.has_pending_jobs());
        let processing = queue.get_from_processing("job-001").unwrap();
        assert_eq!(processing.unwrap(), b"payload");
    }

    #[test]
    fn test_pop_callback_error_leaves_job_pending() {
        let (queue, _temp_dir) = setup_test_queue();

        queue.insert_pending(100, "job-001", b"payload").unwrap();
        let result = queue.atomic_pop_pending(|_| Err(anyhow!("boom")));
        assert!(result.is_err());

        // Still retrievable as pending
        let found = queue.get_from_any_table("job-001").unwrap();
        assert_eq!(found.unwrap(), b"payload");
        assert!(queue.get_from_processing("job-001").unwrap().is_none());
    }

    #[test]
    fn test_complete_roundtrip() {
        let (queue, _temp_dir) = setup_test_queue();

        queue.insert_pending(100, "job-001", b"payload").unwrap();
        queue.atomic_pop_pending(|d| Ok(d.to_vec())).unwrap();
        queue.move_to_completed("job-001", b"done").unwrap();

        assert!(queue.get_from_processing("job-001").unwrap().is_none());
        let completed = queue.get_all_completed().unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0], b"done");
    }

    #[test]
    fn test_requeue_processing() {
        let (queue, _temp_dir) = setup_test_queue();

        queue.insert_pending(100, "job-001", b"payload").unwrap();
        queue.atomic_pop_pending(|d| Ok(d.to_vec())).unwrap();

        queue.requeue_processing(100, "job-001", b"payload").unwrap();
        assert!(queue.has_pending_jobs());
        assert!(queue.get_from_processing("job-001").unwrap().is_none());

        let popped = queue.atomic_pop_pending(|d| Ok(d.to_vec())).unwrap();
        assert_eq!(popped.unwrap(), b"payload");
    }

    #[test]
    fn test_get_from_any_table() {
        let (queue, _temp_dir) = setup_test_queue();

        queue.insert_pending(100, "job-001", b"pending").unwrap();
        assert_eq!(queue.get_from_any_table("job-001").unwrap().unwrap(), b"pending");

        queue.atomic_pop_pending(|d| Ok(d.to_vec())).unwrap();
        assert_eq!(
            queue.get_from_any_table("job-001").unwrap().unwrap(),
            b"pending"
        );

        queue.move_to_completed("job-001", b"done").unwrap();
        assert_eq!(queue.get_from_any_table("job-001").unwrap().unwrap(), b"done");

        assert!(queue.get_from_any_table("nonexistent").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wait_for_job() {
        let (queue, _temp_dir) = setup_test_queue();

        let queue_clone = queue.clone();
        let wait_handle = tokio::spawn(async move {
            tokio::select! {
                _ = queue_clone.wait_for_job() => true,
                _ = tokio::time::sleep(tokio::time::Duration::from_millis(100)) => false,
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        queue.insert_pending(100, "job-001", b"new job").unwrap();

        let was_notified = wait_handle.await.unwrap();
        assert!(was_notified);
    }
}
