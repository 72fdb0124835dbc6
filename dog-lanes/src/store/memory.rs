use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use crate::{
    LaneResult, LaneError, JobId, JobRecord, JobEvent,
    store::{JobStore, BoxStream},
};

/// In-memory job store for testing and development
#[derive(Clone)]
pub struct MemoryJobStore {
    /// Job records indexed by id
    pub(crate) jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,

    /// Event broadcaster for observability
    pub(crate) event_broadcaster: broadcast::Sender<JobEvent>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        let (event_broadcaster, _) = broadcast::channel(1000);

        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            event_broadcaster,
        }
    }

    /// Insert a record as-is, replacing any record with the same id
    pub fn insert(&self, record: JobRecord) {
        self.jobs.write().insert(record.id.clone(), record);
    }

    /// Number of stored jobs
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Copy of every stored record
    pub fn snapshot(&self) -> Vec<JobRecord> {
        self.jobs.read().values().cloned().collect()
    }

    /// Lifecycle event stream (boxed for stable Rust)
    pub fn event_stream(&self) -> BoxStream<JobEvent> {
        let receiver = self.event_broadcaster.subscribe();
        use tokio_stream::{wrappers::BroadcastStream, StreamExt};
        let stream = BroadcastStream::new(receiver)
            .filter_map(|result| result.ok());

        Box::pin(stream)
    }

    fn emit(&self, event: JobEvent) {
        debug!(job_id = %event.job_id(), at = %event.timestamp(), "job {}", event.event_name());
        let _ = self.event_broadcaster.send(event);
    }

    /// Apply a mutation to one record under the write lock
    fn update<T>(&self, id: &JobId, f: impl FnOnce(&mut JobRecord) -> T) -> LaneResult<T> {
        let mut jobs = self.jobs.write();
        let record = jobs.get_mut(id).ok_or_else(|| LaneError::JobNotFound(id.clone()))?;
        Ok(f(record))
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, task: String) -> LaneResult<JobRecord> {
        let record = JobRecord::new(JobId::new(), task);
        self.jobs.write().insert(record.id.clone(), record.clone());

        self.emit(JobEvent::Created {
            job_id: record.id.clone(),
            at: record.created_at,
        });

        Ok(record)
    }

    async fn get_job(&self, id: &JobId) -> LaneResult<JobRecord> {
        let jobs = self.jobs.read();
        jobs.get(id)
            .cloned()
            .ok_or_else(|| LaneError::JobNotFound(id.clone()))
    }

    async fn set_job_started(&self, id: &JobId) -> LaneResult<()> {
        if self.update(id, |record| record.start())? {
            self.emit(JobEvent::Started {
                job_id: id.clone(),
                at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn set_job_completed(&self, id: &JobId) -> LaneResult<()> {
        let changed = self.update(id, |record| {
            record.complete().then(|| record.result.clone())
        })?;

        if let Some(result) = changed {
            self.emit(JobEvent::Completed {
                job_id: id.clone(),
                result,
                at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn set_job_result(&self, id: &JobId, result: String) -> LaneResult<()> {
        self.update(id, |record| record.set_result(result))
    }

    async fn finish(&self, id: &JobId, result: String) -> LaneResult<()> {
        let changed = self.update(id, |record| {
            record.set_result(result.clone());
            record.complete()
        })?;

        if changed {
            self.emit(JobEvent::Completed {
                job_id: id.clone(),
                result: Some(result),
                at: Utc::now(),
            });
        }
        Ok(())
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobStatus;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryJobStore::new();
        let record = store.create_job(r#"{"n": 5}"#.to_string()).await.unwrap();

        let fetched = store.get_job(&record.id).await.unwrap();
        assert_eq!(fetched.status, JobStatus::Created);
        assert_eq!(fetched.task, r#"{"n": 5}"#);
        assert!(fetched.result.is_none());
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let store = MemoryJobStore::new();
        let missing = JobId::from("missing");

        assert_eq!(store.get_job(&missing).await, Err(LaneError::JobNotFound(missing.clone())));
        assert!(store.set_job_started(&missing).await.is_err());
        assert!(store.set_job_result(&missing, "1".to_string()).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_status_writes_are_idempotent() {
        let store = MemoryJobStore::new();
        let id = store.create_job("{}".to_string()).await.unwrap().id;

        store.set_job_started(&id).await.unwrap();
        let once = store.get_job(&id).await.unwrap();
        store.set_job_started(&id).await.unwrap();
        assert_eq!(store.get_job(&id).await.unwrap(), once);

        store.set_job_completed(&id).await.unwrap();
        let once = store.get_job(&id).await.unwrap();
        store.set_job_completed(&id).await.unwrap();
        assert_eq!(store.get_job(&id).await.unwrap(), once);
    }

    #[tokio::test]
    async fn test_started_after_completed_does_not_regress() {
        let store = MemoryJobStore::new();
        let id = store.create_job("{}".to_string()).await.unwrap().id;

        store.finish(&id, "34".to_string()).await.unwrap();
        store.set_job_started(&id).await.unwrap();

        let record = store.get_job(&id).await.unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.result.as_deref(), Some("34"));
    }

    #[tokio::test]
    async fn test_finish_sets_status_and_result_together() {
        let store = MemoryJobStore::new();
        let id = store.create_job("{}".to_string()).await.unwrap().id;
        store.set_job_started(&id).await.unwrap();
        store.finish(&id, "2".to_string()).await.unwrap();

        let record = store.get_job(&id).await.unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.result.as_deref(), Some("2"));
        assert!(record.is_consistent());

        // overwrite on replay
        store.finish(&id, "3".to_string()).await.unwrap();
        assert_eq!(store.get_job(&id).await.unwrap().result.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_events_follow_lifecycle() {
        use tokio_stream::StreamExt;

        let store = MemoryJobStore::new();
        let mut events = store.event_stream();

        let id = store.create_job("{}".to_string()).await.unwrap().id;
        store.set_job_started(&id).await.unwrap();
        store.set_job_started(&id).await.unwrap();
        store.finish(&id, "1".to_string()).await.unwrap();

        let names: Vec<&str> = [
            events.next().await.unwrap(),
            events.next().await.unwrap(),
            events.next().await.unwrap(),
        ]
        .iter()
        .map(|e| e.event_name())
        .collect();
        assert_eq!(names, vec!["created", "started", "completed"]);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_events_are_logged_with_timestamp() {
        let store = MemoryJobStore::new();
        let record = store.create_job("{}".to_string()).await.unwrap();
        store.set_job_started(&record.id).await.unwrap();

        assert!(logs_contain("job created"));
        assert!(logs_contain("job started"));
        assert!(logs_contain(&record.created_at.to_string()));
    }
}
