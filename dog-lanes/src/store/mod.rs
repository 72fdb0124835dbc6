pub mod memory;

use async_trait::async_trait;
use futures_core::Stream;
use std::pin::Pin;

use crate::{JobId, JobRecord, LaneResult};

/// Type alias for boxed streams (stable Rust compatible)
pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// Durable record of job state and results.
///
/// Every write is atomic per job id. Status writes are idempotent and never
/// move a job backwards, so a redelivered job can replay the whole runner
/// sequence safely.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Record a new job in the CREATED state (submission boundary)
    async fn create_job(&self, task: String) -> LaneResult<JobRecord>;

    /// Fetch a job; fails with `JobNotFound` if the id is unknown
    async fn get_job(&self, id: &JobId) -> LaneResult<JobRecord>;

    /// Mark a job STARTED; a no-op if it already is (or is past it)
    async fn set_job_started(&self, id: &JobId) -> LaneResult<()>;

    /// Mark a job COMPLETED; a no-op if it already is
    async fn set_job_completed(&self, id: &JobId) -> LaneResult<()>;

    /// Store a job's result, overwriting any prior one
    async fn set_job_result(&self, id: &JobId, result: String) -> LaneResult<()>;

    /// Mark a job COMPLETED and store its result.
    ///
    /// The default issues the two writes in order. Stores that can apply
    /// both at once should, so no reader sees COMPLETED without a result.
    async fn finish(&self, id: &JobId, result: String) -> LaneResult<()> {
        self.set_job_completed(id).await?;
        self.set_job_result(id, result).await
    }
}
