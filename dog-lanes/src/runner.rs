use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::{
    LaneResult, LaneError, JobId, Lane, TaskPayload, SMALL_LANE_CAP,
    store::JobStore,
    workload,
};

/// Runs one job to completion on behalf of a lane.
///
/// The sequence is: fetch, parse, mark STARTED, compute, mark COMPLETED with
/// the result. Each store write is idempotent, so replaying the sequence for a
/// redelivered job is safe.
#[derive(Clone)]
pub struct JobRunner {
    store: Arc<dyn JobStore>,
    lane: Lane,
    small_cap: u64,
}

impl JobRunner {
    pub fn new(store: Arc<dyn JobStore>, lane: Lane) -> Self {
        Self {
            store,
            lane,
            small_cap: SMALL_LANE_CAP,
        }
    }

    /// Override the small-lane ceiling
    pub fn with_small_cap(mut self, small_cap: u64) -> Self {
        self.small_cap = small_cap;
        self
    }

    pub fn lane(&self) -> Lane {
        self.lane
    }

    /// Run a job and return its stringified result.
    ///
    /// Fails with `JobNotFound` or `MalformedPayload` before touching the store.
    #[instrument(skip(self), fields(lane = %self.lane))]
    pub async fn run(&self, job_id: &JobId) -> LaneResult<String> {
        let job = self.store.get_job(job_id).await?;
        let n = TaskPayload::parse(job_id, &job.task)?;

        let effective_n = self.lane.classify_with(n, self.small_cap);

        self.store.set_job_started(job_id).await?;
        debug!(%job_id, n, effective_n, "job started");

        let value = tokio::task::spawn_blocking(move || workload::fib(effective_n))
            .await
            .map_err(|e| LaneError::Internal(format!("workload aborted: {}", e)))?
            .ok_or_else(|| LaneError::Internal(format!("workload undefined for n = {}", effective_n)))?;

        let result = value.to_string();
        self.store.finish(job_id, result.clone()).await?;

        info!(%job_id, effective_n, %result, "job completed");
        Ok(result)
    }
}
