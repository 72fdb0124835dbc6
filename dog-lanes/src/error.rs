use thiserror::Error;

use crate::types::{DeliveryTag, JobId};

/// Result type for lane operations
pub type LaneResult<T> = Result<T, LaneError>;

/// Errors raised while storing, dispatching or running jobs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaneError {
    /// The job id referenced by a dispatch message is unknown to the job store
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    /// The job's task payload cannot be parsed or carries an unusable `n`
    #[error("Malformed payload for job {job_id}: {reason}")]
    MalformedPayload { job_id: JobId, reason: String },

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Broker connection is closed")]
    Disconnected,

    #[error("Unknown delivery: {0}")]
    UnknownDelivery(DeliveryTag),

    #[error("Worker shutdown")]
    WorkerShutdown,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LaneError {
    pub fn malformed(job_id: &JobId, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            job_id: job_id.clone(),
            reason: reason.into(),
        }
    }

    /// Whether redelivering the same message could succeed.
    ///
    /// Missing jobs and bad payloads are hard failures: the message is
    /// acknowledged and dropped instead of being requeued.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::JobNotFound(_) | Self::MalformedPayload { .. })
    }
}

impl From<serde_json::Error> for LaneError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_failures_are_not_retryable() {
        let id = JobId::from("job-1");
        assert!(!LaneError::JobNotFound(id.clone()).is_retryable());
        assert!(!LaneError::malformed(&id, "missing n").is_retryable());
        assert!(LaneError::Internal("boom".to_string()).is_retryable());
    }

    #[test]
    fn malformed_message_names_job_and_reason() {
        let err = LaneError::malformed(&JobId::from("abc"), "missing field `n`");
        assert_eq!(err.to_string(), "Malformed payload for job abc: missing field `n`");
    }
}
