use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{JobId, JobStatus};

/// Lifecycle events emitted by the job store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobEvent {
    /// Job was recorded in the CREATED state
    Created {
        job_id: JobId,
        at: DateTime<Utc>,
    },

    /// Job moved to STARTED
    Started {
        job_id: JobId,
        at: DateTime<Utc>,
    },

    /// Job moved to COMPLETED; carries the result when it was stored in the same write
    Completed {
        job_id: JobId,
        result: Option<String>,
        at: DateTime<Utc>,
    },
}

impl JobEvent {
    /// Get event type name as string
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Started { .. } => "started",
            Self::Completed { .. } => "completed",
        }
    }

    /// Get the job ID from any event
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Created { job_id, .. } => job_id,
            Self::Started { job_id, .. } => job_id,
            Self::Completed { job_id, .. } => job_id,
        }
    }

    /// Status the job holds once this event has happened
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Created { .. } => JobStatus::Created,
            Self::Started { .. } => JobStatus::Started,
            Self::Completed { .. } => JobStatus::Completed,
        }
    }

    /// Get the timestamp from any event
    pub fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::Created { at, .. } => at,
            Self::Started { at, .. } => at,
            Self::Completed { at, .. } => at,
        }
    }
}
