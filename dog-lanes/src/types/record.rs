use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::JobId;

/// Job status lifecycle. Variants are ordered: a job only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Recorded by the submission boundary, not yet picked up
    Created,

    /// A runner has claimed the job and is computing
    Started,

    /// The result has been computed and stored
    Completed,
}

impl JobStatus {
    /// Get the status name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Started => "STARTED",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Job record - durable state kept by the job store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job identifier, immutable
    pub id: JobId,

    /// Serialized task payload (JSON object carrying `n`)
    pub task: String,

    /// Current job status
    pub status: JobStatus,

    /// Stringified result, present only once the job is completed
    pub result: Option<String>,

    /// When the job was created
    pub created_at: DateTime<Utc>,

    /// When the job was last updated
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a new record in the CREATED state
    pub fn new(id: JobId, task: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            task: task.into(),
            status: JobStatus::Created,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance the status, never moving it backwards.
    ///
    /// Returns true when the status actually changed.
    pub fn advance(&mut self, status: JobStatus) -> bool {
        if status <= self.status {
            return false;
        }
        self.status = status;
        self.updated_at = Utc::now();
        true
    }

    /// Mark the job started
    pub fn start(&mut self) -> bool {
        self.advance(JobStatus::Started)
    }

    /// Mark the job completed
    pub fn complete(&mut self) -> bool {
        self.advance(JobStatus::Completed)
    }

    /// Store (or overwrite) the result
    pub fn set_result(&mut self, result: String) {
        self.result = Some(result);
        self.updated_at = Utc::now();
    }

    /// `result` is present exactly when the job is completed
    pub fn is_consistent(&self) -> bool {
        self.result.is_some() == self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order_follows_lifecycle() {
        assert!(JobStatus::Created < JobStatus::Started);
        assert!(JobStatus::Started < JobStatus::Completed);
    }

    #[test]
    fn status_never_regresses() {
        let mut record = JobRecord::new(JobId::from("j"), r#"{"n": 3}"#);
        assert!(record.complete());
        assert!(!record.start());
        assert_eq!(record.status, JobStatus::Completed);
    }

    #[test]
    fn repeated_transitions_are_noops() {
        let mut record = JobRecord::new(JobId::from("j"), r#"{"n": 3}"#);
        assert!(record.start());
        let after_first = record.clone();
        assert!(!record.start());
        assert_eq!(record, after_first);
    }

    #[test]
    fn status_serializes_as_upper_case() {
        let json = serde_json::to_string(&JobStatus::Started).unwrap();
        assert_eq!(json, "\"STARTED\"");
    }

    #[test]
    fn new_record_is_consistent() {
        let record = JobRecord::new(JobId::new(), "{}");
        assert_eq!(record.status, JobStatus::Created);
        assert!(record.result.is_none());
        assert!(record.is_consistent());
    }
}
