use serde::{Deserialize, Serialize};

use super::{JobId, Lane};
use crate::{LaneError, LaneResult};

/// Workload descriptor carried in a job's `task` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPayload {
    /// Cost parameter of the workload
    pub n: i64,
}

impl TaskPayload {
    pub fn new(n: i64) -> Self {
        Self { n }
    }

    /// Parse a job's task payload and return its `n`.
    ///
    /// `n` must be a JSON integer of at least 1; anything else is a malformed payload.
    pub fn parse(job_id: &JobId, task: &str) -> LaneResult<u64> {
        let payload: TaskPayload = serde_json::from_str(task)
            .map_err(|e| LaneError::malformed(job_id, e.to_string()))?;

        u64::try_from(payload.n)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| LaneError::malformed(job_id, format!("n must be >= 1, got {}", payload.n)))
    }

    /// Serialize to the JSON stored in a job record
    pub fn to_json(&self) -> LaneResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Task kinds known to the dispatcher, each statically routed to one lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    SmallTask,
    LargeTask,
}

impl TaskKind {
    /// Every task kind, in routing-table order
    pub fn all() -> &'static [TaskKind] {
        &[Self::SmallTask, Self::LargeTask]
    }

    /// Wire name of the task
    pub fn name(self) -> &'static str {
        match self {
            Self::SmallTask => "small_task",
            Self::LargeTask => "large_task",
        }
    }

    /// Routing table: the lane whose workers run this task
    pub fn lane(self) -> Lane {
        match self {
            Self::SmallTask => Lane::Small,
            Self::LargeTask => Lane::Large,
        }
    }

    /// The task kind bound to a lane
    pub fn for_lane(lane: Lane) -> Self {
        match lane {
            Lane::Small => Self::SmallTask,
            Lane::Large => Self::LargeTask,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small_task" => Ok(Self::SmallTask),
            "large_task" => Ok(Self::LargeTask),
            _ => Err(format!("Unknown task: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> JobId {
        JobId::from("job-1")
    }

    #[test]
    fn parses_n_and_ignores_extra_fields() {
        assert_eq!(TaskPayload::parse(&id(), r#"{"n": 5}"#).unwrap(), 5);
        assert_eq!(TaskPayload::parse(&id(), r#"{"n": 7, "label": "x"}"#).unwrap(), 7);
    }

    #[test]
    fn rejects_unusable_payloads() {
        for task in [
            "not json",
            "{}",
            r#"{"n": "5"}"#,
            r#"{"n": 2.5}"#,
            r#"{"n": 0}"#,
            r#"{"n": -3}"#,
            "null",
        ] {
            let err = TaskPayload::parse(&id(), task).unwrap_err();
            assert!(
                matches!(err, LaneError::MalformedPayload { .. }),
                "expected malformed payload for {task}, got {err:?}"
            );
        }
    }

    #[test]
    fn routing_table_is_static() {
        assert_eq!(TaskKind::SmallTask.lane(), Lane::Small);
        assert_eq!(TaskKind::LargeTask.lane(), Lane::Large);
        for kind in TaskKind::all() {
            assert_eq!(TaskKind::for_lane(kind.lane()), *kind);
            assert_eq!(kind.name().parse::<TaskKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn task_kind_uses_wire_names() {
        assert_eq!(serde_json::to_string(&TaskKind::LargeTask).unwrap(), "\"large_task\"");
        assert!("fib".parse::<TaskKind>().is_err());
    }
}
