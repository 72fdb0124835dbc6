use serde::{Deserialize, Serialize};

use super::{DeliveryTag, JobId, Lane, TaskKind};

/// Message published to a lane queue: one task reference, nothing else
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchMessage {
    /// Task kind, which determines the handler and lane
    pub task: TaskKind,

    /// Job to run; the payload itself stays in the job store
    pub job_id: JobId,
}

impl DispatchMessage {
    pub fn new(task: TaskKind, job_id: JobId) -> Self {
        Self { task, job_id }
    }

    /// Lane this message is routed to
    pub fn lane(&self) -> Lane {
        self.task.lane()
    }
}

/// One delivery of raw message bytes to a consumer
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Tag used to ack or reject this delivery
    pub tag: DeliveryTag,

    /// Queue the message was consumed from
    pub queue: String,

    /// Encoded message body
    pub body: Vec<u8>,

    /// Set when this message was delivered before and not acknowledged
    pub redelivered: bool,
}
