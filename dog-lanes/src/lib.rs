//! # dog-lanes: Two-Lane Job Execution
//!
//! Jobs are recorded in a [`JobStore`], referenced by id in a dispatch message,
//! and routed by task kind onto one of two lanes. Each lane has its own queue
//! and its own worker pool, so a backlog of large jobs never delays small ones.
//!
//! - **small** lane: `n` is capped at 20
//! - **large** lane: `n` is used as given
//!
//! A worker runs each job through a [`JobRunner`]: mark STARTED, compute,
//! mark COMPLETED with the result. Delivery is at-least-once and every store
//! write is idempotent, so a redelivered job simply replays.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dog_lanes::prelude::*;
//!
//! # async fn demo() -> LaneResult<()> {
//! let store = Arc::new(MemoryJobStore::new());
//! let broker = MemoryBroker::connect(&BrokerConfig::default());
//!
//! let dispatcher = Dispatcher::new(store.clone(), broker.clone());
//! let pool = dispatcher.start();
//!
//! let job_id = dispatcher.submit_new(TaskKind::SmallTask, &TaskPayload::new(25)).await?;
//! // ... later
//! let job = store.get_job(&job_id).await?;
//! println!("{} -> {:?}", job.status, job.result);
//!
//! pool.shutdown().await?;
//! broker.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod types;
pub mod error;
pub mod workload;
pub mod store;
pub mod broker;
pub mod codec;
pub mod runner;
pub mod dispatcher;
pub mod config;
pub mod observability;

pub use types::{
    JobId, DeliveryTag, ConsumerTag, Lane, SMALL_LANE_CAP, TaskPayload, TaskKind,
    DispatchMessage, Delivery, JobRecord, JobStatus, JobEvent,
};
pub use error::{LaneError, LaneResult};
pub use store::JobStore;
pub use broker::{Broker, BrokerConfig};
pub use codec::MessageCodec;
pub use codec::json::JsonCodec;
pub use runner::JobRunner;
pub use dispatcher::{Dispatcher, WorkerHandle, LanePool};
pub use config::{LanesConfig, LaneSettings};
pub use observability::{LaneMetrics, LaneSnapshot};

pub use store::memory::MemoryJobStore;
pub use broker::memory::MemoryBroker;

/// Everything needed to wire up lanes in an application
pub mod prelude {
    pub use crate::{
        Dispatcher, JobRunner, JobStore, Broker, LanePool, WorkerHandle,
    };

    pub use crate::{
        JobId, JobRecord, JobStatus, Lane, TaskKind, TaskPayload, LaneError, LaneResult,
    };

    pub use crate::{BrokerConfig, LanesConfig};

    pub use crate::{MemoryJobStore, MemoryBroker};
}
