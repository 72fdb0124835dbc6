pub mod ids;
pub mod lane;
pub mod task;
pub mod message;
pub mod record;
pub mod events;

pub use ids::{JobId, DeliveryTag, ConsumerTag};
pub use lane::{Lane, SMALL_LANE_CAP};
pub use task::{TaskPayload, TaskKind};
pub use message::{DispatchMessage, Delivery};
pub use record::{JobRecord, JobStatus};
pub use events::JobEvent;
