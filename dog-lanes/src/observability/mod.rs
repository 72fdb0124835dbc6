pub mod metrics;

pub use metrics::{LaneMetrics, LaneSnapshot};
