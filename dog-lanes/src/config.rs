//! Runtime configuration, read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `RABBITMQ_USER` | `guest` |
//! | `RABBITMQ_HOST` | `localhost` |
//! | `LANES_SMALL_CONCURRENCY` | `4` |
//! | `LANES_LARGE_CONCURRENCY` | `1` |
//! | `LANES_SMALL_CAP` | `20` |

use std::env;
use std::str::FromStr;

use crate::{BrokerConfig, Lane, SMALL_LANE_CAP};

/// Worker settings for one lane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneSettings {
    /// Number of workers pulling from the lane's queue
    pub concurrency: usize,

    /// Ceiling on `n`; only honored by the small lane
    pub cap: u64,
}

/// Configuration for the lanes and their broker connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanesConfig {
    pub broker: BrokerConfig,
    pub small: LaneSettings,
    pub large: LaneSettings,
}

impl Default for LanesConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            small: LaneSettings {
                concurrency: 4,
                cap: SMALL_LANE_CAP,
            },
            large: LaneSettings {
                concurrency: 1,
                cap: SMALL_LANE_CAP,
            },
        }
    }
}

impl LanesConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let small_cap = parse_or(lookup("LANES_SMALL_CAP"), defaults.small.cap);

        Self {
            broker: BrokerConfig {
                user: lookup("RABBITMQ_USER").unwrap_or(defaults.broker.user),
                host: lookup("RABBITMQ_HOST").unwrap_or(defaults.broker.host),
            },
            small: LaneSettings {
                concurrency: parse_or(lookup("LANES_SMALL_CONCURRENCY"), defaults.small.concurrency).max(1),
                cap: small_cap,
            },
            large: LaneSettings {
                concurrency: parse_or(lookup("LANES_LARGE_CONCURRENCY"), defaults.large.concurrency).max(1),
                cap: small_cap,
            },
        }
    }

    /// Settings for one lane
    pub fn lane(&self, lane: Lane) -> LaneSettings {
        match lane {
            Lane::Small => self.small,
            Lane::Large => self.large,
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
