use serde::{Deserialize, Serialize};

/// Ceiling applied to `n` on the small lane
pub const SMALL_LANE_CAP: u64 = 20;

/// Execution lane. Each lane owns a queue and an independent worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    /// Cheap jobs; `n` is capped so oversized requests cannot starve the lane
    Small,

    /// Expensive jobs; `n` is used as given
    Large,
}

impl Lane {
    /// Both lanes, small first
    pub fn all() -> &'static [Lane] {
        &[Self::Small, Self::Large]
    }

    /// Name of the broker queue backing this lane
    pub fn queue_name(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Large => "large",
        }
    }

    /// Effective `n` to compute with on this lane
    pub fn classify(self, n: u64) -> u64 {
        self.classify_with(n, SMALL_LANE_CAP)
    }

    /// Same as [`Lane::classify`] with a deployment-provided small-lane cap
    pub fn classify_with(self, n: u64, small_cap: u64) -> u64 {
        match self {
            Self::Small => n.min(small_cap),
            Self::Large => n,
        }
    }
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.queue_name())
    }
}

impl std::str::FromStr for Lane {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "large" => Ok(Self::Large),
            _ => Err(format!("Invalid lane: {}", s)),
        }
    }
}
