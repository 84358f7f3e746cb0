use serde::{Deserialize, Serialize};

/// Default number of shares opened at once by the batch runner
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Tunables of the share pipeline
///
/// Deserializes from a partial table; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How far in the future a signature's creation time may be, in seconds
    pub clock_skew_secs: u64,
    /// Refuse shares past their expire time
    pub enforce_expiry: bool,
    /// Upper bound on shares processed concurrently by a batch
    pub max_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            clock_skew_secs: 0,
            enforce_expiry: true,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}
