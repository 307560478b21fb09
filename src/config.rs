use crate::trend::{DEFAULT_ALPHA, DEFAULT_LOOKBACK_DAYS};

pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Knobs for the trend cache. Production call sites use the defaults; tests
/// override them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendConfig {
    pub lookback_days: i64,
    pub alpha: f64,
    pub retention_days: i64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            alpha: DEFAULT_ALPHA,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}
