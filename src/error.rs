use thiserror::Error;

/// Raised for sprint definitions that make the pace arithmetic meaningless.
/// These indicate a misconfigured sprint upstream, not missing data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SprintError {
    #[error("sprint `{name}` has non-positive duration ({duration_days} days)")]
    NonPositiveDuration { name: String, duration_days: i64 },

    #[error("sprint `{name}` has identical start and target weight ({weight} kg)")]
    NoWeightChange { name: String, weight: f64 },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store I/O failed for `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid cache key `{0}`")]
    InvalidKey(String),
}

impl StoreError {
    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            key: key.into(),
            source,
        }
    }
}
