//! Weight trend smoothing and sprint pace evaluation for the MBJS health
//! dashboard.

pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod pace;
pub mod readiness;
pub mod report;
pub mod trend;

pub use cache::{CacheStore, FileStore, MemoryStore, TrendCache};
pub use config::TrendConfig;
pub use error::{SprintError, StoreError};
pub use models::{MissionDay, Observation, PaceStatus, PaceVerdict, Sprint, TrendRecord};
