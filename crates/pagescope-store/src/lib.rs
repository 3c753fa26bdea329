//! Durable session history: bodies, index, retention, and queries

mod compare;
mod error;
pub mod insights;
mod storage;
mod types;
pub mod views;

pub use compare::{compare, MetricDelta, SessionComparison, Trend};
pub use error::{Result, StoreError};
pub use insights::{InsightsClient, InsightsError, TrendInsights};
pub use storage::{CleanupReport, SessionStore};
pub use types::{PersistentSession, SessionIndex, SessionMetadata};
