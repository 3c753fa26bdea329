//! Session aggregation, navigation lifecycle, and page scoring

mod aggregate;
mod capture;
mod config;
mod filter;
mod monitor;
mod observer;
pub mod scoring;

pub use aggregate::{SessionAggregate, SessionTotals};
pub use capture::{CaptureBridge, CaptureReceiver, DeliverError, SampleBatch};
pub use config::{Config, ConfigError, ImpactThresholds, InsightsConfig, RetentionPolicy};
pub use filter::ResourceFilter;
pub use monitor::SessionMonitor;
pub use observer::{ObserverRegistry, SessionObserver};
pub use scoring::{score, score_totals, PerformanceScore, Rating, ScoreCategory, UxMetrics};
