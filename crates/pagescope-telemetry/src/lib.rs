//! Resource timing telemetry: raw samples, normalized records, and file helpers

mod host;
mod io;
mod normalize;
mod paths;
mod types;

pub use host::{host_of, is_same_site};
pub use io::{atomic_write, read_jsonl, staging_path};
pub use normalize::{
    is_network_url, normalize_batch, phases_from_sample, resource_type_for, DEFAULT_METHOD,
    DEFAULT_STATUS,
};
pub use paths::{Paths, HOME_ENV};
pub use types::{RawTimingSample, ResourceRecord, ResourceType, TimingPhases};
