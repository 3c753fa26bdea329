//! First- vs third-party cost attribution

mod attribution;
mod providers;

pub use attribution::{attribute, AttributionReport, DomainCost, ImpactTier};
pub use providers::{Provider, ProviderCategory, ProviderDirectory};
