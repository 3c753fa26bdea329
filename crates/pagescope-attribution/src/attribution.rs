//! Per-domain cost roll-up and third-party share

use crate::providers::{Provider, ProviderCategory, ProviderDirectory};
use pagescope_core::ImpactThresholds;
use pagescope_telemetry::{host_of, is_same_site, ResourceRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Cost tier relative to the whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactTier {
    Low,
    High,
    Critical,
}

impl ImpactTier {
    /// Tier for a 0.0-1.0 share of session cost
    pub fn from_share(share: f64, thresholds: &ImpactThresholds) -> Self {
        if share > thresholds.critical_share {
            ImpactTier::Critical
        } else if share > thresholds.high_share {
            ImpactTier::High
        } else {
            ImpactTier::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImpactTier::Low => "low",
            ImpactTier::High => "high",
            ImpactTier::Critical => "critical",
        }
    }
}

/// Aggregated cost of one domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainCost {
    pub domain: String,
    pub is_first_party: bool,
    #[serde(default)]
    pub provider: Option<Provider>,
    pub request_count: usize,
    pub total_bytes: u64,
    /// Sum of member durations
    pub total_duration_ms: f64,
    /// URLs of member resources, in arrival order
    pub resources: Vec<String>,
    pub impact: ImpactTier,
}

/// Attribution for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionReport {
    pub page_domain: Option<String>,
    /// One entry per distinct domain, heaviest first
    pub domains: Vec<DomainCost>,
    pub total_requests: usize,
    pub total_bytes: u64,
    pub third_party_requests: usize,
    pub third_party_bytes: u64,
    /// third-party bytes / total bytes * 100, 0 when there are no bytes
    pub third_party_percentage: f64,
}

impl AttributionReport {
    pub fn third_parties(&self) -> impl Iterator<Item = &DomainCost> {
        self.domains.iter().filter(|d| !d.is_first_party)
    }

    pub fn first_party(&self) -> impl Iterator<Item = &DomainCost> {
        self.domains.iter().filter(|d| d.is_first_party)
    }

    /// Third-party bytes grouped by provider category; unrecognized domains are omitted
    pub fn bytes_by_category(&self) -> BTreeMap<String, u64> {
        let mut by_category = BTreeMap::new();
        for domain in self.third_parties() {
            if let Some(provider) = &domain.provider {
                *by_category
                    .entry(provider.category.label().to_string())
                    .or_insert(0) += domain.total_bytes;
            }
        }
        by_category
    }

    pub fn in_category(&self, category: ProviderCategory) -> Vec<&DomainCost> {
        self.third_parties()
            .filter(|d| d.provider.as_ref().map(|p| p.category) == Some(category))
            .collect()
    }
}

fn page_host(page: &str) -> Option<String> {
    host_of(page).or_else(|| {
        let trimmed = page.trim();
        if trimmed.is_empty() || trimmed.contains('/') {
            None
        } else {
            Some(trimmed.to_ascii_lowercase())
        }
    })
}

fn share(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole
    } else {
        0.0
    }
}

/// Attribute `records` to domains for the page at `page` (URL or bare host).
///
/// Resources whose URL has no host are counted against the page itself.
/// Impact is the larger of a domain's byte share and duration share.
pub fn attribute(
    records: &[ResourceRecord],
    page: &str,
    directory: &ProviderDirectory,
    thresholds: &ImpactThresholds,
) -> AttributionReport {
    let page_domain = page_host(page);
    let fallback_domain = page_domain.clone().unwrap_or_default();

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, DomainCost> = HashMap::new();

    for record in records {
        let domain = record.host().unwrap_or_else(|| fallback_domain.clone());
        let entry = groups.entry(domain.clone()).or_insert_with(|| {
            order.push(domain.clone());
            let is_first_party = match &page_domain {
                Some(page) => domain.is_empty() || is_same_site(&domain, page),
                None => false,
            };
            let provider = if is_first_party {
                None
            } else {
                directory.lookup(&domain).cloned()
            };
            DomainCost {
                domain: domain.clone(),
                is_first_party,
                provider,
                request_count: 0,
                total_bytes: 0,
                total_duration_ms: 0.0,
                resources: Vec::new(),
                impact: ImpactTier::Low,
            }
        });
        entry.request_count += 1;
        entry.total_bytes += record.total_bytes();
        entry.total_duration_ms += record.duration_ms();
        entry.resources.push(record.url.clone());
    }

    let total_bytes: u64 = groups.values().map(|d| d.total_bytes).sum();
    let total_duration: f64 = groups.values().map(|d| d.total_duration_ms).sum();

    let mut domains: Vec<DomainCost> = order
        .into_iter()
        .filter_map(|d| groups.remove(&d))
        .map(|mut d| {
            let cost_share = share(d.total_bytes as f64, total_bytes as f64)
                .max(share(d.total_duration_ms, total_duration));
            d.impact = ImpactTier::from_share(cost_share, thresholds);
            d
        })
        .collect();
    domains.sort_by(|a, b| {
        b.total_bytes
            .cmp(&a.total_bytes)
            .then_with(|| a.domain.cmp(&b.domain))
    });

    let third_party_requests: usize = domains
        .iter()
        .filter(|d| !d.is_first_party)
        .map(|d| d.request_count)
        .sum();
    let third_party_bytes: u64 = domains
        .iter()
        .filter(|d| !d.is_first_party)
        .map(|d| d.total_bytes)
        .sum();
    let third_party_percentage = share(third_party_bytes as f64 * 100.0, total_bytes as f64);

    tracing::debug!(
        domains = domains.len(),
        third_party_bytes,
        third_party_percentage,
        "attribution computed"
    );

    AttributionReport {
        page_domain,
        domains,
        total_requests: records.len(),
        total_bytes,
        third_party_requests,
        third_party_bytes,
        third_party_percentage,
    }
}
