//! Side-by-side comparison of two stored sessions

use crate::types::PersistentSession;
use pagescope_core::{score_totals, PerformanceScore};
use serde::{Deserialize, Serialize};

/// Relative change below this fraction of the baseline counts as unchanged
const NOISE_FRACTION: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improved,
    Regressed,
    Unchanged,
}

impl Trend {
    pub fn label(&self) -> &'static str {
        match self {
            Trend::Improved => "improved",
            Trend::Regressed => "regressed",
            Trend::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub metric: String,
    pub baseline: f64,
    pub candidate: f64,
    /// candidate - baseline
    pub delta: f64,
    pub trend: Trend,
}

impl MetricDelta {
    fn new(metric: &str, baseline: f64, candidate: f64, higher_is_better: bool) -> Self {
        let delta = candidate - baseline;
        let noise = baseline.abs() * NOISE_FRACTION;
        let trend = if delta.abs() <= noise || delta == 0.0 {
            Trend::Unchanged
        } else if (delta > 0.0) == higher_is_better {
            Trend::Improved
        } else {
            Trend::Regressed
        };
        Self {
            metric: metric.to_string(),
            baseline,
            candidate,
            delta,
            trend,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionComparison {
    pub baseline_id: String,
    pub candidate_id: String,
    pub overall_score: MetricDelta,
    pub load_time_secs: MetricDelta,
    pub resource_count: MetricDelta,
    pub total_bytes: MetricDelta,
}

impl SessionComparison {
    pub fn metrics(&self) -> [&MetricDelta; 4] {
        [
            &self.overall_score,
            &self.load_time_secs,
            &self.resource_count,
            &self.total_bytes,
        ]
    }

    pub fn regressions(&self) -> Vec<&MetricDelta> {
        self.metrics()
            .into_iter()
            .filter(|m| m.trend == Trend::Regressed)
            .collect()
    }
}

/// Stored score, or a fresh one from the stored totals
fn score_of(session: &PersistentSession) -> PerformanceScore {
    match &session.score {
        Some(score) => score.clone(),
        None => score_totals(&session.totals, session.ux_metrics.as_ref()),
    }
}

pub fn compare(baseline: &PersistentSession, candidate: &PersistentSession) -> SessionComparison {
    let (base_score, cand_score) = (score_of(baseline), score_of(candidate));
    SessionComparison {
        baseline_id: baseline.id.clone(),
        candidate_id: candidate.id.clone(),
        overall_score: MetricDelta::new(
            "Overall score",
            base_score.overall as f64,
            cand_score.overall as f64,
            true,
        ),
        load_time_secs: MetricDelta::new(
            "Load time (s)",
            baseline.totals.total_duration_secs(),
            candidate.totals.total_duration_secs(),
            false,
        ),
        resource_count: MetricDelta::new(
            "Resources",
            baseline.totals.resource_count as f64,
            candidate.totals.resource_count as f64,
            false,
        ),
        total_bytes: MetricDelta::new(
            "Total bytes",
            baseline.totals.total_bytes as f64,
            candidate.totals.total_bytes as f64,
            false,
        ),
    }
}
