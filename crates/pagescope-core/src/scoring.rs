//! Page performance scoring
//!
//! Four independent category scores, each a piecewise law with floors:
//!
//! | Category | 100 below | Decay |
//! |---|---|---|
//! | Load time | 1.0 s | -20/s to 2.5 s (floor 70), -20/s to 4.0 s (floor 40), -10/s beyond (floor 0) |
//! | Resource count | 30 | -1 each to 50, -0.5 each to 100 (floor 40), -0.2 each beyond (floor 0) |
//! | Total size | 1 MiB | -15/MiB to 3 MiB (floor 70), -15/MiB to 5 MiB (floor 40), -8/MiB beyond (floor 0) |
//! | User experience | - | mean of measured sub-scores, 50 when nothing was measured |
//!
//! Overall = round(0.30 load + 0.20 count + 0.20 size + 0.30 ux), rounded once.

use crate::aggregate::{SessionAggregate, SessionTotals};
use serde::{Deserialize, Serialize};

const LOAD_TIME_WEIGHT: f64 = 0.30;
const RESOURCE_COUNT_WEIGHT: f64 = 0.20;
const TOTAL_SIZE_WEIGHT: f64 = 0.20;
const USER_EXPERIENCE_WEIGHT: f64 = 0.30;

const MIB: f64 = 1024.0 * 1024.0;
const UNMEASURED_UX_SCORE: f64 = 50.0;

/// Three-level rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

impl Rating {
    /// >= 75 good, >= 50 needs improvement, else poor
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            Rating::Good
        } else if score >= 50.0 {
            Rating::NeedsImprovement
        } else {
            Rating::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Good => "good",
            Rating::NeedsImprovement => "needs improvement",
            Rating::Poor => "poor",
        }
    }
}

/// User-experience metrics measured outside this crate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UxMetrics {
    /// Largest contentful paint, milliseconds
    #[serde(default)]
    pub largest_paint_ms: Option<f64>,
    /// Cumulative layout shift (unitless)
    #[serde(default)]
    pub layout_shift: Option<f64>,
    /// First input delay, milliseconds
    #[serde(default)]
    pub input_delay_ms: Option<f64>,
}

impl UxMetrics {
    pub fn is_empty(&self) -> bool {
        self.largest_paint_ms.is_none() && self.layout_shift.is_none() && self.input_delay_ms.is_none()
    }
}

/// One scored category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCategory {
    pub name: String,
    /// 0-100, unrounded
    pub score: f64,
    /// Human-readable observed value
    pub value: String,
    pub rating: Rating,
    pub recommendation: String,
}

/// A scoring snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceScore {
    pub overall: u8,
    pub load_time: ScoreCategory,
    pub resource_count: ScoreCategory,
    pub total_size: ScoreCategory,
    pub user_experience: ScoreCategory,
}

impl PerformanceScore {
    pub fn categories(&self) -> [&ScoreCategory; 4] {
        [
            &self.load_time,
            &self.resource_count,
            &self.total_size,
            &self.user_experience,
        ]
    }

    pub fn rating(&self) -> Rating {
        Rating::from_score(self.overall as f64)
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

/// Load-time score for a wall-clock duration in seconds
pub fn load_time_score(secs: f64) -> f64 {
    let s = secs.max(0.0);
    let score = if s < 1.0 {
        100.0
    } else if s < 2.5 {
        (100.0 - 20.0 * (s - 1.0)).max(70.0)
    } else if s < 4.0 {
        (70.0 - 20.0 * (s - 2.5)).max(40.0)
    } else {
        (40.0 - 10.0 * (s - 4.0)).max(0.0)
    };
    clamp_score(score)
}

/// Resource-count score
pub fn resource_count_score(count: usize) -> f64 {
    let n = count as f64;
    let score = if n < 30.0 {
        100.0
    } else if n <= 50.0 {
        100.0 - (n - 30.0)
    } else if n <= 100.0 {
        (80.0 - 0.5 * (n - 50.0)).max(40.0)
    } else {
        (55.0 - 0.2 * (n - 100.0)).max(0.0)
    };
    clamp_score(score)
}

/// Total-size score for a byte count
pub fn total_size_score(bytes: u64) -> f64 {
    let mib = bytes as f64 / MIB;
    let score = if mib < 1.0 {
        100.0
    } else if mib < 3.0 {
        (100.0 - 15.0 * (mib - 1.0)).max(70.0)
    } else if mib < 5.0 {
        (70.0 - 15.0 * (mib - 3.0)).max(40.0)
    } else {
        (40.0 - 8.0 * (mib - 5.0)).max(0.0)
    };
    clamp_score(score)
}

/// 100 up to `good`, 100 -> 50 across (good, poor], 50 -> 0 over the same span beyond
fn threshold_score(value: f64, good: f64, poor: f64) -> f64 {
    let v = value.max(0.0);
    let span = poor - good;
    let score = if v <= good {
        100.0
    } else if v <= poor {
        100.0 - 50.0 * (v - good) / span
    } else {
        50.0 - 50.0 * (v - poor) / span
    };
    clamp_score(score)
}

pub fn largest_paint_score(ms: f64) -> f64 {
    threshold_score(ms, 2500.0, 4000.0)
}

pub fn layout_shift_score(shift: f64) -> f64 {
    threshold_score(shift, 0.10, 0.25)
}

pub fn input_delay_score(ms: f64) -> f64 {
    threshold_score(ms, 100.0, 300.0)
}

/// Mean of the measured sub-scores, or `None` when nothing was measured
pub fn user_experience_score(ux: &UxMetrics) -> Option<f64> {
    let subs: Vec<f64> = [
        ux.largest_paint_ms.map(largest_paint_score),
        ux.layout_shift.map(layout_shift_score),
        ux.input_delay_ms.map(input_delay_score),
    ]
    .into_iter()
    .flatten()
    .collect();

    if subs.is_empty() {
        None
    } else {
        Some(subs.iter().sum::<f64>() / subs.len() as f64)
    }
}

fn format_bytes(bytes: u64) -> String {
    let b = bytes as f64;
    if b >= MIB {
        format!("{:.2} MB", b / MIB)
    } else if b >= 1024.0 {
        format!("{:.1} KB", b / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

fn category(name: &str, score: f64, value: String, messages: [&str; 3]) -> ScoreCategory {
    let rating = Rating::from_score(score);
    let recommendation = match rating {
        Rating::Good => messages[0],
        Rating::NeedsImprovement => messages[1],
        Rating::Poor => messages[2],
    };
    ScoreCategory {
        name: name.to_string(),
        score,
        value,
        rating,
        recommendation: recommendation.to_string(),
    }
}

fn load_time_category(totals: &SessionTotals) -> ScoreCategory {
    let secs = totals.total_duration_secs();
    category(
        "Load Time",
        load_time_score(secs),
        format!("{:.2} s", secs),
        [
            "Page loads quickly. Keep an eye on it as content grows.",
            "Defer non-critical scripts and lazy-load below-the-fold images.",
            "Load time is slow. Remove render-blocking resources and serve assets from a CDN.",
        ],
    )
}

fn resource_count_category(totals: &SessionTotals) -> ScoreCategory {
    category(
        "Resource Count",
        resource_count_score(totals.resource_count),
        format!("{} requests", totals.resource_count),
        [
            "Request count is lean.",
            "Bundle small scripts and stylesheets to cut round trips.",
            "Too many requests. Consolidate assets and drop unused third-party tags.",
        ],
    )
}

fn total_size_category(totals: &SessionTotals) -> ScoreCategory {
    category(
        "Total Size",
        total_size_score(totals.total_bytes),
        format_bytes(totals.total_bytes),
        [
            "Page weight is within budget.",
            "Compress images to modern formats and minify text assets.",
            "Page is heavy. Audit the largest assets and split large bundles.",
        ],
    )
}

fn user_experience_category(ux: Option<&UxMetrics>) -> ScoreCategory {
    let measured = ux.and_then(|m| user_experience_score(m).map(|s| (m, s)));
    let Some((metrics, score)) = measured else {
        return ScoreCategory {
            name: "User Experience".to_string(),
            score: UNMEASURED_UX_SCORE,
            value: "Not measured".to_string(),
            rating: Rating::NeedsImprovement,
            recommendation: "Collect paint, layout-shift, and input-delay metrics to score this category."
                .to_string(),
        };
    };

    let mut parts = Vec::new();
    if let Some(lcp) = metrics.largest_paint_ms {
        parts.push(format!("LCP {:.2} s", lcp / 1000.0));
    }
    if let Some(cls) = metrics.layout_shift {
        parts.push(format!("CLS {:.3}", cls));
    }
    if let Some(fid) = metrics.input_delay_ms {
        parts.push(format!("FID {:.0} ms", fid));
    }

    category(
        "User Experience",
        score,
        parts.join(", "),
        [
            "Rendering and input responsiveness are healthy.",
            "Reserve space for late content and break up long main-thread tasks.",
            "Users see slow rendering or laggy input. Prioritize above-the-fold content.",
        ],
    )
}

/// Score a set of session totals
pub fn score_totals(totals: &SessionTotals, ux: Option<&UxMetrics>) -> PerformanceScore {
    let load_time = load_time_category(totals);
    let resource_count = resource_count_category(totals);
    let total_size = total_size_category(totals);
    let user_experience = user_experience_category(ux);

    let weighted = LOAD_TIME_WEIGHT * load_time.score
        + RESOURCE_COUNT_WEIGHT * resource_count.score
        + TOTAL_SIZE_WEIGHT * total_size.score
        + USER_EXPERIENCE_WEIGHT * user_experience.score;

    PerformanceScore {
        overall: clamp_score(weighted).round() as u8,
        load_time,
        resource_count,
        total_size,
        user_experience,
    }
}

/// Score a session. Pure: no I/O, no mutation.
pub fn score(session: &SessionAggregate, ux: Option<&UxMetrics>) -> PerformanceScore {
    score_totals(&session.totals(), ux)
}
