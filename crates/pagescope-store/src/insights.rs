//! Trend insights over a URL's session history.
//!
//! The insight itself comes from an external text-generation service; this
//! module builds the prompt, checks the reply is well-formed, and offers a
//! local fallback summary when no service is configured.

use crate::types::PersistentSession;
use pagescope_core::{score_totals, InsightsConfig};
use serde::{Deserialize, Serialize};

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, thiserror::Error)]
pub enum InsightsError {
    #[error("no sessions to analyze")]
    NoSessions,

    #[error("insights request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("insights service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("insights reply had no text content")]
    EmptyReply,

    #[error("insights reply is not a JSON object")]
    NotJson,

    #[error("insights reply is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub metric: String,
    pub forecast: String,
    #[serde(default)]
    pub trend: String,
    #[serde(default)]
    pub confidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub metric: String,
    pub deviation: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub possible_causes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub description: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub impact: String,
}

/// Opaque result for display or storage; only its shape is checked
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendInsights {
    pub summary: String,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
    #[serde(default)]
    pub anomalies: Vec<Anomaly>,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub recommendation: String,
}

/// The most recent `max_sessions` of `sessions` (oldest first), one line each
pub fn build_trend_prompt(url: &str, sessions: &[PersistentSession], max_sessions: usize) -> String {
    let skip = sessions.len().saturating_sub(max_sessions);
    let mut lines = String::new();
    for session in &sessions[skip..] {
        let overall = session
            .score
            .as_ref()
            .map(|s| s.overall)
            .unwrap_or_else(|| score_totals(&session.totals, session.ux_metrics.as_ref()).overall);
        lines.push_str(&format!(
            "- {}: load {:.2}s, {} resources, {} bytes, score {}{}\n",
            session.timestamp.to_rfc3339(),
            session.totals.total_duration_secs(),
            session.totals.resource_count,
            session.totals.total_bytes,
            overall,
            session
                .failure
                .as_deref()
                .map(|f| format!(", failed: {}", f))
                .unwrap_or_default(),
        ));
    }

    format!(
        "Analyze the page load history of {} (oldest first). Return only JSON with: \
         {{\"summary\": \"<2-3 sentences>\", \
         \"predictions\": [{{\"metric\": \"\", \"forecast\": \"\", \"trend\": \"improving|stable|degrading\", \"confidence\": \"low|medium|high\"}}], \
         \"anomalies\": [{{\"metric\": \"\", \"deviation\": \"\", \"date\": \"\", \"possible_causes\": [\"\"]}}], \
         \"patterns\": [{{\"description\": \"\", \"frequency\": \"\", \"impact\": \"\"}}], \
         \"recommendation\": \"\"}}\n\n{}",
        url, lines
    )
}

/// Decode the first JSON object embedded in `text`
pub fn parse_insights(text: &str) -> Result<TrendInsights, InsightsError> {
    let start = text.find('{').ok_or(InsightsError::NotJson)?;
    let end = text.rfind('}').ok_or(InsightsError::NotJson)?;
    if end < start {
        return Err(InsightsError::NotJson);
    }
    Ok(serde_json::from_str(&text[start..=end])?)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Deterministic summary computed locally
pub fn fallback_insights(url: &str, sessions: &[PersistentSession]) -> TrendInsights {
    let (Some(first), Some(last)) = (sessions.first(), sessions.last()) else {
        return TrendInsights {
            summary: format!("No sessions recorded for {}.", url),
            ..Default::default()
        };
    };

    let loads: Vec<f64> = sessions
        .iter()
        .map(|s| s.totals.total_duration_secs())
        .collect();
    let average = mean(&loads);
    let change = last.totals.total_duration_secs() - first.totals.total_duration_secs();
    let trend = if sessions.len() < 2 || change.abs() < 0.1 {
        "stable"
    } else if change < 0.0 {
        "improving"
    } else {
        "degrading"
    };

    let mut insights = TrendInsights {
        summary: format!(
            "{} session(s) for {}: average load {:.2}s, latest {:.2}s, load time {}.",
            sessions.len(),
            url,
            average,
            last.totals.total_duration_secs(),
            trend
        ),
        ..Default::default()
    };

    if sessions.len() >= 2 {
        insights.predictions.push(Prediction {
            metric: "Load time".to_string(),
            forecast: format!("Next load near {:.2}s", last.totals.total_duration_secs()),
            trend: trend.to_string(),
            confidence: if sessions.len() >= 5 { "medium" } else { "low" }.to_string(),
        });
    }

    if sessions.len() >= 3 {
        let variance = mean(&loads.iter().map(|l| (l - average).powi(2)).collect::<Vec<_>>());
        let limit = average + 2.0 * variance.sqrt();
        for session in sessions {
            let load = session.totals.total_duration_secs();
            if variance > 0.0 && load > limit {
                insights.anomalies.push(Anomaly {
                    metric: "Load time".to_string(),
                    deviation: format!("{:.2}s against an average of {:.2}s", load, average),
                    date: session.timestamp.format("%Y-%m-%d").to_string(),
                    possible_causes: Vec::new(),
                });
            }
        }
    }

    let failures = sessions.iter().filter(|s| s.failure.is_some()).count();
    if failures > 0 {
        insights.patterns.push(Pattern {
            description: "Navigation failures".to_string(),
            frequency: format!("{} of {}", failures, sessions.len()),
            impact: "Failed loads are excluded from timing comparisons".to_string(),
        });
    }

    insights.recommendation = match trend {
        "degrading" => "Load time is rising; compare the latest session against an earlier one.",
        "improving" => "Load time is falling; keep the recent changes.",
        _ => "No significant change; keep monitoring.",
    }
    .to_string();
    insights
}

/// Client for the external text-generation service
pub struct InsightsClient {
    http: reqwest::Client,
    config: InsightsConfig,
    api_key: String,
}

impl InsightsClient {
    pub fn new(config: InsightsConfig, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            api_key: api_key.into(),
        }
    }

    /// Client keyed from the environment, if a key is set
    pub fn from_env(config: InsightsConfig) -> Option<Self> {
        let key = std::env::var(API_KEY_ENV).ok()?;
        if key.trim().is_empty() {
            return None;
        }
        Some(Self::new(config, key))
    }

    pub fn config(&self) -> &InsightsConfig {
        &self.config
    }

    /// Ask the service for insights over `sessions` (oldest first)
    pub async fn request(
        &self,
        url: &str,
        sessions: &[PersistentSession],
    ) -> Result<TrendInsights, InsightsError> {
        if sessions.is_empty() {
            return Err(InsightsError::NoSessions);
        }

        let prompt = build_trend_prompt(url, sessions, self.config.max_sessions);
        tracing::debug!(url, sessions = sessions.len(), model = %self.config.model, "requesting insights");

        let response = self
            .http
            .post(&self.config.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "model": self.config.model,
                "max_tokens": self.config.max_tokens,
                "messages": [{"role": "user", "content": prompt}]
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InsightsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;
        let text = body["content"][0]["text"]
            .as_str()
            .ok_or(InsightsError::EmptyReply)?;
        parse_insights(text)
    }
}
