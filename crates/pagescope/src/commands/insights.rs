use super::Context;
use pagescope_store::insights::fallback_insights;
use pagescope_store::{InsightsClient, TrendInsights};

pub async fn run(url: &str, offline: bool) -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let store = ctx.open_store().await?;
    let sessions = store.sessions_for_url(url).await;

    if sessions.is_empty() {
        println!("No sessions recorded for {}", url);
        return Ok(());
    }

    let client = if offline {
        None
    } else {
        InsightsClient::from_env(ctx.config.insights.clone())
    };

    let insights = match client {
        Some(client) => match client.request(url, &sessions).await {
            Ok(insights) => insights,
            Err(e) => {
                tracing::warn!(error = %e, "insights service failed, summarizing locally");
                fallback_insights(url, &sessions)
            }
        },
        None => fallback_insights(url, &sessions),
    };

    println!("{}", format_insights(&insights));
    Ok(())
}

fn format_insights(insights: &TrendInsights) -> String {
    let mut sections = vec![format!("Summary\n-------\n{}", insights.summary)];

    if !insights.predictions.is_empty() {
        let lines: Vec<String> = insights
            .predictions
            .iter()
            .map(|p| format!("  {}: {} [{}, {} confidence]", p.metric, p.forecast, p.trend, p.confidence))
            .collect();
        sections.push(format!("\nPredictions\n-----------\n{}", lines.join("\n")));
    }

    if !insights.anomalies.is_empty() {
        let lines: Vec<String> = insights
            .anomalies
            .iter()
            .map(|a| {
                let causes = if a.possible_causes.is_empty() {
                    String::new()
                } else {
                    format!(" (possible: {})", a.possible_causes.join("; "))
                };
                format!("  {} {}: {}{}", a.date, a.metric, a.deviation, causes)
            })
            .collect();
        sections.push(format!("\nAnomalies\n---------\n{}", lines.join("\n")));
    }

    if !insights.patterns.is_empty() {
        let lines: Vec<String> = insights
            .patterns
            .iter()
            .map(|p| format!("  {} ({}): {}", p.description, p.frequency, p.impact))
            .collect();
        sections.push(format!("\nPatterns\n--------\n{}", lines.join("\n")));
    }

    if !insights.recommendation.is_empty() {
        sections.push(format!("\nRecommendation\n--------------\n{}", insights.recommendation));
    }
    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagescope_store::insights::{Anomaly, Prediction};

    #[test]
    fn test_format_insights_skips_empty_sections() {
        let text = format_insights(&TrendInsights {
            summary: "Stable.".to_string(),
            ..Default::default()
        });
        assert!(text.contains("Stable."));
        assert!(!text.contains("Predictions"));
        assert!(!text.contains("Recommendation"));
    }

    #[test]
    fn test_format_insights_full() {
        let text = format_insights(&TrendInsights {
            summary: "Slower.".to_string(),
            predictions: vec![Prediction {
                metric: "Load time".to_string(),
                forecast: "3s".to_string(),
                trend: "degrading".to_string(),
                confidence: "low".to_string(),
            }],
            anomalies: vec![Anomaly {
                metric: "Load time".to_string(),
                deviation: "9s".to_string(),
                date: "2025-03-06".to_string(),
                possible_causes: vec!["ad script".to_string()],
            }],
            patterns: Vec::new(),
            recommendation: "Audit ads".to_string(),
        });
        assert!(text.contains("Load time: 3s [degrading, low confidence]"));
        assert!(text.contains("2025-03-06 Load time: 9s (possible: ad script)"));
        assert!(text.contains("Audit ads"));
    }
}
