use super::{find_session, short_id, Context};
use pagescope_store::{compare, SessionComparison, Trend};

pub async fn run(baseline: &str, candidate: &str) -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let store = ctx.open_store().await?;
    let baseline = find_session(&store, baseline).await?;
    let candidate = find_session(&store, candidate).await?;

    if baseline.url != candidate.url {
        tracing::warn!(
            baseline = %baseline.url,
            candidate = %candidate.url,
            "comparing sessions for different URLs"
        );
    }

    println!("{}", format_comparison(&compare(&baseline, &candidate)));
    Ok(())
}

fn marker(trend: Trend) -> &'static str {
    match trend {
        Trend::Improved => "+",
        Trend::Regressed => "-",
        Trend::Unchanged => "=",
    }
}

fn format_comparison(comparison: &SessionComparison) -> String {
    let mut out = format!(
        "Comparison {} -> {}\n=========================",
        short_id(&comparison.baseline_id),
        short_id(&comparison.candidate_id)
    );
    for metric in comparison.metrics() {
        out.push_str(&format!(
            "\n {} {:<14} {:>12.2} -> {:>12.2} ({:+.2}, {})",
            marker(metric.trend),
            metric.metric,
            metric.baseline,
            metric.candidate,
            metric.delta,
            metric.trend.label()
        ));
    }
    let regressions = comparison.regressions().len();
    if regressions > 0 {
        out.push_str(&format!("\n\n{} metric(s) regressed", regressions));
    }
    out
}
