use super::{find_session, Context};
use pagescope_attribution::{attribute, AttributionReport, ProviderDirectory};
use pagescope_core::{score_totals, ImpactThresholds};
use pagescope_store::PersistentSession;

/// Domains listed in the third-party table
const TOP_DOMAINS: usize = 10;

pub async fn run(id: Option<&str>, json: bool) -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let store = ctx.open_store().await?;

    let session = match id {
        Some(id) => find_session(&store, id).await?,
        None => match store
            .sessions()
            .await
            .into_iter()
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp))
        {
            Some(session) => session,
            None => {
                println!("No sessions recorded yet.");
                return Ok(());
            }
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
        return Ok(());
    }
    println!("{}", build_report(&session, &ctx.config.impact));
    Ok(())
}

fn build_report(session: &PersistentSession, thresholds: &ImpactThresholds) -> String {
    let mut sections = Vec::new();

    let page_score = session
        .score
        .clone()
        .unwrap_or_else(|| score_totals(&session.totals, session.ux_metrics.as_ref()));
    sections.push(format!(
        "Page Report: {}\n{}\n\
         Session: {}\nRecorded: {}\n\
         Resources: {} | Bytes: {} | Load: {:.2}s",
        session.url,
        "=".repeat(13 + session.url.len()),
        session.id,
        session.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        session.totals.resource_count,
        session.totals.total_bytes,
        session.totals.total_duration_secs(),
    ));
    if let Some(reason) = &session.failure {
        sections.push(format!("Navigation failed: {}", reason));
    }

    let mut scores = format!(
        "\nScore: {} ({})\n------",
        page_score.overall,
        page_score.rating().label()
    );
    for category in page_score.categories() {
        scores.push_str(&format!(
            "\n  {:<16} {:>5.1}  {:<18} {}\n  {:<16} {}",
            category.name,
            category.score,
            category.rating.label(),
            category.value,
            "",
            category.recommendation
        ));
    }
    sections.push(scores);

    let attribution = attribute(
        &session.resources,
        &session.url,
        ProviderDirectory::builtin(),
        thresholds,
    );
    sections.push(third_party_section(&attribution));

    sections.join("\n")
}

fn third_party_section(report: &AttributionReport) -> String {
    let mut out = format!(
        "\nThird Parties\n-------------\n\
         {} of {} requests, {} of {} bytes ({:.1}%)",
        report.third_party_requests,
        report.total_requests,
        report.third_party_bytes,
        report.total_bytes,
        report.third_party_percentage
    );

    for domain in report.third_parties().take(TOP_DOMAINS) {
        let provider = domain
            .provider
            .as_ref()
            .map(|p| format!("{} ({})", p.name, p.category))
            .unwrap_or_else(|| "unrecognized".to_string());
        out.push_str(&format!(
            "\n  [{:<8}] {:<32} {:>4} req {:>10} B  {}",
            domain.impact.label(),
            domain.domain,
            domain.request_count,
            domain.total_bytes,
            provider
        ));
    }

    let by_category = report.bytes_by_category();
    if !by_category.is_empty() {
        out.push_str("\n\nBy category:");
        for (category, bytes) in &by_category {
            out.push_str(&format!("\n  {}: {} B", category, bytes));
        }
    }
    out
}
