use super::{short_id, Context};
use crate::cli::HistoryWindow;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use pagescope_core::score_totals;
use pagescope_store::{views, PersistentSession};

const LIMIT: usize = 20;

/// RFC 3339, or a bare date taken as the start (or end) of that UTC day
fn parse_bound(raw: &str, end_of_day: bool) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("invalid date {} (expected RFC 3339 or YYYY-MM-DD)", raw))?;
    let time = if end_of_day {
        NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| anyhow::anyhow!("invalid time of day"))?;
    Ok(date.and_time(time).and_utc())
}

fn overall(session: &PersistentSession) -> u8 {
    session
        .score
        .as_ref()
        .map(|s| s.overall)
        .unwrap_or_else(|| score_totals(&session.totals, session.ux_metrics.as_ref()).overall)
}

fn compute_stats(sessions: &[PersistentSession]) -> String {
    if sessions.is_empty() {
        return "No sessions to analyze.".to_string();
    }
    let total = sessions.len();
    let avg_load = sessions
        .iter()
        .map(|s| s.totals.total_duration_secs())
        .sum::<f64>()
        / total as f64;
    let avg_score = sessions.iter().map(|s| overall(s) as f64).sum::<f64>() / total as f64;
    let total_bytes: u64 = sessions.iter().map(|s| s.totals.total_bytes).sum();
    let failures = sessions.iter().filter(|s| s.failure.is_some()).count();
    let mut domains: Vec<&str> = sessions.iter().map(|s| s.domain.as_str()).collect();
    domains.sort_unstable();
    domains.dedup();

    format!(
        "Total sessions: {}\n\
         Domains: {}\n\
         Avg load: {:.2}s\n\
         Avg score: {:.0}\n\
         Total transferred: {} bytes\n\
         Failed navigations: {}",
        total,
        domains.len(),
        avg_load,
        avg_score,
        total_bytes,
        failures
    )
}

pub async fn run(
    query: &str,
    from: Option<String>,
    to: Option<String>,
    window: Option<HistoryWindow>,
    stats: bool,
) -> anyhow::Result<()> {
    let from = from.as_deref().map(|f| parse_bound(f, false)).transpose()?;
    let to = to.as_deref().map(|t| parse_bound(t, true)).transpose()?;

    let ctx = Context::load()?;
    let store = ctx.open_store().await?;

    let pool = match window {
        Some(HistoryWindow::Today) => store.today().await,
        Some(HistoryWindow::Week) => store.this_week().await,
        Some(HistoryWindow::Month) => store.this_month().await,
        None => store.sessions().await,
    };
    let mut sessions: Vec<PersistentSession> = views::search(&pool, query, from, to)
        .into_iter()
        .cloned()
        .collect();
    views::sort_newest_first(&mut sessions);

    if sessions.is_empty() {
        println!("No matching sessions");
        return Ok(());
    }

    if stats {
        println!("{}", compute_stats(&sessions));
        return Ok(());
    }

    let shown = sessions.len().min(LIMIT);
    println!("Sessions ({} of {})", shown, sessions.len());
    println!("==================");
    for session in sessions.iter().take(LIMIT) {
        println!(
            "  {} | {} | score:{:>3} load:{:.2}s res:{} bytes:{}{}{}",
            short_id(&session.id),
            session.timestamp.format("%Y-%m-%d %H:%M"),
            overall(session),
            session.totals.total_duration_secs(),
            session.totals.resource_count,
            session.totals.total_bytes,
            if session.failure.is_some() { " FAILED" } else { "" },
            if session.tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", session.tags.join(","))
            },
        );
        println!("      {}", session.url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagescope_core::SessionTotals;

    fn session(domain: &str, duration_ms: f64, failed: bool) -> PersistentSession {
        PersistentSession {
            id: format!("{}-id", domain),
            url: format!("https://{}/", domain),
            domain: domain.to_string(),
            timestamp: Utc::now(),
            tags: Vec::new(),
            start_time: Utc::now(),
            resources: Vec::new(),
            totals: SessionTotals {
                resource_count: 10,
                total_bytes: 1000,
                total_duration_ms: duration_ms,
            },
            failure: failed.then(|| "aborted".to_string()),
            ux_metrics: None,
            score: None,
        }
    }

    #[test]
    fn test_parse_bound_date_only() {
        let from = parse_bound("2025-05-01", false).unwrap();
        let to = parse_bound("2025-05-01", true).unwrap();
        assert_eq!(from.to_rfc3339(), "2025-05-01T00:00:00+00:00");
        assert!(to > from);
        assert_eq!(to.date_naive(), from.date_naive());
    }

    #[test]
    fn test_parse_bound_rfc3339_and_invalid() {
        let ts = parse_bound("2025-05-01T12:30:00Z", true).unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-05-01T12:30:00+00:00");
        assert!(parse_bound("last tuesday", false).is_err());
    }

    #[test]
    fn test_compute_stats() {
        let sessions = vec![
            session("a.com", 1000.0, false),
            session("b.com", 3000.0, true),
            session("a.com", 2000.0, false),
        ];
        let stats = compute_stats(&sessions);
        assert!(stats.contains("Total sessions: 3"));
        assert!(stats.contains("Domains: 2"));
        assert!(stats.contains("Avg load: 2.00s"));
        assert!(stats.contains("Failed navigations: 1"));
    }

    #[test]
    fn test_compute_stats_empty() {
        assert_eq!(compute_stats(&[]), "No sessions to analyze.");
    }
}
