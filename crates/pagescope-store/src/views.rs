//! Pure query helpers over an in-memory session list

use crate::types::PersistentSession;
use chrono::{DateTime, Datelike, TimeZone, Utc};

/// Query + inclusive timestamp bounds; an empty query matches everything
pub fn search<'a>(
    sessions: &'a [PersistentSession],
    query: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Vec<&'a PersistentSession> {
    sessions
        .iter()
        .filter(|s| s.metadata().matches_query(query))
        .filter(|s| from.map_or(true, |f| s.timestamp >= f))
        .filter(|s| to.map_or(true, |t| s.timestamp <= t))
        .collect()
}

/// Sessions on the same calendar day as `now`, in `now`'s time zone
pub fn today<'a, Tz: TimeZone>(
    sessions: &'a [PersistentSession],
    now: &DateTime<Tz>,
) -> Vec<&'a PersistentSession> {
    let day = now.date_naive();
    let tz = now.timezone();
    sessions
        .iter()
        .filter(|s| s.timestamp.with_timezone(&tz).date_naive() == day)
        .collect()
}

/// Sessions in the same ISO week as `now`
pub fn this_week<'a, Tz: TimeZone>(
    sessions: &'a [PersistentSession],
    now: &DateTime<Tz>,
) -> Vec<&'a PersistentSession> {
    let week = now.iso_week();
    let tz = now.timezone();
    sessions
        .iter()
        .filter(|s| s.timestamp.with_timezone(&tz).iso_week() == week)
        .collect()
}

/// Sessions in the same calendar month as `now`
pub fn this_month<'a, Tz: TimeZone>(
    sessions: &'a [PersistentSession],
    now: &DateTime<Tz>,
) -> Vec<&'a PersistentSession> {
    let (year, month) = (now.year(), now.month());
    let tz = now.timezone();
    sessions
        .iter()
        .filter(|s| {
            let local = s.timestamp.with_timezone(&tz);
            local.year() == year && local.month() == month
        })
        .collect()
}

/// Newest first
pub fn sort_newest_first(sessions: &mut [PersistentSession]) {
    sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}
