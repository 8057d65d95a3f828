use chrono::{DateTime, Duration, NaiveDate, Utc};

// Default lead time when no target date is given. Fares inside this horizon
// move too fast to be a sensible default target.
const DEFAULT_LEAD_DAYS: i64 = 14;

/// All dates of the ± window around the target, in ascending order, target
/// included.
pub fn search_window(target: NaiveDate, flex_days: u32) -> Vec<NaiveDate> {
    let flex = flex_days as i64;
    (-flex..=flex)
        .map(|offset| target + Duration::days(offset))
        .collect()
}

pub fn resolve_target_date(
    target_arg: Option<&str>,
    now_utc: DateTime<Utc>,
) -> anyhow::Result<NaiveDate> {
    if let Some(s) = target_arg {
        return Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")?);
    }
    Ok(now_utc.date_naive() + Duration::days(DEFAULT_LEAD_DAYS))
}
