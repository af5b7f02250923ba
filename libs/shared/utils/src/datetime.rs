use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

pub const CLINIC_TZ: Tz = chrono_tz::Europe::Warsaw;

const MONTHS_GENITIVE: [&str; 12] = [
    "stycznia",
    "lutego",
    "marca",
    "kwietnia",
    "maja",
    "czerwca",
    "lipca",
    "sierpnia",
    "września",
    "października",
    "listopada",
    "grudnia",
];

pub fn now_local() -> DateTime<Tz> {
    Utc::now().with_timezone(&CLINIC_TZ)
}

pub fn today_local() -> NaiveDate {
    now_local().date_naive()
}

pub fn to_local(dt: DateTime<Utc>) -> DateTime<Tz> {
    dt.with_timezone(&CLINIC_TZ)
}

pub fn to_local_iso(dt: DateTime<Utc>) -> String {
    to_local(dt).to_rfc3339()
}

/// Parses `HH:MM` or `HH:MM:SS` into minutes after midnight.
pub fn time_to_minutes(value: &str) -> Option<u32> {
    let mut parts = value.trim().split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

pub fn minutes_to_time(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn naive_time_minutes(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

pub fn minutes_of_day(dt: DateTime<Utc>) -> u32 {
    naive_time_minutes(to_local(dt).time())
}

/// Every date from `start` to `end`, both inclusive.
pub fn build_date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(current);
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    dates
}

/// Converts a clinic-local wall clock time into UTC, taking the earlier instant on DST overlaps.
pub fn local_datetime(date: NaiveDate, minutes: u32) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)?;
    let naive = date.and_time(time);
    match CLINIC_TZ.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        chrono::LocalResult::Ambiguous(early, _) => Some(early.with_timezone(&Utc)),
        chrono::LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            CLINIC_TZ
                .from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
        }
    }
}

/// UTC bounds `[start, end)` of a clinic-local day.
pub fn day_range_utc(date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = local_datetime(date, 0)?;
    let end = local_datetime(date.succ_opt()?, 0)?;
    Some((start, end))
}

pub fn today_range() -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    day_range_utc(today_local())
}

/// Accepts RFC 3339 timestamps or naive `YYYY-MM-DDTHH:MM[:SS]` in clinic time.
pub fn parse_client_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .ok()?;

    local_datetime(naive.date(), naive_time_minutes(naive.time()))
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

pub fn slot_string(date: NaiveDate, minutes: u32) -> String {
    format!("{}T{}:00", date.format("%Y-%m-%d"), minutes_to_time(minutes))
}

/// Long Polish date followed by the time, e.g. `5 marca 2025, 09:40`.
pub fn format_pl_datetime(dt: DateTime<Utc>) -> String {
    let local = to_local(dt);
    format!(
        "{} {} {}, {:02}:{:02}",
        local.day(),
        MONTHS_GENITIVE[local.month0() as usize],
        local.year(),
        local.hour(),
        local.minute()
    )
}

pub fn format_hhmm(dt: DateTime<Utc>) -> String {
    let local = to_local(dt);
    format!("{:02}:{:02}", local.hour(), local.minute())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn time_round_trip() {
        assert_eq!(time_to_minutes("08:20"), Some(500));
        assert_eq!(time_to_minutes("08:20:00"), Some(500));
        assert_eq!(time_to_minutes("24:00"), None);
        assert_eq!(time_to_minutes("8"), None);
        assert_eq!(minutes_to_time(500), "08:20");
    }

    #[test]
    fn date_range_is_inclusive() {
        let range = build_date_range(date("2025-03-30"), date("2025-04-01"));
        assert_eq!(range.len(), 3);
        assert_eq!(range[2], date("2025-04-01"));
        assert!(build_date_range(date("2025-04-02"), date("2025-04-01")).is_empty());
    }

    #[test]
    fn local_datetime_respects_summer_time() {
        let winter = local_datetime(date("2025-01-15"), 9 * 60).unwrap();
        assert_eq!(winter.to_rfc3339(), "2025-01-15T08:00:00+00:00");

        let summer = local_datetime(date("2025-07-15"), 9 * 60).unwrap();
        assert_eq!(summer.to_rfc3339(), "2025-07-15T07:00:00+00:00");
    }

    #[test]
    fn day_range_spans_local_day() {
        let (start, end) = day_range_utc(date("2025-07-15")).unwrap();
        assert_eq!(start.to_rfc3339(), "2025-07-14T22:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-07-15T22:00:00+00:00");
    }

    #[test]
    fn parses_naive_client_datetime_as_clinic_time() {
        let dt = parse_client_datetime("2025-07-15T10:20:00").unwrap();
        assert_eq!(minutes_of_day(dt), 620);
        let rfc = parse_client_datetime("2025-07-15T08:20:00Z").unwrap();
        assert_eq!(rfc, dt);
    }

    #[test]
    fn slot_strings_have_seconds() {
        assert_eq!(slot_string(date("2025-07-15"), 620), "2025-07-15T10:20:00");
    }

    #[test]
    fn polish_long_date() {
        let dt = local_datetime(date("2025-03-05"), 9 * 60 + 40).unwrap();
        assert_eq!(format_pl_datetime(dt), "5 marca 2025, 09:40");
    }
}
