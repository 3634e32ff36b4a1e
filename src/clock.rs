//! Central European local time.
//!
//! The device stamps its logs in CET/CEST. Rules:
//!
//! - CET  = UTC+1, CEST = UTC+2.
//! - Summer time starts on the last Sunday of March at 02:00 CET and ends
//!   on the last Sunday of October at 03:00 CEST (both 01:00 UTC).

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};

const CET_OFFSET_MIN: i64 = 60;
const CEST_OFFSET_MIN: i64 = 120;

/// Timestamps before 2020-01-01 mean the clock was never set.
const MIN_SANE_YEAR: i32 = 2020;

pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Last Sunday of `month` in `year`, at `hour`:00.
fn last_sunday(year: i32, month: u32, hour: u32) -> Option<NaiveDateTime> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last_day = first_of_next.pred_opt()?;
    let back = i64::from(last_day.weekday().num_days_from_sunday());
    (last_day - Duration::days(back)).and_hms_opt(hour, 0, 0)
}

/// True when `utc` falls inside summer time.
fn is_summer_time(utc: NaiveDateTime) -> bool {
    let year = utc.year();
    let start = last_sunday(year, 3, 2).map(|t| t - Duration::minutes(CET_OFFSET_MIN));
    let end = last_sunday(year, 10, 3).map(|t| t - Duration::minutes(CEST_OFFSET_MIN));
    match (start, end) {
        (Some(start), Some(end)) => utc >= start && utc < end,
        _ => false,
    }
}

/// Convert Unix seconds to CET/CEST wall time.
pub fn local_time(unix_secs: i64) -> Option<NaiveDateTime> {
    let utc = DateTime::from_timestamp(unix_secs, 0)?.naive_utc();
    let offset = if is_summer_time(utc) {
        CEST_OFFSET_MIN
    } else {
        CET_OFFSET_MIN
    };
    Some(utc + Duration::minutes(offset))
}

/// `"YYYY-MM-DD HH:MM:SS"` in local time.
pub fn format_local(unix_secs: i64) -> Option<String> {
    local_time(unix_secs).map(|t| t.format(DATE_TIME_FORMAT).to_string())
}

/// Whether `unix_secs` looks like a synchronised clock.
pub fn is_sane_year(unix_secs: i64) -> bool {
    DateTime::from_timestamp(unix_secs, 0).is_some_and(|t| t.year() >= MIN_SANE_YEAR)
}

/// Placeholder stamp used until the first time sync.
pub fn uptime_stamp(uptime_secs: u64) -> String {
    format!("(No NTP time, seconds since device start: {uptime_secs})")
}
