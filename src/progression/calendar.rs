use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};

/// Monday 00:00 UTC of the ISO week containing `now`
pub fn start_of_week(now: DateTime<Utc>) -> DateTime<Utc> {
  let days_from_monday = now.weekday().num_days_from_monday() as i64;
  let monday = now.date_naive() - Duration::days(days_from_monday);
  Utc.from_utc_datetime(&monday.and_time(NaiveTime::MIN))
}

/// First day of the calendar month of `now`, 00:00 UTC
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
  let first = now.date_naive().with_day(1).unwrap_or(now.date_naive());
  Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN))
}
