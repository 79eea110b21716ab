use super::*;
use chrono::TimeZone;

fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

#[test]
fn every_minute_matches_next_minute() {
    let cron = CronSchedule::parse("* * * * *").expect("parse");
    let after = dt(2026, 1, 1, 12, 30);
    assert_eq!(cron.next_after(&after).unwrap(), dt(2026, 1, 1, 12, 31));
}

#[test]
fn daily_at_fixed_hour_skips_to_next_day() {
    let cron = CronSchedule::parse("0 9 * * *").expect("parse");
    let after = dt(2026, 1, 1, 10, 0);
    assert_eq!(cron.next_after(&after).unwrap(), dt(2026, 1, 2, 9, 0));
}

#[test]
fn weekday_field_matches_by_name_number() {
    // 2026-01-01 is a Thursday (weekday 4).
    let cron = CronSchedule::parse("0 8 * * 4").expect("parse");
    let after = dt(2026, 1, 1, 0, 0);
    assert_eq!(cron.next_after(&after).unwrap(), dt(2026, 1, 1, 8, 0));
}

#[test]
fn dom_and_dow_both_restricted_combine_with_or() {
    // Matches the 15th OR any Monday (weekday 1).
    let cron = CronSchedule::parse("0 0 15 * 1").expect("parse");
    // 2026-01-05 is a Monday.
    let after = dt(2026, 1, 4, 0, 0);
    assert_eq!(cron.next_after(&after).unwrap(), dt(2026, 1, 5, 0, 0));
}

#[test]
fn step_syntax_expands_values() {
    let cron = CronSchedule::parse("*/15 * * * *").expect("parse");
    let after = dt(2026, 1, 1, 0, 1);
    assert_eq!(cron.next_after(&after).unwrap(), dt(2026, 1, 1, 0, 15));
}

#[test]
fn rejects_wrong_field_count() {
    assert!(CronSchedule::parse("* * * *").is_err());
}

#[test]
fn rejects_out_of_range_value() {
    assert!(CronSchedule::parse("60 * * * *").is_err());
}
