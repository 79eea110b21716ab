// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal 5-field cron matcher (`minute hour day-of-month month
//! day-of-week`) for `schedule` nodes and daemon cron jobs.
//!
//! Standard crons: a day-of-month and a day-of-week field that are both
//! restricted match on OR, not AND, once either is restricted from `*`.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use oj_core::{OjError, OjResult};

#[derive(Debug, Clone)]
pub struct CronSchedule {
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

#[derive(Debug, Clone)]
enum Field {
    Any,
    Values(Vec<u32>),
}

impl Field {
    fn matches(&self, value: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Values(values) => values.contains(&value),
        }
    }

    fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

fn parse_field(raw: &str, min: u32, max: u32) -> OjResult<Field> {
    if raw == "*" {
        return Ok(Field::Any);
    }
    let mut values = Vec::new();
    for part in raw.split(',') {
        if let Some((range, step_str)) = part.split_once('/') {
            let step: u32 = step_str
                .parse()
                .map_err(|_| OjError::InvalidState(format!("invalid cron step: {part}")))?;
            let (lo, hi) = if range == "*" {
                (min, max)
            } else if let Some((a, b)) = range.split_once('-') {
                (parse_num(a)?, parse_num(b)?)
            } else {
                (parse_num(range)?, max)
            };
            let mut v = lo;
            while v <= hi {
                values.push(v);
                v += step.max(1);
            }
        } else if let Some((a, b)) = part.split_once('-') {
            let lo = parse_num(a)?;
            let hi = parse_num(b)?;
            values.extend(lo..=hi);
        } else {
            values.push(parse_num(part)?);
        }
    }
    for v in &values {
        if *v < min || *v > max {
            return Err(OjError::InvalidState(format!(
                "cron field value {v} out of range [{min}, {max}]"
            )));
        }
    }
    Ok(Field::Values(values))
}

fn parse_num(s: &str) -> OjResult<u32> {
    s.trim()
        .parse()
        .map_err(|_| OjError::InvalidState(format!("invalid cron number: {s}")))
}

impl CronSchedule {
    pub fn parse(expr: &str) -> OjResult<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(OjError::InvalidState(format!(
                "cron expression must have 5 fields, got {}: {expr}",
                fields.len()
            )));
        }
        Ok(Self {
            minute: parse_field(fields[0], 0, 59)?,
            hour: parse_field(fields[1], 0, 23)?,
            day_of_month: parse_field(fields[2], 1, 31)?,
            month: parse_field(fields[3], 1, 12)?,
            day_of_week: parse_field(fields[4], 0, 6)?,
        })
    }

    fn matches(&self, at: &DateTime<Utc>) -> bool {
        if !self.minute.matches(at.minute()) || !self.hour.matches(at.hour()) {
            return false;
        }
        if !self.month.matches(at.month()) {
            return false;
        }
        let dom_ok = self.day_of_month.matches(at.day());
        let dow_ok = self.day_of_week.matches(at.weekday().num_days_from_sunday());
        if self.day_of_month.is_any() || self.day_of_week.is_any() {
            dom_ok && dow_ok
        } else {
            dom_ok || dow_ok
        }
    }

    /// The next minute-aligned instant strictly after `after` that matches,
    /// searched up to four years out (covers Feb 29-only schedules).
    pub fn next_after(&self, after: &DateTime<Utc>) -> OjResult<DateTime<Utc>> {
        let start = after
            .with_second(0)
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(*after)
            + Duration::minutes(1);
        let mut candidate = start;
        let limit = start + Duration::days(4 * 366);
        while candidate < limit {
            if self.matches(&candidate) {
                return Ok(candidate);
            }
            candidate += Duration::minutes(1);
        }
        Err(OjError::InvalidState(format!(
            "cron expression never matches within search horizon: {self:?}"
        )))
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
