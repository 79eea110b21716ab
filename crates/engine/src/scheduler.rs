// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process timer registry backing `delay`/`schedule` node resumes and
//! daemon cron cadences. Polled by the daemon scheduler loop (§4.7); does
//! not spawn its own timers so it stays deterministic under a `FakeClock`.

use chrono::{DateTime, Utc};
use oj_core::TimerId;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Timer {
    fires_at: DateTime<Utc>,
}

/// Tracks pending timer resumes keyed by `TimerId`.
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: HashMap<String, Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_timer(&mut self, id: TimerId, fires_at: DateTime<Utc>) {
        self.timers.insert(id.as_str().to_string(), Timer { fires_at });
    }

    pub fn cancel_timer(&mut self, id: &TimerId) {
        self.timers.remove(id.as_str());
    }

    pub fn cancel_timers_with_prefix(&mut self, prefix: &str) {
        self.timers.retain(|id, _| !id.starts_with(prefix));
    }

    /// Returns the ids of every timer whose deadline is at or before `now`,
    /// removing them from the registry.
    pub fn fired_timers(&mut self, now: DateTime<Utc>) -> Vec<TimerId> {
        let fired: Vec<String> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.fires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &fired {
            self.timers.remove(id);
        }
        fired.into_iter().map(TimerId::new).collect()
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.values().map(|t| t.fires_at).min()
    }

    pub fn has_timers(&self) -> bool {
        !self.timers.is_empty()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
