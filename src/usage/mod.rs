//! Per-identity usage limiting for audio generation.
//!
//! Each caller identity (usually the client IP) gets `max_uses` successful
//! generations, optionally refilled after `reset_window`. A use is only
//! counted once the generation succeeds: callers [`UsageLimiter::reserve`] a
//! slot up front and [`UsageTicket::commit`] it afterwards. Dropping the
//! ticket without committing gives the slot back.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsagePolicy {
    pub enabled: bool,
    pub max_uses: u32,
    /// `None` means uses never come back.
    pub reset_window: Option<Duration>,
}

impl UsagePolicy {
    pub fn unlimited() -> Self {
        Self {
            enabled: false,
            max_uses: 0,
            reset_window: None,
        }
    }
}

impl Default for UsagePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_uses: 2,
            reset_window: Some(Duration::from_secs(24 * 60 * 60)),
        }
    }
}

/// Usage as reported to clients. `remaining` and `max_uses` are `None` when
/// limiting is disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageStatus {
    pub allowed: bool,
    pub used: u32,
    pub remaining: Option<u32>,
    pub max_uses: Option<u32>,
    pub resets_in_seconds: Option<u64>,
}

#[derive(Debug)]
struct UsageEntry {
    used: u32,
    in_flight: u32,
    window_start: Instant,
}

impl UsageEntry {
    fn new(now: Instant) -> Self {
        Self {
            used: 0,
            in_flight: 0,
            window_start: now,
        }
    }

    fn is_idle(&self) -> bool {
        self.used == 0 && self.in_flight == 0
    }

    fn window_expired(&self, window: Option<Duration>, now: Instant) -> bool {
        window.is_some_and(|w| now.saturating_duration_since(self.window_start) >= w)
    }

    fn reset_if_expired(&mut self, window: Option<Duration>, now: Instant) {
        if self.window_expired(window, now) {
            self.used = 0;
            self.window_start = now;
        }
    }
}

pub struct UsageLimiter {
    policy: UsagePolicy,
    entries: Mutex<HashMap<String, UsageEntry>>,
}

impl UsageLimiter {
    pub fn new(policy: UsagePolicy) -> Self {
        Self {
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &UsagePolicy {
        &self.policy
    }

    pub fn status(&self, key: &str) -> UsageStatus {
        self.status_at(key, Instant::now())
    }

    fn status_at(&self, key: &str, now: Instant) -> UsageStatus {
        if !self.policy.enabled {
            return self.unlimited_status();
        }
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(key) {
            Some(entry) => {
                entry.reset_if_expired(self.policy.reset_window, now);
                self.entry_status(entry, now)
            }
            None => self.entry_status(&UsageEntry::new(now), now),
        }
    }

    /// Reserves one use for `key`, or returns the exhausted status.
    pub fn reserve(self: &Arc<Self>, key: &str) -> Result<UsageTicket, UsageStatus> {
        self.reserve_at(key, Instant::now())
    }

    fn reserve_at(self: &Arc<Self>, key: &str, now: Instant) -> Result<UsageTicket, UsageStatus> {
        if !self.policy.enabled {
            return Ok(UsageTicket {
                limiter: Arc::clone(self),
                key: key.to_string(),
                settled: true,
            });
        }

        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| UsageEntry::new(now));
        entry.reset_if_expired(self.policy.reset_window, now);

        if entry.used + entry.in_flight >= self.policy.max_uses {
            debug!("Usage exhausted for {}: {} used", key, entry.used);
            return Err(self.entry_status(entry, now));
        }

        entry.in_flight += 1;
        Ok(UsageTicket {
            limiter: Arc::clone(self),
            key: key.to_string(),
            settled: false,
        })
    }

    fn settle(&self, key: &str, consume: bool) -> UsageStatus {
        if !self.policy.enabled {
            return self.unlimited_status();
        }
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| UsageEntry::new(now));
        entry.in_flight = entry.in_flight.saturating_sub(1);
        if consume {
            entry.used = entry.used.saturating_add(1);
        }
        let status = self.entry_status(entry, now);
        if entry.is_idle() {
            entries.remove(key);
        }
        status
    }

    fn entry_status(&self, entry: &UsageEntry, now: Instant) -> UsageStatus {
        let max = self.policy.max_uses;
        UsageStatus {
            allowed: entry.used + entry.in_flight < max,
            used: entry.used,
            remaining: Some(max.saturating_sub(entry.used)),
            max_uses: Some(max),
            resets_in_seconds: self
                .policy
                .reset_window
                .filter(|_| entry.used > 0)
                .map(|w| {
                    w.saturating_sub(now.saturating_duration_since(entry.window_start))
                        .as_secs()
                }),
        }
    }

    fn unlimited_status(&self) -> UsageStatus {
        UsageStatus {
            allowed: true,
            used: 0,
            remaining: None,
            max_uses: None,
            resets_in_seconds: None,
        }
    }

    pub fn tracked_identities(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Drops entries with nothing in flight that are either unused or past
    /// their window. Returns the number of removed entries.
    pub fn cleanup_stale_entries(&self) -> usize {
        self.cleanup_stale_entries_at(Instant::now())
    }

    fn cleanup_stale_entries_at(&self, now: Instant) -> usize {
        let window = self.policy.reset_window;
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| {
            entry.in_flight > 0 || (entry.used > 0 && !entry.window_expired(window, now))
        });
        before - entries.len()
    }
}

/// A reserved use. Commit it once the generation succeeded.
pub struct UsageTicket {
    limiter: Arc<UsageLimiter>,
    key: String,
    settled: bool,
}

impl UsageTicket {
    /// Counts the use and returns the updated status.
    pub fn commit(mut self) -> UsageStatus {
        if self.settled {
            return self.limiter.status(&self.key);
        }
        self.settled = true;
        self.limiter.settle(&self.key, true)
    }
}

impl Drop for UsageTicket {
    fn drop(&mut self) {
        if !self.settled {
            self.limiter.settle(&self.key, false);
        }
    }
}
