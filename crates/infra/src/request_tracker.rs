//! Bounded detector for rapid repeated requests.
//!
//! Observational only: a rapid repeat is reported to the caller, never
//! refused. One tracker is built at startup and shared by reference; there is
//! no process-global instance.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(100);
/// Entries older than this are the first to go once capacity is reached.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60);

/// What a request is keyed by: who sent it and where it went.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub client: String,
    pub endpoint: String,
}

impl RequestKey {
    pub fn new(client: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestObservation {
    /// Same key seen less than `window` ago.
    pub rapid: bool,
    pub since_last: Option<Duration>,
}

#[derive(Debug)]
pub struct RepeatRequestTracker {
    capacity: usize,
    window: Duration,
    retention: Duration,
    seen: Mutex<HashMap<RequestKey, Instant>>,
}

impl Default for RepeatRequestTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_WINDOW)
    }
}

impl RepeatRequestTracker {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            window,
            retention: DEFAULT_RETENTION,
            seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn observe(&self, key: RequestKey) -> RequestObservation {
        self.observe_at(key, Instant::now())
    }

    /// Record `key` at `now` and report whether it repeated within the window.
    pub fn observe_at(&self, key: RequestKey, now: Instant) -> RequestObservation {
        // A poisoned map only holds timestamps; keep using it.
        let mut seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let since_last = seen.get(&key).map(|last| now.saturating_duration_since(*last));
        let rapid = since_last.is_some_and(|elapsed| elapsed < self.window);

        if since_last.is_none() && seen.len() >= self.capacity {
            Self::evict(&mut seen, self.capacity, self.retention, now);
        }
        seen.insert(key, now);

        RequestObservation { rapid, since_last }
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict(seen: &mut HashMap<RequestKey, Instant>, capacity: usize, retention: Duration, now: Instant) {
        seen.retain(|_, last| now.saturating_duration_since(*last) <= retention);
        if seen.len() < capacity {
            return;
        }

        let mut by_age: Vec<(RequestKey, Instant)> = seen.iter().map(|(k, t)| (k.clone(), *t)).collect();
        by_age.sort_by_key(|(_, t)| *t);
        let excess = seen.len() + 1 - capacity;
        for (key, _) in by_age.into_iter().take(excess) {
            seen.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(client: &str) -> RequestKey {
        RequestKey::new(client, "/whoami")
    }

    #[test]
    fn repeat_inside_window_is_rapid() {
        let tracker = RepeatRequestTracker::new(10, Duration::from_millis(100));
        let t0 = Instant::now();

        assert!(!tracker.observe_at(key("a"), t0).rapid);
        assert!(tracker.observe_at(key("a"), t0 + Duration::from_millis(50)).rapid);
        assert!(!tracker.observe_at(key("a"), t0 + Duration::from_millis(500)).rapid);
    }

    #[test]
    fn keys_are_independent() {
        let tracker = RepeatRequestTracker::default();
        let t0 = Instant::now();
        tracker.observe_at(key("a"), t0);
        assert!(!tracker.observe_at(key("b"), t0).rapid);
        assert!(!tracker.observe_at(RequestKey::new("a", "/health"), t0).rapid);
    }

    #[test]
    fn stale_entries_are_evicted_first() {
        let tracker = RepeatRequestTracker::new(2, Duration::from_millis(100)).with_retention(Duration::from_secs(60));
        let t0 = Instant::now();
        tracker.observe_at(key("old"), t0);
        tracker.observe_at(key("fresh"), t0 + Duration::from_secs(61));

        tracker.observe_at(key("new"), t0 + Duration::from_secs(62));

        assert_eq!(tracker.len(), 2);
        // "fresh" survived, so a quick repeat is still detected.
        assert!(tracker.observe_at(key("fresh"), t0 + Duration::from_millis(61_050)).rapid);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let tracker = RepeatRequestTracker::new(3, Duration::from_millis(100));
        let t0 = Instant::now();
        for i in 0..20u64 {
            tracker.observe_at(key(&format!("c{i}")), t0 + Duration::from_millis(i));
        }
        assert_eq!(tracker.len(), 3);
    }
}
