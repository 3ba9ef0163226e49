//! Per-model capacity admission strategies.
//!
//! A strategy owns the mutable per-key state of one model: an in-flight
//! counter per key for the concurrency variant, or a rolling window of
//! admission timestamps for the QPS variant. `admit` is the sole authority
//! for acceptance; callers that read availability first must still be
//! prepared for `admit` to refuse.
//!
//! Each key's state sits behind its own mutex so distinct keys never
//! contend on one lock. The cell map is built once at construction and
//! never resized.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::core::logging::key_prefix;

/// Length of the rolling admission window used by [`QpsStrategy`].
pub const QPS_WINDOW: Duration = Duration::from_secs(1);

/// The unit a strategy rations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityType {
    /// Simultaneous in-flight requests
    Concurrency,
    /// Admissions per rolling 1-second window
    Qps,
}

impl CapacityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Concurrency => "concurrency",
            Self::Qps => "qps",
        }
    }
}

/// One credential with its intra-model selection weight.
#[derive(Debug, Clone)]
pub struct KeyEntry {
    pub key: Arc<str>,
    pub weight: f64,
}

impl KeyEntry {
    pub fn new(key: impl Into<Arc<str>>, weight: f64) -> Self {
        Self {
            key: key.into(),
            weight,
        }
    }
}

/// Point-in-time load snapshot: current occupancy vs configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacitySnapshot {
    pub current: u32,
    pub max: u32,
}

/// Admission policy over one model's keys.
///
/// Both variants satisfy the same contract so the selector stays
/// strategy-agnostic. All methods are non-blocking: a caller that cannot be
/// admitted is told so immediately, there is no queueing for capacity.
pub trait CapacityStrategy: Send + Sync {
    fn capacity_type(&self) -> CapacityType;

    /// The configured key set, in configuration order.
    fn keys(&self) -> &[KeyEntry];

    /// The per-key capacity limit (max_concurrency or max_qps).
    fn per_key_limit(&self) -> u32;

    /// Atomically try to admit a request against `key`'s capacity.
    ///
    /// Returns `false` with no side effect when the key is at its limit or
    /// unknown.
    fn admit(&self, key: &str) -> bool;

    /// Release one admission for `key`.
    ///
    /// Never fails: a release on an already-idle key is absorbed and logged.
    fn release(&self, key: &str);

    /// Current occupancy of `key` (0 for unknown keys).
    fn key_current(&self, key: &str) -> u32;

    /// Current load of `key`; lower means less loaded.
    fn load_factor(&self, key: &str) -> f64 {
        self.key_current(key) as f64
    }

    /// Keys whose occupancy is strictly below their limit.
    fn available_keys(&self) -> Vec<KeyEntry>;

    /// Summed occupancy and maxima across all keys.
    fn capacity_snapshot(&self) -> CapacitySnapshot;
}

// A poisoned per-key lock only means another thread panicked mid-update;
// the counter itself is still a valid integer, so keep serving.
fn lock_cell<T>(cell: &Mutex<T>) -> MutexGuard<'_, T> {
    cell.lock().unwrap_or_else(|e| e.into_inner())
}

/// Bounds the number of simultaneous in-flight requests per key.
pub struct ConcurrencyStrategy {
    max_concurrency: u32,
    keys: Vec<KeyEntry>,
    counters: HashMap<Arc<str>, Mutex<u32>>,
}

impl ConcurrencyStrategy {
    pub fn new(keys: Vec<KeyEntry>, max_concurrency: u32) -> Self {
        let counters = keys
            .iter()
            .map(|k| (Arc::clone(&k.key), Mutex::new(0)))
            .collect();
        Self {
            max_concurrency,
            keys,
            counters,
        }
    }
}

impl CapacityStrategy for ConcurrencyStrategy {
    fn capacity_type(&self) -> CapacityType {
        CapacityType::Concurrency
    }

    fn keys(&self) -> &[KeyEntry] {
        &self.keys
    }

    fn per_key_limit(&self) -> u32 {
        self.max_concurrency
    }

    fn admit(&self, key: &str) -> bool {
        let Some(cell) = self.counters.get(key) else {
            return false;
        };
        let mut count = lock_cell(cell);
        if *count < self.max_concurrency {
            *count += 1;
            true
        } else {
            false
        }
    }

    fn release(&self, key: &str) {
        let Some(cell) = self.counters.get(key) else {
            tracing::warn!(key = key_prefix(key), "release for unknown key ignored");
            return;
        };
        let mut count = lock_cell(cell);
        if *count == 0 {
            tracing::warn!(
                key = key_prefix(key),
                "release on idle key, in-flight counter already zero"
            );
        } else {
            *count -= 1;
        }
    }

    fn key_current(&self, key: &str) -> u32 {
        self.counters.get(key).map_or(0, |cell| *lock_cell(cell))
    }

    fn available_keys(&self) -> Vec<KeyEntry> {
        self.keys
            .iter()
            .filter(|k| self.key_current(&k.key) < self.max_concurrency)
            .cloned()
            .collect()
    }

    fn capacity_snapshot(&self) -> CapacitySnapshot {
        let current = self.keys.iter().map(|k| self.key_current(&k.key)).sum();
        CapacitySnapshot {
            current,
            max: self.keys.len() as u32 * self.max_concurrency,
        }
    }
}

/// Bounds the number of admissions per key per rolling 1-second window.
///
/// Admissions self-expire: there is no completion signal, so `release` is a
/// no-op. Expired timestamps are evicted lazily on every access, never by a
/// background timer, so the window is correct at query time and cannot grow
/// without bound.
pub struct QpsStrategy {
    max_qps: u32,
    keys: Vec<KeyEntry>,
    windows: HashMap<Arc<str>, Mutex<VecDeque<Instant>>>,
}

impl QpsStrategy {
    pub fn new(keys: Vec<KeyEntry>, max_qps: u32) -> Self {
        let windows = keys
            .iter()
            .map(|k| (Arc::clone(&k.key), Mutex::new(VecDeque::new())))
            .collect();
        Self {
            max_qps,
            keys,
            windows,
        }
    }

    fn evict_expired(window: &mut VecDeque<Instant>, now: Instant) {
        while window
            .front()
            .is_some_and(|&t| now.duration_since(t) > QPS_WINDOW)
        {
            window.pop_front();
        }
    }

    fn window_len(&self, key: &str) -> u32 {
        let Some(cell) = self.windows.get(key) else {
            return 0;
        };
        let mut window = lock_cell(cell);
        Self::evict_expired(&mut window, Instant::now());
        window.len() as u32
    }
}

impl CapacityStrategy for QpsStrategy {
    fn capacity_type(&self) -> CapacityType {
        CapacityType::Qps
    }

    fn keys(&self) -> &[KeyEntry] {
        &self.keys
    }

    fn per_key_limit(&self) -> u32 {
        self.max_qps
    }

    fn admit(&self, key: &str) -> bool {
        let Some(cell) = self.windows.get(key) else {
            return false;
        };
        let now = Instant::now();
        let mut window = lock_cell(cell);
        Self::evict_expired(&mut window, now);
        if (window.len() as u32) < self.max_qps {
            window.push_back(now);
            true
        } else {
            false
        }
    }

    fn release(&self, _key: &str) {
        // Admissions self-expire with the window.
    }

    fn key_current(&self, key: &str) -> u32 {
        self.window_len(key)
    }

    fn available_keys(&self) -> Vec<KeyEntry> {
        self.keys
            .iter()
            .filter(|k| self.window_len(&k.key) < self.max_qps)
            .cloned()
            .collect()
    }

    fn capacity_snapshot(&self) -> CapacitySnapshot {
        let current = self.keys.iter().map(|k| self.window_len(&k.key)).sum();
        CapacitySnapshot {
            current,
            max: self.keys.len() as u32 * self.max_qps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_keys() -> Vec<KeyEntry> {
        vec![KeyEntry::new("k1", 1.0), KeyEntry::new("k2", 1.0)]
    }

    #[test]
    fn test_concurrency_admit_up_to_limit() {
        let strategy = ConcurrencyStrategy::new(two_keys(), 2);

        assert!(strategy.admit("k1"));
        assert!(strategy.admit("k1"));
        assert!(!strategy.admit("k1"));
        // k2 is unaffected by k1 being full
        assert!(strategy.admit("k2"));
    }

    #[test]
    fn test_concurrency_admit_release_round_trip() {
        let strategy = ConcurrencyStrategy::new(two_keys(), 2);

        let before = strategy.key_current("k1");
        assert!(strategy.admit("k1"));
        strategy.release("k1");
        assert_eq!(strategy.key_current("k1"), before);
    }

    #[test]
    fn test_concurrency_release_floors_at_zero() {
        let strategy = ConcurrencyStrategy::new(two_keys(), 2);

        strategy.release("k1");
        strategy.release("k1");
        assert_eq!(strategy.key_current("k1"), 0);

        // Still admits normally afterwards
        assert!(strategy.admit("k1"));
        assert_eq!(strategy.key_current("k1"), 1);
    }

    #[test]
    fn test_concurrency_unknown_key_refused() {
        let strategy = ConcurrencyStrategy::new(two_keys(), 2);

        assert!(!strategy.admit("nope"));
        strategy.release("nope");
        assert_eq!(strategy.key_current("nope"), 0);
    }

    #[test]
    fn test_concurrency_available_keys() {
        let strategy = ConcurrencyStrategy::new(two_keys(), 1);

        assert_eq!(strategy.available_keys().len(), 2);
        assert!(strategy.admit("k1"));
        let available = strategy.available_keys();
        assert_eq!(available.len(), 1);
        assert_eq!(&*available[0].key, "k2");
    }

    #[test]
    fn test_concurrency_snapshot_sums_keys() {
        let strategy = ConcurrencyStrategy::new(two_keys(), 3);

        assert!(strategy.admit("k1"));
        assert!(strategy.admit("k1"));
        assert!(strategy.admit("k2"));

        let snapshot = strategy.capacity_snapshot();
        assert_eq!(snapshot.current, 3);
        assert_eq!(snapshot.max, 6);
        assert_eq!(
            snapshot.current,
            strategy.key_current("k1") + strategy.key_current("k2")
        );
    }

    #[test]
    fn test_qps_admit_up_to_limit() {
        let strategy = QpsStrategy::new(two_keys(), 3);

        assert!(strategy.admit("k1"));
        assert!(strategy.admit("k1"));
        assert!(strategy.admit("k1"));
        assert!(!strategy.admit("k1"));
        assert_eq!(strategy.key_current("k1"), 3);
    }

    #[test]
    fn test_qps_release_is_noop() {
        let strategy = QpsStrategy::new(two_keys(), 2);

        assert!(strategy.admit("k1"));
        strategy.release("k1");
        assert_eq!(strategy.key_current("k1"), 1);
    }

    #[test]
    fn test_qps_window_expires() {
        let strategy = QpsStrategy::new(two_keys(), 2);

        assert!(strategy.admit("k1"));
        assert!(strategy.admit("k1"));
        assert!(!strategy.admit("k1"));

        std::thread::sleep(QPS_WINDOW + Duration::from_millis(100));
        assert_eq!(strategy.key_current("k1"), 0);
        assert!(strategy.admit("k1"));
    }

    #[test]
    fn test_qps_available_keys_evicts_lazily() {
        let strategy = QpsStrategy::new(two_keys(), 1);

        assert!(strategy.admit("k1"));
        assert_eq!(strategy.available_keys().len(), 1);

        std::thread::sleep(QPS_WINDOW + Duration::from_millis(100));
        assert_eq!(strategy.available_keys().len(), 2);
    }

    #[test]
    fn test_capacity_type_labels() {
        let concurrency = ConcurrencyStrategy::new(two_keys(), 1);
        let qps = QpsStrategy::new(two_keys(), 1);

        assert_eq!(concurrency.capacity_type().as_str(), "concurrency");
        assert_eq!(qps.capacity_type().as_str(), "qps");
    }

    #[test]
    fn test_load_factor_tracks_occupancy() {
        let strategy = ConcurrencyStrategy::new(two_keys(), 4);

        assert_eq!(strategy.load_factor("k1"), 0.0);
        assert!(strategy.admit("k1"));
        assert!(strategy.admit("k1"));
        assert_eq!(strategy.load_factor("k1"), 2.0);
        assert_eq!(strategy.load_factor("k2"), 0.0);
    }
}
