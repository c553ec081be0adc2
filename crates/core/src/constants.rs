//! Shared defaults and validation bounds

/// Default lock lease TTL in seconds.
pub const DEFAULT_LOCK_TTL: u64 = 300;

/// Default leadership lease TTL in seconds.
pub const DEFAULT_LEADER_TTL: u64 = 30;

/// Default KV TTL in seconds when one is requested without a duration.
pub const DEFAULT_KEY_TTL: u64 = 3600;

/// Lock acquire backoff: initial delay in seconds.
pub const LOCK_BACKOFF_INITIAL_SECS: f64 = 0.1;

/// Lock acquire backoff: multiplier per attempt.
pub const LOCK_BACKOFF_FACTOR: f64 = 2.0;

/// Lock acquire backoff: cap per attempt in seconds.
pub const LOCK_BACKOFF_MAX_SECS: f64 = 5.0;

/// Default queue visibility timeout in seconds.
pub const QUEUE_VISIBILITY_TIMEOUT: u64 = 300;

/// Default number of messages returned by a queue peek.
pub const QUEUE_PEEK_COUNT: usize = 10;

/// Largest accepted queue priority (10 decimal digits).
pub const MAX_PRIORITY: u64 = 9_999_999_999;

/// Bounded window scanned by the best-effort queue dedup pre-check.
pub const QUEUE_DEDUP_WINDOW: usize = 1000;

/// Maximum operations accepted in one transaction.
pub const MAX_TRANSACTION_OPS: usize = 100;

/// Namespace prefixes for partition keys.
pub mod prefix {
    /// KV items.
    pub const KV: &str = "kv";
    /// Counters.
    pub const COUNTER: &str = "counter";
    /// Locks.
    pub const LOCK: &str = "lock";
    /// Queues.
    pub const QUEUE: &str = "queue";
    /// Leader pools.
    pub const LEADER: &str = "leader";
    /// Sets.
    pub const SET: &str = "set";
    /// Lists.
    pub const LIST: &str = "list";
}
