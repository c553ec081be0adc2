//! Error taxonomy for tabula operations
//!
//! Every caller-facing failure carries the identity of the key, lock, queue,
//! or pool involved so callers can decide whether to retry. Store-level
//! condition failures are translated into primitive-specific variants by the
//! protocol layer and never surfaced raw to callers.

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type TabulaResult<T> = Result<T, TabulaError>;

/// All errors produced by the store and the primitive protocols.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TabulaError {
    /// Key, counter, or other single-item entity does not exist.
    #[error("key '{key}' not found")]
    KeyNotFound {
        /// Logical key that was looked up.
        key: String,
    },

    /// Create-if-absent or dedup collision: the entity already exists.
    #[error("key '{key}' already exists")]
    AlreadyExists {
        /// Logical key that collided.
        key: String,
    },

    /// A conditional write lost its race.
    #[error("condition failed for key '{key}'")]
    ConditionFailed {
        /// Key the condition was evaluated against.
        key: String,
    },

    /// Lock is held by another owner (possibly after exhausting a wait).
    #[error("lock '{name}' is held by another owner")]
    LockUnavailable {
        /// Lock name.
        name: String,
    },

    /// Another agent currently holds leadership of the pool.
    #[error("leader election failed for pool '{pool}': another agent is the leader")]
    LeaderElectionFailed {
        /// Leader pool name.
        pool: String,
    },

    /// Backing table does not exist.
    #[error("table '{table}' not found")]
    TableNotFound {
        /// Table or namespace name.
        table: String,
    },

    /// Backing store is overloaded; callers should retry with backoff.
    #[error("store throttled - retry with backoff")]
    Throttled,

    /// Caller lacks permission for the operation.
    #[error("permission denied")]
    PermissionDenied,

    /// Malformed input: bad priority, oversized batch, invalid transaction.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Any other backing-store failure.
    #[error("store error: {0}")]
    Store(String),
}

impl TabulaError {
    /// Key/counter/entity lookup miss.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        TabulaError::KeyNotFound { key: key.into() }
    }

    /// Entity already exists.
    pub fn already_exists(key: impl Into<String>) -> Self {
        TabulaError::AlreadyExists { key: key.into() }
    }

    /// Conditional write lost its race.
    pub fn condition_failed(key: impl Into<String>) -> Self {
        TabulaError::ConditionFailed { key: key.into() }
    }

    /// Lock contention outcome.
    pub fn lock_unavailable(name: impl Into<String>) -> Self {
        TabulaError::LockUnavailable { name: name.into() }
    }

    /// Lost election outcome.
    pub fn leader_election_failed(pool: impl Into<String>) -> Self {
        TabulaError::LeaderElectionFailed { pool: pool.into() }
    }

    /// Malformed caller input.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        TabulaError::InvalidInput(msg.into())
    }

    /// Generic backend failure.
    pub fn store(msg: impl Into<String>) -> Self {
        TabulaError::Store(msg.into())
    }

    /// True when the error is the loss of a conditional write.
    pub fn is_condition_failed(&self) -> bool {
        matches!(self, TabulaError::ConditionFailed { .. })
    }
}
