//! Key construction and parsing for the single table.
//!
//! Pure functions mapping (primitive type, logical key, ordering parameters)
//! to partition and sort keys. No I/O.
//!
//! Single-item entities (kv, counter, lock, leader) use `{prefix}:{key}` as
//! both PK and SK. Collections order their members by sort key:
//! - queue: `{priority:010}#{micros:016}#{uuid}`, so ascending order is
//!   delivery order (priority, then insertion time, then tie-break)
//! - set: `set:{name}#{member}`, membership is existence of the exact SK
//! - list: 20-digit offset encoding so head inserts sort below tail inserts

use tabula_core::constants::{prefix, MAX_PRIORITY};
use tabula_core::{TabulaError, TabulaResult};

/// Separator between a namespace prefix and the logical key.
const SEP: char = ':';

/// Separator between a set partition and its member suffix.
const MEMBER_SEP: char = '#';

/// Fixed midpoint for list sort keys, larger than any nanosecond timestamp
/// this century. Head inserts encode `OFFSET - t_ns`, tail inserts
/// `OFFSET + t_ns`, so ascending order reads head to tail.
pub const LIST_OFFSET: u64 = 5_000_000_000_000_000_000;

/// Digits in a list sort key.
const LIST_SK_WIDTH: usize = 20;

// =============================================================================
// Validation
// =============================================================================

/// Validate a logical key or collection name.
pub fn validate_key(key: &str) -> TabulaResult<()> {
    if key.is_empty() {
        return Err(TabulaError::invalid_input("Key must not be empty"));
    }
    if key.len() > 1024 {
        return Err(TabulaError::invalid_input(
            "Key must not exceed 1024 characters",
        ));
    }
    Ok(())
}

/// Validate a set name. `#` delimits the member suffix in sort keys, so set
/// names cannot contain it (members can).
pub fn validate_set_name(name: &str) -> TabulaResult<()> {
    validate_key(name)?;
    if name.contains(MEMBER_SEP) {
        return Err(TabulaError::invalid_input("Set name must not contain '#'"));
    }
    Ok(())
}

/// Validate a queue priority against the 10-digit bound.
pub fn validate_priority(priority: u64) -> TabulaResult<()> {
    if priority > MAX_PRIORITY {
        return Err(TabulaError::invalid_input(format!(
            "Priority must be between 0 and {MAX_PRIORITY}"
        )));
    }
    Ok(())
}

// =============================================================================
// Single-item keys (PK == SK)
// =============================================================================

fn format_key(prefix: &str, key: &str) -> String {
    format!("{prefix}{SEP}{key}")
}

/// PK/SK for a KV item: `kv:{key}`.
pub fn kv_key(key: &str) -> String {
    format_key(prefix::KV, key)
}

/// PK/SK for a counter: `counter:{key}`.
pub fn counter_key(key: &str) -> String {
    format_key(prefix::COUNTER, key)
}

/// PK/SK for a lock: `lock:{name}`.
pub fn lock_key(name: &str) -> String {
    format_key(prefix::LOCK, name)
}

/// PK/SK for a leader pool: `leader:{pool}`.
pub fn leader_key(pool: &str) -> String {
    format_key(prefix::LEADER, pool)
}

/// Split a full partition key back into (prefix, logical key).
pub fn parse_key(full_key: &str) -> (&str, &str) {
    match full_key.split_once(SEP) {
        Some((prefix, key)) => (prefix, key),
        None => ("", full_key),
    }
}

// =============================================================================
// Queue keys
// =============================================================================

/// Partition key for a queue: `queue:{name}`.
pub fn queue_pk(name: &str) -> String {
    format_key(prefix::QUEUE, name)
}

/// Sort key for a queue message.
///
/// Lower numeric priority means more urgent and must sort first, so the
/// priority is encoded directly, zero-padded to 10 digits. The microsecond
/// timestamp (16 digits) gives FIFO order within a priority; the tie-break
/// id totally orders same-microsecond insertions.
pub fn queue_sort_key(priority: u64, micros: u64, tie_break: &str) -> String {
    format!("{priority:010}{MEMBER_SEP}{micros:016}{MEMBER_SEP}{tie_break}")
}

// =============================================================================
// Set keys
// =============================================================================

/// Partition key for a set: `set:{name}`.
pub fn set_pk(name: &str) -> String {
    format_key(prefix::SET, name)
}

/// Sort key for a set member: `set:{name}#{member}`.
pub fn set_sk(name: &str, member: &str) -> String {
    format!("{}{MEMBER_SEP}{member}", set_pk(name))
}

/// Extract the member from a set sort key.
pub fn parse_set_member(sk: &str) -> Option<&str> {
    sk.split_once(MEMBER_SEP).map(|(_, member)| member)
}

// =============================================================================
// List keys
// =============================================================================

/// Partition key for a list: `list:{name}`.
pub fn list_pk(name: &str) -> String {
    format_key(prefix::LIST, name)
}

/// Sort key for a head insertion at nanosecond timestamp `t_ns`.
///
/// `OFFSET - t_ns` puts every head insert below the midpoint, with more
/// recent inserts sorting earlier.
pub fn list_head_sk(t_ns: u64) -> String {
    format!("{:0width$}", LIST_OFFSET - t_ns, width = LIST_SK_WIDTH)
}

/// Sort key for a tail insertion at nanosecond timestamp `t_ns`.
pub fn list_tail_sk(t_ns: u64) -> String {
    format!("{:0width$}", LIST_OFFSET + t_ns, width = LIST_SK_WIDTH)
}
