//! Expiry Record Module
//!
//! Encoding, decoding and comparison of expiry timestamps. Expiry records
//! are decimal integer strings holding an epoch-millisecond deadline.

use chrono::Utc;

// == Clock ==
/// Returns the current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// == Deadline Computation ==
/// Computes the expiry deadline for a TTL in seconds, relative to now.
pub fn deadline_for_ttl(ttl_seconds: u64) -> i64 {
    current_timestamp_ms() + (ttl_seconds as i64) * 1000
}

// == Record Encoding ==
/// Encodes a deadline as an expiry record string.
pub fn encode(deadline_ms: i64) -> String {
    deadline_ms.to_string()
}

/// Decodes an expiry record into a deadline.
///
/// Non-positive and unparseable records decode to `None`: the backend may
/// be shared with foreign writers, and a garbage record must read as "no
/// expiry" rather than destroy the entry.
pub fn decode(record: &str) -> Option<i64> {
    record.trim().parse::<i64>().ok().filter(|ms| *ms > 0)
}

// == Expiry Test ==
/// Returns true if a deadline lies strictly in the past.
///
/// Boundary condition: a deadline equal to the current millisecond has not
/// yet expired.
pub fn is_past(deadline_ms: i64) -> bool {
    deadline_ms < current_timestamp_ms()
}
