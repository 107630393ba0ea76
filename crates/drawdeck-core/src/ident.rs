//! Identifier and randomness capability.
//!
//! Element ids, group ids, rendering seeds and timestamps all come from one
//! small trait so tests can inject deterministic sequences.

use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Source of unique identifiers, rendering seeds and timestamps.
pub trait IdentitySource: Send + Sync {
    /// Generate a fresh element/group identifier.
    fn next_id(&mut self) -> String;

    /// Generate a 31-bit non-negative rendering seed.
    fn next_seed(&mut self) -> i64;

    /// Current wall-clock time in milliseconds since the Unix epoch.
    fn now_ms(&mut self) -> u64;
}

/// Production identity source: uuid v4 ids, hashed-counter seeds, system clock.
#[derive(Debug, Default)]
pub struct SystemIdentity {
    counter: u32,
}

impl SystemIdentity {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentitySource for SystemIdentity {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }

    fn next_seed(&mut self) -> i64 {
        self.counter = self.counter.wrapping_add(1);
        let counter = self.counter;
        let entropy = counter ^ (self.now_ms() as u32);
        (splitmix32(entropy) & 0x7FFF_FFFF) as i64
    }

    fn now_ms(&mut self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Mix a counter value for better distribution (splitmix32 finalizer).
fn splitmix32(value: u32) -> u32 {
    let mut x = value.wrapping_mul(0x9E37_79B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x85EB_CA6B);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2_AE35);
    x ^= x >> 16;
    x
}

/// Deterministic identity source for tests: counted ids and seeds, a fixed
/// millisecond clock that ticks once per read.
#[derive(Debug)]
pub struct SequentialIdentity {
    next: u64,
    clock_ms: u64,
}

impl SequentialIdentity {
    pub fn new() -> Self {
        Self {
            next: 0,
            clock_ms: 1_700_000_000_000,
        }
    }
}

impl Default for SequentialIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentitySource for SequentialIdentity {
    fn next_id(&mut self) -> String {
        self.next += 1;
        format!("id-{:04}", self.next)
    }

    fn next_seed(&mut self) -> i64 {
        self.next += 1;
        1_000 + self.next as i64
    }

    fn now_ms(&mut self) -> u64 {
        self.clock_ms += 1;
        self.clock_ms
    }
}
