//! Temporal identifiers
//!
//! A [`Tid`] is a 16-byte, byte-comparable identifier: 48 bits of
//! milliseconds since the Unix epoch followed by an 80-bit tie-breaker.
//! Big-endian byte order equals numeric order, so identifiers sort by
//! creation time wherever they appear in a key.
//!
//! ## Generation
//!
//! - [`Tid::new`] uses a process-wide monotonic generator: identifiers
//!   minted within the same millisecond increment the previous tie-breaker
//!   instead of drawing a fresh random one.
//! - [`Tid::from_time`] stamps an arbitrary (possibly historical) time with a
//!   random tie-breaker. It is not monotonic.
//! - The all-zero identifier is the "unassigned" sentinel.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::{Generator, Ulid};

/// Width in bytes of an encoded identifier
pub const TID_LEN: usize = 16;

const RANDOM_BITS: u32 = 80;
const RANDOM_MASK: u128 = (1u128 << RANDOM_BITS) - 1;

/// Latest millisecond an identifier can carry (48 bits)
pub const MAX_TIMESTAMP_MS: u64 = (1 << 48) - 1;

static GENERATOR: Lazy<Mutex<Generator>> = Lazy::new(|| Mutex::new(Generator::new()));

/// Time-ordered unique identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tid(Ulid);

impl Tid {
    /// The unassigned sentinel
    pub const ZERO: Tid = Tid(Ulid(0));

    /// The largest representable identifier
    pub const MAX: Tid = Tid(Ulid(u128::MAX));

    /// Mint a new identifier for the current instant
    pub fn new() -> Self {
        let mut generator = GENERATOR.lock();
        match generator.generate() {
            Ok(ulid) => Tid(ulid),
            // tie-breaker space for this millisecond exhausted
            Err(_) => Tid(Ulid::new()),
        }
    }

    /// Identifier for `t` with a random tie-breaker
    ///
    /// Times outside the identifier range clamp to its ends.
    pub fn from_time(t: DateTime<Utc>) -> Self {
        Self::from_parts(millis_of(t), rand::random::<u128>())
    }

    /// Build from a millisecond timestamp and tie-breaker
    ///
    /// Timestamps past [`MAX_TIMESTAMP_MS`] clamp to it; only the low 80
    /// bits of `random` are kept.
    pub fn from_parts(timestamp_ms: u64, random: u128) -> Self {
        Tid(Ulid::from_parts(timestamp_ms.min(MAX_TIMESTAMP_MS), random))
    }

    /// Smallest identifier of the given millisecond
    pub fn floor_of(timestamp_ms: u64) -> Self {
        Self::from_parts(timestamp_ms, 0)
    }

    /// Largest identifier of the given millisecond
    pub fn ceiling_of(timestamp_ms: u64) -> Self {
        Self::from_parts(timestamp_ms, RANDOM_MASK)
    }

    /// Returns true for the unassigned sentinel
    pub fn is_zero(&self) -> bool {
        self.0.is_nil()
    }

    /// Milliseconds since the Unix epoch
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }

    /// Creation time at millisecond resolution
    pub fn time(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp_ms() as i64).unwrap_or_default()
    }

    /// Fixed-width big-endian encoding
    pub fn to_bytes(&self) -> [u8; TID_LEN] {
        self.0.to_bytes()
    }

    /// Decode from exactly [`TID_LEN`] bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; TID_LEN] = bytes.try_into().ok()?;
        Some(Tid(Ulid::from_bytes(array)))
    }
}

/// Milliseconds since the epoch for `t`, clamped to the identifier range
pub fn millis_of(t: DateTime<Utc>) -> u64 {
    u64::try_from(t.timestamp_millis())
        .unwrap_or(0)
        .min(MAX_TIMESTAMP_MS)
}

/// Milliseconds since the epoch for `t`, if an identifier can carry them
pub fn exact_millis_of(t: DateTime<Utc>) -> Option<u64> {
    u64::try_from(t.timestamp_millis())
        .ok()
        .filter(|ms| *ms <= MAX_TIMESTAMP_MS)
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tid({})", self.0)
    }
}
