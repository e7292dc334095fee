//! Simulation clock, state and hashing types.
//!
//! The world never reads wall time on its own. Callers either pass `now` to
//! [`World::advance`](crate::world::World::advance) or drive it with a
//! [`Clock`] through `advance_with`.

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, Seconds};
use crate::id::{CardId, StationId};
use crate::station::Completion;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the current simulation time.
pub trait Clock {
    fn now(&mut self) -> Seconds;
}

/// A clock moved by hand. Used by tests and by fixed-step drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualClock {
    now: Seconds,
}

impl ManualClock {
    pub fn new(start: Seconds) -> Self {
        Self { now: start }
    }

    pub fn set(&mut self, now: Seconds) {
        self.now = now;
    }

    pub fn advance(&mut self, dt: Seconds) -> Seconds {
        self.now += dt;
        self.now
    }
}

impl Clock for ManualClock {
    fn now(&mut self) -> Seconds {
        self.now
    }
}

/// Monotonic wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: std::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&mut self) -> Seconds {
        Fixed64::saturating_from_num(self.origin.elapsed().as_secs_f64())
    }
}

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Mutable simulation state tracked by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimState {
    /// Number of advances that actually ran.
    pub tick: u64,
    /// Time of the most recent advance.
    pub now: Seconds,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Advance result
// ---------------------------------------------------------------------------

/// What one `World::advance()` call changed.
#[derive(Debug, Default)]
pub struct AdvanceResult {
    /// False when the call was ignored (paused, shut down, or time went backwards).
    pub ran: bool,
    pub created: Vec<CardId>,
    pub destroyed: Vec<CardId>,
    pub completions: Vec<(StationId, Completion)>,
    /// Stations whose staged inputs were handed back.
    pub returned: Vec<StationId>,
}

impl AdvanceResult {
    pub(crate) fn skipped() -> Self {
        Self::default()
    }

    pub fn is_quiet(&self) -> bool {
        self.created.is_empty()
            && self.destroyed.is_empty()
            && self.completions.is_empty()
            && self.returned.is_empty()
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A deterministic hash of world state for replay and desync checks.
///
/// FNV-1a (64-bit). Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write(&[v as u8]);
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    /// Length-prefixed so `"ab" + "c"` and `"a" + "bc"` differ.
    pub fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write(s.as_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
