use fixed::types::I32F32;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Simulation time in seconds. Fixed-point so runs are reproducible bit for bit.
pub type Seconds = Fixed64;

/// Convert an f64 to Fixed64. Use only for initialization, never in the sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and presentation.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Shorthand for building a [`Seconds`] value from a float literal.
#[inline]
pub fn secs(v: f64) -> Seconds {
    Fixed64::from_num(v)
}

/// Checked division for Fixed64 that returns None on a zero divisor.
#[inline]
pub fn checked_div_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_div(b)
}

// ---------------------------------------------------------------------------
// Vec3
// ---------------------------------------------------------------------------

/// A point in workshop space. Only used for placement and occupancy, never
/// for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: Fixed64,
    pub y: Fixed64,
    pub z: Fixed64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: Fixed64::ZERO,
        y: Fixed64::ZERO,
        z: Fixed64::ZERO,
    };

    pub fn new(x: Fixed64, y: Fixed64, z: Fixed64) -> Self {
        Self { x, y, z }
    }

    /// Build from floats. Presentation/data boundary only.
    pub fn from_f64(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: f64_to_fixed64(x),
            y: f64_to_fixed64(y),
            z: f64_to_fixed64(z),
        }
    }

    pub fn to_f64(self) -> (f64, f64, f64) {
        (
            fixed64_to_f64(self.x),
            fixed64_to_f64(self.y),
            fixed64_to_f64(self.z),
        )
    }

    /// Squared Euclidean distance. Saturates instead of overflowing for
    /// points that are absurdly far apart.
    pub fn distance_squared(&self, other: &Vec3) -> Fixed64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx.saturating_mul(dx)
            .saturating_add(dy.saturating_mul(dy))
            .saturating_add(dz.saturating_mul(dz))
    }

    /// True when `other` lies strictly closer than `threshold`.
    pub fn is_within(&self, other: &Vec3, threshold: Fixed64) -> bool {
        self.distance_squared(other) < threshold.saturating_mul(threshold)
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}
