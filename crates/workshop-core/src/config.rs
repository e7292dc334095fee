use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, Seconds, Vec3, secs};

/// Tunables for a [`World`](crate::world::World).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Time added per `World::step()`.
    pub timestep: Seconds,
    /// Two cards closer than this occupy the same spot.
    pub occupancy_threshold: Fixed64,
    /// How long a decaying card lingers before removal.
    pub decay_grace: Seconds,
    /// Delay between recipe completion and the output card appearing.
    pub output_delay: Seconds,
    /// Output card position relative to the station.
    pub output_offset: Vec3,
    /// Lifetime given to generated mana.
    pub resource_lifetime: Seconds,
    /// Per-kind event ring buffer size.
    pub event_capacity: usize,
    /// Hand accumulated cards back after this long without a new card.
    /// `None` keeps them forever.
    pub stall_timeout: Option<Seconds>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            timestep: secs(0.1),
            occupancy_threshold: secs(1.5),
            decay_grace: secs(0.5),
            output_delay: secs(0.4),
            output_offset: Vec3::from_f64(0.0, 0.1, -3.0),
            resource_lifetime: secs(30.0),
            event_capacity: 1024,
            stall_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = WorldConfig::default();
        assert_eq!(config.occupancy_threshold, secs(1.5));
        assert_eq!(config.decay_grace, secs(0.5));
        assert_eq!(config.output_delay, secs(0.4));
        assert_eq!(config.resource_lifetime, secs(30.0));
        assert_eq!(config.stall_timeout, None);
    }
}
