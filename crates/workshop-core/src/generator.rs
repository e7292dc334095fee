//! Card generators: timers that periodically drop a resource card into one of
//! a fixed set of nearby spots.

use serde::{Deserialize, Serialize};

use crate::card::{CardKind, CardSpec};
use crate::fixed::{Fixed64, Seconds, Vec3, secs};

/// Lifetime given to generated mana.
pub const DEFAULT_RESOURCE_LIFETIME: f64 = 30.0;

/// Candidate spawn spots relative to the generator, tried in order.
pub fn spawn_offsets() -> [Vec3; 6] {
    [
        Vec3::from_f64(2.0, 0.1, 0.0),
        Vec3::from_f64(-2.0, 0.1, 0.0),
        Vec3::from_f64(0.0, 0.1, 2.0),
        Vec3::from_f64(0.0, 0.1, -2.0),
        Vec3::from_f64(1.5, 0.1, 1.5),
        Vec3::from_f64(-1.5, 0.1, 1.5),
    ]
}

/// Anything that can tell whether a spot on the table is taken.
pub trait Occupancy {
    /// True if some live, non-decaying card lies strictly within `threshold`.
    fn is_position_occupied(&self, position: Vec3, threshold: Fixed64) -> bool;
}

/// Which preset a generator was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    Mana,
    Herb,
    Crystal,
    Custom,
}

impl GeneratorKind {
    /// Unknown names map to `Custom`.
    pub fn parse(name: &str) -> GeneratorKind {
        match name {
            "mana" => GeneratorKind::Mana,
            "herb" => GeneratorKind::Herb,
            "crystal" => GeneratorKind::Crystal,
            _ => GeneratorKind::Custom,
        }
    }

    /// `(label, produced title, produced kind)` for this preset.
    pub fn preset(self) -> (&'static str, &'static str, CardKind) {
        match self {
            GeneratorKind::Mana => ("Mana Spring", "Mana", CardKind::Mana),
            GeneratorKind::Herb => ("Herb Garden", "Herb", CardKind::Herb),
            GeneratorKind::Crystal => ("Crystal Formation", "Crystal Shard", CardKind::Crystal),
            GeneratorKind::Custom => ("Generator", "Resource", CardKind::Generic),
        }
    }
}

/// Result of one [`Generator::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorTick {
    /// Interval not reached yet, or the generator is inactive.
    Idle,
    /// A card should be created from this spec.
    Spawn(CardSpec),
    /// Every spawn spot was occupied. The attempt still counts.
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generator {
    pub kind: GeneratorKind,
    pub label: String,
    /// Title of the cards produced.
    pub title: String,
    pub card_kind: CardKind,
    pub interval: Seconds,
    pub position: Vec3,
    pub is_active: bool,
    /// Lifetime stamped on produced cards, if any.
    pub resource_lifetime: Option<Seconds>,
    last_generation: Seconds,
}

impl Generator {
    /// Build from a preset. Mana is produced as a decaying resource.
    pub fn new(kind: GeneratorKind, position: Vec3, interval: Seconds, now: Seconds) -> Self {
        let (label, title, card_kind) = kind.preset();
        let resource_lifetime = card_kind
            .is_decaying_resource()
            .then(|| secs(DEFAULT_RESOURCE_LIFETIME));
        Self {
            kind,
            label: label.to_string(),
            title: title.to_string(),
            card_kind,
            interval,
            position,
            is_active: true,
            resource_lifetime,
            last_generation: now,
        }
    }

    /// Produce an arbitrary titled card.
    pub fn custom(
        title: &str,
        card_kind: CardKind,
        position: Vec3,
        interval: Seconds,
        now: Seconds,
    ) -> Self {
        let mut generator = Self::new(GeneratorKind::Custom, position, interval, now);
        generator.title = title.to_string();
        generator.card_kind = card_kind;
        generator
    }

    pub fn with_lifetime(mut self, lifetime: Option<Seconds>) -> Self {
        self.resource_lifetime = lifetime;
        self
    }

    pub fn last_generation(&self) -> Seconds {
        self.last_generation
    }

    /// When the next attempt becomes due.
    pub fn next_due(&self) -> Seconds {
        self.last_generation.saturating_add(self.interval)
    }

    /// First free spawn spot, or `None` when all are taken.
    pub fn find_spawn_position(&self, occupancy: &impl Occupancy, threshold: Fixed64) -> Option<Vec3> {
        spawn_offsets()
            .into_iter()
            .map(|offset| self.position + offset)
            .find(|pos| !occupancy.is_position_occupied(*pos, threshold))
    }

    /// Attempt generation. Every attempt past the interval resets the timer,
    /// whether or not a spot was found.
    pub fn tick(&mut self, now: Seconds, occupancy: &impl Occupancy, threshold: Fixed64) -> GeneratorTick {
        if !self.is_active || now < self.next_due() {
            return GeneratorTick::Idle;
        }
        self.last_generation = now;
        match self.find_spawn_position(occupancy, threshold) {
            Some(position) => {
                let mut spec = CardSpec::new(self.title.clone(), self.card_kind, position);
                if let Some(lifetime) = self.resource_lifetime {
                    spec = spec.with_lifetime(lifetime).resource();
                }
                GeneratorTick::Spawn(spec)
            }
            None => GeneratorTick::Blocked,
        }
    }
}
