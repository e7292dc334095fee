//! Cards: typed, titled tokens that are combined and consumed at stations.
//!
//! A card's `title` is its semantic identity for recipe matching; its
//! [`CardKind`] is a coarse category used for presentation and for deciding
//! which generated resources decay.

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, Seconds, Vec3};
use crate::id::{CardId, StationId};

// ---------------------------------------------------------------------------
// Card kind
// ---------------------------------------------------------------------------

/// Category tag of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Ingredient,
    Knowledge,
    Tool,
    Mana,
    Spell,
    Essence,
    Potion,
    Crystal,
    Herb,
    #[default]
    Generic,
}

impl CardKind {
    pub const ALL: [CardKind; 10] = [
        CardKind::Ingredient,
        CardKind::Knowledge,
        CardKind::Tool,
        CardKind::Mana,
        CardKind::Spell,
        CardKind::Essence,
        CardKind::Potion,
        CardKind::Crystal,
        CardKind::Herb,
        CardKind::Generic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CardKind::Ingredient => "ingredient",
            CardKind::Knowledge => "knowledge",
            CardKind::Tool => "tool",
            CardKind::Mana => "mana",
            CardKind::Spell => "spell",
            CardKind::Essence => "essence",
            CardKind::Potion => "potion",
            CardKind::Crystal => "crystal",
            CardKind::Herb => "herb",
            CardKind::Generic => "generic",
        }
    }

    /// Parse a lowercase kind name.
    pub fn parse(name: &str) -> Option<CardKind> {
        CardKind::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Generated cards of this kind fade away unless used.
    pub fn is_decaying_resource(self) -> bool {
        matches!(self, CardKind::Mana)
    }
}

impl std::fmt::Display for CardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Creation request
// ---------------------------------------------------------------------------

/// Everything needed to materialize a card. Passed to
/// [`World::create_card`](crate::world::World::create_card).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSpec {
    pub title: String,
    pub kind: CardKind,
    pub position: Vec3,
    pub lifetime: Option<Seconds>,
    pub is_resource: bool,
}

impl CardSpec {
    /// A permanent, non-resource card.
    pub fn new(title: impl Into<String>, kind: CardKind, position: Vec3) -> Self {
        Self {
            title: title.into(),
            kind,
            position,
            lifetime: None,
            is_resource: false,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Seconds) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn resource(mut self) -> Self {
        self.is_resource = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// Lifecycle phase of a live card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CardPhase {
    #[default]
    Active,
    /// Lifetime ran out. Still occupies its spot until `remove_at`, but can no
    /// longer be accepted or matched. There is no way back to `Active`.
    Decaying { remove_at: Seconds },
}

/// What a single [`Card::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardTick {
    Unchanged,
    StartedDecay,
    /// The decay grace interval is over; the world should destroy the card.
    Expired,
}

/// A live card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub title: String,
    pub kind: CardKind,
    pub position: Vec3,
    pub is_resource: bool,
    lifetime: Option<Seconds>,
    created_at: Seconds,
    is_held: bool,
    phase: CardPhase,
    /// Station this card currently sits on, if any.
    pub(crate) station: Option<StationId>,
}

impl Card {
    pub fn new(id: CardId, spec: CardSpec, now: Seconds) -> Self {
        Self {
            id,
            title: spec.title,
            kind: spec.kind,
            position: spec.position,
            is_resource: spec.is_resource,
            lifetime: spec.lifetime,
            created_at: now,
            is_held: false,
            phase: CardPhase::Active,
            station: None,
        }
    }

    pub fn lifetime(&self) -> Option<Seconds> {
        self.lifetime
    }

    pub fn created_at(&self) -> Seconds {
        self.created_at
    }

    pub fn phase(&self) -> CardPhase {
        self.phase
    }

    pub fn is_decaying(&self) -> bool {
        matches!(self.phase, CardPhase::Decaying { .. })
    }

    pub fn is_held(&self) -> bool {
        self.is_held
    }

    pub fn station(&self) -> Option<StationId> {
        self.station
    }

    /// `max(0, 1 - elapsed / lifetime)`, or `None` for permanent cards.
    pub fn remaining_fraction(&self, now: Seconds) -> Option<Fixed64> {
        let lifetime = self.lifetime?;
        if self.is_decaying() || lifetime <= Fixed64::ZERO {
            return Some(Fixed64::ZERO);
        }
        let elapsed = (now - self.created_at).max(Fixed64::ZERO);
        let used = elapsed / lifetime;
        Some((Fixed64::from_num(1) - used).max(Fixed64::ZERO))
    }

    /// Advance the decay clock.
    pub fn tick(&mut self, now: Seconds, grace: Seconds) -> CardTick {
        match self.phase {
            CardPhase::Decaying { remove_at } => {
                if now >= remove_at {
                    CardTick::Expired
                } else {
                    CardTick::Unchanged
                }
            }
            CardPhase::Active => match self.remaining_fraction(now) {
                Some(remaining) if remaining <= Fixed64::ZERO => {
                    self.phase = CardPhase::Decaying {
                        remove_at: now + grace,
                    };
                    self.is_held = false;
                    CardTick::StartedDecay
                }
                _ => CardTick::Unchanged,
            },
        }
    }

    /// Interaction hook. Has no effect on recipe logic.
    pub fn pickup(&mut self) {
        self.is_held = true;
    }

    pub fn drop(&mut self) {
        self.is_held = false;
    }

    /// Follow the pointer on the X/Z plane while held.
    pub fn drag_to(&mut self, target: Vec3) -> bool {
        if !self.is_held {
            return false;
        }
        self.position.x = target.x;
        self.position.z = target.z;
        true
    }
}
