//! Read-only query API for inspecting world state.
//!
//! Snapshot types aggregate world state into convenient views for rendering,
//! HUD and recipe-browser consumers. All types are owned copies -- no
//! references into internal world storage.

use crate::card::CardKind;
use crate::fixed::{Fixed64, Seconds, Vec3};
use crate::id::{CardId, GeneratorId, StationId};
use crate::station::{StagedCard, StationState};
use crate::world::World;

// ---------------------------------------------------------------------------
// Card snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CardSnapshot {
    pub id: CardId,
    pub title: String,
    pub kind: CardKind,
    pub position: Vec3,
    /// `None` for permanent cards.
    pub remaining_fraction: Option<Fixed64>,
    pub is_decaying: bool,
    pub is_held: bool,
    pub is_resource: bool,
    pub station: Option<StationId>,
}

// ---------------------------------------------------------------------------
// Station snapshot
// ---------------------------------------------------------------------------

/// A station as a presentation layer would draw it.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSnapshot {
    pub id: StationId,
    pub kind: String,
    pub position: Vec3,
    pub size: Vec3,
    pub state: StationState,
    pub active: Vec<StagedCard>,
    /// 0..1 while processing.
    pub progress: Option<Fixed64>,
    /// Title the running recipe will produce.
    pub pending_output: Option<String>,
}

// ---------------------------------------------------------------------------
// Generator snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSnapshot {
    pub id: GeneratorId,
    pub label: String,
    pub title: String,
    pub position: Vec3,
    pub interval: Seconds,
    pub next_due: Seconds,
    pub is_active: bool,
}

impl World {
    pub fn card_snapshot(&self, id: CardId) -> Option<CardSnapshot> {
        let card = self.cards.get(id)?;
        Some(CardSnapshot {
            id,
            title: card.title.clone(),
            kind: card.kind,
            position: card.position,
            remaining_fraction: card.remaining_fraction(self.sim_state.now),
            is_decaying: card.is_decaying(),
            is_held: card.is_held(),
            is_resource: card.is_resource,
            station: card.station(),
        })
    }

    pub fn station_snapshot(&self, id: StationId) -> Option<StationSnapshot> {
        let station = self.stations.get(id)?;
        let pending_output = station
            .current_recipe()
            .and_then(|r| self.catalog.get(r))
            .map(|r| r.output.clone());
        Some(StationSnapshot {
            id,
            kind: station.kind.clone(),
            position: station.position,
            size: station.size,
            state: station.state(),
            active: station.active_cards().to_vec(),
            progress: station.progress(self.sim_state.now),
            pending_output,
        })
    }

    pub fn generator_snapshot(&self, id: GeneratorId) -> Option<GeneratorSnapshot> {
        let generator = self.generators.get(id)?;
        Some(GeneratorSnapshot {
            id,
            label: generator.label.clone(),
            title: generator.title.clone(),
            position: generator.position,
            interval: generator.interval,
            next_due: generator.next_due(),
            is_active: generator.is_active,
        })
    }

    pub fn card_snapshots(&self) -> Vec<CardSnapshot> {
        self.cards
            .keys()
            .filter_map(|id| self.card_snapshot(id))
            .collect()
    }

    /// In registration order.
    pub fn station_snapshots(&self) -> Vec<StationSnapshot> {
        self.station_order
            .iter()
            .filter_map(|id| self.station_snapshot(*id))
            .collect()
    }

    /// In registration order.
    pub fn generator_snapshots(&self) -> Vec<GeneratorSnapshot> {
        self.generator_order
            .iter()
            .filter_map(|id| self.generator_snapshot(*id))
            .collect()
    }
}
