//! Snapshot support for the world.
//!
//! Binary serialization via `bitcode` with a versioned header. The catalog
//! is not stored: a snapshot records its fingerprint and can only be
//! restored against a catalog with the same fingerprint.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::card::Card;
use crate::config::WorldConfig;
use crate::event::EventBus;
use crate::generator::Generator;
use crate::id::{CardId, GeneratorId, StationId};
use crate::recipe::RecipeCatalog;
use crate::sim::SimState;
use crate::station::Station;
use crate::world::{PendingSpawn, World};

/// Magic number identifying a workshop world snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x5A4B_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("catalog mismatch: snapshot was taken with 0x{expected:016X}, got 0x{actual:016X}")]
    CatalogMismatch { expected: u64, actual: u64 },
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick count at the time the snapshot was taken.
    pub tick: u64,
    /// [`RecipeCatalog::fingerprint`] of the catalog in use.
    pub catalog: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64, catalog: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
            catalog,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Decode a snapshot and return only its header.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    let snapshot: WorldSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

// ---------------------------------------------------------------------------
// Serializable world state
// ---------------------------------------------------------------------------

/// Everything but the event bus (closures) and the catalog (shared, checked
/// by fingerprint).
#[derive(Debug, Serialize, Deserialize)]
struct WorldSnapshot {
    header: SnapshotHeader,
    config: WorldConfig,
    cards: SlotMap<CardId, Card>,
    stations: SlotMap<StationId, Station>,
    station_order: Vec<StationId>,
    generators: SlotMap<GeneratorId, Generator>,
    generator_order: Vec<GeneratorId>,
    pending_spawns: Vec<PendingSpawn>,
    sim_state: SimState,
    paused: bool,
    last_state_hash: u64,
}

impl World {
    /// Serialize to a binary blob. Event subscribers are not included.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = WorldSnapshot {
            header: SnapshotHeader::new(self.sim_state.tick, self.catalog.fingerprint()),
            config: self.config.clone(),
            cards: self.cards.clone(),
            stations: self.stations.clone(),
            station_order: self.station_order.clone(),
            generators: self.generators.clone(),
            generator_order: self.generator_order.clone(),
            pending_spawns: self.pending_spawns.clone(),
            sim_state: self.sim_state,
            paused: self.paused,
            last_state_hash: self.last_state_hash,
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Restore a world against `catalog`.
    ///
    /// The event bus is recreated empty; subscribers must be re-registered.
    pub fn deserialize(data: &[u8], catalog: Arc<RecipeCatalog>) -> Result<Self, DeserializeError> {
        let snapshot: WorldSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;

        let actual = catalog.fingerprint();
        if snapshot.header.catalog != actual {
            return Err(DeserializeError::CatalogMismatch {
                expected: snapshot.header.catalog,
                actual,
            });
        }

        let event_bus = EventBus::new(snapshot.config.event_capacity);
        Ok(World {
            config: snapshot.config,
            catalog,
            cards: snapshot.cards,
            stations: snapshot.stations,
            station_order: snapshot.station_order,
            generators: snapshot.generators,
            generator_order: snapshot.generator_order,
            pending_spawns: snapshot.pending_spawns,
            sim_state: snapshot.sim_state,
            paused: snapshot.paused,
            shut_down: false,
            last_state_hash: snapshot.last_state_hash,
            event_bus,
        })
    }
}
