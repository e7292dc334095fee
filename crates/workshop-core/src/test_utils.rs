//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::cell::RefCell;
use std::rc::Rc;

use crate::card::{CardKind, CardSpec};
use crate::event::EventKind;
use crate::fixed::{Fixed64, Vec3, secs};
use crate::generator::GeneratorKind;
use crate::id::{CardId, GeneratorId, StationId};
use crate::station::Station;
use crate::world::World;

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Standard layout
// ===========================================================================

/// The four workshop stations at their usual spots, in registration order
/// forge, study, ritual, alchemy.
pub fn add_standard_stations(world: &mut World) -> Vec<StationId> {
    vec![
        world.add_station(Station::new(
            "forge",
            Vec3::from_f64(5.0, 0.0, 2.0),
            Vec3::from_f64(2.0, 1.0, 2.0),
        )),
        world.add_station(Station::new(
            "study",
            Vec3::from_f64(-5.0, 0.0, 2.0),
            Vec3::from_f64(2.5, 0.5, 1.5),
        )),
        world.add_station(Station::new(
            "ritual",
            Vec3::from_f64(0.0, 0.0, 5.0),
            Vec3::from_f64(3.0, 0.2, 3.0),
        )),
        world.add_station(Station::new(
            "alchemy",
            Vec3::from_f64(0.0, 0.0, -5.0),
            Vec3::from_f64(1.5, 1.5, 1.5),
        )),
    ]
}

/// Mana spring, herb garden and crystal formation.
pub fn add_standard_generators(world: &mut World) -> Vec<GeneratorId> {
    vec![
        world.spawn_generator(
            GeneratorKind::Mana,
            Vec3::from_f64(-8.0, 0.5, 0.0),
            secs(5.0),
        ),
        world.spawn_generator(
            GeneratorKind::Herb,
            Vec3::from_f64(8.0, 0.5, 0.0),
            secs(10.0),
        ),
        world.spawn_generator(
            GeneratorKind::Crystal,
            Vec3::from_f64(0.0, 0.5, 8.0),
            secs(20.0),
        ),
    ]
}

/// Standard catalog plus the four stations. No cards, no generators.
pub fn standard_world() -> World {
    let mut world = World::with_standard_catalog();
    add_standard_stations(&mut world);
    world
}

// ===========================================================================
// Cards
// ===========================================================================

/// A mana resource card with the given lifetime in seconds.
pub fn mana_spec(position: Vec3, lifetime: f64) -> CardSpec {
    CardSpec::new("Mana", CardKind::Mana, position)
        .with_lifetime(secs(lifetime))
        .resource()
}

/// Create a permanent card off to the side of the workshop, well clear of
/// every station zone.
pub fn place(world: &mut World, title: &str) -> CardId {
    let slot = world.card_count() as f64;
    let spec = world.spec_for(title, Vec3::from_f64(-20.0 + slot * 2.0, 0.1, -20.0));
    world.create_card(spec)
}

/// Create one card per title and drop each onto `station`.
pub fn drop_titles(world: &mut World, station: StationId, titles: &[&str]) -> Vec<CardId> {
    let at = world
        .station(station)
        .map(|s| s.position)
        .unwrap_or(Vec3::ZERO);
    titles
        .iter()
        .map(|title| {
            let card = place(world, title);
            assert!(world.route_drop(card, at), "station refused {title}");
            card
        })
        .collect()
}

// ===========================================================================
// Events
// ===========================================================================

/// Count delivered events of one kind.
pub fn count_events(world: &mut World, kind: EventKind) -> Rc<RefCell<usize>> {
    let count = Rc::new(RefCell::new(0usize));
    let inner = count.clone();
    world.on_passive(kind, Box::new(move |_| *inner.borrow_mut() += 1));
    count
}

/// Advance from the current time to `until` in steps of `dt` seconds.
pub fn run_until(world: &mut World, until: f64, dt: f64) {
    let mut t = world.now().to_num::<f64>();
    while t < until {
        t = (t + dt).min(until);
        world.advance(secs(t));
    }
}
