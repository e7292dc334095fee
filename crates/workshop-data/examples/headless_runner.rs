//! Headless workshop run: load the shipped data set, drop the starter cards
//! onto their stations, and let the simulation run for a minute of game time.
//!
//! The run is repeated on a second world and the state hashes compared, so
//! this doubles as a determinism smoke test.
//!
//! Run with: `RUST_LOG=debug cargo run -p workshop-data --example headless_runner`

use tracing_subscriber::EnvFilter;
use workshop_core::event::{Event, EventKind};
use workshop_core::world::World;
use workshop_data::{Workshop, load_world, wizards_workshop_dir};

const STEPS: u32 = 600;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Pick up the first free card titled `title` and drop it on `station`.
fn hand_over(workshop: &mut Workshop, title: &str, station: &str) {
    let world = &mut workshop.world;
    let station = workshop.stations[station];
    let at = world.station(station).expect("station exists").position;
    let card = world
        .cards_titled(title)
        .into_iter()
        .find(|id| world.card(*id).is_some_and(|c| c.station().is_none()))
        .expect("card on the table");
    world.pickup_card(card);
    world.drag_card(card, at);
    world.route_drop(card, at);
}

fn run(verbose: bool) -> (Workshop, u64) {
    let mut workshop = load_world(&wizards_workshop_dir()).expect("shipped data loads");
    if verbose {
        workshop.world.on_passive(
            EventKind::RecipeCompleted,
            Box::new(|event| {
                if let Event::RecipeCompleted { recipe, at, .. } = event {
                    println!("recipe {} completed at {:.1}s", recipe.0, at.to_num::<f64>());
                }
            }),
        );
    }

    hand_over(&mut workshop, "Iron Ore", "forge");
    hand_over(&mut workshop, "Coal", "forge");
    hand_over(&mut workshop, "Mysterious Tome", "study");

    for _ in 0..STEPS {
        workshop.world.step();
    }
    let hash = workshop.world.state_hash();
    (workshop, hash)
}

fn report(world: &World) {
    println!("t = {:.1}s, {} cards", world.now().to_num::<f64>(), world.card_count());
    for station in world.station_snapshots() {
        println!("  {:<8} {:?}", station.kind, station.state);
    }
    for card in world.card_snapshots() {
        let (x, _, z) = card.position.to_f64();
        let fade = card
            .remaining_fraction
            .map(|f| format!(" ({:.0}% left)", f.to_num::<f64>() * 100.0))
            .unwrap_or_default();
        println!("  card {:<26} at ({x:>5.1}, {z:>5.1}){fade}", card.title);
    }
    println!("  mana on the table: {}", world.count_titled("Mana"));
}

fn main() {
    init_tracing();

    let (first, hash) = run(true);
    report(&first.world);

    let (_, replay) = run(false);
    println!("state hash 0x{hash:016X}, replay 0x{replay:016X}");
    assert_eq!(hash, replay, "replay diverged");
}
