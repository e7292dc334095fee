//! Workshop Core -- the crafting rules engine for Wizard's Workshop.
//!
//! Cards are typed, titled tokens. Dropping cards onto a station (a verb such
//! as "forge") stages them; when the staged titles form a recipe the station
//! runs a timed process and the world turns the inputs into a new card.
//! Generators periodically drop fresh resources onto free spots, and some
//! resources decay if left unused.
//!
//! # Pipeline
//!
//! Each call to [`world::World::advance`] runs, in order:
//!
//! 1. **Deferred spawns** -- output cards whose post-completion delay elapsed.
//! 2. **Mutations** -- card creations/removals queued by reactive handlers.
//! 3. **Cards** -- decay clocks; expired cards are removed.
//! 4. **Generators** -- due spawn attempts, blocked when every spot is taken.
//! 5. **Stations** -- progress is evaluated once; finished processes complete.
//! 6. **Post-tick** -- buffered events are delivered to subscribers.
//! 7. **Bookkeeping** -- tick counter and state hash.
//!
//! # Key Types
//!
//! - [`world::World`] -- owns every card, station and generator.
//! - [`recipe::RecipeCatalog`] -- immutable recipe table with multiset matching.
//! - [`station::Station`] -- the per-verb processing state machine.
//! - [`generator::Generator`] -- timed resource source.
//! - [`card::Card`] -- a live card and its decay lifecycle.
//! - [`event::EventBus`] -- buffered, typed events with passive and reactive
//!   subscribers.
//! - [`fixed::Fixed64`] -- Q32.32 fixed point used for time and positions.
//! - [`serialize`] -- versioned snapshots via bitcode.

pub mod card;
pub mod config;
pub mod event;
pub mod fixed;
pub mod generator;
pub mod id;
pub mod query;
pub mod recipe;
pub mod serialize;
pub mod sim;
pub mod station;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
