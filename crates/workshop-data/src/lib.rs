//! Data-driven workshop content: recipes, stations, generators, starter cards
//! and world tunables loaded from RON, TOML or JSON files.

pub mod loader;
pub mod schema;
pub mod setup;

pub use loader::DataLoadError;
pub use setup::{Workshop, WorkshopData, load_workshop, load_world, wizards_workshop_dir};
