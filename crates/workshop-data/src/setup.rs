//! Workshop setup pipeline: read a data directory, resolve kinds and names,
//! and build a ready-to-run [`World`].
//!
//! A workshop directory holds up to five files, each as `.ron`, `.toml` or
//! `.json`:
//!
//! | base name    | required | contents                        |
//! |--------------|----------|---------------------------------|
//! | `stations`   | yes      | list of [`StationData`]         |
//! | `recipes`    | no       | list of [`RecipeData`]          |
//! | `generators` | no       | list of [`GeneratorData`]       |
//! | `cards`      | no       | list of starter [`CardData`]    |
//! | `config`     | no       | a single [`ConfigData`] table   |
//!
//! Without a recipes file the standard catalog is used.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use workshop_core::card::{CardKind, CardSpec};
use workshop_core::config::WorldConfig;
use workshop_core::fixed::Seconds;
use workshop_core::generator::{Generator, GeneratorKind};
use workshop_core::id::{CardId, GeneratorId, StationId};
use workshop_core::recipe::{RecipeCatalog, RecipeCatalogBuilder, RecipeDef};
use workshop_core::station::Station;
use workshop_core::world::World;

use crate::loader::{
    DataLoadError, claim_name, deserialize_file, deserialize_list, find_data_file,
    require_data_file,
};
use crate::schema::*;

/// Directory of the shipped Wizard's Workshop data set.
pub fn wizards_workshop_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data/wizards_workshop")
}

// ===========================================================================
// Resolved data
// ===========================================================================

/// Everything a workshop directory describes, resolved into engine types but
/// not yet placed in a world.
#[derive(Debug, Clone)]
pub struct WorkshopData {
    pub catalog: Arc<RecipeCatalog>,
    pub config: WorldConfig,
    /// In file order, which is also station registration order.
    pub stations: Vec<(String, Station)>,
    /// Clocks start at time zero.
    pub generators: Vec<(String, Generator)>,
    pub cards: Vec<CardSpec>,
}

/// A freshly built world plus name lookups for what was placed in it.
pub struct Workshop {
    pub world: World,
    pub stations: HashMap<String, StationId>,
    pub generators: HashMap<String, GeneratorId>,
    pub starter_cards: Vec<CardId>,
}

impl WorkshopData {
    /// Build a world at time zero.
    pub fn build_world(&self) -> Workshop {
        let mut world = World::new(self.catalog.clone(), self.config.clone());

        let stations = self
            .stations
            .iter()
            .map(|(name, station)| (name.clone(), world.add_station(station.clone())))
            .collect();
        let generators = self
            .generators
            .iter()
            .map(|(name, generator)| (name.clone(), world.add_generator(generator.clone())))
            .collect();
        let starter_cards = self
            .cards
            .iter()
            .map(|spec| world.create_card(spec.clone()))
            .collect();

        Workshop {
            world,
            stations,
            generators,
            starter_cards,
        }
    }
}

// ===========================================================================
// Loading
// ===========================================================================

/// Load and resolve every file in `dir`.
pub fn load_workshop(dir: &Path) -> Result<WorkshopData, DataLoadError> {
    let config = load_config(dir)?;
    let catalog = load_catalog(dir)?;
    let stations = load_stations(dir)?;
    let generators = load_generators(dir, &config)?;
    let cards = load_cards(dir, &catalog)?;

    tracing::info!(
        dir = %dir.display(),
        recipes = catalog.len(),
        stations = stations.len(),
        generators = generators.len(),
        cards = cards.len(),
        "loaded workshop"
    );

    Ok(WorkshopData {
        catalog: Arc::new(catalog),
        config,
        stations,
        generators,
        cards,
    })
}

/// [`load_workshop`] followed by [`WorkshopData::build_world`].
pub fn load_world(dir: &Path) -> Result<Workshop, DataLoadError> {
    Ok(load_workshop(dir)?.build_world())
}

fn parse_kind(kind: &str, title: &str, file: &Path) -> Result<CardKind, DataLoadError> {
    CardKind::parse(kind).ok_or_else(|| DataLoadError::UnknownCardKind {
        file: file.to_path_buf(),
        title: title.to_string(),
        kind: kind.to_string(),
    })
}

fn positive(value: f64, what: &str, name: &str, file: &Path) -> Result<Seconds, DataLoadError> {
    if value.is_finite() && value > 0.0 {
        to_fixed(value, what, name, file)
    } else {
        Err(DataLoadError::Invalid {
            file: file.to_path_buf(),
            name: name.to_string(),
            detail: format!("{what} must be positive, got {value}"),
        })
    }
}

fn load_config(dir: &Path) -> Result<WorldConfig, DataLoadError> {
    match find_data_file(dir, "config")? {
        Some(path) => {
            let data: ConfigData = deserialize_file(&path)?;
            positive(data.timestep, "timestep", "timestep", &path)?;
            data.to_world_config(&path)
        }
        None => Ok(WorldConfig::default()),
    }
}

fn load_catalog(dir: &Path) -> Result<RecipeCatalog, DataLoadError> {
    let Some(path) = find_data_file(dir, "recipes")? else {
        tracing::debug!(dir = %dir.display(), "no recipes file, using the standard catalog");
        return Ok(RecipeCatalog::standard());
    };

    let recipes: Vec<RecipeData> = deserialize_list(&path, "recipes")?;
    let mut builder = RecipeCatalogBuilder::with_standard_kinds();
    for recipe in &recipes {
        let inputs: Vec<&str> = recipe.inputs.iter().map(String::as_str).collect();
        let mut def = RecipeDef::new(&recipe.verb, &inputs, &recipe.output)
            .time(to_fixed(
                recipe.processing_time,
                "processing_time",
                &recipe.output,
                &path,
            )?)
            .describe(&recipe.description);
        if let Some(kind) = &recipe.kind {
            def = def.kind(parse_kind(kind, &recipe.output, &path)?);
        }
        builder.register(def);
    }

    builder
        .build()
        .map_err(|source| DataLoadError::Catalog { file: path, source })
}

fn load_stations(dir: &Path) -> Result<Vec<(String, Station)>, DataLoadError> {
    let path = require_data_file(dir, "stations")?;
    let data: Vec<StationData> = deserialize_list(&path, "stations")?;

    let mut seen = HashSet::new();
    let mut stations = Vec::with_capacity(data.len());
    for station in data {
        claim_name(&mut seen, &station.name, &path)?;
        if station.kind.is_empty() {
            return Err(DataLoadError::Invalid {
                file: path,
                name: station.name,
                detail: "station kind is empty".to_string(),
            });
        }
        let position = to_vec3(station.position, "position", &station.name, &path)?;
        let size = to_vec3(station.size, "size", &station.name, &path)?;
        stations.push((station.name, Station::new(&station.kind, position, size)));
    }
    Ok(stations)
}

fn load_generators(
    dir: &Path,
    config: &WorldConfig,
) -> Result<Vec<(String, Generator)>, DataLoadError> {
    let Some(path) = find_data_file(dir, "generators")? else {
        return Ok(Vec::new());
    };
    let data: Vec<GeneratorData> = deserialize_list(&path, "generators")?;

    let mut seen = HashSet::new();
    let mut generators = Vec::with_capacity(data.len());
    for entry in data {
        claim_name(&mut seen, &entry.name, &path)?;

        let interval = positive(entry.interval, "interval", &entry.name, &path)?;
        let position = to_vec3(entry.position, "position", &entry.name, &path)?;
        let kind = GeneratorKind::parse(&entry.kind);
        let mut generator = match kind {
            GeneratorKind::Custom => {
                let title = entry.title.as_deref().unwrap_or("Resource");
                let card_kind = match &entry.card_kind {
                    Some(k) => parse_kind(k, title, &path)?,
                    None => CardKind::Generic,
                };
                let lifetime = card_kind
                    .is_decaying_resource()
                    .then_some(config.resource_lifetime);
                Generator::custom(title, card_kind, position, interval, Seconds::ZERO)
                    .with_lifetime(lifetime)
            }
            _ => {
                let generator = Generator::new(kind, position, interval, Seconds::ZERO);
                let lifetime = generator
                    .resource_lifetime
                    .map(|_| config.resource_lifetime);
                generator.with_lifetime(lifetime)
            }
        };
        generator.is_active = entry.active;
        generators.push((entry.name, generator));
    }
    Ok(generators)
}

fn load_cards(dir: &Path, catalog: &RecipeCatalog) -> Result<Vec<CardSpec>, DataLoadError> {
    let Some(path) = find_data_file(dir, "cards")? else {
        return Ok(Vec::new());
    };
    let data: Vec<CardData> = deserialize_list(&path, "cards")?;

    data.into_iter()
        .map(|card| {
            let kind = match &card.kind {
                Some(k) => parse_kind(k, &card.title, &path)?,
                None => catalog.determine_output_type(&card.title),
            };
            let position = to_vec3(card.position, "position", &card.title, &path)?;
            let mut spec = CardSpec::new(card.title.clone(), kind, position);
            if let Some(lifetime) = card.lifetime {
                spec = spec.with_lifetime(positive(lifetime, "lifetime", &card.title, &path)?);
            }
            if card.resource {
                spec = spec.resource();
            }
            Ok(spec)
        })
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================
