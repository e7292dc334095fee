//! The recipe catalog: an immutable, ordered table of transformation rules.
//!
//! Matching is exact multiset equality on card titles, scoped to a verb.
//! Lookup is a linear scan in declaration order, so the first declared
//! recipe wins when two could match.

use std::collections::HashMap;

use crate::card::CardKind;
use crate::fixed::{Seconds, secs};
use crate::id::RecipeId;
use crate::sim::StateHash;

/// Processing time used when a recipe does not specify one.
pub const DEFAULT_PROCESSING_TIME: f64 = 3.0;

// ---------------------------------------------------------------------------
// Recipe
// ---------------------------------------------------------------------------

/// A single transformation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub verb: String,
    pub inputs: Vec<String>,
    pub output: String,
    pub output_kind: CardKind,
    pub processing_time: Seconds,
    pub description: String,
    /// `inputs`, sorted. Precomputed once so matching never re-sorts the recipe side.
    canonical: Vec<String>,
}

impl Recipe {
    fn new(def: RecipeDef, output_kind: CardKind) -> Self {
        let canonical = canonical_titles(def.inputs.iter().map(String::as_str));
        Self {
            verb: def.verb,
            inputs: def.inputs,
            output: def.output,
            output_kind,
            processing_time: def.processing_time,
            description: def.description,
            canonical,
        }
    }

    /// True when `titles` is exactly this recipe's input multiset at `verb`.
    pub fn matches<S: AsRef<str>>(&self, verb: &str, titles: &[S]) -> bool {
        if verb != self.verb || titles.len() != self.canonical.len() {
            return false;
        }
        let sorted = canonical_titles(titles.iter().map(AsRef::as_ref));
        sorted == self.canonical
    }

    /// Input titles in sorted order.
    pub fn canonical_inputs(&self) -> &[String] {
        &self.canonical
    }
}

fn canonical_titles<'a>(titles: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut sorted: Vec<String> = titles.map(str::to_string).collect();
    sorted.sort_unstable();
    sorted
}

/// Unresolved recipe definition fed to [`RecipeCatalogBuilder::register`].
#[derive(Debug, Clone)]
pub struct RecipeDef {
    pub verb: String,
    pub inputs: Vec<String>,
    pub output: String,
    /// Explicit output kind. `None` means "look the output title up".
    pub output_kind: Option<CardKind>,
    pub processing_time: Seconds,
    pub description: String,
}

impl RecipeDef {
    pub fn new(verb: &str, inputs: &[&str], output: &str) -> Self {
        Self {
            verb: verb.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            output: output.to_string(),
            output_kind: None,
            processing_time: secs(DEFAULT_PROCESSING_TIME),
            description: String::new(),
        }
    }

    pub fn time(mut self, processing_time: Seconds) -> Self {
        self.processing_time = processing_time;
        self
    }

    pub fn kind(mut self, kind: CardKind) -> Self {
        self.output_kind = Some(kind);
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

// ---------------------------------------------------------------------------
// Standard content
// ---------------------------------------------------------------------------

struct RecipeLiteral {
    verb: &'static str,
    inputs: &'static [&'static str],
    output: &'static str,
    time: f64,
    description: &'static str,
}

const STANDARD_RECIPES: &[RecipeLiteral] = &[
    // Forge
    RecipeLiteral {
        verb: "forge",
        inputs: &["Iron Ore", "Coal"],
        output: "Iron Ingot",
        time: 3.0,
        description: "Smelt ore into usable metal",
    },
    RecipeLiteral {
        verb: "forge",
        inputs: &["Iron Ingot", "Basic Forging"],
        output: "Iron Blade",
        time: 3.0,
        description: "Shape metal into a blade",
    },
    RecipeLiteral {
        verb: "forge",
        inputs: &["Iron Blade", "Wood"],
        output: "Simple Wand",
        time: 3.0,
        description: "Craft a basic magical focus",
    },
    // Study
    RecipeLiteral {
        verb: "study",
        inputs: &["Mysterious Tome"],
        output: "Basic Forging",
        time: 5.0,
        description: "Learn the art of metalworking",
    },
    RecipeLiteral {
        verb: "study",
        inputs: &["Crystal Shard", "Mana"],
        output: "Elemental Theory",
        time: 3.0,
        description: "Understand magical energies",
    },
    RecipeLiteral {
        verb: "study",
        inputs: &["Elemental Theory", "Simple Wand"],
        output: "Spell: Ignite",
        time: 3.0,
        description: "Learn your first spell",
    },
    // Ritual circle
    RecipeLiteral {
        verb: "ritual",
        inputs: &["Mana", "Mana", "Crystal Shard"],
        output: "Charged Crystal",
        time: 6.0,
        description: "Infuse crystal with power",
    },
    RecipeLiteral {
        verb: "ritual",
        inputs: &["Spell: Ignite", "Charged Crystal"],
        output: "Flame Essence",
        time: 3.0,
        description: "Extract elemental essence",
    },
    // Alchemy
    RecipeLiteral {
        verb: "alchemy",
        inputs: &["Herb", "Mana"],
        output: "Minor Potion",
        time: 3.0,
        description: "Brew a simple potion",
    },
    RecipeLiteral {
        verb: "alchemy",
        inputs: &["Minor Potion", "Flame Essence"],
        output: "Potion of Fire Resistance",
        time: 3.0,
        description: "Create protective elixir",
    },
];

/// Known card titles and their kinds. Titles missing here are `Generic`.
const STANDARD_TITLE_KINDS: &[(&str, CardKind)] = &[
    ("Mana", CardKind::Mana),
    ("Iron Ore", CardKind::Ingredient),
    ("Iron Ingot", CardKind::Ingredient),
    ("Iron Blade", CardKind::Tool),
    ("Simple Wand", CardKind::Tool),
    ("Basic Forging", CardKind::Knowledge),
    ("Elemental Theory", CardKind::Knowledge),
    ("Spell: Ignite", CardKind::Spell),
    ("Flame Essence", CardKind::Essence),
    ("Minor Potion", CardKind::Potion),
    ("Potion of Fire Resistance", CardKind::Potion),
    ("Charged Crystal", CardKind::Crystal),
    ("Crystal Shard", CardKind::Crystal),
    ("Herb", CardKind::Herb),
];

/// The title to kind table shipped with the standard catalog.
pub fn standard_title_kinds() -> HashMap<String, CardKind> {
    STANDARD_TITLE_KINDS
        .iter()
        .map(|(title, kind)| (title.to_string(), *kind))
        .collect()
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for an immutable [`RecipeCatalog`]. Register everything, then
/// `build()` validates and freezes the table.
#[derive(Debug, Default)]
pub struct RecipeCatalogBuilder {
    recipes: Vec<RecipeDef>,
    title_kinds: HashMap<String, CardKind>,
}

impl RecipeCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the standard title to kind table.
    pub fn with_standard_kinds() -> Self {
        Self {
            recipes: Vec::new(),
            title_kinds: standard_title_kinds(),
        }
    }

    /// Record the kind of a card title.
    pub fn register_title_kind(&mut self, title: &str, kind: CardKind) {
        self.title_kinds.insert(title.to_string(), kind);
    }

    /// Register a recipe. Returns its ID (declaration index).
    pub fn register(&mut self, def: RecipeDef) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(def);
        id
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Validate and freeze.
    ///
    /// Every recipe ends up with a concrete `output_kind`: explicit kinds are
    /// also recorded in the title table, and titles unknown to the table fall
    /// back to `Generic` with a warning.
    pub fn build(self) -> Result<RecipeCatalog, CatalogError> {
        let mut title_kinds = self.title_kinds;
        let mut recipes: Vec<Recipe> = Vec::with_capacity(self.recipes.len());

        for def in self.recipes {
            if def.verb.is_empty() {
                return Err(CatalogError::EmptyVerb { output: def.output });
            }
            if def.inputs.is_empty() {
                return Err(CatalogError::NoInputs {
                    verb: def.verb,
                    output: def.output,
                });
            }
            if def.processing_time < Seconds::ZERO {
                return Err(CatalogError::NegativeTime {
                    verb: def.verb,
                    output: def.output,
                });
            }

            let output_kind = match def.output_kind {
                Some(kind) => {
                    title_kinds.insert(def.output.clone(), kind);
                    kind
                }
                None => match title_kinds.get(&def.output) {
                    Some(kind) => *kind,
                    None => {
                        tracing::warn!(
                            output = %def.output,
                            verb = %def.verb,
                            "recipe output has no known card kind; using generic"
                        );
                        CardKind::Generic
                    }
                },
            };

            let recipe = Recipe::new(def, output_kind);
            if let Some(earlier) = recipes
                .iter()
                .find(|r| r.matches(&recipe.verb, recipe.canonical_inputs()))
            {
                return Err(CatalogError::Shadowed {
                    verb: recipe.verb,
                    output: recipe.output,
                    earlier: earlier.output.clone(),
                });
            }
            recipes.push(recipe);
        }

        Ok(RecipeCatalog {
            recipes,
            title_kinds,
        })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable recipe table. Frozen after build; cheap to share behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeCatalog {
    recipes: Vec<Recipe>,
    title_kinds: HashMap<String, CardKind>,
}

impl RecipeCatalog {
    /// The built-in Wizard's Workshop recipes.
    pub fn standard() -> Self {
        let title_kinds = standard_title_kinds();
        let recipes = STANDARD_RECIPES
            .iter()
            .map(|lit| {
                let kind = title_kinds
                    .get(lit.output)
                    .copied()
                    .unwrap_or(CardKind::Generic);
                let def = RecipeDef::new(lit.verb, lit.inputs, lit.output)
                    .time(secs(lit.time))
                    .describe(lit.description);
                Recipe::new(def, kind)
            })
            .collect();
        Self {
            recipes,
            title_kinds,
        }
    }

    /// First recipe, in declaration order, whose verb and input multiset match.
    pub fn find_recipe<S: AsRef<str>>(&self, verb: &str, titles: &[S]) -> Option<&Recipe> {
        self.find_recipe_id(verb, titles).map(|id| &self.recipes[id.0 as usize])
    }

    pub fn find_recipe_id<S: AsRef<str>>(&self, verb: &str, titles: &[S]) -> Option<RecipeId> {
        if titles.is_empty() {
            return None;
        }
        let sorted = canonical_titles(titles.iter().map(AsRef::as_ref));
        self.recipes
            .iter()
            .position(|r| r.verb == verb && r.canonical == sorted)
            .map(|idx| RecipeId(idx as u32))
    }

    /// All recipes for one verb, in declaration order.
    pub fn recipes_for_verb(&self, verb: &str) -> Vec<&Recipe> {
        self.recipes.iter().filter(|r| r.verb == verb).collect()
    }

    pub fn get(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipes.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecipeId, &Recipe)> {
        self.recipes
            .iter()
            .enumerate()
            .map(|(idx, r)| (RecipeId(idx as u32), r))
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Distinct verbs, in first-declaration order.
    pub fn verbs(&self) -> Vec<&str> {
        let mut verbs: Vec<&str> = Vec::new();
        for recipe in &self.recipes {
            if !verbs.contains(&recipe.verb.as_str()) {
                verbs.push(&recipe.verb);
            }
        }
        verbs
    }

    /// Card kind for a title. Unknown titles are `Generic`.
    pub fn determine_output_type(&self, title: &str) -> CardKind {
        self.title_kinds
            .get(title)
            .copied()
            .unwrap_or(CardKind::Generic)
    }

    /// Outputs whose kind is not backed by the title table.
    pub fn untyped_outputs(&self) -> Vec<&str> {
        self.recipes
            .iter()
            .filter(|r| !self.title_kinds.contains_key(&r.output))
            .map(|r| r.output.as_str())
            .collect()
    }

    /// Order-sensitive hash of the recipe table. Snapshots record it so a
    /// world is never restored against a different catalog.
    pub fn fingerprint(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u32(self.recipes.len() as u32);
        for recipe in &self.recipes {
            h.write_str(&recipe.verb);
            for input in recipe.canonical_inputs() {
                h.write_str(input);
            }
            h.write_str(&recipe.output);
            h.write_str(recipe.output_kind.name());
            h.write_fixed64(recipe.processing_time);
        }
        h.finish()
    }
}

impl Default for RecipeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("recipe producing '{output}' has an empty verb")]
    EmptyVerb { output: String },
    #[error("recipe '{verb}' -> '{output}' has no inputs")]
    NoInputs { verb: String, output: String },
    #[error("recipe '{verb}' -> '{output}' has a negative processing time")]
    NegativeTime { verb: String, output: String },
    #[error("recipe '{verb}' -> '{output}' can never match; '{earlier}' has the same inputs")]
    Shadowed {
        verb: String,
        output: String,
        earlier: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_shape() {
        let catalog = RecipeCatalog::standard();
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.verbs(), vec!["forge", "study", "ritual", "alchemy"]);
        assert_eq!(catalog.recipes_for_verb("forge").len(), 3);
        assert_eq!(catalog.recipes_for_verb("study").len(), 3);
        assert_eq!(catalog.recipes_for_verb("ritual").len(), 2);
        assert_eq!(catalog.recipes_for_verb("alchemy").len(), 2);
        assert!(catalog.recipes_for_verb("brewery").is_empty());
    }

    #[test]
    fn standard_outputs_all_have_kinds() {
        let catalog = RecipeCatalog::standard();
        assert!(catalog.untyped_outputs().is_empty());
        for (_, recipe) in catalog.iter() {
            assert_ne!(recipe.output_kind, CardKind::Generic, "{}", recipe.output);
        }
    }

    #[test]
    fn standard_catalog_passes_builder_validation() {
        let mut builder = RecipeCatalogBuilder::with_standard_kinds();
        for lit in STANDARD_RECIPES {
            builder.register(
                RecipeDef::new(lit.verb, lit.inputs, lit.output)
                    .time(secs(lit.time))
                    .describe(lit.description),
            );
        }
        let built = builder.build().unwrap();
        assert_eq!(built, RecipeCatalog::standard());
    }

    #[test]
    fn find_is_order_independent() {
        let catalog = RecipeCatalog::standard();
        let a = catalog.find_recipe("forge", &["Iron Ore", "Coal"]).unwrap();
        let b = catalog.find_recipe("forge", &["Coal", "Iron Ore"]).unwrap();
        assert_eq!(a.output, "Iron Ingot");
        assert_eq!(a, b);
    }

    #[test]
    fn find_is_scoped_to_verb() {
        let catalog = RecipeCatalog::standard();
        assert!(catalog.find_recipe("study", &["Iron Ore", "Coal"]).is_none());
    }

    #[test]
    fn multiset_counts_matter() {
        let catalog = RecipeCatalog::standard();
        assert_eq!(
            catalog
                .find_recipe("ritual", &["Mana", "Crystal Shard", "Mana"])
                .map(|r| r.output.as_str()),
            Some("Charged Crystal")
        );
        assert!(catalog.find_recipe("ritual", &["Mana", "Crystal Shard"]).is_none());
        assert!(
            catalog
                .find_recipe("ritual", &["Mana", "Mana", "Mana", "Crystal Shard"])
                .is_none()
        );
    }

    #[test]
    fn recipe_matches_its_sorted_inputs() {
        let catalog = RecipeCatalog::standard();
        let charged = catalog
            .find_recipe("ritual", &["Crystal Shard", "Mana", "Mana"])
            .unwrap();
        assert_eq!(charged.canonical_inputs(), ["Crystal Shard", "Mana", "Mana"]);
        assert!(charged.matches("ritual", &["Mana", "Crystal Shard", "Mana"]));
        assert!(!charged.matches("study", &["Mana", "Crystal Shard", "Mana"]));
        assert!(!charged.matches("ritual", &["Mana", "Crystal Shard", "Crystal Shard"]));
    }

    #[test]
    fn empty_titles_never_match() {
        let catalog = RecipeCatalog::standard();
        let none: [&str; 0] = [];
        assert!(catalog.find_recipe("forge", &none).is_none());
    }

    #[test]
    fn determine_output_type_falls_back_to_generic() {
        let catalog = RecipeCatalog::standard();
        assert_eq!(catalog.determine_output_type("Iron Blade"), CardKind::Tool);
        assert_eq!(catalog.determine_output_type("Coal"), CardKind::Generic);
    }

    #[test]
    fn builder_rejects_empty_inputs() {
        let mut builder = RecipeCatalogBuilder::new();
        builder.register(RecipeDef::new("forge", &[], "Nothing"));
        assert!(matches!(builder.build(), Err(CatalogError::NoInputs { .. })));
    }

    #[test]
    fn builder_rejects_negative_time() {
        let mut builder = RecipeCatalogBuilder::new();
        builder.register(RecipeDef::new("forge", &["Coal"], "Ash").time(secs(-1.0)));
        assert!(matches!(
            builder.build(),
            Err(CatalogError::NegativeTime { .. })
        ));
    }

    #[test]
    fn builder_rejects_shadowed_recipe() {
        let mut builder = RecipeCatalogBuilder::new();
        builder.register(RecipeDef::new("forge", &["Coal", "Iron Ore"], "Iron Ingot"));
        builder.register(RecipeDef::new("forge", &["Iron Ore", "Coal"], "Steel"));
        let err = builder.build().unwrap_err();
        assert!(matches!(err, CatalogError::Shadowed { ref earlier, .. } if earlier == "Iron Ingot"));
        assert!(err.to_string().contains("Steel"));
    }

    #[test]
    fn builder_same_inputs_other_verb_is_fine() {
        let mut builder = RecipeCatalogBuilder::new();
        builder.register(RecipeDef::new("forge", &["Coal"], "Ash"));
        builder.register(RecipeDef::new("alchemy", &["Coal"], "Tincture"));
        assert_eq!(builder.build().unwrap().len(), 2);
    }

    #[test]
    fn builder_embeds_explicit_and_fallback_kinds() {
        let mut builder = RecipeCatalogBuilder::new();
        let a = builder.register(
            RecipeDef::new("forge", &["Coal"], "Ash").kind(CardKind::Ingredient),
        );
        let b = builder.register(RecipeDef::new("forge", &["Ash"], "Dust"));
        let catalog = builder.build().unwrap();
        assert_eq!(catalog.get(a).unwrap().output_kind, CardKind::Ingredient);
        assert_eq!(catalog.determine_output_type("Ash"), CardKind::Ingredient);
        assert_eq!(catalog.get(b).unwrap().output_kind, CardKind::Generic);
        assert_eq!(catalog.untyped_outputs(), vec!["Dust"]);
    }

    #[test]
    fn default_processing_time() {
        let def = RecipeDef::new("forge", &["Coal"], "Ash");
        assert_eq!(def.processing_time, secs(3.0));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = RecipeCatalog::standard();
        let b = RecipeCatalog::standard();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut builder = RecipeCatalogBuilder::with_standard_kinds();
        builder.register(RecipeDef::new("forge", &["Iron Ore", "Coal"], "Iron Ingot"));
        let c = builder.build().unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
