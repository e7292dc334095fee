use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a live card in the world.
    pub struct CardId;

    /// Identifies a crafting station (verb) in the world.
    pub struct StationId;

    /// Identifies a card generator in the world.
    pub struct GeneratorId;
}

/// Identifies a recipe in the catalog. Index in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn recipe_id_equality() {
        assert_eq!(RecipeId(0), RecipeId(0));
        assert_ne!(RecipeId(0), RecipeId(1));
    }

    #[test]
    fn stale_card_id_misses() {
        let mut cards = SlotMap::<CardId, &str>::with_key();
        let id = cards.insert("Mana");
        cards.remove(id);
        let reused = cards.insert("Herb");
        assert!(cards.get(id).is_none());
        assert_eq!(cards[reused], "Herb");
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(RecipeId(0), "Iron Ingot");
        map.insert(RecipeId(1), "Iron Blade");
        assert_eq!(map[&RecipeId(1)], "Iron Blade");
    }
}
