//! Stations ("verbs"): places where cards are combined.
//!
//! A station collects cards, asks the catalog for a match after every
//! acceptance, and runs a timed process once a recipe matches:
//!
//! ```text
//! Idle -> Accumulating -> Processing -> (complete | abort) -> Idle
//! ```
//!
//! The station only tracks ids and titles. Creating and destroying the actual
//! cards is the world's job; [`Station::complete`] and [`Station::abort`]
//! hand back what the world has to act on.

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, Seconds, Vec3, checked_div_64, f64_to_fixed64, fixed64_to_f64};
use crate::id::{CardId, RecipeId};
use crate::recipe::RecipeCatalog;

/// Scale applied to the station footprint on X/Z to get the drop zone.
pub const INTERACTION_SCALE: f64 = 1.2;
/// Radius of the circle accepted cards are laid out on.
pub const PLACEMENT_RADIUS: f64 = 0.8;
/// Height of that circle above the top of the station.
pub const PLACEMENT_LIFT: f64 = 0.6;
/// Spacing between returned inputs.
pub const RETURN_SPACING: f64 = 1.5;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// A card sitting on a station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedCard {
    pub card: CardId,
    pub title: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationState {
    #[default]
    Idle,
    /// Holding cards that do not (yet) form a recipe.
    Accumulating,
    /// Running `recipe`. The staged cards are frozen.
    Processing {
        recipe: RecipeId,
        started_at: Seconds,
        duration: Seconds,
    },
}

/// Outcome of [`Station::check_recipe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Started { recipe: RecipeId, duration: Seconds },
    /// Two or more cards that match nothing. The cards stay.
    InvalidCombination,
    /// Fewer than two cards and no match yet.
    Waiting,
}

/// Handed to the world when a process finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub recipe: RecipeId,
    /// Inputs to destroy, in acceptance order.
    pub consumed: Vec<CardId>,
}

/// Result of a [`Station::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationTick {
    Idle,
    Progress(Fixed64),
    Completed(Completion),
    /// The station sat in `Accumulating` past the stall timeout.
    Stalled,
}

// ---------------------------------------------------------------------------
// Station
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    /// The verb, e.g. `"forge"`.
    pub kind: String,
    pub position: Vec3,
    pub size: Vec3,
    active: Vec<StagedCard>,
    state: StationState,
    /// Time of the most recent acceptance while accumulating.
    last_accept: Option<Seconds>,
}

impl Station {
    pub fn new(kind: &str, position: Vec3, size: Vec3) -> Self {
        Self {
            kind: kind.to_string(),
            position,
            size,
            active: Vec::new(),
            state: StationState::Idle,
            last_accept: None,
        }
    }

    pub fn state(&self) -> StationState {
        self.state
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.state, StationState::Processing { .. })
    }

    pub fn active_cards(&self) -> &[StagedCard] {
        &self.active
    }

    pub fn active_titles(&self) -> Vec<&str> {
        self.active.iter().map(|s| s.title.as_str()).collect()
    }

    pub fn holds(&self, card: CardId) -> bool {
        self.active.iter().any(|s| s.card == card)
    }

    pub fn current_recipe(&self) -> Option<RecipeId> {
        match self.state {
            StationState::Processing { recipe, .. } => Some(recipe),
            _ => None,
        }
    }

    /// Whether `accept_card` would take this card.
    pub fn can_accept(&self, card: CardId) -> bool {
        !self.is_processing() && !self.holds(card)
    }

    /// Stage a card and re-check the recipe.
    ///
    /// # Panics
    ///
    /// If the station is processing or already holds `card`. Callers check
    /// [`can_accept`](Station::can_accept) first.
    pub fn accept_card(
        &mut self,
        card: CardId,
        title: &str,
        now: Seconds,
        catalog: &RecipeCatalog,
    ) -> CheckOutcome {
        assert!(
            !self.is_processing(),
            "station '{}' cannot accept cards while processing",
            self.kind
        );
        assert!(
            !self.holds(card),
            "card {card:?} is already on station '{}'",
            self.kind
        );
        self.active.push(StagedCard {
            card,
            title: title.to_string(),
        });
        self.state = StationState::Accumulating;
        self.last_accept = Some(now);
        self.check_recipe(now, catalog)
    }

    /// Match the staged titles against the catalog and start processing on a hit.
    pub fn check_recipe(&mut self, now: Seconds, catalog: &RecipeCatalog) -> CheckOutcome {
        if let StationState::Processing {
            recipe, duration, ..
        } = self.state
        {
            return CheckOutcome::Started { recipe, duration };
        }
        let titles = self.active_titles();
        match catalog.find_recipe_id(&self.kind, &titles) {
            Some(id) => {
                let duration = catalog
                    .get(id)
                    .map(|r| r.processing_time)
                    .unwrap_or(Seconds::ZERO);
                self.start_processing(id, duration, now);
                CheckOutcome::Started {
                    recipe: id,
                    duration,
                }
            }
            None if titles.len() >= 2 => CheckOutcome::InvalidCombination,
            None => CheckOutcome::Waiting,
        }
    }

    /// Enter `Processing`.
    ///
    /// # Panics
    ///
    /// If nothing is staged.
    pub fn start_processing(&mut self, recipe: RecipeId, duration: Seconds, now: Seconds) {
        assert!(
            !self.active.is_empty(),
            "station '{}' cannot process without cards",
            self.kind
        );
        self.state = StationState::Processing {
            recipe,
            started_at: now,
            duration,
        };
        self.last_accept = None;
    }

    /// `(now - start) / duration` clamped to `[0, 1]`. `None` unless processing.
    pub fn progress(&self, now: Seconds) -> Option<Fixed64> {
        let StationState::Processing {
            started_at,
            duration,
            ..
        } = self.state
        else {
            return None;
        };
        if duration <= Seconds::ZERO {
            return Some(Fixed64::ONE);
        }
        let elapsed = (now - started_at).max(Seconds::ZERO);
        let progress = checked_div_64(elapsed, duration).unwrap_or(Fixed64::ONE);
        Some(progress.clamp(Fixed64::ZERO, Fixed64::ONE))
    }

    /// Evaluate progress once. Completes the process when it reaches 1.
    pub fn tick(&mut self, now: Seconds, stall_timeout: Option<Seconds>) -> StationTick {
        match self.state {
            StationState::Processing { .. } => match self.progress(now) {
                Some(p) if p >= Fixed64::ONE => match self.complete() {
                    Some(completion) => StationTick::Completed(completion),
                    None => StationTick::Idle,
                },
                Some(p) => StationTick::Progress(p),
                None => StationTick::Idle,
            },
            StationState::Accumulating => match (stall_timeout, self.last_accept) {
                (Some(timeout), Some(since)) if now - since >= timeout => StationTick::Stalled,
                _ => StationTick::Idle,
            },
            StationState::Idle => StationTick::Idle,
        }
    }

    /// Finish the current process and reset to `Idle`. Returns `None` if
    /// not processing, so a second call is harmless.
    pub fn complete(&mut self) -> Option<Completion> {
        let StationState::Processing { recipe, .. } = self.state else {
            return None;
        };
        let consumed = self.active.drain(..).map(|s| s.card).collect();
        self.state = StationState::Idle;
        self.last_accept = None;
        Some(Completion { recipe, consumed })
    }

    /// Failure path: drop everything staged without output and reset to
    /// `Idle`. Returns the released cards in acceptance order.
    pub fn abort(&mut self) -> Vec<CardId> {
        let released = self.active.drain(..).map(|s| s.card).collect();
        self.state = StationState::Idle;
        self.last_accept = None;
        released
    }

    /// Unstage one card while accumulating. Refused while processing.
    pub fn detach(&mut self, card: CardId) -> bool {
        if self.is_processing() {
            return false;
        }
        let before = self.active.len();
        self.active.retain(|s| s.card != card);
        if self.active.len() == before {
            return false;
        }
        if self.active.is_empty() {
            self.state = StationState::Idle;
            self.last_accept = None;
        }
        true
    }

    /// Where the `count`-th staged card sits (1-based): on a circle above the
    /// station at `(count - 1) * 360 / count` degrees.
    pub fn slot_position(&self, count: usize) -> Vec3 {
        let count = count.max(1);
        let angle = ((count - 1) as f64 * (360.0 / count as f64)).to_radians();
        let (_, size_y, _) = self.size.to_f64();
        self.position
            + Vec3::from_f64(
                angle.cos() * PLACEMENT_RADIUS,
                size_y + PLACEMENT_LIFT,
                angle.sin() * PLACEMENT_RADIUS,
            )
    }

    /// Spots for `n` returned inputs: `(i * 1.5 - n * 0.75, 0.1, -3)` from
    /// the station.
    pub fn return_positions(&self, n: usize) -> Vec<Vec3> {
        let half_span = n as f64 * RETURN_SPACING / 2.0;
        (0..n)
            .map(|i| {
                self.position + Vec3::from_f64(i as f64 * RETURN_SPACING - half_span, 0.1, -3.0)
            })
            .collect()
    }

    /// Drop-zone check on the X/Z plane against the scaled footprint.
    pub fn is_card_over(&self, point: Vec3) -> bool {
        let scale = f64_to_fixed64(INTERACTION_SCALE / 2.0);
        let half_x = self.size.x.saturating_mul(scale);
        let half_z = self.size.z.saturating_mul(scale);
        (point.x - self.position.x).abs() < half_x && (point.z - self.position.z).abs() < half_z
    }

    /// Size of the drop zone on X/Z, for presentation.
    pub fn interaction_zone(&self) -> (f64, f64) {
        (
            fixed64_to_f64(self.size.x) * INTERACTION_SCALE,
            fixed64_to_f64(self.size.z) * INTERACTION_SCALE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::secs;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<CardId> {
        let mut sm = SlotMap::<CardId, ()>::with_key();
        (0..n).map(|_| sm.insert(())).collect()
    }

    fn forge() -> Station {
        Station::new(
            "forge",
            Vec3::from_f64(5.0, 0.0, 2.0),
            Vec3::from_f64(2.0, 1.0, 2.0),
        )
    }

    #[test]
    fn single_card_waits_silently() {
        let catalog = RecipeCatalog::standard();
        let mut station = forge();
        let c = ids(1);
        let outcome = station.accept_card(c[0], "Iron Ore", secs(0.0), &catalog);
        assert_eq!(outcome, CheckOutcome::Waiting);
        assert_eq!(station.state(), StationState::Accumulating);
    }

    #[test]
    fn wrong_pair_is_invalid_and_stays() {
        let catalog = RecipeCatalog::standard();
        let mut station = forge();
        let c = ids(2);
        station.accept_card(c[0], "Iron Ore", secs(0.0), &catalog);
        let outcome = station.accept_card(c[1], "Wood", secs(0.0), &catalog);
        assert_eq!(outcome, CheckOutcome::InvalidCombination);
        assert_eq!(station.active_cards().len(), 2);
        assert!(!station.is_processing());
    }

    #[test]
    fn matching_pair_starts_processing() {
        let catalog = RecipeCatalog::standard();
        let mut station = forge();
        let c = ids(2);
        station.accept_card(c[0], "Coal", secs(1.0), &catalog);
        let outcome = station.accept_card(c[1], "Iron Ore", secs(1.0), &catalog);
        let CheckOutcome::Started { recipe, duration } = outcome else {
            panic!("expected start, got {outcome:?}");
        };
        assert_eq!(catalog.get(recipe).unwrap().output, "Iron Ingot");
        assert_eq!(duration, secs(3.0));
        assert!(station.is_processing());
        assert!(!station.can_accept(ids(3)[2]));
    }

    #[test]
    fn progress_is_clamped() {
        let catalog = RecipeCatalog::standard();
        let mut station = forge();
        assert_eq!(station.progress(secs(0.0)), None);
        let c = ids(2);
        station.accept_card(c[0], "Coal", secs(1.0), &catalog);
        station.accept_card(c[1], "Iron Ore", secs(1.0), &catalog);
        assert_eq!(station.progress(secs(0.0)), Some(Fixed64::ZERO));
        assert_eq!(station.progress(secs(2.5)), Some(secs(0.5)));
        assert_eq!(station.progress(secs(100.0)), Some(Fixed64::ONE));
    }

    #[test]
    fn zero_duration_is_immediately_complete() {
        let mut station = forge();
        let c = ids(1);
        station.active.push(StagedCard {
            card: c[0],
            title: "Coal".into(),
        });
        station.start_processing(RecipeId(0), Seconds::ZERO, secs(1.0));
        assert_eq!(station.progress(secs(1.0)), Some(Fixed64::ONE));
    }

    #[test]
    fn tick_completes_once() {
        let catalog = RecipeCatalog::standard();
        let mut station = forge();
        let c = ids(2);
        station.accept_card(c[0], "Iron Ore", secs(0.0), &catalog);
        station.accept_card(c[1], "Coal", secs(0.0), &catalog);

        assert_eq!(station.tick(secs(1.5), None), StationTick::Progress(secs(0.5)));
        let StationTick::Completed(done) = station.tick(secs(3.0), None) else {
            panic!("expected completion");
        };
        assert_eq!(done.consumed, c);
        assert_eq!(station.state(), StationState::Idle);
        assert!(station.active_cards().is_empty());

        assert_eq!(station.complete(), None);
        assert_eq!(station.tick(secs(4.0), None), StationTick::Idle);
    }

    #[test]
    fn abort_releases_inputs() {
        let catalog = RecipeCatalog::standard();
        let mut station = forge();
        let c = ids(2);
        station.accept_card(c[0], "Iron Ore", secs(0.0), &catalog);
        station.accept_card(c[1], "Coal", secs(0.0), &catalog);
        assert_eq!(station.abort(), c);
        assert_eq!(station.state(), StationState::Idle);
        assert_eq!(station.complete(), None);
    }

    #[test]
    fn stall_timeout_fires_only_when_configured() {
        let catalog = RecipeCatalog::standard();
        let mut station = forge();
        let c = ids(1);
        station.accept_card(c[0], "Iron Ore", secs(0.0), &catalog);
        assert_eq!(station.tick(secs(100.0), None), StationTick::Idle);
        assert_eq!(station.tick(secs(9.0), Some(secs(10.0))), StationTick::Idle);
        assert_eq!(station.tick(secs(10.0), Some(secs(10.0))), StationTick::Stalled);
    }

    #[test]
    fn detach_while_accumulating() {
        let catalog = RecipeCatalog::standard();
        let mut station = forge();
        let c = ids(2);
        station.accept_card(c[0], "Iron Ore", secs(0.0), &catalog);
        assert!(station.detach(c[0]));
        assert!(!station.detach(c[1]));
        assert_eq!(station.state(), StationState::Idle);
    }

    #[test]
    fn detach_refused_while_processing() {
        let catalog = RecipeCatalog::standard();
        let mut station = forge();
        let c = ids(2);
        station.accept_card(c[0], "Iron Ore", secs(0.0), &catalog);
        station.accept_card(c[1], "Coal", secs(0.0), &catalog);
        assert!(!station.detach(c[0]));
        assert_eq!(station.active_cards().len(), 2);
    }

    #[test]
    #[should_panic(expected = "already on station")]
    fn duplicate_card_panics() {
        let catalog = RecipeCatalog::standard();
        let mut station = forge();
        let c = ids(1);
        station.accept_card(c[0], "Iron Ore", secs(0.0), &catalog);
        station.accept_card(c[0], "Iron Ore", secs(0.0), &catalog);
    }

    #[test]
    #[should_panic(expected = "without cards")]
    fn empty_processing_panics() {
        let mut station = forge();
        station.start_processing(RecipeId(0), secs(3.0), secs(0.0));
    }

    #[test]
    fn interaction_zone_is_scaled_footprint() {
        let station = forge();
        // Footprint 2x2 scaled by 1.2 gives half extents of 1.2.
        assert!(station.is_card_over(Vec3::from_f64(5.0, 0.0, 2.0)));
        assert!(station.is_card_over(Vec3::from_f64(6.1, 3.0, 3.1)));
        assert!(!station.is_card_over(Vec3::from_f64(6.3, 0.0, 2.0)));
        assert!(!station.is_card_over(Vec3::from_f64(5.0, 0.0, 0.7)));
    }

    #[test]
    fn slots_follow_circle() {
        let station = forge();
        let first = station.slot_position(1);
        let (x, y, z) = first.to_f64();
        assert!((x - 5.8).abs() < 1e-6);
        assert!((y - 1.6).abs() < 1e-6);
        assert!((z - 2.0).abs() < 1e-6);

        // Second card sits opposite the first.
        let (x2, _, z2) = station.slot_position(2).to_f64();
        assert!((x2 - 4.2).abs() < 1e-6);
        assert!((z2 - 2.0).abs() < 1e-6);
    }

    #[test]
    fn return_positions_spread_left_to_right() {
        let station = forge();
        let spots = station.return_positions(2);
        let (x0, y0, z0) = spots[0].to_f64();
        let (x1, _, _) = spots[1].to_f64();
        assert!((x0 - 3.5).abs() < 1e-6);
        assert!((x1 - 5.0).abs() < 1e-6);
        assert!((y0 - 0.1).abs() < 1e-6);
        assert!((z0 + 1.0).abs() < 1e-6);
    }
}
