//! The world: owns every card, station and generator and drives them through
//! a fixed-order pipeline.
//!
//! # Pipeline
//!
//! Each [`World::advance`] runs:
//! 1. **Deferred spawns** -- create output cards whose delay has elapsed
//! 2. **Mutations** -- apply what reactive handlers queued last time
//! 3. **Cards** -- advance decay clocks; remove expired cards
//! 4. **Generators** -- attempt spawns that are due
//! 5. **Stations** -- evaluate progress once; complete or time out
//! 6. **Post-tick** -- deliver buffered events to subscribers
//! 7. **Bookkeeping** -- bump the tick counter, compute the state hash
//!
//! Drag and drop calls ([`World::route_drop`], [`World::pickup_card`], ...)
//! happen between advances. Any events they emit are delivered with the next
//! advance.

use std::sync::Arc;

use slotmap::SlotMap;

use crate::card::{Card, CardSpec, CardTick};
use crate::config::WorldConfig;
use crate::event::{Event, EventBus, EventKind, EventMutation, ReturnReason};
use crate::fixed::{Fixed64, Seconds, Vec3};
use crate::generator::{Generator, GeneratorKind, GeneratorTick, Occupancy};
use crate::id::{CardId, GeneratorId, StationId};
use crate::recipe::RecipeCatalog;
use crate::sim::{AdvanceResult, Clock, SimState, StateHash};
use crate::station::{CheckOutcome, Station, StationState, StationTick};

// ---------------------------------------------------------------------------
// Deferred spawns
// ---------------------------------------------------------------------------

/// A card that will be created once `due` is reached.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PendingSpawn {
    pub due: Seconds,
    pub spec: CardSpec,
}

/// Read-only occupancy view over the live cards. Decaying cards do not count.
struct LiveCards<'a>(&'a SlotMap<CardId, Card>);

impl Occupancy for LiveCards<'_> {
    fn is_position_occupied(&self, position: Vec3, threshold: Fixed64) -> bool {
        self.0
            .values()
            .any(|card| !card.is_decaying() && card.position.is_within(&position, threshold))
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct World {
    pub(crate) config: WorldConfig,
    pub(crate) catalog: Arc<RecipeCatalog>,

    pub(crate) cards: SlotMap<CardId, Card>,

    pub(crate) stations: SlotMap<StationId, Station>,
    /// Registration order. Drops and ticks walk stations in this order.
    pub(crate) station_order: Vec<StationId>,

    pub(crate) generators: SlotMap<GeneratorId, Generator>,
    pub(crate) generator_order: Vec<GeneratorId>,

    pub(crate) pending_spawns: Vec<PendingSpawn>,

    pub sim_state: SimState,
    pub(crate) paused: bool,
    pub(crate) shut_down: bool,
    pub(crate) last_state_hash: u64,

    pub event_bus: EventBus,
}

impl World {
    pub fn new(catalog: Arc<RecipeCatalog>, config: WorldConfig) -> Self {
        let event_bus = EventBus::new(config.event_capacity);
        Self {
            config,
            catalog,
            cards: SlotMap::with_key(),
            stations: SlotMap::with_key(),
            station_order: Vec::new(),
            generators: SlotMap::with_key(),
            generator_order: Vec::new(),
            pending_spawns: Vec::new(),
            sim_state: SimState::new(),
            paused: false,
            shut_down: false,
            last_state_hash: 0,
            event_bus,
        }
    }

    /// Empty world over the standard catalog with default tunables.
    pub fn with_standard_catalog() -> Self {
        Self::new(Arc::new(RecipeCatalog::standard()), WorldConfig::default())
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<RecipeCatalog> {
        &self.catalog
    }

    /// Time of the most recent advance.
    pub fn now(&self) -> Seconds {
        self.sim_state.now
    }

    // -----------------------------------------------------------------------
    // Cards
    // -----------------------------------------------------------------------

    /// Create a card stamped with the current time.
    pub fn create_card(&mut self, spec: CardSpec) -> CardId {
        let now = self.sim_state.now;
        let title = spec.title.clone();
        let id = self.cards.insert_with_key(|id| Card::new(id, spec, now));
        tracing::debug!(card = ?id, title = %title, "card created");
        self.event_bus.emit(Event::CardCreated {
            card: id,
            title,
            at: now,
        });
        id
    }

    /// Spec for a titled card, with the kind looked up in the catalog.
    pub fn spec_for(&self, title: &str, position: Vec3) -> CardSpec {
        CardSpec::new(title, self.catalog.determine_output_type(title), position)
    }

    /// Remove a card for good. Unknown ids are a no-op.
    ///
    /// A card pulled from an accumulating station is unstaged. A card pulled
    /// from a processing station aborts the process; the other inputs go back
    /// to the table.
    pub fn destroy_card(&mut self, id: CardId) -> bool {
        let Some(station_id) = self.cards.get(id).map(|c| c.station) else {
            return false;
        };
        if let Some(sid) = station_id {
            self.release_from_station(sid, id, ReturnReason::InputDestroyed);
        }
        let Some(card) = self.cards.remove(id) else {
            return false;
        };
        tracing::debug!(card = ?id, title = %card.title, "card destroyed");
        self.event_bus.emit(Event::CardDestroyed {
            card: id,
            title: card.title,
            at: self.sim_state.now,
        });
        true
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.get(id)
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn cards(&self) -> impl Iterator<Item = (CardId, &Card)> {
        self.cards.iter()
    }

    /// Live cards carrying `title`, decaying ones included.
    pub fn cards_titled(&self, title: &str) -> Vec<CardId> {
        self.cards
            .iter()
            .filter(|(_, c)| c.title == title)
            .map(|(id, _)| id)
            .collect()
    }

    /// How many live cards carry `title`. The HUD uses this for "Mana".
    pub fn count_titled(&self, title: &str) -> usize {
        self.cards.values().filter(|c| c.title == title).count()
    }

    /// True if a live, non-decaying card lies strictly within `threshold`.
    pub fn is_position_occupied(&self, position: Vec3, threshold: Fixed64) -> bool {
        LiveCards(&self.cards).is_position_occupied(position, threshold)
    }

    pub fn pending_spawns(&self) -> &[PendingSpawn] {
        &self.pending_spawns
    }

    // -----------------------------------------------------------------------
    // Stations
    // -----------------------------------------------------------------------

    pub fn add_station(&mut self, station: Station) -> StationId {
        if self.catalog.recipes_for_verb(&station.kind).is_empty() {
            tracing::warn!(verb = %station.kind, "station verb has no recipes");
        }
        let id = self.stations.insert(station);
        self.station_order.push(id);
        id
    }

    /// Remove a station. Anything staged on it is handed back to the table.
    pub fn remove_station(&mut self, id: StationId) -> bool {
        if !self.stations.contains_key(id) {
            return false;
        }
        self.fail_station(id, ReturnReason::Cancelled);
        self.stations.remove(id);
        self.station_order.retain(|s| *s != id);
        true
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(id)
    }

    /// Stations in registration order.
    pub fn stations(&self) -> impl Iterator<Item = (StationId, &Station)> {
        self.station_order
            .iter()
            .filter_map(|id| self.stations.get(*id).map(|s| (*id, s)))
    }

    /// First station registered for `verb`.
    pub fn station_by_kind(&self, verb: &str) -> Option<StationId> {
        self.stations()
            .find(|(_, s)| s.kind == verb)
            .map(|(id, _)| id)
    }

    /// Abort a running process and hand the inputs back. False if the
    /// station is not processing.
    pub fn cancel_processing(&mut self, id: StationId) -> bool {
        let processing = self
            .stations
            .get(id)
            .is_some_and(|s| s.is_processing());
        if processing {
            self.fail_station(id, ReturnReason::Cancelled);
        }
        processing
    }

    // -----------------------------------------------------------------------
    // Generators
    // -----------------------------------------------------------------------

    pub fn add_generator(&mut self, generator: Generator) -> GeneratorId {
        let id = self.generators.insert(generator);
        self.generator_order.push(id);
        id
    }

    /// Build a preset generator whose clock starts now. Mana gets the
    /// configured resource lifetime.
    pub fn spawn_generator(
        &mut self,
        kind: GeneratorKind,
        position: Vec3,
        interval: Seconds,
    ) -> GeneratorId {
        let mut generator = Generator::new(kind, position, interval, self.sim_state.now);
        if generator.resource_lifetime.is_some() {
            generator.resource_lifetime = Some(self.config.resource_lifetime);
        }
        self.add_generator(generator)
    }

    pub fn remove_generator(&mut self, id: GeneratorId) -> bool {
        if self.generators.remove(id).is_none() {
            return false;
        }
        self.generator_order.retain(|g| *g != id);
        true
    }

    pub fn set_generator_active(&mut self, id: GeneratorId, active: bool) -> bool {
        match self.generators.get_mut(id) {
            Some(g) => {
                g.is_active = active;
                true
            }
            None => false,
        }
    }

    pub fn generator(&self, id: GeneratorId) -> Option<&Generator> {
        self.generators.get(id)
    }

    /// Generators in registration order.
    pub fn generators(&self) -> impl Iterator<Item = (GeneratorId, &Generator)> {
        self.generator_order
            .iter()
            .filter_map(|id| self.generators.get(*id).map(|g| (*id, g)))
    }

    // -----------------------------------------------------------------------
    // Interaction
    // -----------------------------------------------------------------------

    /// Start dragging a card. Refused for decaying cards and for cards on a
    /// processing station; a card on an accumulating station is unstaged.
    pub fn pickup_card(&mut self, id: CardId) -> bool {
        let Some(card) = self.cards.get(id) else {
            return false;
        };
        if card.is_decaying() {
            return false;
        }
        let staged_on = card.station;
        if let Some(sid) = staged_on {
            let detached = self.stations.get_mut(sid).is_none_or(|s| s.detach(id));
            if !detached {
                return false;
            }
        }
        let Some(card) = self.cards.get_mut(id) else {
            return false;
        };
        card.station = None;
        card.pickup();
        if let Some(sid) = staged_on {
            self.recheck_station(sid);
        }
        true
    }

    /// Follow the pointer while held.
    pub fn drag_card(&mut self, id: CardId, target: Vec3) -> bool {
        self.cards.get_mut(id).is_some_and(|c| c.drag_to(target))
    }

    /// Let go of a card without routing it to a station.
    pub fn drop_card(&mut self, id: CardId) -> bool {
        match self.cards.get_mut(id) {
            Some(card) => {
                card.drop();
                true
            }
            None => false,
        }
    }

    /// Drop a card at `point` and hand it to the first station, in
    /// registration order, whose zone contains the point and which accepts it.
    /// A card nobody takes stays where it was dropped.
    pub fn route_drop(&mut self, id: CardId, point: Vec3) -> bool {
        self.drop_on_station(id, point).is_some()
    }

    /// Like [`route_drop`](World::route_drop) but reports which station took
    /// the card and what the recipe check said.
    pub fn drop_on_station(&mut self, id: CardId, point: Vec3) -> Option<(StationId, CheckOutcome)> {
        let now = self.sim_state.now;
        let card = self.cards.get_mut(id)?;
        card.drop();
        if card.is_decaying() || card.station.is_some() {
            return None;
        }
        card.position.x = point.x;
        card.position.z = point.z;
        let title = card.title.clone();

        let target = self.station_order.iter().copied().find(|sid| {
            self.stations
                .get(*sid)
                .is_some_and(|s| s.is_card_over(point) && s.can_accept(id))
        })?;

        let station = self.stations.get_mut(target)?;
        let outcome = station.accept_card(id, &title, now, &self.catalog);
        let slot = station.slot_position(station.active_cards().len());
        let verb = station.kind.clone();
        let staged_titles: Vec<String> = station
            .active_titles()
            .into_iter()
            .map(str::to_string)
            .collect();

        if let Some(card) = self.cards.get_mut(id) {
            card.position = slot;
            card.station = Some(target);
        }
        self.event_bus.emit(Event::CardAccepted {
            station: target,
            card: id,
            at: now,
        });

        match outcome {
            CheckOutcome::Started { recipe, duration } => {
                tracing::debug!(
                    verb = %verb,
                    recipe = recipe.0,
                    duration = duration.to_num::<f64>(),
                    "processing started"
                );
                self.event_bus.emit(Event::ProcessingStarted {
                    station: target,
                    recipe,
                    at: now,
                });
            }
            CheckOutcome::InvalidCombination => {
                tracing::debug!(verb = %verb, titles = ?staged_titles, "invalid combination");
                self.event_bus.emit(Event::InvalidCombination {
                    station: target,
                    titles: staged_titles,
                    at: now,
                });
            }
            CheckOutcome::Waiting => {}
        }
        Some((target, outcome))
    }

    // -----------------------------------------------------------------------
    // Failure path
    // -----------------------------------------------------------------------

    /// Take `card` off station `sid`. While processing this aborts the whole
    /// process with `reason`.
    fn release_from_station(&mut self, sid: StationId, card: CardId, reason: ReturnReason) {
        let processing = match self.stations.get_mut(sid) {
            Some(station) if station.holds(card) => {
                if station.is_processing() {
                    true
                } else {
                    station.detach(card);
                    false
                }
            }
            _ => false,
        };
        if let Some(c) = self.cards.get_mut(card) {
            c.station = None;
        }
        if processing {
            self.fail_station(sid, reason);
        } else {
            self.recheck_station(sid);
        }
    }

    /// Re-run the recipe check after a card left an accumulating station, so
    /// the cards left behind can still start a recipe. No invalid-combination
    /// signal here; that only follows an acceptance.
    fn recheck_station(&mut self, sid: StationId) {
        let now = self.sim_state.now;
        let Some(station) = self.stations.get_mut(sid) else {
            return;
        };
        if station.is_processing() || station.active_cards().is_empty() {
            return;
        }
        if let CheckOutcome::Started { recipe, duration } = station.check_recipe(now, &self.catalog) {
            tracing::debug!(
                verb = %station.kind,
                recipe = recipe.0,
                duration = duration.to_num::<f64>(),
                "processing started after unstage"
            );
            self.event_bus.emit(Event::ProcessingStarted {
                station: sid,
                recipe,
                at: now,
            });
        }
    }

    /// Reset a station to `Idle` without output and lay its inputs out in
    /// front of it. Returns false if nothing was staged.
    fn fail_station(&mut self, sid: StationId, reason: ReturnReason) -> bool {
        let Some(station) = self.stations.get_mut(sid) else {
            return false;
        };
        let released = station.abort();
        if released.is_empty() {
            return false;
        }
        let spots = station.return_positions(released.len());
        for (card_id, spot) in released.iter().zip(spots) {
            if let Some(card) = self.cards.get_mut(*card_id) {
                card.position = spot;
                card.station = None;
            }
        }
        tracing::debug!(station = ?sid, ?reason, count = released.len(), "inputs returned");
        self.event_bus.emit(Event::InputsReturned {
            station: sid,
            cards: released,
            reason,
            at: self.sim_state.now,
        });
        true
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    /// While paused, `advance()` and `step()` are no-ops. Drag and drop
    /// still work.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop for good: drop pending spawns and buffered events and refuse any
    /// further advance.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.pending_spawns.clear();
        self.event_bus.clear_all();
        tracing::info!(
            tick = self.sim_state.tick,
            cards = self.cards.len(),
            "world shut down"
        );
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    // -----------------------------------------------------------------------
    // Event system
    // -----------------------------------------------------------------------

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: crate::event::PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    pub fn on_reactive(&mut self, kind: EventKind, handler: crate::event::ReactiveHandler) {
        self.event_bus.on_reactive(kind, handler);
    }

    // -----------------------------------------------------------------------
    // Advance
    // -----------------------------------------------------------------------

    /// Run the pipeline once at time `now`.
    ///
    /// Ignored while paused or shut down, and when `now` is earlier than the
    /// previous advance.
    pub fn advance(&mut self, now: Seconds) -> AdvanceResult {
        if self.paused || self.shut_down {
            return AdvanceResult::skipped();
        }
        if now < self.sim_state.now {
            tracing::trace!(
                now = now.to_num::<f64>(),
                last = self.sim_state.now.to_num::<f64>(),
                "clock went backwards; advance ignored"
            );
            return AdvanceResult::skipped();
        }
        self.sim_state.now = now;

        let mut result = AdvanceResult {
            ran: true,
            ..AdvanceResult::default()
        };
        self.phase_deferred_spawns(&mut result);
        self.phase_mutations(&mut result);
        self.phase_cards(&mut result);
        self.phase_generators(&mut result);
        self.phase_stations(&mut result);
        self.phase_post_tick();
        self.phase_bookkeeping();
        result
    }

    /// Advance to whatever `clock` says.
    pub fn advance_with(&mut self, clock: &mut impl Clock) -> AdvanceResult {
        let now = clock.now();
        self.advance(now)
    }

    /// Advance by the configured timestep.
    pub fn step(&mut self) -> AdvanceResult {
        let now = self.sim_state.now.saturating_add(self.config.timestep);
        self.advance(now)
    }

    fn phase_deferred_spawns(&mut self, result: &mut AdvanceResult) {
        if self.pending_spawns.is_empty() {
            return;
        }
        let now = self.sim_state.now;
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_spawns)
            .into_iter()
            .partition(|p| p.due <= now);
        self.pending_spawns = waiting;
        for spawn in due {
            result.created.push(self.create_card(spawn.spec));
        }
    }

    fn phase_mutations(&mut self, result: &mut AdvanceResult) {
        for mutation in self.event_bus.drain_mutations() {
            match mutation {
                EventMutation::CreateCard(spec) => {
                    result.created.push(self.create_card(spec));
                }
                EventMutation::DestroyCard(id) => {
                    if self.destroy_card(id) {
                        result.destroyed.push(id);
                    }
                }
            }
        }
    }

    fn phase_cards(&mut self, result: &mut AdvanceResult) {
        let now = self.sim_state.now;
        let grace = self.config.decay_grace;
        let ids: Vec<CardId> = self.cards.keys().collect();
        for id in ids {
            let Some(card) = self.cards.get_mut(id) else {
                continue;
            };
            match card.tick(now, grace) {
                CardTick::Unchanged => {}
                CardTick::StartedDecay => {
                    let station = card.station;
                    tracing::debug!(card = ?id, title = %card.title, "card decaying");
                    self.event_bus.emit(Event::CardDecaying { card: id, at: now });
                    if let Some(sid) = station {
                        let aborts = self.stations.get(sid).is_some_and(|s| s.is_processing());
                        self.release_from_station(sid, id, ReturnReason::InputDecayed);
                        if aborts {
                            result.returned.push(sid);
                        }
                    }
                }
                CardTick::Expired => {
                    if self.destroy_card(id) {
                        result.destroyed.push(id);
                    }
                }
            }
        }
    }

    fn phase_generators(&mut self, result: &mut AdvanceResult) {
        let now = self.sim_state.now;
        let threshold = self.config.occupancy_threshold;
        for gid in self.generator_order.clone() {
            let outcome = {
                let occupancy = LiveCards(&self.cards);
                let Some(generator) = self.generators.get_mut(gid) else {
                    continue;
                };
                generator.tick(now, &occupancy, threshold)
            };
            match outcome {
                GeneratorTick::Idle => {}
                GeneratorTick::Spawn(spec) => {
                    let card = self.create_card(spec);
                    tracing::debug!(generator = ?gid, card = ?card, "resource generated");
                    self.event_bus.emit(Event::CardGenerated {
                        generator: gid,
                        card,
                        at: now,
                    });
                    result.created.push(card);
                }
                GeneratorTick::Blocked => {
                    tracing::debug!(generator = ?gid, "no free spawn spot; cycle skipped");
                    self.event_bus
                        .emit(Event::GenerationBlocked { generator: gid, at: now });
                }
            }
        }
    }

    fn phase_stations(&mut self, result: &mut AdvanceResult) {
        let now = self.sim_state.now;
        let stall_timeout = self.config.stall_timeout;
        for sid in self.station_order.clone() {
            let Some(station) = self.stations.get_mut(sid) else {
                continue;
            };
            match station.tick(now, stall_timeout) {
                StationTick::Idle => {}
                StationTick::Progress(progress) => {
                    self.event_bus.emit(Event::ProcessingProgress {
                        station: sid,
                        progress,
                        at: now,
                    });
                }
                StationTick::Completed(completion) => {
                    let output_at = station.position + self.config.output_offset;
                    let verb = station.kind.clone();
                    for card in &completion.consumed {
                        if self.destroy_card(*card) {
                            result.destroyed.push(*card);
                        }
                    }
                    if let Some(recipe) = self.catalog.get(completion.recipe) {
                        tracing::info!(verb = %verb, output = %recipe.output, "recipe completed");
                        self.pending_spawns.push(PendingSpawn {
                            due: now.saturating_add(self.config.output_delay),
                            spec: CardSpec::new(recipe.output.clone(), recipe.output_kind, output_at),
                        });
                    }
                    self.event_bus.emit(Event::ProcessingProgress {
                        station: sid,
                        progress: Fixed64::ONE,
                        at: now,
                    });
                    self.event_bus.emit(Event::RecipeCompleted {
                        station: sid,
                        recipe: completion.recipe,
                        at: now,
                    });
                    result.completions.push((sid, completion));
                }
                StationTick::Stalled => {
                    if self.fail_station(sid, ReturnReason::StallTimeout) {
                        result.returned.push(sid);
                    }
                }
            }
        }
    }

    fn phase_post_tick(&mut self) {
        self.event_bus.deliver();
    }

    fn phase_bookkeeping(&mut self) {
        self.sim_state.tick += 1;
        self.last_state_hash = self.compute_state_hash();
    }

    /// Deterministic hash over time, cards, stations, generators and pending
    /// spawns, each walked in a stable order.
    pub(crate) fn compute_state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.sim_state.tick);
        h.write_fixed64(self.sim_state.now);

        h.write_u32(self.cards.len() as u32);
        for card in self.cards.values() {
            h.write_str(&card.title);
            h.write_str(card.kind.name());
            write_vec3(&mut h, card.position);
            h.write_bool(card.is_decaying());
            h.write_bool(card.is_held());
            h.write_bool(card.station.is_some());
        }

        for (_, station) in self.stations() {
            match station.state() {
                StationState::Idle => h.write_u32(0),
                StationState::Accumulating => h.write_u32(1),
                StationState::Processing {
                    recipe, started_at, ..
                } => {
                    h.write_u32(2);
                    h.write_u32(recipe.0);
                    h.write_fixed64(started_at);
                }
            }
            for staged in station.active_cards() {
                h.write_str(&staged.title);
            }
        }

        for (_, generator) in self.generators() {
            h.write_fixed64(generator.last_generation());
            h.write_bool(generator.is_active);
        }

        for spawn in &self.pending_spawns {
            h.write_fixed64(spawn.due);
            h.write_str(&spawn.spec.title);
        }

        h.finish()
    }
}

fn write_vec3(h: &mut StateHash, v: Vec3) {
    h.write_fixed64(v.x);
    h.write_fixed64(v.y);
    h.write_fixed64(v.z);
}

impl Default for World {
    fn default() -> Self {
        Self::with_standard_catalog()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardKind;
    use crate::fixed::secs;
    use crate::sim::ManualClock;
    use crate::test_utils::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn create_and_destroy_card() {
        let mut world = World::with_standard_catalog();
        let id = world.create_card(world.spec_for("Coal", Vec3::ZERO));
        assert_eq!(world.card_count(), 1);
        assert_eq!(world.card(id).unwrap().kind, CardKind::Generic);

        assert!(world.destroy_card(id));
        assert!(!world.destroy_card(id));
        assert_eq!(world.card_count(), 0);
    }

    #[test]
    fn occupancy_ignores_decaying_cards() {
        let mut world = World::with_standard_catalog();
        let spot = Vec3::from_f64(1.0, 0.1, 1.0);
        world.create_card(mana_spec(spot, 1.0));
        assert!(world.is_position_occupied(spot, secs(1.5)));

        world.advance(secs(1.0));
        assert!(world.card(world.cards_titled("Mana")[0]).unwrap().is_decaying());
        assert!(!world.is_position_occupied(spot, secs(1.5)));
    }

    #[test]
    fn scenario_forge_smelts_iron_ingot() {
        let mut world = standard_world();
        let forge = world.station_by_kind("forge").unwrap();
        let ore = place(&mut world, "Iron Ore");
        let coal = place(&mut world, "Coal");

        let at = world.station(forge).unwrap().position;
        assert!(world.route_drop(ore, at));
        assert!(world.route_drop(coal, at));
        assert!(world.station(forge).unwrap().is_processing());

        let result = world.advance(secs(2.9));
        assert!(result.completions.is_empty());

        let result = world.advance(secs(3.0));
        assert_eq!(result.completions.len(), 1);
        assert!(world.card(ore).is_none());
        assert!(world.card(coal).is_none());
        assert_eq!(world.count_titled("Iron Ingot"), 0);
        assert_eq!(world.pending_spawns().len(), 1);

        world.advance(secs(3.4));
        let ingots = world.cards_titled("Iron Ingot");
        assert_eq!(ingots.len(), 1);
        let ingot = world.card(ingots[0]).unwrap();
        assert_eq!(ingot.kind, CardKind::Ingredient);
        assert_eq!(ingot.position, at + world.config().output_offset);
        assert_eq!(world.station(forge).unwrap().state(), StationState::Idle);
    }

    #[test]
    fn scenario_single_card_keeps_accumulating() {
        let mut world = standard_world();
        let forge = world.station_by_kind("forge").unwrap();
        let invalid = count_events(&mut world, EventKind::InvalidCombination);
        let ore = place(&mut world, "Iron Ore");
        let at = world.station(forge).unwrap().position;

        assert!(world.route_drop(ore, at));
        world.advance(secs(10.0));
        assert_eq!(*invalid.borrow(), 0);
        assert_eq!(
            world.station(forge).unwrap().state(),
            StationState::Accumulating
        );
        assert_eq!(world.card(ore).unwrap().station(), Some(forge));
    }

    #[test]
    fn picking_up_the_odd_card_out_starts_the_recipe() {
        let mut world = standard_world();
        let forge = world.station_by_kind("forge").unwrap();
        let started = count_events(&mut world, EventKind::ProcessingStarted);
        let invalid = count_events(&mut world, EventKind::InvalidCombination);
        let cards = drop_titles(&mut world, forge, &["Iron Ore", "Wood", "Coal"]);
        world.advance(secs(0.5));
        assert_eq!(*invalid.borrow(), 2);
        assert_eq!(world.station(forge).unwrap().state(), StationState::Accumulating);

        assert!(world.pickup_card(cards[1]));
        assert!(world.station(forge).unwrap().is_processing());
        world.advance(secs(1.0));
        assert_eq!(*started.borrow(), 1);
        assert_eq!(*invalid.borrow(), 2);

        let result = world.advance(secs(3.5));
        assert_eq!(result.completions.len(), 1);
        world.advance(secs(4.0));
        assert_eq!(world.count_titled("Iron Ingot"), 1);
        assert_eq!(world.count_titled("Wood"), 1);
    }

    #[test]
    fn decaying_odd_card_out_starts_the_recipe() {
        let mut world = standard_world();
        let forge = world.station_by_kind("forge").unwrap();
        let at = world.station(forge).unwrap().position;
        let ore = place(&mut world, "Iron Ore");
        let mana = world.create_card(mana_spec(Vec3::from_f64(-20.0, 0.1, 20.0), 1.0));
        let coal = place(&mut world, "Coal");
        for card in [ore, mana, coal] {
            assert!(world.route_drop(card, at));
        }
        assert!(!world.station(forge).unwrap().is_processing());

        world.advance(secs(1.0));
        assert!(world.card(mana).unwrap().is_decaying());
        assert_eq!(world.card(mana).unwrap().station(), None);
        let station = world.station(forge).unwrap();
        assert!(station.is_processing());
        assert_eq!(station.active_cards().len(), 2);

        let result = world.advance(secs(4.0));
        assert_eq!(result.completions.len(), 1);
        assert!(world.card(ore).is_none());
        assert!(world.card(coal).is_none());
    }

    #[test]
    fn manual_clock_drives_advance() {
        let mut world = standard_world();
        let forge = world.station_by_kind("forge").unwrap();
        drop_titles(&mut world, forge, &["Iron Ore", "Coal"]);
        let mut clock = ManualClock::new(Seconds::ZERO);

        clock.advance(secs(1.5));
        let result = world.advance_with(&mut clock);
        assert!(result.completions.is_empty());
        assert_eq!(world.now(), secs(1.5));

        clock.set(secs(3.0));
        let result = world.advance_with(&mut clock);
        assert_eq!(result.completions.len(), 1);

        clock.set(secs(2.0));
        world.advance_with(&mut clock);
        assert_eq!(world.now(), secs(3.0));
    }

    #[test]
    fn invalid_combination_signals_and_keeps_cards() {
        let mut world = standard_world();
        let forge = world.station_by_kind("forge").unwrap();
        let invalid = count_events(&mut world, EventKind::InvalidCombination);
        let at = world.station(forge).unwrap().position;
        let ore = place(&mut world, "Iron Ore");
        let wood = place(&mut world, "Wood");
        world.route_drop(ore, at);
        world.route_drop(wood, at);
        world.advance(secs(0.1));
        assert_eq!(*invalid.borrow(), 1);
        assert_eq!(world.station(forge).unwrap().active_cards().len(), 2);
    }

    #[test]
    fn drop_outside_every_zone_is_refused() {
        let mut world = standard_world();
        let ore = place(&mut world, "Iron Ore");
        let far = Vec3::from_f64(50.0, 0.0, 50.0);
        assert!(!world.route_drop(ore, far));
        let card = world.card(ore).unwrap();
        assert_eq!(card.position.x, far.x);
        assert_eq!(card.station(), None);
    }

    #[test]
    fn drop_on_processing_station_is_refused() {
        let mut world = standard_world();
        let forge = world.station_by_kind("forge").unwrap();
        let at = world.station(forge).unwrap().position;
        drop_titles(&mut world, forge, &["Iron Ore", "Coal"]);
        let wood = place(&mut world, "Wood");
        assert!(!world.route_drop(wood, at));
        assert_eq!(world.station(forge).unwrap().active_cards().len(), 2);
    }

    #[test]
    fn decaying_card_is_not_accepted() {
        let mut world = standard_world();
        let study = world.station_by_kind("study").unwrap();
        let mana = world.create_card(mana_spec(Vec3::ZERO, 1.0));
        world.advance(secs(1.0));
        let at = world.station(study).unwrap().position;
        assert!(!world.route_drop(mana, at));
    }

    #[test]
    fn decayed_card_is_removed_after_grace() {
        let mut world = World::with_standard_catalog();
        let mana = world.create_card(mana_spec(Vec3::ZERO, 30.0));
        world.advance(secs(30.0));
        assert!(world.card(mana).unwrap().is_decaying());
        world.advance(secs(30.4));
        assert!(world.card(mana).is_some());
        let result = world.advance(secs(30.5));
        assert_eq!(result.destroyed, vec![mana]);
        assert!(world.card(mana).is_none());
    }

    #[test]
    fn input_decaying_while_processing_returns_inputs() {
        let mut world = standard_world();
        let ritual = world.station_by_kind("ritual").unwrap();
        let at = world.station(ritual).unwrap().position;
        let shard = place(&mut world, "Crystal Shard");
        let m1 = world.create_card(mana_spec(Vec3::ZERO, 2.0));
        let m2 = world.create_card(mana_spec(Vec3::from_f64(0.0, 0.0, 3.0), 30.0));
        world.route_drop(shard, at);
        world.route_drop(m1, at);
        world.route_drop(m2, at);
        assert!(world.station(ritual).unwrap().is_processing());

        let result = world.advance(secs(2.0));
        assert_eq!(result.returned, vec![ritual]);
        assert_eq!(world.station(ritual).unwrap().state(), StationState::Idle);
        assert_eq!(world.count_titled("Charged Crystal"), 0);
        assert_eq!(world.card(shard).unwrap().station(), None);

        let spots = world.station(ritual).unwrap().return_positions(3);
        assert_eq!(world.card(shard).unwrap().position, spots[0]);
    }

    #[test]
    fn destroying_a_processing_input_aborts() {
        let mut world = standard_world();
        let forge = world.station_by_kind("forge").unwrap();
        let cards = drop_titles(&mut world, forge, &["Iron Ore", "Coal"]);
        assert!(world.destroy_card(cards[0]));
        assert_eq!(world.station(forge).unwrap().state(), StationState::Idle);
        assert_eq!(world.card(cards[1]).unwrap().station(), None);
    }

    #[test]
    fn cancel_processing_returns_inputs_without_output() {
        let mut world = standard_world();
        let forge = world.station_by_kind("forge").unwrap();
        let returned = count_events(&mut world, EventKind::InputsReturned);
        let cards = drop_titles(&mut world, forge, &["Iron Ore", "Coal"]);
        assert!(world.cancel_processing(forge));
        assert!(!world.cancel_processing(forge));

        world.advance(secs(10.0));
        assert_eq!(*returned.borrow(), 1);
        assert_eq!(world.count_titled("Iron Ingot"), 0);
        for card in cards {
            assert!(world.card(card).is_some());
        }
    }

    #[test]
    fn pickup_unstages_from_accumulating_station() {
        let mut world = standard_world();
        let forge = world.station_by_kind("forge").unwrap();
        let cards = drop_titles(&mut world, forge, &["Iron Ore"]);
        assert!(world.pickup_card(cards[0]));
        assert_eq!(world.station(forge).unwrap().state(), StationState::Idle);
        assert!(world.card(cards[0]).unwrap().is_held());
        assert!(world.drag_card(cards[0], Vec3::from_f64(1.0, 0.0, 1.0)));
        assert!(world.drop_card(cards[0]));
        assert!(!world.card(cards[0]).unwrap().is_held());
    }

    #[test]
    fn pickup_refused_while_processing() {
        let mut world = standard_world();
        let forge = world.station_by_kind("forge").unwrap();
        let cards = drop_titles(&mut world, forge, &["Iron Ore", "Coal"]);
        assert!(!world.pickup_card(cards[0]));
        assert!(world.station(forge).unwrap().is_processing());
    }

    #[test]
    fn first_registered_station_wins_overlap() {
        let mut world = World::with_standard_catalog();
        let a = world.add_station(Station::new(
            "forge",
            Vec3::ZERO,
            Vec3::from_f64(2.0, 1.0, 2.0),
        ));
        let b = world.add_station(Station::new(
            "study",
            Vec3::ZERO,
            Vec3::from_f64(2.0, 1.0, 2.0),
        ));
        let ore = place(&mut world, "Iron Ore");
        let (taken_by, _) = world.drop_on_station(ore, Vec3::ZERO).unwrap();
        assert_eq!(taken_by, a);
        assert_ne!(taken_by, b);
    }

    #[test]
    fn generator_scenario_fully_surrounded() {
        let mut world = World::with_standard_catalog();
        let gen_pos = Vec3::from_f64(-8.0, 0.5, 0.0);
        let gid = world.spawn_generator(GeneratorKind::Mana, gen_pos, secs(5.0));
        for offset in crate::generator::spawn_offsets() {
            world.create_card(world.spec_for("Coal", gen_pos + offset));
        }
        let before = world.card_count();
        world.advance(secs(5.0));
        assert_eq!(world.card_count(), before);
        assert_eq!(world.generator(gid).unwrap().last_generation(), secs(5.0));
    }

    #[test]
    fn generator_one_attempt_per_interval() {
        let mut world = World::with_standard_catalog();
        world.spawn_generator(GeneratorKind::Herb, Vec3::ZERO, secs(5.0));
        let generated = count_events(&mut world, EventKind::CardGenerated);
        for t in 1..=20 {
            world.advance(secs(t as f64));
        }
        assert_eq!(*generated.borrow(), 4);
        assert_eq!(world.count_titled("Herb"), 4);
    }

    #[test]
    fn paused_generator_skips_cycles_and_removed_one_stops() {
        let mut world = World::with_standard_catalog();
        let gid = world.spawn_generator(GeneratorKind::Herb, Vec3::ZERO, secs(5.0));

        assert!(world.set_generator_active(gid, false));
        world.advance(secs(10.0));
        assert_eq!(world.count_titled("Herb"), 0);
        assert_eq!(world.generator(gid).unwrap().last_generation(), Seconds::ZERO);

        assert!(world.set_generator_active(gid, true));
        world.advance(secs(11.0));
        assert_eq!(world.count_titled("Herb"), 1);

        assert!(world.remove_generator(gid));
        assert!(!world.remove_generator(gid));
        assert!(!world.set_generator_active(gid, true));
        assert_eq!(world.generators().count(), 0);
        world.advance(secs(30.0));
        assert_eq!(world.count_titled("Herb"), 1);
    }

    #[test]
    fn generated_mana_carries_configured_lifetime() {
        let mut config = WorldConfig::default();
        config.resource_lifetime = secs(12.0);
        let mut world = World::new(Arc::new(RecipeCatalog::standard()), config);
        world.spawn_generator(GeneratorKind::Mana, Vec3::ZERO, secs(1.0));
        world.advance(secs(1.0));
        let mana = world.card(world.cards_titled("Mana")[0]).unwrap();
        assert_eq!(mana.lifetime(), Some(secs(12.0)));
        assert!(mana.is_resource);
    }

    #[test]
    fn stall_timeout_returns_inputs() {
        let mut config = WorldConfig::default();
        config.stall_timeout = Some(secs(5.0));
        let mut world = World::new(Arc::new(RecipeCatalog::standard()), config);
        add_standard_stations(&mut world);
        let forge = world.station_by_kind("forge").unwrap();
        drop_titles(&mut world, forge, &["Iron Ore"]);
        assert!(world.advance(secs(4.0)).returned.is_empty());
        assert_eq!(world.advance(secs(5.0)).returned, vec![forge]);
        assert_eq!(world.station(forge).unwrap().state(), StationState::Idle);
    }

    #[test]
    fn backwards_clock_is_ignored() {
        let mut world = World::with_standard_catalog();
        assert!(world.advance(secs(5.0)).ran);
        let hash = world.state_hash();
        assert!(!world.advance(secs(4.0)).ran);
        assert_eq!(world.now(), secs(5.0));
        assert_eq!(world.state_hash(), hash);
    }

    #[test]
    fn pause_and_shutdown() {
        let mut world = World::with_standard_catalog();
        world.pause();
        assert!(!world.step().ran);
        world.resume();
        assert!(world.step().ran);
        assert_eq!(world.now(), world.config().timestep);

        world.shutdown();
        assert!(world.is_shut_down());
        assert!(!world.advance(secs(100.0)).ran);
    }

    #[test]
    fn reactive_mutation_applies_next_advance() {
        let mut world = World::with_standard_catalog();
        world.on_reactive(
            EventKind::CardDestroyed,
            Box::new(|event| match event {
                Event::CardDestroyed { title, .. } if title == "Coal" => vec![
                    EventMutation::CreateCard(CardSpec::new("Ash", CardKind::Generic, Vec3::ZERO)),
                ],
                _ => Vec::new(),
            }),
        );
        let coal = place(&mut world, "Coal");
        world.destroy_card(coal);
        world.advance(secs(0.1));
        assert_eq!(world.count_titled("Ash"), 0);
        world.advance(secs(0.2));
        assert_eq!(world.count_titled("Ash"), 1);
    }

    #[test]
    fn removing_station_hands_back_cards() {
        let mut world = standard_world();
        let forge = world.station_by_kind("forge").unwrap();
        let cards = drop_titles(&mut world, forge, &["Iron Ore"]);
        assert!(world.remove_station(forge));
        assert!(!world.remove_station(forge));
        assert_eq!(world.card(cards[0]).unwrap().station(), None);
        assert!(world.station_by_kind("forge").is_none());
    }

    #[test]
    fn identical_runs_hash_identically() {
        let run = || {
            let mut world = standard_world();
            add_standard_generators(&mut world);
            let forge = world.station_by_kind("forge").unwrap();
            drop_titles(&mut world, forge, &["Iron Ore", "Coal"]);
            for t in 1..=60 {
                world.advance(secs(t as f64 * 0.5));
            }
            world.state_hash()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn progress_events_are_emitted_each_advance() {
        let mut world = standard_world();
        let forge = world.station_by_kind("forge").unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_c = seen.clone();
        world.on_passive(
            EventKind::ProcessingProgress,
            Box::new(move |e| {
                if let Event::ProcessingProgress { progress, .. } = e {
                    seen_c.borrow_mut().push(*progress);
                }
            }),
        );
        drop_titles(&mut world, forge, &["Iron Ore", "Coal"]);
        world.advance(secs(1.5));
        world.advance(secs(3.0));
        assert_eq!(*seen.borrow(), vec![secs(0.5), Fixed64::ONE]);
    }
}
