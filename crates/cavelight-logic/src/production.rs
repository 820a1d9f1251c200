//! Per-cycle village production and upkeep.
//!
//! One cycle is 15 seconds of normal play. [`cycle_rates`] is the single
//! formula for what the village makes and eats in a cycle; normal mode
//! applies it one whole cycle at a time through [`apply_cycle`], and the idle
//! simulator scales the same rates by elapsed time and intensity.
//!
//! Villager assignment lives here too, since roles only matter for output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::production as rates;
use crate::path::StatePath;
use crate::state::{Building, GameState, Resource, Tool, Villager};

/// Production and consumption for one cycle, both as positive magnitudes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleRates {
    pub production: BTreeMap<Resource, f64>,
    pub consumption: BTreeMap<Resource, f64>,
}

impl CycleRates {
    pub fn produce(&mut self, resource: Resource, amount: f64) {
        if amount > 0.0 {
            *self.production.entry(resource).or_insert(0.0) += amount;
        }
    }

    pub fn consume(&mut self, resource: Resource, amount: f64) {
        if amount > 0.0 {
            *self.consumption.entry(resource).or_insert(0.0) += amount;
        }
    }

    /// Production minus consumption for one resource.
    pub fn net(&self, resource: Resource) -> f64 {
        self.production.get(&resource).copied().unwrap_or(0.0)
            - self.consumption.get(&resource).copied().unwrap_or(0.0)
    }

    /// Every resource with any production or consumption.
    pub fn resources(&self) -> Vec<Resource> {
        let mut all: Vec<Resource> = self
            .production
            .keys()
            .chain(self.consumption.keys())
            .copied()
            .collect();
        all.sort();
        all.dedup();
        all
    }
}

/// Compute one cycle's output and upkeep from the current village.
pub fn cycle_rates(state: &GameState) -> CycleRates {
    let mut out = CycleRates::default();

    let axe = if state.has_tool(Tool::IronAxe) {
        rates::IRON_AXE_BONUS
    } else {
        1.0
    };
    let pick = if state.has_tool(Tool::StonePickaxe) {
        rates::STONE_PICKAXE_BONUS
    } else {
        1.0
    };

    let gatherers = state.villagers_in(Villager::Gatherer);
    out.produce(Resource::Wood, gatherers * rates::GATHERER_WOOD * axe);

    let hunters = state.villagers_in(Villager::Hunter);
    out.produce(Resource::Food, hunters * rates::HUNTER_FOOD);
    out.produce(Resource::Fur, hunters * rates::HUNTER_FUR);
    out.produce(Resource::Bones, hunters * rates::HUNTER_BONES);

    let stone_miners = state.villagers_in(Villager::StoneMiner);
    out.produce(Resource::Stone, stone_miners * rates::STONE_MINER_STONE * pick);

    out.produce(
        Resource::Iron,
        state.villagers_in(Villager::IronMiner) * rates::IRON_MINER_IRON,
    );
    out.produce(
        Resource::Coal,
        state.villagers_in(Villager::CoalMiner) * rates::COAL_MINER_COAL,
    );

    // Tanners idle without a tannery
    if state.building_count(Building::Tannery) > 0 {
        let tanners = state.villagers_in(Villager::Tanner);
        out.produce(Resource::Leather, tanners * rates::TANNER_LEATHER);
        out.consume(Resource::Fur, tanners * rates::TANNER_FUR_INPUT);
    }

    let population = state.population();
    out.consume(Resource::Food, population * rates::FOOD_PER_VILLAGER);
    out.consume(Resource::Wood, population * rates::WOOD_PER_VILLAGER);

    out
}

/// Outcome of one normal-mode cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Net change actually applied per resource.
    pub applied: BTreeMap<Resource, f64>,
    /// Resources that ran out and were clamped at zero.
    pub shortages: Vec<Resource>,
}

/// Apply one full cycle of production and upkeep, holding every resource at
/// or above zero.
pub fn apply_cycle(state: &mut GameState) -> CycleReport {
    let cycle = cycle_rates(state);
    let mut report = CycleReport::default();

    for resource in cycle.resources() {
        let path = StatePath::Resource(resource);
        let before = state.number(path);
        let target = before + cycle.net(resource);
        let after = target.max(0.0);
        if target < 0.0 {
            report.shortages.push(resource);
        }
        state.set_number(path, after);
        report.applied.insert(resource, after - before);
    }

    report
}

// ── Villager assignment ────────────────────────────────────────────────

/// Move one free villager into `role`. False when nobody is free.
pub fn assign(state: &mut GameState, role: Villager) -> bool {
    if role == Villager::Free || state.villagers_in(Villager::Free) < 1.0 {
        return false;
    }
    state.add(StatePath::Villager(Villager::Free), -1.0);
    state.add(StatePath::Villager(role), 1.0);
    true
}

/// Move one villager from `role` back to the free pool.
pub fn unassign(state: &mut GameState, role: Villager) -> bool {
    if role == Villager::Free || state.villagers_in(role) < 1.0 {
        return false;
    }
    state.add(StatePath::Villager(role), -1.0);
    state.add(StatePath::Villager(Villager::Free), 1.0);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn village(roles: &[(Villager, f64)]) -> GameState {
        let mut state = GameState::new();
        for &(role, n) in roles {
            state.villagers.insert(role, n);
        }
        state
    }

    #[test]
    fn test_empty_village_produces_nothing() {
        let rates = cycle_rates(&GameState::new());
        assert!(rates.production.is_empty());
        assert!(rates.consumption.is_empty());
    }

    #[test]
    fn test_gatherers_and_upkeep() {
        let state = village(&[(Villager::Gatherer, 3.0), (Villager::Free, 1.0)]);
        let rates = cycle_rates(&state);
        assert_eq!(rates.production[&Resource::Wood], 30.0);
        assert_eq!(rates.consumption[&Resource::Food], 4.0);
        assert_eq!(rates.consumption[&Resource::Wood], 2.0);
        assert_eq!(rates.net(Resource::Wood), 28.0);
    }

    #[test]
    fn test_tools_boost_output() {
        let mut state = village(&[(Villager::Gatherer, 2.0), (Villager::StoneMiner, 2.0)]);
        state.tools.insert(Tool::IronAxe, true);
        state.tools.insert(Tool::StonePickaxe, true);
        let rates = cycle_rates(&state);
        assert_eq!(rates.production[&Resource::Wood], 30.0);
        assert_eq!(rates.production[&Resource::Stone], 15.0);
    }

    #[test]
    fn test_tanners_need_tannery() {
        let mut state = village(&[(Villager::Tanner, 2.0)]);
        assert_eq!(cycle_rates(&state).net(Resource::Leather), 0.0);
        state.buildings.insert(Building::Tannery, 1.0);
        let rates = cycle_rates(&state);
        assert_eq!(rates.production[&Resource::Leather], 2.0);
        assert_eq!(rates.consumption[&Resource::Fur], 4.0);
    }

    #[test]
    fn test_apply_cycle_clamps_and_reports_shortage() {
        let mut state = village(&[(Villager::Hunter, 1.0), (Villager::Free, 9.0)]);
        state.resources.insert(Resource::Food, 2.0);
        let report = apply_cycle(&mut state);
        // 5 food hunted, 10 eaten, 2 in store
        assert_eq!(state.resource(Resource::Food), 0.0);
        assert_eq!(report.applied[&Resource::Food], -2.0);
        assert!(report.shortages.contains(&Resource::Food));
        assert_eq!(state.resource(Resource::Fur), 1.0);
    }

    #[test]
    fn test_assign_and_unassign() {
        let mut state = village(&[(Villager::Free, 1.0)]);
        assert!(assign(&mut state, Villager::Hunter));
        assert!(!assign(&mut state, Villager::Hunter));
        assert_eq!(state.villagers_in(Villager::Hunter), 1.0);
        assert!(unassign(&mut state, Villager::Hunter));
        assert!(!unassign(&mut state, Villager::Hunter));
        assert!(!assign(&mut state, Villager::Free));
        assert_eq!(state.villagers_in(Villager::Free), 1.0);
    }
}
