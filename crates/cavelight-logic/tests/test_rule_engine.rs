//! Integration tests for the rule engine as a player drives it.
//!
//! Exercises: registry → executor → cooldowns, then the village economy
//! feeding combat and idle mode. All tests are pure logic with explicit
//! timestamps and seeded randomness.

use cavelight_logic::bastion::{bastion_stats, CombatProfile};
use cavelight_logic::combat::{CombatResult, CombatSession, Enemy};
use cavelight_logic::cooldown::CooldownTracker;
use cavelight_logic::executor::{self, Rejection};
use cavelight_logic::idle::{self, Accumulated};
use cavelight_logic::production::{self, CycleRates};
use cavelight_logic::registry::ActionRegistry;
use cavelight_logic::state::{Building, Flag, GameState, Resource, Story, Tool, Villager};
use rand::rngs::StdRng;
use rand::SeedableRng;

// ── Helpers ────────────────────────────────────────────────────────────

fn registry() -> ActionRegistry {
    ActionRegistry::bundled().unwrap()
}

/// Click `action_id` at `now`, panicking with the rejection if it fails.
fn click(
    registry: &ActionRegistry,
    action_id: &str,
    state: &mut GameState,
    cooldowns: &mut CooldownTracker,
    now: u64,
) {
    if let Err(rejection) = executor::execute(registry, action_id, state, cooldowns, now) {
        panic!("{} rejected at {}: {}", action_id, now, rejection);
    }
}

// ── Documented scenarios ───────────────────────────────────────────────

#[test]
fn scenario_craft_stone_axe() {
    let registry = registry();
    let mut state = GameState::new();
    state.flags.insert(Flag::CaveExplored, true);
    state.tools.insert(Tool::StoneAxe, false);
    state.resources.insert(Resource::Wood, 50.0);
    state.resources.insert(Resource::Stone, 50.0);
    let mut cooldowns = CooldownTracker::new();

    click(&registry, "craftStoneAxe", &mut state, &mut cooldowns, 0);

    assert_eq!(state.resource(Resource::Wood), 40.0);
    assert_eq!(state.resource(Resource::Stone), 40.0);
    assert!(state.has_tool(Tool::StoneAxe));
    assert!(state.is_flagged(Flag::VillageUnlocked));
}

#[test]
fn scenario_one_combat_round() {
    let profile = CombatProfile::with_stats(15.0, 10.0, 60.0);
    let mut combat = CombatSession::new(Enemy::new("Raider", 100.0, 20.0), profile);
    let mut rng = StdRng::seed_from_u64(1);

    combat.fight(&mut rng).unwrap();

    assert_eq!(combat.integrity(), combat.max_integrity() - 10.0);
    assert_eq!(combat.enemy().health, 85.0);
    assert_eq!(combat.enemy().max_health, 100.0);
    assert_eq!(combat.round(), 2);
}

#[test]
fn scenario_idle_thirty_seconds() {
    let mut rates = CycleRates::default();
    rates.produce(Resource::Wood, 15.0);
    let state = GameState::new();
    let multiplier = idle::intensity(&state);
    assert_eq!(idle::max_duration_ms(&state), 4 * 3_600_000);

    let acc = idle::accumulate(&rates, multiplier, 30.0);
    assert!((acc[&Resource::Wood] - 3.0).abs() < 1e-9);
}

#[test]
fn scenario_cooldown_five_seconds() {
    let registry = registry();
    let mut state = GameState::new();
    state.flags.insert(Flag::CaveExplored, true);
    let mut cooldowns = CooldownTracker::new();
    assert_eq!(registry.action("chopWood").unwrap().cooldown_secs, 5.0);

    click(&registry, "chopWood", &mut state, &mut cooldowns, 0);
    assert!(!executor::can_execute(&registry, "chopWood", &state, &cooldowns, 3_000));
    assert!(executor::can_execute(&registry, "chopWood", &state, &cooldowns, 5_000));
    click(&registry, "chopWood", &mut state, &mut cooldowns, 5_000);
}

// ── Progression ────────────────────────────────────────────────────────

#[test]
fn early_game_progression_unlocks_village() {
    let registry = registry();
    let mut state = GameState::new();
    let mut cooldowns = CooldownTracker::new();

    let visible: Vec<&str> = registry
        .visible_actions(&state)
        .map(|def| def.id.as_str())
        .collect();
    assert_eq!(visible, vec!["exploreCave"]);

    click(&registry, "exploreCave", &mut state, &mut cooldowns, 0);
    assert!(state.story_seen(Story::CaveExplored));

    // Chop and dig by hand until the axe is affordable
    let mut now = 0;
    while state.resource(Resource::Wood) < 10.0 || state.resource(Resource::Stone) < 10.0 {
        now += 5_000;
        if state.resource(Resource::Wood) < 10.0 {
            click(&registry, "chopWood", &mut state, &mut cooldowns, now);
        }
        if state.resource(Resource::Stone) < 10.0 {
            click(&registry, "gatherStone", &mut state, &mut cooldowns, now);
        }
    }

    let done = executor::execute(&registry, "craftStoneAxe", &mut state, &mut cooldowns, now).unwrap();
    assert!(state.is_flagged(Flag::VillageUnlocked));
    assert!(done.unlocked.iter().any(|id| id == "buildWoodenHut"));
    assert!(registry
        .visible_actions(&state)
        .any(|def| def.id == "buildWoodenHut"));
}

#[test]
fn hut_costs_rise_with_level() {
    let registry = registry();
    let mut state = GameState::new();
    let first = registry.resolve_cost("buildWoodenHut", 1, &state).unwrap();
    let second = registry.resolve_cost("buildWoodenHut", 2, &state).unwrap();
    let wood = |cost: &cavelight_logic::resolver::ResolvedCost| {
        cost[&cavelight_logic::path::StatePath::Resource(Resource::Wood)]
    };
    assert!(wood(&second) > wood(&first));

    state.buildings.insert(Building::WoodenHut, 10.0);
    let hut = registry.action("buildWoodenHut").unwrap();
    assert!(hut.is_maxed(&state));
    assert!(registry.resolve_cost("buildWoodenHut", 11, &state).is_none());
}

#[test]
fn rejected_click_is_a_no_op() {
    let registry = registry();
    let mut state = GameState::new();
    state.flags.insert(Flag::VillageUnlocked, true);
    let mut cooldowns = CooldownTracker::new();
    let before = state.clone();

    let result = executor::execute(&registry, "buildWoodenHut", &mut state, &mut cooldowns, 0);
    assert!(matches!(result, Err(Rejection::Unaffordable(_))));
    assert_eq!(state, before);
    assert!(cooldowns.is_empty());
}

// ── Economy into combat and idle ───────────────────────────────────────

#[test]
fn village_cycle_then_idle_settle() {
    let mut state = GameState::new();
    state.villagers.insert(Villager::Free, 4.0);
    assert!(production::assign(&mut state, Villager::Gatherer));
    assert!(production::assign(&mut state, Villager::Hunter));
    state.resources.insert(Resource::Food, 10.0);

    production::apply_cycle(&mut state);
    // 10 wood gathered, 2 eaten; 5 food hunted, 4 eaten
    assert_eq!(state.resource(Resource::Wood), 8.0);
    assert_eq!(state.resource(Resource::Food), 11.0);

    let session = idle::start(1_000, &state);
    let later = 1_000 + 150_000;
    let progress = idle::resume(&session, later, &state);
    assert_eq!(progress.elapsed_capped_secs, 150.0);
    // 10 cycles at 10%: wood (10 - 2) × 1, food (5 - 4) × 1
    assert!((progress.accumulated[&Resource::Wood] - 8.0).abs() < 1e-9);

    let ticked = idle::tick(&session, later, &state, &Accumulated::new());
    assert_eq!(ticked, progress.accumulated);

    idle::settle(session, &ticked, &mut state);
    assert_eq!(state.resource(Resource::Wood), 16.0);
    assert_eq!(state.resource(Resource::Food), 12.0);
}

#[test]
fn fortified_bastion_beats_wolves() {
    let registry = registry();
    let mut state = GameState::new();
    state.buildings.insert(Building::Palisade, 2.0);
    state.buildings.insert(Building::Watchtower, 2.0);
    state.buildings.insert(Building::Bastion, 1.0);
    let stats = bastion_stats(&state);
    assert_eq!(stats.defense, 10.0);

    let wolves = registry.encounter("wolfPack").unwrap();
    let mut combat = CombatSession::start(wolves, CombatProfile::from_state(&state));
    let mut rng = StdRng::seed_from_u64(99);
    while !combat.is_finished() {
        combat.fight(&mut rng).unwrap();
        assert!(combat.integrity() >= 0.0);
        assert!(combat.enemy().health >= 0.0);
    }
    assert_eq!(combat.result(), Some(CombatResult::Victory));

    let outcome = combat.close(&mut state, 5_000).unwrap();
    assert_eq!(outcome.result, CombatResult::Victory);
    assert_eq!(state.resource(Resource::Food), 20.0);
    assert!(state.story_seen(Story::FirstVictory));
}
