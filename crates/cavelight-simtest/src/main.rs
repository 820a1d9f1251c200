//! Cavelight Headless Rule-Engine Harness
//!
//! Validates the bundled registry and replays reference scenarios, a greedy
//! autoplay run, combat sweeps and idle sweeps. Runs entirely in-process
//! with fixed timestamps and seeded randomness.
//!
//! Usage:
//!   cargo run -p cavelight-simtest
//!   cargo run -p cavelight-simtest -- --verbose

use cavelight_core::prelude::*;
use cavelight_logic::bastion::CombatProfile;
use cavelight_logic::combat::{CombatResult, CombatSession, Enemy};
use cavelight_logic::constants::{sleep, timing};
use cavelight_logic::cooldown::CooldownTracker;
use cavelight_logic::executor;
use cavelight_logic::idle::{self, IdleSession};
use cavelight_logic::production::CycleRates;
use cavelight_logic::registry::ActionRegistry;
use cavelight_logic::state::{
    Building, CombatSkill, Flag, Resource, SleepUpgrade, Stat, Tool, Villager,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Cavelight Rule-Engine Harness ===\n");

    let registry = match ActionRegistry::bundled() {
        Ok(r) => r,
        Err(e) => {
            println!("  ✗ registry_load: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();

    // 1. Registry content
    results.extend(validate_registry(&registry, verbose));

    // 2. Reference scenarios
    results.extend(validate_scenarios(&registry));

    // 3. Greedy autoplay through normal mode
    results.extend(validate_autoplay(verbose));

    // 4. Combat sweep
    results.extend(validate_combat(&registry, verbose));

    // 5. Idle sweep over every sleep level
    results.extend(validate_idle(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Registry ─────────────────────────────────────────────────────────

fn validate_registry(registry: &ActionRegistry, verbose: bool) -> Vec<TestResult> {
    println!("--- Registry ---");
    let mut results = Vec::new();

    results.push(check(
        "registry_not_empty",
        registry.len() > 20,
        format!(
            "{} actions, {} items, {} encounters",
            registry.len(),
            registry.items().count(),
            registry.encounters().count()
        ),
    ));

    let fresh = GameState::new();
    let entry: Vec<&str> = registry
        .visible_actions(&fresh)
        .map(|d| d.id.as_str())
        .collect();
    results.push(check(
        "registry_single_entry_point",
        entry == ["exploreCave"],
        format!("visible at start: {:?}", entry),
    ));

    // Every action should have a reason to show up: something unlocks it,
    // or it is the entry point
    let unlocked: Vec<&str> = registry
        .actions()
        .flat_map(|d| d.unlocks.iter().map(String::as_str))
        .collect();
    let orphans: Vec<&str> = registry
        .actions()
        .map(|d| d.id.as_str())
        .filter(|id| *id != "exploreCave" && !unlocked.contains(id))
        .collect();
    results.push(check(
        "registry_no_orphans",
        orphans.is_empty(),
        if orphans.is_empty() {
            "every action is unlocked by another".to_string()
        } else {
            format!("never unlocked: {}", orphans.join(", "))
        },
    ));

    let leveled: Vec<_> = registry.actions().filter(|d| d.max_level > 1).collect();
    let gaps: Vec<&str> = leveled
        .iter()
        .filter(|d| (1..=d.max_level).any(|l| !d.costs.contains_key(&l)))
        .map(|d| d.id.as_str())
        .collect();
    results.push(check(
        "registry_levels_complete",
        gaps.is_empty(),
        format!("{} leveled actions, {} with gaps", leveled.len(), gaps.len()),
    ));

    if verbose {
        for def in registry.actions() {
            println!(
                "    {:24} max_level={:2} cooldown={:>4}s unlocks={}",
                def.id,
                def.max_level,
                def.cooldown_secs,
                def.unlocks.len()
            );
        }
    }

    results
}

// ── 2. Reference scenarios ──────────────────────────────────────────────

fn validate_scenarios(registry: &ActionRegistry) -> Vec<TestResult> {
    println!("--- Scenarios ---");
    let mut results = Vec::new();

    // Stone axe
    let mut state = GameState::new();
    state.flags.insert(Flag::CaveExplored, true);
    state.tools.insert(Tool::StoneAxe, false);
    state.resources.insert(Resource::Wood, 50.0);
    state.resources.insert(Resource::Stone, 50.0);
    let mut cooldowns = CooldownTracker::new();
    let ok = executor::execute(registry, "craftStoneAxe", &mut state, &mut cooldowns, 0).is_ok();
    results.push(check(
        "scenario_stone_axe",
        ok && state.resource(Resource::Wood) == 40.0
            && state.resource(Resource::Stone) == 40.0
            && state.has_tool(Tool::StoneAxe)
            && state.is_flagged(Flag::VillageUnlocked),
        format!(
            "wood={} stone={} axe={}",
            state.resource(Resource::Wood),
            state.resource(Resource::Stone),
            state.has_tool(Tool::StoneAxe)
        ),
    ));

    // One combat round
    let mut combat = CombatSession::new(
        Enemy::new("Raider", 100.0, 20.0),
        CombatProfile::with_stats(15.0, 10.0, 50.0),
    );
    let mut rng = StdRng::seed_from_u64(0);
    let fought = combat.fight(&mut rng).is_ok();
    results.push(check(
        "scenario_combat_round",
        fought && combat.integrity() == 40.0 && combat.enemy().health == 85.0 && combat.round() == 2,
        format!(
            "integrity={} enemy={} round={}",
            combat.integrity(),
            combat.enemy().health,
            combat.round()
        ),
    ));

    // Thirty idle seconds
    let mut rates = CycleRates::default();
    rates.produce(Resource::Wood, 15.0);
    let wood = idle::accumulate(&rates, sleep::INTENSITY[0], 30.0)
        .get(&Resource::Wood)
        .copied()
        .unwrap_or(0.0);
    results.push(check(
        "scenario_idle_thirty_seconds",
        (wood - 3.0).abs() < 1e-9,
        format!("accumulated wood = {:.3}", wood),
    ));

    // Cooldown
    let mut state = GameState::new();
    state.flags.insert(Flag::CaveExplored, true);
    let mut cooldowns = CooldownTracker::new();
    let first = executor::execute(registry, "chopWood", &mut state, &mut cooldowns, 0).is_ok();
    let early = executor::can_execute(registry, "chopWood", &state, &cooldowns, 3_000);
    let on_time = executor::can_execute(registry, "chopWood", &state, &cooldowns, 5_000);
    results.push(check(
        "scenario_cooldown",
        first && !early && on_time,
        format!("t=0 {} / t=3000 {} / t=5000 {}", first, early, on_time),
    ));

    results
}

// ── 3. Autoplay ─────────────────────────────────────────────────────────

/// Build order the scripted player works through, in order.
const BUILD_ORDER: &[&str] = &[
    "exploreCave",
    "lightFire",
    "craftStoneAxe",
    "buildWoodenHut",
    "craftStonePickaxe",
    "buildWoodenHut",
    "craftTorch",
    "exploreForest",
    "buildWoodenHut",
    "buildPalisade",
    "buildTannery",
];

/// Gathering clicks used while saving up for the next build.
const FILLER: &[&str] = &["chopWood", "gatherStone", "hunt"];

/// Work through the build order once per second, gather by hand while
/// waiting, keep villagers busy, and let production run for two simulated
/// hours.
fn validate_autoplay(verbose: bool) -> Vec<TestResult> {
    println!("--- Autoplay ---");
    let mut results = Vec::new();

    let mut game = match GameSession::bundled(0) {
        Ok(g) => g.with_seed(17),
        Err(e) => {
            results.push(check("autoplay_start", false, e.to_string()));
            return results;
        }
    };

    let roles = [Villager::Gatherer, Villager::StoneMiner, Villager::Hunter];
    let mut step = 0;
    let mut clicks = 0;
    let mut negative_at = None;
    let end = 2 * 3_600_000;
    let mut now = 0;
    let mut next_role = 0;
    while now <= end {
        let goal = BUILD_ORDER.get(step).copied();
        let click = match goal {
            Some(id) if game.can_execute(id, now) => {
                step += 1;
                Some(id)
            }
            _ => FILLER.iter().copied().find(|id| game.can_execute(id, now)),
        };
        if let Some(id) = click {
            if game.execute(id, now).is_ok() {
                clicks += 1;
            }
        }
        if game.assign_villager(roles[next_role % roles.len()]) {
            next_role += 1;
        }
        game.update(now);
        if negative_at.is_none() && !game.state().negative_paths().is_empty() {
            negative_at = Some(now);
        }
        now += 1_000;
    }

    let state = game.state().clone();
    results.push(check(
        "autoplay_no_negative_values",
        negative_at.is_none(),
        match negative_at {
            None => format!("{} clicks, state stayed non-negative", clicks),
            Some(t) => format!("negative value at t={}ms", t),
        },
    ));
    results.push(check(
        "autoplay_build_order_done",
        step == BUILD_ORDER.len(),
        format!("{}/{} build steps", step, BUILD_ORDER.len()),
    ));
    results.push(check(
        "autoplay_reaches_village",
        state.is_flagged(Flag::VillageUnlocked) && state.building_count(Building::WoodenHut) >= 3,
        format!(
            "huts={} population={}",
            state.building_count(Building::WoodenHut),
            state.population()
        ),
    ));

    let log = game.drain_log();
    let mut story: Vec<&str> = log
        .iter()
        .filter(|e| e.id.starts_with("story."))
        .map(|e| e.id.as_str())
        .collect();
    let told = story.len();
    story.sort_unstable();
    story.dedup();
    results.push(check(
        "autoplay_story_once_each",
        told == story.len(),
        format!("{} story beats in {} log entries", told, log.len()),
    ));

    if verbose {
        match serde_json::to_string(&state) {
            Ok(json) => println!("  Final state: {}", json),
            Err(e) => println!("  Final state unavailable: {}", e),
        }
    }

    results
}

// ── 4. Combat ───────────────────────────────────────────────────────────

fn validate_combat(registry: &ActionRegistry, verbose: bool) -> Vec<TestResult> {
    println!("--- Combat ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(2024);

    for encounter in registry.encounters() {
        let mut wins = 0;
        let mut negative = false;
        let mut max_rounds = 0;
        for watchtowers in 0..=3 {
            let mut state = GameState::new();
            state.buildings.insert(Building::Watchtower, watchtowers as f64);
            state.buildings.insert(Building::Palisade, 3.0);
            state.buildings.insert(Building::Bastion, 2.0);
            state.stats.insert(Stat::Luck, rng.gen_range(0..10) as f64);
            state.combat_skills.insert(CombatSkill::CrushingStrike, 1.0);
            state.combat_skills.insert(CombatSkill::BloodflameSphere, 1.0);

            let mut combat = CombatSession::start(encounter, CombatProfile::from_state(&state));
            let _ = combat.use_skill(CombatSkill::CrushingStrike);
            let _ = combat.use_skill(CombatSkill::BloodflameSphere);
            while !combat.is_finished() && combat.round() < 200 {
                if combat.fight(&mut rng).is_err() {
                    break;
                }
                negative |= combat.integrity() < 0.0 || combat.enemy().health < 0.0;
            }
            max_rounds = max_rounds.max(combat.round());
            if combat.result() == Some(CombatResult::Victory) {
                wins += 1;
            }
        }
        results.push(check(
            &format!("combat_{}_bounds", encounter.id),
            !negative,
            format!("{}/4 wins, longest fight {} rounds", wins, max_rounds),
        ));
        if verbose {
            println!(
                "    {:14} hp={:>5} atk={:>3} wins={}/4",
                encounter.id, encounter.enemy.health, encounter.enemy.attack, wins
            );
        }
    }

    results
}

// ── 5. Idle ─────────────────────────────────────────────────────────────

fn validate_idle(verbose: bool) -> Vec<TestResult> {
    println!("--- Idle ---");
    let mut results = Vec::new();

    let mut capped = true;
    let mut deterministic = true;
    for length in 0..sleep::LENGTH_HOURS.len() {
        for intensity in 0..sleep::INTENSITY.len() {
            let mut state = GameState::new();
            state.sleep.insert(SleepUpgrade::Length, length as f64);
            state.sleep.insert(SleepUpgrade::Intensity, intensity as f64);
            state.villagers.insert(Villager::Gatherer, 4.0);
            state.villagers.insert(Villager::Hunter, 2.0);

            let session = IdleSession {
                start_time: 5_000,
                is_active: true,
            };
            let max_secs = sleep::LENGTH_HOURS[length] as f64 * 3600.0;
            let far = 5_000 + 100 * timing::MS_PER_HOUR;
            let a = idle::resume(&session, far, &state);
            let b = idle::resume(&session, far, &state);
            capped &= a.elapsed_capped_secs <= max_secs;
            deterministic &= a == b;

            if verbose && intensity == 0 {
                println!(
                    "    length {} → {:>5}s, wood {:+.1}",
                    length,
                    a.elapsed_capped_secs,
                    a.accumulated.get(&Resource::Wood).copied().unwrap_or(0.0)
                );
            }
        }
    }
    results.push(check(
        "idle_elapsed_capped",
        capped,
        "elapsed never exceeds sleep length",
    ));
    results.push(check(
        "idle_resume_deterministic",
        deterministic,
        "same start/now always yields the same totals",
    ));

    results
}
