//! Action execution: gate on visibility, affordability and cooldown, then
//! commit cost and effects as one unit.
//!
//! A rejected request is a silent no-op: the caller gets the [`Rejection`]
//! back and neither the state nor the cooldown tracker changes. Accepted
//! requests are staged on a copy of the state and swapped in only once every
//! cost, effect and story flag has been applied.

use serde::{Deserialize, Serialize};

use crate::constants::Millis;
use crate::cooldown::CooldownTracker;
use crate::narrative::LogEntry;
use crate::path::StatePath;
use crate::registry::{ActionDefinition, ActionRegistry};
use crate::resolver::{self, ResolvedCost, Shortfall};
use crate::state::GameState;

/// Why an action did not run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("action is not visible")]
    Hidden,
    #[error("level {level} is past max level {max_level}")]
    LevelExhausted { level: u32, max_level: u32 },
    #[error("{0}")]
    Unaffordable(Shortfall),
    #[error("cooling down until {ready_at}")]
    CoolingDown { ready_at: Millis },
}

/// What a successful execution did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub action_id: String,
    pub level: u32,
    pub cost: ResolvedCost,
    /// Narrative lines emitted by this execution, oldest first.
    pub log: Vec<LogEntry>,
    /// Entries of the action's `unlocks` that became visible just now.
    pub unlocked: Vec<String>,
    pub ready_at: Millis,
}

struct Plan<'a> {
    def: &'a ActionDefinition,
    level: u32,
    cost: ResolvedCost,
}

fn plan<'a>(
    registry: &'a ActionRegistry,
    action_id: &str,
    state: &GameState,
    cooldowns: &CooldownTracker,
    now: Millis,
) -> Result<Plan<'a>, Rejection> {
    let def = registry
        .action(action_id)
        .ok_or_else(|| Rejection::UnknownAction(action_id.to_string()))?;

    if !def.is_visible(state) {
        return Err(Rejection::Hidden);
    }

    let level = def.level_for(state);
    let cost = def
        .cost_at(level, state)
        .ok_or(Rejection::LevelExhausted {
            level,
            max_level: def.max_level,
        })?;

    if let Some(shortfall) = resolver::first_shortfall(&cost, state) {
        return Err(Rejection::Unaffordable(shortfall));
    }

    if !cooldowns.is_ready(action_id, now) {
        return Err(Rejection::CoolingDown {
            ready_at: cooldowns.ready_at(action_id).unwrap_or(now),
        });
    }

    Ok(Plan { def, level, cost })
}

/// Check every precondition without running anything.
pub fn check(
    registry: &ActionRegistry,
    action_id: &str,
    state: &GameState,
    cooldowns: &CooldownTracker,
    now: Millis,
) -> Result<(), Rejection> {
    plan(registry, action_id, state, cooldowns, now).map(|_| ())
}

/// True iff `show_when` holds, every cost is affordable, and the cooldown
/// has expired.
pub fn can_execute(
    registry: &ActionRegistry,
    action_id: &str,
    state: &GameState,
    cooldowns: &CooldownTracker,
    now: Millis,
) -> bool {
    check(registry, action_id, state, cooldowns, now).is_ok()
}

/// Run an action. On rejection nothing is mutated.
pub fn execute(
    registry: &ActionRegistry,
    action_id: &str,
    state: &mut GameState,
    cooldowns: &mut CooldownTracker,
    now: Millis,
) -> Result<Execution, Rejection> {
    let Plan { def, level, cost } = match plan(registry, action_id, state, cooldowns, now) {
        Ok(plan) => plan,
        Err(rejection) => {
            log::debug!("Skipped action {}: {}", action_id, rejection);
            return Err(rejection);
        }
    };

    let mut staged = state.clone();
    resolver::deduct(&cost, &mut staged).map_err(Rejection::Unaffordable)?;

    // Formulas see the state as it was when the player clicked
    let effects = def.effects_at(level, state).unwrap_or_default();
    let clamped = resolver::apply_effects(&effects, &mut staged);
    resolver::report_clamped(action_id, &clamped);

    let mut log_entries = Vec::new();
    if let Some(beat) = &def.story {
        let seen = StatePath::Story(beat.seen);
        if !staged.flag(seen) {
            staged.set_flag(seen, true);
            log_entries.push(LogEntry::new(
                seen.to_string(),
                beat.message.clone(),
                now,
                beat.category,
            ));
        }
    }

    let unlocked = def
        .unlocks
        .iter()
        .filter(|id| {
            registry
                .action(id)
                .map_or(false, |d| !d.is_visible(state) && d.is_visible(&staged))
        })
        .cloned()
        .collect();

    *state = staged;
    cooldowns.mark_used(action_id, now, def.cooldown_secs);

    log::debug!("Executed action {} at level {}", action_id, level);

    Ok(Execution {
        action_id: action_id.to_string(),
        level,
        cost,
        log: log_entries,
        unlocked,
        ready_at: cooldowns.ready_at(action_id).unwrap_or(now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Building, Flag, Resource, Story, Tool, Villager};

    fn registry() -> ActionRegistry {
        ActionRegistry::bundled().unwrap()
    }

    fn cave_state() -> GameState {
        let mut state = GameState::new();
        state.flags.insert(Flag::CaveExplored, true);
        state.tools.insert(Tool::StoneAxe, false);
        state.resources.insert(Resource::Wood, 50.0);
        state.resources.insert(Resource::Stone, 50.0);
        state
    }

    #[test]
    fn test_craft_stone_axe() {
        let registry = registry();
        let mut state = cave_state();
        let mut cooldowns = CooldownTracker::new();

        let result = execute(&registry, "craftStoneAxe", &mut state, &mut cooldowns, 0).unwrap();
        assert_eq!(state.resource(Resource::Wood), 40.0);
        assert_eq!(state.resource(Resource::Stone), 40.0);
        assert!(state.has_tool(Tool::StoneAxe));
        assert!(state.is_flagged(Flag::VillageUnlocked));
        assert_eq!(result.level, 1);
        assert!(result.unlocked.contains(&"buildWoodenHut".to_string()));
    }

    #[test]
    fn test_story_fires_once() {
        let registry = registry();
        let mut state = cave_state();
        let mut cooldowns = CooldownTracker::new();

        let first = execute(&registry, "craftStoneAxe", &mut state, &mut cooldowns, 0).unwrap();
        assert_eq!(first.log.len(), 1);
        assert_eq!(first.log[0].id, "story.seen.villageUnlocked");
        assert!(state.story_seen(Story::VillageUnlocked));

        // The hut's own beat fires on the first build only
        state.resources.insert(Resource::Wood, 1000.0);
        state.resources.insert(Resource::Stone, 1000.0);
        let hut1 = execute(&registry, "buildWoodenHut", &mut state, &mut cooldowns, 10).unwrap();
        let hut2 = execute(&registry, "buildWoodenHut", &mut state, &mut cooldowns, 20).unwrap();
        assert_eq!(hut1.log.len(), 1);
        assert!(hut2.log.is_empty());
        assert_eq!(state.building_count(Building::WoodenHut), 2);
        assert_eq!(state.villagers_in(Villager::Free), 4.0);
    }

    #[test]
    fn test_rejection_leaves_state_untouched() {
        let registry = registry();
        let mut state = cave_state();
        state.resources.insert(Resource::Stone, 9.0);
        let mut cooldowns = CooldownTracker::new();
        let before = state.clone();

        let err = execute(&registry, "craftStoneAxe", &mut state, &mut cooldowns, 0).unwrap_err();
        assert!(matches!(err, Rejection::Unaffordable(s) if s.path == StatePath::Resource(Resource::Stone)));
        assert_eq!(state, before);
        assert!(cooldowns.is_empty());
    }

    #[test]
    fn test_hidden_action_rejected() {
        let registry = registry();
        let mut state = GameState::new();
        state.resources.insert(Resource::Wood, 100.0);
        let mut cooldowns = CooldownTracker::new();
        assert_eq!(
            execute(&registry, "craftStoneAxe", &mut state, &mut cooldowns, 0),
            Err(Rejection::Hidden)
        );
    }

    #[test]
    fn test_unknown_action_rejected() {
        let registry = registry();
        let mut state = GameState::new();
        let mut cooldowns = CooldownTracker::new();
        assert!(matches!(
            execute(&registry, "summonDragon", &mut state, &mut cooldowns, 0),
            Err(Rejection::UnknownAction(_))
        ));
    }

    #[test]
    fn test_cooldown_gates_repeat() {
        let registry = registry();
        let mut state = cave_state();
        let mut cooldowns = CooldownTracker::new();

        let chop = execute(&registry, "chopWood", &mut state, &mut cooldowns, 0).unwrap();
        assert_eq!(chop.ready_at, 5000);
        assert!(!can_execute(&registry, "chopWood", &state, &cooldowns, 3000));
        assert!(matches!(
            execute(&registry, "chopWood", &mut state, &mut cooldowns, 3000),
            Err(Rejection::CoolingDown { ready_at: 5000 })
        ));
        assert!(can_execute(&registry, "chopWood", &state, &cooldowns, 5000));
    }

    #[test]
    fn test_formula_effect_uses_tools() {
        let registry = registry();
        let mut state = cave_state();
        state.tools.insert(Tool::StoneAxe, true);
        let mut cooldowns = CooldownTracker::new();
        execute(&registry, "chopWood", &mut state, &mut cooldowns, 0).unwrap();
        assert_eq!(state.resource(Resource::Wood), 55.0);
    }

    #[test]
    fn test_maxed_building_is_exhausted() {
        let registry = registry();
        let mut state = GameState::new();
        state.buildings.insert(Building::WoodenHut, 3.0);
        state.buildings.insert(Building::Forge, 1.0);
        state.resources.insert(Resource::Wood, 10_000.0);
        state.resources.insert(Resource::Stone, 10_000.0);
        let cooldowns = CooldownTracker::new();
        assert_eq!(
            check(&registry, "buildForge", &state, &cooldowns, 0),
            Err(Rejection::LevelExhausted {
                level: 2,
                max_level: 1
            })
        );
    }
}
