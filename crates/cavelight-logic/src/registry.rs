//! Action registry: the immutable catalogue of actions, combat items and
//! encounters.
//!
//! Content lives in `data/actions.json` and is parsed once at startup. The
//! loader turns every dotted path into a [`StatePath`], expands per-level
//! cost and effect tables, and rejects anything the engine could not resolve
//! later: unknown paths, missing levels, value-kind mismatches, negative
//! costs, unknown unlock targets, ownership flags reset to false. After
//! [`ActionRegistry::from_json`] succeeds, resolution during play cannot hit
//! a configuration error.
//!
//! ```
//! use cavelight_logic::registry::ActionRegistry;
//!
//! let registry = ActionRegistry::bundled().expect("bundled registry is valid");
//! assert!(registry.action("craftStoneAxe").is_some());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::conditions::{self, Conditions};
use crate::constants::{timing, Millis, DEFAULT_LEVEL};
use crate::narrative::LogCategory;
use crate::path::StatePath;
use crate::resolver::{
    self, Amount, CostSpec, EffectSpec, EffectValue, ResolvedCost, ResolvedEffects,
};
use crate::state::{GameState, Story, ValueKind};

const BUNDLED_REGISTRY: &str = include_str!("../../../data/actions.json");

/// A narrative line fired the first time its story flag is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoryBeat {
    pub seen: Story,
    pub message: String,
    #[serde(default)]
    pub category: LogCategory,
}

/// One player-invocable action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDefinition {
    pub id: String,
    pub label: String,
    pub show_when: Conditions,
    /// Numeric path whose value + 1 is the action's current level.
    pub level_from: Option<StatePath>,
    pub max_level: u32,
    /// Cost table for every level in `1..=max_level`.
    pub costs: BTreeMap<u32, CostSpec>,
    /// Effect table for every level in `1..=max_level`.
    pub effects: BTreeMap<u32, EffectSpec>,
    /// Actions this one makes reachable. Informational only.
    pub unlocks: Vec<String>,
    pub cooldown_secs: f64,
    pub story: Option<StoryBeat>,
}

impl ActionDefinition {
    /// Level the next invocation would run at.
    pub fn level_for(&self, state: &GameState) -> u32 {
        match self.level_from {
            Some(path) => (state.number(path).max(0.0) as u32).saturating_add(1),
            None => DEFAULT_LEVEL,
        }
    }

    /// True once every defined level has been purchased.
    pub fn is_maxed(&self, state: &GameState) -> bool {
        self.level_for(state) > self.max_level
    }

    pub fn is_visible(&self, state: &GameState) -> bool {
        conditions::is_satisfied(&self.show_when, state)
    }

    pub fn cost_at(&self, level: u32, state: &GameState) -> Option<ResolvedCost> {
        self.costs
            .get(&level)
            .map(|spec| resolver::resolve_cost(spec, state))
    }

    pub fn effects_at(&self, level: u32, state: &GameState) -> Option<ResolvedEffects> {
        self.effects
            .get(&level)
            .map(|spec| resolver::resolve_effects(spec, state))
    }

    pub fn cooldown_ms(&self) -> Millis {
        (self.cooldown_secs * timing::MS_PER_SEC).round() as Millis
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Damages the enemy as soon as it is used.
    Instant,
    /// Arms bonus damage applied on every following round.
    Poison,
}

/// A consumable usable during combat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombatItemDef {
    pub id: String,
    pub label: String,
    /// Paid from the State Model each time the item is used.
    pub cost: CostSpec,
    pub damage: f64,
    pub kind: ItemKind,
    pub per_round: u32,
    pub per_combat: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnemySpec {
    pub name: String,
    pub health: f64,
    pub attack: f64,
}

/// A fight the player can start, with what it pays out or takes away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncounterDef {
    pub id: String,
    pub enemy: EnemySpec,
    #[serde(default)]
    pub show_when: Conditions,
    #[serde(default)]
    pub on_victory: EffectSpec,
    #[serde(default)]
    pub on_defeat: EffectSpec,
    #[serde(default)]
    pub story: Option<StoryBeat>,
}

/// Configuration error found while loading a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to parse registry: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },
    #[error("action `{action}` has no {table} table for level {level}")]
    MissingLevel {
        action: String,
        table: &'static str,
        level: u32,
    },
    #[error("action `{action}` defines {table} for level {level} beyond max_level {max}")]
    UndeclaredLevel {
        action: String,
        table: &'static str,
        level: u32,
        max: u32,
    },
    #[error("action `{action}` sets both flat and per-level {table}")]
    ConflictingTables { action: String, table: &'static str },
    #[error("action `{action}` declares max_level {max} without level_from")]
    LevelsWithoutSource { action: String, max: u32 },
    #[error("`{owner}`: path `{path}` expects a {expected:?} value, got {found:?}")]
    KindMismatch {
        owner: String,
        path: StatePath,
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("`{owner}`: amount for `{path}` must be a finite non-negative number, got {amount}")]
    InvalidAmount {
        owner: String,
        path: StatePath,
        amount: f64,
    },
    #[error("`{owner}`: ownership flag `{path}` cannot be reset to false")]
    OwnershipReset { owner: String, path: StatePath },
    #[error("action `{action}` has invalid cooldown {cooldown}")]
    InvalidCooldown { action: String, cooldown: f64 },
    #[error("action `{action}` unlocks unknown action `{target}`")]
    UnknownUnlock { action: String, target: String },
    #[error("combat item `{item}` has invalid caps (per_round {per_round}, per_combat {per_combat})")]
    InvalidItemCaps {
        item: String,
        per_round: u32,
        per_combat: u32,
    },
    #[error("`{owner}`: {field} must be a finite positive number, got {value}")]
    InvalidNumber {
        owner: String,
        field: &'static str,
        value: f64,
    },
}

/// Registry file layout as written on disk.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    actions: Vec<RawAction>,
    #[serde(default)]
    combat_items: Vec<CombatItemDef>,
    #[serde(default)]
    encounters: Vec<EncounterDef>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAction {
    id: String,
    label: Option<String>,
    #[serde(default)]
    show_when: Conditions,
    level_from: Option<StatePath>,
    max_level: Option<u32>,
    cost: Option<CostSpec>,
    cost_levels: Option<BTreeMap<u32, CostSpec>>,
    effects: Option<EffectSpec>,
    effect_levels: Option<BTreeMap<u32, EffectSpec>>,
    #[serde(default)]
    unlocks: Vec<String>,
    #[serde(default)]
    cooldown: f64,
    story: Option<StoryBeat>,
}

/// Validated, read-only catalogue of game content.
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    actions: BTreeMap<String, ActionDefinition>,
    /// Action ids in file order, for stable UI listings.
    order: Vec<String>,
    items: BTreeMap<String, CombatItemDef>,
    encounters: BTreeMap<String, EncounterDef>,
}

impl ActionRegistry {
    /// Load the registry shipped with the crate.
    pub fn bundled() -> Result<Self, RegistryError> {
        Self::from_json(BUNDLED_REGISTRY)
    }

    /// Parse and validate a registry document.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(json)?;

        let mut actions = BTreeMap::new();
        let mut order = Vec::with_capacity(file.actions.len());
        for raw in file.actions {
            let def = build_action(raw)?;
            if actions.contains_key(&def.id) {
                return Err(RegistryError::DuplicateId {
                    kind: "action",
                    id: def.id,
                });
            }
            order.push(def.id.clone());
            actions.insert(def.id.clone(), def);
        }

        for def in actions.values() {
            if let Some(target) = def.unlocks.iter().find(|t| !actions.contains_key(*t)) {
                return Err(RegistryError::UnknownUnlock {
                    action: def.id.clone(),
                    target: target.clone(),
                });
            }
        }

        let mut items = BTreeMap::new();
        for item in file.combat_items {
            validate_item(&item)?;
            if items.contains_key(&item.id) {
                return Err(RegistryError::DuplicateId {
                    kind: "combat item",
                    id: item.id,
                });
            }
            items.insert(item.id.clone(), item);
        }

        let mut encounters = BTreeMap::new();
        for encounter in file.encounters {
            validate_encounter(&encounter)?;
            if encounters.contains_key(&encounter.id) {
                return Err(RegistryError::DuplicateId {
                    kind: "encounter",
                    id: encounter.id,
                });
            }
            encounters.insert(encounter.id.clone(), encounter);
        }

        log::debug!(
            "Loaded registry: {} actions, {} combat items, {} encounters",
            actions.len(),
            items.len(),
            encounters.len()
        );

        Ok(Self {
            actions,
            order,
            items,
            encounters,
        })
    }

    pub fn action(&self, id: &str) -> Option<&ActionDefinition> {
        self.actions.get(id)
    }

    /// All actions in file order.
    pub fn actions(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.order.iter().filter_map(|id| self.actions.get(id))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Actions whose `show_when` currently holds and that still have a
    /// level left to buy.
    pub fn visible_actions<'a>(
        &'a self,
        state: &'a GameState,
    ) -> impl Iterator<Item = &'a ActionDefinition> + 'a {
        self.actions()
            .filter(move |def| def.is_visible(state) && !def.is_maxed(state))
    }

    /// Cost to run `action_id` at `level`. `None` for an unknown action or a
    /// level past `max_level`.
    pub fn resolve_cost(
        &self,
        action_id: &str,
        level: u32,
        state: &GameState,
    ) -> Option<ResolvedCost> {
        self.action(action_id)?.cost_at(level, state)
    }

    pub fn resolve_effects(
        &self,
        action_id: &str,
        level: u32,
        state: &GameState,
    ) -> Option<ResolvedEffects> {
        self.action(action_id)?.effects_at(level, state)
    }

    pub fn item(&self, id: &str) -> Option<&CombatItemDef> {
        self.items.get(id)
    }

    pub fn items(&self) -> impl Iterator<Item = &CombatItemDef> {
        self.items.values()
    }

    pub fn encounter(&self, id: &str) -> Option<&EncounterDef> {
        self.encounters.get(id)
    }

    pub fn encounters(&self) -> impl Iterator<Item = &EncounterDef> {
        self.encounters.values()
    }
}

// ── Loading & validation ───────────────────────────────────────────────

fn build_action(raw: RawAction) -> Result<ActionDefinition, RegistryError> {
    let id = raw.id;

    let max_level = raw.max_level.unwrap_or(DEFAULT_LEVEL);
    if raw.level_from.is_none() && max_level != DEFAULT_LEVEL {
        return Err(RegistryError::LevelsWithoutSource {
            action: id,
            max: max_level,
        });
    }
    if max_level == 0 {
        return Err(RegistryError::InvalidNumber {
            owner: id,
            field: "max_level",
            value: 0.0,
        });
    }
    if let Some(path) = raw.level_from {
        expect_kind(&id, path, ValueKind::Number)?;
    }

    if !raw.cooldown.is_finite() || raw.cooldown < 0.0 {
        return Err(RegistryError::InvalidCooldown {
            action: id,
            cooldown: raw.cooldown,
        });
    }

    validate_conditions(&id, &raw.show_when)?;

    let costs = expand_levels(&id, "cost", raw.cost, raw.cost_levels, max_level)?;
    for spec in costs.values() {
        validate_cost(&id, spec)?;
    }
    let effects = expand_levels(&id, "effects", raw.effects, raw.effect_levels, max_level)?;
    for spec in effects.values() {
        validate_effects(&id, spec)?;
    }

    Ok(ActionDefinition {
        label: raw.label.unwrap_or_else(|| id.clone()),
        id,
        show_when: raw.show_when,
        level_from: raw.level_from,
        max_level,
        costs,
        effects,
        unlocks: raw.unlocks,
        cooldown_secs: raw.cooldown,
        story: raw.story,
    })
}

/// Produce one table per level in `1..=max_level` from either a flat table
/// (shared by every level) or an explicit per-level map.
fn expand_levels<T: Clone + Default>(
    action: &str,
    table: &'static str,
    flat: Option<T>,
    leveled: Option<BTreeMap<u32, T>>,
    max_level: u32,
) -> Result<BTreeMap<u32, T>, RegistryError> {
    match (flat, leveled) {
        (Some(_), Some(_)) => Err(RegistryError::ConflictingTables {
            action: action.to_string(),
            table,
        }),
        (Some(spec), None) => Ok((1..=max_level).map(|l| (l, spec.clone())).collect()),
        (None, None) => Ok((1..=max_level).map(|l| (l, T::default())).collect()),
        (None, Some(levels)) => {
            if let Some(&extra) = levels.keys().find(|&&l| l == 0 || l > max_level) {
                return Err(RegistryError::UndeclaredLevel {
                    action: action.to_string(),
                    table,
                    level: extra,
                    max: max_level,
                });
            }
            if let Some(missing) = (1..=max_level).find(|l| !levels.contains_key(l)) {
                return Err(RegistryError::MissingLevel {
                    action: action.to_string(),
                    table,
                    level: missing,
                });
            }
            Ok(levels)
        }
    }
}

/// `found` is the kind of value the content supplies for `path`.
fn expect_kind(owner: &str, path: StatePath, found: ValueKind) -> Result<(), RegistryError> {
    if path.kind() == found {
        Ok(())
    } else {
        Err(RegistryError::KindMismatch {
            owner: owner.to_string(),
            path,
            expected: path.kind(),
            found,
        })
    }
}

fn validate_conditions(owner: &str, conditions: &Conditions) -> Result<(), RegistryError> {
    for (path, requirement) in conditions {
        expect_kind(owner, *path, requirement.kind())?;
    }
    Ok(())
}

fn validate_cost(owner: &str, spec: &CostSpec) -> Result<(), RegistryError> {
    for (path, amount) in spec {
        expect_kind(owner, *path, ValueKind::Number)?;
        if let Amount::Fixed(n) = amount {
            if !n.is_finite() || *n < 0.0 {
                return Err(RegistryError::InvalidAmount {
                    owner: owner.to_string(),
                    path: *path,
                    amount: *n,
                });
            }
        }
    }
    Ok(())
}

fn validate_effects(owner: &str, spec: &EffectSpec) -> Result<(), RegistryError> {
    for (path, value) in spec {
        match value {
            EffectValue::Toggle(b) => {
                expect_kind(owner, *path, ValueKind::Flag)?;
                if !b && path.is_ownership() {
                    return Err(RegistryError::OwnershipReset {
                        owner: owner.to_string(),
                        path: *path,
                    });
                }
            }
            EffectValue::Delta(amount) => {
                expect_kind(owner, *path, ValueKind::Number)?;
                if let Amount::Fixed(n) = amount {
                    if !n.is_finite() {
                        return Err(RegistryError::InvalidAmount {
                            owner: owner.to_string(),
                            path: *path,
                            amount: *n,
                        });
                    }
                }
            }
            EffectValue::Assign { set } => {
                expect_kind(owner, *path, ValueKind::Number)?;
                if !set.is_finite() || *set < 0.0 {
                    return Err(RegistryError::InvalidAmount {
                        owner: owner.to_string(),
                        path: *path,
                        amount: *set,
                    });
                }
            }
        }
    }
    Ok(())
}

fn validate_item(item: &CombatItemDef) -> Result<(), RegistryError> {
    if item.per_round == 0 || item.per_combat < item.per_round {
        return Err(RegistryError::InvalidItemCaps {
            item: item.id.clone(),
            per_round: item.per_round,
            per_combat: item.per_combat,
        });
    }
    if !item.damage.is_finite() || item.damage <= 0.0 {
        return Err(RegistryError::InvalidNumber {
            owner: item.id.clone(),
            field: "damage",
            value: item.damage,
        });
    }
    validate_cost(&item.id, &item.cost)
}

fn validate_encounter(encounter: &EncounterDef) -> Result<(), RegistryError> {
    let enemy = &encounter.enemy;
    if !enemy.health.is_finite() || enemy.health <= 0.0 {
        return Err(RegistryError::InvalidNumber {
            owner: encounter.id.clone(),
            field: "enemy.health",
            value: enemy.health,
        });
    }
    if !enemy.attack.is_finite() || enemy.attack < 0.0 {
        return Err(RegistryError::InvalidNumber {
            owner: encounter.id.clone(),
            field: "enemy.attack",
            value: enemy.attack,
        });
    }
    validate_conditions(&encounter.id, &encounter.show_when)?;
    validate_effects(&encounter.id, &encounter.on_victory)?;
    validate_effects(&encounter.id, &encounter.on_defeat)
}
