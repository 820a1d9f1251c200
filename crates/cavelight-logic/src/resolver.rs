//! Cost and effect resolution.
//!
//! Registry tables store amounts as tagged values: a literal number or a
//! named [`Formula`] evaluated against the current state. Resolution turns a
//! table into plain numbers for one invocation. Costs are always
//! non-negative magnitudes to subtract; effects are signed deltas, numeric
//! assignments, or boolean literals.
//!
//! Deduction is all-or-nothing: [`deduct`] checks every path before touching
//! any of them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::yields;
use crate::path::StatePath;
use crate::state::{GameState, StateValue, Tool, Weapon};

/// Named pure functions of state that registry data may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Formula {
    /// Wood per chop, by best axe owned.
    ChopWoodYield,
    /// Stone per dig, improved by a pickaxe.
    MineStoneYield,
    /// Food per hunt, improved by a bow.
    HuntFoodYield,
}

impl Formula {
    pub fn evaluate(self, state: &GameState) -> f64 {
        match self {
            Formula::ChopWoodYield => {
                if state.has_tool(Tool::IronAxe) {
                    yields::WOOD_IRON_AXE
                } else if state.has_tool(Tool::StoneAxe) {
                    yields::WOOD_STONE_AXE
                } else {
                    yields::WOOD_BARE_HANDS
                }
            }
            Formula::MineStoneYield => {
                if state.has_tool(Tool::StonePickaxe) {
                    yields::STONE_PICKAXE
                } else {
                    yields::STONE_BARE_HANDS
                }
            }
            Formula::HuntFoodYield => {
                if state.has_weapon(Weapon::CrudeBow) {
                    yields::FOOD_CRUDE_BOW
                } else {
                    yields::FOOD_BARE_HANDS
                }
            }
        }
    }
}

/// A literal number or a formula reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Fixed(f64),
    Computed { formula: Formula },
}

impl Amount {
    pub fn evaluate(&self, state: &GameState) -> f64 {
        match self {
            Amount::Fixed(n) => *n,
            Amount::Computed { formula } => formula.evaluate(state),
        }
    }
}

/// One entry of an effect table as written in registry data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EffectValue {
    /// Overwrite a boolean path.
    Toggle(bool),
    /// Add a signed amount to a numeric path.
    Delta(Amount),
    /// Overwrite a numeric path.
    Assign { set: f64 },
}

/// An effect after formulas are evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedEffect {
    Add(f64),
    Set(StateValue),
}

pub type CostSpec = BTreeMap<StatePath, Amount>;
pub type EffectSpec = BTreeMap<StatePath, EffectValue>;
pub type ResolvedCost = BTreeMap<StatePath, f64>;
pub type ResolvedEffects = BTreeMap<StatePath, ResolvedEffect>;

/// Evaluate a cost table. Formula results below zero resolve to zero.
pub fn resolve_cost(spec: &CostSpec, state: &GameState) -> ResolvedCost {
    spec.iter()
        .map(|(path, amount)| (*path, amount.evaluate(state).max(0.0)))
        .collect()
}

pub fn resolve_effects(spec: &EffectSpec, state: &GameState) -> ResolvedEffects {
    spec.iter()
        .map(|(path, value)| {
            let resolved = match value {
                EffectValue::Toggle(b) => ResolvedEffect::Set(StateValue::Flag(*b)),
                EffectValue::Delta(amount) => ResolvedEffect::Add(amount.evaluate(state)),
                EffectValue::Assign { set } => ResolvedEffect::Set(StateValue::Number(*set)),
            };
            (*path, resolved)
        })
        .collect()
}

/// The first cost path the state cannot pay for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shortfall {
    pub path: StatePath,
    pub required: f64,
    pub available: f64,
}

impl std::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "needs {} of `{}`, has {}",
            self.required, self.path, self.available
        )
    }
}

pub fn first_shortfall(cost: &ResolvedCost, state: &GameState) -> Option<Shortfall> {
    cost.iter().find_map(|(path, &required)| {
        let available = state.number(*path);
        (available < required).then_some(Shortfall {
            path: *path,
            required,
            available,
        })
    })
}

pub fn can_afford(cost: &ResolvedCost, state: &GameState) -> bool {
    first_shortfall(cost, state).is_none()
}

/// Subtract every cost path, or none of them.
pub fn deduct(cost: &ResolvedCost, state: &mut GameState) -> Result<(), Shortfall> {
    if let Some(shortfall) = first_shortfall(cost, state) {
        return Err(shortfall);
    }
    for (path, amount) in cost {
        state.add(*path, -amount);
    }
    Ok(())
}

/// Apply resolved effects. Numeric deltas that would leave a path negative
/// are clamped to zero; the clamped paths are returned so the caller can
/// report the broken invariant.
pub fn apply_effects(effects: &ResolvedEffects, state: &mut GameState) -> Vec<StatePath> {
    let mut clamped = Vec::new();
    for (path, effect) in effects {
        match effect {
            ResolvedEffect::Add(delta) => {
                if state.add(*path, *delta) < 0.0 {
                    state.set_number(*path, 0.0);
                    clamped.push(*path);
                }
            }
            ResolvedEffect::Set(value) => state.set(*path, *value),
        }
    }
    clamped
}

/// Report paths an effect tried to drive negative. Fails loudly in debug
/// builds; release builds keep the clamped value and log it.
pub(crate) fn report_clamped(source: &str, clamped: &[StatePath]) {
    if !clamped.is_empty() {
        log::error!("{} drove {:?} below zero; clamped", source, clamped);
    }
    debug_assert!(
        clamped.is_empty(),
        "{} drove {:?} below zero",
        source,
        clamped
    );
}
