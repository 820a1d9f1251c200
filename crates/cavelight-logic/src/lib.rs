//! Pure rule-engine logic for Cavelight.
//!
//! Everything here is deterministic given its inputs: functions take the
//! game state, the action registry and an explicit `now`, and return results
//! or typed rejections. Randomness only enters through a caller-supplied
//! `rand::Rng`, so every rule is unit-testable without a clock or a store.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`bastion`] | Attack, defense, integrity and crit chance derived from the village |
//! | [`combat`] | Turn-based combat sessions: items, skills, fight rounds |
//! | [`conditions`] | `show_when` requirement evaluation |
//! | [`constants`] | Cycle timing, sleep tables, production and combat numbers |
//! | [`cooldown`] | Per-action "ready at" instants |
//! | [`executor`] | Gated, all-or-nothing action execution |
//! | [`idle`] | Sleep-mode progress derived from the session start time |
//! | [`narrative`] | Log entries emitted for the narrative panel |
//! | [`path`] | Typed dotted paths into the game state |
//! | [`production`] | Per-cycle village output, upkeep and villager roles |
//! | [`registry`] | Action, combat item and encounter definitions loaded from JSON |
//! | [`resolver`] | Cost/effect resolution, affordability and application |
//! | [`state`] | The namespaced game state aggregate |

pub mod bastion;
pub mod combat;
pub mod conditions;
pub mod constants;
pub mod cooldown;
pub mod executor;
pub mod idle;
pub mod narrative;
pub mod path;
pub mod production;
pub mod registry;
pub mod resolver;
pub mod state;
