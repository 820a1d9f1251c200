//! Bastion stats derived from the village.
//!
//! Combat never reads buildings or equipment directly; it receives a
//! [`CombatProfile`] built here once, when the fight starts.

use serde::{Deserialize, Serialize};

use crate::constants::bastion as tuning;
use crate::state::{Building, CombatSkill, GameState, Relic, Stat, Weapon};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BastionStats {
    pub attack: f64,
    pub defense: f64,
    /// Maximum integrity; combat starts at this value.
    pub integrity: f64,
}

/// Compute attack, defense and integrity from buildings, weapons and stats.
pub fn bastion_stats(state: &GameState) -> BastionStats {
    let watchtowers = state.building_count(Building::Watchtower) as f64;
    let palisades = state.building_count(Building::Palisade) as f64;
    let bastions = state.building_count(Building::Bastion) as f64;

    let mut attack = tuning::BASE_ATTACK
        + watchtowers * tuning::ATTACK_PER_WATCHTOWER
        + state.stat(Stat::Strength).max(0.0) * tuning::ATTACK_PER_STRENGTH;
    if state.has_weapon(Weapon::CrudeBow) {
        attack += tuning::CRUDE_BOW_ATTACK;
    }
    if state.has_weapon(Weapon::IronSword) {
        attack += tuning::IRON_SWORD_ATTACK;
    }

    BastionStats {
        attack,
        defense: tuning::BASE_DEFENSE + palisades * tuning::DEFENSE_PER_PALISADE,
        integrity: tuning::BASE_INTEGRITY
            + bastions * tuning::INTEGRITY_PER_BASTION
            + palisades * tuning::INTEGRITY_PER_PALISADE,
    }
}

/// Critical strike chance from luck, in percent.
pub fn luck_crit_percent(state: &GameState) -> f64 {
    state.stat(Stat::Luck).max(0.0) * tuning::CRIT_PERCENT_PER_LUCK
}

/// Flat critical strike bonus from owned relics, in percent.
pub fn relic_crit_percent(state: &GameState) -> f64 {
    if state.has_relic(Relic::RavensEye) {
        tuning::RAVENS_EYE_CRIT_PERCENT
    } else {
        0.0
    }
}

/// Everything a combat session needs from the State Model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatProfile {
    pub stats: BastionStats,
    pub luck_crit_percent: f64,
    pub bonus_crit_percent: f64,
    pub crushing_strike_level: u32,
    pub bloodflame_level: u32,
}

impl CombatProfile {
    pub fn from_state(state: &GameState) -> Self {
        Self {
            stats: bastion_stats(state),
            luck_crit_percent: luck_crit_percent(state),
            bonus_crit_percent: relic_crit_percent(state),
            crushing_strike_level: state.skill_level(CombatSkill::CrushingStrike),
            bloodflame_level: state.skill_level(CombatSkill::BloodflameSphere),
        }
    }

    /// Profile with fixed stats, no crit chance and no skills.
    pub fn with_stats(attack: f64, defense: f64, integrity: f64) -> Self {
        Self {
            stats: BastionStats {
                attack,
                defense,
                integrity,
            },
            luck_crit_percent: 0.0,
            bonus_crit_percent: 0.0,
            crushing_strike_level: 0,
            bloodflame_level: 0,
        }
    }

    /// Crit probability in `[0, 1]`.
    pub fn crit_chance(&self) -> f64 {
        ((self.luck_crit_percent + self.bonus_crit_percent) / 100.0).clamp(0.0, 1.0)
    }

    pub fn skill_level(&self, skill: CombatSkill) -> u32 {
        match skill {
            CombatSkill::CrushingStrike => self.crushing_strike_level,
            CombatSkill::BloodflameSphere => self.bloodflame_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_bastion() {
        let stats = bastion_stats(&GameState::new());
        assert_eq!(stats.attack, 5.0);
        assert_eq!(stats.defense, 0.0);
        assert_eq!(stats.integrity, 50.0);
    }

    #[test]
    fn test_buildings_and_weapons_stack() {
        let mut state = GameState::new();
        state.buildings.insert(Building::Watchtower, 2.0);
        state.buildings.insert(Building::Palisade, 3.0);
        state.buildings.insert(Building::Bastion, 1.0);
        state.weapons.insert(Weapon::IronSword, true);
        state.stats.insert(Stat::Strength, 1.0);
        let stats = bastion_stats(&state);
        assert_eq!(stats.attack, 5.0 + 16.0 + 2.0 + 10.0);
        assert_eq!(stats.defense, 15.0);
        assert_eq!(stats.integrity, 50.0 + 25.0 + 30.0);
    }

    #[test]
    fn test_crit_chance_from_luck_and_relic() {
        let mut state = GameState::new();
        state.stats.insert(Stat::Luck, 5.0);
        state.relics.insert(Relic::RavensEye, true);
        let profile = CombatProfile::from_state(&state);
        assert!((profile.crit_chance() - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_profile_reads_skill_levels() {
        let mut state = GameState::new();
        state.combat_skills.insert(CombatSkill::BloodflameSphere, 2.0);
        let profile = CombatProfile::from_state(&state);
        assert_eq!(profile.skill_level(CombatSkill::BloodflameSphere), 2);
        assert_eq!(profile.skill_level(CombatSkill::CrushingStrike), 0);
    }
}
