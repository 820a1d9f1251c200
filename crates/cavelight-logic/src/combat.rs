//! Turn-based combat between the bastion and one enemy.
//!
//! A [`CombatSession`] is ephemeral: it snapshots the enemy and the
//! bastion's [`CombatProfile`] when it starts and touches the State Model
//! only to pay for items and, once, when it is closed. Between those points
//! the player may use items and skills and advance the fight one round at a
//! time.
//!
//! Round order is fixed:
//! 1. crit roll against luck plus relic bonus
//! 2. poison bonus
//! 3. burn bonus, burn counter decrements
//! 4. enemy attack unless stunned; defeat ends the round
//! 5. bastion attack; victory at zero enemy health
//! 6. otherwise the round advances and per-round item limits reset
//!
//! Once the session reaches [`CombatResult::Victory`] or
//! [`CombatResult::Defeat`] every further call is rejected.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bastion::CombatProfile;
use crate::constants::{combat as tuning, Millis};
use crate::narrative::{LogCategory, LogEntry};
use crate::path::StatePath;
use crate::registry::{ActionRegistry, EncounterDef, ItemKind, StoryBeat};
use crate::resolver::{self, EffectSpec, Shortfall};
use crate::state::{CombatSkill, GameState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombatResult {
    Victory,
    Defeat,
}

impl CombatResult {
    pub fn key(self) -> &'static str {
        match self {
            Self::Victory => "victory",
            Self::Defeat => "defeat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub name: String,
    pub health: f64,
    pub max_health: f64,
    pub attack: f64,
}

impl Enemy {
    pub fn new(name: impl Into<String>, health: f64, attack: f64) -> Self {
        let health = health.max(0.0);
        Self {
            name: name.into(),
            health,
            max_health: health,
            attack: attack.max(0.0),
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    fn take(&mut self, damage: f64) {
        self.health = (self.health - damage.max(0.0)).max(0.0);
    }
}

/// Why a combat request was refused. The session is unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CombatRejection {
    #[error("combat is already over")]
    Finished,
    #[error("unknown combat item `{0}`")]
    UnknownItem(String),
    #[error("`{item}` already used {limit} time(s) this round")]
    RoundLimit { item: String, limit: u32 },
    #[error("`{item}` already used {limit} time(s) this combat")]
    CombatLimit { item: String, limit: u32 },
    #[error("{0}")]
    Unaffordable(Shortfall),
    #[error("{0:?} is not learned")]
    SkillNotLearned(CombatSkill),
    #[error("{0:?} was already used this combat")]
    SkillSpent(CombatSkill),
    #[error("needs more than {required} integrity, has {available}")]
    NotEnoughIntegrity { required: f64, available: f64 },
}

/// What one call to [`CombatSession::fight`] did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u32,
    pub crit: bool,
    pub stunned: bool,
    /// Damage the enemy dealt to integrity.
    pub damage_taken: f64,
    /// Total damage the bastion dealt, bonuses included. Zero on defeat.
    pub damage_dealt: f64,
    pub poison_bonus: f64,
    pub burn_bonus: f64,
    pub result: Option<CombatResult>,
}

/// Effects committed when a finished session is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatOutcome {
    pub result: CombatResult,
    pub log: Vec<LogEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatSession {
    encounter_id: Option<String>,
    enemy: Enemy,
    profile: CombatProfile,
    integrity: f64,
    max_integrity: f64,
    round: u32,
    used_this_round: BTreeMap<String, u32>,
    used_this_combat: BTreeMap<String, u32>,
    skills_used: BTreeSet<CombatSkill>,
    stun_rounds: u32,
    burn_rounds: u32,
    burn_damage: f64,
    poison_damage: f64,
    result: Option<CombatResult>,
    on_victory: EffectSpec,
    on_defeat: EffectSpec,
    story: Option<StoryBeat>,
}

impl CombatSession {
    /// Start a fight against a bare enemy with no rewards or penalties.
    pub fn new(enemy: Enemy, profile: CombatProfile) -> Self {
        let max_integrity = profile.stats.integrity.max(0.0);
        Self {
            encounter_id: None,
            enemy,
            profile,
            integrity: max_integrity,
            max_integrity,
            round: 1,
            used_this_round: BTreeMap::new(),
            used_this_combat: BTreeMap::new(),
            skills_used: BTreeSet::new(),
            stun_rounds: 0,
            burn_rounds: 0,
            burn_damage: 0.0,
            poison_damage: 0.0,
            result: None,
            on_victory: EffectSpec::new(),
            on_defeat: EffectSpec::new(),
            story: None,
        }
    }

    /// Start a registry encounter. Its outcome tables are captured now and
    /// committed by [`CombatSession::close`].
    pub fn start(encounter: &EncounterDef, profile: CombatProfile) -> Self {
        let enemy = Enemy::new(
            encounter.enemy.name.clone(),
            encounter.enemy.health,
            encounter.enemy.attack,
        );
        log::info!(
            "Combat started: {} ({} hp) vs bastion ({} integrity)",
            enemy.name,
            enemy.health,
            profile.stats.integrity
        );
        Self {
            encounter_id: Some(encounter.id.clone()),
            on_victory: encounter.on_victory.clone(),
            on_defeat: encounter.on_defeat.clone(),
            story: encounter.story.clone(),
            ..Self::new(enemy, profile)
        }
    }

    pub fn encounter_id(&self) -> Option<&str> {
        self.encounter_id.as_deref()
    }

    pub fn enemy(&self) -> &Enemy {
        &self.enemy
    }

    pub fn profile(&self) -> &CombatProfile {
        &self.profile
    }

    pub fn integrity(&self) -> f64 {
        self.integrity
    }

    pub fn max_integrity(&self) -> f64 {
        self.max_integrity
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn stun_rounds(&self) -> u32 {
        self.stun_rounds
    }

    pub fn burn_rounds(&self) -> u32 {
        self.burn_rounds
    }

    pub fn burn_damage(&self) -> f64 {
        self.burn_damage
    }

    pub fn poison_damage(&self) -> f64 {
        self.poison_damage
    }

    pub fn result(&self) -> Option<CombatResult> {
        self.result
    }

    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    pub fn skill_used(&self, skill: CombatSkill) -> bool {
        self.skills_used.contains(&skill)
    }

    /// Times `item_id` has been used this round and this combat.
    pub fn item_uses(&self, item_id: &str) -> (u32, u32) {
        (
            self.used_this_round.get(item_id).copied().unwrap_or(0),
            self.used_this_combat.get(item_id).copied().unwrap_or(0),
        )
    }

    fn ensure_running(&self) -> Result<(), CombatRejection> {
        if self.is_finished() {
            Err(CombatRejection::Finished)
        } else {
            Ok(())
        }
    }

    fn hit_enemy(&mut self, damage: f64) {
        self.enemy.take(damage);
        if self.enemy.is_dead() {
            self.result = Some(CombatResult::Victory);
        }
    }

    // ── Items ──────────────────────────────────────────────────────────

    /// Use a combat item, paying its cost from `state`. Returns the damage
    /// dealt immediately (zero for poison, which applies on later rounds).
    pub fn use_item(
        &mut self,
        registry: &ActionRegistry,
        item_id: &str,
        state: &mut GameState,
    ) -> Result<f64, CombatRejection> {
        self.ensure_running()?;
        let item = registry
            .item(item_id)
            .ok_or_else(|| CombatRejection::UnknownItem(item_id.to_string()))?;

        let (this_round, this_combat) = self.item_uses(item_id);
        if this_round >= item.per_round {
            return Err(CombatRejection::RoundLimit {
                item: item_id.to_string(),
                limit: item.per_round,
            });
        }
        if this_combat >= item.per_combat {
            return Err(CombatRejection::CombatLimit {
                item: item_id.to_string(),
                limit: item.per_combat,
            });
        }

        let cost = resolver::resolve_cost(&item.cost, state);
        resolver::deduct(&cost, state).map_err(CombatRejection::Unaffordable)?;

        *self.used_this_round.entry(item_id.to_string()).or_insert(0) += 1;
        *self.used_this_combat.entry(item_id.to_string()).or_insert(0) += 1;

        let dealt = match item.kind {
            ItemKind::Instant => {
                let before = self.enemy.health;
                self.hit_enemy(item.damage);
                before - self.enemy.health
            }
            ItemKind::Poison => {
                // Poison arms once; repeated doses do not stack
                self.poison_damage = self.poison_damage.max(item.damage);
                0.0
            }
        };
        log::debug!("Used {} in round {} for {} damage", item_id, self.round, dealt);
        Ok(dealt)
    }

    // ── Skills ─────────────────────────────────────────────────────────

    /// Use a learned combat skill once. Returns the damage dealt.
    pub fn use_skill(&mut self, skill: CombatSkill) -> Result<f64, CombatRejection> {
        self.ensure_running()?;
        let level = self.profile.skill_level(skill);
        if level == 0 {
            return Err(CombatRejection::SkillNotLearned(skill));
        }
        if self.skills_used.contains(&skill) {
            return Err(CombatRejection::SkillSpent(skill));
        }
        let integrity_cost = skill_integrity_cost(skill);
        if self.integrity <= integrity_cost {
            return Err(CombatRejection::NotEnoughIntegrity {
                required: integrity_cost,
                available: self.integrity,
            });
        }

        self.skills_used.insert(skill);
        self.integrity -= integrity_cost;
        let damage = skill_damage(skill, level);
        match skill {
            CombatSkill::CrushingStrike => {
                self.stun_rounds = self.stun_rounds.max(tuning::CRUSHING_STRIKE_STUN_ROUNDS);
            }
            CombatSkill::BloodflameSphere => {
                self.burn_rounds = tuning::BLOODFLAME_BURN_ROUNDS;
                self.burn_damage = level as f64 * tuning::BLOODFLAME_BURN_PER_LEVEL;
            }
        }

        let before = self.enemy.health;
        self.hit_enemy(damage);
        log::debug!("Used {:?} (level {}) in round {}", skill, level, self.round);
        Ok(before - self.enemy.health)
    }

    // ── Rounds ─────────────────────────────────────────────────────────

    /// Resolve one round.
    pub fn fight<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<RoundReport, CombatRejection> {
        self.ensure_running()?;
        let round = self.round;

        let crit = rng.gen::<f64>() < self.profile.crit_chance();
        let poison_bonus = self.poison_damage;
        let burn_bonus = if self.burn_rounds > 0 {
            self.burn_rounds -= 1;
            self.burn_damage
        } else {
            0.0
        };
        if self.burn_rounds == 0 {
            self.burn_damage = 0.0;
        }

        let stunned = self.stun_rounds > 0;
        let mut damage_taken = 0.0;
        if stunned {
            self.stun_rounds -= 1;
        } else {
            damage_taken = (self.enemy.attack - self.profile.stats.defense).max(0.0);
            self.integrity = (self.integrity - damage_taken).max(0.0);
            if self.integrity <= 0.0 {
                self.result = Some(CombatResult::Defeat);
                return Ok(RoundReport {
                    round,
                    crit,
                    stunned,
                    damage_taken,
                    damage_dealt: 0.0,
                    poison_bonus,
                    burn_bonus,
                    result: self.result,
                });
            }
        }

        let multiplier = if crit { tuning::CRIT_MULTIPLIER } else { 1.0 };
        let damage_dealt = (self.profile.stats.attack * multiplier + poison_bonus + burn_bonus).max(0.0);
        self.hit_enemy(damage_dealt);

        if self.result.is_none() {
            self.round += 1;
            self.used_this_round.clear();
        }

        Ok(RoundReport {
            round,
            crit,
            stunned,
            damage_taken,
            damage_dealt,
            poison_bonus,
            burn_bonus,
            result: self.result,
        })
    }

    /// End the session. A finished fight commits its victory or defeat
    /// effects (and a first-victory story beat) to `state` and returns the
    /// outcome; an unfinished one is abandoned and returns `None`.
    pub fn close(self, state: &mut GameState, now: Millis) -> Option<CombatOutcome> {
        let Some(result) = self.result else {
            log::info!("Combat against {} abandoned in round {}", self.enemy.name, self.round);
            return None;
        };

        let spec = match result {
            CombatResult::Victory => &self.on_victory,
            CombatResult::Defeat => &self.on_defeat,
        };
        let id = self.encounter_id.as_deref().unwrap_or("combat");
        let effects = resolver::resolve_effects(spec, state);
        // Outcome losses take what the stores hold and stop at zero
        let emptied = resolver::apply_effects(&effects, state);
        if !emptied.is_empty() {
            log::info!("{} {} emptied {:?}", id, result.key(), emptied);
        }

        let mut log = Vec::new();
        let message = match result {
            CombatResult::Victory => format!("The {} is driven off.", self.enemy.name.to_lowercase()),
            CombatResult::Defeat => format!("The bastion falls to the {}.", self.enemy.name.to_lowercase()),
        };
        log.push(LogEntry::new(
            format!("combat.{}.{}", id, result.key()),
            message,
            now,
            LogCategory::Combat,
        ));

        if result == CombatResult::Victory {
            if let Some(beat) = &self.story {
                let seen = StatePath::Story(beat.seen);
                if !state.flag(seen) {
                    state.set_flag(seen, true);
                    log.push(LogEntry::new(seen.to_string(), beat.message.clone(), now, beat.category));
                }
            }
        }

        log::info!("Combat against {} closed: {:?} after {} round(s)", self.enemy.name, result, self.round);
        Some(CombatOutcome { result, log })
    }
}

/// Direct damage of a skill at `level` (≥ 1).
pub fn skill_damage(skill: CombatSkill, level: u32) -> f64 {
    let extra = level.saturating_sub(1) as f64;
    match skill {
        CombatSkill::CrushingStrike => {
            tuning::CRUSHING_STRIKE_BASE_DAMAGE + extra * tuning::CRUSHING_STRIKE_DAMAGE_PER_LEVEL
        }
        CombatSkill::BloodflameSphere => {
            tuning::BLOODFLAME_BASE_DAMAGE + extra * tuning::BLOODFLAME_DAMAGE_PER_LEVEL
        }
    }
}

/// Integrity spent to use a skill.
pub fn skill_integrity_cost(skill: CombatSkill) -> f64 {
    match skill {
        CombatSkill::CrushingStrike => 0.0,
        CombatSkill::BloodflameSphere => tuning::BLOODFLAME_INTEGRITY_COST,
    }
}
