//! Game constants: cycle timing, sleep tables, production rates, bastion
//! and combat numbers.
//!
//! Plain numeric constants with no runtime dependency. The normal-mode
//! production loop, the idle simulator and the combat resolver all read
//! these.

/// Wall-clock time in milliseconds. Every timestamp in the engine uses it.
pub type Millis = u64;

/// Level used for actions without a level dimension.
pub const DEFAULT_LEVEL: u32 = 1;

pub mod timing {
    /// Length of one production/consumption cycle at normal speed.
    pub const CYCLE_SECS: f64 = 15.0;
    pub const CYCLE_MS: u64 = 15_000;
    pub const MS_PER_SEC: f64 = 1000.0;
    pub const MS_PER_HOUR: u64 = 3_600_000;
}

pub mod sleep {
    /// Maximum idle duration per `sleep.length` level, in hours.
    pub const LENGTH_HOURS: [u64; 6] = [4, 6, 8, 10, 12, 16];
    /// Production/consumption multiplier per `sleep.intensity` level.
    pub const INTENSITY: [f64; 6] = [0.10, 0.15, 0.20, 0.25, 0.30, 0.40];
}

pub mod production {
    // Output per villager per cycle
    pub const GATHERER_WOOD: f64 = 10.0;
    pub const HUNTER_FOOD: f64 = 5.0;
    pub const HUNTER_FUR: f64 = 1.0;
    pub const HUNTER_BONES: f64 = 1.0;
    pub const STONE_MINER_STONE: f64 = 5.0;
    pub const IRON_MINER_IRON: f64 = 3.0;
    pub const COAL_MINER_COAL: f64 = 3.0;
    pub const TANNER_LEATHER: f64 = 1.0;
    /// Fur a tanner works through each cycle.
    pub const TANNER_FUR_INPUT: f64 = 2.0;

    /// Tool multipliers on role output.
    pub const IRON_AXE_BONUS: f64 = 1.5;
    pub const STONE_PICKAXE_BONUS: f64 = 1.5;

    // Upkeep per villager per cycle, every role including free villagers
    pub const FOOD_PER_VILLAGER: f64 = 1.0;
    pub const WOOD_PER_VILLAGER: f64 = 0.5;
}

pub mod bastion {
    pub const BASE_ATTACK: f64 = 5.0;
    pub const ATTACK_PER_WATCHTOWER: f64 = 8.0;
    pub const ATTACK_PER_STRENGTH: f64 = 2.0;
    pub const CRUDE_BOW_ATTACK: f64 = 4.0;
    pub const IRON_SWORD_ATTACK: f64 = 10.0;

    pub const BASE_DEFENSE: f64 = 0.0;
    pub const DEFENSE_PER_PALISADE: f64 = 5.0;

    pub const BASE_INTEGRITY: f64 = 50.0;
    pub const INTEGRITY_PER_BASTION: f64 = 25.0;
    pub const INTEGRITY_PER_PALISADE: f64 = 10.0;

    /// Critical strike chance per point of luck, in percent.
    pub const CRIT_PERCENT_PER_LUCK: f64 = 1.0;
    /// Flat critical strike bonus granted by the raven's eye relic, in percent.
    pub const RAVENS_EYE_CRIT_PERCENT: f64 = 10.0;
}

pub mod combat {
    pub const CRIT_MULTIPLIER: f64 = 1.5;

    pub const CRUSHING_STRIKE_BASE_DAMAGE: f64 = 10.0;
    pub const CRUSHING_STRIKE_DAMAGE_PER_LEVEL: f64 = 5.0;
    pub const CRUSHING_STRIKE_STUN_ROUNDS: u32 = 1;

    pub const BLOODFLAME_BASE_DAMAGE: f64 = 10.0;
    pub const BLOODFLAME_DAMAGE_PER_LEVEL: f64 = 5.0;
    pub const BLOODFLAME_BURN_PER_LEVEL: f64 = 4.0;
    pub const BLOODFLAME_BURN_ROUNDS: u32 = 3;
    /// Integrity spent to cast bloodflame sphere.
    pub const BLOODFLAME_INTEGRITY_COST: f64 = 10.0;
}

pub mod yields {
    // Hand-gathering yields per action, by best tool owned
    pub const WOOD_BARE_HANDS: f64 = 2.0;
    pub const WOOD_STONE_AXE: f64 = 5.0;
    pub const WOOD_IRON_AXE: f64 = 10.0;
    pub const STONE_BARE_HANDS: f64 = 1.0;
    pub const STONE_PICKAXE: f64 = 4.0;
    pub const FOOD_BARE_HANDS: f64 = 3.0;
    pub const FOOD_CRUDE_BOW: f64 = 8.0;
}
