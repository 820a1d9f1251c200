//! The State Model: one owned aggregate of typed namespaces.
//!
//! Every field the rule engine can read or write lives in exactly one
//! namespace of [`GameState`]. Numeric namespaces (resources, buildings,
//! villagers, stats, combat skills, sleep upgrades) hold `f64` values;
//! boolean namespaces (tools, weapons, relics, flags, story) hold ownership
//! and progress flags. A key that has never been written reads as the zero
//! value of its kind.
//!
//! Components address fields through [`StatePath`](crate::path::StatePath)
//! rather than touching the maps directly, so registry data and code agree on
//! one addressing scheme.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::path::StatePath;

/// Declares a namespace key enum with its stable string key.
macro_rules! state_keys {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $key:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $key)]
                $variant,
            )+
        }

        impl $name {
            /// Every key in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The key as it appears in dotted paths and registry data.
            pub fn key(self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }

            pub fn from_key(key: &str) -> Option<Self> {
                match key {
                    $($key => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

state_keys! {
    /// Stockpiled quantities, including craftable combat consumables.
    Resource {
        Wood => "wood",
        Stone => "stone",
        Food => "food",
        Fur => "fur",
        Bones => "bones",
        Iron => "iron",
        Coal => "coal",
        Leather => "leather",
        Gold => "gold",
        Torch => "torch",
        EmberBomb => "ember_bomb",
        AshfireBomb => "ashfire_bomb",
        PoisonArrows => "poison_arrows",
    }
}

state_keys! {
    /// Building counts. Leveled build actions read these as their level.
    Building {
        WoodenHut => "woodenHut",
        Palisade => "palisade",
        Watchtower => "watchtower",
        Bastion => "bastion",
        Tannery => "tannery",
        Forge => "forge",
    }
}

state_keys! {
    /// Villager head-counts per role. `Free` villagers are unassigned.
    Villager {
        Free => "free",
        Gatherer => "gatherer",
        Hunter => "hunter",
        StoneMiner => "stone_miner",
        IronMiner => "iron_miner",
        CoalMiner => "coal_miner",
        Tanner => "tanner",
    }
}

state_keys! {
    Stat {
        Luck => "luck",
        Strength => "strength",
    }
}

state_keys! {
    /// Combat skill levels. Level 0 means the skill is not learned.
    CombatSkill {
        CrushingStrike => "crushingStrike",
        BloodflameSphere => "bloodflameSphere",
    }
}

state_keys! {
    /// Sleep upgrade levels that configure the idle simulator.
    SleepUpgrade {
        Length => "length",
        Intensity => "intensity",
    }
}

state_keys! {
    Tool {
        StoneAxe => "stone_axe",
        StonePickaxe => "stone_pickaxe",
        IronAxe => "iron_axe",
        Lantern => "lantern",
    }
}

state_keys! {
    Weapon {
        CrudeBow => "crude_bow",
        IronSword => "iron_sword",
    }
}

state_keys! {
    Relic {
        RavensEye => "ravens_eye",
    }
}

state_keys! {
    /// Progress flags that gate visibility of actions.
    Flag {
        CaveExplored => "caveExplored",
        FireLit => "fireLit",
        VillageUnlocked => "villageUnlocked",
        ForestUnlocked => "forestUnlocked",
        BastionUnlocked => "bastionUnlocked",
        IdleUnlocked => "idleUnlocked",
    }
}

state_keys! {
    /// One-shot narrative markers under `story.seen.*`.
    Story {
        CaveExplored => "caveExplored",
        FireLit => "fireLit",
        VillageUnlocked => "villageUnlocked",
        FirstHut => "firstHut",
        BastionBuilt => "bastionBuilt",
        FirstVictory => "firstVictory",
    }
}

/// The two kinds of scalar a path can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Number,
    Flag,
}

/// A scalar read from or written to the State Model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Flag(bool),
    Number(f64),
}

impl StateValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            StateValue::Flag(_) => ValueKind::Flag,
            StateValue::Number(_) => ValueKind::Number,
        }
    }

    /// Numeric view: flags read as 1.0 / 0.0.
    pub fn as_number(&self) -> f64 {
        match *self {
            StateValue::Number(n) => n,
            StateValue::Flag(true) => 1.0,
            StateValue::Flag(false) => 0.0,
        }
    }

    /// Boolean view: numbers read as true when positive.
    pub fn as_flag(&self) -> bool {
        match *self {
            StateValue::Flag(b) => b,
            StateValue::Number(n) => n > 0.0,
        }
    }
}

/// Complete persisted game state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameState {
    pub resources: BTreeMap<Resource, f64>,
    pub buildings: BTreeMap<Building, f64>,
    pub villagers: BTreeMap<Villager, f64>,
    pub stats: BTreeMap<Stat, f64>,
    pub combat_skills: BTreeMap<CombatSkill, f64>,
    pub sleep: BTreeMap<SleepUpgrade, f64>,
    pub tools: BTreeMap<Tool, bool>,
    pub weapons: BTreeMap<Weapon, bool>,
    pub relics: BTreeMap<Relic, bool>,
    pub flags: BTreeMap<Flag, bool>,
    pub story: BTreeMap<Story, bool>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read any path. Missing keys read as 0 or false.
    pub fn get(&self, path: StatePath) -> StateValue {
        fn num<K: Ord>(map: &BTreeMap<K, f64>, key: &K) -> StateValue {
            StateValue::Number(map.get(key).copied().unwrap_or(0.0))
        }
        fn flag<K: Ord>(map: &BTreeMap<K, bool>, key: &K) -> StateValue {
            StateValue::Flag(map.get(key).copied().unwrap_or(false))
        }

        match path {
            StatePath::Resource(k) => num(&self.resources, &k),
            StatePath::Building(k) => num(&self.buildings, &k),
            StatePath::Villager(k) => num(&self.villagers, &k),
            StatePath::Stat(k) => num(&self.stats, &k),
            StatePath::CombatSkill(k) => num(&self.combat_skills, &k),
            StatePath::Sleep(k) => num(&self.sleep, &k),
            StatePath::Tool(k) => flag(&self.tools, &k),
            StatePath::Weapon(k) => flag(&self.weapons, &k),
            StatePath::Relic(k) => flag(&self.relics, &k),
            StatePath::Flag(k) => flag(&self.flags, &k),
            StatePath::Story(k) => flag(&self.story, &k),
        }
    }

    pub fn number(&self, path: StatePath) -> f64 {
        self.get(path).as_number()
    }

    pub fn flag(&self, path: StatePath) -> bool {
        self.get(path).as_flag()
    }

    /// Write a numeric path. Writing a number to a flag path sets the flag
    /// when the value is positive.
    pub fn set_number(&mut self, path: StatePath, value: f64) {
        match path {
            StatePath::Resource(k) => {
                self.resources.insert(k, value);
            }
            StatePath::Building(k) => {
                self.buildings.insert(k, value);
            }
            StatePath::Villager(k) => {
                self.villagers.insert(k, value);
            }
            StatePath::Stat(k) => {
                self.stats.insert(k, value);
            }
            StatePath::CombatSkill(k) => {
                self.combat_skills.insert(k, value);
            }
            StatePath::Sleep(k) => {
                self.sleep.insert(k, value);
            }
            _ => self.set_flag(path, value > 0.0),
        }
    }

    /// Write a boolean path. Writing a flag to a numeric path stores 1 or 0.
    pub fn set_flag(&mut self, path: StatePath, value: bool) {
        match path {
            StatePath::Tool(k) => {
                self.tools.insert(k, value);
            }
            StatePath::Weapon(k) => {
                self.weapons.insert(k, value);
            }
            StatePath::Relic(k) => {
                self.relics.insert(k, value);
            }
            StatePath::Flag(k) => {
                self.flags.insert(k, value);
            }
            StatePath::Story(k) => {
                self.story.insert(k, value);
            }
            _ => self.set_number(path, if value { 1.0 } else { 0.0 }),
        }
    }

    pub fn set(&mut self, path: StatePath, value: StateValue) {
        match value {
            StateValue::Flag(b) => self.set_flag(path, b),
            StateValue::Number(n) => self.set_number(path, n),
        }
    }

    /// Add a signed delta to a numeric path and return the new value.
    pub fn add(&mut self, path: StatePath, delta: f64) -> f64 {
        let value = self.number(path) + delta;
        self.set_number(path, value);
        value
    }

    // ── Typed shortcuts ────────────────────────────────────────────────

    pub fn resource(&self, r: Resource) -> f64 {
        self.number(StatePath::Resource(r))
    }

    pub fn building_count(&self, b: Building) -> u32 {
        self.number(StatePath::Building(b)).max(0.0) as u32
    }

    pub fn villagers_in(&self, role: Villager) -> f64 {
        self.number(StatePath::Villager(role))
    }

    /// Total head-count across every role, free villagers included.
    pub fn population(&self) -> f64 {
        Villager::ALL.iter().map(|&v| self.villagers_in(v)).sum()
    }

    pub fn stat(&self, s: Stat) -> f64 {
        self.number(StatePath::Stat(s))
    }

    pub fn skill_level(&self, skill: CombatSkill) -> u32 {
        self.number(StatePath::CombatSkill(skill)).max(0.0) as u32
    }

    pub fn sleep_level(&self, upgrade: SleepUpgrade) -> usize {
        self.number(StatePath::Sleep(upgrade)).max(0.0) as usize
    }

    pub fn has_tool(&self, t: Tool) -> bool {
        self.flag(StatePath::Tool(t))
    }

    pub fn has_weapon(&self, w: Weapon) -> bool {
        self.flag(StatePath::Weapon(w))
    }

    pub fn has_relic(&self, r: Relic) -> bool {
        self.flag(StatePath::Relic(r))
    }

    pub fn is_flagged(&self, f: Flag) -> bool {
        self.flag(StatePath::Flag(f))
    }

    pub fn story_seen(&self, s: Story) -> bool {
        self.flag(StatePath::Story(s))
    }

    /// Paths holding a negative number. Empty in every valid state.
    pub fn negative_paths(&self) -> Vec<StatePath> {
        StatePath::all()
            .into_iter()
            .filter(|p| p.kind() == ValueKind::Number && self.number(*p) < 0.0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_read_as_zero() {
        let state = GameState::new();
        assert_eq!(state.resource(Resource::Wood), 0.0);
        assert!(!state.has_tool(Tool::StoneAxe));
        assert!(!state.story_seen(Story::FirstHut));
        assert_eq!(state.population(), 0.0);
    }

    #[test]
    fn test_set_and_add() {
        let mut state = GameState::new();
        state.set_number(StatePath::Resource(Resource::Wood), 12.0);
        assert_eq!(state.add(StatePath::Resource(Resource::Wood), -2.0), 10.0);
        state.set_flag(StatePath::Tool(Tool::StoneAxe), true);
        assert!(state.has_tool(Tool::StoneAxe));
    }

    #[test]
    fn test_population_sums_all_roles() {
        let mut state = GameState::new();
        state.villagers.insert(Villager::Free, 2.0);
        state.villagers.insert(Villager::Gatherer, 3.0);
        state.villagers.insert(Villager::Tanner, 1.0);
        assert_eq!(state.population(), 6.0);
    }

    #[test]
    fn test_key_lookup_matches_declaration() {
        for r in Resource::ALL {
            assert_eq!(Resource::from_key(r.key()), Some(*r));
        }
        assert_eq!(Flag::from_key("caveExplored"), Some(Flag::CaveExplored));
        assert_eq!(Flag::from_key("cave_explored"), None);
    }

    #[test]
    fn test_json_uses_string_keys() {
        let mut state = GameState::new();
        state.resources.insert(Resource::EmberBomb, 2.0);
        state.flags.insert(Flag::CaveExplored, true);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"ember_bomb\":2.0"));
        assert!(json.contains("\"caveExplored\":true"));
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_negative_paths_detected() {
        let mut state = GameState::new();
        state.resources.insert(Resource::Food, -1.0);
        assert_eq!(
            state.negative_paths(),
            vec![StatePath::Resource(Resource::Food)]
        );
    }
}
