//! Dotted-path addressing for the State Model.
//!
//! Registry data refers to state fields as `namespace.key` strings
//! (`resources.wood`, `tools.stone_axe`, `story.seen.firstHut`). They are
//! parsed once, when the registry loads, into [`StatePath`] values. An
//! unknown namespace or key is a parse error, so a typo in content data fails
//! at startup instead of silently reading zero during play.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::state::{
    Building, CombatSkill, Flag, Relic, Resource, SleepUpgrade, Stat, Story, Tool, ValueKind,
    Villager, Weapon,
};

/// A validated reference to one scalar field of [`GameState`](crate::state::GameState).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatePath {
    Resource(Resource),
    Building(Building),
    Villager(Villager),
    Stat(Stat),
    CombatSkill(CombatSkill),
    Sleep(SleepUpgrade),
    Tool(Tool),
    Weapon(Weapon),
    Relic(Relic),
    Flag(Flag),
    Story(Story),
}

const STORY_PREFIX: &str = "seen.";

impl StatePath {
    pub fn kind(&self) -> ValueKind {
        match self {
            StatePath::Resource(_)
            | StatePath::Building(_)
            | StatePath::Villager(_)
            | StatePath::Stat(_)
            | StatePath::CombatSkill(_)
            | StatePath::Sleep(_) => ValueKind::Number,
            StatePath::Tool(_)
            | StatePath::Weapon(_)
            | StatePath::Relic(_)
            | StatePath::Flag(_)
            | StatePath::Story(_) => ValueKind::Flag,
        }
    }

    /// Ownership flags only ever go from false to true during play.
    pub fn is_ownership(&self) -> bool {
        matches!(
            self,
            StatePath::Tool(_) | StatePath::Weapon(_) | StatePath::Relic(_)
        )
    }

    pub fn namespace(&self) -> &'static str {
        match self {
            StatePath::Resource(_) => "resources",
            StatePath::Building(_) => "buildings",
            StatePath::Villager(_) => "villagers",
            StatePath::Stat(_) => "stats",
            StatePath::CombatSkill(_) => "combatSkills",
            StatePath::Sleep(_) => "sleep",
            StatePath::Tool(_) => "tools",
            StatePath::Weapon(_) => "weapons",
            StatePath::Relic(_) => "relics",
            StatePath::Flag(_) => "flags",
            StatePath::Story(_) => "story",
        }
    }

    fn key(&self) -> &'static str {
        match self {
            StatePath::Resource(k) => k.key(),
            StatePath::Building(k) => k.key(),
            StatePath::Villager(k) => k.key(),
            StatePath::Stat(k) => k.key(),
            StatePath::CombatSkill(k) => k.key(),
            StatePath::Sleep(k) => k.key(),
            StatePath::Tool(k) => k.key(),
            StatePath::Weapon(k) => k.key(),
            StatePath::Relic(k) => k.key(),
            StatePath::Flag(k) => k.key(),
            StatePath::Story(k) => k.key(),
        }
    }

    /// Every addressable path, grouped by namespace.
    pub fn all() -> Vec<StatePath> {
        let mut paths = Vec::new();
        paths.extend(Resource::ALL.iter().map(|&k| StatePath::Resource(k)));
        paths.extend(Building::ALL.iter().map(|&k| StatePath::Building(k)));
        paths.extend(Villager::ALL.iter().map(|&k| StatePath::Villager(k)));
        paths.extend(Stat::ALL.iter().map(|&k| StatePath::Stat(k)));
        paths.extend(CombatSkill::ALL.iter().map(|&k| StatePath::CombatSkill(k)));
        paths.extend(SleepUpgrade::ALL.iter().map(|&k| StatePath::Sleep(k)));
        paths.extend(Tool::ALL.iter().map(|&k| StatePath::Tool(k)));
        paths.extend(Weapon::ALL.iter().map(|&k| StatePath::Weapon(k)));
        paths.extend(Relic::ALL.iter().map(|&k| StatePath::Relic(k)));
        paths.extend(Flag::ALL.iter().map(|&k| StatePath::Flag(k)));
        paths.extend(Story::ALL.iter().map(|&k| StatePath::Story(k)));
        paths
    }
}

/// Error from parsing a dotted path string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("state path `{0}` has no namespace separator")]
    MissingSeparator(String),
    #[error("unknown state namespace `{namespace}` in `{path}`")]
    UnknownNamespace { namespace: String, path: String },
    #[error("unknown key `{key}` in namespace `{namespace}`")]
    UnknownKey { namespace: String, key: String },
}

impl FromStr for StatePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, key) = s
            .split_once('.')
            .ok_or_else(|| PathError::MissingSeparator(s.to_string()))?;

        let unknown_key = || PathError::UnknownKey {
            namespace: namespace.to_string(),
            key: key.to_string(),
        };

        let path = match namespace {
            "resources" => Resource::from_key(key).map(StatePath::Resource),
            "buildings" => Building::from_key(key).map(StatePath::Building),
            "villagers" => Villager::from_key(key).map(StatePath::Villager),
            "stats" => Stat::from_key(key).map(StatePath::Stat),
            "combatSkills" => CombatSkill::from_key(key).map(StatePath::CombatSkill),
            "sleep" => SleepUpgrade::from_key(key).map(StatePath::Sleep),
            "tools" => Tool::from_key(key).map(StatePath::Tool),
            "weapons" => Weapon::from_key(key).map(StatePath::Weapon),
            "relics" => Relic::from_key(key).map(StatePath::Relic),
            "flags" => Flag::from_key(key).map(StatePath::Flag),
            "story" => key
                .strip_prefix(STORY_PREFIX)
                .and_then(Story::from_key)
                .map(StatePath::Story),
            _ => {
                return Err(PathError::UnknownNamespace {
                    namespace: namespace.to_string(),
                    path: s.to_string(),
                })
            }
        };

        path.ok_or_else(unknown_key)
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatePath::Story(_) => write!(f, "story.{}{}", STORY_PREFIX, self.key()),
            _ => write!(f, "{}.{}", self.namespace(), self.key()),
        }
    }
}

impl Serialize for StatePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StatePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
