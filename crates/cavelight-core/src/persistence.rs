//! Save/Load for a player's game.
//!
//! A save is an opaque snapshot of the durable pieces of a session: the
//! State Model, cooldown instants and the idle session (`startTime`,
//! `isActive`). Binary saves use bincode; JSON snapshots carry the same
//! record for debugging and export. Combat sessions are never saved.

use std::io::{Read, Write};

use cavelight_logic::constants::Millis;
use cavelight_logic::cooldown::CooldownTracker;
use cavelight_logic::idle::IdleSession;
use cavelight_logic::state::GameState;
use serde::{Deserialize, Serialize};

/// Version number for save file format (increment when format changes)
pub const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of one game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Wall-clock time the snapshot was taken
    pub saved_at: Millis,
    pub state: GameState,
    pub cooldowns: CooldownTracker,
    pub idle: Option<IdleSession>,
}

impl SaveData {
    pub fn new(
        saved_at: Millis,
        state: GameState,
        cooldowns: CooldownTracker,
        idle: Option<IdleSession>,
    ) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at,
            state,
            cooldowns,
            idle,
        }
    }

    fn check_version(self) -> Result<Self, SaveError> {
        if self.version != SAVE_VERSION {
            return Err(SaveError::VersionMismatch {
                expected: SAVE_VERSION,
                found: self.version,
            });
        }
        Ok(self)
    }
}

/// Errors that can occur during save/load
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Write a binary save.
pub fn save_game<W: Write>(writer: W, data: &SaveData) -> Result<(), SaveError> {
    bincode::serialize_into(writer, data)?;
    log::info!("Saved game at {} (format v{})", data.saved_at, data.version);
    Ok(())
}

/// Read a binary save, rejecting other format versions.
pub fn load_game<R: Read>(reader: R) -> Result<SaveData, SaveError> {
    let data: SaveData = bincode::deserialize_from(reader)?;
    let data = data.check_version()?;
    log::info!("Loaded save from {}", data.saved_at);
    Ok(data)
}

pub fn to_json(data: &SaveData) -> Result<String, SaveError> {
    Ok(serde_json::to_string_pretty(data)?)
}

pub fn from_json(json: &str) -> Result<SaveData, SaveError> {
    let data: SaveData = serde_json::from_str(json)?;
    data.check_version()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cavelight_logic::state::{Building, Flag, Resource, Tool, Villager};

    fn sample() -> SaveData {
        let mut state = GameState::new();
        state.resources.insert(Resource::Wood, 120.0);
        state.buildings.insert(Building::WoodenHut, 2.0);
        state.villagers.insert(Villager::Gatherer, 3.0);
        state.tools.insert(Tool::StoneAxe, true);
        state.flags.insert(Flag::IdleUnlocked, true);
        let mut cooldowns = CooldownTracker::new();
        cooldowns.mark_used("chopWood", 1_000, 5.0);
        let idle = Some(IdleSession {
            start_time: 9_000,
            is_active: true,
        });
        SaveData::new(10_000, state, cooldowns, idle)
    }

    #[test]
    fn test_binary_round_trip() {
        let data = sample();
        let mut buf = Vec::new();
        save_game(&mut buf, &data).unwrap();
        let loaded = load_game(buf.as_slice()).unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_json_uses_camel_case_idle_fields() {
        let json = to_json(&sample()).unwrap();
        assert!(json.contains("\"startTime\": 9000"));
        assert!(json.contains("\"isActive\": true"));
        assert_eq!(from_json(&json).unwrap(), sample());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut data = sample();
        data.version = SAVE_VERSION + 1;
        let mut buf = Vec::new();
        save_game(&mut buf, &data).unwrap();
        assert!(matches!(
            load_game(buf.as_slice()),
            Err(SaveError::VersionMismatch { found, .. }) if found == SAVE_VERSION + 1
        ));
    }

    #[test]
    fn test_truncated_save_is_an_error() {
        let mut buf = Vec::new();
        save_game(&mut buf, &sample()).unwrap();
        buf.truncate(buf.len() / 2);
        assert!(load_game(buf.as_slice()).is_err());
    }
}
