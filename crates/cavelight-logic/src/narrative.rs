//! Narrative log entries handed to the UI's log panel.
//!
//! The engine only ever appends entries; display and expiry belong to the
//! caller.

use serde::{Deserialize, Serialize};

use crate::constants::Millis;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogCategory {
    #[default]
    Story,
    Event,
    Combat,
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Stable id. Story beats use their story path so repeats are detectable.
    pub id: String,
    pub message: String,
    pub timestamp: Millis,
    pub category: LogCategory,
}

impl LogEntry {
    pub fn new(
        id: impl Into<String>,
        message: impl Into<String>,
        timestamp: Millis,
        category: LogCategory,
    ) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            timestamp,
            category,
        }
    }
}
