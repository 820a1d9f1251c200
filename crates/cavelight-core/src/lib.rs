//! Cavelight Core - game session engine
//!
//! Wraps the pure rule engine from `cavelight-logic` into a stateful
//! session: one player's State Model, cooldowns, idle and combat sessions,
//! the narrative log, and save/load.
//!
//! # Example
//!
//! ```rust,no_run
//! use cavelight_core::prelude::*;
//!
//! let mut game = GameSession::bundled(0).unwrap();
//! game.execute("exploreCave", 0).unwrap();
//!
//! // Host loop: advance production once per frame
//! let mut now = 0;
//! loop {
//!     now += 16;
//!     game.update(now);
//!     for entry in game.drain_log() {
//!         println!("{}", entry.message);
//!     }
//! }
//! ```

pub mod engine;
pub mod persistence;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::engine::{GameSession, SessionError};
    pub use crate::persistence::{SaveData, SaveError};
    pub use cavelight_logic::narrative::{LogCategory, LogEntry};
    pub use cavelight_logic::state::GameState;
}
