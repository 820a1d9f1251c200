//! Integration tests for a game session across saves and reloads.
//!
//! Exercises: actions → normal cycles → idle mode → save → reload mid-idle
//! → settle, and that a reload never loses or double-counts idle time.

use cavelight_core::persistence;
use cavelight_core::prelude::*;
use cavelight_logic::state::{Flag, Resource, Villager};

const MINUTE: u64 = 60_000;

fn village_session(now: u64) -> GameSession {
    let mut game = GameSession::bundled(now).unwrap().with_seed(3);
    let state = game.state_mut();
    state.flags.insert(Flag::IdleUnlocked, true);
    state.villagers.insert(Villager::Free, 3.0);
    state.resources.insert(Resource::Food, 100.0);
    state.resources.insert(Resource::Wood, 100.0);
    assert!(game.assign_villager(Villager::Gatherer));
    assert!(game.assign_villager(Villager::Gatherer));
    assert!(game.assign_villager(Villager::Hunter));
    assert!(!game.assign_villager(Villager::Hunter));
    game
}

#[test]
fn reload_mid_idle_recomputes_from_start_time() {
    let mut game = village_session(0);
    game.start_idle(0).unwrap();
    let _ = game.idle_tick(5 * MINUTE);

    let mut buf = Vec::new();
    game.save(&mut buf, 5 * MINUTE).unwrap();

    // The client is gone for an hour; a fresh session loads the save
    let mut reloaded = GameSession::bundled(65 * MINUTE).unwrap();
    reloaded.load(buf.as_slice(), 65 * MINUTE).unwrap();
    assert!(reloaded.is_idle());

    let expected = game.idle_progress(65 * MINUTE).unwrap();
    let resumed = reloaded.idle_progress(65 * MINUTE).unwrap();
    assert_eq!(resumed, expected);
    assert_eq!(resumed.elapsed_capped_secs, 3_900.0);

    let before = reloaded.state().resource(Resource::Wood);
    reloaded.end_idle(65 * MINUTE).unwrap();
    let gained = reloaded.state().resource(Resource::Wood) - before;
    assert_eq!(gained, expected.accumulated[&Resource::Wood].floor());
}

#[test]
fn idle_time_is_capped_by_sleep_length() {
    let mut game = village_session(0);
    game.start_idle(0).unwrap();
    let four_hours = game.idle_progress(4 * 60 * MINUTE).unwrap();
    let two_days = game.idle_progress(48 * 60 * MINUTE).unwrap();
    assert_eq!(four_hours, two_days);
}

#[test]
fn json_snapshot_restores_session() {
    let mut game = village_session(0);
    game.execute("exploreCave", 0).unwrap();
    game.update(30_000);
    let json = game.to_json(30_000).unwrap();

    let mut other = GameSession::bundled(0).unwrap();
    other.from_json(&json, 30_000).unwrap();
    assert_eq!(other.state(), game.state());
    assert!(!other.can_execute("exploreCave", 30_000));
}

#[test]
fn save_from_other_version_is_rejected() {
    let game = village_session(0);
    let mut data = game.snapshot(0);
    data.version += 1;
    let mut buf = Vec::new();
    persistence::save_game(&mut buf, &data).unwrap();

    let mut other = GameSession::bundled(0).unwrap();
    assert!(matches!(
        other.load(buf.as_slice(), 0),
        Err(SaveError::VersionMismatch { .. })
    ));
    assert_eq!(other.state(), &GameState::new());
}
