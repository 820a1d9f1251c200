//! Idle (sleep) mode progress.
//!
//! While the village sleeps, production and upkeep keep running at a reduced
//! intensity. Nothing is simulated cycle by cycle: the accumulated totals are
//! always a pure function of the persisted start time, `now` and the state,
//!
//! ```text
//! accumulated[r] = net_per_cycle[r] × intensity × min(now − start, max) / 15 s
//! ```
//!
//! so a reload, a resumed dialog and a periodic tick all agree to the last
//! bit. Only [`settle`] writes to the durable state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{sleep, timing, Millis};
use crate::path::StatePath;
use crate::production::{cycle_rates, CycleRates};
use crate::state::{GameState, Resource, SleepUpgrade};

/// Signed per-resource totals accrued while idle.
pub type Accumulated = BTreeMap<Resource, f64>;

/// The persisted part of idle mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdleSession {
    pub start_time: Millis,
    pub is_active: bool,
}

/// Values derived from the state each time a session starts or resumes.
#[derive(Debug, Clone, PartialEq)]
pub struct IdleConfig {
    pub max_duration_ms: Millis,
    pub intensity: f64,
    pub rates: CycleRates,
}

impl IdleConfig {
    pub fn from_state(state: &GameState) -> Self {
        Self {
            max_duration_ms: max_duration_ms(state),
            intensity: intensity(state),
            rates: cycle_rates(state),
        }
    }
}

/// Maximum idle duration for the current `sleep.length` level.
pub fn max_duration_ms(state: &GameState) -> Millis {
    let level = state
        .sleep_level(SleepUpgrade::Length)
        .min(sleep::LENGTH_HOURS.len() - 1);
    sleep::LENGTH_HOURS[level] * timing::MS_PER_HOUR
}

/// Intensity multiplier for the current `sleep.intensity` level.
pub fn intensity(state: &GameState) -> f64 {
    let level = state
        .sleep_level(SleepUpgrade::Intensity)
        .min(sleep::INTENSITY.len() - 1);
    sleep::INTENSITY[level]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleProgress {
    pub elapsed_capped_secs: f64,
    pub accumulated: Accumulated,
}

/// Scale one cycle's net rates by `multiplier` over `elapsed_secs`.
pub fn accumulate(rates: &CycleRates, multiplier: f64, elapsed_secs: f64) -> Accumulated {
    let cycles = elapsed_secs.max(0.0) / timing::CYCLE_SECS;
    rates
        .resources()
        .into_iter()
        .map(|r| (r, rates.net(r) * multiplier * cycles))
        .collect()
}

pub fn start(now: Millis, state: &GameState) -> IdleSession {
    let config = IdleConfig::from_state(state);
    log::info!(
        "Idle started at {} (max {} ms, intensity {})",
        now,
        config.max_duration_ms,
        config.intensity
    );
    IdleSession {
        start_time: now,
        is_active: true,
    }
}

/// Elapsed time counted toward accumulation, capped at `max_duration_ms`.
pub fn elapsed_capped_ms(session: &IdleSession, now: Millis, max_duration_ms: Millis) -> Millis {
    now.saturating_sub(session.start_time).min(max_duration_ms)
}

/// Recompute everything accrued since `start_time`.
pub fn resume(session: &IdleSession, now: Millis, state: &GameState) -> IdleProgress {
    let config = IdleConfig::from_state(state);
    let elapsed_ms = elapsed_capped_ms(session, now, config.max_duration_ms);
    let elapsed_capped_secs = elapsed_ms as f64 / timing::MS_PER_SEC;
    IdleProgress {
        elapsed_capped_secs,
        accumulated: accumulate(&config.rates, config.intensity, elapsed_capped_secs),
    }
}

/// Periodic update. An inactive session keeps `previous` unchanged.
pub fn tick(
    session: &IdleSession,
    now: Millis,
    state: &GameState,
    previous: &Accumulated,
) -> Accumulated {
    if !session.is_active {
        return previous.clone();
    }
    resume(session, now, state).accumulated
}

/// The next cycle boundary after `now`, measured from `start_time`.
pub fn next_tick_at(session: &IdleSession, now: Millis) -> Millis {
    let elapsed = now.saturating_sub(session.start_time);
    let cycles = elapsed / timing::CYCLE_MS + 1;
    session.start_time + cycles * timing::CYCLE_MS
}

pub fn ms_until_next_tick(session: &IdleSession, now: Millis) -> Millis {
    next_tick_at(session, now) - now.max(session.start_time)
}

/// True once the capped duration has fully elapsed.
pub fn is_complete(session: &IdleSession, now: Millis, state: &GameState) -> bool {
    now.saturating_sub(session.start_time) >= max_duration_ms(state)
}

/// What [`settle`] wrote to the state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettleReport {
    /// Net change applied per resource after flooring and the zero floor.
    pub applied: BTreeMap<Resource, f64>,
    /// Resources whose loss exceeded the stock and were held at zero.
    pub shortages: Vec<Resource>,
}

/// Commit accumulated totals, consuming the session. Each delta is floored
/// to a whole unit; resources never drop below zero.
pub fn settle(session: IdleSession, accumulated: &Accumulated, state: &mut GameState) -> SettleReport {
    let mut report = SettleReport::default();
    if !session.is_active {
        log::warn!("Ignoring settle of an inactive idle session");
        return report;
    }

    for (&resource, &delta) in accumulated {
        let delta = delta.floor();
        if delta == 0.0 {
            continue;
        }
        let path = StatePath::Resource(resource);
        let before = state.number(path);
        let target = before + delta;
        if target < 0.0 {
            report.shortages.push(resource);
        }
        let after = target.max(0.0);
        state.set_number(path, after);
        report.applied.insert(resource, after - before);
    }

    log::info!(
        "Idle settled: {} resource(s) changed, {} shortage(s)",
        report.applied.len(),
        report.shortages.len()
    );
    report
}
