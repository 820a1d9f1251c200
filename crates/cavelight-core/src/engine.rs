//! Game session - one player's state and everything that mutates it.
//!
//! The session owns the registry, the State Model, cooldowns, the optional
//! idle session and combat session, and the outgoing narrative log. Every
//! call takes an explicit `now` so hosts drive time however they like.

use cavelight_logic::bastion::CombatProfile;
use cavelight_logic::combat::{CombatOutcome, CombatRejection, CombatSession, RoundReport};
use cavelight_logic::constants::{timing, Millis};
use cavelight_logic::cooldown::CooldownTracker;
use cavelight_logic::executor::{self, Execution, Rejection};
use cavelight_logic::idle::{self, Accumulated, IdleProgress, IdleSession, SettleReport};
use cavelight_logic::narrative::{LogCategory, LogEntry};
use cavelight_logic::production::{self, CycleReport};
use cavelight_logic::registry::{ActionRegistry, RegistryError};
use cavelight_logic::state::{CombatSkill, Flag, GameState, Resource, Villager};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::persistence::{self, SaveData, SaveError};

/// Most normal-mode cycles one `update` call will catch up on. Longer gaps
/// belong to idle mode.
const MAX_CATCH_UP_CYCLES: u64 = 240;

/// Session-level request failures. State is untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("unknown encounter `{0}`")]
    UnknownEncounter(String),
    #[error("encounter `{0}` is not available")]
    EncounterHidden(String),
    #[error("a combat is already in progress")]
    CombatInProgress,
    #[error("no combat in progress")]
    NoCombat,
    #[error("idle mode is locked")]
    IdleLocked,
    #[error("idle mode is already active")]
    IdleActive,
    #[error("idle mode is not active")]
    IdleInactive,
    #[error(transparent)]
    Action(#[from] Rejection),
    #[error(transparent)]
    Combat(#[from] CombatRejection),
}

/// Main game session
pub struct GameSession {
    registry: ActionRegistry,
    state: GameState,
    cooldowns: CooldownTracker,
    idle: Option<IdleSession>,
    /// Latest idle totals shown to the player; never written to `state`.
    idle_totals: Accumulated,
    combat: Option<CombatSession>,
    log: Vec<LogEntry>,
    last_cycle_at: Millis,
    rng: StdRng,
}

impl GameSession {
    /// Fresh game against `registry`, with normal-mode cycles counted from
    /// `now`.
    pub fn new(registry: ActionRegistry, now: Millis) -> Self {
        Self {
            registry,
            state: GameState::new(),
            cooldowns: CooldownTracker::new(),
            idle: None,
            idle_totals: Accumulated::new(),
            combat: None,
            log: Vec::new(),
            last_cycle_at: now,
            rng: StdRng::from_entropy(),
        }
    }

    /// Fresh game on the bundled content.
    pub fn bundled(now: Millis) -> Result<Self, RegistryError> {
        Ok(Self::new(ActionRegistry::bundled()?, now))
    }

    /// Use a fixed seed for combat rolls.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct access for hosts that seed or edit state (tests, debug tools).
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn idle_session(&self) -> Option<&IdleSession> {
        self.idle.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.idle.map_or(false, |s| s.is_active)
    }

    pub fn combat(&self) -> Option<&CombatSession> {
        self.combat.as_ref()
    }

    // ── Actions ────────────────────────────────────────────────────────

    /// Always false while the village sleeps.
    pub fn can_execute(&self, action_id: &str, now: Millis) -> bool {
        !self.is_idle()
            && executor::can_execute(&self.registry, action_id, &self.state, &self.cooldowns, now)
    }

    /// Run an action; its log entries join the outgoing log.
    pub fn execute(&mut self, action_id: &str, now: Millis) -> Result<Execution, SessionError> {
        self.ensure_awake()?;
        let done = executor::execute(
            &self.registry,
            action_id,
            &mut self.state,
            &mut self.cooldowns,
            now,
        )?;
        self.log.extend(done.log.iter().cloned());
        Ok(done)
    }

    /// Idle totals are projected from the state as it was when sleep
    /// began, so nothing but `end_idle` may change it until then.
    fn ensure_awake(&self) -> Result<(), SessionError> {
        if self.is_idle() {
            log::warn!("Rejected a state change while idle mode is active");
            return Err(SessionError::IdleActive);
        }
        Ok(())
    }

    // ── Normal-mode cycles ─────────────────────────────────────────────

    /// Run every production cycle due by `now`. Paused while idle.
    pub fn update(&mut self, now: Millis) -> Vec<CycleReport> {
        if self.is_idle() {
            return Vec::new();
        }

        let due = now.saturating_sub(self.last_cycle_at) / timing::CYCLE_MS;
        if due > MAX_CATCH_UP_CYCLES {
            log::warn!(
                "Skipping {} overdue cycles; only {} are caught up",
                due - MAX_CATCH_UP_CYCLES,
                MAX_CATCH_UP_CYCLES
            );
            self.last_cycle_at += (due - MAX_CATCH_UP_CYCLES) * timing::CYCLE_MS;
        }

        let mut reports = Vec::new();
        while now >= self.last_cycle_at + timing::CYCLE_MS {
            self.last_cycle_at += timing::CYCLE_MS;
            let report = production::apply_cycle(&mut self.state);
            if report.shortages.contains(&Resource::Food) {
                self.log.push(LogEntry::new(
                    "village.hunger",
                    "The stores run empty. The village goes hungry.",
                    self.last_cycle_at,
                    LogCategory::Event,
                ));
            }
            reports.push(report);
        }
        reports
    }

    /// Move a free villager into `role`. Refused while idle.
    pub fn assign_villager(&mut self, role: Villager) -> bool {
        self.ensure_awake().is_ok() && production::assign(&mut self.state, role)
    }

    pub fn unassign_villager(&mut self, role: Villager) -> bool {
        self.ensure_awake().is_ok() && production::unassign(&mut self.state, role)
    }

    // ── Idle mode ──────────────────────────────────────────────────────

    pub fn start_idle(&mut self, now: Millis) -> Result<IdleSession, SessionError> {
        if !self.state.is_flagged(Flag::IdleUnlocked) {
            return Err(SessionError::IdleLocked);
        }
        if self.is_idle() {
            return Err(SessionError::IdleActive);
        }
        if self.combat.is_some() {
            return Err(SessionError::CombatInProgress);
        }
        // Cycles due before sleeping still count
        self.update(now);
        let session = idle::start(now, &self.state);
        self.idle = Some(session);
        self.idle_totals.clear();
        Ok(session)
    }

    /// Everything accrued so far, recomputed from the session start.
    pub fn idle_progress(&self, now: Millis) -> Option<IdleProgress> {
        self.idle
            .filter(|s| s.is_active)
            .map(|s| idle::resume(&s, now, &self.state))
    }

    /// Periodic refresh of the displayed idle totals.
    pub fn idle_tick(&mut self, now: Millis) -> Option<&Accumulated> {
        let session = self.idle?;
        self.idle_totals = idle::tick(&session, now, &self.state, &self.idle_totals);
        Some(&self.idle_totals)
    }

    /// When the next idle tick is due, aligned to the session start.
    pub fn next_idle_tick_at(&self, now: Millis) -> Option<Millis> {
        self.idle
            .filter(|s| s.is_active)
            .map(|s| idle::next_tick_at(&s, now))
    }

    /// Wake the village and commit everything accrued, once.
    pub fn end_idle(&mut self, now: Millis) -> Result<SettleReport, SessionError> {
        let session = self
            .idle
            .filter(|s| s.is_active)
            .ok_or(SessionError::IdleInactive)?;
        let progress = idle::resume(&session, now, &self.state);
        let report = idle::settle(session, &progress.accumulated, &mut self.state);

        self.idle = None;
        self.idle_totals.clear();
        self.last_cycle_at = now;
        self.log.push(LogEntry::new(
            "idle.settled",
            format!(
                "The village wakes after {} minutes of sleep.",
                (progress.elapsed_capped_secs / 60.0).floor()
            ),
            now,
            LogCategory::Idle,
        ));
        Ok(report)
    }

    // ── Combat ─────────────────────────────────────────────────────────

    pub fn begin_combat(&mut self, encounter_id: &str) -> Result<&CombatSession, SessionError> {
        if self.combat.is_some() {
            return Err(SessionError::CombatInProgress);
        }
        self.ensure_awake()?;
        let encounter = self
            .registry
            .encounter(encounter_id)
            .ok_or_else(|| SessionError::UnknownEncounter(encounter_id.to_string()))?;
        if !cavelight_logic::conditions::is_satisfied(&encounter.show_when, &self.state) {
            return Err(SessionError::EncounterHidden(encounter_id.to_string()));
        }
        let session = CombatSession::start(encounter, CombatProfile::from_state(&self.state));
        Ok(self.combat.insert(session))
    }

    pub fn combat_use_item(&mut self, item_id: &str) -> Result<f64, SessionError> {
        self.ensure_awake()?;
        let combat = self.combat.as_mut().ok_or(SessionError::NoCombat)?;
        Ok(combat.use_item(&self.registry, item_id, &mut self.state)?)
    }

    pub fn combat_use_skill(&mut self, skill: CombatSkill) -> Result<f64, SessionError> {
        let combat = self.combat.as_mut().ok_or(SessionError::NoCombat)?;
        Ok(combat.use_skill(skill)?)
    }

    pub fn combat_fight(&mut self) -> Result<RoundReport, SessionError> {
        let combat = self.combat.as_mut().ok_or(SessionError::NoCombat)?;
        Ok(combat.fight(&mut self.rng)?)
    }

    /// Close the combat dialog. A finished fight commits its outcome; an
    /// unfinished one is abandoned.
    pub fn finish_combat(&mut self, now: Millis) -> Result<Option<CombatOutcome>, SessionError> {
        let combat = self.combat.take().ok_or(SessionError::NoCombat)?;
        let outcome = combat.close(&mut self.state, now);
        if let Some(outcome) = &outcome {
            self.log.extend(outcome.log.iter().cloned());
        }
        Ok(outcome)
    }

    // ── Log, restart, persistence ──────────────────────────────────────

    /// Hand every pending log entry to the narrative panel.
    pub fn drain_log(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.log)
    }

    /// Throw everything away and start over.
    pub fn restart(&mut self, now: Millis) {
        self.state = GameState::new();
        self.cooldowns.clear();
        self.idle = None;
        self.idle_totals.clear();
        self.combat = None;
        self.log.clear();
        self.last_cycle_at = now;
        log::info!("Game restarted at {}", now);
    }

    pub fn snapshot(&self, now: Millis) -> SaveData {
        SaveData::new(now, self.state.clone(), self.cooldowns.clone(), self.idle)
    }

    /// Replace this session's durable state with `data`.
    pub fn restore(&mut self, data: SaveData, now: Millis) {
        self.state = data.state;
        self.cooldowns = data.cooldowns;
        self.idle = data.idle;
        self.idle_totals.clear();
        self.combat = None;
        self.last_cycle_at = now;
        // Reopened idle sessions recompute from their start time
        if let Some(session) = self.idle.filter(|s| s.is_active) {
            self.idle_totals = idle::resume(&session, now, &self.state).accumulated;
        }
    }

    /// Save session state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W, now: Millis) -> Result<(), SaveError> {
        persistence::save_game(writer, &self.snapshot(now))
    }

    /// Load session state from a reader
    pub fn load<R: std::io::Read>(&mut self, reader: R, now: Millis) -> Result<(), SaveError> {
        let data = persistence::load_game(reader)?;
        self.restore(data, now);
        Ok(())
    }

    pub fn to_json(&self, now: Millis) -> Result<String, SaveError> {
        persistence::to_json(&self.snapshot(now))
    }

    pub fn from_json(&mut self, json: &str, now: Millis) -> Result<(), SaveError> {
        let data = persistence::from_json(json)?;
        self.restore(data, now);
        Ok(())
    }
}
