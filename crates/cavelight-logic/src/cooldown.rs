//! Cooldown tracking: one "ready at" instant per action id.
//!
//! Purely time-based: an action is ready once `now` reaches its recorded
//! instant. Marking an action used overwrites the instant; cooldowns never
//! stack or queue.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{timing, Millis};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownTracker {
    ready_at: BTreeMap<String, Millis>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// An action that has never run is always ready.
    pub fn is_ready(&self, action_id: &str, now: Millis) -> bool {
        self.ready_at
            .get(action_id)
            .map_or(true, |&ready_at| now >= ready_at)
    }

    /// Record a use at `now`; the action is ready again `cooldown_secs` later.
    pub fn mark_used(&mut self, action_id: &str, now: Millis, cooldown_secs: f64) {
        let duration = (cooldown_secs.max(0.0) * timing::MS_PER_SEC).round() as Millis;
        self.ready_at
            .insert(action_id.to_string(), now.saturating_add(duration));
    }

    pub fn ready_at(&self, action_id: &str) -> Option<Millis> {
        self.ready_at.get(action_id).copied()
    }

    /// Milliseconds until the action is ready; 0 when it already is.
    pub fn remaining_ms(&self, action_id: &str, now: Millis) -> Millis {
        self.ready_at
            .get(action_id)
            .map_or(0, |&ready_at| ready_at.saturating_sub(now))
    }

    /// Remaining fraction of the cooldown in `[0, 1]`, for progress bars.
    pub fn remaining_fraction(&self, action_id: &str, now: Millis, cooldown_secs: f64) -> f64 {
        let total = cooldown_secs * timing::MS_PER_SEC;
        if total <= 0.0 {
            return 0.0;
        }
        (self.remaining_ms(action_id, now) as f64 / total).clamp(0.0, 1.0)
    }

    pub fn len(&self) -> usize {
        self.ready_at.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready_at.is_empty()
    }

    /// Forget every record. Only a full restart does this.
    pub fn clear(&mut self) {
        self.ready_at.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_action_is_ready() {
        let tracker = CooldownTracker::new();
        assert!(tracker.is_ready("chopWood", 0));
        assert_eq!(tracker.remaining_ms("chopWood", 0), 0);
    }

    #[test]
    fn test_ready_exactly_at_expiry() {
        let mut tracker = CooldownTracker::new();
        tracker.mark_used("chopWood", 0, 5.0);
        assert!(!tracker.is_ready("chopWood", 3000));
        assert_eq!(tracker.remaining_ms("chopWood", 3000), 2000);
        assert!(!tracker.is_ready("chopWood", 4999));
        assert!(tracker.is_ready("chopWood", 5000));
    }

    #[test]
    fn test_mark_used_overwrites() {
        let mut tracker = CooldownTracker::new();
        tracker.mark_used("hunt", 1000, 10.0);
        tracker.mark_used("hunt", 2000, 1.0);
        assert_eq!(tracker.ready_at("hunt"), Some(3000));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_zero_cooldown_is_immediately_ready() {
        let mut tracker = CooldownTracker::new();
        tracker.mark_used("craftTorch", 700, 0.0);
        assert!(tracker.is_ready("craftTorch", 700));
    }

    #[test]
    fn test_remaining_fraction() {
        let mut tracker = CooldownTracker::new();
        tracker.mark_used("hunt", 0, 10.0);
        assert!((tracker.remaining_fraction("hunt", 2500, 10.0) - 0.75).abs() < 1e-9);
        assert_eq!(tracker.remaining_fraction("hunt", 20_000, 10.0), 0.0);
    }
}
