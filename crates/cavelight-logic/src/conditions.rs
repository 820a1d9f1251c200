//! Condition evaluation: `show_when` maps and other path predicates.
//!
//! A condition map pairs each path with a requirement. Boolean requirements
//! demand exact equality; numeric requirements demand `value >= threshold`.
//! An empty map is always satisfied. Evaluation never fails: a path that was
//! never written reads as 0 or false.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::path::StatePath;
use crate::state::{GameState, ValueKind};

/// Required value for one path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requirement {
    /// Exact boolean match.
    Equals(bool),
    /// Numeric value must be at least this much.
    AtLeast(f64),
}

impl Requirement {
    pub fn kind(&self) -> ValueKind {
        match self {
            Requirement::Equals(_) => ValueKind::Flag,
            Requirement::AtLeast(_) => ValueKind::Number,
        }
    }

    pub fn is_met(&self, state: &GameState, path: StatePath) -> bool {
        match *self {
            Requirement::Equals(expected) => state.flag(path) == expected,
            Requirement::AtLeast(threshold) => state.number(path) >= threshold,
        }
    }
}

pub type Conditions = BTreeMap<StatePath, Requirement>;

/// True when every requirement in `conditions` holds.
pub fn is_satisfied(conditions: &Conditions, state: &GameState) -> bool {
    conditions
        .iter()
        .all(|(path, requirement)| requirement.is_met(state, *path))
}

/// Paths whose requirement does not currently hold, in path order.
pub fn unmet(conditions: &Conditions, state: &GameState) -> Vec<StatePath> {
    conditions
        .iter()
        .filter(|(path, requirement)| !requirement.is_met(state, **path))
        .map(|(path, _)| *path)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Building, Flag, Resource, Tool};

    fn conditions(json: &str) -> Conditions {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_empty_is_vacuously_true() {
        assert!(is_satisfied(&Conditions::new(), &GameState::new()));
    }

    #[test]
    fn test_boolean_requires_exact_match() {
        let c = conditions(r#"{"flags.caveExplored": true, "tools.stone_axe": false}"#);
        let mut state = GameState::new();
        assert!(!is_satisfied(&c, &state));

        state.flags.insert(Flag::CaveExplored, true);
        assert!(is_satisfied(&c, &state));

        state.tools.insert(Tool::StoneAxe, true);
        assert!(!is_satisfied(&c, &state));
        assert_eq!(unmet(&c, &state), vec![StatePath::Tool(Tool::StoneAxe)]);
    }

    #[test]
    fn test_numeric_threshold_is_inclusive() {
        let c = conditions(r#"{"buildings.woodenHut": 2}"#);
        let mut state = GameState::new();
        state.buildings.insert(Building::WoodenHut, 1.0);
        assert!(!is_satisfied(&c, &state));
        state.buildings.insert(Building::WoodenHut, 2.0);
        assert!(is_satisfied(&c, &state));
        state.buildings.insert(Building::WoodenHut, 3.0);
        assert!(is_satisfied(&c, &state));
    }

    #[test]
    fn test_missing_path_reads_as_zero() {
        let zero = conditions(r#"{"resources.gold": 0}"#);
        let one = conditions(r#"{"resources.gold": 1}"#);
        let state = GameState::new();
        assert!(is_satisfied(&zero, &state));
        assert!(!is_satisfied(&one, &state));
        assert_eq!(unmet(&one, &state), vec![StatePath::Resource(Resource::Gold)]);
    }

    #[test]
    fn test_requirement_kinds_parse_from_json() {
        let c = conditions(r#"{"flags.fireLit": false, "resources.wood": 2.5}"#);
        assert_eq!(
            c[&StatePath::Flag(Flag::FireLit)],
            Requirement::Equals(false)
        );
        assert_eq!(
            c[&StatePath::Resource(Resource::Wood)],
            Requirement::AtLeast(2.5)
        );
    }
}
