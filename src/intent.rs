//! Semantic input intents.
//!
//! An [`Intent`] is a device-independent action: the translator turns raw
//! keyboard and gamepad state into intents, and the consumer only ever sees
//! intents. The set is closed; downstream menu logic matches exhaustively.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A semantic action decoupled from the physical input that produced it.
///
/// `None` means "no action". It is never enqueued by the translator; the
/// intent queue returns it when empty so consumers can poll without an
/// `Option` wrapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Intent {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
    /// Primary accept (gamepad A).
    Confirm,
    /// Cancel / back out (gamepad B).
    Deny,
    /// Pause / open the main menu (gamepad Start).
    Start,
    /// Secondary menu (gamepad Back/Select).
    Option,
    /// Cycle backwards through a list (left bumper).
    CycleLeft,
    /// Cycle forwards through a list (right bumper).
    CycleRight,
    Info1,
    Info2,
    Info3,
    Info4,
}

impl Intent {
    /// All intents, `None` included.
    pub const ALL: [Intent; 15] = [
        Intent::None,
        Intent::Up,
        Intent::Down,
        Intent::Left,
        Intent::Right,
        Intent::Confirm,
        Intent::Deny,
        Intent::Start,
        Intent::Option,
        Intent::CycleLeft,
        Intent::CycleRight,
        Intent::Info1,
        Intent::Info2,
        Intent::Info3,
        Intent::Info4,
    ];

    /// The intents that re-fire while their source is held.
    ///
    /// Only navigation and cycling repeat; Confirm, Deny and friends fire
    /// exactly once per press no matter how long the source stays down.
    pub const REPEATABLE: [Intent; 6] = [
        Intent::Up,
        Intent::Down,
        Intent::Left,
        Intent::Right,
        Intent::CycleLeft,
        Intent::CycleRight,
    ];

    /// Whether this intent participates in key repeat.
    pub fn is_repeatable(self) -> bool {
        matches!(
            self,
            Intent::Up
                | Intent::Down
                | Intent::Left
                | Intent::Right
                | Intent::CycleLeft
                | Intent::CycleRight
        )
    }

    /// Iterator over every intent except `None`, the set a complete binding
    /// map has to cover.
    pub fn bindable() -> impl Iterator<Item = Intent> {
        Intent::ALL
            .into_iter()
            .filter(|intent| *intent != Intent::None)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeatable_set_matches_predicate() {
        for intent in Intent::ALL {
            assert_eq!(
                Intent::REPEATABLE.contains(&intent),
                intent.is_repeatable(),
                "mismatch for {intent}"
            );
        }
    }

    #[test]
    fn bindable_excludes_none() {
        let bindable: Vec<Intent> = Intent::bindable().collect();
        assert_eq!(bindable.len(), Intent::ALL.len() - 1);
        assert!(!bindable.contains(&Intent::None));
    }

    #[test]
    fn serializes_as_variant_name() {
        let toml = toml::to_string(&std::collections::BTreeMap::from([("intent", Intent::CycleLeft)]))
            .unwrap();
        assert!(toml.contains("\"CycleLeft\""));
    }
}
