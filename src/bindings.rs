//! Key and button binding maps, completeness validation and defaults.
//!
//! A binding map assigns a physical input identifier (virtual-key code or
//! gamepad button) to an [`Intent`]. A map is *complete* when every intent
//! other than `None` appears as a value at least once; incomplete maps are
//! never installed; they are replaced wholesale by the hardcoded defaults.

use crate::intent::Intent;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Raw keyboard key code, device-defined (Windows virtual-key numbering).
pub type KeyCode = u32;

/// Exclusive upper bound of the keycode range scanned and tracked.
///
/// Matches the size of the held-state table; bindings at or above this are
/// ignored by the translator rather than rejected.
pub const KEY_CODE_LIMIT: KeyCode = 0x100;

/// Keyboard key → intent map.
pub type KeyBindings = HashMap<KeyCode, Intent>;

/// Gamepad button → intent map.
pub type ButtonBindings = HashMap<GamepadButton, Intent>;

/// Virtual-key codes used by the default bindings and the capture helpers.
pub mod keys {
    use super::KeyCode;

    pub const VK_BACK: KeyCode = 0x08;
    pub const VK_TAB: KeyCode = 0x09;
    pub const VK_RETURN: KeyCode = 0x0D;
    pub const VK_ESCAPE: KeyCode = 0x1B;
    pub const VK_LEFT: KeyCode = 0x25;
    pub const VK_UP: KeyCode = 0x26;
    pub const VK_RIGHT: KeyCode = 0x27;
    pub const VK_DOWN: KeyCode = 0x28;
    pub const VK_F1: KeyCode = 0x70;
    pub const VK_F2: KeyCode = 0x71;
    pub const VK_F3: KeyCode = 0x72;
    pub const VK_F4: KeyCode = 0x73;
    pub const VK_OEM_PLUS: KeyCode = 0xBB;
    pub const VK_OEM_MINUS: KeyCode = 0xBD;
}

bitflags! {
    /// Gamepad button state word, XInput bit assignments.
    ///
    /// Device state only; persistence serializes [`GamepadButton`] keys,
    /// never this word.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct GamepadButtons: u16 {
        const DPAD_UP        = 0x0001;
        const DPAD_DOWN      = 0x0002;
        const DPAD_LEFT      = 0x0004;
        const DPAD_RIGHT     = 0x0008;
        const START          = 0x0010;
        const BACK           = 0x0020;
        const LEFT_THUMB     = 0x0040;
        const RIGHT_THUMB    = 0x0080;
        const LEFT_SHOULDER  = 0x0100;
        const RIGHT_SHOULDER = 0x0200;
        const A              = 0x1000;
        const B              = 0x2000;
        const X              = 0x4000;
        const Y              = 0x8000;
    }
}

/// A single nameable gamepad button, the key type for [`ButtonBindings`].
///
/// Kept separate from the [`GamepadButtons`] flag word so binding maps hash
/// and serialize over a plain fieldless enum while device state stays a
/// flag word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamepadButton {
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
    Start,
    Back,
    LeftThumb,
    RightThumb,
    LeftShoulder,
    RightShoulder,
    A,
    B,
    X,
    Y,
}

impl GamepadButton {
    /// Every nameable button, in flag-bit order.
    pub const ALL: [GamepadButton; 14] = [
        GamepadButton::DPadUp,
        GamepadButton::DPadDown,
        GamepadButton::DPadLeft,
        GamepadButton::DPadRight,
        GamepadButton::Start,
        GamepadButton::Back,
        GamepadButton::LeftThumb,
        GamepadButton::RightThumb,
        GamepadButton::LeftShoulder,
        GamepadButton::RightShoulder,
        GamepadButton::A,
        GamepadButton::B,
        GamepadButton::X,
        GamepadButton::Y,
    ];

    /// The flag bit this button occupies in a [`GamepadButtons`] word.
    pub fn flag(self) -> GamepadButtons {
        match self {
            GamepadButton::DPadUp => GamepadButtons::DPAD_UP,
            GamepadButton::DPadDown => GamepadButtons::DPAD_DOWN,
            GamepadButton::DPadLeft => GamepadButtons::DPAD_LEFT,
            GamepadButton::DPadRight => GamepadButtons::DPAD_RIGHT,
            GamepadButton::Start => GamepadButtons::START,
            GamepadButton::Back => GamepadButtons::BACK,
            GamepadButton::LeftThumb => GamepadButtons::LEFT_THUMB,
            GamepadButton::RightThumb => GamepadButtons::RIGHT_THUMB,
            GamepadButton::LeftShoulder => GamepadButtons::LEFT_SHOULDER,
            GamepadButton::RightShoulder => GamepadButtons::RIGHT_SHOULDER,
            GamepadButton::A => GamepadButtons::A,
            GamepadButton::B => GamepadButtons::B,
            GamepadButton::X => GamepadButtons::X,
            GamepadButton::Y => GamepadButtons::Y,
        }
    }
}

impl fmt::Display for GamepadButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Whether every intent other than `None` appears as a value at least once.
pub fn is_complete<K>(binds: &HashMap<K, Intent>) -> bool {
    Intent::bindable().all(|intent| binds.values().any(|bound| *bound == intent))
}

/// Hardcoded keyboard defaults, one key per intent.
pub fn default_key_binds() -> KeyBindings {
    use keys::*;

    HashMap::from([
        (VK_UP, Intent::Up),
        (VK_DOWN, Intent::Down),
        (VK_LEFT, Intent::Left),
        (VK_RIGHT, Intent::Right),
        (VK_RETURN, Intent::Confirm),
        (VK_BACK, Intent::Deny),
        (VK_ESCAPE, Intent::Start),
        (VK_TAB, Intent::Option),
        (VK_OEM_MINUS, Intent::CycleLeft),
        (VK_OEM_PLUS, Intent::CycleRight),
        (VK_F1, Intent::Info1),
        (VK_F2, Intent::Info2),
        (VK_F3, Intent::Info3),
        (VK_F4, Intent::Info4),
    ])
}

/// Hardcoded controller defaults, one button per intent.
pub fn default_button_binds() -> ButtonBindings {
    HashMap::from([
        (GamepadButton::DPadUp, Intent::Up),
        (GamepadButton::DPadDown, Intent::Down),
        (GamepadButton::DPadLeft, Intent::Left),
        (GamepadButton::DPadRight, Intent::Right),
        (GamepadButton::A, Intent::Confirm),
        (GamepadButton::B, Intent::Deny),
        (GamepadButton::Start, Intent::Start),
        (GamepadButton::Back, Intent::Option),
        (GamepadButton::LeftShoulder, Intent::CycleLeft),
        (GamepadButton::RightShoulder, Intent::CycleRight),
        (GamepadButton::X, Intent::Info1),
        (GamepadButton::Y, Intent::Info2),
        (GamepadButton::LeftThumb, Intent::Info3),
        (GamepadButton::RightThumb, Intent::Info4),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        assert!(is_complete(&default_key_binds()));
        assert!(is_complete(&default_button_binds()));
    }

    #[test]
    fn missing_intent_fails_completeness() {
        let mut binds = default_key_binds();
        let code = binds
            .iter()
            .find(|(_, intent)| **intent == Intent::Info4)
            .map(|(code, _)| *code)
            .unwrap();
        binds.remove(&code);
        assert!(!is_complete(&binds));
    }

    #[test]
    fn duplicate_sources_still_complete() {
        let mut binds = default_key_binds();
        // A second key for Confirm must not break the check.
        binds.insert(0x20, Intent::Confirm);
        assert!(is_complete(&binds));
    }

    #[test]
    fn empty_map_is_incomplete() {
        assert!(!is_complete(&KeyBindings::new()));
    }

    #[test]
    fn button_flags_are_distinct() {
        let mut seen = GamepadButtons::empty();
        for button in GamepadButton::ALL {
            assert!(!seen.intersects(button.flag()), "{button} reuses a bit");
            seen |= button.flag();
        }
    }
}
