//! Device capability traits.
//!
//! The crate does not own device handles. The host supplies two read-only
//! capabilities, "is this key down" and "read the current gamepad state",
//! and the scan loop and capture helpers poll them. A disconnected gamepad
//! is reported through [`GamepadUnavailable`] and treated as a no-op, never
//! as a failure.

use crate::bindings::{GamepadButtons, KeyCode};

/// Snapshot of a single gamepad: button flags plus the left analog stick.
///
/// Axes use the signed 16-bit hardware range; positive Y is stick-up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GamepadState {
    pub buttons: GamepadButtons,
    pub left_x: i16,
    pub left_y: i16,
}

/// Returned by [`GamepadReader::read_state`] when no controller is connected
/// in the slot. Not an error condition; the tick simply skips gamepad
/// processing.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("no gamepad connected")]
pub struct GamepadUnavailable;

/// Keyboard capability: instantaneous down/up state per key code.
pub trait KeyboardReader: Send + Sync {
    fn is_key_down(&self, code: KeyCode) -> bool;
}

/// Gamepad capability: full state of the single supported controller slot.
pub trait GamepadReader: Send + Sync {
    fn read_state(&self) -> Result<GamepadState, GamepadUnavailable>;
}

/// Scripted in-memory devices.
///
/// Used by this crate's own tests and handy for host-side tests of
/// rebinding flows: press and release inputs from the test thread while the
/// scan loop or a capture helper polls from another.
pub mod mock {
    use super::{GamepadReader, GamepadState, GamepadUnavailable, KeyboardReader};
    use crate::bindings::{GamepadButtons, KeyCode, KEY_CODE_LIMIT};
    use std::sync::Mutex;

    /// Shared-state keyboard whose keys are toggled by the test.
    pub struct MockKeyboard {
        held: Mutex<[bool; KEY_CODE_LIMIT as usize]>,
    }

    impl Default for MockKeyboard {
        fn default() -> Self {
            Self {
                held: Mutex::new([false; KEY_CODE_LIMIT as usize]),
            }
        }
    }

    impl MockKeyboard {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn press(&self, code: KeyCode) {
            self.set(code, true);
        }

        pub fn release(&self, code: KeyCode) {
            self.set(code, false);
        }

        pub fn release_all(&self) {
            let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
            *held = [false; KEY_CODE_LIMIT as usize];
        }

        fn set(&self, code: KeyCode, down: bool) {
            if code < KEY_CODE_LIMIT {
                let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
                held[code as usize] = down;
            }
        }
    }

    impl KeyboardReader for MockKeyboard {
        fn is_key_down(&self, code: KeyCode) -> bool {
            if code >= KEY_CODE_LIMIT {
                return false;
            }
            let held = self.held.lock().unwrap_or_else(|e| e.into_inner());
            held[code as usize]
        }
    }

    /// Shared-state gamepad; can be "unplugged" mid-test.
    #[derive(Default)]
    pub struct MockGamepad {
        state: Mutex<Option<GamepadState>>,
    }

    impl MockGamepad {
        /// Starts connected, centered, no buttons held.
        pub fn new() -> Self {
            Self {
                state: Mutex::new(Some(GamepadState::default())),
            }
        }

        /// Starts with no controller in the slot.
        pub fn disconnected() -> Self {
            Self::default()
        }

        pub fn set_state(&self, state: GamepadState) {
            *self.state.lock().unwrap_or_else(|e| e.into_inner()) = Some(state);
        }

        pub fn set_buttons(&self, buttons: GamepadButtons) {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let mut snapshot = state.unwrap_or_default();
            snapshot.buttons = buttons;
            *state = Some(snapshot);
        }

        pub fn set_left_stick(&self, x: i16, y: i16) {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let mut snapshot = state.unwrap_or_default();
            snapshot.left_x = x;
            snapshot.left_y = y;
            *state = Some(snapshot);
        }

        pub fn disconnect(&self) {
            *self.state.lock().unwrap_or_else(|e| e.into_inner()) = None;
        }

        pub fn reconnect(&self) {
            self.set_state(GamepadState::default());
        }
    }

    impl GamepadReader for MockGamepad {
        fn read_state(&self) -> Result<GamepadState, GamepadUnavailable> {
            self.state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .ok_or(GamepadUnavailable)
        }
    }
}
