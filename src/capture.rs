//! Blocking raw-input capture for rebinding UIs.
//!
//! These helpers sit outside the intent pipeline: they poll the device
//! capabilities directly, wait for a fully released state, then report the
//! first key or button pressed afterwards. Every wait honors the configured
//! timeout so a UI can never hang on a disconnected or stuck device.
//!
//! Each helper performs its own independent raw queries and shares no state
//! with the scan loop, so running one concurrently with the pipeline is
//! safe.

use crate::bindings::{keys, GamepadButton, KeyCode, KEY_CODE_LIMIT};
use crate::device::{GamepadReader, GamepadUnavailable, KeyboardReader};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// A single captured raw input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapturedInput {
    Key(KeyCode),
    Button(GamepadButton),
}

/// Polling cadence and give-up policy for the capture helpers.
#[derive(Clone, Copy, Debug)]
pub struct CaptureOptions {
    /// Sleep between raw scans.
    pub poll_interval: Duration,
    /// Overall deadline per helper call; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Synchronous capture facade over the two device capabilities.
pub struct Capture {
    keyboard: Arc<dyn KeyboardReader>,
    gamepad: Arc<dyn GamepadReader>,
    options: CaptureOptions,
}

impl Capture {
    pub fn new(
        keyboard: Arc<dyn KeyboardReader>,
        gamepad: Arc<dyn GamepadReader>,
        options: CaptureOptions,
    ) -> Self {
        Self {
            keyboard,
            gamepad,
            options,
        }
    }

    /// Waits for all keys to be released, then returns the first key
    /// pressed afterwards.
    ///
    /// Non-blocking mode (`blocking == false`) samples exactly once per
    /// phase: it returns `None` immediately if any key is still held or no
    /// key is pressed yet. Blocking mode returns `None` only on timeout.
    pub fn get_key(&self, blocking: bool) -> Option<KeyCode> {
        let deadline = self.deadline();

        while self.any_key_down().is_some() {
            if !blocking || deadline_passed(deadline) {
                return None;
            }
            thread::sleep(self.options.poll_interval);
        }

        loop {
            if let Some(code) = self.any_key_down() {
                debug!(code, "captured key");
                return Some(code);
            }
            if !blocking || deadline_passed(deadline) {
                return None;
            }
            thread::sleep(self.options.poll_interval);
        }
    }

    /// Waits for all buttons to be released, then returns the first button
    /// pressed afterwards.
    ///
    /// Returns `None` when the gamepad is unavailable, when the user bails
    /// out with Escape on the keyboard, or on timeout.
    pub fn get_button(&self) -> Option<GamepadButton> {
        let deadline = self.deadline();

        loop {
            match self.any_button_down() {
                Ok(None) => break,
                Ok(Some(_)) => {
                    if deadline_passed(deadline) {
                        return None;
                    }
                    thread::sleep(self.options.poll_interval);
                }
                Err(GamepadUnavailable) => return None,
            }
        }

        loop {
            match self.any_button_down() {
                Ok(Some(button)) => {
                    debug!(%button, "captured button");
                    return Some(button);
                }
                Ok(None) => {
                    if self.keyboard.is_key_down(keys::VK_ESCAPE) || deadline_passed(deadline) {
                        return None;
                    }
                    thread::sleep(self.options.poll_interval);
                }
                Err(GamepadUnavailable) => return None,
            }
        }
    }

    /// Combined capture across both devices: release everything, then the
    /// first key or button pressed wins. Returns `None` on timeout.
    ///
    /// Unlike [`Capture::get_button`], an unavailable gamepad does not
    /// abort, since keyboard capture still works without a controller.
    pub fn get_key_or_button(&self) -> Option<CapturedInput> {
        let deadline = self.deadline();

        loop {
            let button_held = matches!(self.any_button_down(), Ok(Some(_)));
            let key_held = self.any_key_down().is_some();
            if !button_held && !key_held {
                break;
            }
            if deadline_passed(deadline) {
                return None;
            }
            thread::sleep(self.options.poll_interval);
        }

        loop {
            if let Ok(Some(button)) = self.any_button_down() {
                debug!(%button, "captured button");
                return Some(CapturedInput::Button(button));
            }
            if let Some(code) = self.any_key_down() {
                debug!(code, "captured key");
                return Some(CapturedInput::Key(code));
            }
            if deadline_passed(deadline) {
                return None;
            }
            thread::sleep(self.options.poll_interval);
        }
    }

    /// Blocks until no key (and, when a gamepad is readable, no button) is
    /// held, or the timeout passes.
    ///
    /// This facade has no access to the intent queue, so input held while
    /// waiting may already have been translated and buffered. A rebinding
    /// UI should bracket this call with `InputHandle::clear_intents` to
    /// drop those stale intents.
    pub fn wait_for_no_input(&self) {
        let deadline = self.deadline();

        loop {
            let key_held = self.any_key_down().is_some();
            let button_held = matches!(self.any_button_down(), Ok(Some(_)));
            if !key_held && !button_held {
                return;
            }
            if deadline_passed(deadline) {
                debug!("wait_for_no_input timed out with input still held");
                return;
            }
            thread::sleep(self.options.poll_interval);
        }
    }

    /// Full-range keyboard scan, lowest code wins.
    fn any_key_down(&self) -> Option<KeyCode> {
        (1..KEY_CODE_LIMIT - 1).find(|&code| self.keyboard.is_key_down(code))
    }

    /// First held button in flag-bit order.
    fn any_button_down(&self) -> Result<Option<GamepadButton>, GamepadUnavailable> {
        let state = self.gamepad.read_state()?;
        Ok(GamepadButton::ALL
            .into_iter()
            .find(|button| state.buttons.contains(button.flag())))
    }

    fn deadline(&self) -> Option<Instant> {
        self.options.timeout.map(|timeout| Instant::now() + timeout)
    }
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::GamepadButtons;
    use crate::device::mock::{MockGamepad, MockKeyboard};

    fn fast_options() -> CaptureOptions {
        CaptureOptions {
            poll_interval: Duration::from_millis(1),
            timeout: Some(Duration::from_secs(5)),
        }
    }

    fn capture_with(
        keyboard: Arc<MockKeyboard>,
        gamepad: Arc<MockGamepad>,
    ) -> Capture {
        Capture::new(keyboard, gamepad, fast_options())
    }

    #[test]
    fn nonblocking_get_key_returns_none_when_idle() {
        let keyboard = Arc::new(MockKeyboard::new());
        let capture = capture_with(keyboard.clone(), Arc::new(MockGamepad::new()));
        assert_eq!(capture.get_key(false), None);
    }

    #[test]
    fn nonblocking_get_key_returns_none_while_held() {
        let keyboard = Arc::new(MockKeyboard::new());
        keyboard.press(keys::VK_RETURN);
        let capture = capture_with(keyboard.clone(), Arc::new(MockGamepad::new()));
        assert_eq!(capture.get_key(false), None);
    }

    #[test]
    fn blocking_get_key_waits_for_release_then_captures() {
        let keyboard = Arc::new(MockKeyboard::new());
        keyboard.press(keys::VK_TAB);
        let capture = capture_with(keyboard.clone(), Arc::new(MockGamepad::new()));

        let driver_keyboard = keyboard.clone();
        let driver = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            driver_keyboard.release(keys::VK_TAB);
            std::thread::sleep(Duration::from_millis(20));
            driver_keyboard.press(keys::VK_F2);
        });

        assert_eq!(capture.get_key(true), Some(keys::VK_F2));
        driver.join().unwrap();
    }

    #[test]
    fn get_key_times_out() {
        let keyboard = Arc::new(MockKeyboard::new());
        let capture = Capture::new(
            keyboard,
            Arc::new(MockGamepad::new()),
            CaptureOptions {
                poll_interval: Duration::from_millis(1),
                timeout: Some(Duration::from_millis(30)),
            },
        );
        let started = Instant::now();
        assert_eq!(capture.get_key(true), None);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn get_button_returns_none_without_gamepad() {
        let capture = capture_with(
            Arc::new(MockKeyboard::new()),
            Arc::new(MockGamepad::disconnected()),
        );
        assert_eq!(capture.get_button(), None);
    }

    #[test]
    fn get_button_waits_for_release_then_captures() {
        let gamepad = Arc::new(MockGamepad::new());
        gamepad.set_buttons(GamepadButtons::A);
        let capture = capture_with(Arc::new(MockKeyboard::new()), gamepad.clone());

        let driver_gamepad = gamepad.clone();
        let driver = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            driver_gamepad.set_buttons(GamepadButtons::empty());
            std::thread::sleep(Duration::from_millis(20));
            driver_gamepad.set_buttons(GamepadButtons::RIGHT_SHOULDER);
        });

        assert_eq!(capture.get_button(), Some(GamepadButton::RightShoulder));
        driver.join().unwrap();
    }

    #[test]
    fn escape_aborts_button_capture() {
        let keyboard = Arc::new(MockKeyboard::new());
        let capture = capture_with(keyboard.clone(), Arc::new(MockGamepad::new()));

        let driver_keyboard = keyboard.clone();
        let driver = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            driver_keyboard.press(keys::VK_ESCAPE);
        });

        assert_eq!(capture.get_button(), None);
        driver.join().unwrap();
    }

    #[test]
    fn key_or_button_captures_from_either_device() {
        let keyboard = Arc::new(MockKeyboard::new());
        let gamepad = Arc::new(MockGamepad::new());
        let capture = capture_with(keyboard.clone(), gamepad.clone());

        let driver_gamepad = gamepad.clone();
        let driver = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            driver_gamepad.set_buttons(GamepadButtons::X);
        });

        assert_eq!(
            capture.get_key_or_button(),
            Some(CapturedInput::Button(GamepadButton::X))
        );
        driver.join().unwrap();
    }

    #[test]
    fn key_or_button_works_without_gamepad() {
        let keyboard = Arc::new(MockKeyboard::new());
        let capture = capture_with(keyboard.clone(), Arc::new(MockGamepad::disconnected()));

        let driver_keyboard = keyboard.clone();
        let driver = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            driver_keyboard.press(keys::VK_OEM_MINUS);
        });

        assert_eq!(
            capture.get_key_or_button(),
            Some(CapturedInput::Key(keys::VK_OEM_MINUS))
        );
        driver.join().unwrap();
    }

    #[test]
    fn wait_for_no_input_returns_once_everything_is_released() {
        let keyboard = Arc::new(MockKeyboard::new());
        keyboard.press(keys::VK_DOWN);
        let capture = capture_with(keyboard.clone(), Arc::new(MockGamepad::new()));

        let driver_keyboard = keyboard.clone();
        let driver = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            driver_keyboard.release_all();
        });

        capture.wait_for_no_input();
        assert_eq!(capture.get_key(false), None);
        driver.join().unwrap();
    }
}
