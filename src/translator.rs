//! Raw device state → intent translation.
//!
//! The translator is the per-tick core of the pipeline. Each call to
//! [`Translator::tick`] compares current device state against the previous
//! tick (edge detection), applies the key-repeat discipline, thresholds the
//! left analog stick into digital directions with hysteresis, and returns
//! the ordered list of intents generated this tick.
//!
//! All timing state is owned here and keyed by [`Intent`], not by binding,
//! so a rebind does not invalidate the tables. The scan loop is the only
//! caller; nothing in this module is synchronized.

use crate::bindings::{ButtonBindings, KeyBindings, KEY_CODE_LIMIT};
use crate::device::{GamepadReader, GamepadState, KeyboardReader};
use crate::intent::Intent;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Repeat-timing and stick-threshold policy for one translator.
///
/// The defaults mirror long-standing accessibility tuning: a 400 ms pause
/// before a held input starts repeating, then one repeat every 100 ms, and
/// a stick deflection of 20000 (on the signed 16-bit axis range) to count
/// as a digital direction. All of them are expected to become user-tunable.
#[derive(Clone, Copy, Debug)]
pub struct RepeatSettings {
    /// Delay before a held repeatable input fires a second time.
    pub initial_repeat_delay: Duration,
    /// Delay between repeats once the initial delay has elapsed.
    pub repeat_delay: Duration,
    /// Stick deflection magnitude that counts as a digital press, X axis.
    pub x_threshold: i16,
    /// Stick deflection magnitude that counts as a digital press, Y axis.
    pub y_threshold: i16,
}

impl Default for RepeatSettings {
    fn default() -> Self {
        Self {
            initial_repeat_delay: Duration::from_millis(400),
            repeat_delay: Duration::from_millis(100),
            x_threshold: 20000,
            y_threshold: 20000,
        }
    }
}

/// Per-intent repeat timer.
///
/// `Expired` fires on the next eligible check (the initial state),
/// `Disarmed` never fires (used while repetition is globally off),
/// `Armed(t)` fires once `now >= t`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RepeatTimer {
    Expired,
    Disarmed,
    Armed(Instant),
}

impl RepeatTimer {
    fn has_elapsed(self, now: Instant) -> bool {
        match self {
            RepeatTimer::Expired => true,
            RepeatTimer::Disarmed => false,
            RepeatTimer::Armed(deadline) => now >= deadline,
        }
    }
}

/// Per-tick state machine turning raw device state into intents.
pub struct Translator {
    settings: RepeatSettings,
    /// Down/up state of every key on the previous tick, indexed by keycode.
    held_keys: [bool; KEY_CODE_LIMIT as usize],
    /// Gamepad snapshot from the previous successful read.
    prev_gamepad: GamepadState,
    /// Repeat timers, one per repeatable intent.
    timers: HashMap<Intent, RepeatTimer>,
}

impl Translator {
    pub fn new(settings: RepeatSettings) -> Self {
        let timers = Intent::REPEATABLE
            .into_iter()
            .map(|intent| (intent, RepeatTimer::Expired))
            .collect();

        Self {
            settings,
            held_keys: [false; KEY_CODE_LIMIT as usize],
            prev_gamepad: GamepadState::default(),
            timers,
        }
    }

    /// Runs one scan tick and returns the intents it produced, in order:
    /// keyboard bindings, then gamepad buttons, then the four stick
    /// directions (Left, Right, Down, Up). The same intent may appear more
    /// than once when bound to several simultaneously repeating sources.
    pub fn tick(
        &mut self,
        keyboard: &dyn KeyboardReader,
        gamepad: &dyn GamepadReader,
        key_binds: &KeyBindings,
        button_binds: &ButtonBindings,
        repetition_enabled: bool,
        now: Instant,
    ) -> Vec<Intent> {
        let mut intents = Vec::new();

        // With repetition off every timer is disarmed up front, so a key
        // that was armed before the setting flipped cannot fire mid-hold.
        if !repetition_enabled {
            for timer in self.timers.values_mut() {
                *timer = RepeatTimer::Disarmed;
            }
        }

        self.scan_keys(keyboard, key_binds, repetition_enabled, now, &mut intents);

        match gamepad.read_state() {
            Ok(state) => {
                self.scan_buttons(&state, button_binds, repetition_enabled, now, &mut intents);
                self.scan_stick(&state, repetition_enabled, now, &mut intents);
                self.prev_gamepad = state;
            }
            // No controller in the slot: skip button and stick processing
            // entirely and keep the previous snapshot, so a reconnect does
            // not re-edge buttons that were already held.
            Err(_) => trace!("gamepad unavailable, skipping button/stick scan"),
        }

        if !intents.is_empty() {
            debug!(count = intents.len(), ?intents, "tick produced intents");
        }

        intents
    }

    fn scan_keys(
        &mut self,
        keyboard: &dyn KeyboardReader,
        key_binds: &KeyBindings,
        repetition_enabled: bool,
        now: Instant,
        intents: &mut Vec<Intent>,
    ) {
        for (&code, &intent) in key_binds {
            if code >= KEY_CODE_LIMIT {
                continue;
            }
            let down = keyboard.is_key_down(code);
            let was_down = self.held_keys[code as usize];

            if down && !was_down {
                self.arm_initial(intent, now);
                intents.push(intent);
            } else if repetition_enabled && down && self.repeat_elapsed(intent, now) {
                self.arm_repeat(intent, now);
                intents.push(intent);
            }

            self.held_keys[code as usize] = down;
        }
    }

    fn scan_buttons(
        &mut self,
        state: &GamepadState,
        button_binds: &ButtonBindings,
        repetition_enabled: bool,
        now: Instant,
        intents: &mut Vec<Intent>,
    ) {
        for (&button, &intent) in button_binds {
            let flag = button.flag();
            let down = state.buttons.contains(flag);
            let was_down = self.prev_gamepad.buttons.contains(flag);

            let mut emit = down && !was_down;
            if emit {
                self.arm_initial(intent, now);
            } else if repetition_enabled && down && self.repeat_elapsed(intent, now) {
                self.arm_repeat(intent, now);
                emit = true;
            }

            if emit {
                intents.push(intent);
            }
        }
    }

    /// Thresholds the left stick into the four digital directions, each
    /// evaluated independently so a diagonal push emits two intents.
    /// Crossing back under the threshold re-arms the edge (hysteresis).
    fn scan_stick(
        &mut self,
        state: &GamepadState,
        repetition_enabled: bool,
        now: Instant,
        intents: &mut Vec<Intent>,
    ) {
        let x_threshold = self.settings.x_threshold;
        let y_threshold = self.settings.y_threshold;

        let axes = [
            // (intent, deflected now, deflected on previous tick)
            (
                Intent::Left,
                state.left_x < -x_threshold,
                self.prev_gamepad.left_x < -x_threshold,
            ),
            (
                Intent::Right,
                state.left_x > x_threshold,
                self.prev_gamepad.left_x > x_threshold,
            ),
            (
                Intent::Down,
                state.left_y < -y_threshold,
                self.prev_gamepad.left_y < -y_threshold,
            ),
            (
                Intent::Up,
                state.left_y > y_threshold,
                self.prev_gamepad.left_y > y_threshold,
            ),
        ];

        for (intent, deflected, was_deflected) in axes {
            if deflected && !was_deflected {
                self.arm_initial(intent, now);
                intents.push(intent);
            } else if deflected && repetition_enabled && self.repeat_elapsed(intent, now) {
                self.arm_repeat(intent, now);
                intents.push(intent);
            }
        }
    }

    fn arm_initial(&mut self, intent: Intent, now: Instant) {
        if let Some(timer) = self.timers.get_mut(&intent) {
            *timer = RepeatTimer::Armed(now + self.settings.initial_repeat_delay);
        }
    }

    fn arm_repeat(&mut self, intent: Intent, now: Instant) {
        if let Some(timer) = self.timers.get_mut(&intent) {
            *timer = RepeatTimer::Armed(now + self.settings.repeat_delay);
        }
    }

    fn repeat_elapsed(&self, intent: Intent, now: Instant) -> bool {
        self.timers
            .get(&intent)
            .is_some_and(|timer| timer.has_elapsed(now))
    }
}
