//! The background scan loop and its public handle.
//!
//! [`InputHandle::spawn`] validates the persisted bindings, spawns the scan
//! task and returns the one object consumers talk to. The task snapshots
//! the bindings (outer loop), then ticks the [`Translator`] at a fixed
//! cadence and feeds the [`IntentQueue`] (inner loop) until a rebind or
//! shutdown flag is raised.
//!
//! ```text
//! DeviceReaders ──► Translator ──► IntentQueue ──► consumer
//!                      ▲                              │
//!                      └── bindings snapshot ◄── rebind calls
//! ```
//!
//! Rebinds never lock against the hot path: the handle swaps the maps under
//! a mutex the loop only takes once per outer pass (to clone a snapshot),
//! and signals the change with an atomic flag.

use crate::bindings::{
    default_button_binds, default_key_binds, is_complete, ButtonBindings, KeyBindings,
};
use crate::device::{GamepadReader, KeyboardReader};
use crate::intent::Intent;
use crate::queue::{IntentQueue, DEFAULT_CAPACITY};
use crate::store::{BindingStore, StoreError, StoredBindings};
use crate::translator::{RepeatSettings, Translator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Policy knobs for the scan loop.
///
/// The defaults reproduce the tuning the pipeline shipped with for years;
/// all of them are meant to become user-configurable.
#[derive(Clone, Copy, Debug)]
pub struct ScanSettings {
    /// Sleep between ticks. Bounds CPU usage and sets the floor for input
    /// latency and repeat-cadence resolution.
    pub poll_interval: Duration,
    /// Maximum number of queued-but-unconsumed intents.
    pub queue_capacity: usize,
    /// Repeat timing and stick thresholds, passed through to the translator.
    pub repeat: RepeatSettings,
    /// Whether held repeatable inputs re-fire at all. Mutable at runtime
    /// via [`InputHandle::set_key_repetition`].
    pub key_repetition: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5),
            queue_capacity: DEFAULT_CAPACITY,
            repeat: RepeatSettings::default(),
            key_repetition: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("binding store error: {0}")]
    Store(#[from] StoreError),
}

/// State shared between the handle and the scan task.
struct Shared {
    key_binds: Mutex<KeyBindings>,
    button_binds: Mutex<ButtonBindings>,
    /// Raised by rebind calls; the inner loop exits and re-snapshots.
    binds_changed: AtomicBool,
    /// Cleared by [`InputHandle::shutdown`]; ends the task.
    running: AtomicBool,
    /// The externally owned "repetition enabled" flag, read every tick.
    key_repetition: AtomicBool,
}

/// Handle to the input pipeline: the single consumer-facing API.
///
/// Exactly one background producer exists per handle. All methods are safe
/// to call from the consumer/UI thread while the scan task runs.
pub struct InputHandle {
    queue: Arc<IntentQueue>,
    shared: Arc<Shared>,
    store: Arc<dyn BindingStore>,
}

impl InputHandle {
    /// Loads and validates bindings, then spawns the scan task.
    ///
    /// A missing or incomplete persisted map is replaced by the hardcoded
    /// defaults, which are persisted back so the store converges to a valid
    /// state. Persist failures are logged and otherwise ignored; startup
    /// only fails when the store itself errors on load.
    pub fn spawn(
        settings: Option<ScanSettings>,
        keyboard: Arc<dyn KeyboardReader>,
        gamepad: Arc<dyn GamepadReader>,
        store: Arc<dyn BindingStore>,
    ) -> Result<Self, InputError> {
        let settings = settings.unwrap_or_default();
        info!(?settings, "spawning input scan loop");

        let persisted = store.load()?;
        let (key_binds, button_binds) = validated_or_defaults(persisted, store.as_ref());

        let shared = Arc::new(Shared {
            key_binds: Mutex::new(key_binds),
            button_binds: Mutex::new(button_binds),
            binds_changed: AtomicBool::new(false),
            running: AtomicBool::new(true),
            key_repetition: AtomicBool::new(settings.key_repetition),
        });
        let queue = Arc::new(IntentQueue::new(settings.queue_capacity));

        let task_shared = shared.clone();
        let task_queue = queue.clone();
        tokio::spawn(async move {
            scan_loop(settings, task_shared, task_queue, keyboard, gamepad).await;
            info!("input scan loop terminated");
        });

        Ok(Self {
            queue,
            shared,
            store,
        })
    }

    /// Pops the oldest pending intent, or [`Intent::None`] when nothing is
    /// queued. Non-blocking; meant to be polled every frame.
    pub fn current_intent(&self) -> Intent {
        self.queue.pop()
    }

    /// Drops all pending intents. Call when entering a context where
    /// buffered input would be stale (e.g. opening a new menu).
    pub fn clear_intents(&self) {
        self.queue.clear();
    }

    /// Replaces the keyboard map, reloads the scan loop and persists.
    pub fn update_keyboard_binds(&self, key_binds: KeyBindings) {
        let key_binds = accept_or_default(key_binds, default_key_binds, "keyboard");
        *lock(&self.shared.key_binds) = key_binds;
        self.commit_rebind();
    }

    /// Replaces the controller map, reloads the scan loop and persists.
    pub fn update_controller_binds(&self, button_binds: ButtonBindings) {
        let button_binds = accept_or_default(button_binds, default_button_binds, "controller");
        *lock(&self.shared.button_binds) = button_binds;
        self.commit_rebind();
    }

    /// Replaces both maps in one rebind pass.
    pub fn update_input_binds(&self, key_binds: KeyBindings, button_binds: ButtonBindings) {
        let key_binds = accept_or_default(key_binds, default_key_binds, "keyboard");
        let button_binds = accept_or_default(button_binds, default_button_binds, "controller");
        *lock(&self.shared.key_binds) = key_binds;
        *lock(&self.shared.button_binds) = button_binds;
        self.commit_rebind();
    }

    /// Flips the global key-repetition flag; takes effect next tick.
    pub fn set_key_repetition(&self, enabled: bool) {
        self.shared.key_repetition.store(enabled, Ordering::Relaxed);
    }

    pub fn key_repetition(&self) -> bool {
        self.shared.key_repetition.load(Ordering::Relaxed)
    }

    /// Current keyboard map (a copy).
    pub fn keyboard_binds(&self) -> KeyBindings {
        lock(&self.shared.key_binds).clone()
    }

    /// Current controller map (a copy).
    pub fn controller_binds(&self) -> ButtonBindings {
        lock(&self.shared.button_binds).clone()
    }

    /// Stops the scan task; it exits within one poll interval.
    pub fn shutdown(&self) {
        info!("shutting down input scan loop");
        self.shared.running.store(false, Ordering::Relaxed);
    }

    fn commit_rebind(&self) {
        self.shared.binds_changed.store(true, Ordering::Release);

        let bindings = StoredBindings {
            key_binds: lock(&self.shared.key_binds).clone(),
            button_binds: lock(&self.shared.button_binds).clone(),
        };
        // Persistence is best-effort: a failed write never blocks rebinding.
        if let Err(e) = self.store.save(&bindings) {
            warn!("failed to persist bindings: {e}");
        }
    }
}

impl Drop for InputHandle {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Relaxed);
    }
}

/// The background task. Outer loop per binding generation, inner loop per
/// tick; the only suspension point is the end-of-tick sleep.
async fn scan_loop(
    settings: ScanSettings,
    shared: Arc<Shared>,
    queue: Arc<IntentQueue>,
    keyboard: Arc<dyn KeyboardReader>,
    gamepad: Arc<dyn GamepadReader>,
) {
    let mut translator = Translator::new(settings.repeat);

    while shared.running.load(Ordering::Relaxed) {
        // Clear the flag before snapshotting: a rebind that lands while we
        // copy the maps re-raises it and forces another restart instead of
        // being lost. Snapshots mean rebinds never mutate what we iterate.
        shared.binds_changed.store(false, Ordering::Release);
        let key_binds = lock(&shared.key_binds).clone();
        let button_binds = lock(&shared.button_binds).clone();

        // A rebind invalidates whatever was queued under the old maps.
        queue.clear();
        debug!(
            keys = key_binds.len(),
            buttons = button_binds.len(),
            "scan loop (re)started with fresh binding snapshot"
        );

        while !shared.binds_changed.load(Ordering::Acquire)
            && shared.running.load(Ordering::Relaxed)
        {
            let repetition = shared.key_repetition.load(Ordering::Relaxed);
            let intents = translator.tick(
                keyboard.as_ref(),
                gamepad.as_ref(),
                &key_binds,
                &button_binds,
                repetition,
                Instant::now(),
            );

            for intent in intents {
                queue.push(intent);
            }

            tokio::time::sleep(settings.poll_interval).await;
        }
    }
}

/// Startup validation: incomplete or absent maps fall back to defaults,
/// and any fallback is persisted so the next start loads a complete set.
fn validated_or_defaults(
    persisted: Option<StoredBindings>,
    store: &dyn BindingStore,
) -> (KeyBindings, ButtonBindings) {
    let persisted = persisted.unwrap_or_default();

    let key_binds = accept_or_default(persisted.key_binds, default_key_binds, "keyboard");
    let button_binds = accept_or_default(persisted.button_binds, default_button_binds, "controller");

    let validated = StoredBindings {
        key_binds: key_binds.clone(),
        button_binds: button_binds.clone(),
    };
    if let Err(e) = store.save(&validated) {
        warn!("failed to persist validated bindings: {e}");
    }

    (key_binds, button_binds)
}

/// Completeness gate: every intent except `None` must be bound at least
/// once, otherwise the whole candidate map is replaced by the defaults.
fn accept_or_default<K, F>(
    candidate: std::collections::HashMap<K, Intent>,
    defaults: F,
    domain: &str,
) -> std::collections::HashMap<K, Intent>
where
    F: FnOnce() -> std::collections::HashMap<K, Intent>,
{
    if is_complete(&candidate) {
        candidate
    } else {
        warn!(domain, "incomplete binding map, substituting defaults");
        defaults()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::keys;
    use crate::store::MemoryBindingStore;

    #[test]
    fn incomplete_candidate_is_replaced_by_defaults() {
        let incomplete: KeyBindings =
            std::collections::HashMap::from([(keys::VK_UP, Intent::Up)]);
        let accepted = accept_or_default(incomplete, default_key_binds, "keyboard");
        assert_eq!(accepted, default_key_binds());
    }

    #[test]
    fn complete_candidate_is_kept_verbatim() {
        let mut candidate = default_key_binds();
        candidate.insert(0x20, Intent::Confirm); // extra key, still complete
        let accepted = accept_or_default(candidate.clone(), default_key_binds, "keyboard");
        assert_eq!(accepted, candidate);
    }

    #[test]
    fn startup_fallback_persists_defaults() {
        let store = MemoryBindingStore::empty();
        let (key_binds, button_binds) = validated_or_defaults(None, &store);

        assert_eq!(key_binds, default_key_binds());
        assert_eq!(button_binds, default_button_binds());

        let saved = store.saved().expect("defaults were not persisted");
        assert_eq!(saved.key_binds, key_binds);
        assert_eq!(saved.button_binds, button_binds);
    }

    #[test]
    fn startup_keeps_complete_persisted_maps() {
        let mut key_binds = default_key_binds();
        key_binds.remove(&keys::VK_F4);
        key_binds.insert(0x7B, Intent::Info4); // F12 instead of F4

        let persisted = StoredBindings {
            key_binds: key_binds.clone(),
            button_binds: default_button_binds(),
        };
        let store = MemoryBindingStore::empty();
        let (loaded_keys, _) = validated_or_defaults(Some(persisted), &store);
        assert_eq!(loaded_keys, key_binds);
    }
}
