//! Unified keyboard/gamepad input layer for accessibility-focused apps.
//!
//! A background scan loop polls two host-supplied device capabilities,
//! translates raw state into semantic [`Intent`]s (edge detection, key
//! repeat, analog-stick thresholding with hysteresis) and hands them to a
//! single consumer through a bounded queue.
//!
//! ```text
//! KeyboardReader ─┐
//!                 ├─► Translator ─► IntentQueue ─► InputHandle::current_intent()
//! GamepadReader ──┘       ▲
//!                         └─ bindings (validated, persisted, rebindable)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use intentflow::{Intent, InputHandle};
//! use intentflow::device::mock::{MockGamepad, MockKeyboard};
//! use intentflow::store::MemoryBindingStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = InputHandle::spawn(
//!     None,
//!     Arc::new(MockKeyboard::new()),
//!     Arc::new(MockGamepad::new()),
//!     Arc::new(MemoryBindingStore::empty()),
//! )?;
//!
//! loop {
//!     match handle.current_intent() {
//!         Intent::None => tokio::time::sleep(std::time::Duration::from_millis(5)).await,
//!         intent => println!("user intent: {intent}"),
//!     }
//! }
//! # }
//! ```

pub mod bindings;
pub mod capture;
pub mod device;
pub mod intent;
pub mod queue;
pub mod scanner;
pub mod store;
pub mod translator;

pub use bindings::{ButtonBindings, GamepadButton, GamepadButtons, KeyBindings, KeyCode};
pub use capture::{Capture, CaptureOptions, CapturedInput};
pub use device::{GamepadReader, GamepadState, GamepadUnavailable, KeyboardReader};
pub use intent::Intent;
pub use queue::IntentQueue;
pub use scanner::{InputError, InputHandle, ScanSettings};
pub use store::{BindingStore, MemoryBindingStore, StoredBindings, TomlBindingStore};
pub use translator::{RepeatSettings, Translator};
