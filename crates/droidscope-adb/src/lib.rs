//! Android device bridge client for droidscope
//!
//! This crate wraps the `adb` executable: streaming logcat output, clearing
//! the device log buffer, and listing device processes.

mod bridge;
mod client;
mod error;

pub use bridge::{DeviceBridge, LogStreamHandle};
pub use client::AdbBridge;
pub use error::BridgeError;
