//! Device scanners - pluggable location-tracking platforms.
//!
//! A scanner subscribes to device topics on the message bus and turns the
//! payloads it receives into device tracker entity updates.
//!
//! # Architecture
//!
//! ```text
//! [[device_tracker]] blocks (TOML)
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       ScannerHost                        │
//! │  - Look up scanner by platform name      │
//! │  - Validate config (QoS default)         │
//! │  - Call setup_scanner                    │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       Scanner (implements trait)         │
//! │  - Subscribe one topic per device        │
//! │  - Parse payloads                        │
//! │  - Report positions (DeviceTracker::see) │
//! └─────────────────────────────────────────┘
//!          ↓
//!   device_tracker.<dev_id> entity state
//! ```
//!
//! # Core Types
//!
//! - [`Scanner`] - Trait that all platforms implement
//! - [`ScannerContext`] - Bus and tracker handed to each scanner
//! - [`ScannerHost`] - Registry plus component setup

pub mod host;
pub mod registry;
mod scanner;
pub mod scanners;

pub use host::{PlatformStatus, ScannerHost, SetupReport};
pub use scanner::{Scanner, ScannerContext};
