//! vi-core - CAN bus collaborators for the vehicle interface firmware
//!
//! Provides the narrow interfaces the diagnostic and signal layers are
//! written against:
//!
//! - [`CanMessage`] / [`OutgoingFrame`] - frame representations
//! - [`CanBus`] / [`CanBusSet`] - per-bus write queue and acceptance filters
//! - [`CanController`] - platform driver seam, with [`MockController`] for tests
//! - [`FrequencyClock`] / [`TimeSource`] - polled interval clocks

pub mod bus;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod message;
pub mod queue;

pub use bus::{CanBus, CanBusSet};
pub use clock::{FrequencyClock, ManualClock, MonotonicClock, TimeSource};
pub use config::{BusConfig, BusSetConfig};
pub use controller::{CanController, MockController};
pub use error::{BusError, BusResult};
pub use filter::{AcceptanceFilters, FilterEntry};
pub use message::{CanMessage, OutgoingFrame, CAN_MESSAGE_SIZE};
pub use queue::WriteQueue;
