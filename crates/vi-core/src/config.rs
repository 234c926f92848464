//! CAN bus configuration

use serde::{Deserialize, Serialize};

use crate::error::BusResult;

/// Configuration for one CAN bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Bus address (1-based, as used in commands and relayed messages)
    pub address: u8,
    /// Bitrate in bits per second
    #[serde(default = "default_speed")]
    pub speed: u32,
    /// Whether raw writes (including diagnostic requests) are allowed
    #[serde(default)]
    pub raw_writable: bool,
    /// Outgoing frames buffered before `enqueue_message` starts failing
    #[serde(default = "default_write_queue_capacity")]
    pub write_queue_capacity: usize,
    /// Hardware acceptance filter slots
    #[serde(default = "default_max_acceptance_filters")]
    pub max_acceptance_filters: usize,
}

fn default_speed() -> u32 {
    500000
}

fn default_write_queue_capacity() -> usize {
    10
}

fn default_max_acceptance_filters() -> usize {
    32
}

impl BusConfig {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            speed: default_speed(),
            raw_writable: false,
            write_queue_capacity: default_write_queue_capacity(),
            max_acceptance_filters: default_max_acceptance_filters(),
        }
    }

    pub fn raw_writable(mut self, raw_writable: bool) -> Self {
        self.raw_writable = raw_writable;
        self
    }

    pub fn with_write_queue_capacity(mut self, capacity: usize) -> Self {
        self.write_queue_capacity = capacity;
        self
    }

    pub fn with_max_acceptance_filters(mut self, max: usize) -> Self {
        self.max_acceptance_filters = max;
        self
    }
}

/// A list of buses, as it appears in a TOML file
///
/// ```toml
/// [[buses]]
/// address = 1
/// speed = 500000
/// raw_writable = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusSetConfig {
    #[serde(default)]
    pub buses: Vec<BusConfig>,
}

impl BusSetConfig {
    pub fn from_toml(text: &str) -> BusResult<Self> {
        Ok(toml::from_str(text)?)
    }
}
