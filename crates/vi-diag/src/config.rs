//! Diagnostics configuration
//!
//! ```toml
//! max_simultaneous_requests = 20
//! obd2_bus = 1
//!
//! [[buses]]
//! address = 1
//! raw_writable = true
//! ```

use serde::{Deserialize, Serialize};
use vi_core::{BusConfig, CanBusSet, CanController};

use crate::error::DiagResult;

/// Configuration for a [`crate::DiagnosticsManager`] and the buses it drives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Request slots available to the pool
    #[serde(default = "default_max_simultaneous_requests")]
    pub max_simultaneous_requests: usize,
    /// Generic names are truncated to this many characters
    #[serde(default = "default_max_generic_name_length")]
    pub max_generic_name_length: usize,
    /// Bus the OBD-II helpers target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obd2_bus: Option<u8>,
    /// CAN buses
    #[serde(default)]
    pub buses: Vec<BusConfig>,
}

fn default_max_simultaneous_requests() -> usize {
    20
}

fn default_max_generic_name_length() -> usize {
    40
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_simultaneous_requests: default_max_simultaneous_requests(),
            max_generic_name_length: default_max_generic_name_length(),
            obd2_bus: None,
            buses: Vec::new(),
        }
    }
}

impl DiagnosticsConfig {
    pub fn from_toml(text: &str) -> DiagResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn with_max_simultaneous_requests(mut self, max: usize) -> Self {
        self.max_simultaneous_requests = max;
        self
    }

    pub fn with_bus(mut self, bus: BusConfig) -> Self {
        self.buses.push(bus);
        self
    }

    pub fn with_obd2_bus(mut self, address: u8) -> Self {
        self.obd2_bus = Some(address);
        self
    }

    /// Build the configured buses, asking `make_controller` for each driver
    pub fn build_buses<F>(&self, make_controller: F) -> CanBusSet
    where
        F: FnMut(&BusConfig) -> Box<dyn CanController>,
    {
        CanBusSet::from_config(&self.buses, make_controller)
    }
}
