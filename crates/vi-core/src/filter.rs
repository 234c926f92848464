//! Reference-counted acceptance filter table
//!
//! Several users on one bus may need frames with the same id (two requests
//! to one ECU, a signal read and a diagnostic response). The table keeps a
//! count per id and only touches the controller on the 0 → 1 and 1 → 0
//! transitions.

use tracing::debug;

use crate::controller::CanController;
use crate::error::{BusError, BusResult};

/// One installed filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterEntry {
    pub id: u32,
    pub ref_count: usize,
}

/// Filter table for a single bus, bounded by the controller's hardware slots
#[derive(Debug, Clone)]
pub struct AcceptanceFilters {
    bus: u8,
    capacity: usize,
    entries: Vec<FilterEntry>,
}

impl AcceptanceFilters {
    pub fn new(bus: u8, capacity: usize) -> Self {
        Self {
            bus,
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Take a reference on `id`, installing it if this is the first user
    pub fn add(&mut self, id: u32, controller: &mut dyn CanController) -> BusResult<()> {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) {
            entry.ref_count += 1;
            return Ok(());
        }

        if self.entries.len() >= self.capacity {
            return Err(BusError::FilterTableFull {
                bus: self.bus,
                capacity: self.capacity,
            });
        }

        controller.install_filter(id)?;
        self.entries.push(FilterEntry { id, ref_count: 1 });
        debug!(bus = self.bus, id = format!("0x{:X}", id), "Installed acceptance filter");
        Ok(())
    }

    /// Drop a reference on `id`, uninstalling it when nobody needs it
    pub fn remove(&mut self, id: u32, controller: &mut dyn CanController) -> BusResult<()> {
        let Some(index) = self.entries.iter().position(|entry| entry.id == id) else {
            debug!(bus = self.bus, id = format!("0x{:X}", id), "No acceptance filter to remove");
            return Ok(());
        };

        let entry = &mut self.entries[index];
        entry.ref_count -= 1;
        if entry.ref_count == 0 {
            self.entries.swap_remove(index);
            controller.uninstall_filter(id)?;
            debug!(bus = self.bus, id = format!("0x{:X}", id), "Removed acceptance filter");
        }
        Ok(())
    }

    /// Current number of users of `id` (0 when not installed)
    pub fn ref_count(&self, id: u32) -> usize {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map_or(0, |entry| entry.ref_count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
