//! Mock controller for testing

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::CanController;
use crate::error::{BusError, BusResult};
use crate::message::OutgoingFrame;

#[derive(Debug, Default)]
struct MockState {
    sent: Vec<OutgoingFrame>,
    installed: Vec<u32>,
    install_log: Vec<u32>,
    uninstall_log: Vec<u32>,
    rejected_filters: HashSet<u32>,
    reject_sends: bool,
}

/// In-memory controller; clones share the recorded state
#[derive(Debug, Clone, Default)]
pub struct MockController {
    state: Arc<Mutex<MockState>>,
}

impl MockController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every frame written so far, oldest first
    pub fn sent_frames(&self) -> Vec<OutgoingFrame> {
        self.state.lock().sent.clone()
    }

    /// Remove and return the frames written so far
    pub fn take_sent(&self) -> Vec<OutgoingFrame> {
        std::mem::take(&mut self.state.lock().sent)
    }

    /// Filter ids currently installed in the "hardware"
    pub fn installed_filters(&self) -> Vec<u32> {
        self.state.lock().installed.clone()
    }

    /// Number of times `id` was uninstalled
    pub fn uninstall_count(&self, id: u32) -> usize {
        self.state
            .lock()
            .uninstall_log
            .iter()
            .filter(|&&logged| logged == id)
            .count()
    }

    /// Number of times `id` was installed
    pub fn install_count(&self, id: u32) -> usize {
        self.state
            .lock()
            .install_log
            .iter()
            .filter(|&&logged| logged == id)
            .count()
    }

    /// Make future installs of `id` fail
    pub fn reject_filter(&self, id: u32) {
        self.state.lock().rejected_filters.insert(id);
    }

    /// Make every future send fail (or succeed again)
    pub fn set_reject_sends(&self, reject: bool) {
        self.state.lock().reject_sends = reject;
    }
}

impl CanController for MockController {
    fn send(&mut self, frame: &OutgoingFrame) -> BusResult<()> {
        let mut state = self.state.lock();
        if state.reject_sends {
            return Err(BusError::Controller("transmit buffer unavailable".to_string()));
        }
        tracing::debug!(id = frame.id, data = ?frame.payload(), "Mock controller: sent frame");
        state.sent.push(*frame);
        Ok(())
    }

    fn install_filter(&mut self, id: u32) -> BusResult<()> {
        let mut state = self.state.lock();
        if state.rejected_filters.contains(&id) {
            return Err(BusError::Controller(format!("filter 0x{:X} rejected", id)));
        }
        state.install_log.push(id);
        state.installed.push(id);
        Ok(())
    }

    fn uninstall_filter(&mut self, id: u32) -> BusResult<()> {
        let mut state = self.state.lock();
        state.uninstall_log.push(id);
        state.installed.retain(|&installed| installed != id);
        Ok(())
    }
}
