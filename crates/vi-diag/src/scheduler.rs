//! Request scheduling
//!
//! Each call to [`DiagnosticsManager::send_requests`] first recycles
//! completed requests, then transmits every request on the bus that is due
//! and whose arbitration id has no other request in flight.

use tracing::{debug, warn};
use vi_core::CanBusSet;

use crate::filters;
use crate::manager::DiagnosticsManager;
use crate::pool::SlotId;
use crate::request::DIAGNOSTIC_RESPONSE_TIMEOUT_HZ;

impl DiagnosticsManager {
    /// Run one scheduling tick for `bus`
    pub fn send_requests(&mut self, buses: &mut CanBusSet, bus: u8) {
        self.cleanup_active_requests(buses);

        let Some(target) = buses.lookup_mut(bus) else {
            debug!(bus, "No bus to send diagnostic requests on");
            return;
        };

        let order: Vec<SlotId> = self
            .pool
            .nonrecurring_ids()
            .into_iter()
            .chain(self.pool.recurring_ids())
            .collect();

        for id in order {
            let now = self.time.now_ms();
            let due = match self.pool.get_mut(id) {
                Some(active) => active.bus == bus && active.should_send(now),
                None => false,
            };
            if !due || !self.clear_to_send(id) {
                continue;
            }

            let Some(active) = self.pool.get_mut(id) else {
                continue;
            };
            active.frequency_clock.tick(now);
            match active.handle.start(target) {
                Ok(()) => {
                    active.timeout_clock.frequency_hz = DIAGNOSTIC_RESPONSE_TIMEOUT_HZ;
                    active.timeout_clock.reset();
                    active.timeout_clock.tick(now);
                    active.in_flight = true;
                }
                Err(e) => {
                    warn!(bus, request = %active.request(), error = %e, "Unable to send diagnostic request");
                }
            }
        }
    }

    /// Whether no other request on the same bus and id is in flight
    pub(crate) fn clear_to_send(&self, id: SlotId) -> bool {
        let Some(candidate) = self.pool.get(id) else {
            return false;
        };
        let arbitration_id = candidate.request().arbitration_id;

        let conflict = self.pool.iter_active().find(|(other_id, other)| {
            *other_id != id
                && other.in_flight
                && other.bus == candidate.bus
                && other.request().arbitration_id == arbitration_id
        });
        if let Some((_, other)) = conflict {
            debug!(
                bus = candidate.bus,
                id = format!("0x{:X}", arbitration_id),
                other = %other.request(),
                "Another request is in flight on the same id, deferring"
            );
            return false;
        }
        true
    }

    /// Recycle in-flight requests that have completed or timed out.
    ///
    /// Recurring requests go to the tail of the queue; one-shot requests are
    /// freed along with their filters.
    pub(crate) fn cleanup_active_requests(&mut self, buses: &mut CanBusSet) {
        let now = self.time.now_ms();
        let order: Vec<SlotId> = self
            .pool
            .nonrecurring_ids()
            .into_iter()
            .chain(self.pool.recurring_ids())
            .collect();

        for id in order {
            let Some(active) = self.pool.get_mut(id) else {
                continue;
            };
            if !active.in_flight || !active.is_completed(now) {
                continue;
            }

            active.in_flight = false;
            if active.recurring {
                self.pool.requeue_recurring(id);
            } else {
                debug!(bus = active.bus, request = %active.request(), "Completed diagnostic request, freeing slot");
                self.free_slot(buses, id);
            }
        }
    }

    /// Release a slot and its response filters
    pub(crate) fn free_slot(&mut self, buses: &mut CanBusSet, id: SlotId) {
        let Some(active) = self.pool.release(id) else {
            return;
        };
        match buses.lookup_mut(active.bus) {
            Some(bus) => filters::release(bus, active.request().arbitration_id),
            None => warn!(bus = active.bus, "Bus for released request is gone, filters not removed"),
        }
    }
}
