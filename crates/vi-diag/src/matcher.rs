//! Routing inbound frames to the requests awaiting them

use tracing::{debug, warn};
use vi_core::{CanBusSet, CanMessage};

use crate::manager::DiagnosticsManager;
use crate::pool::SlotId;
use crate::relay::{relay_response, Pipeline};

impl DiagnosticsManager {
    /// Offer one frame received on `bus` to every in-flight request there.
    ///
    /// Recurring requests see the frame first. Completed responses are
    /// relayed, and completed requests are recycled before returning.
    pub fn receive_can_message(
        &mut self,
        buses: &mut CanBusSet,
        bus: u8,
        message: &CanMessage,
        pipeline: &mut dyn Pipeline,
    ) {
        let Some(source) = buses.lookup_mut(bus) else {
            debug!(bus, "Frame from unknown bus, ignoring");
            return;
        };

        let bytes = message.bytes();
        let data = &bytes[..message.effective_length() as usize];

        let order: Vec<SlotId> = self
            .pool
            .recurring_ids()
            .into_iter()
            .chain(self.pool.nonrecurring_ids())
            .collect();

        for id in order {
            let Some(active) = self.pool.get_mut(id) else {
                continue;
            };
            if active.bus != bus || !active.in_flight {
                continue;
            }

            let response = active.handle.receive_frame(source, message.id, data);
            if response.completed && active.handle.completed() {
                if active.handle.success() {
                    relay_response(active, &response, pipeline);
                } else {
                    warn!(
                        bus,
                        request = %active.request(),
                        "Fatal error sending or receiving diagnostic request"
                    );
                }
            }
        }

        self.cleanup_active_requests(buses);
    }
}
