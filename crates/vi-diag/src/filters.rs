//! Response acceptance filters for diagnostic requests
//!
//! A new request needs the bus to admit its responses: the physical response
//! id, or the whole functional response range for a broadcast. Filters are
//! reference counted by the bus, so releasing only drops this request's hold.

use std::ops::RangeInclusive;

use tracing::debug;
use vi_core::CanBus;

use crate::error::{DiagResult, DiagnosticError};
use crate::protocol::{
    DIAGNOSTIC_RESPONSE_ARBITRATION_ID_OFFSET, OBD2_FUNCTIONAL_BROADCAST_ID,
    OBD2_FUNCTIONAL_RESPONSE_COUNT, OBD2_FUNCTIONAL_RESPONSE_START,
};

/// Ids a request to `arbitration_id` needs filters for
pub fn response_filter_ids(arbitration_id: u32) -> RangeInclusive<u32> {
    if arbitration_id == OBD2_FUNCTIONAL_BROADCAST_ID {
        OBD2_FUNCTIONAL_RESPONSE_START..=OBD2_FUNCTIONAL_RESPONSE_START + OBD2_FUNCTIONAL_RESPONSE_COUNT - 1
    } else {
        let id = arbitration_id.saturating_add(DIAGNOSTIC_RESPONSE_ARBITRATION_ID_OFFSET);
        id..=id
    }
}

/// Install every response filter, or none of them
pub fn acquire(bus: &mut CanBus, arbitration_id: u32) -> DiagResult<()> {
    let ids = response_filter_ids(arbitration_id);
    let start = *ids.start();

    for id in ids {
        if !bus.add_acceptance_filter(id) {
            debug!(
                bus = bus.address,
                id = format!("0x{:X}", id),
                "Couldn't add filter, rolling back this request's filters"
            );
            for installed in start..id {
                bus.remove_acceptance_filter(installed);
            }
            return Err(DiagnosticError::FilterInstallFailed {
                bus: bus.address,
                id,
            });
        }
    }
    Ok(())
}

/// Drop this request's hold on its response filters
pub fn release(bus: &mut CanBus, arbitration_id: u32) {
    for id in response_filter_ids(arbitration_id) {
        bus.remove_acceptance_filter(id);
    }
}
