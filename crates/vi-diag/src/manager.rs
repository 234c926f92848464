//! Diagnostics manager: adds, updates and cancels requests
//!
//! The manager owns the request pool and nothing else; buses are passed in
//! by the caller on every call. Scheduling lives in [`crate::scheduler`],
//! response handling in [`crate::matcher`].

use std::sync::Arc;

use tracing::{debug, info};
use vi_core::{CanBusSet, TimeSource};

use crate::config::DiagnosticsConfig;
use crate::error::{DiagResult, DiagnosticError};
use crate::filters;
use crate::pool::RequestPool;
use crate::protocol::{DiagnosticRequest, MAX_ARBITRATION_ID};
use crate::request::{ActiveRequest, RequestOptions, MAX_RECURRING_DIAGNOSTIC_FREQUENCY_HZ};

pub struct DiagnosticsManager {
    pub(crate) pool: RequestPool,
    pub(crate) time: Arc<dyn TimeSource>,
    max_generic_name_length: usize,
    /// Bus the OBD-II PID helpers query; unset disables them
    obd2_bus: Option<u8>,
}

impl std::fmt::Debug for DiagnosticsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticsManager")
            .field("pool", &self.pool)
            .field("obd2_bus", &self.obd2_bus)
            .finish()
    }
}

impl DiagnosticsManager {
    pub fn new(config: &DiagnosticsConfig, time: Arc<dyn TimeSource>) -> Self {
        Self {
            pool: RequestPool::new(config.max_simultaneous_requests),
            time,
            max_generic_name_length: config.max_generic_name_length,
            obd2_bus: config.obd2_bus,
        }
    }

    /// Bind the manager to a bus set and clear every request
    pub fn initialize(&mut self, buses: &CanBusSet, obd2_bus: Option<u8>) -> DiagResult<()> {
        if let Some(address) = obd2_bus {
            if buses.lookup(address).is_none() {
                return Err(DiagnosticError::UnknownBus(address));
            }
        }
        self.obd2_bus = obd2_bus;
        self.reset();
        info!(buses = buses.len(), "Initialized diagnostics");
        Ok(())
    }

    /// Return every slot to the free list.
    ///
    /// Filters held by active requests are left installed.
    pub fn reset(&mut self) {
        self.pool.reset();
        debug!("Reset diagnostics requests");
    }

    /// Bus reserved for OBD-II PID polling, validated by [`Self::initialize`]
    pub fn obd2_bus(&self) -> Option<u8> {
        self.obd2_bus
    }

    pub fn pool(&self) -> &RequestPool {
        &self.pool
    }

    /// Add a request, or update the recurring request already sending it.
    ///
    /// A new request takes a free slot and installs its response filters;
    /// an update keeps the slot and its filters, replaces everything else and
    /// moves it to the head of the recurring queue.
    pub fn add_request(
        &mut self,
        buses: &mut CanBusSet,
        bus: u8,
        request: DiagnosticRequest,
        options: RequestOptions,
    ) -> DiagResult<()> {
        if options.frequency_hz.is_nan() || options.frequency_hz < 0.0 {
            debug!(frequency = options.frequency_hz, "Rejecting invalid recurring frequency");
            return Err(DiagnosticError::InvalidFrequency(options.frequency_hz));
        }
        if options.frequency_hz > MAX_RECURRING_DIAGNOSTIC_FREQUENCY_HZ {
            debug!(
                frequency = options.frequency_hz,
                max = MAX_RECURRING_DIAGNOSTIC_FREQUENCY_HZ,
                "Requested recurring frequency is higher than maximum"
            );
            return Err(DiagnosticError::FrequencyTooHigh {
                frequency: options.frequency_hz,
                max: MAX_RECURRING_DIAGNOSTIC_FREQUENCY_HZ,
            });
        }
        if request.arbitration_id > MAX_ARBITRATION_ID {
            return Err(DiagnosticError::InvalidArbitrationId(request.arbitration_id));
        }
        request.encode()?;
        if buses.lookup(bus).is_none() {
            return Err(DiagnosticError::UnknownBus(bus));
        }

        self.cleanup_active_requests(buses);

        let active = ActiveRequest::new(bus, request, options, self.max_generic_name_length);

        if active.recurring {
            if let Some(id) = self.pool.find_recurring(bus, active.request()) {
                debug!(bus, request = %active.request(), "Updating existing recurring request");
                self.pool.update_recurring(id, active);
                return Ok(());
            }
        }

        if self.pool.free_count() == 0 {
            debug!(
                capacity = self.pool.capacity(),
                "Unable to allocate space for a new diagnostic request"
            );
            return Err(DiagnosticError::PoolExhausted {
                capacity: self.pool.capacity(),
            });
        }

        let target = buses.require_mut(bus)?;
        let arbitration_id = active.request().arbitration_id;
        filters::acquire(target, arbitration_id)?;

        debug!(bus, request = %active.request(), recurring = active.recurring, "Added diagnostic request");
        if self.pool.insert(active).is_none() {
            filters::release(target, arbitration_id);
            return Err(DiagnosticError::PoolExhausted {
                capacity: self.pool.capacity(),
            });
        }
        Ok(())
    }

    /// Add a request re-sent at `frequency_hz` until cancelled
    pub fn add_recurring_request(
        &mut self,
        buses: &mut CanBusSet,
        bus: u8,
        request: DiagnosticRequest,
        frequency_hz: f64,
        options: RequestOptions,
    ) -> DiagResult<()> {
        self.add_request(buses, bus, request, options.with_frequency(frequency_hz))
    }

    /// Stop a recurring request, freeing its slot and filters immediately.
    ///
    /// Returns false if no recurring request matches.
    pub fn cancel_recurring_request(
        &mut self,
        buses: &mut CanBusSet,
        bus: u8,
        request: &DiagnosticRequest,
    ) -> bool {
        let Some(id) = self.pool.find_recurring(bus, request) else {
            debug!(bus, request = %request, "No recurring request to cancel");
            return false;
        };
        self.free_slot(buses, id);
        true
    }
}
