//! CAN bus handle: write queue, acceptance filters and the controller driver

use std::fmt;

use tracing::{debug, warn};

use crate::config::BusConfig;
use crate::controller::CanController;
use crate::error::{BusError, BusResult};
use crate::filter::AcceptanceFilters;
use crate::message::{CanMessage, OutgoingFrame};
use crate::queue::WriteQueue;

/// One CAN bus and everything the firmware keeps per bus
pub struct CanBus {
    pub address: u8,
    pub speed: u32,
    pub raw_writable: bool,
    queue: WriteQueue,
    filters: AcceptanceFilters,
    controller: Box<dyn CanController>,
}

impl fmt::Debug for CanBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanBus")
            .field("address", &self.address)
            .field("speed", &self.speed)
            .field("raw_writable", &self.raw_writable)
            .field("queued", &self.queue.len())
            .field("filters", &self.filters)
            .finish()
    }
}

impl CanBus {
    pub fn new(config: &BusConfig, controller: Box<dyn CanController>) -> Self {
        Self {
            address: config.address,
            speed: config.speed,
            raw_writable: config.raw_writable,
            queue: WriteQueue::new(config.write_queue_capacity),
            filters: AcceptanceFilters::new(config.address, config.max_acceptance_filters),
            controller,
        }
    }

    /// Queue a message for the next `process_write_queue`.
    ///
    /// The payload is converted to wire byte order and a zero length is
    /// treated as a full 8-byte frame. A full queue drops the message.
    pub fn enqueue_message(&mut self, message: &CanMessage) -> BusResult<()> {
        let frame = OutgoingFrame::from(message);
        self.queue.try_push(frame).map_err(|frame| {
            debug!(bus = self.address, id = format!("0x{:X}", frame.id), "Write queue full, dropping frame");
            BusError::QueueFull {
                bus: self.address,
                id: frame.id,
            }
        })
    }

    /// Hand every queued frame to the controller, returning how many went out
    pub fn process_write_queue(&mut self) -> usize {
        let mut sent = 0;
        while let Some(frame) = self.queue.pop() {
            match self.controller.send(&frame) {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!(bus = self.address, id = format!("0x{:X}", frame.id), error = %e, "Unable to send CAN message");
                }
            }
        }
        sent
    }

    /// Write a message immediately, bypassing the queue
    pub fn send_can_message(&mut self, message: &CanMessage) -> BusResult<()> {
        self.controller.send(&OutgoingFrame::from(message))
    }

    /// Take a reference on the filter for `id`; false if it could not be installed
    pub fn add_acceptance_filter(&mut self, id: u32) -> bool {
        match self.filters.add(id, self.controller.as_mut()) {
            Ok(()) => true,
            Err(e) => {
                debug!(bus = self.address, id = format!("0x{:X}", id), error = %e, "Couldn't add acceptance filter");
                false
            }
        }
    }

    /// Release this user's reference on the filter for `id`
    pub fn remove_acceptance_filter(&mut self, id: u32) {
        if let Err(e) = self.filters.remove(id, self.controller.as_mut()) {
            warn!(bus = self.address, id = format!("0x{:X}", id), error = %e, "Couldn't remove acceptance filter");
        }
    }

    pub fn filters(&self) -> &AcceptanceFilters {
        &self.filters
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

/// The configured buses, in configuration order
#[derive(Debug, Default)]
pub struct CanBusSet {
    buses: Vec<CanBus>,
}

impl CanBusSet {
    pub fn new(buses: Vec<CanBus>) -> Self {
        Self { buses }
    }

    /// Build every bus in `configs`, asking `make_controller` for each driver
    pub fn from_config<F>(configs: &[BusConfig], mut make_controller: F) -> Self
    where
        F: FnMut(&BusConfig) -> Box<dyn CanController>,
    {
        let buses = configs
            .iter()
            .map(|config| CanBus::new(config, make_controller(config)))
            .collect();
        Self { buses }
    }

    pub fn lookup(&self, address: u8) -> Option<&CanBus> {
        self.buses.iter().find(|bus| bus.address == address)
    }

    pub fn lookup_mut(&mut self, address: u8) -> Option<&mut CanBus> {
        self.buses.iter_mut().find(|bus| bus.address == address)
    }

    /// Like `lookup_mut`, but an unknown address is an error
    pub fn require_mut(&mut self, address: u8) -> BusResult<&mut CanBus> {
        self.lookup_mut(address).ok_or(BusError::UnknownBus(address))
    }

    pub fn first(&self) -> Option<&CanBus> {
        self.buses.first()
    }

    pub fn addresses(&self) -> Vec<u8> {
        self.buses.iter().map(|bus| bus.address).collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CanBus> {
        self.buses.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }
}
