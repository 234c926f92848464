//! Controller driver seam
//!
//! The platform-specific CAN peripheral is reached only through
//! [`CanController`]: transmit one frame, install or uninstall one hardware
//! acceptance filter. Reference counting of filters lives in
//! [`crate::filter::AcceptanceFilters`], so a driver sees each id installed
//! once and uninstalled once.
//!
//! - [`mock::MockController`] records traffic in memory for tests

pub mod mock;

pub use mock::MockController;

use crate::error::BusResult;
use crate::message::OutgoingFrame;

/// Platform driver for a single CAN controller
pub trait CanController: Send {
    /// Write one frame to the bus right now
    fn send(&mut self, frame: &OutgoingFrame) -> BusResult<()>;

    /// Admit frames with this arbitration id onto the receive path
    fn install_filter(&mut self, id: u32) -> BusResult<()>;

    /// Stop admitting frames with this arbitration id
    fn uninstall_filter(&mut self, id: u32) -> BusResult<()>;
}
