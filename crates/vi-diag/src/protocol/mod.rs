//! Diagnostic request/response protocol
//!
//! OBD-II and UDS-style requests framed over ISO-TP: request encoding,
//! per-request handles that reassemble and match responses, and negative
//! response codes.

pub mod handle;
pub mod isotp;
pub mod message;
pub mod nrc;

pub use handle::{FrameSink, RequestHandle};
pub use isotp::{IsoTpError, IsoTpEvent, IsoTpReceiver};
pub use message::{DiagnosticRequest, DiagnosticResponse};
pub use nrc::NegativeResponseCode;

/// Highest valid (29-bit extended) CAN arbitration id
pub const MAX_ARBITRATION_ID: u32 = 0x1FFF_FFFF;

/// Functional (broadcast) request id addressing every emissions ECU
pub const OBD2_FUNCTIONAL_BROADCAST_ID: u32 = 0x7DF;

/// First id of the range functional responses arrive on
pub const OBD2_FUNCTIONAL_RESPONSE_START: u32 = 0x7E8;

/// Number of ids in the functional response range
pub const OBD2_FUNCTIONAL_RESPONSE_COUNT: u32 = 8;

/// Physical responses arrive on the request id plus this offset
pub const DIAGNOSTIC_RESPONSE_ARBITRATION_ID_OFFSET: u32 = 8;

/// First byte of a negative response
pub const NEGATIVE_RESPONSE_MODE: u8 = 0x7F;

/// Positive responses echo the mode plus this offset
pub const MODE_RESPONSE_OFFSET: u8 = 0x40;

/// Highest mode whose PID is a single byte (OBD-II modes)
pub const MAX_SINGLE_BYTE_PID_MODE: u8 = 0x0A;
