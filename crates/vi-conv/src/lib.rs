//! vi-conv - CAN signal codec for the vehicle interface firmware
//!
//! Packs physical values into arbitrary-width, arbitrary-offset fields of a
//! 64-bit CAN payload and unpacks them again.
//!
//! # Features
//!
//! - **MSB-first bit positions** - position 0 is bit 7 of wire byte 0
//! - **Linear scaling** - physical = raw * factor + offset
//! - **Symbolic states** - name <-> integer tables, first entry wins
//! - **Vetoing encoders** - an encoder can decline to send a value
//! - **Frame composition** - signals of one message share a single frame
//!
//! # Quick Start
//!
//! ```rust
//! use vi_conv::{encode_signal, parse_signal, CanSignal};
//!
//! // Coolant temperature: physical 92 -> raw 132 with an offset of -40
//! let signal = CanSignal::new("engine_coolant_temp", 0x3E9, 16, 8).with_scale(1.0, -40.0);
//!
//! let data = encode_signal(&signal, 92.0).unwrap();
//! assert_eq!((data >> 40) & 0xFF, 132);
//! assert_eq!(parse_signal(&signal, data).unwrap(), 92.0);
//! ```

pub mod bitfield;
pub mod decode;
pub mod encode;
pub mod error;
pub mod signal;
pub mod types;
pub mod write;

pub use bitfield::{decode_float, encode_float, get_bitfield, set_bitfield};
pub use decode::{boolean_decoder, parse_signal, state_decoder};
pub use encode::{
    boolean_encoder, default_encoder, encode_signal, number_encoder, pack_signal, state_encoder,
};
pub use error::{ConvError, ConvResult};
pub use signal::{CanSignal, SignalEncoder};
pub use types::{Encoded, SignalState, SignalValue};
pub use write::{send_signal, send_signals};
