//! Writing signals to a bus
//!
//! A write resolves the signal's encoder, packs the encoded value into the
//! 64-bit payload of the signal's message and hands the frame to the bus
//! write queue. Several signals of the same message are OR-composed into
//! one frame.

use tracing::debug;
use vi_core::{CanBus, CanMessage};

use crate::encode::{default_encoder, pack_signal};
use crate::error::{ConvError, ConvResult};
use crate::signal::CanSignal;
use crate::types::SignalValue;

/// Encode `value` with the signal's own encoder if it has one
fn encode_value(signal: &CanSignal, value: &SignalValue, force: bool) -> ConvResult<f64> {
    if !force && !signal.writable {
        debug!(signal = %signal.generic_name, "Refusing to write read-only signal");
        return Err(ConvError::NotWritable(signal.generic_name.clone()));
    }

    let encoded = match signal.encoder {
        Some(encoder) => encoder(signal, value),
        None => default_encoder(signal, value),
    };
    if !encoded.send {
        return Err(ConvError::Vetoed(signal.generic_name.clone()));
    }
    Ok(encoded.value)
}

/// Encode and queue a single signal in its own frame
pub fn send_signal(signal: &CanSignal, value: &SignalValue, bus: &mut CanBus, force: bool) -> ConvResult<()> {
    let physical = encode_value(signal, value, force)?;
    let mut data = 0;
    pack_signal(signal, physical, &mut data)?;

    debug!(
        signal = %signal.generic_name,
        id = format!("0x{:X}", signal.message_id),
        bus = bus.address,
        "Queueing signal write"
    );
    bus.enqueue_message(&CanMessage::new(signal.message_id, data, 0))?;
    Ok(())
}

/// Encode a batch of signals, one frame per message id, and queue them.
///
/// Every value is encoded before anything is queued, so a rejected signal
/// leaves the bus untouched. Frames are queued in the order their message
/// id first appears. Returns the number of frames queued.
pub fn send_signals(signals: &[(&CanSignal, SignalValue)], bus: &mut CanBus, force: bool) -> ConvResult<usize> {
    let mut frames: Vec<(u32, u64)> = Vec::new();

    for (signal, value) in signals {
        let physical = encode_value(signal, value, force)?;
        let index = match frames.iter().position(|(id, _)| *id == signal.message_id) {
            Some(index) => index,
            None => {
                frames.push((signal.message_id, 0));
                frames.len() - 1
            }
        };
        pack_signal(signal, physical, &mut frames[index].1)?;
    }

    for (id, data) in &frames {
        bus.enqueue_message(&CanMessage::new(*id, *data, 0))?;
    }
    Ok(frames.len())
}
