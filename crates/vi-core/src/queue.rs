//! Bounded outgoing frame queue
//!
//! Backed by a bounded `tokio::sync::mpsc` channel whose two halves stay
//! with the bus. Only the non-blocking `try_send`/`try_recv` calls are used,
//! so no runtime is needed and a full queue is reported instead of awaited.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::message::OutgoingFrame;

/// FIFO of frames waiting for `process_write_queue`
#[derive(Debug)]
pub struct WriteQueue {
    tx: mpsc::Sender<OutgoingFrame>,
    rx: mpsc::Receiver<OutgoingFrame>,
    capacity: usize,
}

impl WriteQueue {
    /// Create a queue holding at most `capacity` frames (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self { tx, rx, capacity }
    }

    /// Append a frame; gives it back when the queue is full
    pub fn try_push(&self, frame: OutgoingFrame) -> Result<(), OutgoingFrame> {
        self.tx.try_send(frame).map_err(|err| match err {
            TrySendError::Full(frame) | TrySendError::Closed(frame) => frame,
        })
    }

    /// Oldest queued frame, if any
    pub fn pop(&mut self) -> Option<OutgoingFrame> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CanMessage;

    fn frame(id: u32) -> OutgoingFrame {
        OutgoingFrame::from(&CanMessage::from_bytes(id, &[id as u8]))
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = WriteQueue::new(4);
        queue.try_push(frame(1)).unwrap();
        queue.try_push(frame(2)).unwrap();
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop().map(|f| f.id), Some(1));
        assert_eq!(queue.pop().map(|f| f.id), Some(2));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue_rejects() {
        let queue = WriteQueue::new(1);
        queue.try_push(frame(1)).unwrap();
        let rejected = queue.try_push(frame(2)).unwrap_err();
        assert_eq!(rejected.id, 2);
        assert_eq!(queue.len(), 1);
    }
}
