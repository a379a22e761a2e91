use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError};
use thiserror::Error;
use tracing::{debug, warn};
use tree::Frame;

pub const DEFAULT_QUEUE_CAPACITY: usize = 2;

/// Returned by every queue operation once [`FrameQueue::close`] has run and
/// there is nothing left to hand over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("frame queue closed")]
pub struct QueueClosed;

/// Bounded FIFO hand-off of finished frames from the control loop to the
/// output thread.
///
/// `push` blocks while the queue is full and `pop` blocks while it is empty.
/// `close` wakes every blocked caller: pushes fail with [`QueueClosed`],
/// pops first drain whatever is still buffered. Clones share one queue.
#[derive(Clone)]
pub struct FrameQueue {
    frames_tx: Sender<Frame>,
    frames_rx: Receiver<Frame>,
    closed_rx: Receiver<()>,
    closer: Arc<Mutex<Option<Sender<()>>>>,
    capacity: usize,
}

impl FrameQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            warn!("frame queue capacity must be at least 1; using 1");
            1
        } else {
            capacity
        };
        let (frames_tx, frames_rx) = bounded(capacity);
        // Nothing is ever sent on this channel; dropping its only sender is
        // the close signal every blocked select observes.
        let (closed_tx, closed_rx) = bounded(0);
        Self {
            frames_tx,
            frames_rx,
            closed_rx,
            closer: Arc::new(Mutex::new(Some(closed_tx))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames currently buffered.
    pub fn len(&self) -> usize {
        self.frames_rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames_rx.is_empty()
    }

    pub fn push(&self, frame: Frame) -> Result<(), QueueClosed> {
        if self.is_closed() {
            return Err(QueueClosed);
        }
        select! {
            send(self.frames_tx, frame) -> sent => sent.map_err(|_| QueueClosed),
            recv(self.closed_rx) -> _ => Err(QueueClosed),
        }
    }

    pub fn pop(&self) -> Result<Frame, QueueClosed> {
        select! {
            recv(self.frames_rx) -> frame => frame.map_err(|_| QueueClosed),
            recv(self.closed_rx) -> _ => self.frames_rx.try_recv().map_err(|_| QueueClosed),
        }
    }

    /// Non-blocking pop. `Ok(None)` means the queue is open but empty.
    pub fn try_pop(&self) -> Result<Option<Frame>, QueueClosed> {
        match self.frames_rx.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(_) if self.is_closed() => Err(QueueClosed),
            Err(_) => Ok(None),
        }
    }

    /// Idempotent.
    pub fn close(&self) {
        let sender = self
            .closer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            debug!(buffered = self.len(), "closing frame queue");
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.closed_rx.try_recv(), Err(TryRecvError::Disconnected))
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree::Rgb;

    fn frame(level: u8) -> Frame {
        Frame::new(vec![Rgb::new(level, level, level)])
    }

    #[test]
    fn delivers_in_fifo_order() {
        let queue = FrameQueue::new(3);
        for level in 1..=3 {
            queue.push(frame(level)).unwrap();
        }
        assert_eq!(queue.len(), 3);
        for level in 1..=3 {
            assert_eq!(queue.pop().unwrap(), frame(level));
        }
        assert_eq!(queue.try_pop(), Ok(None));
    }

    #[test]
    fn close_drains_buffered_frames_then_reports_closed() {
        let queue = FrameQueue::new(2);
        queue.push(frame(7)).unwrap();
        queue.close();
        queue.close();
        assert_eq!(queue.push(frame(8)), Err(QueueClosed));
        assert_eq!(queue.pop().unwrap(), frame(7));
        assert_eq!(queue.pop(), Err(QueueClosed));
        assert_eq!(queue.try_pop(), Err(QueueClosed));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        assert_eq!(FrameQueue::new(0).capacity(), 1);
        assert_eq!(FrameQueue::new(DEFAULT_QUEUE_CAPACITY).capacity(), 2);
    }
}
