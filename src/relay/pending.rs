use bytes::Bytes;
use std::collections::VecDeque;

// -----------------------------------------------------------------------------
// ----- PendingFrames ---------------------------------------------------------

/// Browser frames received before the upstream session is ready, oldest first.
#[derive(Debug, Default)]
pub struct PendingFrames {
    frames: VecDeque<Bytes>,
    bytes: usize,
}

// -----------------------------------------------------------------------------
// ----- PendingFrames: Static -------------------------------------------------

impl PendingFrames {
    pub fn new() -> Self {
        Self::default()
    }
}

// -----------------------------------------------------------------------------
// ----- PendingFrames: Public -------------------------------------------------

impl PendingFrames {
    pub fn push(&mut self, frame: Bytes) {
        self.bytes += frame.len();
        self.frames.push_back(frame);
    }

    pub fn pop(&mut self) -> Option<Bytes> {
        let frame = self.frames.pop_front()?;
        self.bytes -= frame.len();
        Some(frame)
    }

    /// Drops everything still queued and returns how many frames were lost.
    pub fn discard(&mut self) -> usize {
        let dropped = self.frames.len();
        self.frames.clear();
        self.bytes = 0;
        dropped
    }

    /// Count the number of frames in the queue
    pub fn count(&self) -> usize {
        self.frames.len()
    }

    /// Length of all queued frames, in bytes
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
