//! Clipboard acknowledgement sequence numbers.
//!
//! The agent echoes a set-clipboard message's sequence number back in an
//! acknowledgement.  Sequence `0` on the wire means "do not acknowledge", so
//! the counter starts at 1 and never hands out 0, even after wrapping.

/// A monotonically increasing sequence number generator.
///
/// Owned by the session's acknowledgement handler, which is its only writer.
#[derive(Debug)]
pub struct ClipboardSequence {
    next: u64,
}

impl ClipboardSequence {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns the next sequence number.  Never returns 0.
    pub fn next(&mut self) -> u64 {
        let value = self.next;
        self.next = match value.wrapping_add(1) {
            0 => 1,
            following => following,
        };
        value
    }

    /// The value the next call to [`next`](Self::next) will hand out.
    pub fn current(&self) -> u64 {
        self.next
    }
}

impl Default for ClipboardSequence {
    fn default() -> Self {
        Self::new()
    }
}
