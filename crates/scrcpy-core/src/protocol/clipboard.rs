//! Clipboard synchronisation: inbound clipboard content and write acks.
//!
//! Two independent handlers live here:
//!
//! * [`ClipboardStream`] forwards clipboard-content device messages (the agent
//!   telling us its clipboard changed) to the caller.
//! * [`AckClipboardHandler`] pairs outbound set-clipboard writes with the
//!   agent's acknowledgements.  Each acknowledged write gets a sequence number
//!   and a [`ClipboardAck`] future that settles when the matching ack arrives,
//!   or fails with [`ChannelClosed`] if the device stream ends first.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::protocol::device::{ChannelClosed, DeviceEventReceiver, DeviceEventSender};
use crate::protocol::sequence::ClipboardSequence;

// ── Inbound clipboard content ─────────────────────────────────────────────────

/// Forwards clipboard-content device messages to the caller.
#[derive(Debug)]
pub struct ClipboardStream {
    events: DeviceEventSender<String>,
}

impl ClipboardStream {
    pub fn new() -> Self {
        Self {
            events: DeviceEventSender::new(),
        }
    }

    /// Takes the receiving half.  Returns `None` after the first call.
    pub fn take_receiver(&mut self) -> Option<DeviceEventReceiver<String>> {
        self.events.take_receiver()
    }

    pub(crate) fn deliver(&mut self, text: String) {
        trace!("clipboard content received ({} bytes)", text.len());
        self.events.push(text);
    }

    pub(crate) fn close(&mut self) {
        self.events.close();
    }

    pub(crate) fn error(&mut self, reason: ChannelClosed) {
        self.events.error(reason);
    }
}

impl Default for ClipboardStream {
    fn default() -> Self {
        Self::new()
    }
}

// ── Acknowledged writes ───────────────────────────────────────────────────────

/// A set-clipboard write waiting for its acknowledgement.
#[derive(Debug)]
pub struct PendingClipboardWrite {
    pub sequence: u64,
    pub text: String,
    settle: oneshot::Sender<Result<(), ChannelClosed>>,
}

/// Resolves when the agent acknowledges a set-clipboard write.
#[derive(Debug)]
pub struct ClipboardAck {
    sequence: u64,
    rx: oneshot::Receiver<Result<(), ChannelClosed>>,
}

impl ClipboardAck {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Future for ClipboardAck {
    type Output = Result<(), ChannelClosed>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // Handler dropped without settling: treat as a closed channel.
            Poll::Ready(Err(_)) => Poll::Ready(Err(ChannelClosed::Ended)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Tracks acknowledged set-clipboard writes in sequence order.
///
/// Sequences are handed out strictly increasing and the agent acknowledges in
/// order, so a FIFO queue is enough; acks for unknown or already settled
/// sequences are ignored.
#[derive(Debug)]
pub struct AckClipboardHandler {
    sequence: ClipboardSequence,
    pending: VecDeque<PendingClipboardWrite>,
    closed: Option<ChannelClosed>,
}

impl AckClipboardHandler {
    pub fn new() -> Self {
        Self {
            sequence: ClipboardSequence::new(),
            pending: VecDeque::new(),
            closed: None,
        }
    }

    /// Assigns the next sequence to a write of `text` and returns its future.
    ///
    /// After teardown the returned future fails immediately.
    pub fn register(&mut self, text: &str) -> (u64, ClipboardAck) {
        let sequence = self.sequence.next();
        let (settle, rx) = oneshot::channel();
        let ack = ClipboardAck { sequence, rx };

        match &self.closed {
            Some(reason) => {
                let _ = settle.send(Err(reason.clone()));
            }
            None => self.pending.push_back(PendingClipboardWrite {
                sequence,
                text: text.to_string(),
                settle,
            }),
        }
        (sequence, ack)
    }

    /// Settles the write with `sequence`.  Returns `false` if none is pending.
    pub fn acknowledge(&mut self, sequence: u64) -> bool {
        let Some(index) = self.pending.iter().position(|w| w.sequence == sequence) else {
            debug!("ignoring clipboard ack for unknown sequence {}", sequence);
            return false;
        };
        // Earlier writes stay pending until their own ack or teardown.
        if let Some(write) = self.pending.remove(index) {
            trace!(
                "clipboard write {} acknowledged ({} bytes)",
                write.sequence,
                write.text.len()
            );
            let _ = write.settle.send(Ok(()));
        }
        true
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn close(&mut self) {
        self.settle_all(ChannelClosed::Ended);
    }

    pub(crate) fn error(&mut self, reason: ChannelClosed) {
        self.settle_all(reason);
    }

    fn settle_all(&mut self, reason: ChannelClosed) {
        if !self.pending.is_empty() {
            debug!(
                "rejecting {} pending clipboard writes: {}",
                self.pending.len(),
                reason
            );
        }
        for write in self.pending.drain(..) {
            let _ = write.settle.send(Err(reason.clone()));
        }
        self.closed = Some(reason);
    }
}

impl Default for AckClipboardHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// The result of serializing a set-clipboard message.
#[derive(Debug)]
pub enum SerializedSetClipboard {
    /// No acknowledgement was requested (or the session cannot provide one).
    Message(Vec<u8>),
    /// Write the bytes, then await the future for the agent's ack.
    AwaitingAck(Vec<u8>, ClipboardAck),
}

impl SerializedSetClipboard {
    pub fn bytes(&self) -> &[u8] {
        match self {
            SerializedSetClipboard::Message(bytes) => bytes,
            SerializedSetClipboard::AwaitingAck(bytes, _) => bytes,
        }
    }

    pub fn into_parts(self) -> (Vec<u8>, Option<ClipboardAck>) {
        match self {
            SerializedSetClipboard::Message(bytes) => (bytes, None),
            SerializedSetClipboard::AwaitingAck(bytes, ack) => (bytes, Some(ack)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clipboard_stream_forwards_text() {
        // Arrange
        let mut clipboard = ClipboardStream::new();
        let mut rx = clipboard.take_receiver().unwrap();

        // Act
        clipboard.deliver("hello".to_string());
        clipboard.close();

        // Assert
        assert_eq!(rx.recv().await, Some(Ok("hello".to_string())));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_take_receiver_only_once() {
        let mut clipboard = ClipboardStream::new();
        assert!(clipboard.take_receiver().is_some());
        assert!(clipboard.take_receiver().is_none());
    }

    #[tokio::test]
    async fn test_ack_settles_matching_write() {
        // Arrange
        let mut handler = AckClipboardHandler::new();
        let (sequence, ack) = handler.register("copied");

        // Act
        let settled = handler.acknowledge(1);

        // Assert
        assert!(settled);
        assert_eq!(sequence, 1);
        assert_eq!(ack.await, Ok(()));
        assert_eq!(handler.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_stale_and_duplicate_acks_are_ignored() {
        // Arrange
        let mut handler = AckClipboardHandler::new();
        let (first, first_ack) = handler.register("a");
        let (_second, _second_ack) = handler.register("b");

        // Act
        let settled = handler.acknowledge(first);
        let duplicate = handler.acknowledge(first);
        let unknown = handler.acknowledge(99);

        // Assert
        assert!(settled);
        assert!(!duplicate);
        assert!(!unknown);
        assert_eq!(first_ack.await, Ok(()));
        assert_eq!(handler.pending_len(), 1);
    }

    #[tokio::test]
    async fn test_close_rejects_every_pending_write() {
        // Arrange
        let mut handler = AckClipboardHandler::new();
        let (_, a) = handler.register("a");
        let (_, b) = handler.register("b");

        // Act
        handler.error(ChannelClosed::Failed("reset by peer".to_string()));

        // Assert
        assert_eq!(a.await, Err(ChannelClosed::Failed("reset by peer".to_string())));
        assert_eq!(b.await, Err(ChannelClosed::Failed("reset by peer".to_string())));
        assert_eq!(handler.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_register_after_close_fails_immediately() {
        // Arrange
        let mut handler = AckClipboardHandler::new();
        handler.close();

        // Act
        let (_, ack) = handler.register("late");

        // Assert
        assert_eq!(ack.await, Err(ChannelClosed::Ended));
        assert_eq!(handler.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_dropped_handler_fails_outstanding_acks() {
        let mut handler = AckClipboardHandler::new();
        let (_, ack) = handler.register("orphan");
        drop(handler);
        assert_eq!(ack.await, Err(ChannelClosed::Ended));
    }
}
