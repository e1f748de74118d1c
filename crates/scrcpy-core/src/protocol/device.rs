//! The inbound device-message channel.
//!
//! The agent multiplexes several sub-protocols over one byte stream.  Each
//! message starts with a one-byte discriminant; the channel reads it, finds the
//! handler registered for that byte, decodes exactly that message's body and
//! hands the result to the handler.  Handlers are registered once, when the
//! session is set up, in the order the version introduced them:
//!
//! | byte | message        | handler                  | since |
//! |------|----------------|--------------------------|-------|
//! | 0    | clipboard      | [`ClipboardStream`]      | 1.16  |
//! | 1    | clipboard ack  | [`AckClipboardHandler`]  | 1.21  |
//! | 2    | UHID output    | [`UHidOutputStream`]     | 2.4   |
//!
//! A discriminant with no handler is a protocol violation: the channel stops
//! without reading further, because the body length of an unknown message is
//! unknowable.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::protocol::clipboard::{AckClipboardHandler, ClipboardStream};
use crate::protocol::wire::read_vec;

// ── Types ─────────────────────────────────────────────────────────────────────

/// Device message discriminants.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceMessageType {
    Clipboard = 0,
    AckClipboard = 1,
    UHidOutput = 2,
}

impl TryFrom<u8> for DeviceMessageType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DeviceMessageType::Clipboard),
            1 => Ok(DeviceMessageType::AckClipboard),
            2 => Ok(DeviceMessageType::UHidOutput),
            _ => Err(()),
        }
    }
}

/// Output report sent by the agent for a virtual HID device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UHidOutputDeviceMessage {
    pub id: u16,
    pub data: Vec<u8>,
}

/// Longest clipboard text the agent may send, in bytes.
pub const CLIPBOARD_TEXT_MAX_LENGTH: usize = (1 << 18) - 5;

/// One decoded device message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMessage {
    Clipboard(String),
    AckClipboard { sequence: u64 },
    UHidOutput(UHidOutputDeviceMessage),
}

impl DeviceMessage {
    pub fn message_type(&self) -> DeviceMessageType {
        match self {
            DeviceMessage::Clipboard(_) => DeviceMessageType::Clipboard,
            DeviceMessage::AckClipboard { .. } => DeviceMessageType::AckClipboard,
            DeviceMessage::UHidOutput(_) => DeviceMessageType::UHidOutput,
        }
    }

    /// Reads the body of a `kind` message; the discriminant is already consumed.
    ///
    /// Consumes exactly the body.  An oversized clipboard length fails before
    /// any of the text is read.
    pub async fn read_body<R>(
        kind: DeviceMessageType,
        stream: &mut R,
    ) -> Result<Self, DeviceMessageError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        match kind {
            DeviceMessageType::Clipboard => {
                let length = stream.read_u32().await? as usize;
                if length > CLIPBOARD_TEXT_MAX_LENGTH {
                    return Err(DeviceMessageError::MessageTooLarge {
                        kind,
                        length,
                        max: CLIPBOARD_TEXT_MAX_LENGTH,
                    });
                }
                let bytes = read_vec(stream, length).await?;
                Ok(DeviceMessage::Clipboard(String::from_utf8(bytes)?))
            }
            DeviceMessageType::AckClipboard => Ok(DeviceMessage::AckClipboard {
                sequence: stream.read_u64().await?,
            }),
            DeviceMessageType::UHidOutput => {
                let id = stream.read_u16().await?;
                let length = stream.read_u16().await? as usize;
                let data = read_vec(stream, length).await?;
                Ok(DeviceMessage::UHidOutput(UHidOutputDeviceMessage { id, data }))
            }
        }
    }
}

/// Why a device-message sub-stream stopped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelClosed {
    #[error("device message stream ended")]
    Ended,
    #[error("device message stream failed: {0}")]
    Failed(String),
}

/// Errors raised while reading the device-message stream.
#[derive(Debug, Error)]
pub enum DeviceMessageError {
    #[error("unknown device message type: {0}")]
    UnknownDeviceMessage(u8),

    #[error("{kind:?} message of {length} bytes exceeds the {max}-byte limit")]
    MessageTooLarge {
        kind: DeviceMessageType,
        length: usize,
        max: usize,
    },

    #[error("clipboard text is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("device stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ── Event fan-out ─────────────────────────────────────────────────────────────

/// Items delivered to the caller; an `Err` is the last item of a failed stream.
pub type DeviceEventReceiver<T> = mpsc::UnboundedReceiver<Result<T, ChannelClosed>>;

/// Sending half of a sub-stream, with its receiver parked until taken.
#[derive(Debug)]
pub(crate) struct DeviceEventSender<T> {
    tx: Option<mpsc::UnboundedSender<Result<T, ChannelClosed>>>,
    rx: Option<DeviceEventReceiver<T>>,
}

impl<T> DeviceEventSender<T> {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Some(tx),
            rx: Some(rx),
        }
    }

    pub(crate) fn take_receiver(&mut self) -> Option<DeviceEventReceiver<T>> {
        self.rx.take()
    }

    pub(crate) fn push(&mut self, item: T) {
        if let Some(tx) = &self.tx {
            if tx.send(Ok(item)).is_err() {
                trace!("device event dropped: receiver gone");
            }
        }
    }

    pub(crate) fn close(&mut self) {
        self.tx = None;
    }

    pub(crate) fn error(&mut self, reason: ChannelClosed) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(reason));
        }
    }
}

// ── UHID output ───────────────────────────────────────────────────────────────

/// Forwards UHID output reports to the caller.
#[derive(Debug)]
pub struct UHidOutputStream {
    events: DeviceEventSender<UHidOutputDeviceMessage>,
}

impl UHidOutputStream {
    pub fn new() -> Self {
        Self {
            events: DeviceEventSender::new(),
        }
    }

    pub fn take_receiver(&mut self) -> Option<DeviceEventReceiver<UHidOutputDeviceMessage>> {
        self.events.take_receiver()
    }

    pub(crate) fn deliver(&mut self, message: UHidOutputDeviceMessage) {
        trace!("uhid output for device {} ({} bytes)", message.id, message.data.len());
        self.events.push(message);
    }

    pub(crate) fn close(&mut self) {
        self.events.close();
    }

    pub(crate) fn error(&mut self, reason: ChannelClosed) {
        self.events.error(reason);
    }
}

impl Default for UHidOutputStream {
    fn default() -> Self {
        Self::new()
    }
}

// ── Channel ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelState {
    AwaitingDiscriminant,
    Closed,
}

/// Demultiplexes the device-message stream into its sub-protocols.
#[derive(Debug)]
pub struct DeviceMessageChannel {
    handlers: Vec<DeviceMessageType>,
    clipboard: Option<ClipboardStream>,
    ack_clipboard: Option<AckClipboardHandler>,
    uhid_output: Option<UHidOutputStream>,
    state: ChannelState,
}

impl DeviceMessageChannel {
    /// Allocates the sub-protocols `supported` allows.
    ///
    /// Nothing is allocated without `control`.  Both clipboard sub-protocols
    /// need `clipboard_autosync`: without it clipboard content is not
    /// forwarded and writes are never acknowledged.
    pub fn new(supported: &[DeviceMessageType], control: bool, clipboard_autosync: bool) -> Self {
        let mut channel = Self {
            handlers: Vec::new(),
            clipboard: None,
            ack_clipboard: None,
            uhid_output: None,
            state: ChannelState::AwaitingDiscriminant,
        };
        if !control {
            debug!("control disabled: no device message handlers");
            return channel;
        }

        for kind in supported {
            let registered = match kind {
                DeviceMessageType::Clipboard if clipboard_autosync => {
                    channel.clipboard = Some(ClipboardStream::new());
                    true
                }
                DeviceMessageType::Clipboard => false,
                DeviceMessageType::AckClipboard if clipboard_autosync => {
                    channel.ack_clipboard = Some(AckClipboardHandler::new());
                    true
                }
                DeviceMessageType::AckClipboard => false,
                DeviceMessageType::UHidOutput => {
                    channel.uhid_output = Some(UHidOutputStream::new());
                    true
                }
            };
            if registered {
                channel.handlers.push(*kind);
            }
        }
        debug!("device message handlers: {:?}", channel.handlers);
        channel
    }

    /// Registered discriminants, in dispatch order.
    pub fn handlers(&self) -> &[DeviceMessageType] {
        &self.handlers
    }

    pub fn is_closed(&self) -> bool {
        self.state == ChannelState::Closed
    }

    pub fn has_clipboard_stream(&self) -> bool {
        self.clipboard.is_some()
    }

    pub fn take_clipboard_stream(&mut self) -> Option<DeviceEventReceiver<String>> {
        self.clipboard.as_mut().and_then(ClipboardStream::take_receiver)
    }

    pub fn take_uhid_output_stream(
        &mut self,
    ) -> Option<DeviceEventReceiver<UHidOutputDeviceMessage>> {
        self.uhid_output.as_mut().and_then(UHidOutputStream::take_receiver)
    }

    pub fn ack_clipboard_handler(&mut self) -> Option<&mut AckClipboardHandler> {
        self.ack_clipboard.as_mut()
    }

    /// Dispatches one message whose discriminant `id` was already read.
    ///
    /// Exactly the message body is consumed.  An unregistered `id`
    /// fails without touching `stream` or any handler.
    pub async fn parse_device_message<R>(
        &mut self,
        id: u8,
        stream: &mut R,
    ) -> Result<DeviceMessageType, DeviceMessageError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let kind = self
            .handlers
            .iter()
            .copied()
            .find(|kind| *kind as u8 == id)
            .ok_or(DeviceMessageError::UnknownDeviceMessage(id))?;

        let message = DeviceMessage::read_body(kind, stream).await?;
        match message {
            DeviceMessage::Clipboard(text) => {
                if let Some(clipboard) = self.clipboard.as_mut() {
                    clipboard.deliver(text);
                }
            }
            DeviceMessage::AckClipboard { sequence } => {
                if let Some(handler) = self.ack_clipboard.as_mut() {
                    handler.acknowledge(sequence);
                }
            }
            DeviceMessage::UHidOutput(output) => {
                if let Some(uhid) = self.uhid_output.as_mut() {
                    uhid.deliver(output);
                }
            }
        }
        trace!("dispatched device message {:?}", kind);
        Ok(kind)
    }

    /// Reads the next discriminant and dispatches its message.
    ///
    /// Returns `Ok(None)` on a clean end of stream at a message boundary.
    pub async fn read_next<R>(
        &mut self,
        stream: &mut R,
    ) -> Result<Option<DeviceMessageType>, DeviceMessageError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut id = [0u8; 1];
        if stream.read(&mut id).await? == 0 {
            return Ok(None);
        }
        self.parse_device_message(id[0], stream).await.map(Some)
    }

    /// Drives the channel until the stream ends or fails, then tears down.
    pub async fn pump<R>(&mut self, stream: &mut R) -> Result<(), DeviceMessageError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        loop {
            match self.read_next(stream).await {
                Ok(Some(_)) => continue,
                Ok(None) => {
                    info!("device message stream ended");
                    self.end(None);
                    return Ok(());
                }
                Err(e) => {
                    warn!("device message stream failed: {}", e);
                    self.end(Some(&e));
                    return Err(e);
                }
            }
        }
    }

    /// Tears down every sub-protocol; idempotent.
    ///
    /// With an error, sub-streams end with [`ChannelClosed::Failed`];
    /// otherwise they close normally.  Either way, every pending clipboard
    /// write is rejected.
    pub fn end(&mut self, error: Option<&dyn std::error::Error>) {
        if self.state == ChannelState::Closed {
            return;
        }
        self.state = ChannelState::Closed;

        let pending = self
            .ack_clipboard
            .as_ref()
            .map_or(0, AckClipboardHandler::pending_len);
        debug!(
            "closing device message channel ({} pending clipboard writes)",
            pending
        );

        match error {
            Some(error) => {
                let reason = ChannelClosed::Failed(error.to_string());
                if let Some(clipboard) = self.clipboard.as_mut() {
                    clipboard.error(reason.clone());
                }
                if let Some(handler) = self.ack_clipboard.as_mut() {
                    handler.error(reason.clone());
                }
                if let Some(uhid) = self.uhid_output.as_mut() {
                    uhid.error(reason);
                }
            }
            None => {
                if let Some(clipboard) = self.clipboard.as_mut() {
                    clipboard.close();
                }
                if let Some(handler) = self.ack_clipboard.as_mut() {
                    handler.close();
                }
                if let Some(uhid) = self.uhid_output.as_mut() {
                    uhid.close();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[DeviceMessageType] = &[
        DeviceMessageType::Clipboard,
        DeviceMessageType::AckClipboard,
        DeviceMessageType::UHidOutput,
    ];

    #[test]
    fn test_discriminant_try_from() {
        assert_eq!(DeviceMessageType::try_from(2), Ok(DeviceMessageType::UHidOutput));
        assert_eq!(DeviceMessageType::try_from(3), Err(()));
    }

    #[test]
    fn test_no_handlers_without_control() {
        let channel = DeviceMessageChannel::new(ALL, false, true);
        assert!(channel.handlers().is_empty());
        assert!(!channel.has_clipboard_stream());
    }

    #[test]
    fn test_clipboard_handlers_need_autosync() {
        let mut channel = DeviceMessageChannel::new(ALL, true, false);
        assert_eq!(channel.handlers(), &[DeviceMessageType::UHidOutput]);
        assert!(!channel.has_clipboard_stream());
        assert!(channel.ack_clipboard_handler().is_none());
    }

    #[tokio::test]
    async fn test_unknown_discriminant_consumes_nothing() {
        // Arrange
        let mut channel = DeviceMessageChannel::new(&ALL[..2], true, true);
        let mut stream: &[u8] = &[0, 1, 0, 0];

        // Act
        let result = channel.parse_device_message(2, &mut stream).await;

        // Assert
        assert!(matches!(result, Err(DeviceMessageError::UnknownDeviceMessage(2))));
        assert_eq!(stream.len(), 4);
        assert!(!channel.is_closed());
    }

    #[tokio::test]
    async fn test_clipboard_body_is_read_exactly() {
        // Arrange
        let mut body: &[u8] = &[0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o', 0xff];

        // Act
        let message = DeviceMessage::read_body(DeviceMessageType::Clipboard, &mut body)
            .await
            .unwrap();

        // Assert
        assert_eq!(message, DeviceMessage::Clipboard("hello".to_string()));
        assert_eq!(body, &[0xff]);
    }

    #[tokio::test]
    async fn test_clipboard_body_rejects_invalid_utf8() {
        let mut body: &[u8] = &[0, 0, 0, 2, 0xc3, 0x28];
        let result = DeviceMessage::read_body(DeviceMessageType::Clipboard, &mut body).await;
        assert!(matches!(result, Err(DeviceMessageError::InvalidUtf8(_))));
    }

    #[tokio::test]
    async fn test_oversized_clipboard_fails_before_reading_text() {
        // Arrange
        let mut body: &[u8] = &[0x00, 0x04, 0x00, 0x00, b'x'];

        // Act
        let result = DeviceMessage::read_body(DeviceMessageType::Clipboard, &mut body).await;

        // Assert
        assert!(matches!(
            result,
            Err(DeviceMessageError::MessageTooLarge { length: 262_144, .. })
        ));
        assert_eq!(body, &[b'x']);
    }

    #[tokio::test]
    async fn test_truncated_ack_is_an_io_error() {
        let mut body: &[u8] = &[0, 0, 0, 1];
        let result = DeviceMessage::read_body(DeviceMessageType::AckClipboard, &mut body).await;
        assert!(matches!(result, Err(DeviceMessageError::Io(_))));
    }

    #[tokio::test]
    async fn test_uhid_output_is_forwarded() {
        // Arrange
        let mut channel = DeviceMessageChannel::new(ALL, true, true);
        let mut rx = channel.take_uhid_output_stream().unwrap();
        let mut stream: &[u8] = &[2, 0, 7, 0, 2, 0xaa, 0xbb];

        // Act
        let kind = channel.read_next(&mut stream).await.unwrap();

        // Assert
        assert_eq!(kind, Some(DeviceMessageType::UHidOutput));
        assert_eq!(
            rx.recv().await,
            Some(Ok(UHidOutputDeviceMessage { id: 7, data: vec![0xaa, 0xbb] }))
        );
    }

    #[tokio::test]
    async fn test_read_next_reports_clean_eof() {
        let mut channel = DeviceMessageChannel::new(ALL, true, true);
        let mut stream: &[u8] = &[];
        assert_eq!(channel.read_next(&mut stream).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_end_with_error_fails_sub_streams_once() {
        // Arrange
        let mut channel = DeviceMessageChannel::new(ALL, true, true);
        let mut clipboard = channel.take_clipboard_stream().unwrap();
        let error = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");

        // Act
        channel.end(Some(&error));
        channel.end(None);

        // Assert
        assert_eq!(
            clipboard.recv().await,
            Some(Err(ChannelClosed::Failed("reset".to_string())))
        );
        assert_eq!(clipboard.recv().await, None);
        assert!(channel.is_closed());
    }
}
