//! Control and device message protocol.
//!
//! * [`control`] – host-to-agent control messages and the version-aware serializer.
//! * [`scroll`] – accumulates fractional scroll input into legal scroll steps.
//! * [`device`] – the inbound device-message channel and its dispatch table.
//! * [`clipboard`] – clipboard content stream and acknowledged clipboard writes.
//! * [`sequence`] – acknowledgement sequence numbers.

pub mod clipboard;
pub mod control;
pub mod device;
pub mod scroll;
pub mod sequence;
pub(crate) mod wire;

pub use clipboard::{
    AckClipboardHandler, ClipboardAck, ClipboardStream, PendingClipboardWrite,
    SerializedSetClipboard,
};
pub use control::{
    AndroidKeyEventAction, AndroidMotionEventAction, BackOrScreenOnControlMessage, ControlMessage,
    ControlMessageSerializer, ControlMessageType, CopyKey, GetClipboardControlMessage,
    InjectKeyCodeControlMessage, InjectScrollControlMessage, InjectTextControlMessage,
    InjectTouchControlMessage, ScreenPowerMode, SetClipboardControlMessage,
    SetScreenPowerModeControlMessage, StartAppControlMessage, UHidCreateControlMessage,
    UHidDestroyControlMessage, UHidInputControlMessage, POINTER_ID_GENERIC_FINGER,
    POINTER_ID_MOUSE,
};
pub use device::{
    ChannelClosed, DeviceEventReceiver, DeviceMessage, DeviceMessageChannel, DeviceMessageError,
    DeviceMessageType, UHidOutputDeviceMessage, UHidOutputStream, CLIPBOARD_TEXT_MAX_LENGTH,
};
pub use scroll::{ScrollController, ScrollSteps};
pub use sequence::ClipboardSequence;
